//! Per-state emission probabilities for the zero-inflated negative multinomial model (and the
//! standalone two-component mixture variant).

use crate::error::{Diagnostics, Error, Result};
use crate::observations::Observations;
use ndarray::{Array2, ArrayView1};
use statrs::function::gamma::ln_gamma;

/// Ratio-deviation threshold above which [`Diagnostics::inconsistent_structure`] is raised.
const STRUCTURE_TOLERANCE: f64 = 1e-3;
/// Row-sum deviation threshold above which a `P` row is considered to need renormalization.
const RENORM_TOLERANCE: f64 = 1e-9;

/// Representation requested from [`evaluate`].
///
/// The forward pass in [`crate::forward`] discriminates log-space from linear-space rows by the
/// sign of the row's first slot (log emissions are never positive in the working range this
/// crate targets, since they are log-probabilities of discrete events). [`OutputMode::LinPreferred`]
/// is the contract the forward pass actually consumes: every row is internally tagged, and the
/// invariant "all slots of a row share one representation" is enforced here, at the evaluator
/// boundary, rather than left to callers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OutputMode {
    /// Emit linear-space values; if every state's value underflows to zero for a row, fall back
    /// to that row's log-space values instead.
    LinPreferred,
    /// Always emit log-space values.
    Log,
    /// Always emit linear-space values, even when every entry underflows to zero.
    Lin,
    /// Emit `1 / (1 + exp(q - p))` for the two-component mixture variant. Requires
    /// [`EmissionModel::Mixture`].
    Ratio,
}

/// The emission family evaluated by [`evaluate`].
///
/// `ZeroInflated` is the model actually driven by [`crate::trainer`]; `Mixture` is carried for
/// completeness as a standalone variant and is only meaningful under [`OutputMode::Ratio`].
#[derive(Clone, Debug, PartialEq)]
pub enum EmissionModel {
    /// Zero-inflated negative multinomial: weight `pi` on the negative-multinomial component,
    /// `1 - pi` on the point mass at the all-zero observation. `p` is `m x (r+1)`; dispersion `a`
    /// is shared across states.
    ZeroInflated { a: f64, pi: f64, p: Array2<f64> },
    /// Two-component negative-multinomial mixture, parameterized by a shared dispersion `theta`
    /// and two `m x (r+1)` probability tables `p` and `q`.
    Mixture {
        theta: f64,
        p: Array2<f64>,
        q: Array2<f64>,
    },
}

/// Computes the log-density `a * ln(p0) + sum_{j=1..=r} y[j] * ln(p[j])` for a non-all-zero,
/// non-missing row, optionally adding the state-independent combinatorial normalization
/// constant.
fn log_density(row: ArrayView1<i64>, a: f64, p_state: ArrayView1<f64>, include_norm: bool) -> f64 {
    let mut log_val = a * p_state[0].ln();
    let mut total: f64 = 0.0;

    for (y, p) in row.iter().skip(1).zip(p_state.iter().skip(1)) {
        let y = *y as f64;
        log_val += y * p.ln();
        total += y;
    }

    if include_norm {
        log_val -= ln_gamma(a);
        log_val += ln_gamma(a + total);
        for y in row.iter().skip(1) {
            log_val -= ln_gamma(*y as f64 + 1.0);
        }
    }

    log_val
}

pub(crate) fn row_is_na(row: ArrayView1<i64>) -> bool {
    row.iter().any(|&value| value < 0)
}

pub(crate) fn row_is_zero(row: ArrayView1<i64>) -> bool {
    row.iter().all(|&value| value == 0)
}

/// Renormalizes every row of `p` to unit sum in place, erroring on negative entries or a
/// zero-sum row, and recording a single [`crate::error::Warning::Renormalized`] if any row
/// needed it.
fn renormalize_rows(p: &mut Array2<f64>, diag: &mut Diagnostics) -> Result<()> {
    for mut row in p.rows_mut() {
        if row.iter().any(|&value| !value.is_finite() || value < 0.0) {
            return Err(Error::InvalidParameter(
                "P must contain only finite, non-negative entries".to_owned(),
            ));
        }

        let sum: f64 = row.sum();
        if sum <= 0.0 {
            return Err(Error::InvalidParameter(
                "a row of P sums to zero and cannot be renormalized".to_owned(),
            ));
        }

        if (sum - 1.0).abs() > RENORM_TOLERANCE {
            diag.renormalized();
            row.mapv_inplace(|value| value / sum);
        }
    }

    Ok(())
}

/// Returns the shared ratio `R = P[0, 1] / P[0, 0]`, and warns for any state whose own ratio
/// deviates from `R` by more than [`STRUCTURE_TOLERANCE`].
pub fn shared_ratio(p: &Array2<f64>, diag: &mut Diagnostics) -> f64 {
    let r = p[[0, 1]] / p[[0, 0]];

    for (i, row) in p.rows().into_iter().enumerate().skip(1) {
        let ratio = row[1] / row[0];
        if (ratio - r).abs() > STRUCTURE_TOLERANCE {
            diag.inconsistent_structure(i, ratio, r);
        }
    }

    r
}

fn log_row_zero_inflated(a: f64, pi: f64, p: &Array2<f64>) -> impl Fn(usize) -> f64 + '_ {
    move |i: usize| {
        let p0 = p[[i, 0]];
        (pi * p0.powf(a) + (1.0 - pi)).ln()
    }
}

/// Computes `pem`, the `n x m` per-row, per-state emission matrix.
///
/// For each canonical row (`idx[k] == k`), evaluates the model in log space and then converts to
/// the requested [`OutputMode`]; for every other row, copies the already-computed row at
/// `idx[k]` verbatim so that `pem[k, ..] == pem[idx[k], ..]` bit-for-bit (emission cache
/// soundness).
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if the model's parameters are invalid (see
/// [`EmissionModel`] for the specifics), or if [`OutputMode::Ratio`] is requested for
/// [`EmissionModel::ZeroInflated`].
pub fn evaluate(
    obs: &Observations,
    model: &mut EmissionModel,
    mode: OutputMode,
    include_norm_const: bool,
    diag: &mut Diagnostics,
) -> Result<Array2<f64>> {
    match model {
        EmissionModel::ZeroInflated { a, pi, p } => {
            if *a <= 0.0 || !a.is_finite() {
                return Err(Error::InvalidParameter(format!(
                    "dispersion a must be positive and finite, got {a}"
                )));
            }
            if !(0.0..=1.0).contains(pi) {
                return Err(Error::InvalidParameter(format!(
                    "zero-inflation weight pi must lie in [0, 1], got {pi}"
                )));
            }
            if mode == OutputMode::Ratio {
                return Err(Error::InvalidParameter(
                    "OutputMode::Ratio requires EmissionModel::Mixture".to_owned(),
                ));
            }

            renormalize_rows(p, diag)?;
            let m = p.nrows();
            let zero_log = log_row_zero_inflated(*a, *pi, p);

            evaluate_canonical(obs, m, mode, |k, logrow: &mut [f64]| {
                let row = obs.row(k);
                if row_is_na(row) {
                    logrow.iter_mut().for_each(|value| *value = f64::NAN);
                } else if row_is_zero(row) {
                    for (i, value) in logrow.iter_mut().enumerate() {
                        *value = zero_log(i);
                    }
                } else {
                    for (i, value) in logrow.iter_mut().enumerate() {
                        *value = log_density(row, *a, p.row(i), include_norm_const);
                    }
                }
            })
        }
        EmissionModel::Mixture { theta, p, q } => {
            if mode != OutputMode::Ratio {
                return Err(Error::InvalidParameter(
                    "EmissionModel::Mixture is only evaluated under OutputMode::Ratio".to_owned(),
                ));
            }

            renormalize_rows(p, diag)?;
            renormalize_rows(q, diag)?;
            let m = p.nrows();

            evaluate_canonical(obs, m, mode, |k, logrow: &mut [f64]| {
                let row = obs.row(k);
                if row_is_na(row) {
                    logrow.iter_mut().for_each(|value| *value = f64::NAN);
                    return;
                }

                for i in 0..m {
                    let log_p = log_density(row, *theta, p.row(i), false);
                    let log_q = log_density(row, *theta, q.row(i), false);
                    logrow[i] = 1.0 / (1.0 + (log_q - log_p).exp());
                }
            })
        }
    }
}

/// Shared driver: computes canonical rows via `compute_row`, then fills in duplicate rows by
/// copying, and finally converts every canonical row to the requested `mode`.
fn evaluate_canonical(
    obs: &Observations,
    m: usize,
    mode: OutputMode,
    mut compute_row: impl FnMut(usize, &mut [f64]),
) -> Result<Array2<f64>> {
    let n = obs.n();
    let mut pem = Array2::<f64>::zeros((n, m));

    for k in 0..n {
        if obs.is_canonical(k) {
            let mut logrow = vec![0.0_f64; m];
            compute_row(k, &mut logrow);

            if mode == OutputMode::Ratio {
                pem.row_mut(k)
                    .assign(&ndarray::ArrayView1::from(logrow.as_slice()));
                continue;
            }

            apply_output_mode(&logrow, mode, pem.row_mut(k));
        } else {
            let (rep, current) = (obs.idx()[k], k);
            debug_assert!(rep < current);
            let rep_row = pem.row(rep).to_owned();
            pem.row_mut(current).assign(&rep_row);
        }
    }

    Ok(pem)
}

fn apply_output_mode(logrow: &[f64], mode: OutputMode, mut out: ndarray::ArrayViewMut1<f64>) {
    if logrow.iter().any(|value| value.is_nan()) {
        out.iter_mut()
            .for_each(|value| *value = f64::NAN);
        return;
    }

    match mode {
        OutputMode::Log => {
            for (dst, &src) in out.iter_mut().zip(logrow) {
                *dst = src;
            }
        }
        OutputMode::Lin => {
            for (dst, &src) in out.iter_mut().zip(logrow) {
                *dst = src.exp();
            }
        }
        OutputMode::LinPreferred => {
            let lin: Vec<f64> = logrow.iter().map(|value| value.exp()).collect();
            if lin.iter().all(|&value| value == 0.0) {
                for (dst, &src) in out.iter_mut().zip(logrow) {
                    *dst = src;
                }
            } else {
                for (dst, &src) in out.iter_mut().zip(&lin) {
                    *dst = src;
                }
            }
        }
        OutputMode::Ratio => unreachable!("handled by the caller before converting to linear/log"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn scenario_a() -> (Observations, EmissionModel) {
        let data = array![[10, 0, 0], [10, 0, 0], [0, 0, 0], [0, 5, 1]];
        let obs = Observations::new(data, vec![4]).unwrap();
        let p = array![[0.5, 0.3, 0.2], [0.2, 0.5, 0.3]];
        let model = EmissionModel::ZeroInflated { a: 2.0, pi: 0.5, p };
        (obs, model)
    }

    #[test]
    fn duplicate_row_matches_representative_bitwise() {
        let (obs, mut model) = scenario_a();
        let mut diag = Diagnostics::new();
        let pem = evaluate(&obs, &mut model, OutputMode::Log, false, &mut diag).unwrap();

        assert_eq!(pem.row(0), pem.row(1));
    }

    #[test]
    fn na_row_is_all_nan() {
        let data = array![[10, 0, 0], [10, 0, 0], [-1, 0, 0], [0, 5, 1]];
        let obs = Observations::new(data, vec![4]).unwrap();
        let p = array![[0.5, 0.3, 0.2], [0.2, 0.5, 0.3]];
        let mut model = EmissionModel::ZeroInflated { a: 2.0, pi: 0.5, p };
        let mut diag = Diagnostics::new();
        let pem = evaluate(&obs, &mut model, OutputMode::Log, false, &mut diag).unwrap();

        assert!(pem.row(2).iter().all(|value: &f64| value.is_nan()));
    }

    #[test]
    fn all_zero_row_uses_zero_inflation_branch() {
        let data = array![[0, 0, 0]];
        let obs = Observations::new(data, vec![1]).unwrap();
        let p = array![[0.4, 0.3, 0.3], [0.5, 0.25, 0.25]];
        let mut model = EmissionModel::ZeroInflated {
            a: 1.5,
            pi: 0.3,
            p: p.clone(),
        };
        let mut diag = Diagnostics::new();
        let pem = evaluate(&obs, &mut model, OutputMode::Log, false, &mut diag).unwrap();

        for i in 0..2 {
            let expected = (0.3_f64 * p[[i, 0]].powf(1.5) + 0.7).ln();
            assert!((pem[[0, i]] - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn renormalization_is_warned_once() {
        let data = array![[3, 1, 2], [0, 0, 0]];
        let obs = Observations::new(data, vec![2]).unwrap();
        let p = array![[0.9, 0.6, 0.0], [0.2, 0.2, 0.2]];
        let mut model = EmissionModel::ZeroInflated { a: 1.0, pi: 0.2, p };
        let mut diag = Diagnostics::new();
        evaluate(&obs, &mut model, OutputMode::Log, false, &mut diag).unwrap();

        let renorm_count = diag
            .warnings()
            .iter()
            .filter(|w| matches!(w, crate::error::Warning::Renormalized))
            .count();
        assert_eq!(renorm_count, 1);
    }

    #[test]
    fn mixture_ratio_matches_hand_computed_value() {
        let data = array![[2, 3]];
        let obs = Observations::new(data, vec![1]).unwrap();
        let p = array![[0.4, 0.6]];
        let q = array![[0.3, 0.7]];
        let mut model = EmissionModel::Mixture { theta: 1.5, p, q };
        let mut diag = Diagnostics::new();
        let pem = evaluate(&obs, &mut model, OutputMode::Ratio, false, &mut diag).unwrap();

        // log_p = 1.5*ln(0.4) + 3*ln(0.6), log_q = 1.5*ln(0.3) + 3*ln(0.7);
        // ratio = 1 / (1 + exp(log_q - log_p)).
        let expected = 0.492_268_383_627_034_7;
        assert!((pem[[0, 0]] - expected).abs() < 1e-12);
    }

    #[test]
    fn mixture_ratio_na_row_is_all_nan() {
        let data = array![[-1, 3]];
        let obs = Observations::new(data, vec![1]).unwrap();
        let p = array![[0.4, 0.6]];
        let q = array![[0.3, 0.7]];
        let mut model = EmissionModel::Mixture { theta: 1.5, p, q };
        let mut diag = Diagnostics::new();
        let pem = evaluate(&obs, &mut model, OutputMode::Ratio, false, &mut diag).unwrap();

        assert!(pem.row(0).iter().all(|value: &f64| value.is_nan()));
    }

    #[test]
    fn lin_preferred_falls_back_to_log_on_total_underflow() {
        let data = array![[500, 0]];
        let obs = Observations::new(data, vec![1]).unwrap();
        let p = array![[0.01, 0.99]];
        let mut model = EmissionModel::ZeroInflated { a: 1.0, pi: 0.5, p };
        let mut diag = Diagnostics::new();
        let pem = evaluate(&obs, &mut model, OutputMode::LinPreferred, false, &mut diag).unwrap();

        // log(0.01) * 500 underflows exp() to 0.0, so the row must fall back to log values,
        // i.e. stay negative.
        assert!(pem[[0, 0]] < 0.0);
    }
}
