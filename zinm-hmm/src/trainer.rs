//! The Baum–Welch outer loop: alternates block driver calls with closed-form/bracketed-Newton
//! parameter re-estimation.

use crate::config::TrainerConfig;
use crate::driver;
use crate::emission::{self, row_is_na, row_is_zero, shared_ratio, EmissionModel, OutputMode};
use crate::error::{Diagnostics, Error, Result};
use crate::observations::Observations;
use crate::params::HmmParams;
use crate::solve;
use ndarray::Array2;

/// Everything a caller needs after a completed (or `max_iter`-truncated) fit.
pub struct FitOutput {
    /// Number of outer iterations actually run (may be less than `config.max_iter` if the fit
    /// converged early).
    pub iterations: usize,
    /// Total log-likelihood from the last completed block-driver pass.
    pub loglik: f64,
    /// `n x m` state posteriors from the last completed block-driver pass.
    pub phi: Array2<f64>,
    /// `n x m` log-space emissions recomputed from the final parameters.
    pub pem: Array2<f64>,
    /// Warnings accumulated across every iteration of the fit.
    pub diagnostics: Diagnostics,
}

/// Runs Baum–Welch to convergence (or `config.max_iter`), updating `params` and `model` in
/// place and returning the final posteriors, log-likelihood, and emissions.
///
/// `a` and `pi` are read once from `model` and held fixed for the whole fit, per the design note
/// that the trainer never re-estimates the dispersion or zero-inflation weight. The shared ratio
/// `R = P[i,1] / P[i,0]` is likewise fixed from `model`'s starting `P` before the first
/// iteration and is not recomputed from the updated `P` at each step, even though the update
/// rule reproduces it exactly by construction.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if `model` is [`EmissionModel::Mixture`] (the trainer
/// only fits [`EmissionModel::ZeroInflated`]). Returns [`Error::BracketingFailed`] if the
/// emission update's root finder cannot bracket `p0` for some state; in that case `params` and
/// `model` retain the values from the last successfully completed iteration.
pub fn fit(obs: &Observations, params: &mut HmmParams, model: &mut EmissionModel, config: &TrainerConfig) -> Result<FitOutput> {
    let (a, pi) = match model {
        EmissionModel::ZeroInflated { a, pi, .. } => (*a, *pi),
        EmissionModel::Mixture { .. } => {
            return Err(Error::InvalidParameter(
                "the trainer only fits EmissionModel::ZeroInflated".to_owned(),
            ))
        }
    };

    let mut diagnostics = Diagnostics::new();
    let r_ratio = match model {
        EmissionModel::ZeroInflated { p, .. } => shared_ratio(p, &mut diagnostics),
        EmissionModel::Mixture { .. } => unreachable!("checked above"),
    };
    let c = 1.0 + r_ratio;

    let m = params.m();
    let r = obs.tracks();
    let zero_row = obs.zero_row();

    let mut loglik = 0.0;
    let mut phi = Array2::<f64>::zeros((obs.n(), m));
    let mut iterations = 0;

    for iter in 0..config.max_iter {
        iterations = iter + 1;

        let mut pem = emission::evaluate(obs, model, OutputMode::LinPreferred, false, &mut diagnostics)?;

        let p_old = match model {
            EmissionModel::ZeroInflated { p, .. } => p.clone(),
            EmissionModel::Mixture { .. } => unreachable!("checked above"),
        };

        let driver_out = driver::run(params, obs.block_sizes(), pem.view_mut());
        loglik = driver_out.loglik;
        phi = driver_out.phi;

        let q_new = update_transition(params.q(), &driver_out.t_sum, m);

        let p_new = update_emission(obs, &phi, zero_row, m, r, a, pi, r_ratio, c, config)?;

        let max_diff = p_new
            .iter()
            .zip(p_old.iter())
            .fold(0.0_f64, |acc, (new, old)| acc.max((new - old).abs()));

        *params.q_mut() = q_new;
        if let EmissionModel::ZeroInflated { p, .. } = model {
            *p = p_new;
        }

        if max_diff < config.tolerance {
            break;
        }
    }

    let pem = emission::evaluate(obs, model, OutputMode::Log, false, &mut diagnostics)?;

    Ok(FitOutput {
        iterations,
        loglik,
        phi,
        pem,
        diagnostics,
    })
}

/// `Q[i,j] = T_sum[i,j] / sum_j T_sum[i,j]`; a row whose sum is zero (unvisited state) retains
/// its previous row rather than producing NaN.
fn update_transition(q_old: &Array2<f64>, t_sum: &Array2<f64>, m: usize) -> Array2<f64> {
    let mut q_new = Array2::<f64>::zeros((m, m));

    for i in 0..m {
        let row_sum: f64 = t_sum.row(i).sum();

        if row_sum > 0.0 {
            for j in 0..m {
                q_new[[i, j]] = t_sum[[i, j]] / row_sum;
            }
        } else {
            q_new.row_mut(i).assign(&q_old.row(i));
        }
    }

    q_new
}

/// Re-estimates `P` one state at a time, bracketing and refining `p0` per the scalar equation of
/// §4.7 and reconstructing the rest of the row from the fixed ratio `R` and the bucketed sums.
#[allow(clippy::too_many_arguments)]
fn update_emission(
    obs: &Observations,
    phi: &Array2<f64>,
    zero_row: Option<usize>,
    m: usize,
    r: usize,
    a: f64,
    pi: f64,
    r_ratio: f64,
    c: f64,
    config: &TrainerConfig,
) -> Result<Array2<f64>> {
    let mut p_new = Array2::<f64>::zeros((m, r + 1));

    for i in 0..m {
        let mut a_sum = 0.0;
        let mut b_sum = 0.0;
        let mut d_sum = 0.0;
        let mut ystar = vec![0.0_f64; r + 1];

        for k in 0..obs.n() {
            let row = obs.row(k);
            if row_is_na(row) {
                continue;
            }

            let phi_ki = phi[[k, i]];
            let in_zero_bucket = zero_row.is_some_and(|z| obs.idx()[k] == z) && row_is_zero(row);

            if in_zero_bucket {
                b_sum += phi_ki;
            } else {
                a_sum += phi_ki;
                d_sum += phi_ki * row[0] as f64;
                for j in 1..=r {
                    ystar[j] += phi_ki * row[j] as f64;
                }
            }
        }

        let e_sum: f64 = ystar[1..=r].iter().sum();

        let denom = move |p0: f64| -> f64 {
            (d_sum + a * a_sum) / p0 + b_sum * pi * a * p0.powf(a - 1.0) / (pi * p0.powf(a) + (1.0 - pi))
        };

        let f = move |p0: f64| -> f64 { p0 + e_sum / denom(p0) - 1.0 / c };

        let (lo, hi) = solve::bracket(f, 0.5, (1e-9, 1.0 - 1e-9)).map_err(|failure| Error::BracketingFailed {
            state: i,
            f_lo: failure.f_lo,
            f_hi: failure.f_hi,
        })?;

        let p0 = solve::refine(f, lo, hi, config.newton_max_iter, config.tolerance);

        p_new[[i, 0]] = p0;
        if r >= 1 {
            p_new[[i, 1]] = p0 * r_ratio;
        }
        for j in 2..=r {
            p_new[[i, j]] = ystar[j] / denom(p0) / c;
        }
    }

    Ok(p_new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn toy_fixture() -> (Observations, HmmParams, EmissionModel) {
        let data = array![
            [10, 0, 0],
            [10, 0, 0],
            [9, 1, 0],
            [0, 0, 0],
            [0, 6, 2],
            [0, 5, 3],
            [8, 0, 1],
            [0, 6, 2],
        ];
        let obs = Observations::new(data, vec![8]).unwrap();

        let q = array![[0.8, 0.2], [0.2, 0.8]];
        let init = array![0.5, 0.5];
        let params = HmmParams::new(q, init).unwrap();

        let p = array![[0.6, 0.3, 0.1], [0.2, 0.1, 0.7]];
        let model = EmissionModel::ZeroInflated { a: 2.0, pi: 0.5, p };

        (obs, params, model)
    }

    #[test]
    fn fit_converges_with_row_stochastic_outputs() {
        let (obs, mut params, mut model) = toy_fixture();
        let config = TrainerConfig::default();

        let output = fit(&obs, &mut params, &mut model, &config).unwrap();

        assert!(output.iterations <= config.max_iter);
        assert!(output.loglik.is_finite());

        for row in params.q().rows() {
            assert!((row.sum() - 1.0).abs() < 1e-6);
        }

        if let EmissionModel::ZeroInflated { p, .. } = &model {
            for row in p.rows() {
                assert!((row.sum() - 1.0).abs() < 1e-6);
            }
        } else {
            panic!("model must remain ZeroInflated");
        }
    }

    #[test]
    fn max_iter_truncates_without_producing_invalid_parameters() {
        let (obs, mut params, mut model) = toy_fixture();
        let config = TrainerConfig {
            max_iter: 1,
            ..TrainerConfig::default()
        };

        let output = fit(&obs, &mut params, &mut model, &config).unwrap();
        assert_eq!(output.iterations, 1);

        for row in params.q().rows() {
            assert!((row.sum() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn mixture_model_is_rejected() {
        let (obs, mut params, _) = toy_fixture();
        let mut mixture = EmissionModel::Mixture {
            theta: 1.0,
            p: array![[0.5, 0.3, 0.2], [0.3, 0.3, 0.4]],
            q: array![[0.4, 0.3, 0.3], [0.3, 0.3, 0.4]],
        };
        let config = TrainerConfig::default();

        assert!(fit(&obs, &mut params, &mut mixture, &config).is_err());
    }
}
