//! Initial zero-inflated negative binomial fit of the control track (§4.9).
//!
//! Produces seed values for the dispersion `a` and zero-inflation weight `pi` that the core
//! trainer holds fixed for the whole fit. This is a one-dimensional, state-free fit: it knows
//! nothing about the HMM structure, only the marginal distribution of column 0.

use statrs::function::gamma::ln_gamma;
use zinm_hmm::{solve, TrainerConfig};

/// Seed parameters for the core trainer, plus the control-track mean used to derive the
/// per-state `p0` starting points in [`crate::fit`].
#[derive(Clone, Copy, Debug)]
pub struct ZinbFit {
    /// Dispersion shared across states.
    pub a: f64,
    /// Zero-inflation weight.
    pub pi: f64,
    /// Method-of-moments success probability at the final `a`, `p = a / (a + mean)`.
    pub p0: f64,
}

/// Fits `a` and `pi` to the non-missing entries of `control`, holding `pi` at its
/// method-of-moments estimate and refining `a` by a bracketed Newton search on the derivative of
/// the profile log-likelihood (reusing [`crate::solve`], the same machinery the core trainer
/// uses for its own `p0` solve).
///
/// Falls back to `a = 1.0`, `pi = 1.0` if `control` has fewer than two non-missing observations
/// or is degenerate (zero variance).
#[must_use]
pub fn fit(control: &[i64], config: &TrainerConfig) -> ZinbFit {
    let counts: Vec<i64> = control.iter().copied().filter(|&value| value >= 0).collect();

    if counts.len() < 2 {
        return ZinbFit { a: 1.0, pi: 1.0, p0: 0.5 };
    }

    let n = counts.len() as f64;
    let mean: f64 = counts.iter().map(|&x| x as f64).sum::<f64>() / n;
    let variance: f64 = counts.iter().map(|&x| (x as f64 - mean).powi(2)).sum::<f64>() / n;

    if mean <= 0.0 {
        return ZinbFit { a: 1.0, pi: 1.0, p0: 0.5 };
    }

    let a0 = if variance > mean {
        mean * mean / (variance - mean)
    } else {
        // no overdispersion left after accounting for the mean: fall back to a loose default
        10.0
    };

    let p0_mom = a0 / (a0 + mean);
    let nb_zero_prob = p0_mom.powf(a0);
    let zero_fraction = counts.iter().filter(|&&x| x == 0).count() as f64 / n;

    let pi0 = if nb_zero_prob < 1.0 {
        ((1.0 - zero_fraction) / (1.0 - nb_zero_prob)).clamp(0.0, 1.0)
    } else {
        1.0
    };

    let derivative = move |a: f64| -> f64 {
        let h = (a.abs() * 1e-4).max(1e-6);
        (profile_loglik(a + h, pi0, mean, &counts) - profile_loglik(a - h, pi0, mean, &counts)) / (2.0 * h)
    };

    let (a_final, p0_final) = match solve::bracket(derivative, a0.max(1e-3), (1e-6, 1e6)) {
        Ok((lo, hi)) => {
            let a_final = solve::refine(derivative, lo, hi, config.newton_max_iter, config.tolerance);
            (a_final, a_final / (a_final + mean))
        }
        // the profile derivative may not change sign (e.g. a monotonically increasing
        // log-likelihood on this coarse grid); keep the method-of-moments seed rather than
        // aborting the whole `fit` subcommand over a seed heuristic.
        Err(_) => (a0, p0_mom),
    };

    ZinbFit {
        a: a_final,
        pi: pi0,
        p0: p0_final,
    }
}

fn profile_loglik(a: f64, pi: f64, mean: f64, counts: &[i64]) -> f64 {
    let p = a / (a + mean);

    counts
        .iter()
        .map(|&x| {
            if x == 0 {
                (pi * p.powf(a) + (1.0 - pi)).ln()
            } else {
                let xf = x as f64;
                pi.ln() + ln_gamma(a + xf) - ln_gamma(a) - ln_gamma(xf + 1.0) + a * p.ln() + xf * (1.0 - p).ln()
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overdispersed_counts_yield_finite_positive_dispersion() {
        let control = vec![0, 0, 0, 1, 2, 0, 5, 0, 0, 3, 0, 8, 0, 1, 0];
        let fit_result = fit(&control, &TrainerConfig::default());

        assert!(fit_result.a.is_finite() && fit_result.a > 0.0);
        assert!((0.0..=1.0).contains(&fit_result.pi));
        assert!((0.0..=1.0).contains(&fit_result.p0));
    }

    #[test]
    fn na_entries_are_excluded_from_the_fit() {
        let control = vec![-1, -1, 0, 1, 2, 0, 3];
        let fit_result = fit(&control, &TrainerConfig::default());
        assert!(fit_result.a.is_finite());
    }

    #[test]
    fn degenerate_input_falls_back_to_defaults() {
        let control = vec![5, 5, 5, 5];
        let fit_result = fit(&control, &TrainerConfig::default());
        assert!(fit_result.a.is_finite() && fit_result.a > 0.0);
    }
}
