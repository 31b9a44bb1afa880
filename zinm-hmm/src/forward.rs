//! The normalized forward recursion for a single block.

use ndarray::{Array1, ArrayView1, ArrayView2, ArrayViewMut2};

/// Runs the forward recursion over one block, in place.
///
/// `prob` holds the block's emission rows on entry, in the mixed linear/log convention produced
/// by [`crate::emission::evaluate`] with [`crate::emission::OutputMode::LinPreferred`]: a row is
/// log-space if its first entry is negative, linear-space otherwise. On return, `prob` holds the
/// normalized forward probabilities `alpha`, overwriting the emissions.
///
/// Returns the block's log-likelihood.
#[must_use]
pub fn forward_pass(q: ArrayView2<f64>, init: ArrayView1<f64>, mut prob: ArrayViewMut2<f64>) -> f64 {
    let m = init.len();
    let n_b = prob.nrows();
    let mut loglik = 0.0;
    let mut alpha_prev = Array1::<f64>::zeros(m);

    for k in 0..n_b {
        let tmp = if k == 0 {
            init.to_owned()
        } else {
            // tmp_j = sum_i alpha_{k-1,i} * Q[i,j]
            alpha_prev.dot(&q)
        };

        let row_is_missing = prob.row(k).iter().any(|value| value.is_nan());

        if row_is_missing {
            prob.row_mut(k).assign(&tmp);
            alpha_prev = tmp;
            continue;
        }

        let is_log_space = prob[[k, 0]] < 0.0;

        if is_log_space {
            let max_val = prob.row(k).iter().copied().fold(f64::NEG_INFINITY, f64::max);

            let c: f64 = (0..m)
                .map(|j| tmp[j] * (prob[[k, j]] - max_val).exp())
                .sum();

            if c > 0.0 {
                for j in 0..m {
                    prob[[k, j]] = tmp[j] * (prob[[k, j]] - max_val).exp() / c;
                }
                loglik += max_val + c.ln();
                alpha_prev = prob.row(k).to_owned();
            } else {
                prob.row_mut(k).assign(&tmp);
                alpha_prev = tmp;
            }
        } else {
            let c: f64 = (0..m).map(|j| tmp[j] * prob[[k, j]]).sum();

            if c > 0.0 {
                for j in 0..m {
                    prob[[k, j]] = tmp[j] * prob[[k, j]] / c;
                }
                loglik += c.ln();
                alpha_prev = prob.row(k).to_owned();
            } else {
                // mass collapse: fall back to the missing-emission policy
                prob.row_mut(k).assign(&tmp);
                alpha_prev = tmp;
            }
        }
    }

    loglik
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn normalizes_each_row_to_one() {
        let q = array![[0.9, 0.1], [0.05, 0.95]];
        let init = array![0.5, 0.5];
        let mut prob = array![[0.8, 0.2], [0.3, 0.7], [0.6, 0.4]];

        let loglik = forward_pass(q.view(), init.view(), prob.view_mut());

        assert!(loglik.is_finite());
        for row in prob.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn missing_row_propagates_prediction_only() {
        let q = array![[0.9, 0.1], [0.05, 0.95]];
        let init = array![0.5, 0.5];
        let mut prob = array![[0.8, 0.2], [f64::NAN, f64::NAN], [0.6, 0.4]];

        forward_pass(q.view(), init.view(), prob.view_mut());

        // row 1 (the missing step) must equal the prediction tmp = alpha_0 . Q
        let expected_tmp = array![0.8, 0.2].dot(&q);
        assert!((prob.row(1)[0] - expected_tmp[0]).abs() < 1e-12);
        assert!((prob.row(1)[1] - expected_tmp[1]).abs() < 1e-12);
    }

    #[test]
    fn zero_init_mass_falls_back_gracefully() {
        let q = array![[0.9, 0.1], [0.05, 0.95]];
        let init = array![0.0, 0.0];
        let mut prob = array![[0.8, 0.2]];

        let loglik = forward_pass(q.view(), init.view(), prob.view_mut());

        assert_eq!(loglik, 0.0);
        assert_eq!(prob.row(0)[0], 0.0);
        assert_eq!(prob.row(0)[1], 0.0);
    }

    #[test]
    fn log_space_row_is_handled_like_linear() {
        let q = array![[0.9, 0.1], [0.05, 0.95]];
        let init = array![0.5, 0.5];
        let mut prob_lin = array![[0.8, 0.2]];
        let mut prob_log = array![[0.8_f64.ln(), 0.2_f64.ln()]];

        let ll_lin = forward_pass(q.view(), init.view(), prob_lin.view_mut());
        let ll_log = forward_pass(q.view(), init.view(), prob_log.view_mut());

        assert!((ll_lin - ll_log).abs() < 1e-9);
        assert!((prob_lin[[0, 0]] - prob_log[[0, 0]]).abs() < 1e-9);
    }
}
