//! The reverse-kernel backward/smoothing pass for a single block.

use ndarray::{Array1, Array2, ArrayView2, ArrayViewMut2};

/// Runs the backward smoother over one block, given its already-normalized forward `alpha`.
///
/// Writes state posteriors into `phi` (`n_b x m`) and accumulates the block's conditional
/// transition posteriors into `t_sum` (`m x m`, added in place so callers can sum over blocks).
///
/// The "reverse kernel" `R[j, i] = alpha_{k,i} * Q[i,j] / sum_i' alpha_{k,i'} * Q[i',j]` gives
/// `P(X_k = i | X_{k+1} = j, Y_1..n)`; when its denominator is zero (no predecessor can reach
/// state `j`), `R[j, ..]` is defined as zero, which is consistent with the forward pass dropping
/// rows whose normalizer collapses to zero.
pub fn backward_pass(q: ArrayView2<f64>, alpha: ArrayView2<f64>, mut phi: ArrayViewMut2<f64>, t_sum: &mut Array2<f64>) {
    let m = q.nrows();
    let n_b = alpha.nrows();

    phi.row_mut(n_b - 1).assign(&alpha.row(n_b - 1));

    for k in (0..n_b.saturating_sub(1)).rev() {
        let alpha_k = alpha.row(k);

        // denom[j] = sum_i alpha_k[i] * Q[i, j]
        let denom: Array1<f64> = alpha_k.dot(&q);

        let phi_next = phi.row(k + 1).to_owned();
        let mut phi_k = Array1::<f64>::zeros(m);

        for j in 0..m {
            if denom[j] <= 0.0 {
                continue;
            }

            for i in 0..m {
                let r_ji = alpha_k[i] * q[[i, j]] / denom[j];
                phi_k[i] += phi_next[j] * r_ji;
                t_sum[[j, i]] += phi_next[j] * r_ji;
            }
        }

        phi.row_mut(k).assign(&phi_k);
    }
}
