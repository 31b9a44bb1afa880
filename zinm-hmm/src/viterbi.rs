//! Log-space Viterbi decoder.

use crate::error::{Error, Result};
use crate::params::HmmParams;
use ndarray::{Array1, Array2, ArrayView2};

/// Decodes the most likely state path for every block, independently, in log space.
///
/// `prob` accepts either representation produced by [`crate::emission::evaluate`]: a row is
/// treated as log-space if its first entry is negative, and converted with `ln` otherwise. A row
/// that is all-NaN, or whose values are all `-inf` once converted to log space, is replaced with
/// zeros so that the step contributes only the transition term (the same NA policy as the
/// forward pass, expressed in log space).
///
/// Ties in the `max_i` backpointer search are broken in favor of the lowest index.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if `Q` or `init` contains a `NaN` entry.
pub fn viterbi(params: &HmmParams, block_sizes: &[usize], prob: ArrayView2<f64>) -> Result<Vec<usize>> {
    let m = params.m();
    let n = prob.nrows();

    if params.q().iter().any(|value| value.is_nan()) || params.init().iter().any(|value| value.is_nan()) {
        return Err(Error::InvalidParameter(
            "Q and init must not contain NaN for Viterbi decoding".to_owned(),
        ));
    }

    let log_q = params.q().mapv(f64::ln);
    let log_init = params.init().mapv(f64::ln);

    let mut path = vec![0usize; n];
    let mut offset = 0;

    for &size in block_sizes {
        let block_path = viterbi_block(&log_q, &log_init, prob.slice(ndarray::s![offset..offset + size, ..]), m);
        path[offset..offset + size].copy_from_slice(&block_path);
        offset += size;
    }

    Ok(path)
}

fn log_row(prob: ArrayView2<f64>, k: usize, m: usize) -> Vec<f64> {
    let row = prob.row(k);
    let mut log_row: Vec<f64> = if row[0] < 0.0 {
        row.to_vec()
    } else {
        row.iter().map(|value| value.ln()).collect()
    };

    let degenerate = log_row.iter().all(|value| value.is_nan() || *value == f64::NEG_INFINITY);
    if degenerate {
        log_row = vec![0.0; m];
    }

    log_row
}

fn viterbi_block(log_q: &Array2<f64>, log_init: &Array1<f64>, prob: ArrayView2<f64>, m: usize) -> Vec<usize> {
    let n_b = prob.nrows();
    let mut backptr = Array2::<usize>::zeros((n_b, m));
    let mut oldmax = vec![0.0; m];
    let mut newmax = vec![0.0; m];

    let first_log = log_row(prob, 0, m);
    for j in 0..m {
        newmax[j] = log_init[j] + first_log[j];
    }

    for k in 1..n_b {
        std::mem::swap(&mut oldmax, &mut newmax);
        let log_prob_k = log_row(prob, k, m);

        for j in 0..m {
            let mut best_i = 0;
            let mut best_val = f64::NEG_INFINITY;
            for i in 0..m {
                let val = oldmax[i] + log_q[[i, j]];
                if val > best_val {
                    best_val = val;
                    best_i = i;
                }
            }
            backptr[[k, j]] = best_i;
            newmax[j] = best_val + log_prob_k[j];
        }
    }

    let mut last_state = 0;
    let mut last_val = f64::NEG_INFINITY;
    for j in 0..m {
        if newmax[j] > last_val {
            last_val = newmax[j];
            last_state = j;
        }
    }

    let mut path = vec![0usize; n_b];
    path[n_b - 1] = last_state;
    for k in (1..n_b).rev() {
        path[k - 1] = backptr[[k, path[k]]];
    }

    path
}
