//! Runs the forward–backward pair independently over each block and accumulates results.

use crate::backward::backward_pass;
use crate::forward::forward_pass;
use crate::params::HmmParams;
use ndarray::{Array2, ArrayViewMut2};

/// Aggregate output of one full pass of the block driver.
pub struct DriverOutput {
    /// `n x m` state posteriors, block by block.
    pub phi: Array2<f64>,
    /// `m x m` expected transition counts, summed over all positions and all blocks.
    pub t_sum: Array2<f64>,
    /// Total log-likelihood, summed over all blocks.
    pub loglik: f64,
}

/// Runs forward–backward on each block of `pem` independently, resetting forward state to
/// `params.init()` at every block boundary, and accumulates transition counts and
/// log-likelihood across blocks.
///
/// `pem` is overwritten in place with normalized forward alphas (the contract shared with
/// [`forward_pass`]); this function does not update `params`.
pub fn run(params: &HmmParams, block_sizes: &[usize], mut pem: ArrayViewMut2<f64>) -> DriverOutput {
    let m = params.m();
    let n = pem.nrows();

    let mut phi = Array2::<f64>::zeros((n, m));
    let mut t_sum = Array2::<f64>::zeros((m, m));
    let mut loglik = 0.0;

    let mut offset = 0;
    for &size in block_sizes {
        let block_prob = pem.slice_mut(ndarray::s![offset..offset + size, ..]);
        loglik += forward_pass(params.q().view(), params.init().view(), block_prob);

        let block_alpha = pem.slice(ndarray::s![offset..offset + size, ..]);
        let block_phi = phi.slice_mut(ndarray::s![offset..offset + size, ..]);
        backward_pass(params.q().view(), block_alpha, block_phi, &mut t_sum);

        offset += size;
    }

    DriverOutput { phi, t_sum, loglik }
}
