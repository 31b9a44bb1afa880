//! Transition/initial-distribution parameters shared by every inference call.

use crate::error::{Error, Result};
use ndarray::{Array1, Array2};

const ROW_SUM_TOLERANCE: f64 = 1e-6;

/// The Markov-chain half of an HMM fit: state count, transition matrix, and initial
/// distribution. Emission parameters live separately in [`crate::emission::EmissionModel`]
/// because the trainer updates them by a different rule.
#[derive(Clone, Debug, PartialEq)]
pub struct HmmParams {
    q: Array2<f64>,
    init: Array1<f64>,
}

impl HmmParams {
    /// Builds a validated [`HmmParams`].
    ///
    /// Per the design note on initial `Q`/`p`: callers MUST supply a valid, row-stochastic
    /// starting point. The historical zero-initialized starting point (`Q = {0}`) is rejected
    /// here as `Error::InvalidParameter` rather than silently accepted, since it underflows the
    /// forward pass on the very first step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `q` is not square, its shape does not match
    /// `init`'s length, any entry is `NaN` or negative, or any row of `q` (or `init` itself) does
    /// not sum to 1 within [`ROW_SUM_TOLERANCE`].
    pub fn new(q: Array2<f64>, init: Array1<f64>) -> Result<Self> {
        let m = init.len();

        if q.nrows() != m || q.ncols() != m {
            return Err(Error::InvalidParameter(format!(
                "Q must be {m}x{m} to match init's length, got {:?}",
                q.dim()
            )));
        }

        if q.iter().any(|&value| !value.is_finite() || value < 0.0) {
            return Err(Error::InvalidParameter(
                "Q must contain only finite, non-negative entries".to_owned(),
            ));
        }
        if init.iter().any(|&value| !value.is_finite() || value < 0.0) {
            return Err(Error::InvalidParameter(
                "init must contain only finite, non-negative entries".to_owned(),
            ));
        }

        for (i, row) in q.rows().into_iter().enumerate() {
            let sum: f64 = row.sum();
            if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
                return Err(Error::InvalidParameter(format!(
                    "row {i} of Q sums to {sum}, expected 1"
                )));
            }
        }

        let init_sum: f64 = init.sum();
        if (init_sum - 1.0).abs() > ROW_SUM_TOLERANCE {
            return Err(Error::InvalidParameter(format!(
                "init sums to {init_sum}, expected 1"
            )));
        }

        Ok(Self { q, init })
    }

    /// Number of states.
    #[must_use]
    pub fn m(&self) -> usize {
        self.init.len()
    }

    /// The `m x m` row-stochastic transition matrix.
    #[must_use]
    pub fn q(&self) -> &Array2<f64> {
        &self.q
    }

    /// Mutable access to `Q`, used by the trainer to commit a re-estimated matrix. Does not
    /// re-validate; callers are expected to hand back a row-stochastic matrix (the trainer's own
    /// update rule guarantees this, see [`crate::trainer`]).
    pub fn q_mut(&mut self) -> &mut Array2<f64> {
        &mut self.q
    }

    /// The length-`m` initial distribution.
    #[must_use]
    pub fn init(&self) -> &Array1<f64> {
        &self.init
    }
}
