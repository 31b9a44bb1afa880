//! Error and non-fatal diagnostic types shared by every module in this crate.

use thiserror::Error;

/// Catch-all error for this crate.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    /// A structural or numerical parameter is invalid: a `NaN` or negative entry in `Q`,
    /// `init`, or `P`, a non-positive dispersion `a`, a zero-inflation weight outside `[0, 1]`,
    /// a `P` row that sums to zero, or block sizes that do not sum to the row count of `Y`.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// The emission update's root finder could not bracket a sign change of `f(p0)` in `(0, 1)`
    /// for the given state. The fit is aborted; parameters from the last completed iteration are
    /// not overwritten.
    #[error("failed to bracket p0 for state {state}: f(lo)={f_lo}, f(hi)={f_hi}")]
    BracketingFailed {
        /// Index of the state whose emission update failed.
        state: usize,
        /// Value of `f` at the lower bracket endpoint when bracketing gave up.
        f_lo: f64,
        /// Value of `f` at the upper bracket endpoint when bracketing gave up.
        f_hi: f64,
    },
}

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// A non-fatal condition raised while evaluating emissions or training.
///
/// Unlike the historical C implementation this crate is based on, which kept a single
/// process-global "already warned" flag, warnings are collected into a per-call [`Diagnostics`]
/// value so that library use is reentrant and thread-safe.
#[derive(Clone, Debug, PartialEq)]
pub enum Warning {
    /// One or more rows of `P` did not sum to 1 and were renormalized in place. Emitted at most
    /// once per call regardless of how many rows were affected.
    Renormalized,
    /// `P[state, 1] / P[state, 0]` differs from the shared ratio `R` (taken from state 0) by
    /// more than `1e-3`. The trainer still enforces the ratio constraint in its own updates; this
    /// only flags that the caller-supplied starting point was inconsistent.
    InconsistentStructure {
        /// Index of the state whose ratio deviates.
        state: usize,
        /// The state's own `P[state, 1] / P[state, 0]`.
        ratio: f64,
        /// The shared ratio `R`, taken from state 0.
        expected: f64,
    },
}

/// Accumulates [`Warning`]s raised during a single evaluator or trainer call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
    renormalized: bool,
}

impl Diagnostics {
    /// Returns a fresh, empty diagnostics accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that at least one row of `P` needed renormalization. Idempotent: subsequent calls
    /// within the same [`Diagnostics`] do not push duplicate warnings.
    pub fn renormalized(&mut self) {
        if !self.renormalized {
            self.renormalized = true;
            self.warnings.push(Warning::Renormalized);
        }
    }

    /// Records a structural-ratio inconsistency for `state`.
    pub fn inconsistent_structure(&mut self, state: usize, ratio: f64, expected: f64) {
        self.warnings.push(Warning::InconsistentStructure {
            state,
            ratio,
            expected,
        });
    }

    /// Returns the warnings collected so far, in emission order.
    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Returns `true` if no warnings were collected.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}
