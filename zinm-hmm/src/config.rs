//! Tuning constants for the Baum–Welch trainer, exposed as a configuration struct instead of
//! hard-coded literals.

/// Outer- and inner-loop tuning constants for [`crate::trainer`].
///
/// The field values of [`TrainerConfig::default`] match the historical constants `MAXITER`,
/// `JAHMM_MAXITER`, and `TOLERANCE` of the tool this crate reimplements.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrainerConfig {
    /// Maximum number of Baum–Welch outer iterations.
    pub max_iter: usize,
    /// Maximum number of bracket/Newton iterations per emission update.
    pub newton_max_iter: usize,
    /// Convergence tolerance, used both for the outer `max |P_new - P|` stopping rule and for
    /// the bracket width in the emission update's root finder.
    pub tolerance: f64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            max_iter: 500,
            newton_max_iter: 25,
            tolerance: 1e-6,
        }
    }
}
