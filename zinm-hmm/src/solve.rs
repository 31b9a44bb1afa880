//! A small bracket-then-Newton scalar root finder, shared by the Baum–Welch emission update
//! ([`crate::trainer`]) and (via the public API) any peripheral fit that needs the same kind of
//! one-dimensional solve, such as an initial dispersion fit on a control track.

/// Snapshot of the search state when bracketing gives up without straddling a root.
#[derive(Clone, Copy, Debug)]
pub struct BracketFailure {
    /// Lower bracket endpoint reached before giving up.
    pub lo: f64,
    /// Upper bracket endpoint reached before giving up.
    pub hi: f64,
    /// `f(lo)`.
    pub f_lo: f64,
    /// `f(hi)`.
    pub f_hi: f64,
}

/// Expands `(start, start)` outward, doubling the step each round and clamping to `domain`,
/// until `f` changes sign between the two endpoints.
///
/// # Errors
///
/// Returns [`BracketFailure`] if 64 doublings still leave `f` with the same sign at both
/// endpoints (this also covers the case where the bracket has been clamped to the full domain
/// without finding a sign change).
pub fn bracket(f: impl Fn(f64) -> f64, start: f64, domain: (f64, f64)) -> Result<(f64, f64), BracketFailure> {
    let (dom_lo, dom_hi) = domain;
    let mut lo = start;
    let mut hi = start;
    let mut f_lo = f(lo);
    let mut f_hi = f(hi);
    let mut step = ((dom_hi - dom_lo) * 1e-3).max(1e-9);

    for _ in 0..64 {
        if f_lo * f_hi <= 0.0 {
            return Ok((lo, hi));
        }

        if lo > dom_lo {
            lo = (lo - step).max(dom_lo);
            f_lo = f(lo);
        }
        if hi < dom_hi {
            hi = (hi + step).min(dom_hi);
            f_hi = f(hi);
        }

        if f_lo * f_hi <= 0.0 {
            return Ok((lo, hi));
        }

        if lo <= dom_lo && hi >= dom_hi {
            break;
        }

        step *= 2.0;
    }

    Err(BracketFailure { lo, hi, f_lo, f_hi })
}

/// Refines a root of `f` known to lie in `(lo, hi)` (with `f` of opposite sign at the
/// endpoints) using a safeguarded Newton iteration: at each step, the Newton proposal (using a
/// central-difference derivative) is accepted only if it stays inside the current bracket;
/// otherwise the step falls back to bisection. Stops after `max_iter` iterations or once the
/// bracket width drops below `tol`.
pub fn refine(f: impl Fn(f64) -> f64, lo: f64, hi: f64, max_iter: usize, tol: f64) -> f64 {
    let (mut lo, mut hi) = (lo, hi);
    let mut f_lo = f(lo);

    if f_lo > 0.0 {
        std::mem::swap(&mut lo, &mut hi);
        f_lo = f(lo);
    }
    let _ = f_lo;

    let mut x = 0.5 * (lo + hi);

    for _ in 0..max_iter {
        if (hi - lo).abs() < tol {
            break;
        }

        let h = ((hi - lo).abs() * 1e-6).max(1e-12);
        let fx = f(x);
        let deriv = (f(x + h) - f(x - h)) / (2.0 * h);

        let newton_x = if deriv.abs() > f64::EPSILON {
            x - fx / deriv
        } else {
            f64::NAN
        };

        x = if newton_x.is_finite() && newton_x > lo && newton_x < hi {
            newton_x
        } else {
            0.5 * (lo + hi)
        };

        let fx_new = f(x);
        if fx_new < 0.0 {
            lo = x;
        } else {
            hi = x;
        }
    }

    x
}
