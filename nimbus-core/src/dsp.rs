//! Generic DSP utilities and math helpers.
//!
//! Design goals:
//! - `no_std` ready (guarded by the crate feature `no-std`)
//! - Math backend selection that works in both `std` and `no_std` contexts
//! - Clean, side-effect free helpers that are easy to test
//!
//! Conventions:
//! - All functions are `#[inline]` where useful to help the optimizer.
//! - Argument and return domains are documented per function.

#![allow(clippy::excessive_precision)]

use core::f32::consts::PI;

use cfg_if::cfg_if;

// ----------------------------- Math backend selection -----------------------------

cfg_if! {
    // libm (C math) in no_std
    if #[cfg(feature = "no-std")] {
        #[inline] fn m_exp(x: f32) -> f32 { libm::expf(x) }
    // std backend
    } else {
        #[inline] fn m_exp(x: f32) -> f32 { x.exp() }
    }
}

// --------------------------------- Constants -------------------------------------

/// A very small epsilon used in denormal handling and safe divisions.
pub const EPS_SMALL: f32 = 1.0e-20;

// --------------------------------- Utilities -------------------------------------

/// Clamp `x` into `[lo, hi]`.
#[inline]
pub fn clamp(x: f32, lo: f32, hi: f32) -> f32 {
    if x < lo {
        lo
    } else if x > hi {
        hi
    } else {
        x
    }
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Kill denormal/subnormal values. Returns 0.0 if |x| < EPS_SMALL.
#[inline]
pub fn kill_denormals(x: f32) -> f32 {
    if x.abs() < EPS_SMALL {
        0.0
    } else {
        x
    }
}

// --------------------------------- Smoothing coefficients -------------------------

/// One-pole smoothing coefficient for a time constant `t_sec` (seconds).
///
/// The discrete one-pole form: `y[n] += (1 - a) * (x[n] - y[n])`
/// where `a = exp(-1/(tau * sr))` for a first-order lag with time constant `tau`.
///
/// `t_sec` is the time to reach ~63% (1 - 1/e). Common for parameter smoothing.
#[inline]
pub fn one_pole_coeff_sec(t_sec: f32, sr: f32) -> f32 {
    if t_sec <= 0.0 {
        return 0.0;
    }
    m_exp(-1.0 / (t_sec * sr.max(1.0)))
}

/// Convert cutoff in Hz to a simple one-pole coefficient, `exp(-2π fc / sr)`.
/// Same `y += (1 - a) * (x - y)` form; a lightweight "RC" style discretization.
#[inline]
pub fn one_pole_coeff_hz(cut_hz: f32, sr: f32) -> f32 {
    let sr = sr.max(1.0);
    let fc = cut_hz.max(0.0).min(0.499 * sr);
    m_exp(-2.0 * PI * fc / sr)
}

// --------------------------------- Tests (std only) ------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_saturates_both_ends() {
        assert_eq!(clamp(-0.5, 0.0, 1.0), 0.0);
        assert_eq!(clamp(1.5, 0.0, 1.0), 1.0);
        assert_eq!(clamp(0.4, 0.0, 1.0), 0.4);
    }

    #[test]
    fn one_pole_coeff_bounds() {
        let sr = 48_000.0;
        let a = one_pole_coeff_sec(2.0, sr);
        assert!(a > 0.999 && a < 1.0, "a={a}");
        // zero time constant means no smoothing at all
        assert_eq!(one_pole_coeff_sec(0.0, sr), 0.0);
    }

}
