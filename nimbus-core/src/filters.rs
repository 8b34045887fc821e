//! Filters: the one-pole low-pass used by the weather texture voices.
//!
//! Goals
//! - `no_std`-friendly, allocation free
//! - Stable under continuous cutoff modulation
//!
//! `OnePoleLP` uses the inexpensive `y += a * (x - y)` form, where
//! `a = 1 - exp(-2π fc / sr)`. Not bilinear-matched; great for parameter
//! smoothing and the gentle broadband shaping the weather textures need.

use crate::dsp::{kill_denormals, one_pole_coeff_hz};

/// One-pole low-pass `y += a * (x - y)`.
///
/// `a` is derived from cutoff (Hz) and sample rate:
/// `a = 1 - exp(-2π * fc / sr)`.
#[derive(Copy, Clone, Debug)]
pub struct OnePoleLP {
    a: f32,
    y: f32,
    sr: f32,
    fc: f32,
}

impl OnePoleLP {
    /// Create a low-pass with cutoff `cut_hz` and sample rate `sr`.
    #[inline]
    pub fn new(cut_hz: f32, sr: f32) -> Self {
        let mut s = Self {
            a: 0.0,
            y: 0.0,
            sr: sr.max(1.0),
            fc: cut_hz.max(0.0),
        };
        s.update_coeffs();
        s
    }

    #[inline]
    pub fn set_sample_rate(&mut self, sr: f32) {
        self.sr = sr.max(1.0);
        self.update_coeffs();
    }

    #[inline]
    pub fn set_cutoff_hz(&mut self, cut_hz: f32) {
        self.fc = cut_hz.max(0.0);
        self.update_coeffs();
    }

    #[inline]
    pub fn cutoff_hz(&self) -> f32 {
        self.fc
    }

    #[inline]
    fn update_coeffs(&mut self) {
        let exp_term = one_pole_coeff_hz(self.fc, self.sr); // = exp(-2π fc / sr)
        self.a = 1.0 - exp_term;
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        self.y += self.a * (x - self.y);
        kill_denormals(self.y)
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.y
    }
}

// ------------------------------------ Tests --------------------------------------
