#![cfg_attr(not(feature = "std"), no_std)]
//! Nimbus Core — no_std-ready DSP primitives for the ambient-audio engine.
//!
//! Features
//! - `std`    : (default) use the Rust standard library
//! - `no-std` : build with `#![no_std]` and use `libm` as the math backend
//!
//! Modules
//! - [`dsp`]     : math backend, utils (clamp, lerp, smoothing coefficients)
//! - [`filters`] : one-pole low-pass used for the weather textures
//! - [`glide`]   : parameter interpolation primitives (glide-to-target, linear ramp)
//!
//! Design
//! - No heap allocations; pure sample-by-sample primitives
//! - Every continuous parameter change goes through [`glide`] — discontinuous
//!   gain or cutoff writes are audible as clicks and are not offered here
//! - Friendly to realtime audio callbacks

pub mod dsp;
pub mod filters;
pub mod glide;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::dsp::{clamp, kill_denormals, lerp, one_pole_coeff_sec};
    pub use crate::filters::OnePoleLP;
    pub use crate::glide::{GlideParam, LinearRamp};
}

#[cfg(test)]
mod smoke {

    #[test]
    fn prelude_exists() {
        use crate::prelude::*;
        let _ = clamp(1.3, 0.0, 1.0);
        let mut lp = OnePoleLP::new(600.0, 48_000.0);
        let _ = lp.process(0.1);
        let mut g = GlideParam::new(0.0, 2.0, 48_000.0);
        g.set_target(1.0);
        let _ = g.next();
    }
}
