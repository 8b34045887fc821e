//! Parameter interpolation primitives.
//!
//! Every continuous control in the engine (bus gains, voice gains, filter
//! cutoffs, fades) is expressed as "current value + target value + motion
//! law" and advanced one sample at a time. Retargeting only overwrites the
//! target field, so concurrent retargets always converge to the last-set
//! value and never produce a discontinuity in the output.
//!
//! Provided:
//! - `GlideParam`  : exponential (RC-like) approach toward the target
//! - `LinearRamp`  : constant-rate linear ramp toward the target

use crate::dsp::one_pole_coeff_sec;

/// Exponential glide toward a target: `y += (target - y) * (1 - a)`,
/// with `a = exp(-1/(t_sec * sr))`.
///
/// A retarget while a glide is in flight simply re-bases the curve from the
/// current instantaneous value; nothing is queued.
#[derive(Copy, Clone, Debug)]
pub struct GlideParam {
    a: f32, // alpha (closer to 1 → slower)
    y: f32,
    target: f32,
}

impl GlideParam {
    /// Start at `initial` with a glide time constant of `t_sec` seconds.
    #[inline]
    pub fn new(initial: f32, t_sec: f32, sr: f32) -> Self {
        Self {
            a: one_pole_coeff_sec(t_sec, sr),
            y: initial,
            target: initial,
        }
    }

    #[inline]
    pub fn set_time_sec(&mut self, t_sec: f32, sr: f32) {
        self.a = one_pole_coeff_sec(t_sec, sr);
    }

    /// Retarget; the current value is left untouched.
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Hard-set both value and target (initialization only, never mid-stream).
    #[inline]
    pub fn reset(&mut self, value: f32) {
        self.y = value;
        self.target = value;
    }

    /// Advance one sample and return the interpolated value.
    #[inline]
    pub fn next(&mut self) -> f32 {
        self.y += (self.target - self.y) * (1.0 - self.a);
        self.y
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }
}

/// Constant-rate linear ramp toward a target, parameterized by the time a
/// full-scale (0→1) traversal should take.
#[derive(Copy, Clone, Debug)]
pub struct LinearRamp {
    step: f32, // per-sample increment for a 0→1 traversal
    y: f32,
    target: f32,
}

impl LinearRamp {
    /// `full_scale_sec` is the duration of a 0→1 (or 1→0) traversal.
    #[inline]
    pub fn new(initial: f32, full_scale_sec: f32, sr: f32) -> Self {
        Self {
            step: ramp_step(full_scale_sec, sr),
            y: initial,
            target: initial,
        }
    }

    #[inline]
    pub fn set_time_sec(&mut self, full_scale_sec: f32, sr: f32) {
        self.step = ramp_step(full_scale_sec, sr);
    }

    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    #[inline]
    pub fn reset(&mut self, value: f32) {
        self.y = value;
        self.target = value;
    }

    /// Advance one sample and return the ramped value. Settles exactly on the
    /// target within the configured traversal time: float accumulation can
    /// land a hair short of it, so anything within half a step snaps.
    #[inline]
    pub fn next(&mut self) -> f32 {
        if self.y < self.target {
            self.y += self.step;
            if self.target - self.y < 0.5 * self.step {
                self.y = self.target;
            }
        } else if self.y > self.target {
            self.y -= self.step;
            if self.y - self.target < 0.5 * self.step {
                self.y = self.target;
            }
        }
        self.y
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// True once the ramp has settled on its target.
    #[inline]
    pub fn done(&self) -> bool {
        self.y == self.target
    }
}

#[inline]
fn ramp_step(full_scale_sec: f32, sr: f32) -> f32 {
    if full_scale_sec <= 0.0 {
        1.0
    } else {
        1.0 / (full_scale_sec * sr.max(1.0))
    }
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glide_moves_towards_target() {
        let sr = 48_000.0;
        let mut g = GlideParam::new(0.0, 0.05, sr);
        g.set_target(1.0);
        for _ in 0..(sr as usize) {
            g.next();
        }
        assert!(g.value() > 0.99, "v={}", g.value());
    }

    #[test]
    fn glide_retarget_rebases_from_current_value() {
        let sr = 48_000.0;
        let mut g = GlideParam::new(0.0, 0.5, sr);
        g.set_target(1.0);
        for _ in 0..5000 {
            g.next();
        }
        let mid = g.value();
        assert!(mid > 0.0 && mid < 1.0);
        g.set_target(0.0);
        let after = g.next();
        // no jump on retarget
        assert!((after - mid).abs() < 1e-3, "mid={mid} after={after}");
    }

    #[test]
    fn glide_converges_to_last_target() {
        let sr = 48_000.0;
        let mut g = GlideParam::new(0.0, 0.01, sr);
        g.set_target(0.8);
        g.set_target(0.3); // overlapping retargets: last one wins
        for _ in 0..(sr as usize) {
            g.next();
        }
        assert!((g.value() - 0.3).abs() < 1e-3);
    }

    #[test]
    fn linear_ramp_hits_target_in_expected_time() {
        let sr = 1000.0;
        let mut r = LinearRamp::new(0.0, 1.0, sr);
        r.set_target(1.0);
        for _ in 0..999 {
            r.next();
        }
        assert!(!r.done());
        r.next();
        assert!(r.done());
        assert_eq!(r.value(), 1.0);
    }

    #[test]
    fn linear_ramp_settles_despite_float_accumulation() {
        // step 1/66150 is not representable; the sum of 66150 of them is not
        // exactly 1.0, but the ramp must still settle on schedule
        let sr = 44_100.0;
        let mut r = LinearRamp::new(0.0, 1.5, sr);
        r.set_target(1.0);
        for _ in 0..(1.5 * sr) as usize {
            r.next();
        }
        assert!(r.done());
        assert_eq!(r.value(), 1.0);
    }

    #[test]
    fn linear_ramp_descends_too() {
        let sr = 1000.0;
        let mut r = LinearRamp::new(1.0, 0.5, sr);
        r.set_target(0.0);
        for _ in 0..(sr as usize) {
            r.next();
        }
        assert_eq!(r.value(), 0.0);
    }
}
