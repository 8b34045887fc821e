//! The mix-bus graph: `music → master`, `sfx → master`, `master → output`.
//!
//! Every gain in the graph is a target plus a motion law, never an
//! instantaneous write — discontinuous gain jumps are audible as clicks on
//! real hardware, so this is a hard invariant of the module, not a style
//! preference. User volumes glide with a short constant; play/pause ride a
//! linear master fade; context changes trigger the two-stage duck.

use nimbus_core::dsp::{clamp, lerp};
use nimbus_core::glide::{GlideParam, LinearRamp};

use crate::config::EngineConfig;

/// Two-stage ducking envelope on the master bus: drop to the floor, hold,
/// then restore to unity a beat later. Re-triggering re-bases the drop from
/// the current instantaneous value; nothing is queued behind an in-flight
/// duck.
#[derive(Copy, Clone, Debug)]
struct DuckEnv {
    depth: f32,
    drop_sec: f32,
    restore_delay_sec: f32,
    restore_sec: f32,
    dt: f32,
    /// Seconds since the last trigger; `None` when idle at unity.
    t: Option<f32>,
    start_value: f32,
    value: f32,
}

impl DuckEnv {
    fn new(cfg: &EngineConfig, sr: f32) -> Self {
        Self {
            depth: cfg.duck_depth,
            drop_sec: cfg.duck_drop_sec.max(1e-3),
            restore_delay_sec: cfg.duck_restore_delay_sec,
            restore_sec: cfg.duck_restore_sec.max(1e-3),
            dt: 1.0 / sr.max(1.0),
            t: None,
            start_value: 1.0,
            value: 1.0,
        }
    }

    fn set_sample_rate(&mut self, sr: f32) {
        self.dt = 1.0 / sr.max(1.0);
    }

    fn trigger(&mut self) {
        self.start_value = self.value;
        self.t = Some(0.0);
    }

    #[inline]
    fn next(&mut self) -> f32 {
        let Some(t) = self.t else {
            return self.value;
        };
        self.value = if t < self.drop_sec {
            lerp(self.start_value, self.depth, t / self.drop_sec)
        } else if t < self.restore_delay_sec {
            self.depth
        } else if t < self.restore_delay_sec + self.restore_sec {
            lerp(self.depth, 1.0, (t - self.restore_delay_sec) / self.restore_sec)
        } else {
            self.t = None;
            1.0
        };
        if self.t.is_some() {
            self.t = Some(t + self.dt);
        }
        self.value
    }
}

/// The three-bus gain graph. Render-side object; all mutation goes through
/// the retarget methods and is applied per-sample in [`MixBus::mix`].
#[derive(Clone, Debug)]
pub struct MixBus {
    music: GlideParam,
    sfx: GlideParam,
    fade: LinearRamp,
    duck: DuckEnv,
    volume_glide_sec: f32,
    fade_sec: f32,
}

impl MixBus {
    pub fn new(cfg: &EngineConfig, sr: f32) -> Self {
        let mut music = GlideParam::new(0.0, cfg.volume_glide_sec, sr);
        music.reset(1.0);
        let mut sfx = GlideParam::new(0.0, cfg.volume_glide_sec, sr);
        sfx.reset(1.0);
        Self {
            music,
            sfx,
            // master sits at silence until the first fade_in
            fade: LinearRamp::new(0.0, cfg.fade_sec, sr),
            duck: DuckEnv::new(cfg, sr),
            volume_glide_sec: cfg.volume_glide_sec,
            fade_sec: cfg.fade_sec,
        }
    }

    pub fn set_sample_rate(&mut self, sr: f32) {
        self.music.set_time_sec(self.volume_glide_sec, sr);
        self.sfx.set_time_sec(self.volume_glide_sec, sr);
        self.fade.set_time_sec(self.fade_sec, sr);
        self.duck.set_sample_rate(sr);
    }

    /// Retarget the music bus gain; input clamped to [0, 1].
    pub fn set_music_volume(&mut self, v: f32) {
        self.music.set_target(clamp(v, 0.0, 1.0));
    }

    /// Retarget the sfx bus gain; input clamped to [0, 1].
    pub fn set_sfx_volume(&mut self, v: f32) {
        self.sfx.set_target(clamp(v, 0.0, 1.0));
    }

    /// Current bus targets (the user-facing volume values).
    pub fn volumes(&self) -> (f32, f32) {
        (self.music.target(), self.sfx.target())
    }

    /// Ramp the master bus to unity (used on `play()`).
    pub fn fade_in(&mut self) {
        self.fade.set_target(1.0);
    }

    /// Ramp the master bus to silence (used on `pause()`).
    pub fn fade_out(&mut self) {
        self.fade.set_target(0.0);
    }

    /// Trigger the duck-and-restore transition.
    pub fn duck(&mut self) {
        self.duck.trigger();
    }

    /// Compose one output sample from the two input buses.
    #[inline]
    pub fn mix(&mut self, music_in: f32, sfx_in: f32) -> f32 {
        let pre = music_in * self.music.next() + sfx_in * self.sfx.next();
        pre * self.fade.next() * self.duck.next()
    }

    /// Instantaneous master gain (fade × duck); diagnostics and tests.
    pub fn master_gain(&self) -> f32 {
        self.fade.value() * self.duck.value
    }
}

// ------------------------------------ Tests --------------------------------------
