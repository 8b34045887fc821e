//! Weather texture voices: wind and rain as filtered noise.
//!
//! Each voice is wired `noise loop → one-pole low-pass → gain` and feeds the
//! sfx bus. Both are started once at `prepare()` and loop forever; telemetry
//! only ever retargets their filter cutoff and gain, glided over a couple of
//! seconds so a weather refresh never clicks.

use std::sync::Arc;

use nimbus_core::filters::OnePoleLP;
use nimbus_core::glide::GlideParam;

use crate::config::EngineConfig;
use crate::noise::NoiseLoop;
use crate::telemetry::VoiceTargets;

/// One filtered-noise voice. Only `gain` and (for wind) `cutoff` move after
/// construction.
#[derive(Clone, Debug)]
pub struct WeatherVoice {
    noise: NoiseLoop,
    filter: OnePoleLP,
    cutoff: GlideParam,
    gain: GlideParam,
    glide_sec: f32,
}

impl WeatherVoice {
    fn new(noise: NoiseLoop, cutoff_hz: f32, glide_sec: f32, sr: f32) -> Self {
        let mut cutoff = GlideParam::new(0.0, glide_sec, sr);
        cutoff.reset(cutoff_hz);
        Self {
            noise,
            filter: OnePoleLP::new(cutoff_hz, sr),
            cutoff,
            gain: GlideParam::new(0.0, glide_sec, sr),
            glide_sec,
        }
    }

    fn set_sample_rate(&mut self, sr: f32) {
        self.filter.set_sample_rate(sr);
        self.cutoff.set_time_sec(self.glide_sec, sr);
        self.gain.set_time_sec(self.glide_sec, sr);
    }

    /// Smoothed gain value right now (tests and diagnostics).
    pub fn gain(&self) -> f32 {
        self.gain.value()
    }

    #[inline]
    fn next(&mut self) -> f32 {
        self.filter.set_cutoff_hz(self.cutoff.next());
        self.filter.process(self.noise.next()) * self.gain.next()
    }
}

/// The pair of weather voices, retargeted together from one telemetry
/// snapshot. Cannot fail; targets arrive pre-clamped from
/// [`crate::telemetry::voice_targets`].
#[derive(Clone, Debug)]
pub struct WeatherTextureSynth {
    wind: WeatherVoice,
    rain: WeatherVoice,
}

impl WeatherTextureSynth {
    /// Both voices loop the same shared buffer, offset by half its length so
    /// they never read in phase.
    pub fn new(cfg: &EngineConfig, noise: Arc<[f32]>, sr: f32) -> Self {
        let half = noise.len() / 2;
        Self {
            wind: WeatherVoice::new(
                NoiseLoop::new(noise.clone(), 0),
                cfg.wind_cutoff_base_hz,
                cfg.wind_glide_sec,
                sr,
            ),
            rain: WeatherVoice::new(
                NoiseLoop::new(noise, half),
                cfg.rain_cutoff_hz,
                cfg.rain_glide_sec,
                sr,
            ),
        }
    }

    pub fn set_sample_rate(&mut self, sr: f32) {
        self.wind.set_sample_rate(sr);
        self.rain.set_sample_rate(sr);
    }

    /// Retarget both voices. The rain cutoff stays fixed: the rain texture is
    /// broadband low-passed once, not velocity-scaled.
    pub fn retarget(&mut self, t: VoiceTargets) {
        self.wind.gain.set_target(t.wind_gain);
        self.wind.cutoff.set_target(t.wind_cutoff_hz);
        self.rain.gain.set_target(t.rain_gain);
    }

    /// Next combined sfx sample.
    #[inline]
    pub fn next(&mut self) -> f32 {
        self.wind.next() + self.rain.next()
    }

    pub fn wind(&self) -> &WeatherVoice {
        &self.wind
    }

    pub fn rain(&self) -> &WeatherVoice {
        &self.rain
    }
}

// ------------------------------------ Tests --------------------------------------
