//! Weighted prompt composition for the remote generative service.
//!
//! A prompt set is rebuilt wholesale on every accepted context update and
//! replaced atomically — never patched in place — so the remote never sees a
//! partially updated atmosphere. Updates inside the rate-limit window are
//! ignored to keep prompt churn from flooding the session.

use std::time::{Duration, Instant};

use crate::config::EngineConfig;
use crate::telemetry::{is_precipitating, WeatherTelemetry};

/// A text description paired with its relative influence on the remote model.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightedPrompt {
    pub text: String,
    pub weight: f64,
}

impl WeightedPrompt {
    pub fn new(text: impl Into<String>, weight: f64) -> Self {
        Self {
            text: text.into(),
            weight,
        }
    }
}

/// Ordered list of weighted prompts; always replaced as a whole.
pub type PromptSet = Vec<WeightedPrompt>;

/// Fallback scene description used when the caller sends an empty string.
const DEFAULT_SCENE: &str = "calm natural scenery, soft distant horizon";

/// Fixed low-weight style anchor.
const STYLE_PROMPT: &str = "ambient, non-melodic, functional background textures";

/// Rate-limited prompt builder. The caller supplies `now` so the limiter is
/// deterministic under test.
#[derive(Clone, Debug)]
pub struct PromptComposer {
    cfg: EngineConfig,
    last_accepted: Option<Instant>,
}

impl PromptComposer {
    pub fn new(cfg: EngineConfig) -> Self {
        Self {
            cfg,
            last_accepted: None,
        }
    }

    /// Neutral starting set for session bring-up, before any context has been
    /// reported. Does not consume the rate-limit window, so a real context
    /// update arriving right after startup still goes through.
    pub fn initial(&self) -> PromptSet {
        vec![
            WeightedPrompt::new(DEFAULT_SCENE, 1.0),
            WeightedPrompt::new(STYLE_PROMPT, 0.25),
        ]
    }

    /// Interval remaining before the next update would be accepted.
    pub fn cooldown(&self, now: Instant) -> Duration {
        match self.last_accepted {
            Some(at) => self
                .cfg
                .prompt_min_interval
                .saturating_sub(now.duration_since(at)),
            None => Duration::ZERO,
        }
    }

    /// Build a fresh prompt set for this context, or `None` when the call
    /// falls inside the rate-limit window.
    pub fn compose(
        &mut self,
        weather: &WeatherTelemetry,
        scene: &str,
        now: Instant,
    ) -> Option<PromptSet> {
        if !self.cooldown(now).is_zero() {
            return None;
        }
        self.last_accepted = Some(now);
        Some(self.build(weather, scene))
    }

    fn build(&self, weather: &WeatherTelemetry, scene: &str) -> PromptSet {
        let scene = scene.trim();
        let scene_prompt = if scene.is_empty() {
            DEFAULT_SCENE.to_string()
        } else {
            scene.to_string()
        };

        let mut layers: Vec<&str> = Vec::new();
        if weather.wind_speed_kmh > self.cfg.prompt_wind_threshold_kmh {
            layers.push("deep airflow texture, slow-moving air masses");
        }
        if is_precipitating(weather, &self.cfg) {
            layers.push("wet acoustics, soft rainfall ambience");
        }
        layers.push(if weather.is_daytime {
            "daytime focus atmosphere, gentle alpha-wave calm"
        } else {
            "deep-rest nocturne, slow delta-wave stillness"
        });

        vec![
            WeightedPrompt::new(scene_prompt, 1.0),
            WeightedPrompt::new(layers.join("; "), 0.7),
            WeightedPrompt::new(STYLE_PROMPT, 0.25),
        ]
    }
}

// ------------------------------------ Tests --------------------------------------
