//! Engine configuration.
//!
//! Everything here is a tunable default, not a load-bearing invariant: the
//! mapping breakpoints and timings were chosen by ear and can be adjusted
//! per deployment without touching engine code.

use std::time::Duration;

/// All tunables for one engine instance. Construct with `EngineConfig::default()`
/// and override fields as needed.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Render sample rate assumed until the audio host reports otherwise.
    pub sample_rate: u32,

    // ---- wind texture ----
    /// Wind speed (km/h) that would map to full wind gain before capping.
    pub wind_full_scale_kmh: f64,
    /// Cap applied to the wind voice gain.
    pub wind_gain_max: f32,
    /// Cutoff mapping: `base + kmh * slope`, clamped to [base, max].
    pub wind_cutoff_base_hz: f32,
    pub wind_cutoff_slope_hz_per_kmh: f32,
    pub wind_cutoff_max_hz: f32,
    /// Glide time constant for wind gain and cutoff retargets (seconds).
    pub wind_glide_sec: f32,

    // ---- rain texture ----
    /// Gain floor once precipitation is detected.
    pub rain_gain_base: f32,
    /// Additional gain per mm of precipitation rate, divided in.
    pub rain_rate_divisor: f64,
    /// Cap applied to the rain voice gain.
    pub rain_gain_max: f32,
    /// Fixed low-pass cutoff for the rain texture.
    pub rain_cutoff_hz: f32,
    /// Precipitation-rate threshold (mm) used when no weather code is present.
    pub rain_rate_threshold_mm: f64,
    /// Glide time constant for rain gain retargets (seconds).
    pub rain_glide_sec: f32,

    // ---- noise source ----
    /// Length of the shared looped noise buffer, in seconds.
    pub noise_buffer_sec: f32,

    // ---- mix buses ----
    /// Smoothing constant for user volume changes (seconds).
    pub volume_glide_sec: f32,
    /// Master fade-in/fade-out duration (seconds).
    pub fade_sec: f32,
    /// Duck floor, drop time, restore delay (from trigger), restore time.
    pub duck_depth: f32,
    pub duck_drop_sec: f32,
    pub duck_restore_delay_sec: f32,
    pub duck_restore_sec: f32,

    // ---- chunk scheduling ----
    /// Safety margin added ahead of "now" when (re)basing the schedule cursor.
    pub lookahead_sec: f64,

    // ---- remote session ----
    /// Model identifier handed to the backend on connect.
    pub model: String,
    /// Delay before a reconnect attempt after an error or unexpected close.
    pub reconnect_backoff: Duration,

    // ---- prompts ----
    /// Minimum interval between accepted context updates.
    pub prompt_min_interval: Duration,
    /// Wind speed (km/h) above which the airflow texture prompt is added.
    pub prompt_wind_threshold_kmh: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,

            wind_full_scale_kmh: 120.0,
            wind_gain_max: 0.6,
            wind_cutoff_base_hz: 100.0,
            wind_cutoff_slope_hz_per_kmh: 7.0,
            wind_cutoff_max_hz: 800.0,
            wind_glide_sec: 2.0,

            rain_gain_base: 0.1,
            rain_rate_divisor: 10.0,
            rain_gain_max: 0.5,
            rain_cutoff_hz: 1800.0,
            rain_rate_threshold_mm: 0.1,
            rain_glide_sec: 2.0,

            noise_buffer_sec: 4.0,

            volume_glide_sec: 0.1,
            fade_sec: 1.5,
            duck_depth: 0.2,
            duck_drop_sec: 0.5,
            duck_restore_delay_sec: 2.5,
            duck_restore_sec: 1.5,

            lookahead_sec: 0.12,

            model: "ambient-music-01".to_string(),
            reconnect_backoff: Duration::from_secs(2),

            prompt_min_interval: Duration::from_secs(5),
            prompt_wind_threshold_kmh: 20.0,
        }
    }
}
