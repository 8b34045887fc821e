//! Weather telemetry and the telemetry→parameter mapping functions.
//!
//! The maps are pure: out-of-range telemetry is clamped, never rejected, so
//! this module cannot fail. The numeric shape of each map is a tunable
//! default (see [`crate::config::EngineConfig`]).

use nimbus_core::dsp::clamp;

use crate::config::EngineConfig;

/// One immutable weather snapshot, passed by value into `update_context`.
/// Superseded entirely by the next call; carries no identity.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct WeatherTelemetry {
    pub wind_speed_kmh: f64,
    /// WMO weather interpretation code, when the provider supplies one.
    pub precip_code: Option<u32>,
    pub precip_rate_mm: f64,
    pub is_daytime: bool,
}

/// Targets for the two weather voices, derived from one telemetry snapshot.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VoiceTargets {
    pub wind_gain: f32,
    pub wind_cutoff_hz: f32,
    pub rain_gain: f32,
}

/// WMO code ranges that count as precipitation: drizzle/rain (51–67),
/// showers (80–82), thunderstorm (95–99).
pub fn code_is_precipitating(code: u32) -> bool {
    matches!(code, 51..=67 | 80..=82 | 95..=99)
}

/// Whether this snapshot counts as "precipitating". Falls back to the rate
/// threshold when the provider sent no code.
pub fn is_precipitating(weather: &WeatherTelemetry, cfg: &EngineConfig) -> bool {
    match weather.precip_code {
        Some(code) => code_is_precipitating(code),
        None => weather.precip_rate_mm > cfg.rain_rate_threshold_mm,
    }
}

/// Compute the wind/rain voice targets for one snapshot.
pub fn voice_targets(weather: &WeatherTelemetry, cfg: &EngineConfig) -> VoiceTargets {
    let wind = weather.wind_speed_kmh.max(0.0);

    let wind_gain = clamp(
        (wind / cfg.wind_full_scale_kmh) as f32,
        0.0,
        cfg.wind_gain_max,
    );
    let wind_cutoff_hz = clamp(
        cfg.wind_cutoff_base_hz + (wind as f32) * cfg.wind_cutoff_slope_hz_per_kmh,
        cfg.wind_cutoff_base_hz,
        cfg.wind_cutoff_max_hz,
    );

    let rain_gain = if is_precipitating(weather, cfg) {
        clamp(
            cfg.rain_gain_base + (weather.precip_rate_mm.max(0.0) / cfg.rain_rate_divisor) as f32,
            0.0,
            cfg.rain_gain_max,
        )
    } else {
        0.0
    };

    VoiceTargets {
        wind_gain,
        wind_cutoff_hz,
        rain_gain,
    }
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(wind: f64, code: Option<u32>, rate: f64) -> WeatherTelemetry {
        WeatherTelemetry {
            wind_speed_kmh: wind,
            precip_code: code,
            precip_rate_mm: rate,
            is_daytime: true,
        }
    }

    #[test]
    fn wind_gain_is_monotone_and_capped() {
        let cfg = EngineConfig::default();
        let mut last = -1.0;
        for kmh in [0.0, 5.0, 20.0, 45.0, 72.0, 120.0, 250.0] {
            let t = voice_targets(&snap(kmh, None, 0.0), &cfg);
            assert!(t.wind_gain >= last, "gain not monotone at {kmh}");
            assert!(t.wind_gain >= 0.0 && t.wind_gain <= 0.6);
            last = t.wind_gain;
        }
        // cap reached well before the absurd end of the range
        let t = voice_targets(&snap(250.0, None, 0.0), &cfg);
        assert_eq!(t.wind_gain, 0.6);
    }

    #[test]
    fn wind_cutoff_tracks_speed_within_bounds() {
        let cfg = EngineConfig::default();
        let calm = voice_targets(&snap(0.0, None, 0.0), &cfg);
        assert_eq!(calm.wind_cutoff_hz, 100.0);
        let breezy = voice_targets(&snap(45.0, None, 0.0), &cfg);
        assert!((breezy.wind_cutoff_hz - 415.0).abs() < 1e-3);
        let storm = voice_targets(&snap(200.0, None, 0.0), &cfg);
        assert_eq!(storm.wind_cutoff_hz, 800.0);
    }

    #[test]
    fn negative_wind_clamps_to_calm() {
        let cfg = EngineConfig::default();
        let t = voice_targets(&snap(-30.0, None, 0.0), &cfg);
        assert_eq!(t.wind_gain, 0.0);
        assert_eq!(t.wind_cutoff_hz, 100.0);
    }

    #[test]
    fn precip_code_ranges() {
        for code in [51, 55, 61, 63, 67, 80, 82, 95, 99] {
            assert!(code_is_precipitating(code), "code {code} should rain");
        }
        for code in [0, 1, 3, 45, 48, 50, 68, 71, 77, 79, 83, 94, 100] {
            assert!(!code_is_precipitating(code), "code {code} should be dry");
        }
    }

    #[test]
    fn rate_fallback_without_code() {
        let cfg = EngineConfig::default();
        assert!(is_precipitating(&snap(0.0, None, 0.5), &cfg));
        assert!(!is_precipitating(&snap(0.0, None, 0.05), &cfg));
    }

    #[test]
    fn rain_gain_formula_and_cap() {
        let cfg = EngineConfig::default();
        let t = voice_targets(&snap(0.0, Some(61), 3.0), &cfg);
        assert!((t.rain_gain - 0.4).abs() < 1e-6);
        let heavy = voice_targets(&snap(0.0, Some(65), 50.0), &cfg);
        assert_eq!(heavy.rain_gain, 0.5);
        let dry = voice_targets(&snap(0.0, Some(3), 0.0), &cfg);
        assert_eq!(dry.rain_gain, 0.0);
    }
}
