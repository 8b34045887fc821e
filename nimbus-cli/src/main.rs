//! Nimbus CLI — plays the ambient engine against the simulated backend.
//!
//! Useful for listening to the weather textures and the scheduling/ducking
//! behavior without a real generative-music service on the other end.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::warn;

use nimbus_engine::sim::SimBackend;
use nimbus_engine::{Engine, EngineConfig, RenderGraph, WeatherTelemetry};

#[derive(Debug, Default)]
struct Args {
    list_devices: bool,
    device_name: Option<String>,
    sample_rate: Option<u32>,
    channels: Option<u16>,
    duration_sec: Option<u64>,
    scene: Option<String>,
    music_volume: Option<f32>,
    sfx_volume: Option<f32>,
    wind_kmh: Option<f64>,
    rain_code: Option<u32>,
    rain_mm: Option<f64>,
    night: bool,
}

fn parse_args() -> Args {
    let mut a = Args::default();
    for s in std::env::args().skip(1) {
        if s == "--list-devices" { a.list_devices = true; continue; }
        if s == "--night"        { a.night = true; continue; }
        if let Some(rest) = s.strip_prefix("--device=")       { a.device_name  = Some(rest.to_string()); continue; }
        if let Some(rest) = s.strip_prefix("--sample-rate=")  { a.sample_rate  = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--channels=")     { a.channels     = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--duration=")     { a.duration_sec = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--scene=")        { a.scene        = Some(rest.to_string()); continue; }
        if let Some(rest) = s.strip_prefix("--music-volume=") { a.music_volume = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--sfx-volume=")   { a.sfx_volume   = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--wind=")         { a.wind_kmh     = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--rain-code=")    { a.rain_code    = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--rain-rate=")    { a.rain_mm      = rest.parse().ok();      continue; }
        warn!("unknown arg: {s}");
    }
    a
}

fn list_output_devices() -> Result<()> {
    let host = cpal::default_host();
    println!("Available output devices:");
    for dev in host.output_devices()? {
        println!("- {}", dev.name()?);
    }
    Ok(())
}

fn pick_device(args: &Args) -> Result<cpal::Device> {
    let host = cpal::default_host();
    if let Some(name) = &args.device_name {
        for d in host.output_devices()? {
            if d.name()? == *name { return Ok(d); }
        }
        bail!("requested device not found: {name}");
    }
    host.default_output_device()
        .ok_or_else(|| anyhow!("no default output device"))
}

fn choose_config(
    device: &cpal::Device,
    req_sr: Option<u32>,
    req_ch: Option<u16>,
) -> Result<cpal::SupportedStreamConfig> {
    // If nothing requested, default is already concrete.
    if req_sr.is_none() && req_ch.is_none() {
        return Ok(device.default_output_config()?);
    }

    // Pick a SupportedStreamConfigRange first.
    let mut best: Option<(u64, cpal::SupportedStreamConfigRange)> = None;
    for range in device.supported_output_configs()? {
        let ch     = range.channels();
        let sr_min = range.min_sample_rate().0;
        let sr_max = range.max_sample_rate().0;

        let ch_pen = match req_ch { Some(c) => (i64::from(ch) - i64::from(c)).unsigned_abs(), None => 0 };
        let sr_pen = match req_sr {
            Some(sr) => if (sr_min..=sr_max).contains(&sr) { 0 } else { u64::from(sr_min.abs_diff(sr).min(sr_max.abs_diff(sr))) },
            None => 0,
        };

        let score = sr_pen.saturating_mul(1000) + ch_pen;
        if best.as_ref().map(|(s, _)| *s).map_or(true, |s| score < s) {
            best = Some((score, range));
        }
    }

    let (_, range) = best.ok_or_else(|| anyhow!("no supported output configs"))?;

    let pick_sr = match req_sr {
        Some(sr) => {
            let lo = range.min_sample_rate().0;
            let hi = range.max_sample_rate().0;
            cpal::SampleRate(sr.clamp(lo, hi))
        }
        None => range.max_sample_rate(),
    };

    Ok(range.with_sample_rate(pick_sr))
}

fn weather_from(args: &Args) -> WeatherTelemetry {
    WeatherTelemetry {
        wind_speed_kmh: args.wind_kmh.unwrap_or(15.0),
        precip_code: args.rain_code,
        precip_rate_mm: args.rain_mm.unwrap_or(0.0),
        is_daytime: !args.night,
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    cfg: &cpal::StreamConfig,
    mut graph: RenderGraph,
    err_fn: impl Fn(cpal::StreamError) + Send + 'static,
) -> Result<cpal::Stream>
where
    T: cpal::Sample + cpal::FromSample<f32> + cpal::SizedSample + Send + 'static,
{
    let sr = cfg.sample_rate.0 as f32;
    let channels = cfg.channels as usize;

    let stream = device.build_output_stream(
        cfg,
        move |output: &mut [T], _| {
            for frame in output.chunks_mut(channels) {
                let v: T = T::from_sample(graph.next(sr));
                for ch in frame.iter_mut() { *ch = v; }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = parse_args();

    if args.list_devices {
        return list_output_devices();
    }

    println!("nimbus-cli — generative ambient player\n");

    let device  = pick_device(&args)?;
    let sup_cfg = choose_config(&device, args.sample_rate, args.channels)?;
    let sample_format = sup_cfg.sample_format();
    let mut cfg = sup_cfg.config();

    if let Some(sr) = args.sample_rate { cfg.sample_rate = cpal::SampleRate(sr); }
    if let Some(ch) = args.channels    { cfg.channels    = ch; }

    let engine_cfg = EngineConfig {
        sample_rate: cfg.sample_rate.0,
        ..EngineConfig::default()
    };
    let backend = SimBackend {
        sample_rate: cfg.sample_rate.0,
        ..SimBackend::default()
    };

    let mut engine = Engine::new(engine_cfg, Arc::new(backend));
    let graph = engine
        .prepare()
        .context("engine already prepared")?;

    if let Some(v) = args.music_volume { engine.set_music_volume(v); }
    if let Some(v) = args.sfx_volume   { engine.set_sfx_volume(v); }

    let weather = weather_from(&args);
    let scene = args.scene.as_deref().unwrap_or("");

    println!("Using device: {}", device.name()?);
    println!("Stream config: {:?} (sample_format: {:?})", cfg, sample_format);
    println!(
        "Weather: wind {:.0} km/h, precip code {:?}, rate {:.1} mm, {}",
        weather.wind_speed_kmh,
        weather.precip_code,
        weather.precip_rate_mm,
        if weather.is_daytime { "day" } else { "night" },
    );
    if let Some(d) = args.duration_sec { println!("Auto-stop after {d} seconds"); }
    println!("Press Ctrl+C to stop…\n");

    let err_fn = |e: cpal::StreamError| eprintln!("[cpal] stream error: {e}");

    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &cfg, graph, err_fn)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &cfg, graph, err_fn)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &cfg, graph, err_fn)?,
        other => bail!("unsupported device sample format: {other:?}"),
    };

    stream.play()?;
    engine.play();
    engine.update_context(weather, scene);

    if let Some(d) = args.duration_sec {
        tokio::time::sleep(Duration::from_secs(d)).await;
        engine.pause();
        // let the fade-out finish before tearing the stream down
        tokio::time::sleep(Duration::from_secs(2)).await;
        return Ok(());
    }

    loop {
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}
