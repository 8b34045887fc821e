//! The realtime render graph.
//!
//! Owns everything the audio callback touches: the chunk scheduler, the two
//! weather voices, and the mix-bus graph. Control reaches it exclusively
//! through a lock-free command queue drained at the top of each `next` call;
//! the render path itself never locks, allocates in the steady state, or
//! suspends, so it is safe to drive from a low-latency callback.

use crossbeam_channel::Receiver;

use crate::backend::AudioChunk;
use crate::bus::MixBus;
use crate::config::EngineConfig;
use crate::scheduler::ChunkScheduler;
use crate::telemetry::VoiceTargets;
use crate::voices::WeatherTextureSynth;

/// Commands from the control side (engine facade and session controller).
#[derive(Debug)]
pub(crate) enum RenderCmd {
    /// Schedule a remote chunk onto the music timeline.
    Chunk(AudioChunk),
    MusicVolume(f32),
    SfxVolume(f32),
    FadeIn,
    FadeOut,
    Duck,
    /// Retarget the weather voices.
    Weather(VoiceTargets),
}

/// Mono render graph; the host duplicates the sample to however many output
/// channels the device needs.
pub struct RenderGraph {
    sr: f32,
    clock: f64,
    rx: Receiver<RenderCmd>,
    scheduler: ChunkScheduler,
    synth: WeatherTextureSynth,
    bus: MixBus,
}

impl RenderGraph {
    pub(crate) fn new(
        cfg: &EngineConfig,
        rx: Receiver<RenderCmd>,
        noise: std::sync::Arc<[f32]>,
    ) -> Self {
        let sr = cfg.sample_rate as f32;
        Self {
            sr,
            clock: 0.0,
            rx,
            scheduler: ChunkScheduler::new(cfg.sample_rate, cfg.lookahead_sec),
            synth: WeatherTextureSynth::new(cfg, noise, sr),
            bus: MixBus::new(cfg, sr),
        }
    }

    /// Produce one mono sample at the host-reported sample rate. A rate
    /// change reconfigures the graph once and continues.
    #[inline]
    pub fn next(&mut self, sr: f32) -> f32 {
        if sr != self.sr {
            self.sr = sr.max(1.0);
            self.scheduler.set_sample_rate(self.sr as u32);
            self.synth.set_sample_rate(self.sr);
            self.bus.set_sample_rate(self.sr);
        }

        while let Ok(cmd) = self.rx.try_recv() {
            self.apply(cmd);
        }

        let music = self.scheduler.next_sample(self.clock);
        let sfx = self.synth.next();
        let out = self.bus.mix(music, sfx);
        self.clock += 1.0 / self.sr as f64;
        out.clamp(-1.0, 1.0)
    }

    fn apply(&mut self, cmd: RenderCmd) {
        match cmd {
            RenderCmd::Chunk(chunk) => {
                // malformed chunks are dropped inside the scheduler
                let _ = self.scheduler.schedule(chunk, self.clock);
            }
            RenderCmd::MusicVolume(v) => self.bus.set_music_volume(v),
            RenderCmd::SfxVolume(v) => self.bus.set_sfx_volume(v),
            RenderCmd::FadeIn => self.bus.fade_in(),
            RenderCmd::FadeOut => self.bus.fade_out(),
            RenderCmd::Duck => self.bus.duck(),
            RenderCmd::Weather(t) => self.synth.retarget(t),
        }
    }

    /// Elapsed render time in seconds.
    pub fn time(&self) -> f64 {
        self.clock
    }

    pub fn sample_rate(&self) -> f32 {
        self.sr
    }

    /// Diagnostics / test taps.
    pub fn bus(&self) -> &MixBus {
        &self.bus
    }

    pub fn synth(&self) -> &WeatherTextureSynth {
        &self.synth
    }

    pub fn scheduler(&self) -> &ChunkScheduler {
        &self.scheduler
    }
}

// ------------------------------------ Tests --------------------------------------
