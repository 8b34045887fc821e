//! Public engine facade.
//!
//! An `Engine` is an explicitly constructed, owned instance — no global
//! singleton — so independent engines can coexist (and be tested) freely.
//! `prepare()` builds the render graph and hands it to the host exactly once;
//! the host drives it from its audio callback while the facade and the
//! session controller talk to it through the command queue.

use std::time::Instant;

use crossbeam_channel::{unbounded, Sender};
use log::warn;
use nimbus_core::dsp::clamp;

use crate::backend::SharedBackend;
use crate::config::EngineConfig;
use crate::noise::noise_buffer;
use crate::prompt::PromptComposer;
use crate::render::{RenderCmd, RenderGraph};
use crate::session::{ControlCmd, ControllerHandle, SessionController, SessionState};
use crate::telemetry::{voice_targets, WeatherTelemetry};

pub struct Engine {
    cfg: EngineConfig,
    backend: SharedBackend,
    render_tx: Sender<RenderCmd>,
    /// Built in `new`, handed out by the first `prepare()`.
    render: Option<RenderGraph>,
    controller: Option<ControllerHandle>,
    composer: PromptComposer,
    playing: bool,
    prompts_seeded: bool,
    music_volume: f32,
    sfx_volume: f32,
}

impl Engine {
    /// Construct an engine. Cheap; no audio or network activity yet.
    pub fn new(cfg: EngineConfig, backend: SharedBackend) -> Self {
        let (render_tx, render_rx) = unbounded();
        let noise = noise_buffer((cfg.noise_buffer_sec * cfg.sample_rate as f32) as usize);
        let render = RenderGraph::new(&cfg, render_rx, noise);
        Self {
            composer: PromptComposer::new(cfg.clone()),
            backend,
            render_tx,
            render: Some(render),
            controller: None,
            playing: false,
            prompts_seeded: false,
            music_volume: 1.0,
            sfx_volume: 1.0,
            cfg,
        }
    }

    /// Initialize the engine: spawns the session controller and yields the
    /// render graph for the host's audio callback. Idempotent — subsequent
    /// calls return `None`. Must run inside a tokio runtime; hosts that gate
    /// audio behind a user gesture should call this from the gesture handler.
    pub fn prepare(&mut self) -> Option<RenderGraph> {
        if self.controller.is_none() {
            self.controller = Some(SessionController::spawn(
                self.cfg.clone(),
                self.backend.clone(),
                self.render_tx.clone(),
            ));
        }
        self.render.take()
    }

    /// Express playing intent: fade the master bus in and (re)open the remote
    /// session. Idempotent while playing.
    pub fn play(&mut self) {
        let Some(controller) = &self.controller else {
            warn!("play() before prepare(); ignoring");
            return;
        };
        if self.playing {
            return;
        }
        self.playing = true;
        if !self.prompts_seeded {
            // initial prompts for session-ready; does not consume the
            // rate-limit window, so a real context update right after play
            // still goes through
            let set = self.composer.initial();
            controller.send(ControlCmd::Prompts(set));
            self.prompts_seeded = true;
        }
        let _ = self.render_tx.send(RenderCmd::FadeIn);
        controller.send(ControlCmd::Play);
    }

    /// Withdraw playing intent: fade out and tell the remote to stop.
    /// Already-scheduled audio is allowed to finish under the fade rather
    /// than being cut. Idempotent while paused.
    pub fn pause(&mut self) {
        let Some(controller) = &self.controller else {
            warn!("pause() before prepare(); ignoring");
            return;
        };
        if !self.playing {
            return;
        }
        self.playing = false;
        let _ = self.render_tx.send(RenderCmd::FadeOut);
        controller.send(ControlCmd::Pause);
    }

    /// Feed a fresh weather snapshot and scene description. Safe to call at
    /// any rate: the weather voices always retarget (they glide anyway), but
    /// prompt updates — and the duck that masks them — are rate-limited.
    pub fn update_context(&mut self, weather: WeatherTelemetry, scene: &str) {
        let _ = self
            .render_tx
            .send(RenderCmd::Weather(voice_targets(&weather, &self.cfg)));

        if let Some(set) = self.composer.compose(&weather, scene, Instant::now()) {
            self.prompts_seeded = true;
            let _ = self.render_tx.send(RenderCmd::Duck);
            match &self.controller {
                Some(controller) => controller.send(ControlCmd::Prompts(set)),
                None => warn!("update_context before prepare(); prompts dropped"),
            }
        }
    }

    /// Set the music bus volume; clamped to [0, 1], applied with a short
    /// glide. Independent of playback state.
    pub fn set_music_volume(&mut self, v: f32) {
        self.music_volume = clamp(v, 0.0, 1.0);
        let _ = self.render_tx.send(RenderCmd::MusicVolume(self.music_volume));
    }

    /// Set the sfx (weather texture) bus volume; clamped to [0, 1].
    pub fn set_sfx_volume(&mut self, v: f32) {
        self.sfx_volume = clamp(v, 0.0, 1.0);
        let _ = self.render_tx.send(RenderCmd::SfxVolume(self.sfx_volume));
    }

    /// Current (music, sfx) volume targets.
    pub fn volumes(&self) -> (f32, f32) {
        (self.music_volume, self.sfx_volume)
    }

    /// Current remote-session state; `Disconnected` before `prepare()`.
    pub fn session_state(&self) -> SessionState {
        self.controller
            .as_ref()
            .map_or(SessionState::Disconnected, ControllerHandle::state)
    }

    #[cfg(test)]
    pub(crate) async fn wait_for_state(&mut self, state: SessionState) {
        if let Some(controller) = self.controller.as_mut() {
            controller.wait_for(|s| s == state).await;
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        // the controller task keeps a sender to itself for timer wakeups, so
        // it must be told to stop rather than noticing channel closure
        if let Some(controller) = &self.controller {
            controller.send(ControlCmd::Shutdown);
        }
    }
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendEvent;
    use crate::testing::MockBackend;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    const SR: f32 = 48_000.0;

    fn engine_with(backend: Arc<MockBackend>) -> Engine {
        Engine::new(EngineConfig::default(), Arc::new(backend) as SharedBackend)
    }

    fn run(graph: &mut RenderGraph, secs: f32) {
        for _ in 0..(secs * SR) as usize {
            graph.next(SR);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn prepare_is_idempotent() {
        let mut engine = engine_with(Arc::new(MockBackend::default()));
        assert!(engine.prepare().is_some());
        assert!(engine.prepare().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn volume_setters_clamp_and_report() {
        let mut engine = engine_with(Arc::new(MockBackend::default()));
        let _graph = engine.prepare();
        engine.set_music_volume(1.8);
        engine.set_sfx_volume(-0.2);
        assert_eq!(engine.volumes(), (1.0, 0.0));
        engine.set_music_volume(0.6);
        engine.set_music_volume(0.6); // idempotent
        assert_eq!(engine.volumes(), (0.6, 0.0));
    }

    #[tokio::test(start_paused = true)]
    async fn play_is_idempotent_and_reaches_live() {
        let backend = Arc::new(MockBackend::default());
        let mut engine = engine_with(backend.clone());
        let _graph = engine.prepare();
        engine.play();
        engine.play();
        engine.wait_for_state(SessionState::Live).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(backend.connects.load(Ordering::SeqCst), 1);
        // initial prompt seed arrived before/at session-ready
        assert!(!backend.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn end_to_end_context_update() {
        let backend = Arc::new(MockBackend::default());
        let mut engine = engine_with(backend.clone());
        let mut graph = engine.prepare().expect("render graph");

        engine.play();
        engine.wait_for_state(SessionState::Live).await;

        engine.update_context(
            WeatherTelemetry {
                wind_speed_kmh: 45.0,
                precip_code: Some(61),
                precip_rate_mm: 3.0,
                is_daytime: true,
            },
            "misty valley at dawn",
        );
        tokio::time::sleep(Duration::from_millis(10)).await;

        // the duck must dip the master gain, then fully restore
        let mut min_gain = f32::MAX;
        for _ in 0..(3.0 * SR) as usize {
            graph.next(SR);
            min_gain = min_gain.min(graph.bus().master_gain());
        }
        assert!(min_gain <= 0.25, "no duck observed, min={min_gain}");
        run(&mut graph, 7.0);
        assert!((graph.bus().master_gain() - 1.0).abs() < 1e-2);

        // weather voices trending to the mapped targets
        assert!((graph.synth().wind().gain() - 0.375).abs() < 0.01);
        assert!((graph.synth().rain().gain() - 0.4).abs() < 0.01);

        // exactly one prompt update carried the wet/daytime descriptors
        assert_eq!(backend.prompt_sets_containing("wet acoustics"), 1);
        assert_eq!(backend.prompt_sets_containing("focus"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_updates_collapse_but_voices_still_retarget() {
        let backend = Arc::new(MockBackend::default());
        let mut engine = engine_with(backend.clone());
        let mut graph = engine.prepare().unwrap();
        engine.play();
        engine.wait_for_state(SessionState::Live).await;

        let wet = WeatherTelemetry {
            precip_code: Some(61),
            precip_rate_mm: 3.0,
            is_daytime: true,
            ..Default::default()
        };
        engine.update_context(wet, "a");
        engine.update_context(wet, "b");
        engine.update_context(wet, "c");
        tokio::time::sleep(Duration::from_millis(10)).await;

        // one seed + one accepted update, the rest rate-limited away
        assert_eq!(backend.prompts.lock().unwrap().len(), 2);
        run(&mut graph, 10.0);
        assert!((graph.synth().rain().gain() - 0.4).abs() < 0.01);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_audio_finishes_under_the_fade_after_pause() {
        let backend = Arc::new(MockBackend::default());
        let mut engine = engine_with(backend.clone());
        let mut graph = engine.prepare().unwrap();
        engine.play();
        engine.wait_for_state(SessionState::Live).await;
        run(&mut graph, 2.0);

        backend.push(BackendEvent::Audio(crate::backend::AudioChunk {
            samples: vec![0.5; 48_000],
            channels: 1,
            sample_rate: 48_000,
        }));
        tokio::time::sleep(Duration::from_millis(10)).await;

        engine.pause();
        engine.pause(); // idempotent
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(backend.pauses.load(Ordering::SeqCst), 1);

        // the chunk is still on the timeline and audible while the fade runs
        let mut heard = false;
        for _ in 0..(0.5 * SR) as usize {
            if graph.next(SR).abs() > 0.01 {
                heard = true;
            }
        }
        assert!(heard, "queued audio was cut instead of finishing");
    }
}
