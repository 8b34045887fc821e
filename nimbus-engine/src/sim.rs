//! Simulated generative-music backend.
//!
//! Stands in for the remote service in demos and tests: acknowledges setup
//! immediately, then produces gentle drone chunks on a timer while playing.
//! Prompt updates are accepted and logged but do not change the drone — the
//! real model is an opaque remote oracle, and so is this one, just a very
//! boring one.

use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::sync::mpsc::UnboundedSender;

use crate::backend::{
    AudioChunk, BackendError, BackendEvent, BackendFuture, MusicBackend, MusicSession,
};
use crate::prompt::PromptSet;

/// In-process stand-in for the remote generative service.
#[derive(Clone, Debug)]
pub struct SimBackend {
    pub sample_rate: u32,
    pub chunk_sec: f64,
}

impl Default for SimBackend {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            chunk_sec: 2.0,
        }
    }
}

struct SimSession {
    playing: Arc<AtomicBool>,
    alive: Arc<AtomicBool>,
}

impl Drop for SimSession {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

impl MusicSession for SimSession {
    fn play(&mut self) -> BackendFuture<'_, Result<(), BackendError>> {
        self.playing.store(true, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }

    fn pause(&mut self) -> BackendFuture<'_, Result<(), BackendError>> {
        self.playing.store(false, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }

    fn set_weighted_prompts(
        &mut self,
        prompts: PromptSet,
    ) -> BackendFuture<'_, Result<(), BackendError>> {
        for p in &prompts {
            debug!("sim backend prompt ({:.2}): {}", p.weight, p.text);
        }
        Box::pin(async { Ok(()) })
    }
}

impl MusicBackend for SimBackend {
    fn connect<'a>(
        &'a self,
        model: &'a str,
        events: UnboundedSender<BackendEvent>,
    ) -> BackendFuture<'a, Result<Box<dyn MusicSession>, BackendError>> {
        let sample_rate = self.sample_rate;
        let chunk_sec = self.chunk_sec;
        Box::pin(async move {
            debug!("sim backend connect, model={model}");
            events
                .send(BackendEvent::SetupComplete)
                .map_err(|_| BackendError::Closed)?;

            let playing = Arc::new(AtomicBool::new(false));
            let alive = Arc::new(AtomicBool::new(true));
            let producer = Producer {
                playing: playing.clone(),
                alive: alive.clone(),
                events,
                sample_rate,
                chunk_sec,
            };
            tokio::spawn(producer.run());

            Ok(Box::new(SimSession { playing, alive }) as Box<dyn MusicSession>)
        })
    }
}

/// Chunk producer loop; phases persist across chunks so the drone is
/// continuous at chunk boundaries.
struct Producer {
    playing: Arc<AtomicBool>,
    alive: Arc<AtomicBool>,
    events: UnboundedSender<BackendEvent>,
    sample_rate: u32,
    chunk_sec: f64,
}

impl Producer {
    async fn run(self) {
        let frames = (self.chunk_sec * self.sample_rate as f64) as usize;
        let dt = 1.0 / self.sample_rate as f64;
        let mut phase_a = 0.0f64;
        let mut phase_b = 0.0f64;
        let mut phase_lfo = 0.0f64;

        loop {
            if !self.alive.load(Ordering::SeqCst) || self.events.is_closed() {
                return;
            }
            if self.playing.load(Ordering::SeqCst) {
                let mut samples = Vec::with_capacity(frames);
                for _ in 0..frames {
                    let lfo = 0.75 + 0.25 * (TAU * phase_lfo).sin();
                    let s = (0.2 * (TAU * phase_a).sin() + 0.15 * (TAU * phase_b).sin()) * lfo;
                    samples.push(s as f32);
                    phase_a = (phase_a + 110.0 * dt).fract();
                    phase_b = (phase_b + 164.8 * dt).fract(); // near a fifth up
                    phase_lfo = (phase_lfo + 0.05 * dt).fract();
                }
                let chunk = AudioChunk {
                    samples,
                    channels: 1,
                    sample_rate: self.sample_rate,
                };
                if self.events.send(BackendEvent::Audio(chunk)).is_err() {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_secs_f64(self.chunk_sec)).await;
        }
    }
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[tokio::test(start_paused = true)]
    async fn setup_complete_then_chunks_while_playing() {
        let backend = SimBackend {
            sample_rate: 8_000,
            chunk_sec: 0.5,
        };
        let (tx, mut rx) = unbounded_channel();
        let mut session = backend.connect("test-model", tx).await.unwrap();

        assert!(matches!(rx.recv().await, Some(BackendEvent::SetupComplete)));

        session.play().await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        let mut chunks = 0;
        while let Ok(ev) = rx.try_recv() {
            if let BackendEvent::Audio(c) = ev {
                assert_eq!(c.channels, 1);
                assert_eq!(c.sample_rate, 8_000);
                assert_eq!(c.frames(), 4_000);
                chunks += 1;
            }
        }
        assert!(chunks >= 2, "chunks={chunks}");

        session.pause().await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        // drain whatever was in flight at pause time
        while rx.try_recv().is_ok() {}
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err(), "chunks kept coming after pause");
    }

    #[tokio::test(start_paused = true)]
    async fn producer_stops_when_session_dropped() {
        let backend = SimBackend {
            sample_rate: 8_000,
            chunk_sec: 0.25,
        };
        let (tx, mut rx) = unbounded_channel();
        let mut session = backend.connect("test-model", tx).await.unwrap();
        session.play().await.unwrap();
        drop(session);
        tokio::time::sleep(Duration::from_secs(1)).await;
        while rx.try_recv().is_ok() {}
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());
    }
}
