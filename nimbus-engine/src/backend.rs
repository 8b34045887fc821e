//! Contract with the remote generative-music service.
//!
//! The wire protocol is out of scope: a backend hands us a session object for
//! control (`play`, `pause`, `set_weighted_prompts`) and delivers asynchronous
//! events (setup-complete, audio chunks, error, close) on the channel given to
//! `connect`. Trait methods return boxed futures so the session controller
//! can hold backends and sessions as trait objects.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use crate::prompt::PromptSet;

/// Boxed future returned by backend trait methods.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors crossing the remote-session boundary. None of these are fatal to
/// the engine: connection errors trigger backoff-and-retry, send errors are
/// logged and ignored.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("session send failed: {0}")]
    Send(String),
    #[error("session closed")]
    Closed,
}

/// One decoded audio chunk as delivered by the backend: interleaved PCM plus
/// enough shape information to validate and schedule it. Owned exclusively by
/// the scheduler from arrival until it is bound to the playback timeline.
#[derive(Clone, Debug)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl AudioChunk {
    /// Number of frames (samples per channel), zero for malformed shapes.
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Playback duration implied by the chunk's own sample rate.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }
}

/// Asynchronous messages from a live session.
#[derive(Debug)]
pub enum BackendEvent {
    /// Remote acknowledged setup; streaming may begin.
    SetupComplete,
    /// One decoded PCM chunk.
    Audio(AudioChunk),
    /// Remote error; the session is no longer usable.
    Error(String),
    /// Remote closed the session.
    Closed,
}

/// A live session with the remote service.
pub trait MusicSession: Send {
    /// Ask the remote to begin producing audio.
    fn play(&mut self) -> BackendFuture<'_, Result<(), BackendError>>;

    /// Ask the remote to stop producing audio (the session stays open).
    fn pause(&mut self) -> BackendFuture<'_, Result<(), BackendError>>;

    /// Replace the remote's weighted prompt set wholesale.
    fn set_weighted_prompts(
        &mut self,
        prompts: PromptSet,
    ) -> BackendFuture<'_, Result<(), BackendError>>;
}

/// Factory for sessions. `events` receives everything the remote pushes;
/// senders cloned for an earlier session must go quiet once that session is
/// dropped.
pub trait MusicBackend: Send + Sync {
    fn connect<'a>(
        &'a self,
        model: &'a str,
        events: UnboundedSender<BackendEvent>,
    ) -> BackendFuture<'a, Result<Box<dyn MusicSession>, BackendError>>;
}

/// Shared handle type used throughout the engine.
pub type SharedBackend = Arc<dyn MusicBackend>;

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_duration_from_shape() {
        let c = AudioChunk {
            samples: vec![0.0; 96_000],
            channels: 2,
            sample_rate: 48_000,
        };
        assert_eq!(c.frames(), 48_000);
        assert_eq!(c.duration(), Duration::from_secs(1));
    }

    #[test]
    fn degenerate_shapes_have_zero_duration() {
        let c = AudioChunk {
            samples: vec![0.0; 10],
            channels: 0,
            sample_rate: 48_000,
        };
        assert_eq!(c.frames(), 0);
        assert_eq!(c.duration(), Duration::ZERO);
        let c = AudioChunk {
            samples: vec![0.0; 10],
            channels: 1,
            sample_rate: 0,
        };
        assert_eq!(c.duration(), Duration::ZERO);
    }
}
