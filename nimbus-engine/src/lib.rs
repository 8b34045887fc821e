//! Nimbus Engine — generative ambient audio for the weather portal.
//!
//! Crate layout:
//! - [`config`]    : tunable defaults (mapping curves, timings, backoff)
//! - [`telemetry`] : weather snapshot type and the telemetry→parameter maps
//! - [`noise`]     : shared broadband noise buffer and loop readers
//! - [`voices`]    : wind/rain filtered-noise textures
//! - [`bus`]       : music/sfx/master gain graph with fades and ducking
//! - [`scheduler`] : gapless timeline scheduling of remote PCM chunks
//! - [`render`]    : the realtime render graph (safe in an audio callback)
//! - [`backend`]   : contract with the remote generative-music service
//! - [`sim`]       : in-process simulated backend for demos and tests
//! - [`prompt`]    : rate-limited weighted-prompt composition
//! - [`session`]   : connect/recover state machine owning the remote session
//! - [`engine`]    : public facade (`play`, `pause`, `update_context`, volumes)
//!
//! The render path (everything reachable from [`render::RenderGraph::next`])
//! never allocates, locks, or suspends; the session side runs as a single
//! tokio task and only ever talks to the render side through a lock-free
//! command queue.

pub mod backend;
pub mod bus;
pub mod config;
pub mod engine;
pub mod noise;
pub mod prompt;
pub mod render;
pub mod scheduler;
pub mod session;
pub mod sim;
pub mod telemetry;
pub mod voices;

#[cfg(test)]
pub(crate) mod testing;

// Re-export the items most hosts need, to make downstream imports ergonomic.
pub use backend::{AudioChunk, BackendError, BackendEvent, MusicBackend, MusicSession};
pub use config::EngineConfig;
pub use engine::Engine;
pub use prompt::{PromptSet, WeightedPrompt};
pub use render::RenderGraph;
pub use session::SessionState;
pub use telemetry::WeatherTelemetry;
