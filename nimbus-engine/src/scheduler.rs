//! Gapless scheduling of remote PCM chunks onto the output timeline.
//!
//! One cursor (`next_start`, seconds on the render clock) marks where the
//! next chunk will begin. Chunks are bound strictly back-to-back in arrival
//! order; the only time the cursor moves other than by chunk duration is the
//! buffer-underrun correction, which re-bases it to `now + lookahead` when
//! delivery has fallen behind. Catching up by playing faster is never an
//! option for music, so late audio is simply re-based forward.

use std::collections::VecDeque;

use log::{debug, warn};

use crate::backend::AudioChunk;

/// Where a chunk ended up on the timeline.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Scheduled {
    /// Absolute start time on the render clock, seconds.
    pub start: f64,
    /// True when this chunk triggered a buffer-underrun correction.
    pub underrun_corrected: bool,
}

/// A chunk bound to its start time, downmixed to the engine's mono render
/// format. Destroyed once fully played.
#[derive(Debug)]
struct QueuedChunk {
    start: f64,
    samples: Vec<f32>,
    pos: usize,
}

/// Back-to-back chunk scheduler with underrun correction.
#[derive(Debug)]
pub struct ChunkScheduler {
    sample_rate: u32,
    lookahead: f64,
    next_start: Option<f64>,
    queue: VecDeque<QueuedChunk>,
}

impl ChunkScheduler {
    pub fn new(sample_rate: u32, lookahead_sec: f64) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            lookahead: lookahead_sec.max(0.0),
            next_start: None,
            queue: VecDeque::new(),
        }
    }

    /// The engine's render rate changed; chunks at the old rate would play at
    /// the wrong pitch, so they count as malformed from here on.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate.max(1);
    }

    /// Number of chunks still queued on the timeline.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Current cursor position, if initialized.
    pub fn next_start(&self) -> Option<f64> {
        self.next_start
    }

    /// Bind an arriving chunk to the timeline. Returns where it was placed,
    /// or `None` for malformed chunks, which are dropped without advancing
    /// the cursor.
    pub fn schedule(&mut self, chunk: AudioChunk, now: f64) -> Option<Scheduled> {
        let Some(mono) = downmix(&chunk, self.sample_rate) else {
            warn!(
                "dropping malformed chunk: {} samples, {} ch, {} Hz (engine at {} Hz)",
                chunk.samples.len(),
                chunk.channels,
                chunk.sample_rate,
                self.sample_rate
            );
            return None;
        };

        let duration = mono.len() as f64 / self.sample_rate as f64;

        // Lazy cursor init: first chunk starts a lookahead ahead of "now".
        let mut start = match self.next_start {
            Some(t) => t,
            None => now + self.lookahead,
        };

        // Buffer-underrun correction: the network stalled past the cursor.
        let underrun_corrected = start < now;
        if underrun_corrected {
            debug!(
                "underrun correction: cursor {:.3}s behind, re-basing to now+{:.3}s",
                now - start,
                self.lookahead
            );
            start = now + self.lookahead;
        }

        self.queue.push_back(QueuedChunk {
            start,
            samples: mono,
            pos: 0,
        });
        self.next_start = Some(start + duration);

        Some(Scheduled {
            start,
            underrun_corrected,
        })
    }

    /// Produce the next mono sample for render time `now`. Silence before the
    /// first scheduled start and whenever the queue has run dry.
    #[inline]
    pub fn next_sample(&mut self, now: f64) -> f32 {
        loop {
            let Some(front) = self.queue.front_mut() else {
                return 0.0;
            };
            if now < front.start {
                return 0.0;
            }
            if front.pos < front.samples.len() {
                let s = front.samples[front.pos];
                front.pos += 1;
                return s;
            }
            // finished; the next chunk starts exactly where this one ended
            self.queue.pop_front();
        }
    }
}

/// Validate a chunk and fold interleaved frames down to mono. `None` means
/// the chunk is undecodable at this render rate.
fn downmix(chunk: &AudioChunk, engine_rate: u32) -> Option<Vec<f32>> {
    let ch = chunk.channels as usize;
    if ch == 0 || chunk.samples.is_empty() {
        return None;
    }
    if chunk.samples.len() % ch != 0 {
        return None;
    }
    if chunk.sample_rate != engine_rate {
        return None;
    }
    let inv = 1.0 / ch as f32;
    Some(
        chunk
            .samples
            .chunks_exact(ch)
            .map(|frame| frame.iter().sum::<f32>() * inv)
            .collect(),
    )
}

// ------------------------------------ Tests --------------------------------------
