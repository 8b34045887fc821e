//! Shared broadband noise source for the weather textures.
//!
//! One fixed-length white-noise buffer is generated at `prepare()` and looped
//! by both voices. Looping the same buffer through two independently-filtered
//! voices is inaudible as repetition once filtered, and is cheaper than
//! running two generators; the two loop readers start at different offsets so
//! the voices never read in phase.

use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Generate `samples` of white noise in [-1, 1], entropy-seeded.
pub fn noise_buffer(samples: usize) -> Arc<[f32]> {
    fill(SmallRng::from_entropy(), samples)
}

/// Deterministic variant for tests and reproducible renders.
pub fn noise_buffer_seeded(samples: usize, seed: u64) -> Arc<[f32]> {
    fill(SmallRng::seed_from_u64(seed), samples)
}

fn fill(mut rng: SmallRng, samples: usize) -> Arc<[f32]> {
    let mut buf = Vec::with_capacity(samples.max(1));
    for _ in 0..samples.max(1) {
        buf.push(rng.gen_range(-1.0f32..=1.0));
    }
    buf.into()
}

/// Cheap looped reader over the shared buffer. `Clone` shares the underlying
/// buffer but not the cursor.
#[derive(Clone, Debug)]
pub struct NoiseLoop {
    buf: Arc<[f32]>,
    pos: usize,
}

impl NoiseLoop {
    /// Start reading at `offset` samples into the buffer (wrapped).
    pub fn new(buf: Arc<[f32]>, offset: usize) -> Self {
        let len = buf.len().max(1);
        Self {
            buf,
            pos: offset % len,
        }
    }

    /// Next sample, wrapping at the end of the buffer.
    #[inline]
    pub fn next(&mut self) -> f32 {
        let s = self.buf[self.pos];
        self.pos += 1;
        if self.pos >= self.buf.len() {
            self.pos = 0;
        }
        s
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

// ------------------------------------ Tests --------------------------------------
