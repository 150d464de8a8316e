//! Fixed-length sample buffers and the block-level math used by the scene.

use std::ops::{Deref, DerefMut};

use rand::Rng;

use crate::config::EngineContext;
use crate::error::Result;
use crate::pool::ObjectPool;
use crate::MAX_BLOCK_SIZE;

/*
Blocks
======

Every signal in the engine moves in blocks of `block_size` samples. A Block
owns exactly that many samples, so none of the helpers below can ever touch
memory past `n_frames`.

Routing without copies is done with ordinary borrows: a producer writes into
whatever `&mut [f32]` it is handed (a pooled Block, a scratch Block, or the
caller's output slice) and readers take `&[f32]`. The borrow checker rules out
two writers on one buffer.

All math is single precision. None of these helpers flush denormals; the
feedback filters that could produce them add `DENORMAL_BIAS` instead.
*/

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    samples: Vec<f32>,
}

impl Block {
    pub fn new(n_frames: usize) -> Self {
        debug_assert!(n_frames <= MAX_BLOCK_SIZE);
        Self {
            samples: vec![0.0; n_frames],
        }
    }

    pub fn from_context(ctx: &EngineContext) -> Self {
        Self::new(ctx.block_size)
    }

    pub fn n_frames(&self) -> usize {
        self.samples.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    pub fn zero(&mut self) {
        self.samples.fill(0.0);
    }

    pub fn copy(&mut self, src: &[f32]) {
        debug_assert_eq!(src.len(), self.samples.len());
        self.samples.copy_from_slice(src);
    }

    pub fn multiply_by(&mut self, gain: f32) {
        for s in self.samples.iter_mut() {
            *s *= gain;
        }
    }

    /// Sample-by-sample product with another signal.
    pub fn multiply_by_signal(&mut self, other: &[f32]) {
        debug_assert_eq!(other.len(), self.samples.len());
        for (s, &m) in self.samples.iter_mut().zip(other) {
            *s *= m;
        }
    }

    pub fn add(&mut self, src: &[f32]) {
        debug_assert_eq!(src.len(), self.samples.len());
        for (s, &x) in self.samples.iter_mut().zip(src) {
            *s += x;
        }
    }

    /// Mix `src * gain` in. A zero gain is skipped entirely.
    pub fn add_with_multiply(&mut self, src: &[f32], gain: f32) {
        add_with_multiply(&mut self.samples, src, gain);
    }

    pub fn copy_with_multiply(&mut self, src: &[f32], gain: f32) {
        debug_assert_eq!(src.len(), self.samples.len());
        for (s, &x) in self.samples.iter_mut().zip(src) {
            *s = x * gain;
        }
    }

    /// Uniform white noise in [-1, 1).
    pub fn fill_with_noise<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.fill_with_noise_amp(rng, 1.0);
    }

    pub fn fill_with_noise_amp<R: Rng + ?Sized>(&mut self, rng: &mut R, amp: f32) {
        for s in self.samples.iter_mut() {
            *s = amp * rng.random_range(-1.0..1.0);
        }
    }

    pub fn multiply_by_noise<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for s in self.samples.iter_mut() {
            *s *= rng.random_range(-1.0..1.0);
        }
    }

    pub fn square(&mut self) {
        for s in self.samples.iter_mut() {
            *s *= *s;
        }
    }

    pub fn sum(&self) -> f32 {
        self.samples.iter().sum()
    }

    pub fn sum_of_squares(&self) -> f32 {
        self.samples.iter().map(|s| s * s).sum()
    }

    /// Linear ramp to zero across the block, for click-free silencing.
    pub fn fadeout(&mut self) {
        fadeout(&mut self.samples);
    }

    /// Hard clip to `[-max, max]`.
    pub fn limit(&mut self, max: f32) {
        for s in self.samples.iter_mut() {
            *s = s.clamp(-max, max);
        }
    }

    pub fn last_sample(&self) -> f32 {
        self.samples.last().copied().unwrap_or(0.0)
    }
}

impl Deref for Block {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.samples
    }
}

impl DerefMut for Block {
    fn deref_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }
}

/// Slice form of [`Block::add_with_multiply`].
pub fn add_with_multiply(dst: &mut [f32], src: &[f32], gain: f32) {
    if gain == 0.0 {
        return;
    }
    debug_assert_eq!(src.len(), dst.len());
    for (d, &x) in dst.iter_mut().zip(src) {
        *d += x * gain;
    }
}

/// Slice form of [`Block::fadeout`], for buffers the scene does not own.
pub fn fadeout(samples: &mut [f32]) {
    let n = samples.len();
    if n == 0 {
        return;
    }
    let step = 1.0 / n as f32;
    for (i, s) in samples.iter_mut().enumerate() {
        *s *= 1.0 - (i + 1) as f32 * step;
    }
}

/// Pool of equally sized blocks.
pub type BlockPool = ObjectPool<Block>;

impl ObjectPool<Block> {
    pub fn with_blocks(capacity: usize, n_frames: usize) -> Result<Self> {
        ObjectPool::with_capacity(capacity, |_| Block::new(n_frames))
    }
}
