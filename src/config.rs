//! Configuration for contact_dsp

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Result, SynthError};
use crate::MAX_BLOCK_SIZE;

/// Rendering context threaded through every component.
///
/// Fixed once the engine is initialised: pools and lookahead buffers are
/// sized from `block_size`, coefficients are derived from `sample_rate`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineContext {
    pub sample_rate: f32,
    pub block_size: usize,
}

impl EngineContext {
    pub fn new(sample_rate: f32, block_size: usize) -> Self {
        Self {
            sample_rate,
            block_size,
        }
    }

    #[inline]
    pub fn nyquist(&self) -> f32 {
        self.sample_rate * 0.5
    }

    /// Duration of one block in seconds.
    #[inline]
    pub fn block_time(&self) -> f32 {
        self.block_size as f32 / self.sample_rate
    }

    #[inline]
    pub fn seconds_to_samples(&self, seconds: f32) -> usize {
        (seconds.max(0.0) * self.sample_rate).round() as usize
    }
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::new(48_000.0, 256)
    }
}

/// Static capacity decisions, made once at init.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolCapacities {
    /// Pooled blocks; one is held as input by every active resonator.
    pub blocks: usize,
    pub contacts: usize,
    pub impacts: usize,
    /// Contact generators per surface.
    pub contact_gens: usize,
    /// Impact generators per surface.
    pub impact_gens: usize,
    pub active_resonators: usize,
}

impl Default for PoolCapacities {
    fn default() -> Self {
        Self {
            blocks: 64,
            contacts: 64,
            impacts: 64,
            contact_gens: 32,
            impact_gens: 32,
            active_resonators: 48,
        }
    }
}

/// Output limiter settings. An `attack_time` of zero disables the limiter.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimiterConfig {
    pub threshold: f32,
    pub attack_time: f32,
    pub hold_time: f32,
    pub release_time: f32,
}

impl LimiterConfig {
    pub fn disabled() -> Self {
        Self {
            attack_time: 0.0,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.attack_time > 0.0
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            threshold: 0.95,
            attack_time: 0.002,
            hold_time: 0.02,
            release_time: 0.15,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: f32,
    pub block_size: usize,
    pub capacities: PoolCapacities,
    pub limiter: LimiterConfig,
    /// Ceiling on the summed time cost of all active resonators.
    pub max_time_cost: f32,
    pub command_queue_size: usize,
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            block_size: 256,
            capacities: PoolCapacities::default(),
            limiter: LimiterConfig::default(),
            max_time_cost: 2_000.0,
            command_queue_size: 256,
            seed: 0x5eed_c0ac,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample_rate(mut self, rate: f32) -> Self {
        self.sample_rate = rate;
        self
    }

    pub fn block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    pub fn capacities(mut self, capacities: PoolCapacities) -> Self {
        self.capacities = capacities;
        self
    }

    pub fn limiter(mut self, limiter: LimiterConfig) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn max_time_cost(mut self, cost: f32) -> Self {
        self.max_time_cost = cost;
        self
    }

    pub fn command_queue_size(mut self, size: usize) -> Self {
        self.command_queue_size = size;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn context(&self) -> EngineContext {
        EngineContext::new(self.sample_rate, self.block_size)
    }

    /// Reject configurations that could exhaust a pool on the audio path.
    pub fn validate(&self) -> Result<()> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(SynthError::InvalidSampleRate(self.sample_rate));
        }
        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(SynthError::BlockSize {
                requested: self.block_size,
                max: MAX_BLOCK_SIZE,
            });
        }

        let caps = &self.capacities;
        let all = [
            caps.blocks,
            caps.contacts,
            caps.impacts,
            caps.contact_gens,
            caps.impact_gens,
            caps.active_resonators,
        ];
        if all.contains(&0) {
            return Err(SynthError::ZeroCapacity);
        }
        if caps.blocks < caps.active_resonators {
            return Err(SynthError::Configuration(format!(
                "block pool ({}) smaller than active resonator capacity ({})",
                caps.blocks, caps.active_resonators
            )));
        }
        if self.max_time_cost < 0.0 {
            return Err(SynthError::Configuration(
                "max_time_cost must not be negative".into(),
            ));
        }
        if self.limiter.is_enabled() && self.limiter.threshold <= 0.0 {
            return Err(SynthError::Configuration(
                "limiter threshold must be positive".into(),
            ));
        }
        Ok(())
    }
}
