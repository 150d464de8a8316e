use std::sync::Arc;

use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::config::EngineContext;
use crate::error::{Result, SynthError};

/*
Excitation Functions
====================

A Fun is the raw texture of a surface, before any speed-dependent filtering.
It is stateless: everything that changes while a contact is playing lives in
the generator's `FunState`, so one Fun can drive any number of concurrent
contacts.

| variant | output                                 | depends on rate |
| ------- | -------------------------------------- | --------------- |
| White   | uniform noise in [-1, 1]               | no              |
| Grid    | fixed random pattern over distance     | yes (position)  |
| Rnd     | random bumps, sample-and-hold          | yes (density)   |
| Wav     | looped recording                       | yes (playback)  |

`rate` is the contact point's speed relative to the body the generator
belongs to, in m/s.


Grid
----

The position integrates the rate: pos += rate / fs. The value is whatever the
pattern holds in the cell under the position:

    cell  = floor(pos / spacing)
    value = pattern[cell mod len]

Because the value depends only on where the contact is, rolling backwards over
the same spot replays the same texture in reverse.


Rnd
---

Each sample a new random value is drawn with probability

    p = |rate| * zero_rate / fs

otherwise the previous value is held, or dropped to zero when
`return_to_zero` is set (isolated clicks instead of a stepped signal).
*/

#[derive(Debug, Clone)]
pub enum Fun {
    White,
    Grid {
        spacing: f32,
        pattern: Arc<[f32]>,
    },
    Rnd {
        zero_rate: f32,
        return_to_zero: bool,
    },
    Wav {
        samples: Arc<[f32]>,
        rate_scale: f32,
        interpolate: bool,
    },
}

/// Per-generator state of a running Fun.
#[derive(Debug, Clone, Copy, Default)]
pub struct FunState {
    position: f64,
    value: f32,
}

impl FunState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl Fun {
    pub fn white() -> Self {
        Fun::White
    }

    /// A grid of `cells` random values spaced `spacing` metres apart.
    pub fn grid(spacing: f32, cells: usize, seed: u64) -> Result<Self> {
        if !spacing.is_finite() || spacing <= 0.0 {
            return Err(SynthError::Configuration(format!(
                "grid spacing must be positive, got {spacing}"
            )));
        }
        if cells == 0 {
            return Err(SynthError::Configuration("grid needs at least one cell".into()));
        }
        let mut rng = SmallRng::seed_from_u64(seed);
        let pattern: Vec<f32> = (0..cells).map(|_| rng.random_range(-1.0..1.0)).collect();
        Ok(Fun::Grid {
            spacing,
            pattern: pattern.into(),
        })
    }

    pub fn rnd(zero_rate: f32, return_to_zero: bool) -> Result<Self> {
        if zero_rate.is_nan() || zero_rate < 0.0 {
            return Err(SynthError::Configuration(format!(
                "rnd zero rate must not be negative, got {zero_rate}"
            )));
        }
        Ok(Fun::Rnd {
            zero_rate,
            return_to_zero,
        })
    }

    pub fn wav(samples: impl Into<Arc<[f32]>>, rate_scale: f32, interpolate: bool) -> Result<Self> {
        let samples = samples.into();
        if samples.is_empty() {
            return Err(SynthError::Configuration("wav fun needs samples".into()));
        }
        Ok(Fun::Wav {
            samples,
            rate_scale,
            interpolate,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Fun::White => "white",
            Fun::Grid { .. } => "grid",
            Fun::Rnd { .. } => "rnd",
            Fun::Wav { .. } => "wav",
        }
    }

    /// Fill `out` with the next stretch of excitation at `rate` m/s.
    pub fn render(
        &self,
        state: &mut FunState,
        rate: f32,
        rng: &mut SmallRng,
        ctx: &EngineContext,
        out: &mut [f32],
    ) {
        match self {
            Fun::White => {
                for s in out.iter_mut() {
                    *s = rng.random_range(-1.0..1.0);
                }
            }
            Fun::Grid { spacing, pattern } => {
                let step = rate as f64 / ctx.sample_rate as f64;
                let spacing = *spacing as f64;
                let len = pattern.len() as i64;
                for s in out.iter_mut() {
                    state.position += step;
                    let cell = (state.position / spacing).floor() as i64;
                    *s = pattern[cell.rem_euclid(len) as usize];
                }
            }
            Fun::Rnd {
                zero_rate,
                return_to_zero,
            } => {
                let p = (rate.abs() * zero_rate / ctx.sample_rate).min(1.0);
                for s in out.iter_mut() {
                    if rng.random::<f32>() < p {
                        state.value = rng.random_range(-1.0..1.0);
                        *s = state.value;
                    } else {
                        if *return_to_zero {
                            state.value = 0.0;
                        }
                        *s = state.value;
                    }
                }
            }
            Fun::Wav {
                samples,
                rate_scale,
                interpolate,
            } => {
                let len = samples.len() as f64;
                let step = (rate * rate_scale) as f64;
                for s in out.iter_mut() {
                    state.position = (state.position + step).rem_euclid(len);
                    let i = state.position.floor() as usize % samples.len();
                    *s = if *interpolate {
                        let frac = (state.position - i as f64) as f32;
                        let next = samples[(i + 1) % samples.len()];
                        samples[i] + (next - samples[i]) * frac
                    } else {
                        samples[i]
                    };
                }
            }
        }
    }
}
