use crate::config::{EngineContext, LimiterConfig};

/*
Lookahead Peak Limiter
======================

The limiter guarantees |output| <= threshold by delaying the signal and
lowering the gain *before* a peak reaches the output.

  lookahead L   attack time rounded UP to a whole number of blocks. Every
                input sample comes out exactly L samples later.

  gain          multiplies the delayed sample. 1.0 when idle.

  target        threshold / |peak| for the loudest peak still in the delay
                line.


The State Machine
-----------------

    ┌────────┐ peak  ┌────────┐ ramp done ┌──────┐ hold over ┌─────────┐
    │ Direct │ ────→ │ Attack │ ────────→ │ Hold │ ────────→ │ Release │
    └────────┘       └────────┘           └──────┘           └─────────┘
        ↑               ↑  ↑ louder peak      │  ↑ peak ≤ gain     │
        │               │  └──────────────────┘  └─────────────────┤
        │               └──────────── louder peak ─────────────────┤
        └──────────────────────────── gain back at 1.0 ────────────┘

  Attack   gain ramps linearly toward the target so it arrives in at most L
           samples, i.e. no later than the peak itself. A louder peak during
           the attack may only make the slope steeper, never shallower, so
           earlier peaks stay covered.

  Hold     gain frozen until every peak seen has left the delay line plus
           `hold_time`. A peak that the current gain already covers extends
           the hold; a louder one starts a new attack.

  Release  gain rises linearly back to 1.0 over `release_time`. A new peak
           either returns to Hold (covered) or to Attack (not covered).

A zero attack time disables the limiter; `render` then leaves the buffer
untouched and adds no latency.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimiterState {
    Direct,
    Attack,
    Hold,
    Release,
}

#[derive(Debug, Clone)]
pub struct Limiter {
    threshold: f32,
    delay: Vec<f32>,
    write_pos: usize,

    hold_samples: usize,
    release_samples: usize,

    state: LimiterState,
    gain: f32,
    target: f32,
    slope: f32,
    attack_remaining: usize,
    hold_remaining: usize,
    // samples until the most recent over-threshold input reaches the output
    peak_countdown: usize,
}

impl Limiter {
    pub fn new(config: &LimiterConfig, ctx: &EngineContext) -> Self {
        let lookahead = if config.is_enabled() {
            let attack = ctx.seconds_to_samples(config.attack_time).max(1);
            let block = ctx.block_size.max(1);
            attack.div_ceil(block) * block
        } else {
            0
        };

        Self {
            threshold: config.threshold,
            delay: vec![0.0; lookahead],
            write_pos: 0,
            hold_samples: ctx.seconds_to_samples(config.hold_time),
            release_samples: ctx.seconds_to_samples(config.release_time).max(1),
            state: LimiterState::Direct,
            gain: 1.0,
            target: 1.0,
            slope: 0.0,
            attack_remaining: 0,
            hold_remaining: 0,
            peak_countdown: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.delay.is_empty()
    }

    /// Samples of delay the limiter adds to its input.
    pub fn latency(&self) -> usize {
        self.delay.len()
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn state(&self) -> LimiterState {
        self.state
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        if !self.is_enabled() {
            return;
        }
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(*sample);
        }
    }

    #[inline]
    fn next_sample(&mut self, x: f32) -> f32 {
        let level = x.abs();
        if level > self.threshold {
            self.on_peak(self.threshold / level);
        }

        self.advance();
        self.peak_countdown = self.peak_countdown.saturating_sub(1);

        let delayed = std::mem::replace(&mut self.delay[self.write_pos], x);
        self.write_pos += 1;
        if self.write_pos == self.delay.len() {
            self.write_pos = 0;
        }
        delayed * self.gain
    }

    fn on_peak(&mut self, target: f32) {
        let lookahead = self.delay.len();
        self.peak_countdown = lookahead;

        match self.state {
            LimiterState::Direct => self.start_attack(target),
            LimiterState::Attack => {
                if target < self.target {
                    let slope = (target - self.gain) / lookahead as f32;
                    if slope < self.slope {
                        self.slope = slope;
                        self.attack_remaining = lookahead;
                    } else {
                        let steps = ((target - self.gain) / self.slope).ceil();
                        self.attack_remaining = (steps as usize).clamp(1, lookahead);
                    }
                    self.target = target;
                }
            }
            LimiterState::Hold => {
                if target < self.gain {
                    self.start_attack(target);
                } else {
                    self.hold_remaining = self.hold_remaining.max(lookahead + self.hold_samples);
                }
            }
            LimiterState::Release => {
                if target < self.gain {
                    self.start_attack(target);
                } else {
                    self.state = LimiterState::Hold;
                    self.hold_remaining = lookahead + self.hold_samples;
                }
            }
        }
    }

    fn start_attack(&mut self, target: f32) {
        let lookahead = self.delay.len();
        self.state = LimiterState::Attack;
        self.target = target;
        self.slope = (target - self.gain) / lookahead as f32;
        self.attack_remaining = lookahead;
    }

    fn advance(&mut self) {
        match self.state {
            LimiterState::Direct => {}
            LimiterState::Attack => {
                if self.attack_remaining <= 1 {
                    self.gain = self.target;
                    self.state = LimiterState::Hold;
                    self.hold_remaining = self.peak_countdown + self.hold_samples;
                } else {
                    self.gain += self.slope;
                    self.attack_remaining -= 1;
                }
            }
            LimiterState::Hold => {
                if self.hold_remaining > 0 {
                    self.hold_remaining -= 1;
                } else {
                    self.state = LimiterState::Release;
                    self.slope = (1.0 - self.gain) / self.release_samples as f32;
                }
            }
            LimiterState::Release => {
                self.gain += self.slope;
                if self.gain >= 1.0 {
                    self.gain = 1.0;
                    self.target = 1.0;
                    self.state = LimiterState::Direct;
                }
            }
        }
    }

    pub fn reset(&mut self) {
        self.delay.fill(0.0);
        self.write_pos = 0;
        self.state = LimiterState::Direct;
        self.gain = 1.0;
        self.target = 1.0;
        self.slope = 0.0;
        self.attack_remaining = 0;
        self.hold_remaining = 0;
        self.peak_countdown = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    const BLOCK: usize = 64;

    fn ctx() -> EngineContext {
        EngineContext::new(48_000.0, BLOCK)
    }

    fn config() -> LimiterConfig {
        LimiterConfig {
            threshold: 0.5,
            attack_time: 0.001,
            hold_time: 0.0,
            release_time: 0.01,
        }
    }

    #[test]
    fn lookahead_rounds_up_to_whole_blocks() {
        let limiter = Limiter::new(&config(), &ctx());
        // 48 samples of attack -> one block
        assert_eq!(limiter.latency(), BLOCK);

        let long = LimiterConfig {
            attack_time: 0.002,
            ..config()
        };
        // 96 samples -> two blocks
        assert_eq!(Limiter::new(&long, &ctx()).latency(), 2 * BLOCK);
    }

    #[test]
    fn disabled_limiter_is_passthrough() {
        let mut limiter = Limiter::new(&LimiterConfig::disabled(), &ctx());
        assert!(!limiter.is_enabled());

        let mut buffer: Vec<f32> = (0..BLOCK).map(|i| i as f32).collect();
        let expected = buffer.clone();
        limiter.render(&mut buffer);
        assert_eq!(buffer, expected);
    }

    #[test]
    fn output_never_exceeds_threshold() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut limiter = Limiter::new(&config(), &ctx());

        for block in 0..200 {
            let mut buffer: Vec<f32> = (0..BLOCK)
                .map(|_| {
                    let spike = if rng.random_bool(0.05) { 3.0 } else { 0.3 };
                    spike * rng.random_range(-1.0..1.0)
                })
                .collect();
            limiter.render(&mut buffer);

            for (i, y) in buffer.iter().enumerate() {
                assert!(
                    y.abs() <= 0.5 + 1e-4,
                    "block {block} sample {i}: {y} over threshold"
                );
            }
        }
    }

    #[test]
    fn signal_below_threshold_is_only_delayed() {
        let mut limiter = Limiter::new(&config(), &ctx());
        let input: Vec<f32> = (0..4 * BLOCK).map(|i| 0.4 * (i as f32 * 0.1).sin()).collect();

        let mut output = input.clone();
        for chunk in output.chunks_mut(BLOCK) {
            limiter.render(chunk);
        }

        assert_eq!(limiter.state(), LimiterState::Direct);
        let lag = limiter.latency();
        for i in lag..input.len() {
            assert_eq!(output[i], input[i - lag]);
        }
    }

    #[test]
    fn gain_returns_to_unity_after_release() {
        let cfg = config();
        let c = ctx();
        let mut limiter = Limiter::new(&cfg, &c);
        let lookahead = limiter.latency();
        let release = c.seconds_to_samples(cfg.release_time);

        let loud_blocks = 4;
        let mut n = 0;
        for _ in 0..loud_blocks {
            let mut buffer = vec![1.0; BLOCK];
            limiter.render(&mut buffer);
            n += BLOCK;
        }
        assert!(limiter.gain() < 1.0);

        let last_loud = n - 1;
        let mut recovered_at = None;
        while n < last_loud + lookahead + release + 4 * BLOCK {
            let mut buffer = vec![0.1; BLOCK];
            for (i, sample) in buffer.iter_mut().enumerate() {
                let mut one = [*sample];
                limiter.render(&mut one);
                *sample = one[0];
                if recovered_at.is_none() && limiter.state() == LimiterState::Direct {
                    recovered_at = Some(n + i);
                }
            }
            n += BLOCK;
        }

        let recovered_at = recovered_at.expect("limiter never released");
        let emerged = last_loud + lookahead;
        assert!(
            recovered_at <= emerged + release + BLOCK,
            "released at {recovered_at}, peak left delay at {emerged}"
        );
        assert_eq!(limiter.gain(), 1.0);
    }

    #[test]
    fn louder_peak_during_attack_is_still_caught() {
        let mut limiter = Limiter::new(&config(), &ctx());
        let mut buffer = vec![0.0; 3 * BLOCK];
        buffer[10] = 1.0;
        buffer[20] = 4.0;
        limiter.render(&mut buffer);

        let lag = limiter.latency();
        assert!(buffer[10 + lag] <= 0.5 + 1e-4);
        assert!((buffer[20 + lag] - 0.5).abs() < 1e-4);
    }
}
