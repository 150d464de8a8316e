use std::sync::Arc;

use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::config::EngineContext;
use crate::dsp::block::{self, Block};
use crate::dsp::pulse::TriPulser;
use crate::surface::contact_gen::ContactGen;
use crate::surface::fun::Fun;
use crate::surface::params::SurfaceParams;

/// Recorded impact sounds of one surface, picked at random without playing
/// the same one twice in a row.
#[derive(Debug, Clone, Default)]
pub struct ImpactSamples {
    samples: Vec<Arc<[f32]>>,
    last: Option<usize>,
}

impl ImpactSamples {
    pub fn push(&mut self, samples: Arc<[f32]>) {
        self.samples.push(samples);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&[f32]> {
        self.samples.get(index).map(|s| &s[..])
    }

    pub fn pick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<usize> {
        let n = self.samples.len();
        let index = match (n, self.last) {
            (0, _) => return None,
            (1, _) => 0,
            (_, Some(last)) => {
                // draw from the n-1 others
                let i = rng.random_range(0..n - 1);
                if i >= last {
                    i + 1
                } else {
                    i
                }
            }
            (_, None) => rng.random_range(0..n),
        };
        self.last = Some(index);
        Some(index)
    }
}

/// Momentary input of one impact side.
#[derive(Debug, Clone, Copy, Default)]
struct Strike {
    impulse: f32,
    tangent_speed: f32,
    hardness: f32,
}

/*
Impact Generator
================

On its first tick an impact picks its excitation:

  * the surface has recorded samples  -> play one (non-repeating pick)
  * otherwise                          -> triangle pulse, width 1 / hardness

and, when the tangential speed at impact is above `skid_speed`, also runs a
nested ContactGen for `skid_time` seconds, faded out over its last block.

The generator is quiet once the pulse or sample has fully played and the skid
is over. Impacts never restart: a new collision gets a new generator.
*/

#[derive(Debug, Clone)]
pub struct ImpactGen {
    pulser: TriPulser,
    strike: Strike,
    armed: bool,
    fired: bool,

    sample: Option<usize>,
    sample_pos: usize,
    sample_gain: f32,

    skid: ContactGen,
    skid_block: Block,
    skid_remaining: usize,

    rng: SmallRng,
}

impl ImpactGen {
    pub fn new(seed: u64, ctx: &EngineContext) -> Self {
        Self {
            pulser: TriPulser::new(),
            strike: Strike::default(),
            armed: false,
            fired: false,
            sample: None,
            sample_pos: 0,
            sample_gain: 0.0,
            skid: ContactGen::new(seed.wrapping_add(0x9e37_79b9)),
            skid_block: Block::from_context(ctx),
            skid_remaining: 0,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn reset(&mut self) {
        self.pulser.reset();
        self.strike = Strike::default();
        self.armed = false;
        self.fired = false;
        self.sample = None;
        self.sample_pos = 0;
        self.sample_gain = 0.0;
        self.skid.reset();
        self.skid_remaining = 0;
    }

    /// Arm the generator. Only the first call per impact has an effect.
    pub fn set_dynamics(&mut self, impulse: f32, tangent_speed: f32, hardness: f32) -> bool {
        if self.armed {
            return false;
        }
        self.strike = Strike {
            impulse: impulse.abs(),
            tangent_speed,
            hardness: hardness.max(1.0),
        };
        self.armed = true;
        true
    }

    fn fire(&mut self, params: &SurfaceParams, samples: &mut ImpactSamples, ctx: &EngineContext) {
        self.fired = true;
        let amp = params.impact_gain * self.strike.impulse;

        match samples.pick(&mut self.rng) {
            Some(index) => {
                self.sample = Some(index);
                self.sample_pos = 0;
                self.sample_gain = amp;
            }
            None => {
                let width = ctx.sample_rate / self.strike.hardness;
                self.pulser.hit(amp, width);
            }
        }

        if self.strike.tangent_speed.abs() > params.skid_speed {
            self.skid.reset();
            self.skid.set_dynamics(
                self.strike.tangent_speed,
                self.strike.tangent_speed,
                self.strike.impulse * params.skid_gain,
            );
            self.skid_remaining = ctx.seconds_to_samples(params.skid_time).max(1);
        }
    }

    /// Render one block into `out`. Returns `true` once fully quiet.
    pub fn tick(
        &mut self,
        fun: &Fun,
        params: &SurfaceParams,
        samples: &mut ImpactSamples,
        ctx: &EngineContext,
        out: &mut [f32],
    ) -> bool {
        if !self.armed {
            out.fill(0.0);
            return false;
        }
        if !self.fired {
            self.fire(params, samples, ctx);
        }

        match self.sample {
            Some(_) => self.play_sample(samples, out),
            None => self.pulser.render(out),
        }

        if self.skid_remaining > 0 {
            let n = out.len();
            let skid = &mut self.skid_block.as_mut_slice()[..n];
            self.skid.tick(fun, params, ctx, skid);
            if self.skid_remaining <= n {
                block::fadeout(skid);
                self.skid_remaining = 0;
            } else {
                self.skid_remaining -= n;
            }
            for (o, s) in out.iter_mut().zip(skid.iter()) {
                *o += s;
            }
        }

        self.is_quiet()
    }

    fn play_sample(&mut self, samples: &ImpactSamples, out: &mut [f32]) {
        let recorded = self.sample.and_then(|i| samples.get(i)).unwrap_or(&[]);
        for o in out.iter_mut() {
            *o = match recorded.get(self.sample_pos) {
                Some(&s) => {
                    self.sample_pos += 1;
                    s * self.sample_gain
                }
                None => 0.0,
            };
        }
        if self.sample_pos >= recorded.len() {
            self.sample = None;
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.fired && self.sample.is_none() && self.pulser.is_quiet() && self.skid_remaining == 0
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> EngineContext {
        EngineContext::new(48_000.0, 64)
    }

    fn armed_gen(tangent: f32) -> ImpactGen {
        let mut gen = ImpactGen::new(4, &ctx());
        gen.reset();
        assert!(gen.set_dynamics(1.0, tangent, 2_000.0));
        gen
    }

    #[test]
    fn unarmed_generator_is_silent_and_not_quiet() {
        let params = SurfaceParams::default();
        let mut gen = ImpactGen::new(1, &ctx());
        let mut out = vec![1.0; 64];
        assert!(!gen.tick(&Fun::white(), &params, &mut ImpactSamples::default(), &ctx(), &mut out));
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn pulse_finishes_within_its_width() {
        let params = SurfaceParams::default();
        let mut gen = armed_gen(0.0);
        let mut samples = ImpactSamples::default();
        let mut out = vec![0.0; 64];

        // hardness 2000/s -> 24 sample pulse, fits in one block
        assert!(gen.tick(&Fun::white(), &params, &mut samples, &ctx(), &mut out));
        assert!(out[..24].iter().all(|&s| s > 0.0));
        assert!(out[24..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn second_arm_is_ignored() {
        let mut gen = armed_gen(0.0);
        assert!(!gen.set_dynamics(10.0, 0.0, 100.0));
    }

    #[test]
    fn skid_extends_the_impact() {
        let params = SurfaceParams::default();
        let mut gen = armed_gen(2.0);
        let mut samples = ImpactSamples::default();
        let mut out = vec![0.0; 64];

        let skid_blocks = ctx().seconds_to_samples(params.skid_time).div_ceil(64);
        let mut ticks = 1;
        while !gen.tick(&Fun::white(), &params, &mut samples, &ctx(), &mut out) {
            ticks += 1;
            assert!(ticks <= skid_blocks + 1, "skid ran past its time");
        }
        assert_eq!(ticks, skid_blocks);
    }

    #[test]
    fn plays_recorded_sample_when_available() {
        let params = SurfaceParams::default();
        let mut gen = armed_gen(0.0);
        let mut samples = ImpactSamples::default();
        samples.push(vec![0.5; 100].into());

        let mut out = vec![0.0; 64];
        assert!(!gen.tick(&Fun::white(), &params, &mut samples, &ctx(), &mut out));
        assert!(out.iter().all(|&s| s == 0.5));
        assert!(gen.tick(&Fun::white(), &params, &mut samples, &ctx(), &mut out));
        assert!(out[..36].iter().all(|&s| s == 0.5));
        assert!(out[36..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn sample_pick_never_repeats() {
        let mut samples = ImpactSamples::default();
        for i in 0..3 {
            samples.push(vec![i as f32].into());
        }
        let mut rng = SmallRng::seed_from_u64(12);
        let mut last = samples.pick(&mut rng).unwrap();
        for _ in 0..100 {
            let next = samples.pick(&mut rng).unwrap();
            assert_ne!(next, last);
            last = next;
        }
    }
}
