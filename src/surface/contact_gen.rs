use rand::{rngs::SmallRng, SeedableRng};

use crate::config::EngineContext;
use crate::dsp::filter::Lowpass;
use crate::surface::fun::{Fun, FunState};
use crate::surface::params::SurfaceParams;

/*
Contact Generator
=================

Turns a surface's raw Fun texture into one side of a sliding or rolling
contact:

    Fun(rate = contact speed) ──→ Lowpass(cutoff(slip), amp) ──→ out

  slip speed      relative speed of the two bodies at the contact. Drives the
                  brightness: cutoff rises linearly with |slip| between
                  `cutoff_min` and `cutoff_max`.

  contact speed   speed of the contact point over this body's surface. Drives
                  the Fun (how fast the texture is scanned).

  force           normal force. Drives the loudness, smoothed once per block:

                      amp += (target - amp) * (1 - exp(-block_time / tau))

The lowpass ramps cutoff and gain across each block, so the per-block parameter
updates never step.

A generator goes inactive once it is quiet (smoothed amp and slip both under
their thresholds) and wakes itself up again when the slip or contact speed
climbs past `wake_speed`.
*/

#[derive(Debug, Clone)]
pub struct ContactGen {
    fun_state: FunState,
    lowpass: Lowpass,
    rng: SmallRng,
    amp: f32,
    contact_speed: f32,
    slip_speed: f32,
    force: f32,
    active: bool,
}

impl ContactGen {
    pub fn new(seed: u64) -> Self {
        Self {
            fun_state: FunState::default(),
            lowpass: Lowpass::new(),
            rng: SmallRng::seed_from_u64(seed),
            amp: 0.0,
            contact_speed: 0.0,
            slip_speed: 0.0,
            force: 0.0,
            active: true,
        }
    }

    /// Clear per-event state before the generator is handed out again.
    pub fn reset(&mut self) {
        self.fun_state.reset();
        self.lowpass = Lowpass::new();
        self.lowpass.set_gain(0.0);
        self.lowpass.jump_to_target();
        self.amp = 0.0;
        self.contact_speed = 0.0;
        self.slip_speed = 0.0;
        self.force = 0.0;
        self.active = true;
    }

    pub fn set_dynamics(&mut self, contact_speed: f32, slip_speed: f32, force: f32) {
        self.contact_speed = contact_speed;
        self.slip_speed = slip_speed;
        self.force = force;
    }

    /// Whether the generator should be ticked this block. Wakes a sleeping
    /// generator when the contact starts moving again.
    pub fn is_active(&mut self, params: &SurfaceParams) -> bool {
        if !self.active
            && (self.slip_speed.abs() > params.wake_speed
                || self.contact_speed.abs() > params.wake_speed)
        {
            self.active = true;
        }
        self.active
    }

    pub fn is_quiet(&self, params: &SurfaceParams) -> bool {
        self.amp < params.quiet_amp && self.slip_speed.abs() < params.quiet_speed
    }

    /// Render one block into `out`. Returns `true` if the generator went
    /// quiet during this block.
    pub fn tick(
        &mut self,
        fun: &Fun,
        params: &SurfaceParams,
        ctx: &EngineContext,
        out: &mut [f32],
    ) -> bool {
        let target = params.contact_amp(self.force, self.slip_speed);
        let alpha = if params.amp_smoothing_time > 0.0 {
            1.0 - (-ctx.block_time() / params.amp_smoothing_time).exp()
        } else {
            1.0
        };
        self.amp += (target - self.amp) * alpha;

        fun.render(
            &mut self.fun_state,
            self.contact_speed.abs(),
            &mut self.rng,
            ctx,
            out,
        );
        self.lowpass
            .set(params.cutoff_for_speed(self.slip_speed), self.amp, ctx);
        self.lowpass.render(out);

        if self.is_quiet(params) {
            self.active = false;
            true
        } else {
            false
        }
    }

    pub fn amp(&self) -> f32 {
        self.amp
    }
}
