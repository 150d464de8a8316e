use std::f32::consts::TAU;
use std::sync::Arc;

use crate::config::EngineContext;
use crate::res::modal_data::ModalData;
use crate::DENORMAL_BIAS;

/*
Modal Resonator
===============

A struck object rings as a sum of exponentially decaying sinusoids, one per
vibration mode. Each mode is a 2x2 recursive oscillator with state (u, v):

    u[n] = c- * u[n-1] - v[n-1] + aa * x[n]
    v[n] = c+ * v[n-1] + u[n-1]
    y[n] += v[n]

with, for frequency f, decay rate d and amplitude a at sample rate fs:

    r  = exp(-d / fs)                  per-sample decay
    θ  = 2π f / fs                     per-sample rotation
    S  = sqrt(1 - r² sin²θ)
    c+ = r cosθ + S
    c- = r cosθ - S
    aa = a r sinθ                      so a unit impulse rings at amplitude a

The update matrix [[c-, -1], [1, c+]] has trace 2 r cosθ and determinant r²,
i.e. eigenvalues r e^(±iθ): a rotation by θ shrinking by r every sample.


Quiet Detection
---------------

The quadratic form

    E = l0 * (u² + l1 u v + v²),   l0 = 1 / sin²θ,   l1 = 2 S

shrinks by exactly r² per sample, and for a ringing mode equals its squared
amplitude. Summing E over all modes gives a phase-independent loudness
estimate; the resonator is quiet when it drops under quiet_level².


Coefficient Updates
-------------------

Coefficients are derived from the modal data times the instance's aux scales
and the contact damping of the current block. They are recomputed only when
something changed (the dirty flag): new data, new aux scales, or a contact
damping different from the previous block's.

A mode whose scaled frequency reaches fs/2 would alias. It is switched off
(aa = 0, state cleared) rather than folded back.
*/

#[derive(Debug, Clone, Copy, Default)]
struct ModeCoeffs {
    cplus: f32,
    cminus: f32,
    aa: f32,
    l0: f32,
    l1: f32,
    enabled: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct ModeState {
    u: f32,
    v: f32,
}

#[derive(Debug, Clone)]
pub struct ModalRes {
    ctx: EngineContext,
    data: Option<Arc<ModalData>>,
    coeffs: Vec<ModeCoeffs>,
    state: Vec<ModeState>,

    aux_freq: f32,
    aux_damp: f32,
    aux_amp: f32,

    contact_damping: f32,
    applied_damping: f32,
    max_contact_damping: f32,
    in_contact: bool,

    quiet_level: f32,
    make_quiet: bool,
    dirty: bool,
    active: bool,

    time_cost: Option<f32>,
    n_enabled: usize,
}

impl ModalRes {
    pub fn new(ctx: EngineContext) -> Self {
        Self {
            ctx,
            data: None,
            coeffs: Vec::new(),
            state: Vec::new(),
            aux_freq: 1.0,
            aux_damp: 1.0,
            aux_amp: 1.0,
            contact_damping: 1.0,
            applied_damping: 1.0,
            max_contact_damping: 100.0,
            in_contact: false,
            quiet_level: 1.0e-4,
            make_quiet: false,
            dirty: true,
            active: false,
            time_cost: None,
            n_enabled: 0,
        }
    }

    pub fn with_data(ctx: EngineContext, data: Arc<ModalData>) -> Self {
        let mut res = Self::new(ctx);
        res.set_data(data);
        res
    }

    /// Assign modes. Sizes the per-mode state, zeroes it and recomputes.
    pub fn set_data(&mut self, data: Arc<ModalData>) {
        let n = data.n_modes();
        self.coeffs = vec![ModeCoeffs::default(); n];
        self.state = vec![ModeState::default(); n];
        self.data = Some(data);
        self.dirty = true;
        self.update_coeffs();
    }

    pub fn data(&self) -> Option<&Arc<ModalData>> {
        self.data.as_ref()
    }

    pub fn n_modes(&self) -> usize {
        self.coeffs.len()
    }

    /// Modes below Nyquist after scaling.
    pub fn n_enabled_modes(&self) -> usize {
        self.n_enabled
    }

    pub(crate) fn activate(&mut self) {
        self.active = true;
    }

    /// Leave the active set. State is cleared so the next activation starts
    /// from silence.
    pub(crate) fn deactivate(&mut self) {
        self.active = false;
        self.make_quiet = false;
        self.reset_state();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn reset_state(&mut self) {
        self.state.fill(ModeState::default());
    }

    /// Per-instance scales on top of the modal data.
    pub fn set_aux(&mut self, freq_scale: f32, damp_scale: f32, amp_scale: f32) {
        self.aux_freq = freq_scale;
        self.aux_damp = damp_scale;
        self.aux_amp = amp_scale;
        self.dirty = true;
    }

    pub fn aux(&self) -> (f32, f32, f32) {
        (self.aux_freq, self.aux_damp, self.aux_amp)
    }

    pub fn set_quiet_level(&mut self, level: f32) {
        self.quiet_level = level.max(0.0);
    }

    pub fn set_max_contact_damping(&mut self, max: f32) {
        self.max_contact_damping = max.max(1.0);
    }

    /// Override the budget cost. `None` restores the default: one unit per
    /// enabled mode.
    pub fn set_time_cost(&mut self, cost: Option<f32>) {
        self.time_cost = cost;
    }

    pub fn time_cost(&self) -> f32 {
        self.time_cost.unwrap_or(self.n_enabled as f32)
    }

    /// Start of a block: forget last block's contacts.
    pub fn begin_block(&mut self) {
        self.contact_damping = 1.0;
        self.in_contact = false;
    }

    /// Something is touching this resonator this block; `factor` scales its
    /// decay rates.
    pub fn add_contact_damping(&mut self, factor: f32) {
        self.in_contact = true;
        self.contact_damping = (self.contact_damping * factor.max(0.0)).min(self.max_contact_damping);
    }

    pub fn is_in_contact(&self) -> bool {
        self.in_contact
    }

    pub fn contact_damping(&self) -> f32 {
        self.contact_damping
    }

    /// Report quiet once on the next check, whatever the level.
    pub fn make_quiet(&mut self) {
        self.make_quiet = true;
    }

    pub fn is_quiet(&mut self) -> bool {
        if self.make_quiet {
            self.make_quiet = false;
            return true;
        }
        self.level() < self.quiet_level * self.quiet_level
    }

    /// Summed squared amplitude of all ringing modes.
    pub fn level(&self) -> f32 {
        self.coeffs
            .iter()
            .zip(&self.state)
            .filter(|(c, _)| c.enabled)
            .map(|(c, s)| c.l0 * (s.u * s.u + c.l1 * s.u * s.v + s.v * s.v))
            .sum()
    }

    /// Resonate `input` into `output`, overwriting it.
    pub fn tick(&mut self, input: &[f32], output: &mut [f32]) {
        output.fill(0.0);
        self.tick_add(input, output);
    }

    /// Resonate `input` and add the result to `output`.
    pub fn tick_add(&mut self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(input.len(), output.len());
        if self.contact_damping != self.applied_damping {
            self.dirty = true;
        }
        if self.dirty {
            self.update_coeffs();
        }

        for (c, s) in self.coeffs.iter().zip(self.state.iter_mut()) {
            if !c.enabled {
                continue;
            }
            let (mut u, mut v) = (s.u, s.v);
            for (&x, y) in input.iter().zip(output.iter_mut()) {
                let u_prev = u;
                u = c.cminus * u - v + c.aa * x + DENORMAL_BIAS;
                v = c.cplus * v + u_prev;
                *y += v;
            }
            s.u = u;
            s.v = v;
        }
    }

    fn update_coeffs(&mut self) {
        self.dirty = false;
        self.applied_damping = self.contact_damping;
        let Some(data) = self.data.as_ref() else {
            self.n_enabled = 0;
            return;
        };

        let fs = self.ctx.sample_rate;
        let nyquist = self.ctx.nyquist();
        let mut n_enabled = 0;

        for (i, (c, s)) in self.coeffs.iter_mut().zip(self.state.iter_mut()).enumerate() {
            let Some(mode) = data.scaled(i) else {
                continue;
            };
            let freq = mode.freq * self.aux_freq;
            if !(freq > 0.0 && freq < nyquist) {
                *c = ModeCoeffs::default();
                *s = ModeState::default();
                continue;
            }

            let damp = (mode.damp * self.aux_damp * self.contact_damping).max(0.0);
            let amp = mode.amp * self.aux_amp;
            let r = (-damp / fs).exp();
            let theta = TAU * freq / fs;
            let (sin_t, cos_t) = theta.sin_cos();
            let root = (1.0 - r * r * sin_t * sin_t).max(0.0).sqrt();

            *c = ModeCoeffs {
                cplus: r * cos_t + root,
                cminus: r * cos_t - root,
                aa: amp * r * sin_t,
                l0: 1.0 / (sin_t * sin_t),
                l1: 2.0 * root,
                enabled: true,
            };
            n_enabled += 1;
        }
        self.n_enabled = n_enabled;
    }
}
