use std::f32::consts::{PI, TAU};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::EngineContext;
use crate::DENORMAL_BIAS;

/*
Contact Filters
===============

| type      | order | used for                                  | ramped |
| --------- | ----- | ----------------------------------------- | ------ |
| Lowpass   | 1     | speed-dependent brightness of contacts    | yes    |
| Highpass  | 1     | x - lowpass(x), removes rumble and DC     | yes    |
| Biquad    | 2     | general shaping (RBJ cookbook designs)    | no     |


One-Pole Lowpass
----------------

    y[n] = (1 - p) * g * x[n] + p * y[n-1]

  p   pole, 0 <= p < 1. p = 0 passes the input straight through, p -> 1
      holds the previous output (DC hold).
  g   output gain.

The pole comes from the usual impulse-invariant mapping

    p = exp(-2π fc / fs)

which never quite reaches p = 0, so the filter could not become transparent
at Nyquist. Above a knee at fs/4 the pole is scaled down linearly so that it
lands exactly on zero at fs/2:

    pole
     1 ┐╲
       │ ╲
       │  ╲___
       │      ╲___            exp mapping up to the knee,
       │          ╲___        then a straight line to 0
     0 └──────────────╲───→ fc
       0        fs/4  fs/2


Parameter Ramps
---------------

Contact parameters change once per block. Jumping the pole or gain at a block
boundary is audible as zipper noise, so `set` only stores a target and
`render` walks both pole and gain linearly from their previous values to the
target across the block. The next block starts exactly on the target.

A tiny bias is added to the feedback path so a decaying tail never falls into
denormal range.
*/

/// Map a cutoff in Hz to a one-pole coefficient, reaching exactly 0 at Nyquist.
pub fn cutoff_to_pole(cutoff_hz: f32, sample_rate: f32) -> f32 {
    let nyquist = sample_rate * 0.5;
    let knee = nyquist * 0.5;
    let fc = cutoff_hz.clamp(0.0, nyquist);

    let pole = (-TAU * fc.min(knee) / sample_rate).exp();
    if fc > knee {
        pole * (nyquist - fc) / (nyquist - knee)
    } else {
        pole
    }
}

#[derive(Debug, Clone)]
pub struct Lowpass {
    pole: f32,
    gain: f32,
    target_pole: f32,
    target_gain: f32,
    state: f32,
}

impl Default for Lowpass {
    fn default() -> Self {
        Self::new()
    }
}

impl Lowpass {
    /// A transparent filter: pole 0, gain 1.
    pub fn new() -> Self {
        Self {
            pole: 0.0,
            gain: 1.0,
            target_pole: 0.0,
            target_gain: 1.0,
            state: 0.0,
        }
    }

    pub fn with_cutoff(cutoff_hz: f32, ctx: &EngineContext) -> Self {
        let mut filter = Self::new();
        filter.set(cutoff_hz, 1.0, ctx);
        filter.jump_to_target();
        filter
    }

    /// Target cutoff and gain, reached by the end of the next rendered block.
    pub fn set(&mut self, cutoff_hz: f32, gain: f32, ctx: &EngineContext) {
        self.target_pole = cutoff_to_pole(cutoff_hz, ctx.sample_rate);
        self.target_gain = gain;
    }

    pub fn set_cutoff(&mut self, cutoff_hz: f32, ctx: &EngineContext) {
        self.target_pole = cutoff_to_pole(cutoff_hz, ctx.sample_rate);
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.target_gain = gain;
    }

    /// Skip the ramp; the next block renders with the targets from its first sample.
    pub fn jump_to_target(&mut self) {
        self.pole = self.target_pole;
        self.gain = self.target_gain;
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        let n = buffer.len();
        if n == 0 {
            return;
        }

        let dp = (self.target_pole - self.pole) / n as f32;
        let dg = (self.target_gain - self.gain) / n as f32;
        let mut pole = self.pole;
        let mut gain = self.gain;
        let mut y = self.state;

        for sample in buffer.iter_mut() {
            pole += dp;
            gain += dg;
            y = (1.0 - pole) * gain * *sample + pole * y + DENORMAL_BIAS;
            *sample = y;
        }

        self.pole = self.target_pole;
        self.gain = self.target_gain;
        self.state = y;
    }

    /// Filter `input` into `output` without touching `input`.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        output.copy_from_slice(input);
        self.render(output);
    }

    pub fn reset(&mut self) {
        self.state = 0.0;
        self.jump_to_target();
    }

    pub fn pole(&self) -> f32 {
        self.pole
    }

    pub fn last_output(&self) -> f32 {
        self.state
    }
}

/// First-order highpass built as `x - lowpass(x)`.
#[derive(Debug, Clone)]
pub struct Highpass {
    lowpass: Lowpass,
}

impl Default for Highpass {
    fn default() -> Self {
        Self::new()
    }
}

impl Highpass {
    /// Starts fully open at the low end: cutoff 0 Hz.
    pub fn new() -> Self {
        let mut lowpass = Lowpass::new();
        lowpass.target_pole = 1.0;
        lowpass.jump_to_target();
        Self { lowpass }
    }

    pub fn with_cutoff(cutoff_hz: f32, ctx: &EngineContext) -> Self {
        Self {
            lowpass: Lowpass::with_cutoff(cutoff_hz, ctx),
        }
    }

    pub fn set_cutoff(&mut self, cutoff_hz: f32, ctx: &EngineContext) {
        self.lowpass.set_cutoff(cutoff_hz, ctx);
    }

    pub fn jump_to_target(&mut self) {
        self.lowpass.jump_to_target();
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        let pole0 = self.lowpass.pole;
        let n = buffer.len();
        if n == 0 {
            return;
        }
        let dp = (self.lowpass.target_pole - pole0) / n as f32;
        let mut pole = pole0;
        let mut y = self.lowpass.state;

        for sample in buffer.iter_mut() {
            pole += dp;
            y = (1.0 - pole) * *sample + pole * y + DENORMAL_BIAS;
            *sample -= y;
        }

        self.lowpass.pole = self.lowpass.target_pole;
        self.lowpass.state = y;
    }

    pub fn reset(&mut self) {
        self.lowpass.reset();
    }
}

/// Normalized second-order coefficients (a0 folded in).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        Self::identity()
    }
}

impl BiquadCoeffs {
    pub fn identity() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }

    pub fn lowpass(cutoff_hz: f32, q: f32, sample_rate: f32) -> Self {
        let (cos_w, alpha) = Self::prewarp(cutoff_hz, q, sample_rate);
        let b1 = 1.0 - cos_w;
        Self::normalize(b1 * 0.5, b1, b1 * 0.5, 1.0 + alpha, -2.0 * cos_w, 1.0 - alpha)
    }

    pub fn highpass(cutoff_hz: f32, q: f32, sample_rate: f32) -> Self {
        let (cos_w, alpha) = Self::prewarp(cutoff_hz, q, sample_rate);
        let b1 = -(1.0 + cos_w);
        Self::normalize(-b1 * 0.5, b1, -b1 * 0.5, 1.0 + alpha, -2.0 * cos_w, 1.0 - alpha)
    }

    /// Constant 0 dB peak gain.
    pub fn bandpass(center_hz: f32, q: f32, sample_rate: f32) -> Self {
        let (cos_w, alpha) = Self::prewarp(center_hz, q, sample_rate);
        Self::normalize(alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos_w, 1.0 - alpha)
    }

    fn prewarp(freq_hz: f32, q: f32, sample_rate: f32) -> (f32, f32) {
        // keep w strictly inside (0, π) so the designs stay stable
        let nyquist = sample_rate * 0.5;
        let freq = freq_hz.clamp(1.0e-3, nyquist * 0.999);
        let w = 2.0 * PI * freq / sample_rate;
        let q = q.max(1.0e-3);
        (w.cos(), w.sin() / (2.0 * q))
    }

    fn normalize(b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) -> Self {
        let inv = 1.0 / a0;
        Self {
            b0: b0 * inv,
            b1: b1 * inv,
            b2: b2 * inv,
            a1: a1 * inv,
            a2: a2 * inv,
        }
    }
}

/// Transposed direct form II biquad.
#[derive(Debug, Clone, Default)]
pub struct Biquad {
    coeffs: BiquadCoeffs,
    s1: f32,
    s2: f32,
}

impl Biquad {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            s1: 0.0,
            s2: 0.0,
        }
    }

    /// Swap coefficients without clearing state.
    pub fn set_coeffs(&mut self, coeffs: BiquadCoeffs) {
        self.coeffs = coeffs;
    }

    pub fn coeffs(&self) -> BiquadCoeffs {
        self.coeffs
    }

    #[inline]
    pub fn next_sample(&mut self, x: f32) -> f32 {
        let c = &self.coeffs;
        let y = c.b0 * x + self.s1;
        self.s1 = c.b1 * x - c.a1 * y + self.s2 + DENORMAL_BIAS;
        self.s2 = c.b2 * x - c.a2 * y;
        y
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(*sample);
        }
    }

    pub fn reset(&mut self) {
        self.s1 = 0.0;
        self.s2 = 0.0;
    }
}
