//! Benchmarks for the one-pole and biquad filters.

use std::hint::black_box;

use contact_dsp::dsp::filter::{Biquad, BiquadCoeffs, Highpass, Lowpass};
use contact_dsp::EngineContext;
use criterion::{BenchmarkId, Criterion};

use crate::BLOCK_SIZES;

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");

    for &size in BLOCK_SIZES {
        let ctx = EngineContext::new(48_000.0, size);
        // Generate a test signal (sawtooth-like ramp)
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 / size as f32) * 2.0 - 1.0)
            .collect();

        // Lowpass with a new cutoff every block, as contact generators use it
        let mut lowpass = Lowpass::with_cutoff(1_000.0, &ctx);
        let mut buffer = input.clone();
        let mut flip = false;
        group.bench_with_input(BenchmarkId::new("lowpass_ramped", size), &size, |b, _| {
            b.iter(|| {
                flip = !flip;
                let cutoff = if flip { 800.0 } else { 4_000.0 };
                lowpass.set(cutoff, 0.5, &ctx);
                buffer.copy_from_slice(&input);
                lowpass.render(black_box(&mut buffer));
            })
        });

        let mut highpass = Highpass::with_cutoff(200.0, &ctx);
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("highpass", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                highpass.render(black_box(&mut buffer));
            })
        });

        let mut biquad = Biquad::new(BiquadCoeffs::bandpass(1_000.0, 4.0, ctx.sample_rate));
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("biquad_bandpass", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                biquad.render(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
