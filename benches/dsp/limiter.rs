//! Benchmarks for the lookahead output limiter.

use std::hint::black_box;

use contact_dsp::dsp::Limiter;
use contact_dsp::{EngineContext, LimiterConfig};
use criterion::{BenchmarkId, Criterion};

use crate::BLOCK_SIZES;

pub fn bench_limiter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/limiter");
    let config = LimiterConfig::default();

    for &size in BLOCK_SIZES {
        let ctx = EngineContext::new(48_000.0, size);

        // Below threshold: pure delay line
        let quiet: Vec<f32> = (0..size).map(|i| (i as f32 * 0.05).sin() * 0.3).collect();
        let mut limiter = Limiter::new(&config, &ctx);
        let mut buffer = quiet.clone();
        group.bench_with_input(BenchmarkId::new("passthrough", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&quiet);
                limiter.render(black_box(&mut buffer));
            })
        });

        // Repeated overs keep it cycling through attack, hold and release
        let loud: Vec<f32> = (0..size)
            .map(|i| if i % 97 == 0 { 4.0 } else { (i as f32 * 0.05).sin() })
            .collect();
        let mut limiter = Limiter::new(&config, &ctx);
        let mut buffer = loud.clone();
        group.bench_with_input(BenchmarkId::new("limiting", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&loud);
                limiter.render(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
