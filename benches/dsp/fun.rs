//! Benchmarks for surface excitation strategies.

use std::hint::black_box;

use contact_dsp::surface::{Fun, FunState};
use contact_dsp::EngineContext;
use criterion::{BenchmarkId, Criterion};
use rand::{rngs::SmallRng, SeedableRng};

use crate::BLOCK_SIZES;

pub fn bench_fun(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/fun");
    let table: Vec<f32> = (0..4_800).map(|i| (i as f32 * 0.01).sin()).collect();

    // Constructor arguments are all valid
    let funs = [
        Fun::white(),
        Fun::grid(0.002, 64, 7).unwrap(),
        Fun::rnd(500.0, true).unwrap(),
        Fun::wav(table, 1_000.0, true).unwrap(),
    ];

    for &size in BLOCK_SIZES {
        let ctx = EngineContext::new(48_000.0, size);
        let mut buffer = vec![0.0f32; size];

        for fun in &funs {
            let mut state = FunState::default();
            let mut rng = SmallRng::seed_from_u64(1);
            group.bench_with_input(BenchmarkId::new(fun.name(), size), &size, |b, _| {
                b.iter(|| {
                    fun.render(&mut state, black_box(0.7), &mut rng, &ctx, black_box(&mut buffer));
                })
            });
        }
    }

    group.finish();
}
