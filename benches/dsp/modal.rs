//! Benchmarks for the modal resonator bank.
//!
//! Cost is linear in the number of modes; the scene's time cost defaults to
//! that number, so these give the real-time price of one budget unit.

use std::hint::black_box;
use std::sync::Arc;

use contact_dsp::res::{ModalData, ModalRes, Mode};
use contact_dsp::EngineContext;
use criterion::{BenchmarkId, Criterion};

use crate::BLOCK_SIZES;

const MODE_COUNTS: &[usize] = &[8, 32, 128];

fn bank(n: usize) -> Arc<ModalData> {
    let modes = (0..n)
        .map(|i| Mode::new(120.0 + 97.0 * i as f32, 3.0 + 0.5 * i as f32, 1.0 / (1 + i) as f32))
        .collect();
    // n > 0 for every entry of MODE_COUNTS
    Arc::new(ModalData::new(modes).unwrap())
}

pub fn bench_modal(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/modal");

    for &size in BLOCK_SIZES {
        let ctx = EngineContext::new(48_000.0, size);
        let mut input = vec![0.0f32; size];
        input[0] = 1.0;
        let mut output = vec![0.0f32; size];

        for &n in MODE_COUNTS {
            let mut res = ModalRes::with_data(ctx, bank(n));
            group.bench_with_input(
                BenchmarkId::new(format!("{n}_modes"), size),
                &size,
                |b, _| {
                    b.iter(|| {
                        res.tick(black_box(&input), black_box(&mut output));
                    })
                },
            );
        }

        // Damping changes every block force a coefficient update
        let mut res = ModalRes::with_data(ctx, bank(32));
        let mut flip = false;
        group.bench_with_input(BenchmarkId::new("32_modes_damped", size), &size, |b, _| {
            b.iter(|| {
                flip = !flip;
                res.begin_block();
                res.add_contact_damping(if flip { 2.0 } else { 4.0 });
                res.tick(black_box(&input), black_box(&mut output));
            })
        });
    }

    group.finish();
}
