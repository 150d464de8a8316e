//! Benchmarks for bursts of impacts ringing out together.

use std::hint::black_box;

use contact_dsp::ImpactData;
use criterion::{BenchmarkId, Criterion};

use super::floor_and_balls;
use crate::BLOCK_SIZES;

const BURST: usize = 16;

pub fn bench_impacts(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/impacts");

    for &size in BLOCK_SIZES {
        let mut out = vec![0.0f32; size];
        let (mut scene, floor, balls) = floor_and_balls(size, BURST);
        let mut block = 0usize;

        // A new burst every 50 blocks, everything else is ring-out
        group.bench_with_input(BenchmarkId::new("burst_16", size), &size, |b, _| {
            b.iter(|| {
                if block % 50 == 0 {
                    for (i, &ball) in balls.iter().enumerate() {
                        scene.trigger_impact(
                            ball,
                            floor,
                            ImpactData {
                                impulse: 0.5 + 0.1 * i as f32,
                                rel_tangent_speed: if i % 4 == 0 { 1.0 } else { 0.0 },
                                rel_normal_speed: 2.0,
                            },
                        );
                    }
                }
                block += 1;
                scene.tick(black_box(&mut out));
            })
        });
    }

    group.finish();
}
