//! Benchmarks for scenes full of rolling contacts.

use std::hint::black_box;

use contact_dsp::ContactData;
use criterion::{BenchmarkId, Criterion};

use super::floor_and_balls;
use crate::BLOCK_SIZES;

const BALL_COUNTS: &[usize] = &[1, 8, 32];

pub fn bench_rolling(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/rolling");

    for &size in BLOCK_SIZES {
        let mut out = vec![0.0f32; size];

        for &n in BALL_COUNTS {
            let (mut scene, floor, balls) = floor_and_balls(size, n);
            let mut step = 0u32;

            group.bench_with_input(BenchmarkId::new(format!("{n}_balls"), size), &size, |b, _| {
                b.iter(|| {
                    // one physics step per block
                    step = step.wrapping_add(1);
                    let wobble = (step as f32 * 0.1).sin() * 0.1;
                    for &ball in &balls {
                        scene.touch(
                            ball,
                            floor,
                            ContactData {
                                speed_contact_rel_body1: 0.6 + wobble,
                                speed_contact_rel_body2: 0.6 + wobble,
                                speed_body1_rel_body2: 0.02,
                                contact_force: 3.0,
                            },
                        );
                    }
                    scene.end_physics_step();
                    scene.tick(black_box(&mut out));
                })
            });
        }
    }

    group.finish();
}
