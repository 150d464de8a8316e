//! Whole-scene benchmarks.
//!
//! These model what a physics-driven game asks for per block: many bodies
//! rolling on a floor, and bursts of impacts ringing out together.

mod impacts;
mod rolling;

pub use impacts::bench_impacts;
pub use rolling::bench_rolling;

use std::sync::Arc;

use contact_dsp::res::Mode;
use contact_dsp::scene::BodyParams;
use contact_dsp::{BodyId, EngineConfig, Fun, LimiterConfig, ModalData, PoolCapacities, Scene, SurfaceParams};

/// A scene with a resonant floor and `n` resonant balls on it.
pub(crate) fn floor_and_balls(block_size: usize, n: usize) -> (Scene, BodyId, Vec<BodyId>) {
    let config = EngineConfig::new()
        .block_size(block_size)
        .limiter(LimiterConfig::default())
        .max_time_cost(f32::MAX)
        .capacities(PoolCapacities {
            blocks: 2 * n + 8,
            contacts: 2 * n,
            impacts: 2 * n,
            contact_gens: 2 * n,
            impact_gens: 2 * n,
            active_resonators: 2 * n + 8,
        });
    let mut scene = Scene::new(config).unwrap();

    let wood = scene
        .add_surface("wood", SurfaceParams::default(), Fun::grid(0.003, 128, 3).unwrap())
        .unwrap();
    let floor_modes: Vec<Mode> = (0..48)
        .map(|i| Mode::new(80.0 + 61.0 * i as f32, 4.0 + 0.3 * i as f32, 0.3))
        .collect();
    let floor_res = scene.add_resonator(Arc::new(ModalData::new(floor_modes).unwrap()));
    let floor = scene
        .add_body(Some(floor_res), Some(wood), BodyParams::default())
        .unwrap();

    let balls = (0..n)
        .map(|i| {
            let modes: Vec<Mode> = (0..16)
                .map(|m| Mode::new(600.0 + 37.0 * i as f32 + 410.0 * m as f32, 12.0, 0.2))
                .collect();
            let res = scene.add_resonator(Arc::new(ModalData::new(modes).unwrap()));
            scene
                .add_body(Some(res), Some(wood), BodyParams::default())
                .unwrap()
        })
        .collect();

    (scene, floor, balls)
}
