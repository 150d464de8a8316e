//! The demo's bodies: mode tables and surface materials.

use std::sync::Arc;

use contact_dsp::res::Mode;
use contact_dsp::scene::BodyParams;
use contact_dsp::{BodyId, Fun, ModalData, Result, Scene, SurfaceParams};

#[derive(Debug, Clone, Copy)]
pub struct DemoObjects {
    pub plate: BodyId,
    pub bowl: BodyId,
    pub ball: BodyId,
}

/// Square plate: f_mn grows with m² + n².
fn plate_modes() -> Vec<Mode> {
    let mut modes = Vec::new();
    for m in 1..=5 {
        for n in 1..=5 {
            let freq = 90.0 * (m * m + n * n) as f32;
            modes.push(Mode::new(freq, 6.0 + 0.002 * freq, 1.0 / (m * n) as f32));
        }
    }
    modes
}

/// Bell-like partials, long ring.
fn bowl_modes() -> Vec<Mode> {
    [(1.0, 1.0), (2.71, 0.6), (5.13, 0.4), (8.21, 0.25), (12.03, 0.15)]
        .iter()
        .map(|&(ratio, amp)| Mode::new(520.0 * ratio, 1.2 + 0.4 * ratio, amp))
        .collect()
}

fn ball_modes() -> Vec<Mode> {
    [1.0, 1.48, 1.93, 2.4]
        .iter()
        .map(|&ratio| Mode::new(1_900.0 * ratio, 25.0, 0.3))
        .collect()
}

pub fn populate(scene: &mut Scene) -> Result<DemoObjects> {
    let wood = scene.add_surface(
        "wood",
        SurfaceParams {
            hardness: 1_500.0,
            cutoff_max: 6_000.0,
            ..Default::default()
        },
        Fun::grid(0.002, 256, 11)?,
    )?;
    let steel = scene.add_surface(
        "steel",
        SurfaceParams {
            hardness: 8_000.0,
            ..Default::default()
        },
        Fun::white(),
    )?;
    let glass = scene.add_surface(
        "glass",
        SurfaceParams {
            hardness: 12_000.0,
            contact_gain: 0.03,
            ..Default::default()
        },
        Fun::rnd(800.0, true)?,
    )?;

    let plate_res = scene.add_resonator(Arc::new(ModalData::new(plate_modes())?));
    let bowl_res = scene.add_resonator(Arc::new(ModalData::new(bowl_modes())?));
    let ball_res = scene.add_resonator(Arc::new(ModalData::new(ball_modes())?));

    let plate = scene.add_body(Some(plate_res), Some(wood), BodyParams::default())?;
    let bowl = scene.add_body(Some(bowl_res), Some(steel), BodyParams::default())?;
    let ball = scene.add_body(
        Some(ball_res),
        Some(glass),
        BodyParams {
            direct_gain: 0.2,
            cross_gain: 0.6,
            contact_damping: 4.0,
        },
    )?;

    Ok(DemoObjects { plate, bowl, ball })
}
