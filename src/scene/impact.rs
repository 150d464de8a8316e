#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::scene::body::BodyId;
use crate::scene::contact::GenRef;

/// Input of an impact, set once.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImpactData {
    pub rel_tangent_speed: f32,
    pub rel_normal_speed: f32,
    pub impulse: f32,
}

/// A momentary collision. Released by the scene once both generators are
/// quiet; callers never delete a ready impact themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct Impact {
    pub(crate) bodies: [Option<BodyId>; 2],
    pub(crate) gens: [Option<GenRef>; 2],
    pub(crate) data: ImpactData,
    pub(crate) ready: bool,
}

impl Impact {
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn bodies(&self) -> [Option<BodyId>; 2] {
        self.bodies
    }

    pub fn gens(&self) -> [Option<GenRef>; 2] {
        self.gens
    }

    pub fn data(&self) -> &ImpactData {
        &self.data
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Both sides finished (or never had a generator).
    pub fn is_done(&self) -> bool {
        self.gens.iter().all(Option::is_none)
    }
}
