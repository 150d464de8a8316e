#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::pool::Handle;
use crate::scene::body::{BodyId, SurfaceId};

/// Per physics step input of a contact.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContactData {
    /// Speed of the contact point over body 1.
    pub speed_contact_rel_body1: f32,
    /// Speed of the contact point over body 2.
    pub speed_contact_rel_body2: f32,
    /// Slip: relative speed of the two bodies at the contact.
    pub speed_body1_rel_body2: f32,
    /// Normal force.
    pub contact_force: f32,
}

impl ContactData {
    /// (contact speed, slip speed, force) as seen from one side.
    pub fn side(&self, side: usize) -> (f32, f32, f32) {
        let contact_speed = if side == 0 {
            self.speed_contact_rel_body1
        } else {
            self.speed_contact_rel_body2
        };
        (contact_speed, self.speed_body1_rel_body2, self.contact_force)
    }

    /// The same contact reported with the bodies in the other order.
    pub fn swapped(&self) -> Self {
        Self {
            speed_contact_rel_body1: self.speed_contact_rel_body2,
            speed_contact_rel_body2: self.speed_contact_rel_body1,
            speed_body1_rel_body2: -self.speed_body1_rel_body2,
            contact_force: self.contact_force,
        }
    }
}

/// A generator borrowed from a surface's pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenRef {
    pub surface: SurfaceId,
    pub handle: Handle,
}

/*
Contact Lifecycle
=================

    acquire ──→ bodies set (a generator per side, or none) ──→ not ready
                                                                 │
                              set_contact_data (each physics step)
                                                                 ↓
                                               ready: ticked every block
                                                                 │
                                               fade_and_delete flagged
                                                                 ↓
                                      one last tick, faded to zero, released

A side whose body is missing, disabled or has no surface (or whose surface
ran out of generators) simply stays silent; the other side still plays.

`used` supports per-step diffing: the caller marks every contact unused,
touches the pairs still in contact, and sweeps the rest.
*/

#[derive(Debug, Clone, Copy, Default)]
pub struct Contact {
    pub(crate) bodies: [Option<BodyId>; 2],
    pub(crate) gens: [Option<GenRef>; 2],
    pub(crate) data: ContactData,
    pub(crate) ready: bool,
    pub(crate) used: bool,
    pub(crate) fade_and_delete: bool,
}

impl Contact {
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn bodies(&self) -> [Option<BodyId>; 2] {
        self.bodies
    }

    pub fn gens(&self) -> [Option<GenRef>; 2] {
        self.gens
    }

    pub fn data(&self) -> &ContactData {
        &self.data
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_used(&self) -> bool {
        self.used
    }

    pub fn is_fading(&self) -> bool {
        self.fade_and_delete
    }
}
