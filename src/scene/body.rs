use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

macro_rules! scene_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            #[inline]
            pub(crate) fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            pub fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

scene_id!(
    /// A body registered with a scene.
    BodyId,
    "body"
);
scene_id!(
    /// A resonator registered with a scene.
    ResId,
    "res"
);
scene_id!(
    /// A surface registered with a scene.
    SurfaceId,
    "surface"
);

impl Default for ResId {
    fn default() -> Self {
        Self(u32::MAX)
    }
}

/// Coupling gains of one body.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyParams {
    /// Generator output sent straight to the scene output.
    pub direct_gain: f32,
    /// How strongly this body's generators drive the *other* body's resonator.
    pub cross_gain: f32,
    /// Damping this body applies to whatever resonator it touches.
    pub contact_damping: f32,
}

impl Default for BodyParams {
    fn default() -> Self {
        Self {
            direct_gain: 0.0,
            cross_gain: 1.0,
            contact_damping: 1.0,
        }
    }
}

/// One sounding object: a resonator, a surface material, coupling gains.
///
/// Either part may be missing. A body without a surface contributes no
/// generator to its contacts; one without a resonator only rings the other side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub res: Option<ResId>,
    pub surface: Option<SurfaceId>,
    pub params: BodyParams,
    pub enabled: bool,
}

impl Body {
    pub fn new(res: Option<ResId>, surface: Option<SurfaceId>, params: BodyParams) -> Self {
        Self {
            res,
            surface,
            params,
            enabled: true,
        }
    }
}

/// Unordered pair of bodies, the identity of a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyPair(BodyId, BodyId);

impl BodyPair {
    pub fn new(a: BodyId, b: BodyId) -> Self {
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_is_unordered() {
        let a = BodyId::from_index(3);
        let b = BodyId::from_index(9);
        assert_eq!(BodyPair::new(a, b), BodyPair::new(b, a));
        assert_ne!(BodyPair::new(a, a), BodyPair::new(a, b));
    }

    #[test]
    fn ids_display_with_prefix() {
        assert_eq!(BodyId::from_index(2).to_string(), "body2");
        assert_eq!(ResId::from_index(0).to_string(), "res0");
    }
}
