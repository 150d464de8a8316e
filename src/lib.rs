//! Procedural contact and impact sound synthesis.
//!
//! Physics contact events (relative speeds, forces, impulses) drive stateful
//! excitation generators whose output is mixed into banks of modal
//! resonators once per fixed-size audio block. Everything on the audio path
//! is pre-allocated at init and realtime-safe.

pub mod config;
pub mod dsp; // Blocks, filters, limiter, pulse
pub mod error;
pub mod pool; // Handle allocators and fixed-capacity collections
pub mod res; // Modal resonators
pub mod scene; // Bodies, contacts, impacts and the per-block tick
pub mod surface; // Excitation strategies and generators

pub use config::{EngineConfig, EngineContext, LimiterConfig, PoolCapacities};
pub use error::{Result, SynthError};
pub use pool::Handle;
pub use res::{ModalData, ModalRes};
#[cfg(feature = "rtrb")]
pub use scene::SceneCommands;
pub use scene::{
    Body, BodyId, BodyParams, ContactData, ImpactData, ResId, Scene, SceneCommand, SceneStats,
    SurfaceId,
};
pub use surface::{Fun, Surface, SurfaceParams};

pub const MAX_BLOCK_SIZE: usize = 2048;

/// Added inside feedback loops so decaying state never reaches the denormal range.
pub(crate) const DENORMAL_BIAS: f32 = 1e-20;
