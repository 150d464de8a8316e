//! Low-level DSP primitives used by the contact generators and the scene.
//!
//! Everything here is allocation-free after construction and operates on
//! plain `&mut [f32]` blocks, so the pieces can be embedded directly inside
//! pooled generator and resonator structs.

/// Fixed-length sample blocks and the block pool.
pub mod block;
/// One-pole lowpass/highpass with per-block ramps, and RBJ biquads.
pub mod filter;
/// Lookahead peak limiter for the scene output.
pub mod limiter;
/// Energy-normalized triangle pulse for impacts.
pub mod pulse;

pub use block::{Block, BlockPool};
pub use filter::{Biquad, BiquadCoeffs, Highpass, Lowpass};
pub use limiter::{Limiter, LimiterState};
pub use pulse::TriPulser;
