//! Handle-keyed, fixed-capacity resource allocators.
//!
//! Everything the audio thread touches is pre-allocated here at init. Running
//! out of capacity is never an error on the audio path: `acquire`/`add`
//! return `None` and the caller degrades to silence.

/// Index-recycling handle allocator with a deletion-safe cursor.
pub mod handle;
/// Object pool and copy-value list built on the handle allocator.
pub mod object_pool;

pub use handle::{Handle, HandleManager};
pub use object_pool::{ObjectList, ObjectPool, PoolUsage};
