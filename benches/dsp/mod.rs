//! Benchmarks for low-level DSP primitives.

mod filter;
mod fun;
mod limiter;
mod modal;

pub use filter::bench_filter;
pub use fun::bench_fun;
pub use limiter::bench_limiter;
pub use modal::bench_modal;
