//! contact - terminal demo of procedural contact sounds
//!
//! Run with: cargo run --bin contact
//!
//! A glass ball, a steel bowl and a wooden plate share one scene. Number keys
//! throw impacts, `r` rolls the ball across the plate.

mod app;
mod objects;
mod ui;

use app::ContactDemo;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    ContactDemo::new()
        .block_size(256)
        .max_time_cost(400.0)
        .run()
}
