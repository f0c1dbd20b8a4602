//! Control-loop runtime: latest-value input slots and the fixed-rate estimation loop

pub mod control_loop;
pub mod snapshot;

pub use control_loop::{EstimatorLoop, TickReport};
pub use snapshot::{Latest, Stamped};
