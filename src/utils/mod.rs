//! Utility modules for wecar_nav

pub mod logger;
pub mod visualization;

pub use logger::{init_logger, level_from_str};
pub use visualization::{Visualizer, PathStyle, PointStyle, colors};
