//! wecar_nav - vehicle state estimation and curvature-based speed planning
//!
//! An Extended Kalman Filter fuses bicycle-model predictions driven by
//! speed/steering actuation with (x, y) position fixes, and a velocity planner
//! assigns a friction-limited speed to every waypoint of a fixed path.

// Core modules
pub mod common;
pub mod config;
pub mod utils;

// Algorithm modules
pub mod localization;
pub mod path_planning;
pub mod path_tracking;
pub mod runtime;

// Re-export common types for convenience
pub use common::{Point2D, Waypoint, PositionMeasurement, VehicleState, ActuationInput, Path2D, VelocityProfile};
pub use common::{MotionModel, StateEstimator, CorrectionOutcome};
pub use common::{NavError, NavResult};
pub use config::CoreConfig;
