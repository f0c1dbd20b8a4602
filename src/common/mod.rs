//! Common types, traits, and error definitions for wecar_nav
//!
//! This module provides the building blocks shared by the estimator,
//! the velocity planner and the control loop.

pub mod types;
pub mod traits;
pub mod error;

pub use types::*;
pub use traits::*;
pub use error::*;
