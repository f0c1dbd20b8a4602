//! Common traits defining interfaces for the estimator and planner

use nalgebra::Matrix4;

use crate::common::types::*;

/// Result of a measurement correction
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CorrectionOutcome {
    /// The measurement was fused into the estimate
    Applied,
    /// The innovation covariance could not be inverted; the estimate was left untouched
    Degenerate,
}

impl CorrectionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, CorrectionOutcome::Applied)
    }
}

/// Trait for vehicle motion models
pub trait MotionModel {
    /// Propagate state forward by one fixed timestep (heading not yet wrapped)
    fn propagate(&self, state: &VehicleState, input: &ActuationInput) -> VehicleState;

    /// Jacobian of `propagate` with respect to state, linearized at `state`
    fn jacobian(&self, state: &VehicleState, input: &ActuationInput) -> Matrix4<f64>;

    /// Fixed timestep this model is discretized with
    fn dt(&self) -> f64;
}

/// Trait for recursive state estimators driven by a periodic clock
pub trait StateEstimator {
    /// Prediction step with the latest actuation input
    fn predict(&mut self, input: &ActuationInput);

    /// Correction step with a position measurement
    fn correct(&mut self, measurement: &PositionMeasurement) -> CorrectionOutcome;

    /// Get current state estimate
    fn state(&self) -> VehicleState;

    /// Get current covariance estimate
    fn covariance(&self) -> &Matrix4<f64>;
}
