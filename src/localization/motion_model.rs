//! Kinematic bicycle model with first-order speed lag
//!
//! ```text
//! dx       = v * cos(heading)
//! dy       = v * sin(heading)
//! dheading = v * tan(steering) / wheelbase
//! dv       = (K * measured_speed - v) / tau
//! ```
//!
//! discretized with a forward Euler step of fixed length `dt`.

use nalgebra::Matrix4;

use crate::common::{ActuationInput, MotionModel, VehicleState};
use crate::config::VehicleConfig;

/// Bicycle kinematics, discretized at a fixed timestep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BicycleModel {
    dt: f64,
    wheelbase: f64,
    tau: f64,
    speed_gain: f64,
}

impl BicycleModel {
    pub fn new(dt: f64, wheelbase: f64, tau: f64, speed_gain: f64) -> Self {
        BicycleModel { dt, wheelbase, tau, speed_gain }
    }

    pub fn from_config(dt: f64, vehicle: &VehicleConfig) -> Self {
        Self::new(dt, vehicle.wheelbase, vehicle.tau, vehicle.speed_gain)
    }

    /// Continuous-time state derivative
    fn derivative(&self, x: &VehicleState, u: &ActuationInput) -> [f64; 4] {
        [
            x.speed * x.heading.cos(),
            x.speed * x.heading.sin(),
            x.speed * u.steering_angle.tan() / self.wheelbase,
            (-x.speed + self.speed_gain * u.measured_speed) / self.tau,
        ]
    }
}

impl MotionModel for BicycleModel {
    fn propagate(&self, state: &VehicleState, input: &ActuationInput) -> VehicleState {
        let d = self.derivative(state, input);
        VehicleState::new(
            state.x + self.dt * d[0],
            state.y + self.dt * d[1],
            state.heading + self.dt * d[2],
            state.speed + self.dt * d[3],
        )
    }

    fn jacobian(&self, state: &VehicleState, input: &ActuationInput) -> Matrix4<f64> {
        let dt = self.dt;
        let (sin, cos) = state.heading.sin_cos();
        let v = state.speed;
        Matrix4::new(
            1., 0., -dt * v * sin, dt * cos,
            0., 1., dt * v * cos, dt * sin,
            0., 0., 1., dt * input.steering_angle.tan() / self.wheelbase,
            0., 0., 0., 1. - dt / self.tau,
        )
    }

    fn dt(&self) -> f64 {
        self.dt
    }
}
