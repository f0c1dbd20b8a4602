//! Configuration for the estimator, the velocity planner and the control loop
//!
//! All values are fixed for the lifetime of a run. Configuration is read
//! from a TOML file where every section and field is optional:
//!
//! ```toml
//! [vehicle]
//! wheelbase = 0.5
//!
//! [estimator]
//! dt = 0.05
//! measurement_noise = [0.2, 0.2]
//!
//! [planner]
//! point_num = 100
//! max_speed = 80.0
//! ```

use std::fs::read_to_string;
use std::path::Path;

use nalgebra::{Matrix2, Matrix4, Vector2, Vector4};
use serde::Deserialize;

use crate::common::{NavError, NavResult, VehicleState};

const DEFAULT_DT: f64 = 0.05;

/// Affine calibration from a raw servo command to a steering angle in radians
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SteeringCalibration {
    /// Raw command that corresponds to straight ahead
    pub offset: f64,
    /// Radians per unit of raw command
    pub scale: f64,
}

impl SteeringCalibration {
    pub fn to_radians(&self, raw: f64) -> f64 {
        (raw - self.offset) * self.scale
    }
}

impl Default for SteeringCalibration {
    fn default() -> Self {
        Self {
            offset: 0.53,
            scale: (-22.0_f64).to_radians(),
        }
    }
}

/// Vehicle kinematic constants
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VehicleConfig {
    /// Distance between axles [m]
    pub wheelbase: f64,
    /// Speed actuation lag time constant [s]
    pub tau: f64,
    /// Gain from measured speed to state speed
    pub speed_gain: f64,
    pub steering: SteeringCalibration,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            wheelbase: 0.5,
            tau: 0.1,
            speed_gain: 3.6 * 6.0 / 7500.0,
            steering: SteeringCalibration::default(),
        }
    }
}

/// Filter timestep, initial conditions and noise diagonals
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EstimatorConfig {
    /// Prediction timestep [s]
    pub dt: f64,
    /// Initial state (x, y, heading, speed)
    pub initial_state: Vec<f64>,
    /// Diagonal of the initial covariance
    pub initial_covariance: Vec<f64>,
    /// Diagonal of the process noise Q
    pub process_noise: Vec<f64>,
    /// Diagonal of the measurement noise R
    pub measurement_noise: Vec<f64>,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            dt: DEFAULT_DT,
            initial_state: vec![-500.0, -500.0, 0.0, 0.0],
            initial_covariance: vec![0.0, 0.0, 0.2, 0.2],
            process_noise: vec![0.0, 0.0, 0.0, 0.2 * DEFAULT_DT],
            measurement_noise: vec![0.01 / DEFAULT_DT, 0.01 / DEFAULT_DT],
        }
    }
}

impl EstimatorConfig {
    pub fn initial_state(&self) -> NavResult<VehicleState> {
        let v = vector4("initial_state", &self.initial_state)?;
        Ok(VehicleState::from(v))
    }

    pub fn initial_covariance(&self) -> NavResult<Matrix4<f64>> {
        let d = noise_diagonal4("initial_covariance", &self.initial_covariance)?;
        Ok(Matrix4::from_diagonal(&d))
    }

    pub fn process_noise(&self) -> NavResult<Matrix4<f64>> {
        let d = noise_diagonal4("process_noise", &self.process_noise)?;
        Ok(Matrix4::from_diagonal(&d))
    }

    pub fn measurement_noise(&self) -> NavResult<Matrix2<f64>> {
        if self.measurement_noise.len() != 2 {
            return Err(NavError::Config(format!(
                "measurement_noise needs 2 entries, found {}",
                self.measurement_noise.len()
            )));
        }
        let d = Vector2::new(self.measurement_noise[0], self.measurement_noise[1]);
        check_noise("measurement_noise", d.as_slice())?;
        Ok(Matrix2::from_diagonal(&d))
    }

    fn validate(&self) -> NavResult<()> {
        positive("estimator.dt", self.dt)?;
        self.initial_state()?;
        self.initial_covariance()?;
        self.process_noise()?;
        self.measurement_noise()?;
        Ok(())
    }
}

/// Curvature-based velocity planning parameters
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlannerConfig {
    /// Half-width of the circle-fit window, in waypoints
    pub point_num: usize,
    /// Vehicle speed limit [km/h]
    pub max_speed: f64,
    /// Road friction coefficient
    pub road_friction: f64,
    /// Gravitational acceleration [m/s^2]
    pub gravity: f64,
    /// Index offset ahead of the nearest waypoint used for the target speed
    pub lookahead: usize,
    /// Number of waypoints in the local path window
    pub local_window: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            point_num: 100,
            max_speed: 80.0,
            road_friction: 0.2,
            gravity: 9.8,
            lookahead: 10,
            local_window: 40,
        }
    }
}

impl PlannerConfig {
    pub fn validate(&self) -> NavResult<()> {
        if self.point_num < 2 {
            return Err(NavError::Config(format!(
                "planner.point_num must be at least 2 to fit a circle, found {}",
                self.point_num
            )));
        }
        positive("planner.max_speed", self.max_speed)?;
        positive("planner.gravity", self.gravity)?;
        if !(self.road_friction > 0.0 && self.road_friction <= 1.0) {
            return Err(NavError::Config(format!(
                "planner.road_friction must be in (0, 1], found {}",
                self.road_friction
            )));
        }
        Ok(())
    }
}

/// Fixed-rate loop settings
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoopConfig {
    /// Loop period [ms]
    pub period_ms: u64,
    /// Skip ticks until the first position fix has arrived
    pub wait_for_first_fix: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            period_ms: 50,
            wait_for_first_fix: true,
        }
    }
}

/// Complete configuration of a run
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub vehicle: VehicleConfig,
    pub estimator: EstimatorConfig,
    pub planner: PlannerConfig,
    pub control_loop: LoopConfig,
}

impl CoreConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> NavResult<Self> {
        let config: CoreConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> NavResult<Self> {
        let s = read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    pub fn validate(&self) -> NavResult<()> {
        positive("vehicle.wheelbase", self.vehicle.wheelbase)?;
        positive("vehicle.tau", self.vehicle.tau)?;
        finite("vehicle.speed_gain", self.vehicle.speed_gain)?;
        finite("vehicle.steering.offset", self.vehicle.steering.offset)?;
        finite("vehicle.steering.scale", self.vehicle.steering.scale)?;
        self.estimator.validate()?;
        self.planner.validate()?;
        if self.control_loop.period_ms == 0 {
            return Err(NavError::Config("control_loop.period_ms must be positive".to_string()));
        }
        Ok(())
    }
}

fn finite(name: &str, value: f64) -> NavResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(NavError::Config(format!("{} must be finite, found {}", name, value)))
    }
}

fn positive(name: &str, value: f64) -> NavResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(NavError::Config(format!("{} must be positive, found {}", name, value)))
    }
}

fn vector4(name: &str, values: &[f64]) -> NavResult<Vector4<f64>> {
    if values.len() != 4 {
        return Err(NavError::Config(format!(
            "{} needs 4 entries, found {}",
            name,
            values.len()
        )));
    }
    for &v in values {
        finite(name, v)?;
    }
    Ok(Vector4::from_column_slice(values))
}

fn noise_diagonal4(name: &str, values: &[f64]) -> NavResult<Vector4<f64>> {
    let d = vector4(name, values)?;
    check_noise(name, d.as_slice())?;
    Ok(d)
}

fn check_noise(name: &str, values: &[f64]) -> NavResult<()> {
    for &v in values {
        if !v.is_finite() || v < 0.0 {
            return Err(NavError::Config(format!(
                "{} entries must be finite and non-negative, found {}",
                name, v
            )));
        }
    }
    Ok(())
}
