//! Extended Kalman Filter (EKF) vehicle state estimation
//!
//! Fuses an actuation-driven motion model with (x, y) position fixes.
//! The filter owns the state mean and covariance; `predict` is run once per
//! clock tick and `correct` whenever a new position fix is available.

use log::{debug, warn};
use nalgebra::{Matrix2, Matrix2x4, Matrix4};

use crate::common::{
    is_wrapped, normalize_heading, wrap_heading, ActuationInput, CorrectionOutcome, MotionModel,
    NavError, NavResult, PositionMeasurement, StateEstimator, VehicleState,
};
use crate::config::{EstimatorConfig, VehicleConfig};
use crate::localization::motion_model::BicycleModel;

/// Smallest accepted eigenvalue ratio of the innovation covariance
const MIN_INNOVATION_CONDITION: f64 = 1e-12;

/// Observation matrix selecting (x, y) from the state
fn observation_matrix() -> Matrix2x4<f64> {
    Matrix2x4::new(
        1., 0., 0., 0.,
        0., 1., 0., 0.,
    )
}

/// Invert the innovation covariance, or `None` if it is singular or ill-conditioned
fn invert_innovation(s: &Matrix2<f64>) -> Option<Matrix2<f64>> {
    if s.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let eig = s.symmetric_eigenvalues();
    let (lo, hi) = (eig.min(), eig.max());
    if lo <= 0.0 || lo / hi < MIN_INNOVATION_CONDITION {
        return None;
    }
    s.try_inverse()
}

fn check_noise_matrix<const N: usize>(
    name: &str,
    m: &nalgebra::SMatrix<f64, N, N>,
) -> NavResult<()> {
    for i in 0..N {
        if m[(i, i)] < 0.0 {
            return Err(NavError::InvalidParameter(format!("{} has negative variances", name)));
        }
        for j in 0..N {
            if !m[(i, j)].is_finite() {
                return Err(NavError::InvalidParameter(format!("{} has non-finite entries", name)));
            }
            if (m[(i, j)] - m[(j, i)]).abs() > 1e-12 {
                return Err(NavError::InvalidParameter(format!("{} is not symmetric", name)));
            }
        }
    }
    Ok(())
}

/// Extended Kalman Filter over (x, y, heading, speed)
#[derive(Debug, Clone)]
pub struct ExtendedKalmanFilter<M: MotionModel = BicycleModel> {
    model: M,
    /// Current state estimate
    state: VehicleState,
    /// State covariance matrix
    covariance: Matrix4<f64>,
    /// Process noise covariance
    q: Matrix4<f64>,
    /// Measurement noise covariance
    r: Matrix2<f64>,
}

impl ExtendedKalmanFilter<BicycleModel> {
    /// Build a bicycle-model filter from configuration
    pub fn from_config(vehicle: &VehicleConfig, estimator: &EstimatorConfig) -> NavResult<Self> {
        let model = BicycleModel::from_config(estimator.dt, vehicle);
        Self::new(
            model,
            estimator.initial_state()?,
            estimator.initial_covariance()?,
            estimator.process_noise()?,
            estimator.measurement_noise()?,
        )
    }
}

impl<M: MotionModel> ExtendedKalmanFilter<M> {
    /// Create a new filter. `q`, `r` and `initial_covariance` must be symmetric
    /// with non-negative variances.
    pub fn new(
        model: M,
        initial_state: VehicleState,
        initial_covariance: Matrix4<f64>,
        q: Matrix4<f64>,
        r: Matrix2<f64>,
    ) -> NavResult<Self> {
        check_noise_matrix("initial covariance", &initial_covariance)?;
        check_noise_matrix("process noise", &q)?;
        check_noise_matrix("measurement noise", &r)?;
        let mut state = initial_state;
        state.heading = wrap_heading(state.heading);
        Ok(ExtendedKalmanFilter {
            model,
            state,
            covariance: initial_covariance,
            q,
            r,
        })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// One clock tick: predict with `input`, then correct if a fix is given
    pub fn step(
        &mut self,
        input: &ActuationInput,
        measurement: Option<&PositionMeasurement>,
    ) -> Option<CorrectionOutcome> {
        self.predict(input);
        measurement.map(|z| self.correct(z))
    }

    fn wrap_state_heading(&mut self) {
        let heading = wrap_heading(self.state.heading);
        if !is_wrapped(heading) {
            warn!(
                "heading {:.3} rad still outside (-pi, pi] after a single wrap; turn rate exceeds one revolution per tick",
                heading
            );
        }
        self.state.heading = heading;
    }
}

impl<M: MotionModel> StateEstimator for ExtendedKalmanFilter<M> {
    fn predict(&mut self, input: &ActuationInput) {
        // Linearize at the pre-update state
        let j_f = self.model.jacobian(&self.state, input);
        self.state = self.model.propagate(&self.state, input);
        self.wrap_state_heading();
        self.covariance = j_f * self.covariance * j_f.transpose() + self.q;
    }

    fn correct(&mut self, measurement: &PositionMeasurement) -> CorrectionOutcome {
        let j_h = observation_matrix();
        let x = self.state.to_vector();
        let y = measurement.to_vector() - j_h * x;
        let s = j_h * self.covariance * j_h.transpose() + self.r;

        let s_inv = match invert_innovation(&s) {
            Some(s_inv) => s_inv,
            None => {
                warn!("innovation covariance is singular, keeping predicted estimate");
                return CorrectionOutcome::Degenerate;
            }
        };

        let k = self.covariance * j_h.transpose() * s_inv;
        self.state = VehicleState::from(x + k * y);
        // A large innovation can swing the heading by several turns
        self.state.heading = normalize_heading(self.state.heading);
        let p = self.covariance - k * j_h * self.covariance;
        self.covariance = (p + p.transpose()) * 0.5;
        debug!("corrected with innovation ({:.3}, {:.3})", y[0], y[1]);
        CorrectionOutcome::Applied
    }

    fn state(&self) -> VehicleState {
        self.state
    }

    fn covariance(&self) -> &Matrix4<f64> {
        &self.covariance
    }
}
