//! Fixed-rate estimation loop
//!
//! Each tick reads one actuation snapshot, predicts, and corrects only when a
//! position fix newer than the last consumed one has been published. A tick is
//! a complete unit of work; stopping the loop between ticks needs no rollback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::common::{
    ActuationInput, CorrectionOutcome, NavResult, PositionMeasurement, StateEstimator,
    VehicleState,
};
use crate::config::{CoreConfig, LoopConfig};
use crate::localization::ExtendedKalmanFilter;
use crate::runtime::snapshot::Latest;

/// What one tick produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Number of completed ticks, starting at 1
    pub tick: u64,
    pub state: VehicleState,
    /// Outcome of the correction, if a new fix was consumed this tick
    pub correction: Option<CorrectionOutcome>,
}

/// Drives an estimator from latest-value input slots
pub struct EstimatorLoop<E: StateEstimator = ExtendedKalmanFilter> {
    estimator: E,
    actuation: Arc<Latest<ActuationInput>>,
    position: Arc<Latest<PositionMeasurement>>,
    config: LoopConfig,
    /// Sequence number of the last fix fed to `correct`, 0 if none
    last_fix_seq: u64,
    ticks: u64,
}

impl EstimatorLoop<ExtendedKalmanFilter> {
    /// Build the EKF and the loop from a validated configuration
    pub fn from_config(
        config: &CoreConfig,
        actuation: Arc<Latest<ActuationInput>>,
        position: Arc<Latest<PositionMeasurement>>,
    ) -> NavResult<Self> {
        let ekf = ExtendedKalmanFilter::from_config(&config.vehicle, &config.estimator)?;
        Ok(Self::new(ekf, actuation, position, config.control_loop))
    }
}

impl<E: StateEstimator> EstimatorLoop<E> {
    pub fn new(
        estimator: E,
        actuation: Arc<Latest<ActuationInput>>,
        position: Arc<Latest<PositionMeasurement>>,
        config: LoopConfig,
    ) -> Self {
        EstimatorLoop {
            estimator,
            actuation,
            position,
            config,
            last_fix_seq: 0,
            ticks: 0,
        }
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one predict / correct cycle.
    ///
    /// Returns `None` while waiting for the first fix.
    pub fn tick(&mut self) -> Option<TickReport> {
        let fix = self.position.snapshot();
        if self.config.wait_for_first_fix && fix.is_none() {
            debug!("waiting for first position fix");
            return None;
        }

        let input = self.actuation.value().unwrap_or_default();
        self.estimator.predict(&input);

        let correction = match fix {
            Some(stamped) if stamped.seq > self.last_fix_seq => {
                self.last_fix_seq = stamped.seq;
                Some(self.estimator.correct(&stamped.value))
            }
            _ => None,
        };

        self.ticks += 1;
        let state = self.estimator.state();
        debug!(
            "tick {}: x={:.3} y={:.3} heading={:.3} speed={:.3}",
            self.ticks, state.x, state.y, state.heading, state.speed
        );
        Some(TickReport { tick: self.ticks, state, correction })
    }

    /// Tick at the configured period until `shutdown` is set, handing each
    /// state to `on_state`. Returns the number of cycles run.
    pub fn run<F>(&mut self, shutdown: &AtomicBool, mut on_state: F) -> u64
    where
        F: FnMut(&TickReport),
    {
        let period = Duration::from_millis(self.config.period_ms);
        let mut cycles = 0;
        let mut consecutive_overruns = 0u32;
        info!("starting estimation loop at {} ms", self.config.period_ms);

        while !shutdown.load(Ordering::SeqCst) {
            let cycle_start = Instant::now();

            if let Some(report) = self.tick() {
                on_state(&report);
            }
            cycles += 1;

            let cycle_dur = cycle_start.elapsed();
            match period.checked_sub(cycle_dur) {
                Some(d) => {
                    consecutive_overruns = 0;
                    thread::sleep(d);
                }
                None => {
                    consecutive_overruns += 1;
                    warn!(
                        "cycle overran by {:.6} s ({} consecutive)",
                        (cycle_dur - period).as_secs_f64(),
                        consecutive_overruns
                    );
                }
            }
        }

        info!("estimation loop stopped after {} cycles ({} ticks)", cycles, self.ticks);
        cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::localization::BicycleModel;
    use nalgebra::{Matrix2, Matrix4};

    fn test_loop(wait_for_first_fix: bool) -> EstimatorLoop {
        let ekf = ExtendedKalmanFilter::new(
            BicycleModel::new(0.05, 0.5, 0.5, 1.0),
            VehicleState::origin(),
            Matrix4::identity(),
            Matrix4::from_diagonal_element(0.01),
            Matrix2::from_diagonal_element(0.1),
        )
        .unwrap();
        EstimatorLoop::new(
            ekf,
            Arc::new(Latest::new()),
            Arc::new(Latest::new()),
            LoopConfig { period_ms: 1, wait_for_first_fix },
        )
    }

    #[test]
    fn test_waits_for_first_fix() {
        let mut lp = test_loop(true);
        assert!(lp.tick().is_none());
        assert_eq!(lp.ticks(), 0);
        lp.position.publish(PositionMeasurement::new(0.0, 0.0));
        assert!(lp.tick().is_some());
    }

    #[test]
    fn test_predicts_without_fix_when_not_waiting() {
        let mut lp = test_loop(false);
        lp.actuation.publish(ActuationInput::new(4.0, 0.0));
        let report = lp.tick().unwrap();
        assert_eq!(report.tick, 1);
        assert!(report.correction.is_none());
        assert!(report.state.speed > 0.0);
    }

    #[test]
    fn test_each_fix_is_consumed_once() {
        let mut lp = test_loop(true);
        lp.position.publish(PositionMeasurement::new(1.0, 0.0));
        assert_eq!(lp.tick().unwrap().correction, Some(CorrectionOutcome::Applied));
        assert_eq!(lp.tick().unwrap().correction, None);
        let p_before = lp.estimator().covariance()[(0, 0)];
        assert_eq!(lp.tick().unwrap().correction, None);
        // Prediction-only ticks grow position uncertainty
        assert!(lp.estimator().covariance()[(0, 0)] > p_before);
        lp.position.publish(PositionMeasurement::new(1.1, 0.0));
        assert_eq!(lp.tick().unwrap().correction, Some(CorrectionOutcome::Applied));
    }

    #[test]
    fn test_stale_actuation_is_reused() {
        let mut lp = test_loop(false);
        lp.actuation.publish(ActuationInput::new(2.0, 0.0));
        let first = lp.tick().unwrap().state.speed;
        let second = lp.tick().unwrap().state.speed;
        assert!(second > first);
    }

    #[test]
    fn test_default_config_heading_stays_wrapped() {
        let mut lp = EstimatorLoop::from_config(
            &CoreConfig::default(),
            Arc::new(Latest::new()),
            Arc::new(Latest::new()),
        )
        .unwrap();
        lp.actuation.publish(ActuationInput::zero());
        for _ in 0..400 {
            lp.position.publish(PositionMeasurement::new(12.0, 7.0));
            let report = lp.tick().unwrap();
            let h = report.state.heading;
            assert!(h > -std::f64::consts::PI && h <= std::f64::consts::PI, "tick {} heading {}", report.tick, h);
        }
    }

    #[test]
    fn test_run_stops_on_shutdown() {
        let mut lp = test_loop(false);
        let shutdown = AtomicBool::new(false);
        let mut seen = Vec::new();
        let cycles = lp.run(&shutdown, |report| {
            seen.push(report.tick);
            if report.tick == 5 {
                shutdown.store(true, Ordering::SeqCst);
            }
        });
        assert_eq!(cycles, 5);
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    }
}
