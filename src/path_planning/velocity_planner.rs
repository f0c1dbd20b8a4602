//! Curvature-based velocity planning
//!
//! For each interior waypoint a circle is fitted by linear least squares to
//! the `2 * point_num` waypoints around it, using the algebraic form
//! `x^2 + y^2 = 2ax + 2by - c`. The turning radius `r = sqrt(a^2 + b^2 - c)`
//! bounds the speed through the friction-limited lateral acceleration:
//! `v = sqrt(r * g * mu)`, converted to km/h and clamped to the vehicle limit.

use log::{debug, info};
use nalgebra::{Matrix3, Vector3};

use crate::common::{NavError, NavResult, Path2D, Point2D, VelocityProfile};
use crate::config::PlannerConfig;

/// Metres per second to kilometres per hour
const MPS_TO_KPH: f64 = 3.6;

/// Smallest accepted eigenvalue ratio of the normal matrix
const MIN_FIT_CONDITION: f64 = 1e-10;

/// Outcome of a least-squares circle fit
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CircleFit {
    Circle { center: Point2D, radius: f64 },
    /// Points are (nearly) collinear; the radius is unbounded
    Degenerate,
}

impl CircleFit {
    pub fn radius(&self) -> Option<f64> {
        match self {
            CircleFit::Circle { radius, .. } => Some(*radius),
            CircleFit::Degenerate => None,
        }
    }
}

/// Fit a circle through `points` by solving the normal equations `(X'X) p = X'y`.
///
/// Coordinates are centred on their mean first, which leaves the radius
/// unchanged and keeps far-from-origin paths well conditioned.
pub fn fit_circle(points: &[Point2D]) -> CircleFit {
    if points.len() < 3 {
        return CircleFit::Degenerate;
    }
    let n = points.len() as f64;
    let mx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let my = points.iter().map(|p| p.y).sum::<f64>() / n;

    let mut xtx = Matrix3::<f64>::zeros();
    let mut xty = Vector3::<f64>::zeros();
    for p in points {
        let (u, v) = (p.x - mx, p.y - my);
        let row = Vector3::new(-2.0 * u, -2.0 * v, 1.0);
        xtx += row * row.transpose();
        xty += row * -(u * u + v * v);
    }

    let eig = xtx.symmetric_eigenvalues();
    if !(eig.min() / eig.max() >= MIN_FIT_CONDITION) {
        return CircleFit::Degenerate;
    }
    let sol = match xtx.try_inverse() {
        Some(inv) => inv * xty,
        None => return CircleFit::Degenerate,
    };
    let (a, b, c) = (sol[0], sol[1], sol[2]);
    let r_sq = a * a + b * b - c;
    if !r_sq.is_finite() || r_sq <= 0.0 {
        return CircleFit::Degenerate;
    }
    CircleFit::Circle {
        center: Point2D::new(a + mx, b + my),
        radius: r_sq.sqrt(),
    }
}

/// Assigns a speed limit to every waypoint of a path
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityPlanner {
    point_num: usize,
    max_speed: f64,
    road_friction: f64,
    gravity: f64,
}

impl VelocityPlanner {
    /// `max_speed` is in km/h, `point_num` is the half-width of the fit window
    pub fn new(point_num: usize, max_speed: f64, road_friction: f64, gravity: f64) -> NavResult<Self> {
        if point_num < 2 {
            return Err(NavError::InvalidParameter(format!(
                "point_num must be at least 2, found {}",
                point_num
            )));
        }
        if !(max_speed.is_finite() && max_speed > 0.0) {
            return Err(NavError::InvalidParameter(format!("max_speed must be positive, found {}", max_speed)));
        }
        if !(road_friction > 0.0 && road_friction <= 1.0) {
            return Err(NavError::InvalidParameter(format!(
                "road_friction must be in (0, 1], found {}",
                road_friction
            )));
        }
        if !(gravity.is_finite() && gravity > 0.0) {
            return Err(NavError::InvalidParameter(format!("gravity must be positive, found {}", gravity)));
        }
        Ok(VelocityPlanner { point_num, max_speed, road_friction, gravity })
    }

    pub fn from_config(config: &PlannerConfig) -> NavResult<Self> {
        Self::new(config.point_num, config.max_speed, config.road_friction, config.gravity)
    }

    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    /// Friction-limited speed on a circle of `radius` metres, clamped to the vehicle limit
    pub fn curvature_speed(&self, radius: f64) -> f64 {
        let v = (radius * self.gravity * self.road_friction).sqrt() * MPS_TO_KPH;
        v.min(self.max_speed)
    }

    /// Speed limit for the waypoint at `index` of `path`
    fn waypoint_speed(&self, path: &Path2D, index: usize) -> f64 {
        let window = &path.points()[index - self.point_num..index + self.point_num];
        match fit_circle(window) {
            CircleFit::Circle { radius, .. } => self.curvature_speed(radius),
            CircleFit::Degenerate => {
                debug!("degenerate circle fit at waypoint {}, using max speed", index);
                self.max_speed
            }
        }
    }

    /// Plan the speed profile of a whole path.
    ///
    /// Waypoints within `point_num` of either end have no full window and get `max_speed`.
    pub fn plan(&self, path: &Path2D) -> VelocityProfile {
        let len = path.len();
        let mut speeds = vec![self.max_speed; len];
        if len > 2 * self.point_num {
            for i in self.point_num..len - self.point_num {
                speeds[i] = self.waypoint_speed(path, i);
            }
        }
        let profile = VelocityProfile::from_speeds(speeds);
        if let Some((lo, hi)) = profile.speed_range() {
            info!("planned {} waypoint speeds, range {:.2} .. {:.2} km/h", len, lo, hi);
        }
        profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn circle_path(n: usize, radius: f64, center: (f64, f64)) -> Path2D {
        let points = (0..n)
            .map(|k| {
                let theta = 2.0 * PI * k as f64 / n as f64;
                Point2D::new(center.0 + radius * theta.cos(), center.1 + radius * theta.sin())
            })
            .collect();
        Path2D::from_points(points)
    }

    #[test]
    fn test_fit_circle_exact() {
        let path = circle_path(36, 7.5, (3.0, -4.0));
        match fit_circle(&path.points()[0..10]) {
            CircleFit::Circle { center, radius } => {
                assert!((radius - 7.5).abs() < 1e-9);
                assert!((center.x - 3.0).abs() < 1e-9);
                assert!((center.y + 4.0).abs() < 1e-9);
            }
            CircleFit::Degenerate => panic!("expected a circle"),
        }
    }

    #[test]
    fn test_fit_circle_far_from_origin() {
        let path = circle_path(200, 50.0, (300_000.0, 4_100_000.0));
        let r = fit_circle(&path.points()[40..50]).radius().unwrap();
        assert!((r - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_fit_collinear_is_degenerate() {
        let points: Vec<Point2D> = (0..10).map(|i| Point2D::new(i as f64, 0.5 * i as f64 + 3.0)).collect();
        assert_eq!(fit_circle(&points), CircleFit::Degenerate);
        assert_eq!(fit_circle(&points[0..2]), CircleFit::Degenerate);
    }

    #[test]
    fn test_circle_path_speed_matches_friction_limit() {
        let path = circle_path(200, 50.0, (10.0, -20.0));
        for &mu in &[0.1, 0.2, 0.5, 1.0] {
            let planner = VelocityPlanner::new(5, 200.0, mu, 9.8).unwrap();
            let profile = planner.plan(&path);
            assert_eq!(profile.len(), path.len());
            let expected = (50.0 * 9.8 * mu).sqrt() * 3.6;
            for i in 5..195 {
                assert!((profile[i] - expected).abs() < 1e-6, "mu {} index {}: {}", mu, i, profile[i]);
            }
        }
    }

    #[test]
    fn test_straight_line_gets_max_speed() {
        let x: Vec<f64> = (0..60).map(|i| i as f64 * 0.5).collect();
        let y: Vec<f64> = x.iter().map(|x| 0.3_f64.tan() * x - 2.0).collect();
        let planner = VelocityPlanner::new(4, 30.0, 0.2, 9.8).unwrap();
        let profile = planner.plan(&Path2D::from_xy(&x, &y));
        assert!(profile.speeds().iter().all(|&v| v == 30.0));
    }

    #[test]
    fn test_boundary_waypoints_get_max_speed() {
        let path = circle_path(100, 2.0, (0.0, 0.0));
        let point_num = 6;
        let planner = VelocityPlanner::new(point_num, 50.0, 0.5, 9.8).unwrap();
        let profile = planner.plan(&path);
        let interior = (2.0 * 9.8 * 0.5_f64).sqrt() * 3.6;
        for i in 0..point_num {
            assert_eq!(profile[i], 50.0);
            assert_eq!(profile[path.len() - 1 - i], 50.0);
        }
        assert!((profile[point_num] - interior).abs() < 1e-6);
        assert!((profile[path.len() - point_num - 1] - interior).abs() < 1e-6);
    }

    #[test]
    fn test_short_path_is_all_boundary() {
        let path = circle_path(9, 1.0, (0.0, 0.0));
        let planner = VelocityPlanner::new(5, 40.0, 0.2, 9.8).unwrap();
        let profile = planner.plan(&path);
        assert_eq!(profile.len(), 9);
        assert!(profile.speeds().iter().all(|&v| v == 40.0));
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(VelocityPlanner::new(1, 80.0, 0.2, 9.8).is_err());
        assert!(VelocityPlanner::new(10, -1.0, 0.2, 9.8).is_err());
        assert!(VelocityPlanner::new(10, 80.0, 0.0, 9.8).is_err());
        assert!(VelocityPlanner::from_config(&PlannerConfig::default()).is_ok());
    }
}
