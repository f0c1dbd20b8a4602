//! Common types used throughout wecar_nav

use std::f64::consts::PI;

use itertools::{Itertools, MinMaxResult};
use nalgebra::{Vector2, Vector4};

use crate::config::SteeringCalibration;

/// 2D point representation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn to_vector(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }
}

impl From<(f64, f64)> for Point2D {
    fn from(tuple: (f64, f64)) -> Self {
        Self { x: tuple.0, y: tuple.1 }
    }
}

impl From<Vector2<f64>> for Point2D {
    fn from(v: Vector2<f64>) -> Self {
        Self { x: v[0], y: v[1] }
    }
}

/// A single path-defining coordinate. Its index in the path is its traversal order.
pub type Waypoint = Point2D;

/// A position fix in the local planar frame
pub type PositionMeasurement = Point2D;

/// Wrap a heading into `(-PI, PI]` with a single `2 * PI` correction.
///
/// Assumes the heading moved by less than one full turn since it was last
/// wrapped; anything further out is returned unwrapped.
pub fn wrap_heading(heading: f64) -> f64 {
    if heading > PI {
        heading - 2.0 * PI
    } else if heading <= -PI {
        heading + 2.0 * PI
    } else {
        heading
    }
}

/// Bring any finite heading into `(-PI, PI]`, however many turns away it is
pub fn normalize_heading(heading: f64) -> f64 {
    let wrapped = (heading + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI {
        PI
    } else {
        wrapped
    }
}

/// Whether a heading lies in `(-PI, PI]`
pub fn is_wrapped(heading: f64) -> bool {
    heading > -PI && heading <= PI
}

/// Vehicle state (x, y, heading, speed)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleState {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    pub speed: f64,
}

impl VehicleState {
    pub fn new(x: f64, y: f64, heading: f64, speed: f64) -> Self {
        Self { x, y, heading, speed }
    }

    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0, heading: 0.0, speed: 0.0 }
    }

    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    pub fn to_vector(&self) -> Vector4<f64> {
        Vector4::new(self.x, self.y, self.heading, self.speed)
    }
}

impl From<Vector4<f64>> for VehicleState {
    fn from(v: Vector4<f64>) -> Self {
        Self { x: v[0], y: v[1], heading: v[2], speed: v[3] }
    }
}

impl From<[f64; 4]> for VehicleState {
    fn from(a: [f64; 4]) -> Self {
        Self { x: a[0], y: a[1], heading: a[2], speed: a[3] }
    }
}

/// Actuation input: measured speed and steering angle in radians
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuationInput {
    pub measured_speed: f64,
    pub steering_angle: f64,
}

impl ActuationInput {
    pub fn new(measured_speed: f64, steering_angle: f64) -> Self {
        Self { measured_speed, steering_angle }
    }

    pub fn zero() -> Self {
        Self { measured_speed: 0.0, steering_angle: 0.0 }
    }

    /// Build an input from a raw servo command, converted with the vehicle calibration
    pub fn from_raw(measured_speed: f64, raw_steering: f64, calibration: &SteeringCalibration) -> Self {
        Self {
            measured_speed,
            steering_angle: calibration.to_radians(raw_steering),
        }
    }

    pub fn to_vector(&self) -> Vector2<f64> {
        Vector2::new(self.measured_speed, self.steering_angle)
    }
}

impl Default for ActuationInput {
    fn default() -> Self {
        Self::zero()
    }
}

/// Ordered, immutable sequence of waypoints
#[derive(Debug, Clone, PartialEq)]
pub struct Path2D {
    points: Vec<Waypoint>,
}

impl Path2D {
    pub fn from_points(points: Vec<Waypoint>) -> Self {
        Self { points }
    }

    pub fn from_xy(x: &[f64], y: &[f64]) -> Self {
        assert_eq!(x.len(), y.len());
        let points = x.iter().zip(y.iter())
            .map(|(&x, &y)| Point2D::new(x, y))
            .collect();
        Self { points }
    }

    pub fn points(&self) -> &[Waypoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn x_coords(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.x).collect()
    }

    pub fn y_coords(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.y).collect()
    }

    pub fn total_length(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        self.points.windows(2)
            .map(|w| w[0].distance(&w[1]))
            .sum()
    }
}

impl std::ops::Index<usize> for Path2D {
    type Output = Waypoint;

    fn index(&self, index: usize) -> &Waypoint {
        &self.points[index]
    }
}

/// Per-waypoint speed limits, index-aligned with the path they were planned on
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityProfile {
    speeds: Vec<f64>,
}

impl VelocityProfile {
    pub fn from_speeds(speeds: Vec<f64>) -> Self {
        Self { speeds }
    }

    pub fn speeds(&self) -> &[f64] {
        &self.speeds
    }

    pub fn len(&self) -> usize {
        self.speeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.speeds.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.speeds.get(index).copied()
    }

    /// Slowest and fastest speed in the profile
    pub fn speed_range(&self) -> Option<(f64, f64)> {
        match self.speeds.iter().copied().minmax() {
            MinMaxResult::NoElements => None,
            MinMaxResult::OneElement(v) => Some((v, v)),
            MinMaxResult::MinMax(lo, hi) => Some((lo, hi)),
        }
    }
}

impl std::ops::Index<usize> for VelocityProfile {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.speeds[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point2d_distance() {
        let p1 = Point2D::new(0.0, 0.0);
        let p2 = Point2D::new(3.0, 4.0);
        assert!((p1.distance(&p2) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_wrap_heading() {
        assert!((wrap_heading(PI + 0.5) - (-PI + 0.5)).abs() < 1e-12);
        assert!((wrap_heading(-PI - 0.5) - (PI - 0.5)).abs() < 1e-12);
        assert_eq!(wrap_heading(1.0), 1.0);
        assert_eq!(wrap_heading(PI), PI);
        assert_eq!(wrap_heading(-PI), PI);
    }

    #[test]
    fn test_wrap_heading_single_turn_only() {
        let h = wrap_heading(3.0 * PI + 0.5);
        assert!(!is_wrapped(h));
    }

    #[test]
    fn test_normalize_heading_many_turns() {
        assert!((normalize_heading(10.0 * PI + 0.5) - 0.5).abs() < 1e-9);
        assert!((normalize_heading(-7.0 * PI + 0.25) - (-PI + 0.25)).abs() < 1e-9);
        assert!((normalize_heading(223.669) - wrap_heading(223.669 - 70.0 * PI)).abs() < 1e-9);
        assert_eq!(normalize_heading(PI), PI);
        assert_eq!(normalize_heading(-PI), PI);
        assert_eq!(normalize_heading(0.0), 0.0);
        for h in [-1e4, -50.0, -3.5, 3.5, 527.504, 1e4].iter() {
            assert!(is_wrapped(normalize_heading(*h)), "heading {}", h);
        }
    }

    #[test]
    fn test_vehicle_state_vector_conversion() {
        let s = VehicleState::new(1.0, 2.0, 0.5, 3.0);
        assert_eq!(VehicleState::from(s.to_vector()), s);
    }

    #[test]
    fn test_actuation_from_raw() {
        let cal = SteeringCalibration { offset: 0.5, scale: 2.0 };
        let u = ActuationInput::from_raw(3.0, 0.75, &cal);
        assert_eq!(u.measured_speed, 3.0);
        assert!((u.steering_angle - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_path2d_total_length() {
        let path = Path2D::from_xy(&[0.0, 1.0, 1.0], &[0.0, 0.0, 1.0]);
        assert!((path.total_length() - 2.0).abs() < 1e-10);
        assert_eq!(path[2], Point2D::new(1.0, 1.0));
    }

    #[test]
    fn test_velocity_profile_speed_range() {
        let profile = VelocityProfile::from_speeds(vec![80.0, 42.5, 61.0, 80.0]);
        assert_eq!(profile.speed_range(), Some((42.5, 80.0)));
        assert_eq!(VelocityProfile::from_speeds(vec![]).speed_range(), None);
        assert_eq!(profile.get(4), None);
    }
}
