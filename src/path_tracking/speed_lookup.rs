//! Target speed selection along a planned path
//!
//! Looks up the waypoint nearest to the vehicle and reads the planned
//! speed a fixed number of waypoints ahead of it.

use std::sync::Arc;

use ordered_float::OrderedFloat;

use crate::common::{NavError, NavResult, Path2D, Point2D, VelocityProfile, Waypoint};
use crate::config::PlannerConfig;

/// Reads target speeds from an immutable path and its velocity profile
#[derive(Debug, Clone)]
pub struct TargetSpeedSelector {
    path: Arc<Path2D>,
    profile: Arc<VelocityProfile>,
    lookahead: usize,
    local_window: usize,
}

impl TargetSpeedSelector {
    pub fn new(
        path: Arc<Path2D>,
        profile: Arc<VelocityProfile>,
        lookahead: usize,
        local_window: usize,
    ) -> NavResult<Self> {
        if path.is_empty() {
            return Err(NavError::InvalidParameter("path is empty".to_string()));
        }
        if path.len() != profile.len() {
            return Err(NavError::InvalidParameter(format!(
                "velocity profile has {} entries for a path of {} waypoints",
                profile.len(),
                path.len()
            )));
        }
        Ok(TargetSpeedSelector { path, profile, lookahead, local_window })
    }

    pub fn from_config(
        path: Arc<Path2D>,
        profile: Arc<VelocityProfile>,
        config: &PlannerConfig,
    ) -> NavResult<Self> {
        Self::new(path, profile, config.lookahead, config.local_window)
    }

    /// Index of the waypoint closest to `position` (lowest index on ties)
    pub fn nearest_index(&self, position: &Point2D) -> usize {
        self.path
            .points()
            .iter()
            .enumerate()
            .min_by_key(|(_, p)| OrderedFloat(p.distance(position)))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Planned speed `lookahead` waypoints past the nearest one, clamped to the path end
    pub fn target_speed(&self, position: &Point2D) -> f64 {
        let index = (self.nearest_index(position) + self.lookahead).min(self.profile.len() - 1);
        self.profile[index]
    }

    /// Up to `local_window` waypoints starting at the nearest one
    pub fn local_path(&self, position: &Point2D) -> &[Waypoint] {
        let start = self.nearest_index(position);
        let end = (start + self.local_window).min(self.path.len());
        &self.path.points()[start..end]
    }
}
