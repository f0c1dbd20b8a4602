//! gnuplot figures for the demo binaries
//!
//! Planar views (paths, trajectories, position fixes, vehicle pose) and the
//! speed-limit-per-waypoint view of a velocity profile.

use gnuplot::{AutoOption, AxesCommon, Caption, Color, Figure, LineWidth, PointSize, PointSymbol};

use crate::common::{NavError, NavResult, Path2D, Point2D, VehicleState, VelocityProfile};

/// Series colors
pub mod colors {
    pub const RED: &str = "#FF0000";
    pub const GREEN: &str = "#00FF00";
    pub const BLUE: &str = "#0000FF";
    pub const YELLOW: &str = "#FFFF00";
    pub const CYAN: &str = "#00FFFF";
    pub const GRAY: &str = "#808080";

    pub const START: &str = GREEN;
    pub const PATH: &str = RED;
    pub const VEHICLE: &str = CYAN;
    pub const ESTIMATED: &str = "#35C788";
    pub const GROUND_TRUTH: &str = BLUE;
    pub const MEASUREMENT: &str = "#DD3355";
    pub const DEAD_RECKONING: &str = YELLOW;
    pub const SPEED_LIMIT: &str = GRAY;
}

/// Line series style
#[derive(Debug, Clone)]
pub struct PathStyle {
    pub color: String,
    pub line_width: f64,
    pub caption: String,
}

impl PathStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        PathStyle {
            color: color.to_string(),
            line_width: 2.0,
            caption: caption.to_string(),
        }
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }
}

impl Default for PathStyle {
    fn default() -> Self {
        PathStyle::new(colors::PATH, "Path")
    }
}

/// Scatter series style, drawn with open circles
#[derive(Debug, Clone)]
pub struct PointStyle {
    pub color: String,
    pub size: f64,
    pub caption: String,
}

impl PointStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        PointStyle {
            color: color.to_string(),
            size: 1.0,
            caption: caption.to_string(),
        }
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }
}

/// One gnuplot figure with a single set of 2D axes
pub struct Visualizer {
    figure: Figure,
    title: String,
    x_label: String,
    y_label: String,
    y_range: Option<(f64, f64)>,
    /// Equal axis scaling for planar views, `None` lets gnuplot choose
    aspect_ratio: Option<f64>,
}

impl Visualizer {
    /// Planar (x, y) figure in metres with equal axis scaling
    pub fn new() -> Self {
        Visualizer {
            figure: Figure::new(),
            title: String::new(),
            x_label: "X [m]".to_string(),
            y_label: "Y [m]".to_string(),
            y_range: None,
            aspect_ratio: Some(1.0),
        }
    }

    /// Speed limit against waypoint index, with the vehicle limit as a reference line
    pub fn velocity_profile(profile: &VelocityProfile, max_speed: f64) -> Self {
        let mut vis = Self::new();
        vis.set_title("Velocity profile")
            .set_x_label("Waypoint index")
            .set_y_label("Speed [km/h]")
            .set_aspect_ratio(None)
            .set_y_range(0.0, max_speed * 1.1);

        let index: Vec<f64> = (0..profile.len()).map(|i| i as f64).collect();
        let last = index.last().copied().unwrap_or(0.0);
        vis.plot_path_xy(&[0.0, last], &[max_speed, max_speed],
            &PathStyle::new(colors::SPEED_LIMIT, "Max speed").with_line_width(1.0));
        vis.plot_path_xy(&index, profile.speeds(), &PathStyle::new(colors::PATH, "Planned speed"));
        vis
    }

    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.title = title.to_string();
        self
    }

    pub fn set_x_label(&mut self, label: &str) -> &mut Self {
        self.x_label = label.to_string();
        self
    }

    pub fn set_y_label(&mut self, label: &str) -> &mut Self {
        self.y_label = label.to_string();
        self
    }

    pub fn set_y_range(&mut self, min: f64, max: f64) -> &mut Self {
        self.y_range = Some((min, max));
        self
    }

    pub fn set_aspect_ratio(&mut self, ratio: Option<f64>) -> &mut Self {
        self.aspect_ratio = ratio;
        self
    }

    pub fn plot_path(&mut self, path: &Path2D, style: &PathStyle) -> &mut Self {
        self.plot_path_xy(&path.x_coords(), &path.y_coords(), style)
    }

    pub fn plot_path_xy(&mut self, x: &[f64], y: &[f64], style: &PathStyle) -> &mut Self {
        self.figure.axes2d().lines(x, y, &[
            Caption(&style.caption),
            Color(&style.color),
            LineWidth(style.line_width),
        ]);
        self
    }

    /// (x, y) track of a state history
    pub fn plot_trajectory(&mut self, states: &[VehicleState], style: &PathStyle) -> &mut Self {
        let (x, y): (Vec<f64>, Vec<f64>) = states.iter().map(|s| (s.x, s.y)).unzip();
        self.plot_path_xy(&x, &y, style)
    }

    pub fn plot_points(&mut self, points: &[Point2D], style: &PointStyle) -> &mut Self {
        let (x, y): (Vec<f64>, Vec<f64>) = points.iter().map(|p| (p.x, p.y)).unzip();
        self.figure.axes2d().points(&x, &y, &[
            Caption(&style.caption),
            Color(&style.color),
            PointSymbol('O'),
            PointSize(style.size),
        ]);
        self
    }

    /// Vehicle position with a heading stub of half `size` metres
    pub fn plot_vehicle(&mut self, state: &VehicleState, size: f64) -> &mut Self {
        self.plot_points(&[state.position()], &PointStyle::new(colors::VEHICLE, "Vehicle").with_size(size));
        let tip = Point2D::new(
            state.x + 0.5 * size * state.heading.cos(),
            state.y + 0.5 * size * state.heading.sin(),
        );
        self.figure.axes2d().lines(&[state.x, tip.x], &[state.y, tip.y], &[
            Color(colors::VEHICLE),
            LineWidth(2.0),
        ]);
        self
    }

    pub fn plot_start(&mut self, point: Point2D) -> &mut Self {
        self.plot_points(&[point], &PointStyle::new(colors::START, "Start").with_size(1.5))
    }

    /// Write the figure as an 800x600 SVG
    pub fn save_svg(&mut self, path: &str) -> NavResult<()> {
        self.apply_settings();
        self.figure
            .save_to_svg(path, 800, 600)
            .map_err(|e| NavError::Visualization(format!("{}: {}", path, e)))
    }

    fn apply_settings(&mut self) {
        let axes = self.figure.axes2d();
        if !self.title.is_empty() {
            axes.set_title(&self.title, &[]);
        }
        axes.set_x_label(&self.x_label, &[]);
        axes.set_y_label(&self.y_label, &[]);
        if let Some((lo, hi)) = self.y_range {
            axes.set_y_range(AutoOption::Fix(lo), AutoOption::Fix(hi));
        }
        if let Some(ratio) = self.aspect_ratio {
            axes.set_aspect_ratio(AutoOption::Fix(ratio));
        }
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planar_view_keeps_equal_scaling() {
        let vis = Visualizer::new();
        assert_eq!(vis.aspect_ratio, Some(1.0));
        assert_eq!(vis.x_label, "X [m]");
        assert!(vis.y_range.is_none());
    }

    #[test]
    fn test_velocity_profile_view() {
        let profile = VelocityProfile::from_speeds(vec![80.0, 40.0, 80.0]);
        let vis = Visualizer::velocity_profile(&profile, 80.0);
        assert!(vis.aspect_ratio.is_none());
        assert_eq!(vis.y_label, "Speed [km/h]");
        let (lo, hi) = vis.y_range.unwrap();
        assert_eq!(lo, 0.0);
        assert!((hi - 88.0).abs() < 1e-9);
    }

    #[test]
    fn test_styles() {
        let path = PathStyle::new(colors::RED, "Test Path").with_line_width(3.0);
        assert_eq!(path.line_width, 3.0);
        assert_eq!(PathStyle::default().color, colors::PATH);
        let point = PointStyle::new(colors::MEASUREMENT, "Fixes").with_size(0.5);
        assert_eq!(point.size, 0.5);
    }
}
