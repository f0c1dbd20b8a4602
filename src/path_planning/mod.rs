// Path planning module: path loading and curvature-based speed limits

pub mod path_loader;
pub mod velocity_planner;

pub use path_loader::{load_path, parse_path};
pub use velocity_planner::{fit_circle, CircleFit, VelocityPlanner};
