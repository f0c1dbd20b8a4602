// Curvature-based velocity planning sample
//
// Loads a path file (one "x y" waypoint per line) or builds a test track of
// two straights joined by a 25 m hairpin, and plans the speed limit of every
// waypoint.
//
// usage: velocity_planner [path.txt] [--config config.toml] [--plot]

use std::f64::consts::PI;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::info;

use wecar_nav::config::CoreConfig;
use wecar_nav::path_planning::{load_path, VelocityPlanner};
use wecar_nav::path_tracking::TargetSpeedSelector;
use wecar_nav::utils::{init_logger, level_from_str, PathStyle, Visualizer};
use wecar_nav::{NavResult, Path2D, Waypoint};

fn test_track() -> Path2D {
    let ds = 0.5;
    let mut points = Vec::new();
    for i in 0..200 {
        points.push(Waypoint::new(i as f64 * ds, 0.0));
    }
    let radius = 25.0;
    let arc_steps = (PI * radius / ds) as usize;
    for i in 0..arc_steps {
        let theta = -PI / 2.0 + PI * i as f64 / arc_steps as f64;
        points.push(Waypoint::new(100.0 + radius * theta.cos(), radius + radius * theta.sin()));
    }
    for i in 0..200 {
        points.push(Waypoint::new(100.0 - i as f64 * ds, 2.0 * radius));
    }
    Path2D::from_points(points)
}

/// Curvature-based speed limits along a path
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path file with one "x y" waypoint per line; a hairpin test track when omitted
    path: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Save ./img/path.svg and ./img/velocity_profile.svg
    #[arg(long)]
    plot: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "WECAR_LOG", default_value = "info")]
    log_level: String,
}

fn main() -> NavResult<()> {
    let args = Args::parse();
    init_logger(level_from_str(&args.log_level))?;

    let config = match &args.config {
        Some(f) => CoreConfig::load(f)?,
        None => {
            let mut config = CoreConfig::default();
            config.planner.point_num = 10;
            config
        }
    };
    let path = match &args.path {
        Some(f) => load_path(f)?,
        None => test_track(),
    };

    let planner = VelocityPlanner::from_config(&config.planner)?;
    let profile = planner.plan(&path);
    let limited = profile.speeds().iter().filter(|&&v| v < planner.max_speed()).count();
    info!("{} of {} waypoints are curvature limited", limited, path.len());

    let path = Arc::new(path);
    let profile = Arc::new(profile);
    let selector = TargetSpeedSelector::from_config(Arc::clone(&path), Arc::clone(&profile), &config.planner)?;
    let start = path[0];
    info!("target speed at path start: {:.2} km/h", selector.target_speed(&start));

    if args.plot {
        std::fs::create_dir_all("img")?;
        let mut vis = Visualizer::new();
        vis.set_title("Planned path");
        vis.plot_path(&path, &PathStyle::default())
            .plot_start(start);
        vis.save_svg("./img/path.svg")?;

        let mut speed_vis = Visualizer::velocity_profile(&profile, planner.max_speed());
        speed_vis.save_svg("./img/velocity_profile.svg")?;
        info!("saved ./img/path.svg and ./img/velocity_profile.svg");
    }

    Ok(())
}
