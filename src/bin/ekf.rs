// Extended kalman filter (EKF) vehicle state estimation sample
//
// Simulates a bicycle-model vehicle with noisy speed / steering readings and
// noisy position fixes at half the loop rate, and runs the estimation loop
// over them.
//
// usage: ekf [--config config.toml] [--plot]

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::info;
use rand::thread_rng;
use rand_distr::{Distribution, Normal};

use wecar_nav::config::CoreConfig;
use wecar_nav::localization::BicycleModel;
use wecar_nav::runtime::{EstimatorLoop, Latest};
use wecar_nav::utils::{colors, init_logger, level_from_str, PathStyle, PointStyle, Visualizer};
use wecar_nav::{
    ActuationInput, MotionModel, NavError, NavResult, PositionMeasurement, StateEstimator,
    VehicleState,
};

const SIM_TIME: f64 = 50.0;

/// Demo defaults: speed readings in m/s and a vehicle starting at the origin
const DEMO_CONFIG: &str = r#"
[vehicle]
wheelbase = 0.5
tau = 0.5
speed_gain = 1.0

[estimator]
initial_state = [0.0, 0.0, 0.0, 0.0]
initial_covariance = [1.0, 1.0, 0.2, 0.2]
"#;

/// EKF estimation over a simulated vehicle
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file; the built-in demo vehicle is used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Save the trajectories to ./img/ekf.svg
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
        Some(p) => CoreConfig::load(p)?,
        None => CoreConfig::from_toml_str(DEMO_CONFIG)?,
    };

    let dt = config.estimator.dt;
    let calibration = config.vehicle.steering;
    let model = BicycleModel::from_config(dt, &config.vehicle);
    let r = config.estimator.measurement_noise()?;

    let actuation = Arc::new(Latest::new());
    let position = Arc::new(Latest::new());
    let mut estimation = EstimatorLoop::from_config(&config, Arc::clone(&actuation), Arc::clone(&position))?;

    let map_normal = |std: f64| {
        Normal::new(0.0, std).map_err(|e| NavError::InvalidParameter(e.to_string()))
    };
    let speed_noise = map_normal(0.3)?;
    let servo_noise = map_normal(0.005)?;
    let gps_noise_x = map_normal(r[(0, 0)].sqrt())?;
    let gps_noise_y = map_normal(r[(1, 1)].sqrt())?;
    let mut rng = thread_rng();

    let mut x_true = config.estimator.initial_state()?;
    let mut x_dr = x_true;

    let mut h_true = vec![x_true];
    let mut h_dr = vec![x_dr];
    let mut h_est: Vec<VehicleState> = Vec::new();
    let mut h_z: Vec<PositionMeasurement> = Vec::new();
    let mut sq_err = 0.0;

    let steps = (SIM_TIME / dt) as usize;
    for step in 0..steps {
        let time = step as f64 * dt;

        // Raw servo command sweeping around straight ahead
        let raw_servo = calibration.offset + 0.4 * (0.2 * time).sin();
        let u = ActuationInput::from_raw(4.0, raw_servo, &calibration);
        let ud = ActuationInput::from_raw(
            u.measured_speed + speed_noise.sample(&mut rng),
            raw_servo + servo_noise.sample(&mut rng),
            &calibration,
        );

        x_true = model.propagate(&x_true, &u);
        x_dr = model.propagate(&x_dr, &ud);
        actuation.publish(ud);

        if step % 2 == 0 {
            let z = PositionMeasurement::new(
                x_true.x + gps_noise_x.sample(&mut rng),
                x_true.y + gps_noise_y.sample(&mut rng),
            );
            position.publish(z);
            h_z.push(z);
        }

        if let Some(report) = estimation.tick() {
            sq_err += report.state.position().distance(&x_true.position()).powi(2);
            h_est.push(report.state);
        }
        h_true.push(x_true);
        h_dr.push(x_dr);
    }

    let rms = (sq_err / h_est.len().max(1) as f64).sqrt();
    let dr_err = x_dr.position().distance(&x_true.position());
    info!("{} ticks, position RMS error {:.3} m (dead reckoning final error {:.3} m)",
        estimation.ticks(), rms, dr_err);
    info!("final covariance diagonal {:?}", estimation.estimator().covariance().diagonal().as_slice());

    if args.plot {
        std::fs::create_dir_all("img")?;
        let mut vis = Visualizer::new();
        vis.set_title("EKF vehicle state estimation");
        vis.plot_points(&h_z, &PointStyle::new(colors::MEASUREMENT, "Position fixes").with_size(0.5))
            .plot_trajectory(&h_true, &PathStyle::new(colors::GROUND_TRUTH, "Ground truth"))
            .plot_trajectory(&h_dr, &PathStyle::new(colors::DEAD_RECKONING, "Dead reckoning"))
            .plot_trajectory(&h_est, &PathStyle::new(colors::ESTIMATED, "EKF estimate"));
        if let Some(last) = h_est.last() {
            vis.plot_vehicle(last, 1.0);
        }
        vis.save_svg("./img/ekf.svg")?;
        info!("saved ./img/ekf.svg");
    }

    Ok(())
}
