use std::f64::consts::PI;
use std::fmt::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use wecar_nav::config::CoreConfig;
use wecar_nav::path_planning::{parse_path, VelocityPlanner};
use wecar_nav::path_tracking::TargetSpeedSelector;
use wecar_nav::runtime::{EstimatorLoop, Latest};
use wecar_nav::{ActuationInput, CorrectionOutcome, Point2D, PositionMeasurement, StateEstimator};

const CONFIG: &str = r#"
[vehicle]
wheelbase = 0.5
tau = 0.5
speed_gain = 1.0

[estimator]
dt = 0.05
initial_state = [0.0, 0.0, 0.0, 0.0]
initial_covariance = [1.0, 1.0, 0.2, 0.2]
process_noise = [0.001, 0.001, 0.001, 0.01]
measurement_noise = [0.04, 0.04]

[planner]
point_num = 5
max_speed = 60.0
road_friction = 0.5
lookahead = 3

[control_loop]
period_ms = 1
wait_for_first_fix = true
"#;

/// Straight, quarter circle of radius 20 m, straight; as path file text
fn track_text() -> String {
    let mut text = String::new();
    for i in 0..40 {
        writeln!(text, "{:.6} {:.6}", i as f64, 0.0).unwrap();
    }
    for i in 0..32 {
        let theta = -PI / 2.0 + (PI / 2.0) * i as f64 / 32.0;
        writeln!(text, "{:.9} {:.9}", 40.0 + 20.0 * theta.cos(), 20.0 + 20.0 * theta.sin()).unwrap();
    }
    for i in 0..40 {
        writeln!(text, "{:.6} {:.6}", 60.0, 20.0 + i as f64).unwrap();
    }
    text
}

#[test]
fn plan_then_estimate() {
    let config = CoreConfig::from_toml_str(CONFIG).unwrap();

    let path = Arc::new(parse_path(&track_text()).unwrap());
    assert_eq!(path.len(), 112);
    let planner = VelocityPlanner::from_config(&config.planner).unwrap();
    let profile = Arc::new(planner.plan(&path));
    assert_eq!(profile.len(), path.len());

    // Straights run at the limit, the middle of the arc is friction limited
    let arc_speed = (20.0 * 9.8 * 0.5_f64).sqrt() * 3.6;
    assert_eq!(profile[10], 60.0);
    assert_eq!(profile[100], 60.0);
    assert!((profile[56] - arc_speed).abs() < 1e-3);

    let selector =
        TargetSpeedSelector::from_config(Arc::clone(&path), Arc::clone(&profile), &config.planner).unwrap();
    let mid_arc = Point2D::new(54.14, 5.86);
    assert_eq!(selector.nearest_index(&mid_arc), 56);
    assert!((selector.target_speed(&mid_arc) - arc_speed).abs() < 1e-3);

    let actuation = Arc::new(Latest::new());
    let position = Arc::new(Latest::new());
    let mut estimation =
        EstimatorLoop::from_config(&config, Arc::clone(&actuation), Arc::clone(&position)).unwrap();

    // No fix yet: nothing is estimated
    assert!(estimation.tick().is_none());

    actuation.publish(ActuationInput::new(2.0, 0.0));
    position.publish(PositionMeasurement::new(0.0, 0.0));
    let first = estimation.tick().unwrap();
    assert_eq!(first.correction, Some(CorrectionOutcome::Applied));

    // Producer publishes fixes along the x axis while the loop runs
    let shutdown = Arc::new(AtomicBool::new(false));
    let producer = {
        let position = Arc::clone(&position);
        let shutdown = Arc::clone(&shutdown);
        thread::spawn(move || {
            let mut x = 0.0;
            while !shutdown.load(Ordering::SeqCst) {
                x += 0.05;
                position.publish(PositionMeasurement::new(x, 0.0));
                thread::sleep(std::time::Duration::from_millis(2));
            }
        })
    };

    let mut last_tick = first.tick;
    estimation.run(&shutdown, |report| {
        assert_eq!(report.tick, last_tick + 1);
        assert!(report.state.heading > -PI && report.state.heading <= PI);
        last_tick = report.tick;
        if report.tick >= 50 {
            shutdown.store(true, Ordering::SeqCst);
        }
    });
    producer.join().unwrap();

    assert_eq!(estimation.ticks(), 50);
    let p = estimation.estimator().covariance();
    assert!((p - p.transpose()).abs().max() < 1e-9);
    assert!(estimation.estimator().state().y.abs() < 1.0);
}
