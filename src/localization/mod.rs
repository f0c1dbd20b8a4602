// Localization module: vehicle motion model and EKF state estimation

pub mod ekf;
pub mod motion_model;

// Re-exports
pub use ekf::ExtendedKalmanFilter;
pub use motion_model::BicycleModel;
