// Path tracking module: target speed lookup along the planned path

pub mod speed_lookup;

pub use speed_lookup::TargetSpeedSelector;
