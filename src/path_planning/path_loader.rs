//! Plain-text path loading
//!
//! One waypoint per line, `x y` as whitespace-separated floats. Line order is
//! traversal order. Tokens after the first two are ignored; whitespace-only
//! lines are skipped.

use std::fs::read_to_string;
use std::path::Path;

use log::info;

use crate::common::{NavError, NavResult, Path2D, Waypoint};

/// Parse a path from its text representation
pub fn parse_path(text: &str) -> NavResult<Path2D> {
    let mut points = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        points.push(parse_waypoint(line, i + 1)?);
    }
    if points.is_empty() {
        return Err(NavError::Config("path contains no waypoints".to_string()));
    }
    Ok(Path2D::from_points(points))
}

/// Load a path file once into memory
pub fn load_path<P: AsRef<Path>>(path: P) -> NavResult<Path2D> {
    let text = read_to_string(path.as_ref())?;
    let loaded = parse_path(&text)?;
    info!(
        "loaded {} waypoints ({:.1} m) from {}",
        loaded.len(),
        loaded.total_length(),
        path.as_ref().display()
    );
    Ok(loaded)
}

fn parse_waypoint(line: &str, line_no: usize) -> NavResult<Waypoint> {
    let mut tokens = line.split_whitespace();
    let mut coord = |axis: &str| -> NavResult<f64> {
        let token = tokens.next().ok_or_else(|| NavError::PathLoad {
            line: line_no,
            reason: format!("missing {} coordinate", axis),
        })?;
        let value: f64 = token.parse().map_err(|_| NavError::PathLoad {
            line: line_no,
            reason: format!("{} coordinate '{}' is not a number", axis, token),
        })?;
        if !value.is_finite() {
            return Err(NavError::PathLoad {
                line: line_no,
                reason: format!("{} coordinate '{}' is not finite", axis, token),
            });
        }
        Ok(value)
    };
    let x = coord("x")?;
    let y = coord("y")?;
    Ok(Waypoint::new(x, y))
}
