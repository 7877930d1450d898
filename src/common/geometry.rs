//! Stateless geometry helpers shared across the trajectory engine
//!
//! All functions take explicit arguments and return explicit values; there is
//! no shared instance or hidden state.

use nalgebra::Vector3;
use std::f64::consts::PI;

/// Normalize an angle to [-pi, pi]
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle;
    while a > PI {
        a -= 2.0 * PI;
    }
    while a < -PI {
        a += 2.0 * PI;
    }
    a
}

/// Signed shortest angular distance from `a1` to `a2`
pub fn angle_difference(a1: f64, a2: f64) -> f64 {
    normalize_angle(a2 - a1)
}

/// Displace an angle by a delta, keeping the result in [-pi, pi]
pub fn displace_angle(angle: f64, delta: f64) -> f64 {
    normalize_angle(angle + delta)
}

/// Bearing of the segment from `a` to `b` in the world frame
pub fn bearing(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    (b.y - a.y).atan2(b.x - a.x)
}

/// Euclidean distance between two positions, ignoring heading
pub fn position_distance(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    (dx * dx + dy * dy).sqrt()
}
