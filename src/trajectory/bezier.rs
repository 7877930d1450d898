//! Corner smoothing with quadratic Bezier blending
//!
//! A sharp corner between two adjoining path segments is replaced by a
//! quadratic curve. The curve parameter is driven by the same scalar profile
//! used for straight segments, so the samples come out at the control cycle
//! with velocities and accelerations inside the per-axis limits.

use crate::common::geometry;
use crate::trajectory::path::Waypoint;
use crate::trajectory::profile::{
    AxisSelection, MotionConstraints, MotionProfileGenerator, MotionState,
};
use crate::trajectory::{TrajectoryError, TrajectoryPoint};
use nalgebra::Vector3;

/// Bounds of the blend parameter search
const LAMBDA_MIN: f64 = 0.1;
const LAMBDA_MAX: f64 = 0.9;
const LAMBDA_STEP: f64 = 0.1;

/// Retry budget before a degenerate corner is reported as an error
const MAX_LAMBDA_ATTEMPTS: usize = 16;

/// Control points closer than this to the degenerate midpoint are rejected
const DEGENERACY_DISTANCE: f64 = 1e-9;

/// Cycle budget for sampling one curve
const MAX_CURVE_CYCLES: usize = 10_000;

/// How a corner is blended into the surrounding segments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// Replace the corner with the curve entry and exit points
    Full,
    /// Same replacement, applied to the first corner only
    Partial,
    /// Continue from an already-moving state; no new entry point is created
    Transition,
}

/// Which axis drives the velocity profile along a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DrivingAxis {
    X,
    Y,
}

/// Select the driving axis from the segment slope
///
/// Steep segments are commanded through y and shallow ones through x, so the
/// implied velocity on the non-driving axis stays feasible. The bucket
/// boundaries decide which axis is numerically driven.
fn driving_axis(slope: f64, rise: f64, run: f64) -> DrivingAxis {
    if slope >= 1.0 {
        DrivingAxis::Y
    } else if slope == -1.0 && rise < 0.0 {
        DrivingAxis::X
    } else if slope == -1.0 && run < 0.0 {
        DrivingAxis::Y
    } else if slope < -1.0 {
        DrivingAxis::Y
    } else {
        // Shallow slopes, negative or positive, drive off the x axis
        DrivingAxis::X
    }
}

/// A smooth replacement for one sharp path corner
#[derive(Debug, Clone)]
pub struct BezierCurve {
    /// The three waypoints the curve was fitted over
    pub segment_points: [Waypoint; 3],
    /// Blend parameter locating the curve boundaries on the segments
    pub lambda: f64,
    /// Entry, corner and exit control points (x, y, heading)
    pub control_points: [Vector3<f64>; 3],
    /// Curve samples at the control cycle, boundaries included
    pub points: Vec<TrajectoryPoint>,
}

impl BezierCurve {
    /// Curve entry as a waypoint carrying its boundary motion state
    pub fn entry_waypoint(&self) -> Waypoint {
        Self::waypoint_from(&self.points[0])
    }

    /// Curve exit as a waypoint carrying its boundary motion state
    pub fn exit_waypoint(&self) -> Waypoint {
        Self::waypoint_from(&self.points[self.points.len() - 1])
    }

    fn waypoint_from(point: &TrajectoryPoint) -> Waypoint {
        Waypoint {
            position: point.position,
            velocity: Some(point.velocity),
            acceleration: Some(point.acceleration),
        }
    }
}

/// Fits blending curves over path corners
#[derive(Debug)]
pub struct BezierBlender {
    cycle_time: f64,
    constraints: MotionConstraints,
}

impl BezierBlender {
    pub fn new(cycle_time: f64, constraints: MotionConstraints) -> Self {
        BezierBlender {
            cycle_time,
            constraints,
        }
    }

    /// Blend the corner between two adjoining segments into a smooth curve
    ///
    /// `initial` is the motion state at blend time; transition mode starts
    /// the curve directly from it. `corner_index` only labels errors.
    pub fn blend(
        &self,
        prev: &Waypoint,
        corner: &Waypoint,
        next: &Waypoint,
        mode: BlendMode,
        initial: &MotionState,
        corner_index: usize,
    ) -> Result<BezierCurve, TrajectoryError> {
        let lambda = self.control_point_lambda(prev, corner, next, mode, corner_index)?;

        let entry_arc = lambda * geometry::position_distance(&prev.position, &corner.position);
        let exit_arc = lambda * geometry::position_distance(&corner.position, &next.position);

        let entry = self.segment_velocity(&prev.position, &corner.position, entry_arc, initial);
        let exit = self.segment_velocity(&corner.position, &next.position, exit_arc, initial);

        let mut x0 = prev.position * (1.0 - lambda) + corner.position * lambda;
        x0.z = geometry::bearing(&prev.position, &corner.position);
        if mode == BlendMode::Transition {
            x0 = initial.position;
        }
        let x1 = corner.position;
        let mut x2 = corner.position * (1.0 - lambda) + next.position * lambda;
        x2.z = geometry::bearing(&corner.position, &next.position);

        let entry_speed = if mode == BlendMode::Transition {
            (initial.velocity.x * initial.velocity.x + initial.velocity.y * initial.velocity.y)
                .sqrt()
        } else {
            (entry.0 * entry.0 + entry.1 * entry.1).sqrt()
        };
        let exit_speed = (exit.0 * exit.0 + exit.1 * exit.1).sqrt();
        let entry_override = if mode == BlendMode::Transition {
            Some((initial.velocity, initial.acceleration))
        } else {
            None
        };

        let points = self.sample_curve(&x0, &x1, &x2, entry_speed, exit_speed, entry_override)?;

        Ok(BezierCurve {
            segment_points: [prev.clone(), corner.clone(), next.clone()],
            lambda,
            control_points: [x0, x1, x2],
            points,
        })
    }

    /// Entry or exit velocity components along one corner segment
    ///
    /// The driving axis gets the closed-form profile velocity; the other axis
    /// follows through the slope so the commanded direction stays on the
    /// segment.
    fn segment_velocity(
        &self,
        from: &Vector3<f64>,
        to: &Vector3<f64>,
        arc_length: f64,
        initial: &MotionState,
    ) -> (f64, f64) {
        let rise = to.y - from.y;
        let run = to.x - from.x;
        // Vertical segments fall back to the rise itself
        let slope = if run != 0.0 { rise / run } else { rise };

        match driving_axis(slope, rise, run) {
            DrivingAxis::Y => {
                let y_dot = MotionProfileGenerator::entry_velocity(
                    1,
                    arc_length,
                    &self.constraints,
                    initial.velocity.y,
                );
                (y_dot / slope, y_dot)
            }
            DrivingAxis::X => {
                let x_dot = MotionProfileGenerator::entry_velocity(
                    0,
                    arc_length,
                    &self.constraints,
                    initial.velocity.x,
                );
                (x_dot, x_dot * slope)
            }
        }
    }

    /// Search for a blend parameter that keeps the control points usable
    ///
    /// Starts at 0.5 and steps by 0.1, decreasing for transitions and
    /// increasing otherwise, wrapping between the bounds. The search is
    /// bounded; exhaustion reports the corner instead of wrapping forever.
    fn control_point_lambda(
        &self,
        prev: &Waypoint,
        corner: &Waypoint,
        next: &Waypoint,
        mode: BlendMode,
        corner_index: usize,
    ) -> Result<f64, TrajectoryError> {
        let mut lambda = 0.5;
        for _ in 0..MAX_LAMBDA_ATTEMPTS {
            if !Self::lambda_degenerate(prev, corner, next, lambda) {
                return Ok(lambda);
            }
            if mode == BlendMode::Transition {
                lambda -= LAMBDA_STEP;
            } else {
                lambda += LAMBDA_STEP;
            }
            if lambda < LAMBDA_MIN {
                lambda = LAMBDA_MAX;
            }
            if lambda > LAMBDA_MAX {
                lambda = LAMBDA_MIN;
            }
        }
        Err(TrajectoryError::DegenerateBlend {
            corner: corner_index,
        })
    }

    /// True when the corner control point would sit exactly midway between
    /// the derived boundary control points, which collapses the curve fit
    fn lambda_degenerate(prev: &Waypoint, corner: &Waypoint, next: &Waypoint, lambda: f64) -> bool {
        let x0 = prev.position * (1.0 - lambda) + corner.position * lambda;
        let x2 = corner.position * (1.0 - lambda) + next.position * lambda;
        let mid_x = (x0.x + x2.x) / 2.0;
        let mid_y = (x0.y + x2.y) / 2.0;
        let dx = corner.position.x - mid_x;
        let dy = corner.position.y - mid_y;
        (dx * dx + dy * dy).sqrt() < DEGENERACY_DISTANCE
    }

    /// Sample the quadratic curve through the control points at the cycle rate
    fn sample_curve(
        &self,
        x0: &Vector3<f64>,
        x1: &Vector3<f64>,
        x2: &Vector3<f64>,
        entry_speed: f64,
        exit_speed: f64,
        entry_override: Option<(Vector3<f64>, Vector3<f64>)>,
    ) -> Result<Vec<TrajectoryPoint>, TrajectoryError> {
        // Curve derivative endpoints; the derivative is linear in the
        // parameter so its per-axis extremes sit at the endpoints
        let d0 = (2.0 * (x1.x - x0.x), 2.0 * (x1.y - x0.y));
        let d1 = (2.0 * (x2.x - x1.x), 2.0 * (x2.y - x1.y));
        let extreme_x = d0.0.abs().max(d1.0.abs());
        let extreme_y = d0.1.abs().max(d1.1.abs());

        if extreme_x <= 1e-9 && extreme_y <= 1e-9 {
            // All control points coincide; emit a stationary pair
            let hold = TrajectoryPoint {
                position: *x0,
                velocity: Vector3::zeros(),
                acceleration: Vector3::zeros(),
                time_from_start: 0.0,
            };
            let mut end = hold;
            end.time_from_start = self.cycle_time;
            return Ok(vec![hold, end]);
        }

        // Parameter-space limits derived from the per-axis limits
        let mut u_vmax = f64::INFINITY;
        let mut u_amax = f64::INFINITY;
        let mut u_jmax = f64::INFINITY;
        if extreme_x > 1e-9 {
            u_vmax = u_vmax.min(self.constraints.max_velocity.x / extreme_x);
            u_amax = u_amax.min(self.constraints.max_acceleration.x / extreme_x);
            u_jmax = u_jmax.min(self.constraints.max_jerk.x / extreme_x);
        }
        if extreme_y > 1e-9 {
            u_vmax = u_vmax.min(self.constraints.max_velocity.y / extreme_y);
            u_amax = u_amax.min(self.constraints.max_acceleration.y / extreme_y);
            u_jmax = u_jmax.min(self.constraints.max_jerk.y / extreme_y);
        }

        let entry_norm = (d0.0 * d0.0 + d0.1 * d0.1).sqrt();
        let exit_norm = (d1.0 * d1.0 + d1.1 * d1.1).sqrt();
        let u_dot_entry = if entry_norm > 1e-9 {
            (entry_speed / entry_norm).min(u_vmax)
        } else {
            0.0
        };
        let u_dot_exit = if exit_norm > 1e-9 {
            (exit_speed / exit_norm).min(u_vmax)
        } else {
            0.0
        };

        // Drive the curve parameter with the scalar profile
        let profile = MotionProfileGenerator::new(self.cycle_time);
        let u_constraints = MotionConstraints {
            max_velocity: Vector3::new(u_vmax, u_vmax, 1.0),
            max_acceleration: Vector3::new(u_amax, u_amax, 1.0),
            max_jerk: Vector3::new(u_jmax, u_jmax, 1.0),
        };
        let mut state = MotionState {
            position: Vector3::zeros(),
            velocity: Vector3::new(u_dot_entry, 0.0, 0.0),
            acceleration: Vector3::zeros(),
        };
        let target = MotionState {
            position: Vector3::new(1.0, 0.0, 0.0),
            velocity: Vector3::new(u_dot_exit, 0.0, 0.0),
            acceleration: Vector3::zeros(),
        };

        let mut samples = vec![(0.0, u_dot_entry, 0.0)];
        let mut cycles = 0;
        loop {
            let (next, reached) =
                profile.step(&state, &target, &u_constraints, AxisSelection::translation());
            state = next;
            samples.push((state.position.x, state.velocity.x, state.acceleration.x));
            if reached {
                break;
            }
            cycles += 1;
            if cycles > MAX_CURVE_CYCLES {
                return Err(TrajectoryError::ProfileDivergence { cycles });
            }
        }

        // Map the parameter samples onto the plane
        let second = (
            2.0 * (x2.x - 2.0 * x1.x + x0.x),
            2.0 * (x2.y - 2.0 * x1.y + x0.y),
        );
        let limits = &self.constraints;
        let mut points = Vec::with_capacity(samples.len());
        let mut prev_heading = x0.z;
        for (index, &(u, u_dot, u_ddot)) in samples.iter().enumerate() {
            let w = 1.0 - u;
            let px = w * w * x0.x + 2.0 * u * w * x1.x + u * u * x2.x;
            let py = w * w * x0.y + 2.0 * u * w * x1.y + u * u * x2.y;
            let dx = (1.0 - u) * d0.0 + u * d1.0;
            let dy = (1.0 - u) * d0.1 + u * d1.1;

            let heading = if dx * dx + dy * dy > 1e-18 {
                dy.atan2(dx)
            } else {
                prev_heading
            };
            let heading_rate = (geometry::angle_difference(prev_heading, heading)
                / self.cycle_time)
                .clamp(-limits.max_velocity.z, limits.max_velocity.z);

            let vx = (dx * u_dot).clamp(-limits.max_velocity.x, limits.max_velocity.x);
            let vy = (dy * u_dot).clamp(-limits.max_velocity.y, limits.max_velocity.y);
            let ax = (second.0 * u_dot * u_dot + dx * u_ddot)
                .clamp(-limits.max_acceleration.x, limits.max_acceleration.x);
            let ay = (second.1 * u_dot * u_dot + dy * u_ddot)
                .clamp(-limits.max_acceleration.y, limits.max_acceleration.y);

            points.push(TrajectoryPoint {
                position: Vector3::new(px, py, heading),
                velocity: Vector3::new(vx, vy, heading_rate),
                acceleration: Vector3::new(ax, ay, 0.0),
                time_from_start: index as f64 * self.cycle_time,
            });
            prev_heading = heading;
        }

        // A transition curve starts exactly at the in-motion state
        if let Some((velocity, acceleration)) = entry_override {
            if let Some(first) = points.first_mut() {
                first.velocity = velocity;
                first.acceleration = acceleration;
            }
        }

        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn waypoint(x: f64, y: f64, heading: f64) -> Waypoint {
        Waypoint::new(x, y, heading)
    }

    fn blender() -> BezierBlender {
        BezierBlender::new(0.1, MotionConstraints::default())
    }

    #[test]
    fn driving_axis_buckets() {
        assert_eq!(driving_axis(2.0, 2.0, 1.0), DrivingAxis::Y);
        assert_eq!(driving_axis(1.0, 1.0, 1.0), DrivingAxis::Y);
        assert_eq!(driving_axis(0.5, 0.5, 1.0), DrivingAxis::X);
        assert_eq!(driving_axis(-0.5, -0.5, 1.0), DrivingAxis::X);
        assert_eq!(driving_axis(-2.0, -2.0, 1.0), DrivingAxis::Y);
        // The two colinear-negative edge cases split by sign
        assert_eq!(driving_axis(-1.0, -1.0, 1.0), DrivingAxis::X);
        assert_eq!(driving_axis(-1.0, 1.0, -1.0), DrivingAxis::Y);
    }

    #[test]
    fn lambda_avoids_the_degenerate_midpoint() {
        // Evenly spaced colinear points are degenerate exactly at 0.5
        let prev = waypoint(0.0, 0.0, 0.0);
        let corner = waypoint(1.0, 0.0, 0.0);
        let next = waypoint(2.0, 0.0, 0.0);

        let curve = blender()
            .blend(
                &prev,
                &corner,
                &next,
                BlendMode::Full,
                &MotionState::at_rest(prev.position),
                1,
            )
            .unwrap();

        assert!(curve.lambda > 0.5);
        let [x0, x1, x2] = curve.control_points;
        let mid = ((x0.x + x2.x) / 2.0, (x0.y + x2.y) / 2.0);
        assert!((x1.x - mid.0).abs() + (x1.y - mid.1).abs() > 1e-9);
    }

    #[test]
    fn curve_spans_its_control_points() {
        let prev = waypoint(0.0, 0.0, 0.0);
        let corner = waypoint(0.5, 2.0, PI / 4.0);
        let next = waypoint(2.0, 0.0, -PI / 4.0);

        let curve = blender()
            .blend(
                &prev,
                &corner,
                &next,
                BlendMode::Full,
                &MotionState::at_rest(prev.position),
                1,
            )
            .unwrap();

        let first = &curve.points[0];
        let last = &curve.points[curve.points.len() - 1];
        assert_relative_eq!(first.position.x, curve.control_points[0].x, epsilon = 1e-9);
        assert_relative_eq!(first.position.y, curve.control_points[0].y, epsilon = 1e-9);
        assert_relative_eq!(last.position.x, curve.control_points[2].x, epsilon = 1e-9);
        assert_relative_eq!(last.position.y, curve.control_points[2].y, epsilon = 1e-9);

        // The curve keeps the waypoints it was fitted over, corner in the
        // middle, and its boundary control points sit on the two segments
        assert_relative_eq!(curve.segment_points[1].position.x, corner.position.x);
        assert_relative_eq!(curve.segment_points[1].position.y, corner.position.y);
        let expected_x0 = curve.segment_points[0].position * (1.0 - curve.lambda)
            + curve.segment_points[1].position * curve.lambda;
        assert_relative_eq!(curve.control_points[0].x, expected_x0.x, epsilon = 1e-9);
        assert_relative_eq!(curve.control_points[0].y, expected_x0.y, epsilon = 1e-9);
    }

    #[test]
    fn curve_samples_respect_the_limits() {
        let constraints = MotionConstraints::default();
        let prev = waypoint(0.0, 0.0, 0.0);
        let corner = waypoint(0.5, 2.0, PI / 4.0);
        let next = waypoint(2.0, 0.0, -PI / 4.0);

        let curve = blender()
            .blend(
                &prev,
                &corner,
                &next,
                BlendMode::Full,
                &MotionState::at_rest(prev.position),
                1,
            )
            .unwrap();

        for point in &curve.points {
            for axis in 0..3 {
                assert!(point.velocity[axis].abs() <= constraints.max_velocity[axis] + 1e-9);
                assert!(
                    point.acceleration[axis].abs() <= constraints.max_acceleration[axis] + 1e-9
                );
            }
        }
    }

    #[test]
    fn transition_curve_starts_from_the_moving_state() {
        let initial = MotionState {
            position: Vector3::new(0.0, 0.0, 0.5),
            velocity: Vector3::new(0.1, 0.05, 0.0),
            acceleration: Vector3::zeros(),
        };
        let prev = waypoint(0.0, 0.0, 0.5);
        let corner = waypoint(1.0, 1.0, 0.0);
        let next = waypoint(2.0, 0.5, 0.0);

        let curve = blender()
            .blend(&prev, &corner, &next, BlendMode::Transition, &initial, 1)
            .unwrap();

        let first = &curve.points[0];
        assert_relative_eq!(first.position.x, 0.0);
        assert_relative_eq!(first.velocity.x, 0.1);
        assert_relative_eq!(first.velocity.y, 0.05);
    }
}
