//! Bounded-jerk motion profile generation
//!
//! The profile generator advances one control cycle at a time. The selected
//! axes are collapsed onto the straight line toward the target, driven by a
//! single jerk-bounded scalar profile and projected back per axis, so every
//! active axis completes its motion at the same instant. Axes outside the
//! selection mask hold their current state.

use crate::common::geometry;
use nalgebra::Vector3;
use std::collections::HashMap;
use std::f64::consts::PI;

/// Default control cycle period in seconds
pub const DEFAULT_CYCLE_TIME: f64 = 0.1;

/// Index of the heading degree of freedom
pub const HEADING_AXIS: usize = 2;

/// Position convergence tolerance of the profile stepper
pub const POSITION_TOLERANCE: f64 = 1e-3;

/// Velocity convergence tolerance of the profile stepper
pub const VELOCITY_TOLERANCE: f64 = 5e-2;

/// Per-axis kinematic limits for one generation request
#[derive(Debug, Clone)]
pub struct MotionConstraints {
    pub max_velocity: Vector3<f64>,
    pub max_acceleration: Vector3<f64>,
    pub max_jerk: Vector3<f64>,
}

impl Default for MotionConstraints {
    fn default() -> Self {
        MotionConstraints {
            max_velocity: Vector3::new(0.33, 0.33, PI / 4.0),
            max_acceleration: Vector3::new(0.66, 0.66, PI / 4.0),
            max_jerk: Vector3::new(1.0, 1.0, PI / 3.0),
        }
    }
}

impl MotionConstraints {
    /// Configure the limits with parameters
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> Result<(), String> {
        if let Some(&value) = params.get("max_velocity_x") {
            if value <= 0.0 {
                return Err("max_velocity_x must be positive".to_string());
            }
            self.max_velocity.x = value;
        }

        if let Some(&value) = params.get("max_velocity_y") {
            if value <= 0.0 {
                return Err("max_velocity_y must be positive".to_string());
            }
            self.max_velocity.y = value;
        }

        if let Some(&value) = params.get("max_velocity_heading") {
            if value <= 0.0 {
                return Err("max_velocity_heading must be positive".to_string());
            }
            self.max_velocity.z = value;
        }

        if let Some(&value) = params.get("max_acceleration_x") {
            if value <= 0.0 {
                return Err("max_acceleration_x must be positive".to_string());
            }
            self.max_acceleration.x = value;
        }

        if let Some(&value) = params.get("max_acceleration_y") {
            if value <= 0.0 {
                return Err("max_acceleration_y must be positive".to_string());
            }
            self.max_acceleration.y = value;
        }

        if let Some(&value) = params.get("max_acceleration_heading") {
            if value <= 0.0 {
                return Err("max_acceleration_heading must be positive".to_string());
            }
            self.max_acceleration.z = value;
        }

        if let Some(&value) = params.get("max_jerk_x") {
            if value <= 0.0 {
                return Err("max_jerk_x must be positive".to_string());
            }
            self.max_jerk.x = value;
        }

        if let Some(&value) = params.get("max_jerk_y") {
            if value <= 0.0 {
                return Err("max_jerk_y must be positive".to_string());
            }
            self.max_jerk.y = value;
        }

        if let Some(&value) = params.get("max_jerk_heading") {
            if value <= 0.0 {
                return Err("max_jerk_heading must be positive".to_string());
            }
            self.max_jerk.z = value;
        }

        Ok(())
    }
}

/// Mask selecting which degrees of freedom the profile drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisSelection {
    axes: [bool; 3],
}

impl AxisSelection {
    /// Drive the two translational axes, hold heading
    pub fn translation() -> Self {
        AxisSelection {
            axes: [true, true, false],
        }
    }

    /// Drive heading only, hold translation
    pub fn rotation() -> Self {
        AxisSelection {
            axes: [false, false, true],
        }
    }

    /// Whether the axis at `index` is actively driven
    pub fn is_selected(&self, index: usize) -> bool {
        self.axes[index]
    }
}

/// Kinematic state of all degrees of freedom at one instant
#[derive(Debug, Clone, Copy)]
pub struct MotionState {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub acceleration: Vector3<f64>,
}

impl MotionState {
    /// A state at the given position with zero velocity and acceleration
    pub fn at_rest(position: Vector3<f64>) -> Self {
        MotionState {
            position,
            velocity: Vector3::zeros(),
            acceleration: Vector3::zeros(),
        }
    }
}

/// Per-cycle stepper for time-synchronized motion profiles
#[derive(Debug, Clone)]
pub struct MotionProfileGenerator {
    cycle_time: f64,
}

impl MotionProfileGenerator {
    pub fn new(cycle_time: f64) -> Self {
        MotionProfileGenerator { cycle_time }
    }

    pub fn cycle_time(&self) -> f64 {
        self.cycle_time
    }

    /// Advance one control cycle toward the target state
    ///
    /// Returns the next state and whether the target has been reached. Once
    /// position and velocity converge within tolerance the state snaps onto
    /// the target exactly. A degenerate zero-length displacement resolves to
    /// the target immediately.
    pub fn step(
        &self,
        current: &MotionState,
        target: &MotionState,
        constraints: &MotionConstraints,
        axes: AxisSelection,
    ) -> (MotionState, bool) {
        let mut displacement = Vector3::zeros();
        for axis in 0..3 {
            if axes.is_selected(axis) {
                displacement[axis] = if axis == HEADING_AXIS {
                    geometry::angle_difference(current.position[axis], target.position[axis])
                } else {
                    target.position[axis] - current.position[axis]
                };
            }
        }

        let distance = displacement.norm();
        if distance < 1e-9 {
            return (Self::snapped(current, target, axes), true);
        }
        let direction = displacement / distance;

        // Scalar limits along the displacement direction; dividing each axis
        // limit by its unit component keeps every axis within its own bound
        let v_lim = Self::directional_limit(&constraints.max_velocity, &direction, axes);
        let a_lim = Self::directional_limit(&constraints.max_acceleration, &direction, axes);
        let j_lim = Self::directional_limit(&constraints.max_jerk, &direction, axes);

        let v0 = Self::project(&current.velocity, &direction, axes);
        let a0 = Self::project(&current.acceleration, &direction, axes);
        let v_end = Self::project(&target.velocity, &direction, axes).clamp(-v_lim, v_lim);

        if distance <= POSITION_TOLERANCE && (v0 - v_end).abs() <= VELOCITY_TOLERANCE {
            return (Self::snapped(current, target, axes), true);
        }

        // Deceleration envelope, effective acceleration at 2/3 of the limit
        let a_eff = 2.0 * a_lim / 3.0;
        let v_des = (v_end * v_end + 2.0 * a_eff * distance).sqrt().min(v_lim);

        let dt = self.cycle_time;
        let a_des = ((v_des - v0) / dt).clamp(-a_lim, a_lim);
        let a_next = a0 + (a_des - a0).clamp(-j_lim * dt, j_lim * dt);
        let v_next = (v0 + a_next * dt).clamp(-v_lim, v_lim);
        let s_next = (v_next * dt).min(distance);

        let mut next = *current;
        for axis in 0..3 {
            if axes.is_selected(axis) {
                if axis == HEADING_AXIS {
                    next.position[axis] =
                        geometry::displace_angle(current.position[axis], direction[axis] * s_next);
                } else {
                    next.position[axis] = current.position[axis] + direction[axis] * s_next;
                }
                next.velocity[axis] = direction[axis] * v_next;
                next.acceleration[axis] = direction[axis] * a_next;
            }
        }
        (next, false)
    }

    /// Closed-form velocity achievable over an arc length under constant
    /// effective acceleration
    ///
    /// `v = sqrt(2 * a_eff * s + v0^2)` with the effective acceleration at
    /// 2/3 of the axis limit, clipped symmetrically to the axis velocity
    /// limit. Used to seed blend-curve boundary velocities without running a
    /// full profile.
    pub fn entry_velocity(
        axis: usize,
        arc_length: f64,
        constraints: &MotionConstraints,
        initial_velocity: f64,
    ) -> f64 {
        let a_eff = 2.0 * constraints.max_acceleration[axis] / 3.0;
        let radicand = 2.0 * a_eff * arc_length + initial_velocity * initial_velocity;
        let v = radicand.max(0.0).sqrt();
        let limit = constraints.max_velocity[axis];
        v.clamp(-limit, limit)
    }

    fn snapped(current: &MotionState, target: &MotionState, axes: AxisSelection) -> MotionState {
        let mut state = *current;
        for axis in 0..3 {
            if axes.is_selected(axis) {
                state.position[axis] = if axis == HEADING_AXIS {
                    geometry::normalize_angle(target.position[axis])
                } else {
                    target.position[axis]
                };
                state.velocity[axis] = target.velocity[axis];
                state.acceleration[axis] = 0.0;
            }
        }
        state
    }

    fn directional_limit(
        limits: &Vector3<f64>,
        direction: &Vector3<f64>,
        axes: AxisSelection,
    ) -> f64 {
        let mut limit = f64::INFINITY;
        for axis in 0..3 {
            if axes.is_selected(axis) && direction[axis].abs() > 1e-9 {
                limit = limit.min(limits[axis] / direction[axis].abs());
            }
        }
        limit
    }

    fn project(vector: &Vector3<f64>, direction: &Vector3<f64>, axes: AxisSelection) -> f64 {
        let mut dot = 0.0;
        for axis in 0..3 {
            if axes.is_selected(axis) {
                dot += vector[axis] * direction[axis];
            }
        }
        dot
    }
}
