//! Constant-velocity forward projection
//!
//! Predicted trajectories share the output contract of the profile-driven
//! generator but use a lighter motion model: the first waypoint's state is
//! extrapolated at constant velocity, or along a constant-turn-rate arc when
//! the angular velocity is nonzero. Used to project obstacle motion.

use super::{GenerationResult, TrajectoryGenerator};
use crate::common::geometry;
use crate::trajectory::path::Path;
use crate::trajectory::profile::MotionConstraints;
use crate::trajectory::{GenerationMode, Trajectory, TrajectoryError, TrajectoryPoint};
use nalgebra::Vector3;

/// Time horizon over which motion is projected, in seconds
pub const PREDICTION_HORIZON: f64 = 3.5;

/// Forward-projection trajectory generator
#[derive(Debug)]
pub struct PredictionGenerator {
    constraints: MotionConstraints,
    cycle_time: f64,
}

impl TrajectoryGenerator for PredictionGenerator {
    fn new(constraints: MotionConstraints, cycle_time: f64) -> Self {
        PredictionGenerator {
            constraints,
            cycle_time,
        }
    }

    fn generate(
        &mut self,
        path: Path,
        _mode: GenerationMode,
    ) -> Result<GenerationResult, TrajectoryError> {
        if path.is_empty() {
            return Err(TrajectoryError::EmptyPath);
        }

        let first = &path.points[0];
        let mut velocity = first.velocity.unwrap_or_else(Vector3::zeros);
        for axis in 0..3 {
            let limit = self.constraints.max_velocity[axis];
            velocity[axis] = velocity[axis].clamp(-limit, limit);
        }

        let speed = (velocity.x * velocity.x + velocity.y * velocity.y).sqrt();
        let turn_rate = velocity.z;
        let mut course = velocity.y.atan2(velocity.x);
        let mut position = first.position;

        let mut trajectory = Trajectory::new(self.cycle_time);
        trajectory.points.push(TrajectoryPoint {
            position,
            velocity,
            acceleration: Vector3::zeros(),
            time_from_start: 0.0,
        });
        trajectory.knot_indices.push(0);

        let steps = (PREDICTION_HORIZON / self.cycle_time).round() as usize;
        for step in 1..=steps {
            if turn_rate.abs() > 1e-9 {
                course = geometry::displace_angle(course, turn_rate * self.cycle_time);
            }
            position.x += speed * course.cos() * self.cycle_time;
            position.y += speed * course.sin() * self.cycle_time;
            position.z = geometry::displace_angle(position.z, turn_rate * self.cycle_time);

            trajectory.points.push(TrajectoryPoint {
                position,
                velocity: Vector3::new(
                    speed * course.cos(),
                    speed * course.sin(),
                    turn_rate,
                ),
                acceleration: Vector3::zeros(),
                time_from_start: step as f64 * self.cycle_time,
            });
        }

        if trajectory.points.len() > 1 {
            trajectory.knot_indices.push(trajectory.points.len() - 1);
        }

        println!(
            "Projected {} points over {:.1} s",
            trajectory.points.len(),
            trajectory.duration()
        );

        Ok(GenerationResult { trajectory, path })
    }

    fn name(&self) -> &str {
        "PredictionGenerator"
    }
}
