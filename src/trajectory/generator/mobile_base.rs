//! Profile-driven trajectory generation for the mobile base
//!
//! The generator walks the cleaned path one knot point at a time. Each
//! transition either becomes a straight time-synchronized segment, a blended
//! curve over a designated corner, or is preceded by an in-place rotation
//! when the heading error to the next bearing is too large.

use super::{GenerationResult, TrajectoryGenerator};
use crate::common::geometry;
use crate::trajectory::bezier::{BezierBlender, BezierCurve, BlendMode};
use crate::trajectory::path::{Path, Waypoint, DUPLICATE_DISTANCE};
use crate::trajectory::profile::{
    AxisSelection, MotionConstraints, MotionProfileGenerator, MotionState,
};
use crate::trajectory::rotation;
use crate::trajectory::{GenerationMode, Trajectory, TrajectoryError, TrajectoryPoint};
use nalgebra::Vector3;

/// Heading error beyond which an in-place rotation is inserted, in radians
pub const ROTATION_THRESHOLD: f64 = 0.173;

/// Cycle budget for one segment before generation is aborted
const MAX_SEGMENT_CYCLES: usize = 100_000;

/// Trajectory generator for the mobile base
#[derive(Debug)]
pub struct MobileBaseGenerator {
    constraints: MotionConstraints,
    profile: MotionProfileGenerator,
    current: MotionState,
    prev_knot: Vector3<f64>,
    time_from_start: f64,
}

impl TrajectoryGenerator for MobileBaseGenerator {
    fn new(constraints: MotionConstraints, cycle_time: f64) -> Self {
        MobileBaseGenerator {
            profile: MotionProfileGenerator::new(cycle_time),
            constraints,
            current: MotionState::at_rest(Vector3::zeros()),
            prev_knot: Vector3::zeros(),
            time_from_start: 0.0,
        }
    }

    fn generate(
        &mut self,
        path: Path,
        mode: GenerationMode,
    ) -> Result<GenerationResult, TrajectoryError> {
        if path.is_empty() {
            return Err(TrajectoryError::EmptyPath);
        }

        let first = path.points[0].clone();
        self.current = MotionState {
            position: first.position,
            velocity: first.velocity.unwrap_or_else(Vector3::zeros),
            acceleration: first.acceleration.unwrap_or_else(Vector3::zeros),
        };
        self.prev_knot = first.position;
        self.time_from_start = 0.0;

        let mut trajectory = Trajectory::new(self.profile.cycle_time());
        trajectory.points.push(TrajectoryPoint {
            position: self.current.position,
            velocity: self.current.velocity,
            acceleration: self.current.acceleration,
            time_from_start: 0.0,
        });
        trajectory.knot_indices.push(0);

        let blender = BezierBlender::new(self.profile.cycle_time(), self.constraints.clone());
        let mut out_points = vec![first];

        for i in 1..path.points.len() {
            if let Some(blend_mode) = Self::blend_mode_for(mode, i, path.points.len()) {
                let prev = path.points[i - 1].clone();
                let corner = path.points[i].clone();
                let next = path.points[i + 1].clone();
                let curve =
                    blender.blend(&prev, &corner, &next, blend_mode, &self.current, i)?;

                if blend_mode != BlendMode::Transition {
                    // Reach the curve entry first; the entry is not a knot point
                    self.drive_straight(&curve.entry_waypoint(), &mut trajectory)?;
                }
                self.splice_curve(&curve, &mut trajectory);
                trajectory.knot_indices.push(trajectory.points.len() - 1);
                self.prev_knot = self.current.position;

                // The returned path carries the curve boundaries in place of
                // the corner; a transition keeps its moving start point
                if blend_mode == BlendMode::Transition {
                    out_points.push(curve.exit_waypoint());
                } else {
                    out_points.push(curve.entry_waypoint());
                    out_points.push(curve.exit_waypoint());
                }
            } else {
                let target = path.points[i].clone();
                self.drive_straight(&target, &mut trajectory)?;
                trajectory.knot_indices.push(trajectory.points.len() - 1);
                self.prev_knot = self.current.position;
                out_points.push(target);
            }
        }

        println!(
            "Generated trajectory with {} points and {} knot points",
            trajectory.points.len(),
            trajectory.knot_indices.len()
        );

        Ok(GenerationResult {
            trajectory,
            path: Path::new(out_points),
        })
    }

    fn name(&self) -> &str {
        "MobileBaseGenerator"
    }
}

impl MobileBaseGenerator {
    /// Whether the waypoint at `index` is a blend corner for the mode
    fn blend_mode_for(mode: GenerationMode, index: usize, path_len: usize) -> Option<BlendMode> {
        if path_len < 3 {
            return None;
        }
        match mode {
            GenerationMode::FullBezier if index + 1 < path_len => Some(BlendMode::Full),
            GenerationMode::PartialBezier if index == 1 => Some(BlendMode::Partial),
            GenerationMode::Transition if index == 1 => Some(BlendMode::Transition),
            _ => None,
        }
    }

    /// Drive a straight segment to the target waypoint
    ///
    /// Inserts an in-place rotation first when the heading error to the
    /// bearing exceeds the threshold. During the segment the heading tracks
    /// the bearing from the previous knot point, rate-limited by the heading
    /// velocity limit.
    fn drive_straight(
        &mut self,
        target: &Waypoint,
        trajectory: &mut Trajectory,
    ) -> Result<(), TrajectoryError> {
        let distance = geometry::position_distance(&self.current.position, &target.position);
        let translating = distance > DUPLICATE_DISTANCE;

        if translating {
            let bearing = geometry::bearing(&self.current.position, &target.position);
            if geometry::angle_difference(self.current.position.z, bearing).abs()
                > ROTATION_THRESHOLD
            {
                let states =
                    rotation::rotate(&self.current, bearing, &self.constraints, &self.profile)?;
                for state in states {
                    self.append_state(state, trajectory);
                }
            }
        }

        let target_state = MotionState {
            position: target.position,
            velocity: target.velocity.unwrap_or_else(Vector3::zeros),
            acceleration: Vector3::zeros(),
        };
        let heading_target = geometry::bearing(&self.prev_knot, &target.position);
        let heading_step = self.constraints.max_velocity.z * self.profile.cycle_time();

        let mut cycles = 0;
        loop {
            let (mut next, reached) = self.profile.step(
                &self.current,
                &target_state,
                &self.constraints,
                AxisSelection::translation(),
            );
            if translating {
                let delta = geometry::angle_difference(self.current.position.z, heading_target)
                    .clamp(-heading_step, heading_step);
                next.position.z = geometry::displace_angle(self.current.position.z, delta);
                next.velocity.z = delta / self.profile.cycle_time();
                next.acceleration.z = 0.0;
            }
            self.append_state(next, trajectory);
            if reached {
                return Ok(());
            }
            cycles += 1;
            if cycles > MAX_SEGMENT_CYCLES {
                return Err(TrajectoryError::ProfileDivergence { cycles });
            }
        }
    }

    /// Splice the curve samples into the trajectory, skipping the first one
    /// which duplicates the current state
    fn splice_curve(&mut self, curve: &BezierCurve, trajectory: &mut Trajectory) {
        for point in curve.points.iter().skip(1) {
            self.append_state(
                MotionState {
                    position: point.position,
                    velocity: point.velocity,
                    acceleration: point.acceleration,
                },
                trajectory,
            );
        }
    }

    fn append_state(&mut self, state: MotionState, trajectory: &mut Trajectory) {
        self.time_from_start += self.profile.cycle_time();
        trajectory.points.push(TrajectoryPoint {
            position: state.position,
            velocity: state.velocity,
            acceleration: state.acceleration,
            time_from_start: self.time_from_start,
        });
        self.current = state;
    }
}
