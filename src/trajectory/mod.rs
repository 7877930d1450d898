//! Trajectory generation module for the Talos robot

pub mod bezier;
pub mod generator;
pub mod path;
pub mod profile;
pub mod rotation;

use self::generator::{GenerationResult, MobileBaseGenerator, PredictionGenerator, TrajectoryGenerator};
use self::path::{Path, Waypoint};
use self::profile::{MotionConstraints, DEFAULT_CYCLE_TIME};
use nalgebra::Vector3;
use std::collections::HashMap;
use thiserror::Error;

/// How the generator turns a path into a trajectory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    /// Straight profile-driven segments between every pair of waypoints
    StraightSegments,
    /// Every interior corner is replaced by a blended curve
    FullBezier,
    /// Only the first corner is replaced by a blended curve
    PartialBezier,
    /// Blend the first corner starting from an already-moving state
    Transition,
    /// Constant-velocity forward projection of the first waypoint's state
    Prediction,
}

/// A single sampled state of a generated trajectory
#[derive(Debug, Clone, Copy)]
pub struct TrajectoryPoint {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub acceleration: Vector3<f64>,
    /// Cumulative time since the first sample, in seconds
    pub time_from_start: f64,
}

/// The time-parameterized result of one generation request
#[derive(Debug, Clone)]
pub struct Trajectory {
    pub points: Vec<TrajectoryPoint>,
    /// Sampling period of the points, in seconds
    pub resolution_rate: f64,
    /// Indices into `points` where each traversed waypoint was reached
    pub knot_indices: Vec<usize>,
}

impl Trajectory {
    /// Create an empty trajectory sampled at the given period
    pub fn new(resolution_rate: f64) -> Self {
        Trajectory {
            points: Vec::new(),
            resolution_rate,
            knot_indices: Vec::new(),
        }
    }

    /// Total duration from the first to the last sample
    pub fn duration(&self) -> f64 {
        self.points.last().map_or(0.0, |point| point.time_from_start)
    }
}

/// Errors surfaced by trajectory generation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrajectoryError {
    /// The request carried a path with no points at all
    #[error("path has no points; at least one is required")]
    EmptyPath,
    /// The blend parameter search exhausted its retries on one corner
    #[error("no non-degenerate blend parameter found for corner {corner}")]
    DegenerateBlend { corner: usize },
    /// A motion profile failed to converge within its cycle budget
    #[error("motion profile did not converge within {cycles} cycles")]
    ProfileDivergence { cycles: usize },
}

/// A request to generate one trajectory from a path
#[derive(Debug, Clone)]
pub struct TrajectoryRequest {
    pub path: Path,
    pub mode: GenerationMode,
    /// Control-loop period used for sampling, in seconds
    pub cycle_time: f64,
    /// Optional segment count; a hint of one or less forces straight segments
    pub segment_count_hint: Option<usize>,
}

/// The response to one generation request
#[derive(Debug, Clone)]
pub struct TrajectoryResponse {
    pub trajectory: Trajectory,
    /// The path after duplicate merging and corner replacement
    pub path: Path,
    pub error: Option<TrajectoryError>,
}

impl TrajectoryResponse {
    /// Whether generation completed without error
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

/// Trajectory generation stack for the robot
///
/// Owns the configured motion limits and dispatches each request to a freshly
/// constructed generator instance, so concurrent requests never share mutable
/// generator state.
#[derive(Debug)]
pub struct TrajectoryStack {
    constraints: MotionConstraints,
}

impl TrajectoryStack {
    /// Create a new stack with the default mobile-base limits
    pub fn new() -> Self {
        TrajectoryStack {
            constraints: MotionConstraints::default(),
        }
    }

    /// Create a new stack with specific motion limits
    pub fn with_constraints(constraints: MotionConstraints) -> Self {
        TrajectoryStack { constraints }
    }

    /// Configure the per-axis motion limits
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> Result<(), String> {
        self.constraints.configure(params)
    }

    /// Get the currently configured motion limits
    pub fn constraints(&self) -> &MotionConstraints {
        &self.constraints
    }

    /// Serve one trajectory request
    pub fn handle_request(&self, request: TrajectoryRequest) -> TrajectoryResponse {
        let TrajectoryRequest {
            mut path,
            mut mode,
            cycle_time,
            segment_count_hint,
        } = request;

        let cycle_time = if cycle_time > 0.0 {
            cycle_time
        } else {
            eprintln!(
                "Invalid cycle time {}, falling back to {}",
                cycle_time, DEFAULT_CYCLE_TIME
            );
            DEFAULT_CYCLE_TIME
        };

        if path.is_empty() {
            return TrajectoryResponse {
                trajectory: Trajectory::new(cycle_time),
                path,
                error: Some(TrajectoryError::EmptyPath),
            };
        }

        if mode != GenerationMode::Prediction {
            path.merge_duplicates();

            // A path already sitting on its goal produces a trivial trajectory
            if path.points.len() == 1 || path.start_meets_goal() {
                return TrajectoryResponse {
                    trajectory: Self::single_point_trajectory(&path.points[0], cycle_time),
                    path,
                    error: None,
                };
            }

            if path.points.len() < 3 || segment_count_hint.map_or(false, |segments| segments <= 1) {
                mode = GenerationMode::StraightSegments;
            }
        }

        let result = match mode {
            GenerationMode::Prediction => {
                PredictionGenerator::new(self.constraints.clone(), cycle_time)
                    .generate(path.clone(), mode)
            }
            _ => MobileBaseGenerator::new(self.constraints.clone(), cycle_time)
                .generate(path.clone(), mode),
        };

        match result {
            Ok(GenerationResult { trajectory, path }) => TrajectoryResponse {
                trajectory,
                path,
                error: None,
            },
            Err(error) => {
                eprintln!("Trajectory generation failed: {}", error);
                TrajectoryResponse {
                    trajectory: Trajectory::new(cycle_time),
                    path,
                    error: Some(error),
                }
            }
        }
    }

    fn single_point_trajectory(waypoint: &Waypoint, cycle_time: f64) -> Trajectory {
        let mut trajectory = Trajectory::new(cycle_time);
        trajectory.points.push(TrajectoryPoint {
            position: waypoint.position,
            velocity: waypoint.velocity.unwrap_or_else(Vector3::zeros),
            acceleration: waypoint.acceleration.unwrap_or_else(Vector3::zeros),
            time_from_start: 0.0,
        });
        trajectory.knot_indices.push(0);
        trajectory
    }
}

impl Default for TrajectoryStack {
    fn default() -> Self {
        TrajectoryStack::new()
    }
}
