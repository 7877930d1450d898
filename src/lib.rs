//! Core motion planning functionality for the Talos mobile robot
//!
//! The heart of the crate is the trajectory generation engine: it turns a
//! geometric path of (x, y, heading) waypoints into a time-parameterized,
//! dynamically feasible trajectory sampled at a fixed control cycle. Sharp
//! corners are smoothed with blended curves and large heading changes are
//! handled with in-place rotations, all within per-axis velocity,
//! acceleration and jerk limits.

pub mod common;
pub mod trajectory;

pub use crate::trajectory::{
    GenerationMode, TrajectoryRequest, TrajectoryResponse, TrajectoryStack,
};
