//! Trajectory generation algorithms

use crate::trajectory::path::Path;
use crate::trajectory::profile::MotionConstraints;
use crate::trajectory::{GenerationMode, Trajectory, TrajectoryError};
use std::fmt::Debug;

/// Output of one generation pass: the trajectory plus the possibly-mutated
/// path for caller bookkeeping
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub trajectory: Trajectory,
    pub path: Path,
}

/// Trait for trajectory generation algorithms
///
/// Implementations are constructed per request; all working state is
/// per-instance and discarded when the pass completes.
pub trait TrajectoryGenerator: Debug + Send + Sync {
    /// Create a new instance for one request
    fn new(constraints: MotionConstraints, cycle_time: f64) -> Self
    where
        Self: Sized;

    /// Turn a cleaned path into a trajectory
    fn generate(
        &mut self,
        path: Path,
        mode: GenerationMode,
    ) -> Result<GenerationResult, TrajectoryError>;

    /// Get the name of this generator
    fn name(&self) -> &str;
}

// Re-export specific implementations
pub mod mobile_base;
pub mod prediction;

pub use mobile_base::MobileBaseGenerator;
pub use prediction::PredictionGenerator;

// Default implementation
pub use mobile_base::MobileBaseGenerator as DefaultGenerator;
