//! In-place rotation sub-trajectories

use crate::trajectory::profile::{
    AxisSelection, MotionConstraints, MotionProfileGenerator, MotionState,
};
use crate::trajectory::TrajectoryError;
use nalgebra::Vector3;

/// Cycle budget for one rotation segment
const MAX_ROTATION_CYCLES: usize = 10_000;

/// Generate the in-place rotation from the current heading to the goal
///
/// Only the heading axis is driven; translation stays frozen and the platform
/// rotates from rest, so any residual translational state is dropped. The
/// returned states end exactly on the goal heading and are spliced into the
/// trajectory by the caller.
pub fn rotate(
    current: &MotionState,
    goal_heading: f64,
    constraints: &MotionConstraints,
    profile: &MotionProfileGenerator,
) -> Result<Vec<MotionState>, TrajectoryError> {
    let mut state = MotionState::at_rest(current.position);
    let target = MotionState::at_rest(Vector3::new(
        current.position.x,
        current.position.y,
        goal_heading,
    ));

    let mut states = Vec::new();
    let mut cycles = 0;
    loop {
        let (next, reached) = profile.step(&state, &target, constraints, AxisSelection::rotation());
        state = next;
        states.push(state);
        if reached {
            return Ok(states);
        }
        cycles += 1;
        if cycles > MAX_ROTATION_CYCLES {
            return Err(TrajectoryError::ProfileDivergence { cycles });
        }
    }
}
