//! Integration tests for the trajectory generation stack
//!
//! Each module exercises one contract of the engine: sampling cadence,
//! boundary fidelity, constraint satisfaction, knot-point bookkeeping, the
//! rotation-insertion threshold and the documented generation scenarios.

use approx::assert_relative_eq;
use nalgebra::Vector3;
use std::f64::consts::PI;
use talos_core::trajectory::path::{Path, Waypoint};
use talos_core::trajectory::profile::MotionConstraints;
use talos_core::trajectory::TrajectoryError;
use talos_core::{GenerationMode, TrajectoryRequest, TrajectoryResponse, TrajectoryStack};

const CYCLE_TIME: f64 = 0.1;

fn request(points: Vec<Waypoint>, mode: GenerationMode) -> TrajectoryResponse {
    let stack = TrajectoryStack::new();
    stack.handle_request(TrajectoryRequest {
        path: Path::new(points),
        mode,
        cycle_time: CYCLE_TIME,
        segment_count_hint: None,
    })
}

fn corner_path() -> Vec<Waypoint> {
    vec![
        Waypoint::new(0.0, 0.0, 0.0),
        Waypoint::new(0.5, 2.0, PI / 4.0),
        Waypoint::new(2.0, 0.0, -PI / 4.0),
    ]
}

fn assert_within_constraints(response: &TrajectoryResponse) {
    let constraints = MotionConstraints::default();
    for (index, point) in response.trajectory.points.iter().enumerate() {
        for axis in 0..3 {
            assert!(
                point.velocity[axis].abs() <= constraints.max_velocity[axis] + 1e-9,
                "velocity of axis {} exceeds its limit at point {}: {}",
                axis,
                index,
                point.velocity[axis]
            );
            assert!(
                point.acceleration[axis].abs() <= constraints.max_acceleration[axis] + 1e-9,
                "acceleration of axis {} exceeds its limit at point {}: {}",
                axis,
                index,
                point.acceleration[axis]
            );
        }
    }
}

fn assert_knots_monotonic(response: &TrajectoryResponse) {
    let knots = &response.trajectory.knot_indices;
    assert!(!knots.is_empty());
    assert_eq!(knots[0], 0);
    for pair in knots.windows(2) {
        assert!(pair[0] < pair[1], "knot indices not strictly increasing");
    }
    assert!(*knots.last().unwrap() < response.trajectory.points.len());
}

mod sampling {
    use super::*;

    #[test]
    fn time_advances_by_exactly_one_cycle() {
        let response = request(corner_path(), GenerationMode::StraightSegments);
        assert!(response.success());
        for pair in response.trajectory.points.windows(2) {
            assert_relative_eq!(
                pair[1].time_from_start - pair[0].time_from_start,
                CYCLE_TIME,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn time_is_strictly_monotonic_in_every_mode() {
        for mode in [
            GenerationMode::StraightSegments,
            GenerationMode::FullBezier,
            GenerationMode::PartialBezier,
        ] {
            let response = request(corner_path(), mode);
            assert!(response.success(), "mode {:?} failed", mode);
            for pair in response.trajectory.points.windows(2) {
                assert!(pair[1].time_from_start > pair[0].time_from_start);
            }
        }
    }
}

mod fidelity {
    use super::*;

    #[test]
    fn first_point_matches_the_path_start() {
        let response = request(corner_path(), GenerationMode::StraightSegments);
        let first = &response.trajectory.points[0];
        assert_relative_eq!(first.position.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(first.position.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(first.position.z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn straight_segments_reach_the_goal() {
        let response = request(corner_path(), GenerationMode::StraightSegments);
        let last = response.trajectory.points.last().unwrap();
        assert_relative_eq!(last.position.x, 2.0, epsilon = 1e-3);
        assert_relative_eq!(last.position.y, 0.0, epsilon = 1e-3);
    }
}

mod constraints {
    use super::*;

    #[test]
    fn straight_mode_respects_the_limits() {
        let response = request(corner_path(), GenerationMode::StraightSegments);
        assert!(response.success());
        assert_within_constraints(&response);
    }

    #[test]
    fn full_bezier_respects_the_limits() {
        let response = request(corner_path(), GenerationMode::FullBezier);
        assert!(response.success());
        assert_within_constraints(&response);
    }

    #[test]
    fn prediction_respects_the_limits() {
        let path = vec![Waypoint::with_motion(
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.5, 0.0, 0.1),
            Vector3::zeros(),
        )];
        let response = request(path, GenerationMode::Prediction);
        assert!(response.success());
        assert_within_constraints(&response);
    }
}

mod knot_points {
    use super::*;

    #[test]
    fn indices_are_strictly_increasing_from_zero() {
        for mode in [
            GenerationMode::StraightSegments,
            GenerationMode::FullBezier,
            GenerationMode::PartialBezier,
        ] {
            let response = request(corner_path(), mode);
            assert!(response.success(), "mode {:?} failed", mode);
            assert_knots_monotonic(&response);
        }
    }

    #[test]
    fn straight_mode_records_one_knot_per_waypoint() {
        let response = request(corner_path(), GenerationMode::StraightSegments);
        assert_eq!(response.trajectory.knot_indices.len(), 3);
    }

    #[test]
    fn full_bezier_blends_every_interior_corner() {
        let points = vec![
            Waypoint::new(0.0, 0.0, 0.0),
            Waypoint::new(1.0, 0.0, 0.0),
            Waypoint::new(1.0, 1.0, PI / 2.0),
            Waypoint::new(2.0, 1.0, 0.0),
        ];
        let response = request(points, GenerationMode::FullBezier);
        assert!(response.success());

        // Two blended corners, each swapped for its curve boundaries
        assert_eq!(response.path.points.len(), 6);
        assert_eq!(response.trajectory.knot_indices.len(), 4);
        assert_knots_monotonic(&response);
        assert_within_constraints(&response);

        let last = response.trajectory.points.last().unwrap();
        assert_relative_eq!(last.position.x, 2.0, epsilon = 1e-3);
        assert_relative_eq!(last.position.y, 1.0, epsilon = 1e-3);
    }
}

mod rotation_insertion {
    use super::*;

    fn response_for_bearing(bearing: f64) -> TrajectoryResponse {
        let points = vec![
            Waypoint::new(0.0, 0.0, 0.0),
            Waypoint::new(bearing.cos(), bearing.sin(), 0.0),
        ];
        request(points, GenerationMode::StraightSegments)
    }

    fn translation_speed(point: &talos_core::trajectory::TrajectoryPoint) -> f64 {
        (point.velocity.x * point.velocity.x + point.velocity.y * point.velocity.y).sqrt()
    }

    #[test]
    fn no_rotation_just_below_the_threshold() {
        let response = response_for_bearing(0.172);
        assert!(response.success());
        // The platform starts translating on the very first cycle
        assert!(translation_speed(&response.trajectory.points[1]) > 0.0);
    }

    #[test]
    fn rotation_just_above_the_threshold() {
        let response = response_for_bearing(0.174);
        assert!(response.success());
        // The first cycle belongs to the in-place rotation
        assert_relative_eq!(translation_speed(&response.trajectory.points[1]), 0.0);
        assert!(response.trajectory.points[1].position.z != 0.0);
    }
}

mod scenarios {
    use super::*;

    #[test]
    fn partial_bezier_blends_one_corner() {
        let response = request(corner_path(), GenerationMode::PartialBezier);
        assert!(response.success());

        // One blended corner: the returned path swaps the corner for the
        // curve entry and exit points
        assert_eq!(response.path.points.len(), 4);
        assert_eq!(response.trajectory.knot_indices.len(), 3);
        assert_knots_monotonic(&response);

        let first = &response.trajectory.points[0];
        assert_relative_eq!(first.position.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(first.position.y, 0.0, epsilon = 1e-6);

        assert_within_constraints(&response);
    }

    #[test]
    fn sub_goal_displacement_collapses_to_a_single_point() {
        let response = request(
            vec![Waypoint::new(0.0, 0.0, 0.0), Waypoint::new(0.0, 0.05, 0.0)],
            GenerationMode::StraightSegments,
        );
        assert!(response.success());
        assert_eq!(response.trajectory.points.len(), 1);
        assert_eq!(response.trajectory.knot_indices, vec![0]);
    }

    #[test]
    fn rotation_completes_before_translation_begins() {
        let response = request(
            vec![Waypoint::new(0.0, 0.0, 0.0), Waypoint::new(0.0, 1.0, PI / 2.0)],
            GenerationMode::StraightSegments,
        );
        assert!(response.success());

        let points = &response.trajectory.points;
        let first_moving = points
            .iter()
            .position(|p| (p.velocity.x.abs() + p.velocity.y.abs()) > 0.0)
            .expect("trajectory never translates");
        assert!(first_moving > 1, "no rotation segment was inserted");
        assert_relative_eq!(points[first_moving - 1].position.z, PI / 2.0, epsilon = 1e-9);
        for point in &points[..first_moving] {
            assert_relative_eq!(point.velocity.x, 0.0);
            assert_relative_eq!(point.velocity.y, 0.0);
        }
    }

    #[test]
    fn transition_keeps_the_moving_start_state() {
        let velocity = Vector3::new(0.15, 0.1, 0.0);
        let points = vec![
            Waypoint::with_motion(Vector3::new(0.0, 0.0, 0.5880), velocity, Vector3::zeros()),
            Waypoint::new(1.0, 1.0, 0.0),
            Waypoint::new(2.0, 0.5, 0.0),
        ];
        let response = request(points, GenerationMode::Transition);
        assert!(response.success());

        let first = &response.trajectory.points[0];
        assert_relative_eq!(first.velocity.x, 0.15);
        assert_relative_eq!(first.velocity.y, 0.1);

        // The corner is replaced by the curve exit only
        assert_eq!(response.path.points.len(), 3);
        assert_knots_monotonic(&response);
    }

    #[test]
    fn empty_path_is_reported_as_an_error() {
        let response = request(Vec::new(), GenerationMode::StraightSegments);
        assert!(!response.success());
        assert_eq!(response.error, Some(TrajectoryError::EmptyPath));
        assert!(response.trajectory.points.is_empty());
    }

    #[test]
    fn duplicate_waypoints_are_merged_not_rejected() {
        let response = request(
            vec![
                Waypoint::new(0.0, 0.0, 0.0),
                Waypoint::new(0.005, 0.0, 0.0),
                Waypoint::new(1.0, 0.0, 0.0),
                Waypoint::new(2.0, 0.0, 0.0),
            ],
            GenerationMode::StraightSegments,
        );
        assert!(response.success());
        // Three waypoints survive the merge and each one becomes a knot
        assert_eq!(response.trajectory.knot_indices.len(), 3);
    }
}
