//! Geometric paths consumed by the trajectory generators

use crate::common::geometry;
use nalgebra::Vector3;

/// Distance below which consecutive waypoints are treated as duplicates
pub const DUPLICATE_DISTANCE: f64 = 0.01;

/// Distance below which a two-point path already sits on its goal
pub const GOAL_DISTANCE: f64 = 0.1;

/// One knot point of a geometric path
///
/// The position vector is (x, y, heading). Velocity and acceleration are
/// optional boundary conditions; transition-mode requests need them on the
/// first waypoint to stay continuous with the in-motion state.
#[derive(Debug, Clone)]
pub struct Waypoint {
    pub position: Vector3<f64>,
    pub velocity: Option<Vector3<f64>>,
    pub acceleration: Option<Vector3<f64>>,
}

impl Waypoint {
    /// A waypoint with only a position
    pub fn new(x: f64, y: f64, heading: f64) -> Self {
        Waypoint {
            position: Vector3::new(x, y, heading),
            velocity: None,
            acceleration: None,
        }
    }

    /// A waypoint carrying full boundary motion state
    pub fn with_motion(
        position: Vector3<f64>,
        velocity: Vector3<f64>,
        acceleration: Vector3<f64>,
    ) -> Self {
        Waypoint {
            position,
            velocity: Some(velocity),
            acceleration: Some(acceleration),
        }
    }
}

/// An ordered sequence of waypoints in traversal order
#[derive(Debug, Clone)]
pub struct Path {
    pub points: Vec<Waypoint>,
}

impl Path {
    pub fn new(points: Vec<Waypoint>) -> Self {
        Path { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Merge consecutive waypoints that are nearly coincident
    ///
    /// Running the merge on an already-merged path is a no-op. Returns the
    /// number of waypoints removed.
    pub fn merge_duplicates(&mut self) -> usize {
        let mut removed = 0;
        let mut i = 0;
        while i + 1 < self.points.len() {
            let distance = geometry::position_distance(
                &self.points[i].position,
                &self.points[i + 1].position,
            );
            if distance < DUPLICATE_DISTANCE {
                println!(
                    "Merging duplicate waypoint at index {} (distance {:.4})",
                    i + 1,
                    distance
                );
                self.points.remove(i + 1);
                removed += 1;
            } else {
                i += 1;
            }
        }
        removed
    }

    /// Whether a two-point path starts within the goal distance of its end
    pub fn start_meets_goal(&self) -> bool {
        self.points.len() == 2
            && geometry::position_distance(&self.points[0].position, &self.points[1].position)
                < GOAL_DISTANCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_removes_near_coincident_waypoints() {
        let mut path = Path::new(vec![
            Waypoint::new(0.0, 0.0, 0.0),
            Waypoint::new(0.005, 0.0, 0.0),
            Waypoint::new(1.0, 0.0, 0.0),
        ]);
        assert_eq!(path.merge_duplicates(), 1);
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut path = Path::new(vec![
            Waypoint::new(0.0, 0.0, 0.0),
            Waypoint::new(0.005, 0.0, 0.0),
            Waypoint::new(0.008, 0.0, 0.0),
            Waypoint::new(1.0, 0.0, 0.0),
        ]);
        path.merge_duplicates();
        let positions: Vec<_> = path.points.iter().map(|p| p.position).collect();
        assert_eq!(path.merge_duplicates(), 0);
        let unchanged: Vec<_> = path.points.iter().map(|p| p.position).collect();
        assert_eq!(positions, unchanged);
    }

    #[test]
    fn goal_check_uses_the_looser_threshold() {
        let near = Path::new(vec![
            Waypoint::new(0.0, 0.0, 0.0),
            Waypoint::new(0.0, 0.09, 0.0),
        ]);
        assert!(near.start_meets_goal());

        let far = Path::new(vec![
            Waypoint::new(0.0, 0.0, 0.0),
            Waypoint::new(0.0, 0.11, 0.0),
        ]);
        assert!(!far.start_meets_goal());
    }

    #[test]
    fn goal_check_only_applies_to_two_point_paths() {
        let path = Path::new(vec![
            Waypoint::new(0.0, 0.0, 0.0),
            Waypoint::new(0.05, 0.0, 0.0),
            Waypoint::new(1.0, 0.0, 0.0),
        ]);
        assert!(!path.start_meets_goal());
    }
}
