use anyhow::{Error, Result};
use nalgebra::Vector3;
use std::collections::HashMap;
use std::f64::consts::PI;
use talos_core::trajectory::path::{Path, Waypoint};
use talos_core::{GenerationMode, TrajectoryRequest, TrajectoryStack};

fn main() -> Result<(), Error> {
    println!("Initializing Talos trajectory stack...");

    let mut stack = TrajectoryStack::new();

    // Configure the mobile-base limits
    let mut params = HashMap::new();
    params.insert("max_velocity_x".to_string(), 0.33);
    params.insert("max_velocity_y".to_string(), 0.33);
    params.insert("max_velocity_heading".to_string(), PI / 4.0);
    stack.configure(&params).map_err(anyhow::Error::msg)?;

    let path = Path::new(vec![
        Waypoint::new(0.0, 0.0, 0.0),
        Waypoint::new(0.5, 2.0, PI / 4.0),
        Waypoint::new(2.0, 0.0, -PI / 4.0),
    ]);

    for mode in [
        GenerationMode::StraightSegments,
        GenerationMode::FullBezier,
        GenerationMode::PartialBezier,
    ] {
        let response = stack.handle_request(TrajectoryRequest {
            path: path.clone(),
            mode,
            cycle_time: 0.1,
            segment_count_hint: None,
        });

        if response.success() {
            println!(
                "{:?}: {} points, {} knot points, {:.1} s",
                mode,
                response.trajectory.points.len(),
                response.trajectory.knot_indices.len(),
                response.trajectory.duration()
            );
        } else {
            println!("{:?}: generation failed: {:?}", mode, response.error);
        }
    }

    // Forward projection of a moving obstacle
    let obstacle = Path::new(vec![Waypoint::with_motion(
        Vector3::new(1.0, 1.0, 0.0),
        Vector3::new(0.2, 0.0, 0.1),
        Vector3::zeros(),
    )]);
    let response = stack.handle_request(TrajectoryRequest {
        path: obstacle,
        mode: GenerationMode::Prediction,
        cycle_time: 0.1,
        segment_count_hint: None,
    });
    println!(
        "Prediction: {} points over {:.1} s",
        response.trajectory.points.len(),
        response.trajectory.duration()
    );

    Ok(())
}
