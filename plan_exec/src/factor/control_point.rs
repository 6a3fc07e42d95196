//! Control point construction
//!
//! Control points anchor a planning factor to the trajectory it applies to.
//! The builders here measure the anchor's signed arc length along the path
//! from the ego pose, so recorded distances stay meaningful on curves.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use planning_if::{
    factor::ControlPoint,
    pose::Pose,
    traj::{signed_arc_length, PathPoint},
};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Build a control point for a pose on a path, measuring its distance along
/// the path from the ego pose.
///
/// The result is undefined if the path is empty or the pose does not lie
/// near the path, checking path topology is the caller's job.
pub fn control_point_on_path<P: PathPoint>(
    points: &[P],
    ego_pose: &Pose,
    pose: &Pose,
    velocity: f64,
    shift_length: f64,
) -> ControlPoint {
    ControlPoint {
        pose: *pose,
        velocity,
        shift_length,
        distance: signed_arc_length(points, &ego_pose.position_m, &pose.position_m),
    }
}

/// Build the pair of control points for a section of a path.
///
/// Both distances are measured from the same ego pose sample, so the pair is
/// always consistent with itself. `velocities` and `shift_lengths` are
/// (start, end) pairs. No ordering between the start and end distances is
/// assumed, a section may run in either arc length direction.
pub fn section_on_path<P: PathPoint>(
    points: &[P],
    ego_pose: &Pose,
    start_pose: &Pose,
    end_pose: &Pose,
    velocities: (f64, f64),
    shift_lengths: (f64, f64),
) -> (ControlPoint, ControlPoint) {
    (
        control_point_on_path(points, ego_pose, start_pose, velocities.0, shift_lengths.0),
        control_point_on_path(points, ego_pose, end_pose, velocities.1, shift_lengths.1),
    )
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::Vector3;
    use planning_if::traj::TrajectoryPoint;

    fn straight_path() -> Vec<TrajectoryPoint> {
        (0..30)
            .map(|i| TrajectoryPoint {
                pose: Pose::from_position_and_heading(Vector3::new(i as f64, 0.0, 0.0), 0.0),
                velocity_ms: 1.0,
            })
            .collect()
    }

    fn pose_at(x_m: f64) -> Pose {
        Pose::from_position_and_heading(Vector3::new(x_m, 0.0, 0.0), 0.0)
    }

    #[test]
    fn test_control_point_on_path() {
        let path = straight_path();

        let cp = control_point_on_path(&path, &pose_at(2.0), &pose_at(7.0), 0.0, 0.0);
        assert!((cp.distance - 5.0).abs() < 1e-9);

        // Poses behind the ego measure negative
        let cp = control_point_on_path(&path, &pose_at(7.0), &pose_at(2.0), 0.0, 0.0);
        assert!((cp.distance + 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_section_on_path() {
        let path = straight_path();

        let (start, end) = section_on_path(
            &path,
            &pose_at(2.0),
            &pose_at(4.0),
            &pose_at(9.0),
            (3.0, 0.0),
            (0.0, 0.0),
        );

        // Both ends measured from the same ego sample
        assert!((start.distance - 2.0).abs() < 1e-9);
        assert!((end.distance - 7.0).abs() < 1e-9);
        assert!((start.velocity - 3.0).abs() < 1e-9);

        // Sections may run backwards along the path
        let (start, end) = section_on_path(
            &path,
            &pose_at(2.0),
            &pose_at(9.0),
            &pose_at(4.0),
            (0.0, 0.0),
            (0.0, 0.0),
        );
        assert!(start.distance > end.distance);
    }
}
