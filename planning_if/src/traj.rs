//! # Trajectory Utilities
//!
//! Provides the [`TrajectoryPoint`] struct and the arc length functions used
//! to anchor planning factors to a trajectory. Arc lengths are always
//! measured along the path, not as straight line distances, so that factor
//! distances stay meaningful on curves.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::pose::Pose;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single point of a planned trajectory.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    /// The pose of the point in the map frame.
    pub pose: Pose,

    /// The planned longitudinal velocity at the point.
    ///
    /// Units: meters/second
    pub velocity_ms: f64,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// An element of an ordered path which has a position in the map frame.
///
/// The arc length functions only need positions, so they accept any point
/// type which can report one. This lets them walk full trajectories and bare
/// pose sequences alike.
pub trait PathPoint {
    /// The position of the point in the map frame.
    ///
    /// Units: meters
    fn position_m(&self) -> Vector3<f64>;
}

impl PathPoint for TrajectoryPoint {
    fn position_m(&self) -> Vector3<f64> {
        self.pose.position_m
    }
}

impl PathPoint for Pose {
    fn position_m(&self) -> Vector3<f64> {
        self.position_m
    }
}

impl PathPoint for Vector3<f64> {
    fn position_m(&self) -> Vector3<f64> {
        *self
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Returns the index of the path point closest to the given position, or
/// `None` if the path is empty.
pub fn nearest_index<P: PathPoint>(points: &[P], position_m: &Vector3<f64>) -> Option<usize> {
    let mut nearest: Option<(usize, f64)> = None;

    for (i, point) in points.iter().enumerate() {
        let dist_sq = (point.position_m() - position_m).norm_squared();

        match nearest {
            Some((_, nearest_sq)) if nearest_sq <= dist_sq => (),
            _ => nearest = Some((i, dist_sq)),
        }
    }

    nearest.map(|(i, _)| i)
}

/// Returns the signed arc length along the path between two positions.
///
/// Both positions are projected onto the path and the distance is measured
/// along the path between the projections. Positive values mean `to_m` lies
/// further along the path than `from_m`.
///
/// The result is only meaningful for positions near the path. An empty path
/// has no arc length at all, in which case `NaN` is returned.
pub fn signed_arc_length<P: PathPoint>(
    points: &[P],
    from_m: &Vector3<f64>,
    to_m: &Vector3<f64>,
) -> f64 {
    let (from_idx, to_idx) = match (nearest_index(points, from_m), nearest_index(points, to_m)) {
        (Some(from_idx), Some(to_idx)) => (from_idx, to_idx),
        _ => return f64::NAN,
    };

    // Arc length between the two nearest path points
    let mut length_m = 0.0;
    for i in from_idx.min(to_idx)..from_idx.max(to_idx) {
        length_m += (points[i + 1].position_m() - points[i].position_m()).norm();
    }
    if to_idx < from_idx {
        length_m = -length_m;
    }

    // Correct for where each position actually projects within its local
    // segment
    length_m - longitudinal_offset_m(points, from_idx, from_m)
        + longitudinal_offset_m(points, to_idx, to_m)
}

/// Returns the pose on the path at the given signed arc length from a
/// position.
///
/// The position is projected onto the path and the path is then walked by
/// `distance_m`, negative values walking backwards. Arc lengths beyond
/// either end of the path saturate to the end points rather than
/// extrapolating. Returns `None` if the path is empty.
pub fn pose_at_arc_length<P: PathPoint>(
    points: &[P],
    from_m: &Vector3<f64>,
    distance_m: f64,
) -> Option<Pose> {
    if points.is_empty() {
        return None;
    }
    if points.len() == 1 {
        return Some(Pose::from_position_and_heading(points[0].position_m(), 0.0));
    }

    let start_m = points[0].position_m();
    let target_s_m = signed_arc_length(points, &start_m, from_m) + distance_m;
    let mut remaining_m = target_s_m.max(0.0);

    for i in 0..points.len() - 1 {
        let a = points[i].position_m();
        let b = points[i + 1].position_m();
        let segment_m = (b - a).norm();

        if remaining_m <= segment_m || i == points.len() - 2 {
            let direction = b - a;
            let heading_rad = direction.y.atan2(direction.x);

            let ratio = if segment_m < f64::EPSILON {
                0.0
            } else {
                (remaining_m / segment_m).min(1.0)
            };

            return Some(Pose::from_position_and_heading(
                a + direction * ratio,
                heading_rad,
            ));
        }

        remaining_m -= segment_m;
    }

    None
}

/// Returns the longitudinal offset of a position from the path point at the
/// given index, measured along the local path direction.
fn longitudinal_offset_m<P: PathPoint>(
    points: &[P],
    index: usize,
    position_m: &Vector3<f64>,
) -> f64 {
    match local_direction(points, index) {
        Some(direction) => (position_m - points[index].position_m()).dot(&direction),
        None => 0.0,
    }
}

/// Returns the unit direction of the path at the given index, or `None` for
/// single point paths and zero length segments.
fn local_direction<P: PathPoint>(points: &[P], index: usize) -> Option<Vector3<f64>> {
    let segment = if index + 1 < points.len() {
        points[index + 1].position_m() - points[index].position_m()
    } else if index > 0 {
        points[index].position_m() - points[index - 1].position_m()
    } else {
        return None;
    };

    let norm = segment.norm();
    if norm < f64::EPSILON {
        None
    } else {
        Some(segment / norm)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
