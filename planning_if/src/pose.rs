//! # Pose
//!
//! Provides the [`Pose`] struct used by both trajectory points and planning
//! factor control points.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A pose (position and attitude) in the map frame.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Pose {
    /// Position in the map frame.
    ///
    /// Units: meters
    pub position_m: Vector3<f64>,

    /// Attitude in the map frame.
    pub attitude_q: UnitQuaternion<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    /// Create a new pose from a position and a heading (rotation about the
    /// map frame Z axis).
    ///
    /// Units: meters, radians
    pub fn from_position_and_heading(position_m: Vector3<f64>, heading_rad: f64) -> Self {
        Self {
            position_m,
            attitude_q: UnitQuaternion::from_euler_angles(0.0, 0.0, heading_rad),
        }
    }

    /// Return the heading of this pose, the rotation about the map frame Z
    /// axis.
    ///
    /// Units: radians
    pub fn get_heading(&self) -> f64 {
        self.attitude_q.euler_angles().2
    }

    /// Return the unit vector pointing "forward" along this pose's X axis,
    /// expressed in the map frame.
    pub fn forward(&self) -> Vector3<f64> {
        self.attitude_q.transform_vector(&Vector3::x())
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position_m: Vector3::zeros(),
            attitude_q: UnitQuaternion::identity(),
        }
    }
}
