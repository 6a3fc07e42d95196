//! # Object Classifications
//!
//! Detected objects carry a classification label which the planner uses to
//! select per-class parameter overrides. The codes here match the perception
//! wire format and must not be renumbered.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The classification of a detected object.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct ObjectClassification {
    /// The class label code, one of the label constants on
    /// [`ObjectClassification`].
    pub label: u8,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ObjectClassification {
    /// The object could not be classified.
    pub const UNKNOWN: u8 = 0;

    /// A passenger car.
    pub const CAR: u8 = 1;

    /// A truck.
    pub const TRUCK: u8 = 2;

    /// A bus.
    pub const BUS: u8 = 3;

    /// A trailer.
    pub const TRAILER: u8 = 4;

    /// A motorcycle.
    pub const MOTORCYCLE: u8 = 5;

    /// A bicycle.
    pub const BICYCLE: u8 = 6;

    /// A pedestrian.
    pub const PEDESTRIAN: u8 = 7;

    /// Create a new classification from a raw label code.
    pub fn new(label: u8) -> Self {
        Self { label }
    }
}
