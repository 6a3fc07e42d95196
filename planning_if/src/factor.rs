//! # Planning Factor Messages
//!
//! A planning factor is the record of a single planning decision - a stop, a
//! slow down, a shift - anchored to the point (or section) of the trajectory
//! it applies to. Modules accumulate factors while they plan a cycle and then
//! publish them as one [`PlanningFactorArray`] batch per cycle, so that
//! ground software can always answer "why did the planner do that?".
//!
//! These structs define the wire format of that batch. Batches are serialised
//! as JSON and published under the topic returned by [`factor_topic`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::pose::Pose;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The frame in which all control point poses are expressed.
pub const FRAME_ID: &str = "map";

/// Prefix applied to the topic of every planning factor publisher.
pub const FACTOR_TOPIC_PREFIX: &str = "factors/";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One batch of planning factors, published once per planning cycle.
///
/// A batch with an empty `factors` vector is still published, it is the
/// positive statement that the module planned a cycle and found no reason to
/// deviate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanningFactorArray {
    /// The frame all control point poses are expressed in, always
    /// [`FRAME_ID`].
    pub frame_id: String,

    /// The time at which the batch was assembled.
    pub stamp: DateTime<Utc>,

    /// The factors recorded this cycle, in the order they were recorded.
    pub factors: Vec<PlanningFactor>,
}

/// The record of a single planning decision.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanningFactor {
    /// The name of the module which recorded this factor, for example
    /// `"obstacle_stop"`.
    pub module: String,

    /// True if the vehicle was driving forwards when the factor was recorded.
    pub is_driving_forward: bool,

    /// The geometric anchors of the factor.
    ///
    /// Point decisions (a stop line) carry exactly one control point, section
    /// decisions (a slow down zone) carry exactly two. No other lengths are
    /// produced.
    pub control_points: Vec<ControlPoint>,

    /// The behaviour this factor describes, one of the behaviour codes on
    /// [`PlanningFactor`] (for example [`PlanningFactor::STOP`]).
    pub behavior: u16,

    /// Free text detail describing the factor.
    pub detail: String,

    /// The safety evidence which led to this factor.
    pub safety_factors: SafetyFactorArray,
}

/// A geometric and kinematic anchor of a planning factor.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ControlPoint {
    /// The pose of the control point in the map frame.
    pub pose: Pose,

    /// The target velocity at the control point.
    ///
    /// Units: meters/second
    pub velocity: f64,

    /// The lateral shift demanded at the control point.
    ///
    /// Units: meters
    pub shift_length: f64,

    /// The signed arc length from the ego position to the control point,
    /// negative values lying behind the ego position.
    ///
    /// Units: meters
    pub distance: f64,
}

/// Evidence for a single hazard which contributed to a planning factor.
///
/// The recorder attaches this data verbatim, it never interprets it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SafetyFactor {
    /// The kind of hazard, one of [`SafetyFactor::POINTCLOUD`] or
    /// [`SafetyFactor::OBJECT`].
    pub factor_type: u16,

    /// The identifier of the object the hazard relates to, empty for
    /// pointcloud hazards.
    pub object_id: String,

    /// True if this hazard was judged safe.
    pub is_safe: bool,

    /// The points in the map frame at which the hazard was observed.
    pub points: Vec<Vector3<f64>>,
}

/// The collection of safety evidence attached to a planning factor.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SafetyFactorArray {
    /// The individual pieces of evidence.
    pub factors: Vec<SafetyFactor>,

    /// True if the plan as a whole was judged safe.
    pub is_safe_plan: bool,

    /// Free text detail describing the evidence.
    pub detail: String,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PlanningFactor {
    /// Behaviour not known.
    pub const UNKNOWN: u16 = 0;

    /// No deviation from the nominal plan.
    pub const NONE: u16 = 1;

    /// Slow down over a section of the trajectory.
    pub const SLOW_DOWN: u16 = 2;

    /// Come to a stop at a point on the trajectory.
    pub const STOP: u16 = 3;

    /// Shift the path towards the left.
    pub const SHIFT_LEFT: u16 = 4;

    /// Shift the path towards the right.
    pub const SHIFT_RIGHT: u16 = 5;

    /// Turn towards the left.
    pub const TURN_LEFT: u16 = 6;

    /// Turn towards the right.
    pub const TURN_RIGHT: u16 = 7;
}

impl SafetyFactor {
    /// The hazard was detected in the pointcloud.
    pub const POINTCLOUD: u16 = 0;

    /// The hazard is a tracked object.
    pub const OBJECT: u16 = 1;
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Returns the topic a module's planning factor batches are published under.
pub fn factor_topic(module: &str) -> String {
    format!("{}{}", FACTOR_TOPIC_PREFIX, module)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_factor_topic() {
        assert_eq!(factor_topic("obstacle_stop"), "factors/obstacle_stop");
    }

    /// The batch JSON must keep the agreed key names, ground software parses
    /// them by name.
    #[test]
    fn test_batch_wire_keys() {
        let batch = PlanningFactorArray {
            frame_id: FRAME_ID.into(),
            stamp: Utc::now(),
            factors: vec![PlanningFactor {
                module: "obstacle_stop".into(),
                is_driving_forward: true,
                control_points: vec![ControlPoint {
                    pose: Pose::default(),
                    velocity: 0.0,
                    shift_length: 0.0,
                    distance: 12.5,
                }],
                behavior: PlanningFactor::STOP,
                detail: String::new(),
                safety_factors: SafetyFactorArray::default(),
            }],
        };

        let value: serde_json::Value = serde_json::from_str(
            &serde_json::to_string(&batch).unwrap()
        ).unwrap();

        assert_eq!(value["frame_id"], "map");
        assert!(value["stamp"].is_string());

        let factor = &value["factors"][0];
        assert_eq!(factor["module"], "obstacle_stop");
        assert_eq!(factor["behavior"], 3);
        assert_eq!(factor["control_points"][0]["distance"], 12.5);
        assert!(factor["safety_factors"]["factors"].is_array());
    }
}
