//! Implementations for the StopCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;

// Internal
use super::{Params, StopCtrlError, MODULE_NAME};
use crate::factor::{FactorRecorder, FactorSink};
use planning_if::{
    factor::{PlanningFactor, SafetyFactor, SafetyFactorArray},
    obj::ObjectClassification,
    pose::Pose,
    traj::{pose_at_arc_length, signed_arc_length, TrajectoryPoint},
};
use util::{maths, module::State, params::ParamSource, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Obstacle stop control module state
#[derive(Default)]
pub struct StopCtrl {
    pub(crate) params: Params,

    pub(crate) recorder: FactorRecorder,

    pub(crate) report: StatusReport,

    /// True while the nearest obstacle is treated as a fixed stop target
    fixed_stop: bool,

    /// Stop pose held in place while the ego vehicle is nearly stationary
    held_stop_pose: Option<Pose>,
}

/// Input data to obstacle stop control.
#[derive(Default)]
pub struct InputData {
    /// The trajectory planned for this cycle, in path order
    pub trajectory: Vec<TrajectoryPoint>,

    /// Current pose of the ego vehicle
    pub ego_pose: Pose,

    /// Current longitudinal velocity of the ego vehicle.
    ///
    /// Units: meters/second
    pub ego_velocity_ms: f64,

    /// Velocity the planner would hold if there were no obstacles.
    ///
    /// Units: meters/second
    pub cruise_velocity_ms: f64,

    /// Obstacles reported by perception this cycle
    pub obstacles: Vec<ObstacleInput>,
}

/// One obstacle as seen by stop control.
#[derive(Clone, Debug)]
pub struct ObstacleInput {
    /// Pose of the obstacle in the map frame
    pub pose: Pose,

    /// Longitudinal velocity of the obstacle.
    ///
    /// Units: meters/second
    pub velocity_ms: f64,

    /// Classification of the obstacle
    pub classification: ObjectClassification,

    /// Perception's identifier for the obstacle
    pub object_id: String,
}

/// Output demands from StopCtrl for this cycle.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct OutputData {
    /// Velocity demand for this cycle.
    ///
    /// Units: meters/second
    pub velocity_dem_ms: f64,

    /// The pose the vehicle must stop at, if a stop is planned
    pub stop_pose: Option<Pose>,
}

/// Status report for StopCtrl processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// True if a stop is planned this cycle
    pub stop_planned: bool,

    /// Arc length from the ego position to the planned stop pose.
    ///
    /// Units: meters
    pub stop_dist_m: Option<f64>,

    /// True if a stop was abandoned for a sudden object
    pub stop_abandoned: bool,

    /// Number of planning factors recorded this cycle
    pub num_factors: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for StopCtrl {
    const NAME: &'static str = MODULE_NAME;

    type InitData = &'static str;
    type InitError = StopCtrlError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = StopCtrlError;

    /// Initialise the StopCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, session: &Session) -> Result<(), Self::InitError> {
        // Load the parameter file and resolve the full set from it
        let source = ParamSource::from_file(init_data).map_err(StopCtrlError::ParamLoadError)?;

        self.params = Params::resolve(&source).map_err(StopCtrlError::ParamResolveError)?;

        // Build the factor recorder. The factor section is optional, a
        // missing key just disables console output.
        self.recorder = FactorRecorder::new(
            Self::NAME,
            source
                .get_bool_or("factor.enable_console_output", false)
                .map_err(StopCtrlError::ParamResolveError)?,
            source
                .get_integer_or("factor.throttle_duration_ms", 1000)
                .map_err(StopCtrlError::ParamResolveError)?,
        );

        // Snapshot the resolved set so the session records what the module
        // actually ran with, clamping included
        session.save("stop_ctrl/resolved_params.json", self.params.clone());

        Ok(())
    }

    /// Perform cyclic processing of obstacle stop control.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        // Clear the status report
        self.report = StatusReport::default();

        // Find the nearest stop-worthy obstacle ahead of the ego position
        let (obstacle, raw_dist_m) = match self.nearest_obstacle_ahead(input_data) {
            Some(found) => found,
            None => {
                self.fixed_stop = false;
                self.held_stop_pose = None;
                self.report.num_factors = self.recorder.len();
                return Ok((self.cruise_output(input_data), self.report));
            }
        };

        // Enter/exit hysteresis on the obstacle speed, so a creeping
        // obstacle does not flicker between a fixed stop and following
        let threshold_ms = if self.fixed_stop {
            self.params
                .stop_planning
                .obstacle_velocity_threshold_exit_fixed_stop
        } else {
            self.params
                .stop_planning
                .obstacle_velocity_threshold_enter_fixed_stop
        };
        self.fixed_stop = obstacle.velocity_ms.abs() < threshold_ms;

        if !self.fixed_stop {
            // A moving obstacle is not stopped for, following it is the
            // cruise module's job
            self.held_stop_pose = None;
            self.report.num_factors = self.recorder.len();
            return Ok((self.cruise_output(input_data), self.report));
        }

        // Per-class overrides, absent for classes configured as "default"
        let overrides = match self
            .params
            .stop_planning
            .get_param_type(obstacle.classification)
        {
            Ok("default") => None,
            Ok(_) => Some(
                self.params
                    .stop_planning
                    .get_param(obstacle.classification)
                    .map_err(StopCtrlError::ObjectParamError)?,
            ),
            Err(e) => return Err(StopCtrlError::ObjectParamError(e)),
        };

        // The full stop margin is kept where there is room, shrinking no
        // further than the minimum behaviour margin once the obstacle is
        // close
        let margin_m = maths::clamp(
            &raw_dist_m,
            &self.params.stop_planning.min_behavior_stop_margin,
            &self.params.stop_planning.stop_margin,
        );
        let mut stop_dist_m = (raw_dist_m - margin_m).max(0.0);

        // A sudden object demands more deceleration than the class
        // threshold while appearing inside the distance threshold
        let required_ms2 = required_deceleration(input_data.ego_velocity_ms, stop_dist_m);
        let abandon = overrides.map_or(false, |o| {
            o.abandon_to_stop
                && required_ms2 < o.sudden_object_acc_threshold
                && raw_dist_m < o.sudden_object_dist_threshold
        });

        if abandon {
            let output = self.abandon_stop(input_data, obstacle, stop_dist_m, overrides);
            self.report.num_factors = self.recorder.len();
            return Ok((output, self.report));
        }

        // Anchor the stop on the trajectory, holding the previous anchor in
        // place once the ego vehicle is nearly stationary so the commanded
        // stop does not creep with perception noise
        let mut stop_pose = pose_at_arc_length(
            &input_data.trajectory,
            &input_data.ego_pose.position_m,
            stop_dist_m,
        )
        .unwrap_or(obstacle.pose);

        if let Some(held) = self.held_stop_pose {
            if input_data.ego_velocity_ms.abs()
                < self.params.stop_planning.hold_stop_velocity_threshold
                && (stop_pose.position_m - held.position_m).norm()
                    < self.params.stop_planning.hold_stop_distance_threshold
            {
                stop_pose = held;
                stop_dist_m = signed_arc_length(
                    &input_data.trajectory,
                    &input_data.ego_pose.position_m,
                    &held.position_m,
                )
                .max(0.0);
            }
        }
        self.held_stop_pose = Some(stop_pose);

        // Ramp the velocity demand down linearly over the comfortable
        // braking distance
        let brake_dist_m = braking_distance(
            input_data.cruise_velocity_ms,
            self.params.common.min_accel,
        );
        let velocity_dem_ms = maths::clamp(
            &maths::lin_map(
                (0.0, brake_dist_m),
                (0.0, input_data.cruise_velocity_ms),
                stop_dist_m,
            ),
            &0.0,
            &input_data.cruise_velocity_ms,
        );

        // Record the stop as a planning factor
        self.recorder.add_on_path(
            &input_data.trajectory,
            &input_data.ego_pose,
            &stop_pose,
            PlanningFactor::STOP,
            object_safety_factors(obstacle),
            true,
            0.0,
            0.0,
            &format!("stop for {}", obstacle.object_id),
        );

        self.report.stop_planned = true;
        self.report.stop_dist_m = Some(stop_dist_m);
        self.report.num_factors = self.recorder.len();

        let output = OutputData {
            velocity_dem_ms,
            stop_pose: Some(stop_pose),
        };

        trace!("StopCtrl output: {:?}", output);

        Ok((output, self.report))
    }
}

impl StopCtrl {
    /// Publish this cycle's planning factors through the sink.
    ///
    /// Must be called exactly once per cycle, after `proc`. The recorder is
    /// left empty whatever the delivery outcome.
    pub fn publish_factors<S: FactorSink>(&mut self, sink: &mut S) -> Result<(), S::Error> {
        self.recorder.publish(sink)
    }

    /// Find the stop-worthy obstacle nearest ahead of the ego position.
    ///
    /// Obstacles behind the ego position, obstacles of classes not flagged
    /// for stopping, and everything on an empty trajectory are ignored.
    fn nearest_obstacle_ahead<'a>(
        &self,
        input_data: &'a InputData,
    ) -> Option<(&'a ObstacleInput, f64)> {
        let mut nearest: Option<(&ObstacleInput, f64)> = None;

        for obstacle in &input_data.obstacles {
            if !self
                .params
                .obstacle_filtering
                .inside_stop_object_types
                .contains(&obstacle.classification.label)
            {
                continue;
            }

            let dist_m = signed_arc_length(
                &input_data.trajectory,
                &input_data.ego_pose.position_m,
                &obstacle.pose.position_m,
            );

            // NaN from an empty trajectory fails this comparison too
            if !(dist_m > 0.0) {
                continue;
            }

            match nearest {
                Some((_, nearest_dist_m)) if nearest_dist_m <= dist_m => (),
                _ => nearest = Some((obstacle, dist_m)),
            }
        }

        nearest
    }

    /// Abandon the stop for a sudden object, slowing at the class limit
    /// instead of braking beyond it.
    fn abandon_stop(
        &mut self,
        input_data: &InputData,
        obstacle: &ObstacleInput,
        stop_dist_m: f64,
        overrides: Option<super::ObjectTypeSpecificParams>,
    ) -> OutputData {
        self.held_stop_pose = None;
        self.report.stop_abandoned = true;

        // Residual speed after braking at the class limit over the stop
        // distance
        let limit_ms2 =
            overrides.map_or(self.params.common.limit_min_accel, |o| o.limit_min_acc);
        let slow_velocity_ms = (input_data.ego_velocity_ms.powi(2)
            + 2.0 * limit_ms2 * stop_dist_m)
            .max(0.0)
            .sqrt();

        let end_pose = pose_at_arc_length(
            &input_data.trajectory,
            &input_data.ego_pose.position_m,
            stop_dist_m,
        )
        .unwrap_or(obstacle.pose);

        self.recorder.add_section_on_path(
            &input_data.trajectory,
            &input_data.ego_pose,
            &input_data.ego_pose,
            &end_pose,
            PlanningFactor::SLOW_DOWN,
            object_safety_factors(obstacle),
            true,
            (slow_velocity_ms, slow_velocity_ms),
            (0.0, 0.0),
            &format!("abandon stop for sudden object {}", obstacle.object_id),
        );

        OutputData {
            velocity_dem_ms: slow_velocity_ms,
            stop_pose: None,
        }
    }

    /// Output demanding the cruise velocity with no stop planned.
    fn cruise_output(&self, input_data: &InputData) -> OutputData {
        OutputData {
            velocity_dem_ms: input_data.cruise_velocity_ms,
            stop_pose: None,
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Constant acceleration needed to stop within the given distance.
///
/// Always non-positive. Stopping in zero distance from a non-zero velocity
/// needs infinite deceleration.
fn required_deceleration(velocity_ms: f64, dist_m: f64) -> f64 {
    if velocity_ms.abs() < f64::EPSILON {
        0.0
    } else if dist_m <= 0.0 {
        f64::NEG_INFINITY
    } else {
        -velocity_ms.powi(2) / (2.0 * dist_m)
    }
}

/// Distance covered braking from the given velocity at the given negative
/// acceleration.
fn braking_distance(velocity_ms: f64, accel_ms2: f64) -> f64 {
    if accel_ms2 >= 0.0 {
        return f64::INFINITY;
    }

    velocity_ms.powi(2) / (2.0 * -accel_ms2)
}

/// Safety evidence naming the obstacle a factor was recorded for.
fn object_safety_factors(obstacle: &ObstacleInput) -> SafetyFactorArray {
    SafetyFactorArray {
        factors: vec![SafetyFactor {
            factor_type: SafetyFactor::OBJECT,
            object_id: obstacle.object_id.clone(),
            is_safe: false,
            points: vec![obstacle.pose.position_m],
        }],
        is_safe_plan: false,
        detail: String::new(),
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::super::{CommonParam, ObjectTypeSpecificParams, ObstacleFilteringParam, StopPlanningParam};
    use super::*;
    use nalgebra::Vector3;
    use planning_if::factor::PlanningFactorArray;

    struct MemorySink {
        batches: Vec<PlanningFactorArray>,
    }

    impl FactorSink for MemorySink {
        type Error = ();

        fn send(&mut self, batch: &PlanningFactorArray) -> Result<(), ()> {
            self.batches.push(batch.clone());
            Ok(())
        }
    }

    fn test_params() -> Params {
        Params {
            common: CommonParam {
                min_accel: -1.0,
                limit_min_accel: -3.0,
                ..Default::default()
            },
            obstacle_filtering: ObstacleFilteringParam {
                inside_stop_object_types: vec![
                    ObjectClassification::CAR,
                    ObjectClassification::PEDESTRIAN,
                ],
                ..Default::default()
            },
            stop_planning: StopPlanningParam {
                stop_margin: 5.0,
                min_behavior_stop_margin: 2.0,
                obstacle_velocity_threshold_enter_fixed_stop: 0.2,
                obstacle_velocity_threshold_exit_fixed_stop: 0.5,
                hold_stop_velocity_threshold: 0.01,
                hold_stop_distance_threshold: 0.3,
                ..Default::default()
            },
        }
    }

    fn test_stop_ctrl() -> StopCtrl {
        StopCtrl {
            params: test_params(),
            recorder: FactorRecorder::new(MODULE_NAME, false, 0),
            ..Default::default()
        }
    }

    fn pose_at(x_m: f64) -> Pose {
        Pose::from_position_and_heading(Vector3::new(x_m, 0.0, 0.0), 0.0)
    }

    fn straight_input(ego_x_m: f64, obstacles: Vec<ObstacleInput>) -> InputData {
        InputData {
            trajectory: (0..=60)
                .map(|i| TrajectoryPoint {
                    pose: pose_at(i as f64),
                    velocity_ms: 8.0,
                })
                .collect(),
            ego_pose: pose_at(ego_x_m),
            ego_velocity_ms: 8.0,
            cruise_velocity_ms: 8.0,
            obstacles,
        }
    }

    fn car(x_m: f64, velocity_ms: f64) -> ObstacleInput {
        ObstacleInput {
            pose: pose_at(x_m),
            velocity_ms,
            classification: ObjectClassification::new(ObjectClassification::CAR),
            object_id: "car-1".into(),
        }
    }

    #[test]
    fn test_cruise_without_obstacles() {
        let mut stop_ctrl = test_stop_ctrl();
        let input = straight_input(0.0, vec![]);

        let (output, report) = stop_ctrl.proc(&input).unwrap();

        assert!((output.velocity_dem_ms - 8.0).abs() < 1e-9);
        assert!(output.stop_pose.is_none());
        assert!(!report.stop_planned);
        assert_eq!(report.num_factors, 0);
        assert!(stop_ctrl.recorder.is_empty());
    }

    #[test]
    fn test_stop_for_parked_car() {
        let mut stop_ctrl = test_stop_ctrl();
        let input = straight_input(0.0, vec![car(25.0, 0.0)]);

        let (output, report) = stop_ctrl.proc(&input).unwrap();

        // Stop margin 5m behind the car at 25m gives a stop 20m out, inside
        // the 32m comfortable braking distance so the demand ramps down
        assert!(report.stop_planned);
        assert!((report.stop_dist_m.unwrap() - 20.0).abs() < 1e-6);
        assert!((output.stop_pose.unwrap().position_m.x - 20.0).abs() < 1e-6);
        assert!((output.velocity_dem_ms - 5.0).abs() < 1e-6);
        assert_eq!(report.num_factors, 1);

        // The recorded factor anchors the stop on the trajectory
        let mut sink = MemorySink { batches: vec![] };
        stop_ctrl.publish_factors(&mut sink).unwrap();
        let factor = &sink.batches[0].factors[0];
        assert_eq!(factor.module, MODULE_NAME);
        assert_eq!(factor.behavior, PlanningFactor::STOP);
        assert_eq!(factor.control_points.len(), 1);
        assert!((factor.control_points[0].distance - 20.0).abs() < 1e-6);
        assert_eq!(factor.safety_factors.factors[0].object_id, "car-1");
    }

    #[test]
    fn test_moving_obstacle_is_not_stopped_for() {
        let mut stop_ctrl = test_stop_ctrl();
        let input = straight_input(0.0, vec![car(25.0, 1.0)]);

        let (output, report) = stop_ctrl.proc(&input).unwrap();

        assert!(!report.stop_planned);
        assert!((output.velocity_dem_ms - 8.0).abs() < 1e-9);
        assert_eq!(report.num_factors, 0);
    }

    #[test]
    fn test_unlisted_class_is_ignored() {
        let mut stop_ctrl = test_stop_ctrl();
        let mut obstacle = car(25.0, 0.0);
        obstacle.classification = ObjectClassification::new(ObjectClassification::UNKNOWN);
        let input = straight_input(0.0, vec![obstacle]);

        let (_, report) = stop_ctrl.proc(&input).unwrap();

        assert!(!report.stop_planned);
        assert_eq!(report.num_factors, 0);
    }

    #[test]
    fn test_fixed_stop_hysteresis() {
        let mut stop_ctrl = test_stop_ctrl();

        // A stationary car enters the fixed stop
        let (_, report) = stop_ctrl
            .proc(&straight_input(0.0, vec![car(25.0, 0.0)]))
            .unwrap();
        assert!(report.stop_planned);

        // Creeping at 0.4 m/s is above the enter threshold but below the
        // exit threshold, so the stop is kept
        let (_, report) = stop_ctrl
            .proc(&straight_input(0.0, vec![car(25.0, 0.4)]))
            .unwrap();
        assert!(report.stop_planned);

        // Above the exit threshold the stop is released
        let (_, report) = stop_ctrl
            .proc(&straight_input(0.0, vec![car(25.0, 0.6)]))
            .unwrap();
        assert!(!report.stop_planned);
    }

    #[test]
    fn test_stop_pose_held_when_stationary() {
        let mut stop_ctrl = test_stop_ctrl();

        // First cycle anchors the stop at 20m
        let (output, _) = stop_ctrl
            .proc(&straight_input(0.0, vec![car(25.0, 0.0)]))
            .unwrap();
        assert!((output.stop_pose.unwrap().position_m.x - 20.0).abs() < 1e-6);

        // Nearly stationary, with the car wobbling by 0.2m, the held anchor
        // wins over the freshly computed one
        let mut input = straight_input(0.1, vec![car(25.2, 0.0)]);
        input.ego_velocity_ms = 0.005;
        let (output, _) = stop_ctrl.proc(&input).unwrap();
        assert!((output.stop_pose.unwrap().position_m.x - 20.0).abs() < 1e-6);

        // At speed the anchor tracks the obstacle again
        let mut input = straight_input(0.1, vec![car(26.0, 0.0)]);
        input.ego_velocity_ms = 8.0;
        let (output, _) = stop_ctrl.proc(&input).unwrap();
        assert!((output.stop_pose.unwrap().position_m.x - 21.0).abs() < 1e-6);
    }

    #[test]
    fn test_nearest_obstacle_wins() {
        let mut stop_ctrl = test_stop_ctrl();
        let input = straight_input(
            0.0,
            vec![car(40.0, 0.0), car(25.0, 0.0), car(55.0, 0.0)],
        );

        let (_, report) = stop_ctrl.proc(&input).unwrap();

        assert!((report.stop_dist_m.unwrap() - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_abandon_stop_for_sudden_pedestrian() {
        let mut stop_ctrl = test_stop_ctrl();
        stop_ctrl
            .params
            .stop_planning
            .object_type_specific_param_map
            .insert(
                "pedestrian".into(),
                ObjectTypeSpecificParams {
                    limit_min_acc: -3.0,
                    sudden_object_acc_threshold: -3.0,
                    sudden_object_dist_threshold: 1000.0,
                    abandon_to_stop: true,
                },
            );

        let pedestrian = ObstacleInput {
            pose: pose_at(7.0),
            velocity_ms: 0.0,
            classification: ObjectClassification::new(ObjectClassification::PEDESTRIAN),
            object_id: "ped-1".into(),
        };
        let mut input = straight_input(0.0, vec![pedestrian]);
        input.ego_velocity_ms = 10.0;

        let (output, report) = stop_ctrl.proc(&input).unwrap();

        // Stopping in 2m from 10 m/s needs -25 m/s^2, far beyond the class
        // threshold, so the stop is abandoned and the module slows at the
        // class limit instead
        assert!(report.stop_abandoned);
        assert!(!report.stop_planned);
        assert!(output.stop_pose.is_none());
        assert!((output.velocity_dem_ms - 88.0_f64.sqrt()).abs() < 1e-6);

        // The slow down is recorded as a two point section from ego to the
        // stop distance
        let mut sink = MemorySink { batches: vec![] };
        stop_ctrl.publish_factors(&mut sink).unwrap();
        let factor = &sink.batches[0].factors[0];
        assert_eq!(factor.behavior, PlanningFactor::SLOW_DOWN);
        assert_eq!(factor.control_points.len(), 2);
        assert!((factor.control_points[0].distance - 0.0).abs() < 1e-6);
        assert!((factor.control_points[1].distance - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_required_deceleration() {
        assert!((required_deceleration(8.0, 16.0) - -2.0).abs() < 1e-9);
        assert!((required_deceleration(0.0, 5.0) - 0.0).abs() < 1e-9);
        assert_eq!(required_deceleration(5.0, 0.0), f64::NEG_INFINITY);
    }

    #[test]
    fn test_braking_distance() {
        assert!((braking_distance(8.0, -1.0) - 32.0).abs() < 1e-9);
        assert_eq!(braking_distance(8.0, 0.0), f64::INFINITY);
    }
}
