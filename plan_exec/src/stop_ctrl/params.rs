//! Parameters structure for StopCtrl
//!
//! Unlike the flat parameter files of most modules these parameters form a
//! hierarchy, with per-object-class overrides nested under global defaults,
//! so they are resolved key by key from a [`ParamSource`] rather than
//! deserialised in one go. Resolution happens once at module init, every
//! override is clamped against the global hard limits at that point and
//! never re-checked afterwards.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Std
use std::collections::HashMap;

// External
use log::warn;
use serde::Serialize;

// Internal
use planning_if::obj::ObjectClassification;
use util::params::{ParamError, ParamSource};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Fixed mapping from object classification codes to canonical type names.
///
/// These names key both the object-type flag sections and the per-type
/// override tables in the parameter file.
pub const TYPE_NAMES: [(u8, &str); 8] = [
    (ObjectClassification::UNKNOWN, "unknown"),
    (ObjectClassification::CAR, "car"),
    (ObjectClassification::TRUCK, "truck"),
    (ObjectClassification::BUS, "bus"),
    (ObjectClassification::TRAILER, "trailer"),
    (ObjectClassification::MOTORCYCLE, "motorcycle"),
    (ObjectClassification::BICYCLE, "bicycle"),
    (ObjectClassification::PEDESTRIAN, "pedestrian"),
];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Full parameter set for StopCtrl.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Params {
    pub common: CommonParam,
    pub obstacle_filtering: ObstacleFilteringParam,
    pub stop_planning: StopPlanningParam,
}

/// Global dynamics envelope shared by all planning modules.
///
/// The `normal` bounds are the comfortable operating envelope, the `limit`
/// bounds are the hard envelope the vehicle must never be planned outside
/// of. Accelerations in m/s^2, jerks in m/s^3, negative values decelerate.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct CommonParam {
    // ---- COMFORTABLE BOUNDS ----
    pub max_accel: f64,
    pub min_accel: f64,
    pub max_jerk: f64,
    pub min_jerk: f64,

    // ---- HARD BOUNDS ----
    pub limit_max_accel: f64,
    pub limit_min_accel: f64,
    pub limit_max_jerk: f64,
    pub limit_min_jerk: f64,
}

/// Thresholds governing which obstacles StopCtrl considers relevant.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ObstacleFilteringParam {
    /// Whether point-cloud-derived obstacles are considered at all
    pub use_pointcloud: bool,

    /// Classification codes stopped for when inside the trajectory
    pub inside_stop_object_types: Vec<u8>,

    /// Classification codes stopped for when outside the trajectory
    pub outside_stop_object_types: Vec<u8>,

    // ---- LATERAL MARGINS ----

    /// Maximum lateral distance from the trajectory at which an obstacle is
    /// still relevant.
    ///
    /// Units: meters
    pub max_lat_margin: f64,

    /// As `max_lat_margin`, for predicted objects of unknown class.
    ///
    /// Units: meters
    pub max_lat_margin_against_predicted_object_unknown: f64,

    // ---- VELOCITY AND TIME THRESHOLDS ----

    /// Minimum obstacle velocity for collision point estimation.
    ///
    /// Units: meters/second
    pub min_velocity_to_reach_collision_point: f64,

    /// How long a vanished stop obstacle is still held as stop-worthy.
    ///
    /// Units: seconds
    pub stop_obstacle_hold_time_threshold: f64,

    // ---- OUTSIDE OBSTACLES ----

    /// Prediction horizon for obstacles outside the trajectory.
    ///
    /// Units: seconds
    pub outside_estimation_time_horizon: f64,

    /// Maximum credited lateral velocity for outside obstacles.
    ///
    /// Units: meters/second
    pub outside_max_lateral_velocity: f64,

    /// Assumed pedestrian deceleration when approaching from outside.
    ///
    /// Units: meters/second^2 (positive = decelerating)
    pub outside_pedestrian_deceleration: f64,

    /// Assumed bicycle deceleration when approaching from outside.
    ///
    /// Units: meters/second^2 (positive = decelerating)
    pub outside_bicycle_deceleration: f64,

    // ---- CROSSING OBSTACLES ----

    /// Collision time margin for obstacles crossing the trajectory.
    ///
    /// Units: seconds
    pub crossing_obstacle_collision_time_margin: f64,

    /// Angle between obstacle and trajectory above which the obstacle
    /// counts as crossing.
    ///
    /// Units: radians
    pub crossing_obstacle_traj_angle_threshold: f64,
}

/// RSS-style safety distance configuration.
///
/// Decelerations in m/s^2 (positive = decelerating), velocity offset in
/// m/s.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct RssParam {
    pub use_rss_stop: bool,
    pub two_wheel_objects_deceleration: f64,
    pub vehicle_objects_deceleration: f64,
    pub no_wheel_objects_deceleration: f64,
    pub velocity_offset: f64,
}

/// Stop margin and stop decision configuration.
#[derive(Debug, Default, Clone, Serialize)]
pub struct StopPlanningParam {
    // ---- MARGINS ----

    /// Longitudinal margin kept between the stop point and the obstacle.
    ///
    /// Units: meters
    pub stop_margin: f64,

    /// Margin used when the obstacle sits near the end of the trajectory.
    ///
    /// Units: meters
    pub terminal_stop_margin: f64,

    /// Smallest margin any behaviour may shrink the stop margin to.
    ///
    /// Units: meters
    pub min_behavior_stop_margin: f64,

    /// Most negative obstacle velocity still treated as stationary.
    ///
    /// Units: meters/second
    pub max_negative_velocity: f64,

    /// Margin against obstacles driving towards the vehicle.
    ///
    /// Units: meters
    pub stop_margin_opposing_traffic: f64,

    /// Deceleration assumed for opposing traffic.
    ///
    /// Units: meters/second^2 (positive = decelerating)
    pub effective_deceleration_opposing_traffic: f64,

    // ---- STOP HOLDING ----

    /// Ego velocity below which a planned stop point is held in place.
    ///
    /// Units: meters/second
    pub hold_stop_velocity_threshold: f64,

    /// Distance below which a moved stop point snaps back to the held one.
    ///
    /// Units: meters
    pub hold_stop_distance_threshold: f64,

    // ---- CURVES ----

    /// Whether the stop margin may shrink while approaching on a curve
    pub enable_approaching_on_curve: bool,

    /// Extra margin added on curves.
    ///
    /// Units: meters
    pub additional_stop_margin_on_curve: f64,

    /// Smallest margin allowed on curves.
    ///
    /// Units: meters
    pub min_stop_margin_on_curve: f64,

    // ---- RSS ----
    pub rss_params: RssParam,

    // ---- FIXED STOP HYSTERESIS ----

    /// Obstacle velocity below which a fixed stop is entered.
    ///
    /// Units: meters/second
    pub obstacle_velocity_threshold_enter_fixed_stop: f64,

    /// Obstacle velocity above which a fixed stop is left again.
    ///
    /// Units: meters/second
    pub obstacle_velocity_threshold_exit_fixed_stop: f64,

    // ---- PER-TYPE OVERRIDES ----

    /// Overrides for explicitly configured type names.
    ///
    /// Only holds types named in the parameter file, never `"default"`.
    /// Every entry has been clamped against the hard deceleration limit.
    pub object_type_specific_param_map: HashMap<String, ObjectTypeSpecificParams>,
}

/// Per-object-class stop planning overrides.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct ObjectTypeSpecificParams {
    /// Hard deceleration limit for this class.
    ///
    /// Units: meters/second^2 (negative = decelerating)
    pub limit_min_acc: f64,

    /// Required deceleration beyond which the object counts as sudden.
    ///
    /// Units: meters/second^2 (negative = decelerating)
    pub sudden_object_acc_threshold: f64,

    /// Distance below which a sudden object may be abandoned.
    ///
    /// Units: meters
    pub sudden_object_dist_threshold: f64,

    /// Whether stopping is abandoned for sudden objects of this class
    pub abandon_to_stop: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors in per-object-class parameter lookup.
#[derive(Debug, thiserror::Error)]
pub enum StopParamError {
    #[error("Classification label {0} is not in the type name map")]
    UnknownClassification(u8),

    #[error(
        "No \"default\" override is ever stored, check get_param_type before calling get_param"
    )]
    MissingDefault,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Resolve the full parameter set from the source.
    ///
    /// The common envelope is resolved first since the stop planning
    /// overrides are clamped against it.
    pub fn resolve(source: &ParamSource) -> Result<Self, ParamError> {
        let common = CommonParam::resolve(source)?;
        let obstacle_filtering = ObstacleFilteringParam::resolve(source)?;
        let stop_planning = StopPlanningParam::resolve(source, &common)?;

        Ok(Self {
            common,
            obstacle_filtering,
            stop_planning,
        })
    }
}

impl CommonParam {
    /// Resolve the common dynamics envelope from the source.
    pub fn resolve(source: &ParamSource) -> Result<Self, ParamError> {
        let param = Self {
            max_accel: source.get_double("normal.max_acc")?,
            min_accel: source.get_double("normal.min_acc")?,
            max_jerk: source.get_double("normal.max_jerk")?,
            min_jerk: source.get_double("normal.min_jerk")?,
            limit_max_accel: source.get_double("limit.max_acc")?,
            limit_min_accel: source.get_double("limit.min_acc")?,
            limit_max_jerk: source.get_double("limit.max_jerk")?,
            limit_min_jerk: source.get_double("limit.min_jerk")?,
        };

        // Comfortable bounds should sit inside the hard envelope. Report
        // misconfiguration but keep the configured values.
        if param.max_accel > param.limit_max_accel
            || param.min_accel < param.limit_min_accel
            || param.max_jerk > param.limit_max_jerk
            || param.min_jerk < param.limit_min_jerk
        {
            warn!(
                "Comfortable dynamic bounds fall outside the hard limits: {:#?}",
                param
            );
        }

        Ok(param)
    }
}

impl ObstacleFilteringParam {
    /// Resolve the obstacle filtering thresholds from the source.
    pub fn resolve(source: &ParamSource) -> Result<Self, ParamError> {
        Ok(Self {
            use_pointcloud: source
                .get_bool("obstacle_stop.obstacle_filtering.object_type.pointcloud")?,
            inside_stop_object_types: stop_object_types(
                source,
                "obstacle_stop.obstacle_filtering.object_type.inside",
            )?,
            outside_stop_object_types: stop_object_types(
                source,
                "obstacle_stop.obstacle_filtering.object_type.outside",
            )?,
            max_lat_margin: source.get_double("obstacle_stop.obstacle_filtering.max_lat_margin")?,
            max_lat_margin_against_predicted_object_unknown: source.get_double(
                "obstacle_stop.obstacle_filtering.max_lat_margin_against_predicted_object_unknown",
            )?,
            min_velocity_to_reach_collision_point: source.get_double(
                "obstacle_stop.obstacle_filtering.min_velocity_to_reach_collision_point",
            )?,
            stop_obstacle_hold_time_threshold: source.get_double(
                "obstacle_stop.obstacle_filtering.stop_obstacle_hold_time_threshold",
            )?,
            outside_estimation_time_horizon: source.get_double(
                "obstacle_stop.obstacle_filtering.outside_obstacle.estimation_time_horizon",
            )?,
            outside_max_lateral_velocity: source.get_double(
                "obstacle_stop.obstacle_filtering.outside_obstacle.max_lateral_velocity",
            )?,
            outside_pedestrian_deceleration: source.get_double(
                "obstacle_stop.obstacle_filtering.outside_obstacle.pedestrian_deceleration",
            )?,
            outside_bicycle_deceleration: source.get_double(
                "obstacle_stop.obstacle_filtering.outside_obstacle.bicycle_deceleration",
            )?,
            crossing_obstacle_collision_time_margin: source.get_double(
                "obstacle_stop.obstacle_filtering.crossing_obstacle.collision_time_margin",
            )?,
            crossing_obstacle_traj_angle_threshold: source.get_double(
                "obstacle_stop.obstacle_filtering.crossing_obstacle.traj_angle_threshold",
            )?,
        })
    }
}

impl StopPlanningParam {
    /// Resolve the stop planning configuration from the source.
    ///
    /// Needs the already resolved [`CommonParam`] so that every per-type
    /// override can be clamped against the hard deceleration limit.
    pub fn resolve(source: &ParamSource, common: &CommonParam) -> Result<Self, ParamError> {
        let mut param = Self {
            stop_margin: source.get_double("obstacle_stop.stop_planning.stop_margin")?,
            terminal_stop_margin: source
                .get_double("obstacle_stop.stop_planning.terminal_stop_margin")?,
            min_behavior_stop_margin: source
                .get_double("obstacle_stop.stop_planning.min_behavior_stop_margin")?,
            max_negative_velocity: source
                .get_double("obstacle_stop.stop_planning.max_negative_velocity")?,
            stop_margin_opposing_traffic: source
                .get_double("obstacle_stop.stop_planning.stop_margin_opposing_traffic")?,
            effective_deceleration_opposing_traffic: source.get_double(
                "obstacle_stop.stop_planning.effective_deceleration_opposing_traffic",
            )?,
            hold_stop_velocity_threshold: source
                .get_double("obstacle_stop.stop_planning.hold_stop_velocity_threshold")?,
            hold_stop_distance_threshold: source
                .get_double("obstacle_stop.stop_planning.hold_stop_distance_threshold")?,
            enable_approaching_on_curve: source
                .get_bool("obstacle_stop.stop_planning.stop_on_curve.enable_approaching")?,
            additional_stop_margin_on_curve: source
                .get_double("obstacle_stop.stop_planning.stop_on_curve.additional_stop_margin")?,
            min_stop_margin_on_curve: source
                .get_double("obstacle_stop.stop_planning.stop_on_curve.min_stop_margin")?,
            rss_params: RssParam {
                use_rss_stop: source
                    .get_bool("obstacle_stop.stop_planning.rss_params.use_rss_stop")?,
                two_wheel_objects_deceleration: source.get_double(
                    "obstacle_stop.stop_planning.rss_params.two_wheel_objects_deceleration",
                )?,
                vehicle_objects_deceleration: source.get_double(
                    "obstacle_stop.stop_planning.rss_params.vehicle_objects_deceleration",
                )?,
                no_wheel_objects_deceleration: source.get_double(
                    "obstacle_stop.stop_planning.rss_params.no_wheel_objects_deceleration",
                )?,
                velocity_offset: source
                    .get_double("obstacle_stop.stop_planning.rss_params.velocity_offset")?,
            },
            obstacle_velocity_threshold_enter_fixed_stop: source.get_double(
                "obstacle_stop.stop_planning.obstacle_velocity_threshold_enter_fixed_stop",
            )?,
            obstacle_velocity_threshold_exit_fixed_stop: source.get_double(
                "obstacle_stop.stop_planning.obstacle_velocity_threshold_exit_fixed_stop",
            )?,
            object_type_specific_param_map: HashMap::new(),
        };

        let prefix = "obstacle_stop.stop_planning.object_type_specified_params";

        for type_name in source.get_string_list(&format!("{}.types", prefix))? {
            // "default" marks "no override", it never gets an entry of its
            // own
            if type_name == "default" {
                continue;
            }

            let overrides = ObjectTypeSpecificParams {
                limit_min_acc: source
                    .get_double(&format!("{}.{}.limit_min_acc", prefix, type_name))?,
                sudden_object_acc_threshold: source
                    .get_double(&format!("{}.{}.sudden_object_acc_threshold", prefix, type_name))?,
                sudden_object_dist_threshold: source.get_double(&format!(
                    "{}.{}.sudden_object_dist_threshold",
                    prefix, type_name
                ))?,
                abandon_to_stop: source
                    .get_bool(&format!("{}.{}.abandon_to_stop", prefix, type_name))?,
            }
            .clamp_to(common.limit_min_accel);

            param
                .object_type_specific_param_map
                .insert(type_name, overrides);
        }

        Ok(param)
    }

    /// Canonical type name whose overrides apply to this classification.
    ///
    /// Returns `"default"` when the class has no explicit override.
    pub fn get_param_type(
        &self,
        classification: ObjectClassification,
    ) -> Result<&'static str, StopParamError> {
        let type_name = TYPE_NAMES
            .iter()
            .find(|(label, _)| *label == classification.label)
            .map(|(_, name)| *name)
            .ok_or(StopParamError::UnknownClassification(classification.label))?;

        if self.object_type_specific_param_map.contains_key(type_name) {
            Ok(type_name)
        } else {
            Ok("default")
        }
    }

    /// The overrides applying to this classification.
    ///
    /// Fails with [`StopParamError::MissingDefault`] for classes without an
    /// explicit override, since a `"default"` entry is never stored. Callers
    /// wanting the unscaled defaults must check [`Self::get_param_type`]
    /// first.
    pub fn get_param(
        &self,
        classification: ObjectClassification,
    ) -> Result<ObjectTypeSpecificParams, StopParamError> {
        let type_name = self.get_param_type(classification)?;

        self.object_type_specific_param_map
            .get(type_name)
            .copied()
            .ok_or(StopParamError::MissingDefault)
    }
}

impl ObjectTypeSpecificParams {
    /// Clamp this override against the hard deceleration limit.
    ///
    /// The sudden-object threshold may not be weaker than the hard limit,
    /// and the per-class limit may not be weaker than the clamped threshold,
    /// so an override is always at least as conservative as the global
    /// envelope. Applied once at resolve time.
    pub fn clamp_to(mut self, limit_min_accel: f64) -> Self {
        self.sudden_object_acc_threshold = self.sudden_object_acc_threshold.min(limit_min_accel);
        self.limit_min_acc = self.limit_min_acc.min(self.sudden_object_acc_threshold);
        self
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Read the per-type stop flags under the given section and collect the
/// classification codes of the types flagged true.
///
/// All eight flags must be present in the section.
fn stop_object_types(source: &ParamSource, section: &str) -> Result<Vec<u8>, ParamError> {
    let mut types = Vec::new();

    for (label, name) in TYPE_NAMES.iter() {
        if source.get_bool(&format!("{}.{}", section, name))? {
            types.push(*label);
        }
    }

    Ok(types)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const PARAM_FILE: &str = r#"
        [normal]
        max_acc = 1.0
        min_acc = -0.5
        max_jerk = 1.0
        min_jerk = -0.5

        [limit]
        max_acc = 2.0
        min_acc = -3.0
        max_jerk = 2.0
        min_jerk = -1.5

        [obstacle_stop.obstacle_filtering]
        max_lat_margin = 0.3
        max_lat_margin_against_predicted_object_unknown = 0.3
        min_velocity_to_reach_collision_point = 0.5
        stop_obstacle_hold_time_threshold = 1.0

        [obstacle_stop.obstacle_filtering.object_type]
        pointcloud = false

        [obstacle_stop.obstacle_filtering.object_type.inside]
        unknown = true
        car = true
        truck = true
        bus = true
        trailer = true
        motorcycle = true
        bicycle = true
        pedestrian = true

        [obstacle_stop.obstacle_filtering.object_type.outside]
        unknown = false
        car = true
        truck = true
        bus = true
        trailer = true
        motorcycle = true
        bicycle = true
        pedestrian = true

        [obstacle_stop.obstacle_filtering.outside_obstacle]
        estimation_time_horizon = 1.0
        max_lateral_velocity = 5.0
        pedestrian_deceleration = 1.0
        bicycle_deceleration = 0.8

        [obstacle_stop.obstacle_filtering.crossing_obstacle]
        collision_time_margin = 1.0
        traj_angle_threshold = 0.523

        [obstacle_stop.stop_planning]
        stop_margin = 5.0
        terminal_stop_margin = 3.0
        min_behavior_stop_margin = 3.0
        max_negative_velocity = -0.1
        stop_margin_opposing_traffic = 10.0
        effective_deceleration_opposing_traffic = 4.0
        hold_stop_velocity_threshold = 0.01
        hold_stop_distance_threshold = 0.3
        obstacle_velocity_threshold_enter_fixed_stop = 0.2
        obstacle_velocity_threshold_exit_fixed_stop = 0.5

        [obstacle_stop.stop_planning.stop_on_curve]
        enable_approaching = true
        additional_stop_margin = 3.0
        min_stop_margin = 6.0

        [obstacle_stop.stop_planning.rss_params]
        use_rss_stop = false
        two_wheel_objects_deceleration = 1.0
        vehicle_objects_deceleration = 2.0
        no_wheel_objects_deceleration = 1.5
        velocity_offset = 1.0

        [obstacle_stop.stop_planning.object_type_specified_params]
        types = ["default", "pedestrian"]

        [obstacle_stop.stop_planning.object_type_specified_params.pedestrian]
        limit_min_acc = -0.5
        sudden_object_acc_threshold = -1.0
        sudden_object_dist_threshold = 1000.0
        abandon_to_stop = false
    "#;

    fn params() -> Params {
        Params::resolve(&PARAM_FILE.parse().unwrap()).unwrap()
    }

    #[test]
    fn test_resolve() {
        let params = params();

        assert!((params.common.limit_min_accel - -3.0).abs() < f64::EPSILON);
        assert!((params.stop_planning.stop_margin - 5.0).abs() < f64::EPSILON);
        assert!((params.stop_planning.min_stop_margin_on_curve - 6.0).abs() < f64::EPSILON);
        assert!(params.stop_planning.enable_approaching_on_curve);
        assert!(!params.stop_planning.rss_params.use_rss_stop);
        assert!(
            (params.stop_planning.rss_params.no_wheel_objects_deceleration - 1.5).abs()
                < f64::EPSILON
        );
        assert!(
            (params
                .obstacle_filtering
                .crossing_obstacle_traj_angle_threshold
                - 0.523)
                .abs()
                < f64::EPSILON
        );
        assert!(!params.obstacle_filtering.use_pointcloud);
    }

    #[test]
    fn test_object_type_flags() {
        let params = params();

        // All eight inside flags are set, outside excludes unknown
        assert_eq!(params.obstacle_filtering.inside_stop_object_types.len(), 8);
        assert_eq!(params.obstacle_filtering.outside_stop_object_types.len(), 7);
        assert!(!params
            .obstacle_filtering
            .outside_stop_object_types
            .contains(&ObjectClassification::UNKNOWN));
        assert!(params
            .obstacle_filtering
            .outside_stop_object_types
            .contains(&ObjectClassification::PEDESTRIAN));
    }

    #[test]
    fn test_override_clamping() {
        let params = params();
        let pedestrian = params
            .stop_planning
            .get_param(ObjectClassification::new(ObjectClassification::PEDESTRIAN))
            .unwrap();

        // Both configured values are weaker than the hard limit of -3.0, so
        // both clamp down to it
        assert!((pedestrian.sudden_object_acc_threshold - -3.0).abs() < f64::EPSILON);
        assert!((pedestrian.limit_min_acc - -3.0).abs() < f64::EPSILON);
        assert!((pedestrian.sudden_object_dist_threshold - 1000.0).abs() < f64::EPSILON);
        assert!(!pedestrian.abandon_to_stop);
    }

    #[test]
    fn test_clamp_keeps_stronger_overrides() {
        let clamped = ObjectTypeSpecificParams {
            limit_min_acc: -5.0,
            sudden_object_acc_threshold: -4.0,
            sudden_object_dist_threshold: 10.0,
            abandon_to_stop: true,
        }
        .clamp_to(-3.0);

        // An override already more conservative than the limit is untouched
        assert!((clamped.sudden_object_acc_threshold - -4.0).abs() < f64::EPSILON);
        assert!((clamped.limit_min_acc - -5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_clamp_is_idempotent() {
        let once = ObjectTypeSpecificParams {
            limit_min_acc: -0.5,
            sudden_object_acc_threshold: -1.0,
            sudden_object_dist_threshold: 10.0,
            abandon_to_stop: false,
        }
        .clamp_to(-3.0);
        let twice = once.clamp_to(-3.0);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_get_param_type() {
        let params = params();

        // Overridden types resolve to their own name, all others to
        // "default"
        assert_eq!(
            params
                .stop_planning
                .get_param_type(ObjectClassification::new(ObjectClassification::PEDESTRIAN))
                .unwrap(),
            "pedestrian"
        );
        assert_eq!(
            params
                .stop_planning
                .get_param_type(ObjectClassification::new(ObjectClassification::CAR))
                .unwrap(),
            "default"
        );

        assert!(matches!(
            params
                .stop_planning
                .get_param_type(ObjectClassification::new(42)),
            Err(StopParamError::UnknownClassification(42))
        ));
    }

    #[test]
    fn test_get_param_missing_default() {
        let params = params();

        // "default" is never stored, so looking it up must fail rather than
        // invent values
        assert!(!params
            .stop_planning
            .object_type_specific_param_map
            .contains_key("default"));
        assert!(matches!(
            params
                .stop_planning
                .get_param(ObjectClassification::new(ObjectClassification::CAR)),
            Err(StopParamError::MissingDefault)
        ));
    }

    #[test]
    fn test_missing_key_is_fatal() {
        let source: ParamSource = "[normal]\nmax_acc = 1.0".parse().unwrap();

        assert!(matches!(
            CommonParam::resolve(&source),
            Err(ParamError::MissingKey(_))
        ));
    }

    #[test]
    fn test_missing_object_type_flag_is_fatal() {
        let source: ParamSource = PARAM_FILE
            .replace("pedestrian = true", "")
            .parse()
            .unwrap();

        assert!(matches!(
            ObstacleFilteringParam::resolve(&source),
            Err(ParamError::MissingKey(_))
        ));
    }
}
