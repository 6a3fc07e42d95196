//! # Factor recorder

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::{DateTime, Duration, Utc};
use log::{info, warn};

// Internal
use planning_if::{
    factor::{ControlPoint, PlanningFactor, PlanningFactorArray, SafetyFactorArray, FRAME_ID},
    pose::Pose,
    traj::PathPoint,
};
use util::time::{Clock, WallClock};

use super::{control_point_on_path, section_on_path, FactorSink};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Accumulates planning factors over one cycle and publishes them as a batch.
///
/// A recorder belongs to exactly one module, whose name is stamped into every
/// record. Factors are kept in the order they were recorded. Point factors
/// carry one control point and section factors carry two, there is no way to
/// record any other shape.
pub struct FactorRecorder {
    /// Name of the owning module, stamped into every factor
    name: String,

    /// Factors recorded so far this cycle, in recording order
    factors: Vec<PlanningFactor>,

    /// Clock used for batch stamps and console throttling
    clock: Box<dyn Clock>,

    /// If true a summary of each non-empty batch is logged on publish
    enable_console_output: bool,

    /// Minimum milliseconds between console summaries, values <= 0 disable
    /// throttling
    throttle_duration_ms: i64,

    /// When the last console summary was emitted
    last_console_output: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl FactorRecorder {
    /// Create a new recorder for the named module.
    pub fn new(name: &str, enable_console_output: bool, throttle_duration_ms: i64) -> Self {
        Self::with_clock(
            name,
            enable_console_output,
            throttle_duration_ms,
            Box::new(WallClock),
        )
    }

    /// Create a new recorder which reads time from the given clock.
    pub fn with_clock(
        name: &str,
        enable_console_output: bool,
        throttle_duration_ms: i64,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            name: name.into(),
            factors: Vec::new(),
            clock,
            enable_console_output,
            throttle_duration_ms,
            last_console_output: None,
        }
    }

    /// The name of the owning module.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of factors recorded so far this cycle.
    pub fn len(&self) -> usize {
        self.factors.len()
    }

    /// True if no factors have been recorded this cycle.
    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    /// Record a factor anchored to a single point at a known signed arc
    /// length from the ego position.
    pub fn add(
        &mut self,
        distance: f64,
        pose: Pose,
        behavior: u16,
        safety_factors: SafetyFactorArray,
        is_driving_forward: bool,
        velocity: f64,
        shift_length: f64,
        detail: &str,
    ) {
        let control_point = ControlPoint {
            pose,
            velocity,
            shift_length,
            distance,
        };

        self.push(
            vec![control_point],
            behavior,
            safety_factors,
            is_driving_forward,
            detail,
        );
    }

    /// Record a factor spanning a section of the trajectory, from known
    /// signed arc lengths.
    ///
    /// `distances`, `poses`, `velocities` and `shift_lengths` are all
    /// (start, end) pairs. No ordering between the start and end distances
    /// is assumed.
    pub fn add_section(
        &mut self,
        distances: (f64, f64),
        poses: (Pose, Pose),
        behavior: u16,
        safety_factors: SafetyFactorArray,
        is_driving_forward: bool,
        velocities: (f64, f64),
        shift_lengths: (f64, f64),
        detail: &str,
    ) {
        let control_points = vec![
            ControlPoint {
                pose: poses.0,
                velocity: velocities.0,
                shift_length: shift_lengths.0,
                distance: distances.0,
            },
            ControlPoint {
                pose: poses.1,
                velocity: velocities.1,
                shift_length: shift_lengths.1,
                distance: distances.1,
            },
        ];

        self.push(
            control_points,
            behavior,
            safety_factors,
            is_driving_forward,
            detail,
        );
    }

    /// Record a factor anchored to a single pose on a path, measuring the
    /// distance along the path from the ego pose.
    pub fn add_on_path<P: PathPoint>(
        &mut self,
        points: &[P],
        ego_pose: &Pose,
        pose: &Pose,
        behavior: u16,
        safety_factors: SafetyFactorArray,
        is_driving_forward: bool,
        velocity: f64,
        shift_length: f64,
        detail: &str,
    ) {
        let control_point = control_point_on_path(points, ego_pose, pose, velocity, shift_length);

        self.push(
            vec![control_point],
            behavior,
            safety_factors,
            is_driving_forward,
            detail,
        );
    }

    /// Record a factor spanning a section of a path, measuring both
    /// distances along the path from the same ego pose.
    pub fn add_section_on_path<P: PathPoint>(
        &mut self,
        points: &[P],
        ego_pose: &Pose,
        start_pose: &Pose,
        end_pose: &Pose,
        behavior: u16,
        safety_factors: SafetyFactorArray,
        is_driving_forward: bool,
        velocities: (f64, f64),
        shift_lengths: (f64, f64),
        detail: &str,
    ) {
        let (start, end) = section_on_path(
            points,
            ego_pose,
            start_pose,
            end_pose,
            velocities,
            shift_lengths,
        );

        self.push(
            vec![start, end],
            behavior,
            safety_factors,
            is_driving_forward,
            detail,
        );
    }

    /// Publish this cycle's batch to the sink and clear the recorder.
    ///
    /// The batch is sent even when no factors were recorded, an empty batch
    /// tells subscribers the module planned a cycle with nothing to report.
    /// The recorder is always left empty, even if delivery fails - a factor
    /// describes the cycle it was recorded in and is never carried over.
    pub fn publish<S: FactorSink>(&mut self, sink: &mut S) -> Result<(), S::Error> {
        let batch = PlanningFactorArray {
            frame_id: FRAME_ID.into(),
            stamp: self.clock.now(),
            factors: std::mem::take(&mut self.factors),
        };

        let send_result = sink.send(&batch);

        if self.enable_console_output && !batch.factors.is_empty() {
            self.log_batch(&batch);
        }

        send_result
    }

    /// Append a fully built factor to this cycle's record.
    fn push(
        &mut self,
        control_points: Vec<ControlPoint>,
        behavior: u16,
        safety_factors: SafetyFactorArray,
        is_driving_forward: bool,
        detail: &str,
    ) {
        self.factors.push(PlanningFactor {
            module: self.name.clone(),
            is_driving_forward,
            control_points,
            behavior,
            detail: detail.into(),
            safety_factors,
        });
    }

    /// Log a summary of the batch, honouring the console throttle.
    fn log_batch(&mut self, batch: &PlanningFactorArray) {
        if !self.should_log(batch.stamp) {
            return;
        }

        match serde_json::to_string_pretty(batch) {
            Ok(json) => info!(
                target: self.name.as_str(),
                "Planning factors from {}:\n{}", self.name, json
            ),
            // Console output is best effort, the batch itself has already
            // gone to the sink
            Err(e) => warn!("Could not serialise factors for console output: {}", e),
        }
    }

    /// Apply the console throttle, true if a summary should be logged now.
    fn should_log(&mut self, now: DateTime<Utc>) -> bool {
        if self.throttle_duration_ms <= 0 {
            return true;
        }

        if let Some(last) = self.last_console_output {
            if now.signed_duration_since(last) < Duration::milliseconds(self.throttle_duration_ms)
            {
                return false;
            }
        }

        self.last_console_output = Some(now);
        true
    }
}

impl Default for FactorRecorder {
    fn default() -> Self {
        Self::new("", false, 0)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::Vector3;
    use planning_if::{factor::SafetyFactor, traj::TrajectoryPoint};
    use std::sync::{Arc, Mutex};

    /// A sink which remembers every batch it is given.
    #[derive(Default)]
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

    /// A sink which always fails to deliver.
    struct FailSink;

    impl FactorSink for FailSink {
        type Error = ();

        fn send(&mut self, _batch: &PlanningFactorArray) -> Result<(), ()> {
            Err(())
        }
    }

    /// A clock stepped by hand.
    #[derive(Clone)]
    struct TestClock(Arc<Mutex<DateTime<Utc>>>);

    impl TestClock {
        fn new() -> Self {
            TestClock(Arc::new(Mutex::new(Utc::now())))
        }

        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }

        fn advance_ms(&self, ms: i64) {
            let mut now = self.0.lock().unwrap();
            *now = *now + Duration::milliseconds(ms);
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn pose_at(x_m: f64) -> Pose {
        Pose::from_position_and_heading(Vector3::new(x_m, 0.0, 0.0), 0.0)
    }

    fn straight_path() -> Vec<TrajectoryPoint> {
        (0..30)
            .map(|i| TrajectoryPoint {
                pose: pose_at(i as f64),
                velocity_ms: 1.0,
            })
            .collect()
    }

    #[test]
    fn test_publish_preserves_count_and_order() {
        let mut recorder = FactorRecorder::new("obstacle_stop", false, 0);
        let mut sink = MemorySink::default();

        recorder.add(
            1.0,
            pose_at(1.0),
            PlanningFactor::STOP,
            SafetyFactorArray::default(),
            true,
            0.0,
            0.0,
            "first",
        );
        recorder.add(
            2.0,
            pose_at(2.0),
            PlanningFactor::SLOW_DOWN,
            SafetyFactorArray::default(),
            true,
            1.5,
            0.0,
            "second",
        );
        recorder.add(
            3.0,
            pose_at(3.0),
            PlanningFactor::NONE,
            SafetyFactorArray::default(),
            true,
            0.0,
            0.0,
            "third",
        );

        assert_eq!(recorder.len(), 3);
        recorder.publish(&mut sink).unwrap();

        // One batch, in recording order, recorder drained
        assert_eq!(sink.batches.len(), 1);
        let batch = &sink.batches[0];
        assert_eq!(batch.frame_id, "map");
        assert_eq!(batch.factors.len(), 3);
        let details: Vec<&str> = batch.factors.iter().map(|f| f.detail.as_str()).collect();
        assert_eq!(details, vec!["first", "second", "third"]);
        assert!(batch.factors.iter().all(|f| f.module == "obstacle_stop"));
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_publish_empty_batch() {
        let mut recorder = FactorRecorder::new("obstacle_stop", false, 0);
        let mut sink = MemorySink::default();

        recorder.publish(&mut sink).unwrap();

        // An empty cycle still produces exactly one batch
        assert_eq!(sink.batches.len(), 1);
        assert!(sink.batches[0].factors.is_empty());
    }

    #[test]
    fn test_section_and_point_round_trip() {
        let mut recorder = FactorRecorder::new("obstacle_stop", false, 0);
        let mut sink = MemorySink::default();

        recorder.add_section(
            (10.0, 20.0),
            (pose_at(10.0), pose_at(20.0)),
            PlanningFactor::SLOW_DOWN,
            SafetyFactorArray::default(),
            true,
            (2.0, 2.0),
            (0.0, 0.0),
            "",
        );
        recorder.add(
            5.0,
            pose_at(5.0),
            PlanningFactor::STOP,
            SafetyFactorArray::default(),
            true,
            0.0,
            0.0,
            "",
        );

        recorder.publish(&mut sink).unwrap();

        let batch = &sink.batches[0];
        assert_eq!(batch.factors[0].control_points.len(), 2);
        assert!((batch.factors[0].control_points[0].distance - 10.0).abs() < 1e-9);
        assert!((batch.factors[0].control_points[1].distance - 20.0).abs() < 1e-9);
        assert_eq!(batch.factors[1].control_points.len(), 1);
        assert!((batch.factors[1].control_points[0].distance - 5.0).abs() < 1e-9);

        // The next publish starts from a fresh record
        recorder.publish(&mut sink).unwrap();
        assert!(sink.batches[1].factors.is_empty());
    }

    #[test]
    fn test_failed_send_still_clears() {
        let mut recorder = FactorRecorder::new("obstacle_stop", false, 0);

        recorder.add(
            1.0,
            pose_at(1.0),
            PlanningFactor::STOP,
            SafetyFactorArray::default(),
            true,
            0.0,
            0.0,
            "",
        );

        assert!(recorder.publish(&mut FailSink).is_err());

        // The factor is gone, failed cycles are never carried over
        assert!(recorder.is_empty());
        let mut sink = MemorySink::default();
        recorder.publish(&mut sink).unwrap();
        assert!(sink.batches[0].factors.is_empty());
    }

    #[test]
    fn test_path_based_adds_measure_from_ego() {
        let path = straight_path();
        let mut recorder = FactorRecorder::new("obstacle_stop", false, 0);
        let mut sink = MemorySink::default();

        let safety_factors = SafetyFactorArray {
            factors: vec![SafetyFactor {
                factor_type: SafetyFactor::OBJECT,
                object_id: "obj-1".into(),
                is_safe: false,
                points: vec![Vector3::new(7.0, 0.0, 0.0)],
            }],
            is_safe_plan: false,
            detail: String::new(),
        };

        recorder.add_on_path(
            &path,
            &pose_at(2.0),
            &pose_at(7.0),
            PlanningFactor::STOP,
            safety_factors,
            true,
            0.0,
            0.0,
            "stop for obj-1",
        );
        recorder.add_section_on_path(
            &path,
            &pose_at(2.0),
            &pose_at(4.0),
            &pose_at(9.0),
            PlanningFactor::SLOW_DOWN,
            SafetyFactorArray::default(),
            true,
            (1.0, 1.0),
            (0.0, 0.0),
            "",
        );

        recorder.publish(&mut sink).unwrap();

        let batch = &sink.batches[0];
        assert!((batch.factors[0].control_points[0].distance - 5.0).abs() < 1e-9);
        assert_eq!(batch.factors[0].safety_factors.factors[0].object_id, "obj-1");

        // Both section distances measured from the same ego pose
        assert!((batch.factors[1].control_points[0].distance - 2.0).abs() < 1e-9);
        assert!((batch.factors[1].control_points[1].distance - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_batch_stamped_from_clock() {
        let clock = TestClock::new();
        let stamp = clock.now();
        let mut recorder =
            FactorRecorder::with_clock("obstacle_stop", false, 0, Box::new(clock.clone()));
        let mut sink = MemorySink::default();

        recorder.publish(&mut sink).unwrap();
        assert_eq!(sink.batches[0].stamp, stamp);

        clock.advance_ms(250);
        recorder.publish(&mut sink).unwrap();
        assert_eq!(sink.batches[1].stamp, stamp + Duration::milliseconds(250));
    }

    #[test]
    fn test_console_throttle() {
        let clock = TestClock::new();
        let mut recorder =
            FactorRecorder::with_clock("obstacle_stop", true, 1000, Box::new(clock.clone()));

        // First emission passes, repeats within the interval are suppressed
        assert!(recorder.should_log(clock.now()));
        assert!(!recorder.should_log(clock.now()));

        clock.advance_ms(999);
        assert!(!recorder.should_log(clock.now()));

        clock.advance_ms(1);
        assert!(recorder.should_log(clock.now()));
    }

    #[test]
    fn test_console_throttle_disabled() {
        let mut recorder = FactorRecorder::new("obstacle_stop", true, 0);
        let now = Utc::now();

        // A throttle of zero never suppresses
        assert!(recorder.should_log(now));
        assert!(recorder.should_log(now));
        assert!(recorder.should_log(now));
    }
}
