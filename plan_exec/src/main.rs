//! Main planning executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Scenario input acquisition
//!         - Obstacle stop control processing
//!         - Planning factor publication
//!
//! The scenario is a synthetic straight road with one parked car, which
//! drives off partway through the run. It exists to exercise the planning
//! factor reporting path end to end, the published batches can be watched
//! with the `test_factor_sub` bin from `planning_if`.
//!
//! # Modules
//!
//! All modules (e.g. `stop_ctrl`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.
//!

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use plan_lib::{*, data_store::DataStore, factor_server::FactorServer, stop_ctrl::ObstacleInput};
use planning_if::{net::NetParams, obj::ObjectClassification, pose::Pose, traj::TrajectoryPoint};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, error, info, warn};
use nalgebra::Vector3;
use std::env;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one cycle.
const CYCLE_PERIOD_S: f64 = 0.10;

/// Number of cycles per second
const CYCLE_FREQUENCY_HZ: f64 = 1.0 / CYCLE_PERIOD_S;

/// Number of cycles to run when no cycle count argument is given.
const DEFAULT_NUM_CYCLES: u128 = 300;

/// Maximum number of consecutive factor publish errors before the loss of
/// batches is escalated to an error.
const MAX_PUBLISH_ERROR_LIMIT: u64 = 5;

/// Length of the scenario's straight road.
const ROAD_LENGTH_M: f64 = 60.0;

/// Velocity held by the scenario when no stop is planned.
const CRUISE_VELOCITY_MS: f64 = 8.0;

/// Where the parked car sits on the road.
const CAR_POSITION_M: f64 = 40.0;

/// Elapsed time at which the parked car drives off.
const CAR_CLEARS_S: f64 = 15.0;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("plan_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Deimos Planning Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;

    info!("Exec parameters loaded");

    // ---- PROCESS ARGUMENTS ----

    // Collect all arguments
    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    // A single optional argument gives the number of cycles to run
    let num_cycles = match args.len() {
        1 => DEFAULT_NUM_CYCLES,
        2 => args[1]
            .parse::<u128>()
            .wrap_err("Could not parse the cycle count argument")?,
        _ => {
            return Err(eyre!(
                "Expected either zero or one argument, found {}",
                args.len() - 1
            ))
        }
    };

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    // ---- INITIALISE MODULES ----

    ds.stop_ctrl
        .init("stop_ctrl.toml", &session)
        .wrap_err("Failed to initialise StopCtrl")?;
    info!("StopCtrl init complete");

    info!("Module initialisation complete\n");

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = planning_if::net::zmq::Context::new();

    let mut factor_server = {
        let s = FactorServer::new(&zmq_ctx, &net_params, stop_ctrl::MODULE_NAME)
            .wrap_err("Failed to initialise FactorServer")?;
        info!("FactorServer initialised");
        s
    };

    info!("Network initialisation complete");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut scenario = Scenario::new();

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(CYCLE_FREQUENCY_HZ);

        // ---- DATA INPUT ----

        ds.stop_ctrl_input = scenario.input();

        // ---- CONTROL ALGORITHM PROCESSING ----

        // StopCtrl processing
        match ds.stop_ctrl.proc(&ds.stop_ctrl_input) {
            Ok((o, r)) => {
                ds.stop_ctrl_output = o;
                ds.stop_ctrl_status_rpt = r;
            }
            Err(e) => {
                warn!("Error during StopCtrl processing: {}", e);
            }
        };

        // Advance the scenario with the commanded velocity
        scenario.step(ds.stop_ctrl_output.velocity_dem_ms, ds.sim_time_s);

        // ---- FACTOR PUBLICATION ----

        // Exactly one batch per cycle, empty batches included
        match ds.stop_ctrl.publish_factors(&mut factor_server) {
            Ok(_) => ds.num_consec_publish_errors = 0,
            Err(e) => {
                ds.num_consec_publish_errors += 1;
                warn!("FactorServer error: {}", e);

                // If over the limit print error, the batches are lost but
                // the planner keeps running
                if ds.num_consec_publish_errors > MAX_PUBLISH_ERROR_LIMIT {
                    error!(
                        "Maximum number of consecutive FactorServer errors ({}) has been exceeded",
                        MAX_PUBLISH_ERROR_LIMIT
                    );
                }
            }
        };

        // Log the scenario state on the 1Hz
        if ds.is_1_hz_cycle {
            info!(
                "[{:7.1} s] ego at {:5.1} m doing {:.2} m/s, {}",
                ds.sim_time_s,
                scenario.ego_pose.position_m.x,
                scenario.ego_velocity_ms,
                match ds.stop_ctrl_status_rpt.stop_dist_m {
                    Some(d) => format!("stop in {:.1} m", d),
                    None => String::from("no stop planned"),
                }
            );
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match Duration::from_secs_f64(CYCLE_PERIOD_S).checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }

        // Increment cycle counter
        ds.num_cycles += 1;

        if ds.num_cycles >= num_cycles {
            info!("Cycle limit reached after {} cycles, stopping", ds.num_cycles);
            break;
        }
    }

    // ---- SHUTDOWN ----

    // Save the end of run state for later inspection
    session.save("end_of_run_report.json", ds.stop_ctrl_status_rpt);

    session.exit();

    info!("End of execution");

    Ok(())
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Synthetic straight road scenario driven by the main loop.
struct Scenario {
    /// Current pose of the ego vehicle on the road
    ego_pose: Pose,

    /// Current velocity of the ego vehicle
    ego_velocity_ms: f64,

    /// Whether the parked car is still on the road
    car_present: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Scenario {
    /// Start the scenario with the ego vehicle stationary at the road start.
    fn new() -> Self {
        Self {
            ego_pose: Pose::from_position_and_heading(Vector3::zeros(), 0.0),
            ego_velocity_ms: 0.0,
            car_present: true,
        }
    }

    /// Build this cycle's input data for StopCtrl.
    fn input(&self) -> stop_ctrl::InputData {
        let trajectory = (0..=ROAD_LENGTH_M as usize)
            .map(|i| TrajectoryPoint {
                pose: Pose::from_position_and_heading(Vector3::new(i as f64, 0.0, 0.0), 0.0),
                velocity_ms: CRUISE_VELOCITY_MS,
            })
            .collect();

        let obstacles = if self.car_present {
            vec![ObstacleInput {
                pose: Pose::from_position_and_heading(
                    Vector3::new(CAR_POSITION_M, 0.0, 0.0),
                    0.0,
                ),
                velocity_ms: 0.0,
                classification: ObjectClassification::new(ObjectClassification::CAR),
                object_id: String::from("parked-car"),
            }]
        } else {
            Vec::new()
        };

        stop_ctrl::InputData {
            trajectory,
            ego_pose: self.ego_pose,
            ego_velocity_ms: self.ego_velocity_ms,
            cruise_velocity_ms: CRUISE_VELOCITY_MS,
            obstacles,
        }
    }

    /// Advance the scenario by one cycle with the commanded velocity.
    ///
    /// The ego vehicle tracks the demand perfectly, dynamics are not the
    /// point of this scenario.
    fn step(&mut self, velocity_dem_ms: f64, sim_time_s: f64) {
        self.ego_velocity_ms = velocity_dem_ms;

        let x_m = (self.ego_pose.position_m.x + velocity_dem_ms * CYCLE_PERIOD_S)
            .min(ROAD_LENGTH_M);
        self.ego_pose = Pose::from_position_and_heading(Vector3::new(x_m, 0.0, 0.0), 0.0);

        // The parked car drives off partway through, leaving the road clear
        // so empty factor batches go out too
        if sim_time_s > CAR_CLEARS_S {
            self.car_present = false;
        }
    }
}
