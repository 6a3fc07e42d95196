//! # Data Store

use crate::stop_ctrl;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    /// Elapsed session time at the start of this cycle
    pub sim_time_s: f64,

    // StopCtrl
    pub stop_ctrl: stop_ctrl::StopCtrl,
    pub stop_ctrl_input: stop_ctrl::InputData,
    pub stop_ctrl_output: stop_ctrl::OutputData,
    pub stop_ctrl_status_rpt: stop_ctrl::StatusReport,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,

    /// Number of consecutive factor publish errors
    pub num_consec_publish_errors: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle, and sets the 1Hz cycle flag.
    pub fn cycle_start(&mut self, cycle_frequency_hz: f64) {
        self.is_1_hz_cycle = self.num_cycles % (cycle_frequency_hz as u128) == 0;

        self.stop_ctrl_input = stop_ctrl::InputData::default();
        self.stop_ctrl_output = stop_ctrl::OutputData::default();
        self.stop_ctrl_status_rpt = stop_ctrl::StatusReport::default();

        self.sim_time_s = util::session::get_elapsed_seconds();
    }
}
