//! Obstacle stop control module

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Name under which this module publishes its planning factors.
pub const MODULE_NAME: &str = "obstacle_stop";

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during StopCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum StopCtrlError {
    #[error("Could not load the parameter file: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Could not resolve the parameters: {0}")]
    ParamResolveError(util::params::ParamError),

    #[error("Object parameter lookup failed: {0}")]
    ObjectParamError(StopParamError),
}
