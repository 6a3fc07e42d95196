//! # Planning library.
//!
//! This library allows other crates in the workspace to access items defined inside the planning
//! crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Global data store for the executable
pub mod data_store;

/// Planning factor recording - accumulates the reasons behind each planning decision
pub mod factor;

/// Factor server - publishes planning factor batches to ground
pub mod factor_server;

/// Obstacle stop module - holds the vehicle a margin clear of obstacles on the trajectory
pub mod stop_ctrl;
