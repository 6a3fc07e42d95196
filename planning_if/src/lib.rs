//! # Planning Interface
//!
//! The planning interface crate defines the data structures and network
//! primitives shared between the planning executable and any ground software
//! which consumes its outputs.
//!
//! The main products are:
//!
//! - [`factor`] - planning factor messages, the record of why the planner
//!   chose to stop, slow down, or shift within a cycle.
//! - [`obj`] - object classification labels used to select per-class
//!   parameter overrides.
//! - [`traj`] - trajectory point definitions and arc length utilities.
//! - [`net`] - monitored zmq sockets used to move these messages around.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod factor;
pub mod net;
pub mod obj;
pub mod pose;
pub mod traj;
