//! # Planning factor recording
//!
//! Planning modules never just stop, they stop for a reason. Each module owns
//! a [`FactorRecorder`] which accumulates [`planning_if::factor`] records
//! while the module plans a cycle, and publishes them as one batch at the end
//! of the cycle through a [`FactorSink`].
//!
//! The cycle contract is: any number of `add_*` calls during planning, then
//! exactly one [`FactorRecorder::publish`] at the end of the cycle. Publish
//! always drains the recorder, so the next cycle starts from an empty record
//! no matter what happened to this one.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod control_point;
mod recorder;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use control_point::*;
pub use recorder::*;

use planning_if::factor::PlanningFactorArray;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A destination for published factor batches.
///
/// The production sink is [`crate::factor_server::FactorServer`], tests use
/// in-memory sinks.
pub trait FactorSink {
    /// An error which can occur while delivering a batch.
    type Error;

    /// Deliver one batch to the sink.
    fn send(&mut self, batch: &PlanningFactorArray) -> Result<(), Self::Error>;
}
