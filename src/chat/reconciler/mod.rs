//! Transcript reconciliation: turns channel events into one ordered,
//! deduplicated message list.

pub mod engine;
pub mod state;
pub mod transcript;

pub use engine::{GENERIC_FAILURE, Reconciler};
pub use state::StreamingState;
pub use transcript::Transcript;
