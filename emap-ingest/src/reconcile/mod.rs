//! Feed reconciliation: transition policy and the engine that applies it

mod engine;
mod transition;

pub use engine::{ReconcileOutcome, ReconcileStats, ReconciliationEngine};
pub use transition::{RetainReason, Transition};
