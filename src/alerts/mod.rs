//! Alert evaluation and last-alert persistence.

pub mod evaluator;
pub mod state_store;

pub use evaluator::{evaluate, AlertEvaluator, AlertOutcome, Evaluation, Thresholds, Zone};
pub use state_store::{AlertStateStore, FileStateStore, MemoryStateStore};
