//! Module: runtime
//! Responsibility: chunk storage, probe size recorders, and an in-process
//! runner that executes chunk graphs in insertion order.
//! Does not own: node semantics (see `exec`) or planning (see `plan`).
//! Boundary: the planner sees only the `ExecutionContext` trait.

mod context;
mod recorder;
mod runner;

#[cfg(test)]
mod tests;

pub use context::{ExecutionContext, MemoryContext};
pub use recorder::{SizeRecord, SizeRecorder, SizeRecorderHandle};
pub use runner::{LocalRun, LocalRunner};
