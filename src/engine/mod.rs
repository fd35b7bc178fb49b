// src/engine/mod.rs

//! Run orchestration.
//!
//! A run starts from an [`crate::dag::ExecutionPlan`] and ends with a
//! [`RunSummary`]. In between, [`core`] decides and [`runtime`] acts:
//! completions and Ctrl-C come in as [`RuntimeEvent`]s, ready jobs go out to
//! the executor.

use crate::dag::JobId;

/// Outcome of a job for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    /// Exit code of the process, or -1 when the job failed without one
    /// (spawn error, missing output, failed cleanup).
    Failed(i32),
}

/// Input to the runtime loop.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A job finished with a concrete outcome.
    JobCompleted { job: JobId, outcome: JobOutcome },
    /// Ctrl-C.
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod runtime;
pub mod summary;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::Runtime;
pub use summary::RunSummary;
