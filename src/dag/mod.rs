// src/dag/mod.rs

//! Job graph resolution, planning and scheduling.
//!
//! - [`resolve`] turns requested targets into a [`JobGraph`].
//! - [`graph`] holds the resolved jobs and their dependency edges.
//! - [`plan`] decides which jobs are stale and must run.
//! - [`scheduler`] contains the run state machine that decides which jobs
//!   are ready, and blocks dependents when a job fails.
//! - [`job`] and [`job_info`] provide job data and scheduled job types.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] manages per-run state transitions.

pub mod graph;
pub mod job;
pub mod job_info;
pub mod plan;
pub mod resolve;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;

pub use graph::JobGraph;
pub use job::{Job, JobAction, JobId};
pub use job_info::{JobRunState, ScheduledJob};
pub use plan::{ExecutionPlan, ForceMode, RunReason};
pub use resolve::resolve;
pub use scheduler::{Scheduler, SchedulerOptions};
pub use scheduler_step::SchedulerStep;
