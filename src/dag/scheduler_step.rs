// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::dag::job::JobId;
use crate::dag::job_info::ScheduledJob;

/// Structured result of a single scheduler "step".
///
/// This is useful for tests that want to manually step the plan and make
/// assertions about what changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Jobs that became ready to run as a result of this step.
    pub newly_scheduled: Vec<ScheduledJob>,
    /// Job whose own action failed in this step, if any.
    pub newly_failed: Vec<JobId>,
    /// Jobs that were blocked in this step (dependents of a failure, or
    /// everything pending under fail-fast).
    pub newly_blocked: Vec<JobId>,
    /// Whether this step finished the run (every job is terminal).
    pub run_just_finished: bool,
}
