// src/dag/job_info.rs

//! Job metadata and per-run state management.

use crate::dag::job::{Job, JobAction, JobId};

/// Per-run state of a job (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Job is planned but waiting on dependencies or a free slot.
    Pending,
    /// Job has been dispatched to the executor and is currently running.
    Running,
    /// Job's action completed successfully.
    DoneSuccess,
    /// Job's action failed.
    DoneFailed,
    /// Job never ran: an upstream job failed, or the run was stopped.
    Blocked,
}

/// Public, read-only view of a job's run state.
///
/// This is exposed for tests and diagnostics without leaking the internal
/// `RunState` type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobRunState {
    /// The job is not part of the execution plan.
    NotInRun,
    Pending,
    Running,
    DoneSuccess,
    DoneFailed,
    Blocked,
}

impl From<Option<RunState>> for JobRunState {
    fn from(state: Option<RunState>) -> Self {
        match state {
            None => JobRunState::NotInRun,
            Some(RunState::Pending) => JobRunState::Pending,
            Some(RunState::Running) => JobRunState::Running,
            Some(RunState::DoneSuccess) => JobRunState::DoneSuccess,
            Some(RunState::DoneFailed) => JobRunState::DoneFailed,
            Some(RunState::Blocked) => JobRunState::Blocked,
        }
    }
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::DoneSuccess | RunState::DoneFailed | RunState::Blocked
        )
    }
}

/// Static job information taken from the plan, plus per-run state.
#[derive(Debug, Clone)]
pub struct JobInfo {
    pub id: JobId,
    pub label: String,
    pub rule: String,
    pub action: JobAction,
    pub outputs: Vec<String>,
    pub env: Option<String>,
    /// Planned dependencies (upstream jobs that also run in this plan).
    pub deps: Vec<JobId>,

    /// Per-run state (None if not participating in the run).
    pub run_state: Option<RunState>,
}

impl JobInfo {
    pub fn from_job(job: &Job, deps: Vec<JobId>) -> Self {
        Self {
            id: job.id,
            label: job.label(),
            rule: job.rule.clone(),
            action: job.action.clone(),
            outputs: job.output_paths().map(str::to_string).collect(),
            env: job.env.clone(),
            deps,
            run_state: None,
        }
    }
}

/// Description of a job that the scheduler wants the executor to run now.
#[derive(Debug, Clone)]
pub struct ScheduledJob {
    pub id: JobId,
    pub label: String,
    pub rule: String,
    pub action: JobAction,
    /// Declared outputs, relative to the workflow directory.
    pub outputs: Vec<String>,
    pub env: Option<String>,
}

impl ScheduledJob {
    pub fn from_job_info(info: &JobInfo) -> Self {
        Self {
            id: info.id,
            label: info.label.clone(),
            rule: info.rule.clone(),
            action: info.action.clone(),
            outputs: info.outputs.clone(),
            env: info.env.clone(),
        }
    }
}
