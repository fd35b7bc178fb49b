// src/engine/summary.rs

//! End-of-run report.

use std::fmt;

use crate::dag::{JobRunState, Scheduler};

/// Job labels grouped by how the run left them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    /// Never started: an upstream job failed, fail-fast kicked in, or the run
    /// was interrupted first.
    pub blocked: Vec<String>,
    /// Running when the run was interrupted.
    pub interrupted: Vec<String>,
    pub was_interrupted: bool,
}

impl RunSummary {
    pub fn from_scheduler(scheduler: &Scheduler, was_interrupted: bool) -> Self {
        let mut summary = RunSummary {
            was_interrupted,
            ..RunSummary::default()
        };

        for id in scheduler.job_ids() {
            let label = scheduler.label_of(id).unwrap_or_default().to_string();
            match scheduler.run_state_of(id) {
                JobRunState::DoneSuccess => summary.succeeded.push(label),
                JobRunState::DoneFailed => summary.failed.push(label),
                JobRunState::Blocked | JobRunState::Pending => summary.blocked.push(label),
                JobRunState::Running => summary.interrupted.push(label),
                JobRunState::NotInRun => {}
            }
        }

        summary
    }

    /// `true` when every planned job succeeded.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
            && self.blocked.is_empty()
            && self.interrupted.is_empty()
            && !self.was_interrupted
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.blocked.len() + self.interrupted.len()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} job(s) succeeded",
            self.succeeded.len(),
            self.total()
        )?;
        if !self.failed.is_empty() {
            write!(f, "; failed: {}", self.failed.join(", "))?;
        }
        if !self.blocked.is_empty() {
            write!(f, "; not run: {}", self.blocked.join(", "))?;
        }
        if !self.interrupted.is_empty() {
            write!(f, "; interrupted: {}", self.interrupted.join(", "))?;
        }
        Ok(())
    }
}
