// src/engine/core.rs

//! Synchronous half of the engine.
//!
//! [`CoreRuntime`] turns each [`RuntimeEvent`] into a [`CoreStep`]: jobs to
//! hand to the executor and whether the run is still going. It never
//! touches channels, processes or the filesystem, so whole runs can be
//! replayed in plain `#[test]` functions.

use crate::dag::Scheduler;
use crate::engine::event_handlers::{handle_job_completion, handle_shutdown, start_run, CoreStep};
use crate::engine::summary::RunSummary;
use crate::engine::RuntimeEvent;

/// Scheduler plus the one bit of run state it does not track itself:
/// whether the user interrupted the run.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    interrupted: bool,
}

impl CoreRuntime {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            interrupted: false,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Begin the run and return the first batch of commands.
    pub fn start(&mut self) -> CoreStep {
        start_run(&mut self.scheduler)
    }

    /// Apply one event.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::JobCompleted { job, outcome } => {
                handle_job_completion(&mut self.scheduler, job, outcome)
            }
            RuntimeEvent::ShutdownRequested => {
                self.interrupted = true;
                handle_shutdown(&mut self.scheduler)
            }
        }
    }

    /// Summarize the run as it stands.
    pub fn summary(&self) -> RunSummary {
        RunSummary::from_scheduler(&self.scheduler, self.interrupted)
    }
}
