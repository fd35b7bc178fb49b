// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{info, warn};

use crate::dag::{JobId, ScheduledJob, Scheduler, SchedulerStep};
use crate::engine::JobOutcome;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these jobs to the executor.
    DispatchJobs(Vec<ScheduledJob>),
    /// Request that the runtime stops (run finished or interrupted).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute (dispatch jobs, exit).
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn from_scheduler_step(scheduler: &Scheduler, step: SchedulerStep) -> Self {
        let mut commands = Vec::new();

        if !step.newly_scheduled.is_empty() {
            commands.push(CoreCommand::DispatchJobs(step.newly_scheduled));
        }

        let keep_running = !scheduler.is_finished();
        if !keep_running {
            commands.push(CoreCommand::RequestExit);
        }

        CoreStep {
            commands,
            keep_running,
        }
    }
}

/// Start the run: dispatch every job whose dependencies are already
/// satisfied. A plan with nothing to do finishes immediately.
pub fn start_run(scheduler: &mut Scheduler) -> CoreStep {
    info!(jobs = scheduler.job_count(), "starting run");
    let step = scheduler.step_start();
    CoreStep::from_scheduler_step(scheduler, step)
}

/// Handle a job completion event.
pub fn handle_job_completion(scheduler: &mut Scheduler, job: JobId, outcome: JobOutcome) -> CoreStep {
    let step = scheduler.step_completion(job, outcome);

    for blocked in &step.newly_blocked {
        if let Some(label) = scheduler.label_of(*blocked) {
            warn!(job = %label, "job will not run");
        }
    }

    CoreStep::from_scheduler_step(scheduler, step)
}

/// Handle a shutdown request: nothing new is dispatched and the runtime
/// stops. Jobs still running are cancelled by the executor.
pub fn handle_shutdown(scheduler: &mut Scheduler) -> CoreStep {
    let blocked = scheduler.abort();
    info!(
        not_started = blocked.len(),
        running = scheduler.running_count(),
        "shutdown requested; stopping run"
    );

    CoreStep {
        commands: vec![CoreCommand::RequestExit],
        keep_running: false,
    }
}
