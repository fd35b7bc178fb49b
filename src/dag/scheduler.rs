// src/dag/scheduler.rs

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::dag::job::JobId;
use crate::dag::job_info::{JobInfo, JobRunState, RunState, ScheduledJob};
use crate::dag::plan::ExecutionPlan;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{ReadOnlyStateManager, StateManager};
use crate::engine::JobOutcome;

/// Scheduling knobs taken from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerOptions {
    /// Maximum number of jobs running at the same time (at least 1).
    pub max_parallel: usize,
    /// Stop dispatching new jobs after the first failure.
    pub fail_fast: bool,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            max_parallel: 1,
            fail_fast: false,
        }
    }
}

/// Scheduler holds the planned jobs plus their mutable run state.
///
/// It is responsible for:
/// - deciding when a planned job is "ready" (planned deps succeeded)
/// - respecting the parallelism limit
/// - marking jobs as succeeded/failed
/// - blocking dependents when a job fails
#[derive(Debug)]
pub struct Scheduler {
    jobs: BTreeMap<JobId, JobInfo>,
    dependents: BTreeMap<JobId, Vec<JobId>>,
    options: SchedulerOptions,
    started: bool,
    finished: bool,
}

impl Scheduler {
    /// Construct a scheduler for the jobs an [`ExecutionPlan`] wants to run.
    pub fn from_plan(plan: &ExecutionPlan, options: SchedulerOptions) -> Self {
        let mut jobs = BTreeMap::new();
        let mut dependents: BTreeMap<JobId, Vec<JobId>> = BTreeMap::new();

        for job in plan.jobs_to_run() {
            let deps = plan.planned_dependencies_of(job.id);
            for dep in &deps {
                dependents.entry(*dep).or_default().push(job.id);
            }
            jobs.insert(job.id, JobInfo::from_job(job, deps));
        }

        Self {
            jobs,
            dependents,
            options,
            started: false,
            finished: false,
        }
    }

    /// Returns `true` when no job is pending or running.
    pub fn is_idle(&self) -> bool {
        !self.started || self.finished
    }

    /// Whether the run has been started and every job reached a terminal
    /// state.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn options(&self) -> SchedulerOptions {
        self.options
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Planned job ids, in job order.
    pub fn job_ids(&self) -> impl Iterator<Item = JobId> + '_ {
        self.jobs.keys().copied()
    }

    pub fn label_of(&self, job: JobId) -> Option<&str> {
        self.jobs.get(&job).map(|info| info.label.as_str())
    }

    /// Read-only view of the given job's run state.
    pub fn run_state_of(&self, job: JobId) -> JobRunState {
        self.jobs
            .get(&job)
            .map(|info| info.run_state.into())
            .unwrap_or(JobRunState::NotInRun)
    }

    /// Jobs currently in the given state, in job order.
    pub fn jobs_in_state(&self, state: JobRunState) -> Vec<JobId> {
        self.jobs
            .values()
            .filter(|info| JobRunState::from(info.run_state) == state)
            .map(|info| info.id)
            .collect()
    }

    pub fn running_count(&self) -> usize {
        self.jobs
            .values()
            .filter(|info| info.run_state == Some(RunState::Running))
            .count()
    }

    /// Whether all planned dependencies of `job` succeeded.
    ///
    /// Returns `None` if the job is not part of the plan.
    pub fn deps_satisfied(&self, job: JobId) -> Option<bool> {
        let info = self.jobs.get(&job)?;
        let ro = ReadOnlyStateManager::new(&self.jobs);
        Some(ro.deps_satisfied_for_info(info))
    }

    /// Start the run and return the first batch of ready jobs.
    pub fn start(&mut self) -> Vec<ScheduledJob> {
        self.step_start().newly_scheduled
    }

    /// Handle completion of a job with a concrete outcome (production API).
    pub fn handle_completion(&mut self, job: JobId, outcome: JobOutcome) -> Vec<ScheduledJob> {
        self.step_completion(job, outcome).newly_scheduled
    }

    /// Manual-step variant of `start` that returns a rich [`SchedulerStep`].
    pub fn step_start(&mut self) -> SchedulerStep {
        if self.started {
            warn!("scheduler already started; ignoring");
            return SchedulerStep::default();
        }
        self.started = true;

        let mut manager = StateManager::new(&self.dependents, &mut self.jobs);
        manager.mark_all_pending();
        let newly_scheduled = manager.collect_new_ready_jobs(self.options.max_parallel);
        debug!(jobs = self.jobs.len(), "scheduler: run started");

        let run_just_finished = self.maybe_finish_run();
        SchedulerStep {
            newly_scheduled,
            run_just_finished,
            ..SchedulerStep::default()
        }
    }

    /// Manual-step variant of `handle_completion`.
    pub fn step_completion(&mut self, job: JobId, outcome: JobOutcome) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        let Some(info) = self.jobs.get_mut(&job) else {
            warn!(job = %job, "completion for unknown job; ignoring");
            return step;
        };
        if info.run_state != Some(RunState::Running) {
            warn!(job = %info.label, state = ?info.run_state, "completion for job that is not running; ignoring");
            return step;
        }

        match outcome {
            JobOutcome::Success => {
                info.run_state = Some(RunState::DoneSuccess);
                debug!(job = %info.label, "job completed successfully");
            }
            JobOutcome::Failed(code) => {
                info.run_state = Some(RunState::DoneFailed);
                warn!(
                    job = %info.label,
                    rule = %info.rule,
                    exit_code = code,
                    "job failed; blocking its dependents"
                );
                step.newly_failed.push(job);

                let mut manager = StateManager::new(&self.dependents, &mut self.jobs);
                step.newly_blocked = manager.mark_dependents_blocked(job);
                if self.options.fail_fast {
                    let mut rest = manager.block_all_pending();
                    if !rest.is_empty() {
                        info!(blocked = rest.len(), "fail-fast: not starting remaining jobs");
                    }
                    step.newly_blocked.append(&mut rest);
                }
            }
        }

        let mut manager = StateManager::new(&self.dependents, &mut self.jobs);
        step.newly_scheduled = manager.collect_new_ready_jobs(self.options.max_parallel);
        step.run_just_finished = self.maybe_finish_run();
        step
    }

    /// Stop the run: block every pending job. Running jobs are left for the
    /// executor to cancel.
    pub fn abort(&mut self) -> Vec<JobId> {
        let mut manager = StateManager::new(&self.dependents, &mut self.jobs);
        let blocked = manager.block_all_pending();
        self.maybe_finish_run();
        blocked
    }

    /// Determine whether all jobs are terminal and mark the run finished.
    ///
    /// Returns `true` if this call transitioned the scheduler to finished.
    fn maybe_finish_run(&mut self) -> bool {
        if !self.started || self.finished {
            return false;
        }

        let manager = StateManager::new(&self.dependents, &mut self.jobs);
        if manager.all_jobs_terminal() {
            info!("scheduler: all jobs terminal; run finished");
            self.finished = true;
            true
        } else {
            false
        }
    }
}
