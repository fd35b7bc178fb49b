// src/dag/state_manager.rs

//! Per-run state management for jobs in the scheduler.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, info, warn};

use crate::dag::job::JobId;
use crate::dag::job_info::{JobInfo, RunState, ScheduledJob};

/// Manages per-run state transitions for jobs.
pub struct StateManager<'a> {
    dependents: &'a BTreeMap<JobId, Vec<JobId>>,
    jobs: &'a mut BTreeMap<JobId, JobInfo>,
}

impl<'a> StateManager<'a> {
    pub fn new(
        dependents: &'a BTreeMap<JobId, Vec<JobId>>,
        jobs: &'a mut BTreeMap<JobId, JobInfo>,
    ) -> Self {
        Self { dependents, jobs }
    }

    /// Mark every planned job `Pending`.
    pub fn mark_all_pending(&mut self) {
        for info in self.jobs.values_mut() {
            info.run_state = Some(RunState::Pending);
        }
    }

    pub fn running_count(&self) -> usize {
        self.jobs
            .values()
            .filter(|info| info.run_state == Some(RunState::Running))
            .count()
    }

    /// Mark all transitive dependents of a failed job as `Blocked`.
    ///
    /// Returns the jobs that were newly blocked (excluding the failed job
    /// itself).
    pub fn mark_dependents_blocked(&mut self, failed: JobId) -> Vec<JobId> {
        let mut stack: Vec<JobId> = self.dependents.get(&failed).cloned().unwrap_or_default();
        let mut visited: HashSet<JobId> = HashSet::new();
        let mut newly_blocked = Vec::new();

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            if let Some(info) = self.jobs.get_mut(&id) {
                if info.run_state == Some(RunState::Pending) {
                    info.run_state = Some(RunState::Blocked);
                    debug!(job = %info.label, "blocking dependent due to upstream failure");
                    newly_blocked.push(id);
                }
                if let Some(next) = self.dependents.get(&id) {
                    stack.extend(next.iter().copied());
                }
            }
        }

        newly_blocked.sort();
        newly_blocked
    }

    /// Block every job still `Pending` (fail-fast and shutdown).
    pub fn block_all_pending(&mut self) -> Vec<JobId> {
        let mut blocked = Vec::new();
        for info in self.jobs.values_mut() {
            if info.run_state == Some(RunState::Pending) {
                info.run_state = Some(RunState::Blocked);
                blocked.push(info.id);
            }
        }
        blocked
    }

    /// Collect `Pending` jobs whose dependencies all succeeded, mark them
    /// `Running`, and return them, without exceeding `max_parallel` running
    /// jobs. Jobs are picked in job order.
    pub fn collect_new_ready_jobs(&mut self, max_parallel: usize) -> Vec<ScheduledJob> {
        let free = max_parallel.max(1).saturating_sub(self.running_count());
        if free == 0 {
            return Vec::new();
        }

        // Decide first, then mutate to avoid borrowing issues.
        let candidates: Vec<JobId> = {
            let ro = ReadOnlyStateManager::new(&*self.jobs);
            self.jobs
                .values()
                .filter(|info| info.run_state == Some(RunState::Pending) && ro.deps_satisfied_for_info(info))
                .map(|info| info.id)
                .take(free)
                .collect()
        };

        let mut ready = Vec::new();
        for id in candidates {
            if let Some(info) = self.jobs.get_mut(&id) {
                info!(job = %info.label, "scheduling job");
                info.run_state = Some(RunState::Running);
                ready.push(ScheduledJob::from_job_info(info));
            }
        }

        ready
    }

    /// Check if all jobs are in a terminal state.
    pub fn all_jobs_terminal(&self) -> bool {
        self.jobs
            .values()
            .all(|info| info.run_state.is_none_or(RunState::is_terminal))
    }
}

/// A read-only view for checking dependency satisfaction.
///
/// This is used when we only have shared access to the jobs map (e.g. in
/// `Scheduler::deps_satisfied`).
pub struct ReadOnlyStateManager<'a> {
    jobs: &'a BTreeMap<JobId, JobInfo>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(jobs: &'a BTreeMap<JobId, JobInfo>) -> Self {
        Self { jobs }
    }

    /// A job is ready once every planned dependency finished successfully.
    /// `info.deps` only lists planned jobs, so an id missing from the map
    /// is a bookkeeping error and keeps the job waiting.
    pub fn deps_satisfied_for_info(&self, info: &JobInfo) -> bool {
        info.deps.iter().all(|dep| match self.jobs.get(dep) {
            Some(d) => d.run_state == Some(RunState::DoneSuccess),
            None => {
                warn!(job = %info.label, dep = %dep, "dependency missing from jobs map");
                false
            }
        })
    }
}
