// src/dag/plan.rs

//! Freshness planning: decide which resolved jobs actually need to run.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::time::SystemTime;

use tracing::debug;

use crate::dag::graph::JobGraph;
use crate::dag::job::{Job, JobAction, JobId};
use crate::errors::Result;
use crate::fs::FileSystem;

/// Which jobs to run regardless of freshness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForceMode {
    #[default]
    None,
    /// Jobs created directly for the requested targets.
    Targets,
    /// Every non-aggregate job in the graph.
    All,
}

/// Why a job is part of the execution plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunReason {
    Forced,
    /// The job has an action but declares no outputs, so it always runs.
    NoOutput,
    MissingOutput(String),
    /// An upstream job (by label) is going to run.
    UpstreamUpdated(String),
    /// This input is newer than the oldest output.
    UpdatedInput(String),
    /// A cleanup job still has this path to delete.
    PendingRemoval(String),
}

impl fmt::Display for RunReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunReason::Forced => write!(f, "forced"),
            RunReason::NoOutput => write!(f, "rule has no output files"),
            RunReason::MissingOutput(p) => write!(f, "missing output {p}"),
            RunReason::UpstreamUpdated(job) => write!(f, "upstream job {job} will run"),
            RunReason::UpdatedInput(p) => write!(f, "updated input {p}"),
            RunReason::PendingRemoval(p) => write!(f, "{p} still exists"),
        }
    }
}

/// Resolved graph plus the subset of jobs that need to run.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    graph: JobGraph,
    reasons: HashMap<JobId, RunReason>,
    order: Vec<JobId>,
}

impl ExecutionPlan {
    /// Check every job's outputs against its inputs, dependencies first.
    ///
    /// A job runs when forced, when it has no outputs, when an output is
    /// missing, when an upstream job runs, or when an input is strictly
    /// newer than its oldest output. Cleanup jobs also run while any of
    /// their paths is still on disk. Aggregate jobs never run.
    pub fn build(graph: JobGraph, fs: &dyn FileSystem, workdir: &Path, force: ForceMode) -> Result<Self> {
        let mut reasons: HashMap<JobId, RunReason> = HashMap::new();

        for id in graph.topological_order()? {
            let Some(job) = graph.job(id) else { continue };
            if job.is_aggregate() {
                continue;
            }

            let forced = match force {
                ForceMode::All => true,
                ForceMode::Targets => graph.targets().contains(&id),
                ForceMode::None => false,
            };

            let reason = if forced {
                Some(RunReason::Forced)
            } else {
                stale_reason(&graph, job, &reasons, fs, workdir)?
            };

            if let Some(reason) = reason {
                debug!(job = %job.label(), %reason, "job needs to run");
                reasons.insert(id, reason);
            } else {
                debug!(job = %job.label(), "job is up to date");
            }
        }

        let mut order: Vec<JobId> = reasons.keys().copied().collect();
        order.sort();

        Ok(Self {
            graph,
            reasons,
            order,
        })
    }

    pub fn graph(&self) -> &JobGraph {
        &self.graph
    }

    /// Jobs to run, dependencies before dependents.
    pub fn order(&self) -> &[JobId] {
        &self.order
    }

    pub fn jobs_to_run(&self) -> impl Iterator<Item = &Job> {
        self.order.iter().filter_map(|id| self.graph.job(*id))
    }

    pub fn will_run(&self, id: JobId) -> bool {
        self.reasons.contains_key(&id)
    }

    pub fn reason(&self, id: JobId) -> Option<&RunReason> {
        self.reasons.get(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Nearest upstream jobs of `id` that are part of the plan, seen
    /// through aggregate jobs.
    pub fn planned_dependencies_of(&self, id: JobId) -> Vec<JobId> {
        planned_upstream(&self.graph, id, |d| self.will_run(d))
    }
}

fn stale_reason(
    graph: &JobGraph,
    job: &Job,
    planned: &HashMap<JobId, RunReason>,
    fs: &dyn FileSystem,
    workdir: &Path,
) -> Result<Option<RunReason>> {
    if job.outputs.is_empty() {
        return Ok(Some(RunReason::NoOutput));
    }

    let mut oldest_output: Option<SystemTime> = None;
    for output in job.output_paths() {
        match fs.modified(&workdir.join(output))? {
            None => return Ok(Some(RunReason::MissingOutput(output.to_string()))),
            Some(mtime) => {
                oldest_output = Some(oldest_output.map_or(mtime, |o| o.min(mtime)));
            }
        }
    }

    if let JobAction::Remove(paths) = &job.action {
        if let Some(path) = paths.iter().find(|p| fs.exists(&workdir.join(p))) {
            return Ok(Some(RunReason::PendingRemoval(path.clone())));
        }
    }

    if let Some(dep) = planned_upstream(graph, job.id, |d| planned.contains_key(&d)).first() {
        let label = graph.job(*dep).map(Job::label).unwrap_or_else(|| dep.to_string());
        return Ok(Some(RunReason::UpstreamUpdated(label)));
    }

    let Some(oldest_output) = oldest_output else {
        return Ok(None);
    };

    for input in job.input_paths() {
        if let Some(mtime) = fs.modified(&workdir.join(input))? {
            if mtime > oldest_output {
                return Ok(Some(RunReason::UpdatedInput(input.to_string())));
            }
        }
    }

    Ok(None)
}

/// Walk the dependencies of `id`, stopping at planned jobs and passing
/// through aggregates, which never run themselves.
fn planned_upstream(graph: &JobGraph, id: JobId, planned: impl Fn(JobId) -> bool) -> Vec<JobId> {
    let mut found = Vec::new();
    let mut seen = HashSet::new();
    let mut stack: Vec<JobId> = graph.dependencies_of(id).to_vec();

    while let Some(dep) = stack.pop() {
        if !seen.insert(dep) {
            continue;
        }
        if planned(dep) {
            found.push(dep);
        } else if graph.job(dep).is_some_and(Job::is_aggregate) {
            stack.extend_from_slice(graph.dependencies_of(dep));
        }
    }

    found.sort();
    found
}
