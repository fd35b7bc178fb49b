// src/dag/graph.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::job::{Job, JobId};
use crate::errors::{FixturedagError, Result};

/// Resolved job graph.
///
/// Nodes are jobs; an edge `dep -> job` means `job` consumes a file that
/// `dep` produces.
#[derive(Debug, Clone)]
pub struct JobGraph {
    jobs: Vec<Job>,
    deps: Vec<Vec<JobId>>,
    targets: Vec<JobId>,
}

impl JobGraph {
    /// Build from jobs indexed by `JobId` and their direct dependencies.
    pub fn new(jobs: Vec<Job>, deps: Vec<Vec<JobId>>, targets: Vec<JobId>) -> Self {
        Self { jobs, deps, targets }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(id.0)
    }

    /// Jobs created for the requested targets.
    pub fn targets(&self) -> &[JobId] {
        &self.targets
    }

    /// Jobs of the given rule, in job order.
    pub fn jobs_of_rule<'a>(&'a self, rule: &'a str) -> impl Iterator<Item = &'a Job> + 'a {
        self.jobs.iter().filter(move |j| j.rule == rule)
    }

    /// Immediate dependencies of a job.
    pub fn dependencies_of(&self, id: JobId) -> &[JobId] {
        self.deps.get(id.0).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Topological order, dependencies first.
    pub fn topological_order(&self) -> Result<Vec<JobId>> {
        let mut graph: DiGraphMap<JobId, ()> = DiGraphMap::new();

        for job in &self.jobs {
            graph.add_node(job.id);
        }
        for job in &self.jobs {
            for dep in self.dependencies_of(job.id) {
                graph.add_edge(*dep, job.id, ());
            }
        }

        toposort(&graph, None).map_err(|cycle| {
            let label = self
                .job(cycle.node_id())
                .map(Job::label)
                .unwrap_or_else(|| cycle.node_id().to_string());
            FixturedagError::CircularDependency(format!("cycle in job graph involving {label}"))
        })
    }
}
