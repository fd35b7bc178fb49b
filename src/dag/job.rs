// src/dag/job.rs

//! Jobs: one rule instantiated with concrete wildcard values.

use std::collections::BTreeMap;
use std::fmt;

use crate::rules::{NamedPath, Wildcards};

/// Index of a job inside its [`JobGraph`](crate::dag::JobGraph).
///
/// Jobs are numbered in resolution order, which is also a valid topological
/// order: a job is only created after all of its dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub usize);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What running a job does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobAction {
    /// Fully rendered shell command.
    Shell(String),
    /// Paths to remove before creating the job's outputs as markers.
    Remove(Vec<String>),
    /// No action; the job only exists to pull in its inputs.
    Aggregate,
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub rule: String,
    pub wildcards: Wildcards,
    pub inputs: Vec<NamedPath>,
    pub outputs: Vec<NamedPath>,
    pub params: BTreeMap<String, String>,
    pub env: Option<String>,
    pub action: JobAction,
}

impl Job {
    pub fn is_aggregate(&self) -> bool {
        matches!(self.action, JobAction::Aggregate)
    }

    /// Human-readable identity, e.g. `unit_fixture[fixture=lif_exp]`.
    pub fn label(&self) -> String {
        job_label(&self.rule, &self.wildcards)
    }

    pub fn input_paths(&self) -> impl Iterator<Item = &str> {
        self.inputs.iter().map(|p| p.path.as_str())
    }

    pub fn output_paths(&self) -> impl Iterator<Item = &str> {
        self.outputs.iter().map(|p| p.path.as_str())
    }
}

pub(crate) fn job_label(rule: &str, wildcards: &Wildcards) -> String {
    if wildcards.is_empty() {
        return rule.to_string();
    }
    let bound: Vec<String> = wildcards.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{rule}[{}]", bound.join(","))
}
