// src/dag/resolve.rs

//! Target resolution: turn requested targets into a [`JobGraph`].
//!
//! Resolution walks backwards from each target: a target naming a rule
//! instantiates that rule, a target naming a path instantiates the single
//! rule whose outputs match it. Inputs are resolved recursively the same way.
//! A path no rule produces must already exist on disk.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::config::Workflow;
use crate::dag::graph::JobGraph;
use crate::dag::job::{job_label, Job, JobAction, JobId};
use crate::errors::{FixturedagError, Result};
use crate::fs::FileSystem;
use crate::rules::{normalize_path, Rule, RuleAction, ShellContext, Wildcards};

type JobKey = (String, Wildcards);

/// Resolve `targets` against `workflow`, consulting `fs` for files that no
/// rule produces.
pub fn resolve(workflow: &Workflow, fs: &dyn FileSystem, targets: &[String]) -> Result<JobGraph> {
    let mut resolver = Resolver::new(workflow, fs);
    let mut target_jobs = Vec::new();

    for target in targets {
        if let Some(id) = resolver.request_target(target)? {
            if !target_jobs.contains(&id) {
                target_jobs.push(id);
            }
        }
    }

    debug!(
        targets = ?targets,
        jobs = resolver.jobs.len(),
        "resolved targets into job graph"
    );

    let graph = JobGraph::new(resolver.jobs, resolver.deps, target_jobs);
    // Resolution already rejects cycles; this keeps the graph honest.
    graph.topological_order()?;
    Ok(graph)
}

struct Resolver<'a> {
    workflow: &'a Workflow,
    fs: &'a dyn FileSystem,
    jobs: Vec<Job>,
    deps: Vec<Vec<JobId>>,
    index: HashMap<JobKey, JobId>,
    /// Jobs currently being resolved, outermost first.
    stack: Vec<JobKey>,
}

impl<'a> Resolver<'a> {
    fn new(workflow: &'a Workflow, fs: &'a dyn FileSystem) -> Self {
        Self {
            workflow,
            fs,
            jobs: Vec::new(),
            deps: Vec::new(),
            index: HashMap::new(),
            stack: Vec::new(),
        }
    }

    fn request_target(&mut self, target: &str) -> Result<Option<JobId>> {
        let workflow = self.workflow;
        if let Some(rule) = workflow.registry().get(target) {
            if rule.has_wildcards() {
                return Err(FixturedagError::ConfigError(format!(
                    "rule '{}' has wildcards {:?} and cannot be requested by name; \
                     request one of its output files instead",
                    rule.name,
                    rule.wildcards()
                )));
            }
            return self.instantiate(rule, Wildcards::new()).map(Some);
        }
        self.request_file(target)
    }

    fn request_file(&mut self, path: &str) -> Result<Option<JobId>> {
        let workflow = self.workflow;
        let path = normalize_path(path);

        match workflow.registry().producer_of(&path)? {
            Some((rule, wildcards)) => {
                trace!(path = %path, rule = %rule.name, ?wildcards, "path produced by rule");
                self.instantiate(rule, wildcards).map(Some)
            }
            None => {
                if self.fs.exists(&workflow.workdir().join(&path)) {
                    trace!(path = %path, "path exists and no rule produces it");
                    Ok(None)
                } else {
                    Err(FixturedagError::NoRuleToProduce(path))
                }
            }
        }
    }

    fn instantiate(&mut self, rule: &'a Rule, wildcards: Wildcards) -> Result<JobId> {
        let key: JobKey = (rule.name.clone(), wildcards);
        if let Some(&id) = self.index.get(&key) {
            return Ok(id);
        }

        if let Some(pos) = self.stack.iter().position(|k| *k == key) {
            let chain: Vec<String> = self.stack[pos..]
                .iter()
                .chain(std::iter::once(&key))
                .map(|(rule, wc)| job_label(rule, wc))
                .collect();
            return Err(FixturedagError::CircularDependency(chain.join(" -> ")));
        }

        self.stack.push(key.clone());
        let built = self.build_job(rule, &key.1);
        self.stack.pop();
        let (mut job, deps) = built?;

        let id = JobId(self.jobs.len());
        job.id = id;
        debug!(job = %job.label(), id = %id, deps = deps.len(), "instantiated job");

        self.jobs.push(job);
        self.deps.push(deps);
        self.index.insert(key, id);
        Ok(id)
    }

    fn build_job(&mut self, rule: &'a Rule, wildcards: &Wildcards) -> Result<(Job, Vec<JobId>)> {
        let workflow = self.workflow;
        let config = workflow.config();

        let inputs = rule.render_inputs(wildcards, config)?;
        let mut deps = Vec::new();
        for input in &inputs {
            if let Some(dep) = self.request_file(&input.path)? {
                if !deps.contains(&dep) {
                    deps.push(dep);
                }
            }
        }

        let outputs = rule.render_outputs(wildcards)?;
        let params = rule.render_params(wildcards, config)?;

        let action = match &rule.action {
            None => JobAction::Aggregate,
            Some(RuleAction::Shell(_)) => {
                let ctx = ShellContext {
                    wildcards,
                    inputs: &inputs,
                    outputs: &outputs,
                    params: &params,
                    config,
                };
                JobAction::Shell(rule.render_shell(&ctx)?.unwrap_or_default())
            }
            Some(RuleAction::Remove(_)) => JobAction::Remove(rule.render_removals(wildcards, config)?),
        };

        let job = Job {
            id: JobId(usize::MAX),
            rule: rule.name.clone(),
            wildcards: wildcards.clone(),
            inputs,
            outputs,
            params,
            env: rule.env.clone(),
            action,
        };
        Ok((job, deps))
    }
}
