// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod rules;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, Workflow};
use crate::dag::{resolve, ExecutionPlan, Scheduler, SchedulerOptions};
use crate::engine::{CoreRuntime, RunSummary, Runtime, RuntimeEvent};
use crate::errors::{FixturedagError, Result};
use crate::exec::{ExecOptions, RealExecutorBackend};
use crate::fs::RealFileSystem;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - workflow loading and config layering
/// - target resolution and freshness planning
/// - scheduler / runtime / executor
/// - Ctrl-C handling
///
/// A run with failed jobs ends in [`FixturedagError::JobsFailed`].
pub async fn run(args: CliArgs) -> Result<RunSummary> {
    let mut workflow = load_and_validate(&args.workflow, &args.config)?;
    if let Some(dir) = &args.directory {
        workflow = workflow.with_workdir(dir.clone());
    }
    debug!(workdir = ?workflow.workdir(), rules = workflow.registry().len(), "workflow loaded");

    if args.list {
        print_rules(&workflow);
        return Ok(RunSummary::default());
    }

    if args.use_envs && workflow.env_command().is_none() {
        return Err(FixturedagError::ConfigError(
            "--use-envs requires [workflow].env_command".to_string(),
        ));
    }

    let targets = if args.targets.is_empty() {
        vec![workflow.default_target().to_string()]
    } else {
        args.targets.clone()
    };
    info!(?targets, "resolving targets");

    let fs = RealFileSystem;
    let graph = resolve(&workflow, &fs, &targets)?;
    let plan = ExecutionPlan::build(graph, &fs, workflow.workdir(), args.force_mode())?;

    if args.dry_run {
        print_dry_run(&plan);
        return Ok(RunSummary::default());
    }

    if plan.is_empty() {
        info!("nothing to be done; all targets are up to date");
        return Ok(RunSummary::default());
    }

    let exec_options = ExecOptions::new(workflow.workdir())
        .with_envs(workflow.env_command().cloned(), args.use_envs);
    let scheduler_options = SchedulerOptions {
        max_parallel: args.jobs,
        fail_fast: args.fail_fast,
    };

    let summary = execute_plan(&plan, exec_options, scheduler_options).await?;
    info!(%summary, "run finished");

    if !summary.failed.is_empty() {
        return Err(FixturedagError::JobsFailed(summary.failed));
    }
    if summary.was_interrupted {
        return Err(FixturedagError::Other(anyhow!("run interrupted: {summary}")));
    }
    Ok(summary)
}

/// Run every job of `plan` with the real executor until the run finishes
/// or Ctrl-C is pressed.
pub async fn execute_plan(
    plan: &ExecutionPlan,
    exec_options: ExecOptions,
    scheduler_options: SchedulerOptions,
) -> Result<RunSummary> {
    let scheduler = Scheduler::from_plan(plan, scheduler_options);

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let executor = RealExecutorBackend::new(rt_tx.clone(), exec_options);

    // Ctrl-C → graceful shutdown.
    let ctrl_c = {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        })
    };
    drop(rt_tx);

    let core = CoreRuntime::new(scheduler);
    let runtime = Runtime::new(core, rt_rx, executor);
    let result = runtime.run().await;

    ctrl_c.abort();
    result
}

/// `--list`: print every rule with its outputs.
fn print_rules(workflow: &Workflow) {
    println!("rules ({}):", workflow.registry().len());
    for rule in workflow.registry().rules() {
        let kind = match &rule.action {
            Some(crate::rules::RuleAction::Shell(_)) => "shell",
            Some(crate::rules::RuleAction::Remove(_)) => "remove",
            None => "aggregate",
        };
        let marker = if rule.name == workflow.default_target() {
            " (default)"
        } else {
            ""
        };
        println!("  - {} [{kind}]{marker}", rule.name);
        for output in &rule.outputs {
            println!("      output: {}", output.pattern.source());
        }
        if let Some(env) = &rule.env {
            println!("      env: {env}");
        }
    }
}

/// `--dry-run`: print the jobs that would run, in order, with the reason.
fn print_dry_run(plan: &ExecutionPlan) {
    println!("fixturedag dry-run");
    if plan.is_empty() {
        println!("nothing to be done; all targets are up to date");
        return;
    }

    println!("jobs ({}):", plan.len());
    for job in plan.jobs_to_run() {
        println!("  - {}", job.label());
        if let Some(reason) = plan.reason(job.id) {
            println!("      reason: {reason}");
        }
        let outputs: Vec<&str> = job.output_paths().collect();
        if !outputs.is_empty() {
            println!("      output: {}", outputs.join(" "));
        }
        match &job.action {
            crate::dag::JobAction::Shell(cmd) => println!("      shell: {cmd}"),
            crate::dag::JobAction::Remove(paths) => println!("      remove: {}", paths.join(" ")),
            crate::dag::JobAction::Aggregate => {}
        }
    }

    debug!("dry-run complete (no execution)");
}
