// src/exec/job_runner.rs

//! Individual job runner.

use std::process::Stdio;

use anyhow::{anyhow, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::dag::{JobAction, ScheduledJob};
use crate::engine::{JobOutcome, RuntimeEvent};
use crate::exec::builtin::remove_then_mark;
use crate::exec::command::{command_line, shell_command};
use crate::exec::ExecOptions;

/// Run a single job and emit a `JobCompleted` event with its outcome.
///
/// - Errors (spawn failure, missing outputs, failed cleanup) are logged and
///   reported as `Failed(-1)`.
/// - If the cancel channel fires (shutdown), the child process is killed,
///   its partial outputs are removed and **no** `JobCompleted` event is sent.
///   A cleanup that already started runs to completion first.
pub async fn run_job(
    job: ScheduledJob,
    options: ExecOptions,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    cancel_rx: oneshot::Receiver<()>,
) {
    let id = job.id;
    let label = job.label.clone();

    let outcome = match run_job_inner(&job, &options, cancel_rx).await {
        Ok(Some(outcome)) => outcome,
        Ok(None) => return,
        Err(err) => {
            error!(job = %label, error = %format!("{err:#}"), "job execution error");
            JobOutcome::Failed(-1)
        }
    };

    if outcome != JobOutcome::Success {
        remove_partial_outputs(&job, &options);
    }

    if runtime_tx
        .send(RuntimeEvent::JobCompleted { job: id, outcome })
        .await
        .is_err()
    {
        debug!(job = %label, "runtime gone before completion could be reported");
    }
}

/// Returns `None` when the job was cancelled.
async fn run_job_inner(
    job: &ScheduledJob,
    options: &ExecOptions,
    cancel_rx: oneshot::Receiver<()>,
) -> Result<Option<JobOutcome>> {
    match &job.action {
        JobAction::Shell(cmd) => run_shell(job, cmd, options, cancel_rx).await,
        JobAction::Remove(paths) => run_remove(job, paths, options, cancel_rx).await,
        JobAction::Aggregate => {
            // Aggregates are never planned; treat a stray one as a no-op.
            warn!(job = %job.label, "aggregate job dispatched; nothing to do");
            Ok(Some(JobOutcome::Success))
        }
    }
}

async fn run_shell(
    job: &ScheduledJob,
    cmd: &str,
    options: &ExecOptions,
    mut cancel_rx: oneshot::Receiver<()>,
) -> Result<Option<JobOutcome>> {
    for output in &job.outputs {
        if let Some(parent) = options.resolve(output).parent() {
            if !parent.as_os_str().is_empty() {
                options.fs.create_dir_all(parent)?;
            }
        }
    }

    let line = command_line(cmd, job.env.as_deref(), options)?;
    info!(job = %job.label, cmd = %line, "starting job process");

    let mut command = shell_command(&line, &options.workdir, job.env.as_deref());
    command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .with_context(|| format!("spawning process for job '{}'", job.label))?;

    if let Some(stdout) = child.stdout.take() {
        let label = job.label.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(job = %label, "stdout: {}", line);
            }
        });
    }

    // Always consume stderr so buffers don't fill.
    if let Some(stderr) = child.stderr.take() {
        let label = job.label.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!(job = %label, "stderr: {}", line);
            }
        });
    }

    tokio::select! {
        status_res = child.wait() => {
            let status = status_res
                .with_context(|| format!("waiting for process of job '{}'", job.label))?;

            let code = status.code().unwrap_or(-1);
            info!(
                job = %job.label,
                exit_code = code,
                success = status.success(),
                "job process exited"
            );

            if !status.success() {
                return Ok(Some(JobOutcome::Failed(code)));
            }

            let missing: Vec<&str> = job
                .outputs
                .iter()
                .filter(|o| !options.fs.exists(&options.resolve(o)))
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                return Err(anyhow!(
                    "job '{}' exited successfully but did not create: {}",
                    job.label,
                    missing.join(", ")
                ));
            }

            Ok(Some(JobOutcome::Success))
        }

        cancel = &mut cancel_rx => {
            match cancel {
                Ok(()) => {
                    info!(job = %job.label, "cancellation requested; killing process");
                    if let Err(e) = child.kill().await {
                        warn!(job = %job.label, error = %e, "failed to kill child process on cancellation");
                    }
                }
                Err(e) => {
                    debug!(job = %job.label, error = %e, "cancel channel closed without explicit cancellation");
                    // Child will be killed on drop due to kill_on_drop(true).
                }
            }
            remove_partial_outputs(job, options);
            Ok(None)
        }
    }
}

async fn run_remove(
    job: &ScheduledJob,
    paths: &[String],
    options: &ExecOptions,
    mut cancel_rx: oneshot::Receiver<()>,
) -> Result<Option<JobOutcome>> {
    info!(job = %job.label, paths = paths.len(), "running cleanup");

    let fs = options.fs.clone();
    let workdir = options.workdir.clone();
    let paths = paths.to_vec();
    let markers = job.outputs.clone();
    let mut handle = tokio::task::spawn_blocking(move || remove_then_mark(fs.as_ref(), &workdir, &paths, &markers));

    tokio::select! {
        joined = &mut handle => {
            joined.context("cleanup task panicked")??;
            Ok(Some(JobOutcome::Success))
        }
        _ = &mut cancel_rx => {
            // Blocking work cannot be aborted; wait so nothing is written
            // after the executor has shut down.
            info!(job = %job.label, "cancellation requested; waiting for cleanup to finish");
            match handle.await {
                Ok(Ok(())) => debug!(job = %job.label, "cleanup finished after cancellation"),
                Ok(Err(e)) => warn!(job = %job.label, error = %format!("{e:#}"), "cleanup failed after cancellation"),
                Err(e) => warn!(job = %job.label, error = %e, "cleanup task panicked after cancellation"),
            }
            Ok(None)
        }
    }
}

/// Delete whatever outputs a failed or cancelled job left behind, so the
/// next run does not mistake them for fresh results.
fn remove_partial_outputs(job: &ScheduledJob, options: &ExecOptions) {
    if !matches!(job.action, JobAction::Shell(_)) {
        return;
    }
    for output in &job.outputs {
        let path = options.resolve(output);
        if !options.fs.exists(&path) {
            continue;
        }
        match options.fs.remove(&path) {
            Ok(()) => info!(job = %job.label, output = %output, "removed incomplete output"),
            Err(e) => warn!(job = %job.label, output = %output, error = %format!("{e:#}"), "failed to remove incomplete output"),
        }
    }
}
