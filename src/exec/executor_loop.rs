// src/exec/executor_loop.rs

//! Main executor loop that manages running jobs.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::dag::{JobId, ScheduledJob};
use crate::engine::RuntimeEvent;
use crate::exec::job_runner::run_job;
use crate::exec::ExecOptions;

/// A dispatched job: its task, plus the sender that cancels it on shutdown.
struct ActiveJob {
    cancel: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

/// Spawn the background executor loop.
///
/// The returned `mpsc::Sender<ScheduledJob>` is what `RealExecutorBackend`
/// uses to hand jobs over. Each scheduled job is executed in its own Tokio
/// task, so jobs run in parallel up to the scheduler's limit.
///
/// Closing the sender shuts the loop down: jobs still running are cancelled
/// and awaited before the returned handle completes.
pub fn spawn_executor(
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    options: ExecOptions,
) -> (mpsc::Sender<ScheduledJob>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<ScheduledJob>(32);

    let handle = tokio::spawn(async move {
        info!("executor loop started");

        let mut active: HashMap<JobId, ActiveJob> = HashMap::new();

        while let Some(job) = rx.recv().await {
            active.retain(|_, a| !a.handle.is_finished());
            handle_scheduled_job(job, &mut active, &options, &runtime_tx);
        }

        cancel_active_jobs(active).await;
        info!("executor loop finished (channel closed)");
    });

    (tx, handle)
}

/// Handle a newly scheduled job.
fn handle_scheduled_job(
    job: ScheduledJob,
    active: &mut HashMap<JobId, ActiveJob>,
    options: &ExecOptions,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) {
    if active.contains_key(&job.id) {
        warn!(job = %job.label, "job is already running; ignoring new scheduling request");
        return;
    }

    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    let id = job.id;
    let label = job.label.clone();
    let rt_tx = runtime_tx.clone();
    let options = options.clone();

    let handle = tokio::spawn(async move {
        run_job(job, options, rt_tx, cancel_rx).await;
        debug!(job = %label, "job runner future finished");
    });

    active.insert(
        id,
        ActiveJob {
            cancel: Some(cancel_tx),
            handle,
        },
    );
}

/// Cancel every job that is still running, then wait for all of them to
/// remove their partial outputs.
async fn cancel_active_jobs(active: HashMap<JobId, ActiveJob>) {
    let mut pending = Vec::new();
    for (id, mut job) in active {
        if job.handle.is_finished() {
            continue;
        }
        info!(job = %id, "cancelling running job");
        if let Some(cancel) = job.cancel.take() {
            if cancel.send(()).is_err() {
                debug!(job = %id, "job already finished while cancelling");
            }
        }
        pending.push((id, job.handle));
    }

    for (id, handle) in pending {
        if let Err(e) = handle.await {
            warn!(job = %id, error = %e, "job task ended abnormally");
        }
    }
}
