// src/exec/backend.rs

//! The seam between the runtime and whatever runs jobs.
//!
//! [`RealExecutorBackend`] feeds the process-spawning loop in
//! [`executor_loop`](super::executor_loop). Tests plug in an executor that
//! answers with `JobCompleted` events straight away.

use std::future::Future;
use std::pin::Pin;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::dag::ScheduledJob;
use crate::engine::RuntimeEvent;
use crate::errors::{Error, Result};

use super::executor_loop::spawn_executor;
use super::ExecOptions;

/// Runs scheduled jobs and reports each outcome as a
/// [`RuntimeEvent::JobCompleted`].
pub trait ExecutorBackend: Send {
    /// Start the given jobs. Completion is reported through events, not
    /// through the returned future.
    fn spawn_ready_jobs(
        &mut self,
        jobs: Vec<ScheduledJob>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Stop accepting jobs, cancel whatever is still running and wait for
    /// it to finish. Called once when the run ends.
    fn shutdown(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async { Ok(()) })
    }
}

/// Forwards jobs to the background loop started by [`spawn_executor`].
pub struct RealExecutorBackend {
    tx: Option<mpsc::Sender<ScheduledJob>>,
    handle: Option<JoinHandle<()>>,
}

impl RealExecutorBackend {
    /// Spawns the executor loop right away.
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, options: ExecOptions) -> Self {
        let (tx, handle) = spawn_executor(runtime_tx, options);
        Self {
            tx: Some(tx),
            handle: Some(handle),
        }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_ready_jobs(
        &mut self,
        jobs: Vec<ScheduledJob>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.tx.clone();

        Box::pin(async move {
            let tx = tx.ok_or_else(|| anyhow!("executor already shut down"))?;
            for job in jobs {
                tx.send(job).await.map_err(Error::from)?;
            }
            Ok(())
        })
    }

    fn shutdown(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // The loop cancels running jobs once its channel closes.
        self.tx.take();
        let handle = self.handle.take();

        Box::pin(async move {
            if let Some(handle) = handle {
                handle.await.map_err(Error::from)?;
            }
            Ok(())
        })
    }
}
