// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::exec::ExecutorBackend;

use super::core::CoreRuntime;
use super::event_handlers::CoreStep;
use super::summary::RunSummary;
use super::{CoreCommand, RuntimeEvent};

/// Async shell around [`CoreRuntime`] for a single run.
///
/// Job completions and Ctrl-C arrive on `event_rx`; the core decides what
/// happens next and this type carries it out against the executor. The run
/// ends when the core reports that nothing is left to wait for.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
        }
    }

    /// Run until every planned job is terminal or a shutdown was requested,
    /// then shut the executor down and report what happened.
    ///
    /// The executor is shut down even when dispatching fails, so no job
    /// process outlives the run.
    pub async fn run(mut self) -> Result<RunSummary> {
        let result = self.drive().await;
        self.executor.shutdown().await?;
        result?;

        let summary = self.core.summary();
        debug!(%summary, "runtime finished");
        Ok(summary)
    }

    async fn drive(&mut self) -> Result<()> {
        let first = self.core.start();
        if !self.apply(first).await? {
            return Ok(());
        }

        while let Some(event) = self.event_rx.recv().await {
            debug!(?event, "runtime received event");
            let step = self.core.step(event);
            if !self.apply(step).await? {
                return Ok(());
            }
        }

        warn!("event channel closed while jobs were still outstanding");
        Ok(())
    }

    /// Carry out the core's commands. Returns whether to keep waiting for
    /// events.
    async fn apply(&mut self, step: CoreStep) -> Result<bool> {
        for command in step.commands {
            match command {
                CoreCommand::DispatchJobs(jobs) if jobs.is_empty() => {}
                CoreCommand::DispatchJobs(jobs) => {
                    let labels: Vec<&str> = jobs.iter().map(|j| j.label.as_str()).collect();
                    debug!(?labels, "dispatching jobs");
                    self.executor.spawn_ready_jobs(jobs).await?;
                }
                CoreCommand::RequestExit => info!("run complete; stopping runtime"),
            }
        }
        Ok(step.keep_running)
    }
}
