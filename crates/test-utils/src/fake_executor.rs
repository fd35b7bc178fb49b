use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use fixturedag::dag::{ExecutionPlan, ScheduledJob, Scheduler, SchedulerOptions};
use fixturedag::engine::{CoreRuntime, JobOutcome, RunSummary, Runtime, RuntimeEvent};
use fixturedag::exec::ExecutorBackend;
use fixturedag::errors::Result;

/// A fake executor that:
/// - records which jobs were "run" (by label)
/// - immediately reports JobCompleted for each scheduled job, failing the
///   jobs of rules registered with [`FakeExecutor::failing_rule`].
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    failing: HashSet<String>,
    shut_down: Arc<Mutex<bool>>,
}

impl FakeExecutor {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        executed: Arc<Mutex<Vec<String>>>,
    ) -> Self {
        Self {
            runtime_tx,
            executed,
            failing: HashSet::new(),
            shut_down: Arc::new(Mutex::new(false)),
        }
    }

    pub fn failing_rule(mut self, rule: &str) -> Self {
        self.failing.insert(rule.to_string());
        self
    }

    /// Flag set once the runtime has called `shutdown`.
    pub fn shutdown_flag(&self) -> Arc<Mutex<bool>> {
        Arc::clone(&self.shut_down)
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_jobs(
        &mut self,
        jobs: Vec<ScheduledJob>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let failing = self.failing.clone();

        Box::pin(async move {
            for job in jobs {
                {
                    let mut guard = executed.lock().unwrap();
                    guard.push(job.label.clone());
                }

                let outcome = if failing.contains(&job.rule) {
                    JobOutcome::Failed(1)
                } else {
                    JobOutcome::Success
                };

                tx.send(RuntimeEvent::JobCompleted { job: job.id, outcome })
                    .await
                    .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }

    fn shutdown(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let flag = Arc::clone(&self.shut_down);
        Box::pin(async move {
            *flag.lock().unwrap() = true;
            Ok(())
        })
    }
}

/// Run `plan` through the real runtime with a [`FakeExecutor`].
///
/// Returns the summary and the labels of the jobs in dispatch order.
pub async fn run_with_fake_executor(
    plan: &ExecutionPlan,
    options: SchedulerOptions,
    failing_rules: &[&str],
) -> (RunSummary, Vec<String>) {
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);
    let executed = Arc::new(Mutex::new(Vec::new()));

    let mut executor = FakeExecutor::new(tx, Arc::clone(&executed));
    for rule in failing_rules {
        executor = executor.failing_rule(rule);
    }

    let core = CoreRuntime::new(Scheduler::from_plan(plan, options));
    let summary = Runtime::new(core, rx, executor)
        .run()
        .await
        .expect("runtime failed");

    let executed = executed.lock().unwrap().clone();
    (summary, executed)
}
