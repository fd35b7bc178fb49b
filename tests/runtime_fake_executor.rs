// tests/runtime_fake_executor.rs

mod common;
use crate::common::builders::{RuleBuilder, WorkflowBuilder};
use crate::common::fake_executor::{run_with_fake_executor, FakeExecutor};
use crate::common::{init_tracing, plan_for, with_timeout};

use std::error::Error;
use std::sync::{Arc, Mutex};

use fixturedag::config::Workflow;
use fixturedag::dag::{ForceMode, Scheduler, SchedulerOptions};
use fixturedag::engine::{CoreRuntime, RunSummary, Runtime, RuntimeEvent};
use fixturedag::fs::mock::MockFileSystem;
use tokio::sync::mpsc;

type TestResult = Result<(), Box<dyn Error>>;

/// prepare -> {left, right} -> merge, with `all` over merge and an
/// unrelated `side` job.
fn diamond() -> Workflow {
    WorkflowBuilder::new()
        .with_rule(
            "all",
            RuleBuilder::aggregate().input("merged.txt").input("side.txt").build(),
        )
        .with_rule("prepare", RuleBuilder::shell("touch {output}").output("prepared.txt").build())
        .with_rule(
            "left",
            RuleBuilder::shell("touch {output}").input("prepared.txt").output("left.txt").build(),
        )
        .with_rule(
            "right",
            RuleBuilder::shell("touch {output}").input("prepared.txt").output("right.txt").build(),
        )
        .with_rule(
            "merge",
            RuleBuilder::shell("cat {input} > {output}")
                .input("left.txt")
                .input("right.txt")
                .output("merged.txt")
                .build(),
        )
        .with_rule("side", RuleBuilder::shell("touch {output}").output("side.txt").build())
        .build()
}

fn position(executed: &[String], label: &str) -> usize {
    executed
        .iter()
        .position(|l| l == label)
        .unwrap_or_else(|| panic!("{label} was not executed"))
}

#[tokio::test]
async fn all_jobs_run_in_dependency_order() -> TestResult {
    init_tracing();
    let plan = plan_for(&diamond(), &MockFileSystem::new(), &["all"], ForceMode::None);
    let options = SchedulerOptions {
        max_parallel: 3,
        fail_fast: false,
    };

    let (summary, executed) = with_timeout(run_with_fake_executor(&plan, options, &[])).await;

    assert!(summary.is_success());
    assert_eq!(summary.succeeded.len(), 5);
    assert_eq!(summary.total(), 5);
    assert_eq!(executed.len(), 5);
    assert!(position(&executed, "prepare") < position(&executed, "left"));
    assert!(position(&executed, "prepare") < position(&executed, "right"));
    assert!(position(&executed, "left") < position(&executed, "merge"));
    assert!(position(&executed, "right") < position(&executed, "merge"));
    Ok(())
}

#[tokio::test]
async fn failing_job_blocks_only_its_dependents() -> TestResult {
    let plan = plan_for(&diamond(), &MockFileSystem::new(), &["all"], ForceMode::None);

    let (summary, executed) =
        with_timeout(run_with_fake_executor(&plan, SchedulerOptions::default(), &["left"])).await;

    assert!(!summary.is_success());
    assert!(!summary.was_interrupted);
    assert_eq!(summary.failed, vec!["left".to_string()]);
    assert_eq!(summary.blocked, vec!["merge".to_string()]);
    assert!(summary.succeeded.contains(&"right".to_string()));
    assert!(summary.succeeded.contains(&"side".to_string()));
    assert!(!executed.contains(&"merge".to_string()));
    assert!(summary.to_string().contains("failed: left"));
    Ok(())
}

#[tokio::test]
async fn fail_fast_skips_independent_work() -> TestResult {
    let plan = plan_for(&diamond(), &MockFileSystem::new(), &["all"], ForceMode::None);
    let options = SchedulerOptions {
        max_parallel: 1,
        fail_fast: true,
    };

    let (summary, executed) = with_timeout(run_with_fake_executor(&plan, options, &["prepare"])).await;

    assert_eq!(executed, vec!["prepare".to_string()]);
    assert_eq!(summary.failed, vec!["prepare".to_string()]);
    assert_eq!(summary.blocked.len(), 4);
    Ok(())
}

#[tokio::test]
async fn runtime_shuts_down_executor_when_run_ends() -> TestResult {
    let plan = plan_for(&diamond(), &MockFileSystem::new(), &["side.txt"], ForceMode::None);
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx, Arc::clone(&executed));
    let shut_down = executor.shutdown_flag();

    let core = CoreRuntime::new(Scheduler::from_plan(&plan, SchedulerOptions::default()));
    let summary = with_timeout(Runtime::new(core, rx, executor).run()).await?;

    assert_eq!(summary.succeeded, vec!["side".to_string()]);
    assert!(*shut_down.lock().unwrap());
    Ok(())
}

#[tokio::test]
async fn empty_plan_returns_empty_summary() -> TestResult {
    let fs = MockFileSystem::new();
    for file in ["prepared.txt", "left.txt", "right.txt", "merged.txt", "side.txt"] {
        fs.add_file(file, "");
    }
    let plan = plan_for(&diamond(), &fs, &["all"], ForceMode::None);

    let (summary, executed) =
        with_timeout(run_with_fake_executor(&plan, SchedulerOptions::default(), &[])).await;

    assert_eq!(summary, RunSummary::default());
    assert!(executed.is_empty());
    Ok(())
}

#[test]
fn shutdown_request_interrupts_the_run() {
    let plan = plan_for(&diamond(), &MockFileSystem::new(), &["all"], ForceMode::None);
    let mut core = CoreRuntime::new(Scheduler::from_plan(&plan, SchedulerOptions::default()));

    let step = core.start();
    assert!(step.keep_running);

    let step = core.step(RuntimeEvent::ShutdownRequested);
    assert!(!step.keep_running);
    assert!(core.is_interrupted());

    let summary = core.summary();
    assert!(summary.was_interrupted);
    assert_eq!(summary.interrupted, vec!["prepare".to_string()]);
    assert_eq!(summary.blocked.len(), 4);
}
