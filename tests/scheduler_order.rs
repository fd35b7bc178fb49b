// tests/scheduler_order.rs

mod common;
use crate::common::builders::{RuleBuilder, WorkflowBuilder};
use crate::common::{init_tracing, plan_for};

use fixturedag::config::Workflow;
use fixturedag::dag::{ExecutionPlan, ForceMode, JobId, JobRunState, Scheduler, SchedulerOptions};
use fixturedag::engine::JobOutcome;
use fixturedag::fs::mock::MockFileSystem;

/// Two independent chains joined by `all`:
/// a1 -> a2 and b1 -> b2.
fn two_chains() -> Workflow {
    let step = |input: Option<&str>, output: &str| {
        let mut rule = RuleBuilder::shell("touch {output}").output(output);
        if let Some(input) = input {
            rule = rule.input(input);
        }
        rule.build()
    };
    WorkflowBuilder::new()
        .with_rule("all", RuleBuilder::aggregate().input("a2.txt").input("b2.txt").build())
        .with_rule("a1", step(None, "a1.txt"))
        .with_rule("a2", step(Some("a1.txt"), "a2.txt"))
        .with_rule("b1", step(None, "b1.txt"))
        .with_rule("b2", step(Some("b1.txt"), "b2.txt"))
        .build()
}

fn plan() -> ExecutionPlan {
    plan_for(&two_chains(), &MockFileSystem::new(), &["all"], ForceMode::None)
}

fn id_of(scheduler: &Scheduler, label: &str) -> JobId {
    scheduler
        .job_ids()
        .find(|id| scheduler.label_of(*id) == Some(label))
        .expect("job in plan")
}

fn labels(jobs: &[fixturedag::dag::ScheduledJob]) -> Vec<&str> {
    jobs.iter().map(|j| j.label.as_str()).collect()
}

#[test]
fn only_jobs_without_pending_dependencies_start() {
    init_tracing();
    let mut scheduler = Scheduler::from_plan(
        &plan(),
        SchedulerOptions {
            max_parallel: 4,
            fail_fast: false,
        },
    );
    assert_eq!(scheduler.job_count(), 4);
    assert!(scheduler.is_idle());

    let first = scheduler.start();
    assert_eq!(labels(&first), vec!["a1", "b1"]);

    let a1 = id_of(&scheduler, "a1");
    let a2 = id_of(&scheduler, "a2");
    assert_eq!(scheduler.deps_satisfied(a2), Some(false));

    let next = scheduler.handle_completion(a1, JobOutcome::Success);
    assert_eq!(labels(&next), vec!["a2"]);
    assert_eq!(scheduler.run_state_of(a2), JobRunState::Running);
}

#[test]
fn parallel_limit_is_respected() {
    let mut scheduler = Scheduler::from_plan(&plan(), SchedulerOptions::default());

    let first = scheduler.start();
    assert_eq!(labels(&first), vec!["a1"]);
    assert_eq!(scheduler.running_count(), 1);

    let mut order = vec![first[0].label.clone()];
    let mut current = first[0].id;
    loop {
        let step = scheduler.step_completion(current, JobOutcome::Success);
        assert!(step.newly_scheduled.len() <= 1);
        assert!(scheduler.running_count() <= 1);
        match step.newly_scheduled.first() {
            Some(job) => {
                order.push(job.label.clone());
                current = job.id;
            }
            None => {
                assert!(step.run_just_finished);
                break;
            }
        }
    }

    assert_eq!(order, vec!["a1", "a2", "b1", "b2"]);
    assert!(scheduler.is_finished());
}

#[test]
fn failure_blocks_dependents_but_not_independent_branches() {
    let mut scheduler = Scheduler::from_plan(
        &plan(),
        SchedulerOptions {
            max_parallel: 2,
            fail_fast: false,
        },
    );
    scheduler.start();
    let a1 = id_of(&scheduler, "a1");
    let a2 = id_of(&scheduler, "a2");
    let b1 = id_of(&scheduler, "b1");
    let b2 = id_of(&scheduler, "b2");

    let step = scheduler.step_completion(a1, JobOutcome::Failed(2));
    assert_eq!(step.newly_failed, vec![a1]);
    assert_eq!(step.newly_blocked, vec![a2]);
    assert!(step.newly_scheduled.is_empty());
    assert!(!scheduler.is_finished());

    let step = scheduler.step_completion(b1, JobOutcome::Success);
    assert_eq!(labels(&step.newly_scheduled), vec!["b2"]);

    let step = scheduler.step_completion(b2, JobOutcome::Success);
    assert!(step.run_just_finished);
    assert_eq!(scheduler.jobs_in_state(JobRunState::DoneSuccess), vec![b1, b2]);
    assert_eq!(scheduler.jobs_in_state(JobRunState::DoneFailed), vec![a1]);
    assert_eq!(scheduler.jobs_in_state(JobRunState::Blocked), vec![a2]);
}

#[test]
fn fail_fast_blocks_everything_pending() {
    let mut scheduler = Scheduler::from_plan(
        &plan(),
        SchedulerOptions {
            max_parallel: 2,
            fail_fast: true,
        },
    );
    scheduler.start();
    let a1 = id_of(&scheduler, "a1");
    let b1 = id_of(&scheduler, "b1");

    let step = scheduler.step_completion(a1, JobOutcome::Failed(1));
    assert_eq!(step.newly_blocked.len(), 2);
    assert!(step.newly_scheduled.is_empty());
    // b1 was already running and is allowed to finish.
    assert_eq!(scheduler.run_state_of(b1), JobRunState::Running);

    let step = scheduler.step_completion(b1, JobOutcome::Success);
    assert!(step.newly_scheduled.is_empty());
    assert!(step.run_just_finished);
}

#[test]
fn abort_blocks_pending_and_leaves_running_jobs() {
    let mut scheduler = Scheduler::from_plan(
        &plan(),
        SchedulerOptions {
            max_parallel: 2,
            fail_fast: false,
        },
    );
    scheduler.start();

    let blocked = scheduler.abort();
    assert_eq!(blocked.len(), 2);
    assert_eq!(scheduler.running_count(), 2);
    assert!(!scheduler.is_finished());

    // Completions after the abort still settle the running jobs.
    let a1 = id_of(&scheduler, "a1");
    let step = scheduler.step_completion(a1, JobOutcome::Success);
    assert!(step.newly_scheduled.is_empty());
}

#[test]
fn stray_completions_are_ignored() {
    let mut scheduler = Scheduler::from_plan(&plan(), SchedulerOptions::default());
    scheduler.start();
    let b2 = id_of(&scheduler, "b2");

    let step = scheduler.step_completion(b2, JobOutcome::Success);
    assert!(step.newly_scheduled.is_empty());
    assert_eq!(scheduler.run_state_of(b2), JobRunState::Pending);

    assert_eq!(scheduler.run_state_of(JobId(999)), JobRunState::NotInRun);
}

#[test]
fn empty_plan_finishes_on_start() {
    let fs = MockFileSystem::new();
    for file in ["a1.txt", "a2.txt", "b1.txt", "b2.txt"] {
        fs.add_file(file, "");
    }
    let plan = plan_for(&two_chains(), &fs, &["all"], ForceMode::None);
    assert!(plan.is_empty());

    let mut scheduler = Scheduler::from_plan(&plan, SchedulerOptions::default());
    let step = scheduler.step_start();
    assert!(step.newly_scheduled.is_empty());
    assert!(step.run_just_finished);
    assert!(scheduler.is_finished());
}
