use std::collections::{BTreeSet, HashMap};

use proptest::prelude::*;
use fixturedag::config::Workflow;
use fixturedag::dag::{resolve, ExecutionPlan, ForceMode, JobId, JobRunState, Scheduler, SchedulerOptions};
use fixturedag::engine::JobOutcome;
use fixturedag::fs::mock::MockFileSystem;
use fixturedag_test_utils::builders::{RuleBuilder, WorkflowBuilder};

/// Random acyclic workflow: rule `r{i}` writes `f{i}.txt` and may read the
/// outputs of rules `0..i`. `all` collects every output.
fn workflow_strategy(max_rules: usize) -> impl Strategy<Value = (Workflow, Vec<BTreeSet<usize>>)> {
    (1..=max_rules).prop_flat_map(|num_rules| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..num_rules), num_rules)
            .prop_map(move |raw_deps| {
                let mut builder = WorkflowBuilder::new();
                let mut all = RuleBuilder::aggregate();
                let mut deps_of = Vec::with_capacity(num_rules);

                for (i, potential) in raw_deps.into_iter().enumerate() {
                    let deps: BTreeSet<usize> = if i == 0 {
                        BTreeSet::new()
                    } else {
                        potential.into_iter().map(|d| d % i).collect()
                    };

                    let mut rule = RuleBuilder::shell("touch {output}").output(&format!("f{i}.txt"));
                    for dep in &deps {
                        rule = rule.input(&format!("f{dep}.txt"));
                    }
                    builder = builder.with_rule(&format!("r{i}"), rule.build());
                    all = all.input(&format!("f{i}.txt"));
                    deps_of.push(deps);
                }

                (builder.with_rule("all", all.build()).build(), deps_of)
            })
    })
}

fn rule_index(label: &str) -> usize {
    label[1..].parse().expect("labels look like r{i}")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn scheduler_respects_dependencies_and_parallelism(
        (workflow, deps_of) in workflow_strategy(9),
        max_parallel in 1usize..4,
        failing in proptest::collection::vec(0..9usize, 0..3),
        picks in proptest::collection::vec(any::<usize>(), 0..32),
    ) {
        let fs = MockFileSystem::new();
        let graph = resolve(&workflow, &fs, &["all".to_string()]).expect("acyclic workflow resolves");
        let plan = ExecutionPlan::build(graph, &fs, workflow.workdir(), ForceMode::None).expect("plan");
        prop_assert_eq!(plan.len(), deps_of.len());

        let mut scheduler = Scheduler::from_plan(&plan, SchedulerOptions { max_parallel, fail_fast: false });
        let id_of: HashMap<usize, JobId> = scheduler
            .job_ids()
            .map(|id| (rule_index(scheduler.label_of(id).unwrap_or_default()), id))
            .collect();

        let mut running: Vec<JobId> = Vec::new();
        let mut steps = 0;
        let mut scheduled = scheduler.start();

        loop {
            for job in &scheduled {
                let index = rule_index(&job.label);
                for dep in &deps_of[index] {
                    prop_assert_eq!(scheduler.run_state_of(id_of[dep]), JobRunState::DoneSuccess);
                }
                running.push(job.id);
            }
            prop_assert!(scheduler.running_count() <= max_parallel);

            if running.is_empty() {
                break;
            }
            steps += 1;
            prop_assert!(steps <= deps_of.len(), "more completions than jobs");

            let pick = picks.get(steps).copied().unwrap_or(0) % running.len();
            let job = running.remove(pick);
            let index = rule_index(scheduler.label_of(job).unwrap_or_default());
            let outcome = if failing.contains(&index) {
                JobOutcome::Failed(1)
            } else {
                JobOutcome::Success
            };
            scheduled = scheduler.handle_completion(job, outcome);
        }

        prop_assert!(scheduler.is_finished());

        // Rules are in dependency order, so expected states can be derived
        // front to back.
        let mut expected = Vec::with_capacity(deps_of.len());
        for (i, deps) in deps_of.iter().enumerate() {
            let state = if deps.iter().any(|d| expected[*d] != JobRunState::DoneSuccess) {
                JobRunState::Blocked
            } else if failing.contains(&i) {
                JobRunState::DoneFailed
            } else {
                JobRunState::DoneSuccess
            };
            prop_assert_eq!(scheduler.run_state_of(id_of[&i]), state);
            expected.push(state);
        }
    }
}
