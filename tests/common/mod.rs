#![allow(dead_code)]

pub use fixturedag_test_utils::builders;
pub use fixturedag_test_utils::fake_executor;
pub use fixturedag_test_utils::{init_tracing, with_timeout};

use std::path::PathBuf;

use fixturedag::config::{load_and_validate, Workflow};
use fixturedag::dag::{resolve, ExecutionPlan, ForceMode, JobGraph};
use fixturedag::fs::mock::MockFileSystem;

/// Resolve `targets` against an in-memory filesystem.
pub fn graph_for(workflow: &Workflow, fs: &MockFileSystem, targets: &[&str]) -> JobGraph {
    let targets: Vec<String> = targets.iter().map(|t| t.to_string()).collect();
    resolve(workflow, fs, &targets).expect("resolution failed")
}

/// Resolve and plan `targets` against an in-memory filesystem.
pub fn plan_for(
    workflow: &Workflow,
    fs: &MockFileSystem,
    targets: &[&str],
    force: ForceMode,
) -> ExecutionPlan {
    let graph = graph_for(workflow, fs, targets);
    ExecutionPlan::build(graph, fs, workflow.workdir(), force).expect("planning failed")
}

/// Labels of the jobs a plan wants to run, in plan order.
pub fn planned_labels(plan: &ExecutionPlan) -> Vec<String> {
    plan.jobs_to_run().map(|j| j.label()).collect()
}

pub fn nnmt_workflow_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("workflows/nnmt_fixtures/Fixtures.toml")
}

/// The shipped nnmt workflow with paths relative to the mock filesystem
/// root.
pub fn nnmt_workflow() -> Workflow {
    load_and_validate(nnmt_workflow_path(), &[])
        .expect("shipped workflow must load")
        .with_workdir("")
}

pub const UNIT_FIXTURES: [&str; 5] = [
    "lif_delta_firing_rates",
    "lif_exp_firing_rates",
    "lif_exp_transfer_functions",
    "lif_exp_sensitivity_measure",
    "lif_exp_power_spectra",
];

pub const MODEL_FIXTURES: [&str; 3] = ["basic", "plain", "microcircuit"];

pub const INTEGRATION_FIXTURES: [&str; 3] =
    ["noise_driven_regime", "negative_firing_rate_regime", "Bos2016_data"];

/// Source files the nnmt workflow expects from the nnmt checkout.
pub fn nnmt_sources(fs: &MockFileSystem) {
    for fixture in UNIT_FIXTURES {
        fs.add_file(format!("unit/create/{fixture}.py"), "script");
    }
    fs.add_file("unit/create/model_fixtures.py", "script");
    fs.add_file("integration/create/noise_driven_regime.py", "script");
    fs.add_file("integration/create/negative_firing_rate_regime.py", "script");
    fs.add_file("integration/convert_published_results.py", "script");
    fs.add_file("published/Bos2016_publicated_and_converted_data.h5", "data");
    fs.add_file("fortran/siegert.f90", "source");
    fs.add_file("network_params_microcircuit.yaml", "params");
}

/// Every path the nnmt workflow produces for `all`, stamped after the
/// sources so the whole tree is fresh.
pub fn nnmt_outputs(fs: &MockFileSystem) {
    fs.add_file("build/fortran/siegert.pyf", "");
    fs.add_file("build/fortran/siegert.so", "");
    fs.add_file("integration/create/siegert.so", "");
    fs.add_file("integration/siegert.so", "");
    for fixture in UNIT_FIXTURES {
        fs.add_file(format!("unit/data/{fixture}.h5"), "h5");
    }
    for model in MODEL_FIXTURES {
        fs.add_file(format!("unit/data/models/{model}.h5"), "h5");
    }
    for fixture in INTEGRATION_FIXTURES {
        fs.add_file(format!("integration/data/{fixture}.h5"), "h5");
    }
}
