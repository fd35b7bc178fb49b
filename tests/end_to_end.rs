// tests/end_to_end.rs
#![cfg(unix)]

mod common;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::fs;
use std::path::Path;

use clap::Parser;
use fixturedag::cli::CliArgs;
use fixturedag::errors::FixturedagError;
use fixturedag::run;

type TestResult = Result<(), Box<dyn Error>>;

const WORKFLOW: &str = r#"
[config]
out = "out"

[rule.all]
input = ["{out}/b.txt", "{out}/good.txt"]

[rule.a]
output = "{out}/a.txt"
shell = "echo hello > {output}"

[rule.b]
input = "{out}/a.txt"
output = "{out}/b.txt"
shell = "cat {input} > {output} && echo world >> {output}"

[rule.good]
output = "{out}/good.txt"
shell = "echo good > {output}"

[rule.broken]
output = "broken.txt"
shell = "echo partial > {output} && exit 3"

[rule.lazy]
output = "never.txt"
shell = "true"

[rule.clean]
remove = ["{out}/a.txt", "{out}/b.txt", "{out}/good.txt"]
output = "clean.done"

[rule.with_broken]
input = ["broken.txt", "{out}/good.txt"]
"#;

fn args(dir: &Path, extra: &[&str]) -> CliArgs {
    let workflow = dir.join("Fixtures.toml");
    let mut argv = vec![
        "fixturedag".to_string(),
        "--workflow".to_string(),
        workflow.display().to_string(),
    ];
    argv.extend(extra.iter().map(|s| s.to_string()));
    CliArgs::try_parse_from(argv).expect("valid arguments")
}

fn workspace() -> Result<tempfile::TempDir, Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("Fixtures.toml"), WORKFLOW)?;
    Ok(dir)
}

#[tokio::test]
async fn builds_outputs_then_has_nothing_to_do() -> TestResult {
    init_tracing();
    let dir = workspace()?;

    let summary = with_timeout(run(args(dir.path(), &["-j", "2"]))).await?;
    assert_eq!(summary.succeeded.len(), 3);
    assert_eq!(fs::read_to_string(dir.path().join("out/b.txt"))?, "hello\nworld\n");
    assert_eq!(fs::read_to_string(dir.path().join("out/good.txt"))?, "good\n");

    let summary = with_timeout(run(args(dir.path(), &[]))).await?;
    assert_eq!(summary.total(), 0);
    Ok(())
}

#[tokio::test]
async fn force_reruns_the_requested_target_only() -> TestResult {
    let dir = workspace()?;
    with_timeout(run(args(dir.path(), &[]))).await?;

    let summary = with_timeout(run(args(dir.path(), &["-f", "out/b.txt"]))).await?;
    assert_eq!(summary.succeeded, vec!["b".to_string()]);

    let summary = with_timeout(run(args(dir.path(), &["-F"]))).await?;
    assert_eq!(summary.succeeded.len(), 3);
    Ok(())
}

#[tokio::test]
async fn failing_command_leaves_no_partial_output() -> TestResult {
    let dir = workspace()?;

    let err = with_timeout(run(args(dir.path(), &["broken"]))).await.unwrap_err();

    assert!(matches!(err, FixturedagError::JobsFailed(ref labels) if labels == &["broken".to_string()]));
    assert!(!dir.path().join("broken.txt").exists());
    Ok(())
}

#[tokio::test]
async fn missing_output_after_success_is_a_failure() -> TestResult {
    let dir = workspace()?;

    let err = with_timeout(run(args(dir.path(), &["lazy"]))).await.unwrap_err();
    assert!(matches!(err, FixturedagError::JobsFailed(ref labels) if labels == &["lazy".to_string()]));
    Ok(())
}

#[tokio::test]
async fn independent_jobs_finish_after_a_failure() -> TestResult {
    let dir = workspace()?;

    let err = with_timeout(run(args(dir.path(), &["with_broken"]))).await.unwrap_err();

    assert!(matches!(err, FixturedagError::JobsFailed(_)));
    assert_eq!(fs::read_to_string(dir.path().join("out/good.txt"))?, "good\n");
    Ok(())
}

#[tokio::test]
async fn remove_rule_deletes_paths_and_writes_marker() -> TestResult {
    let dir = workspace()?;
    with_timeout(run(args(dir.path(), &[]))).await?;

    let summary = with_timeout(run(args(dir.path(), &["clean"]))).await?;

    assert_eq!(summary.succeeded, vec!["clean".to_string()]);
    assert!(!dir.path().join("out/a.txt").exists());
    assert!(!dir.path().join("out/b.txt").exists());
    assert!(dir.path().join("clean.done").exists());
    // The output directory itself is left in place.
    assert!(dir.path().join("out").is_dir());
    Ok(())
}

#[tokio::test]
async fn second_clean_after_rebuild_removes_outputs_again() -> TestResult {
    let dir = workspace()?;
    with_timeout(run(args(dir.path(), &[]))).await?;
    with_timeout(run(args(dir.path(), &["clean"]))).await?;
    with_timeout(run(args(dir.path(), &[]))).await?;
    assert!(dir.path().join("out/good.txt").exists());

    let summary = with_timeout(run(args(dir.path(), &["clean"]))).await?;

    assert_eq!(summary.succeeded, vec!["clean".to_string()]);
    assert!(!dir.path().join("out/a.txt").exists());
    assert!(!dir.path().join("out/good.txt").exists());

    let summary = with_timeout(run(args(dir.path(), &["clean"]))).await?;
    assert_eq!(summary.total(), 0);
    Ok(())
}

#[tokio::test]
async fn dry_run_executes_nothing() -> TestResult {
    let dir = workspace()?;

    let summary = with_timeout(run(args(dir.path(), &["--dry-run"]))).await?;

    assert_eq!(summary.total(), 0);
    assert!(!dir.path().join("out").exists());
    Ok(())
}

#[tokio::test]
async fn config_override_changes_paths() -> TestResult {
    let dir = workspace()?;

    with_timeout(run(args(dir.path(), &["-C", "out=elsewhere", "all"]))).await?;

    assert!(dir.path().join("elsewhere/b.txt").exists());
    assert!(!dir.path().join("out").exists());
    Ok(())
}

#[tokio::test]
async fn directory_option_moves_the_working_directory() -> TestResult {
    let dir = workspace()?;
    let target = tempfile::tempdir()?;
    let target_dir = target.path().display().to_string();

    with_timeout(run(args(dir.path(), &["--directory", target_dir.as_str(), "out/good.txt"]))).await?;

    assert!(target.path().join("out/good.txt").exists());
    assert!(!dir.path().join("out").exists());
    Ok(())
}

#[tokio::test]
async fn use_envs_without_env_command_is_rejected() -> TestResult {
    let dir = workspace()?;

    let err = with_timeout(run(args(dir.path(), &["--use-envs"]))).await.unwrap_err();
    assert!(matches!(err, FixturedagError::ConfigError(ref msg) if msg.contains("env_command")));
    Ok(())
}
