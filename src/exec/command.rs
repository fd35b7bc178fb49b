// src/exec/command.rs

//! Building the command line a shell job runs.

use std::path::Path;

use tokio::process::Command;

use crate::errors::{FixturedagError, Result};
use crate::rules::{Substitution, Template};

use super::ExecOptions;

/// Environment variable exported to jobs of rules that declare an `env`.
pub const ENV_VAR: &str = "FIXTUREDAG_ENV";

/// Quote `s` as a single POSIX shell word.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Render `env_command` around `cmd`, e.g.
/// `conda run -n {env} sh -c {cmd}`.
pub fn wrap_in_env(env_command: &Template, env: &str, cmd: &str) -> Result<String> {
    env_command.render(|name| match name {
        "env" => Ok(Substitution::One(env.to_string())),
        "cmd" => Ok(Substitution::One(shell_quote(cmd))),
        other => Err(FixturedagError::template(
            env_command.source(),
            format!("unknown placeholder '{other}'"),
        )),
    })
}

/// The final command line for a shell job: wrapped in its environment when
/// environments are enabled and the rule names one.
pub fn command_line(cmd: &str, env: Option<&str>, options: &ExecOptions) -> Result<String> {
    match (options.use_envs, env, options.env_command.as_ref()) {
        (true, Some(env), Some(template)) => wrap_in_env(template, env, cmd),
        (true, Some(_), None) => Err(FixturedagError::ConfigError(
            "--use-envs requires [workflow].env_command".to_string(),
        )),
        _ => Ok(cmd.to_string()),
    }
}

/// Build a shell command appropriate for the platform, running in `workdir`.
pub fn shell_command(line: &str, workdir: &Path, env: Option<&str>) -> Command {
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(line);
        c
    };

    if !workdir.as_os_str().is_empty() {
        cmd.current_dir(workdir);
    }
    if let Some(env) = env {
        cmd.env(ENV_VAR, env);
    }
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_embedded_single_quotes() {
        assert_eq!(shell_quote("echo 'hi' > out"), r"'echo '\''hi'\'' > out'");
    }

    #[test]
    fn wraps_command_only_with_envs_enabled() {
        let template = Template::parse("conda run -n {env} sh -c {cmd}").unwrap();
        let enabled = ExecOptions::new(".").with_envs(Some(template.clone()), true);
        let disabled = ExecOptions::new(".").with_envs(Some(template), false);

        assert_eq!(
            command_line("python make.py", Some("nnmt"), &enabled).unwrap(),
            "conda run -n nnmt sh -c 'python make.py'"
        );
        assert_eq!(
            command_line("python make.py", Some("nnmt"), &disabled).unwrap(),
            "python make.py"
        );
        assert_eq!(command_line("python make.py", None, &enabled).unwrap(), "python make.py");
    }
}
