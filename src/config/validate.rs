// src/config/validate.rs

use std::path::PathBuf;

use crate::config::model::{RawWorkflowFile, Workflow};
use crate::config::values::ConfigValues;
use crate::errors::{FixturedagError, Result};
use crate::rules::{Rule, RuleRegistry, Template};

impl TryFrom<RawWorkflowFile> for Workflow {
    type Error = FixturedagError;

    /// Compile and validate a raw workflow whose `[config]` table already
    /// holds the fully merged configuration.
    ///
    /// The resulting workflow's working directory is `.`; loaders replace it
    /// with the workflow file's directory.
    fn try_from(raw: RawWorkflowFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_rules(&raw)?;

        let config = ConfigValues::new(raw.config);
        let env_command = validate_env_command(raw.workflow.env_command.as_deref())?;

        let rules = raw
            .rule
            .iter()
            .map(|(name, rc)| Rule::compile(name, rc, &config))
            .collect::<Result<Vec<_>>>()?;

        let registry = RuleRegistry::new(rules)?;

        Ok(Workflow {
            default_target: raw.workflow.default_target,
            env_command,
            config,
            registry,
            workdir: PathBuf::from("."),
        })
    }
}

fn ensure_has_rules(raw: &RawWorkflowFile) -> Result<()> {
    if raw.rule.is_empty() {
        return Err(FixturedagError::ConfigError(
            "workflow must contain at least one [rule.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_env_command(source: Option<&str>) -> Result<Option<Template>> {
    let Some(source) = source else {
        return Ok(None);
    };
    let template = Template::parse(source)?;
    for placeholder in template.placeholders() {
        if placeholder != "env" && placeholder != "cmd" {
            return Err(FixturedagError::ConfigError(format!(
                "[workflow].env_command: unknown placeholder '{{{placeholder}}}' \
                 (expected {{env}} and {{cmd}})"
            )));
        }
    }
    if !template.placeholders().any(|p| p == "cmd") {
        return Err(FixturedagError::ConfigError(
            "[workflow].env_command must contain {cmd}".to_string(),
        ));
    }
    Ok(Some(template))
}
