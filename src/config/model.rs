// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::values::ConfigValues;
use crate::rules::{RuleRegistry, Template};

/// Raw workflow document as read from a TOML file.
///
/// ```toml
/// [workflow]
/// default_target = "all"
/// configfile = "config.toml"
///
/// [config]
/// unit_fixture_path = "unit/data"
///
/// [rule.all]
/// input = ["{unit_fixture_path}/{unit_fixtures}.h5"]
///
/// [rule.unit_fixture]
/// input = { script = "unit/create/{fixture}.py" }
/// output = "{unit_fixture_path}/{fixture}.h5"
/// shell = "python {input.script} {output}"
/// ```
///
/// All sections are optional at the serde level; semantic checks happen
/// when converting into a [`Workflow`].
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawWorkflowFile {
    /// Engine-level settings from `[workflow]`.
    #[serde(default)]
    pub workflow: WorkflowSection,

    /// Inline configuration values from `[config]`.
    #[serde(default)]
    pub config: toml::Table,

    /// All rules from `[rule.<name>]`.
    #[serde(default)]
    pub rule: BTreeMap<String, RuleConfig>,
}

/// `[workflow]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowSection {
    /// Target built when none is given on the command line.
    #[serde(default = "default_target")]
    pub default_target: String,

    /// Optional TOML document with configuration values, relative to the
    /// workflow file. Its values override the inline `[config]` table.
    #[serde(default)]
    pub configfile: Option<String>,

    /// Template wrapping shell commands of rules that declare an `env`, used
    /// with `--use-envs`. Placeholders: `{env}` and `{cmd}`.
    #[serde(default)]
    pub env_command: Option<String>,
}

fn default_target() -> String {
    "all".to_string()
}

impl Default for WorkflowSection {
    fn default() -> Self {
        Self {
            default_target: default_target(),
            configfile: None,
            env_command: None,
        }
    }
}

/// `[rule.<name>]` section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    #[serde(default)]
    pub input: PathSpec,

    #[serde(default)]
    pub output: PathSpec,

    /// Named parameter values, available as `{params.<name>}`.
    #[serde(default)]
    pub params: BTreeMap<String, String>,

    /// Environment reference the action runs under.
    #[serde(default)]
    pub env: Option<String>,

    /// Shell command template.
    #[serde(default)]
    pub shell: Option<String>,

    /// Paths to delete; the rule's outputs become completion markers.
    #[serde(default)]
    pub remove: Option<Vec<String>>,

    /// Per-wildcard regex constraints (default `.+`).
    #[serde(default)]
    pub constraints: BTreeMap<String, String>,
}

/// `input` / `output` value: one path, a list, or a table of named entries.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PathSpec {
    One(String),
    List(Vec<String>),
    Named(BTreeMap<String, PathValue>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PathValue {
    One(String),
    Many(Vec<String>),
}

impl Default for PathSpec {
    fn default() -> Self {
        PathSpec::List(Vec::new())
    }
}

impl PathSpec {
    /// Flatten into `(name, template)` pairs in declaration order (named
    /// entries are ordered by name).
    pub fn entries(&self) -> Vec<(Option<String>, String)> {
        match self {
            PathSpec::One(p) => vec![(None, p.clone())],
            PathSpec::List(ps) => ps.iter().map(|p| (None, p.clone())).collect(),
            PathSpec::Named(map) => map
                .iter()
                .flat_map(|(name, value)| {
                    let paths = match value {
                        PathValue::One(p) => vec![p.clone()],
                        PathValue::Many(ps) => ps.clone(),
                    };
                    paths.into_iter().map(move |p| (Some(name.clone()), p))
                })
                .collect(),
        }
    }
}

/// Validated workflow: compiled rules plus merged configuration.
///
/// Only constructible via `TryFrom<RawWorkflowFile>` (see `validate.rs`) or
/// [`crate::config::load_and_validate`].
#[derive(Debug, Clone)]
pub struct Workflow {
    pub(crate) default_target: String,
    pub(crate) env_command: Option<Template>,
    pub(crate) config: ConfigValues,
    pub(crate) registry: RuleRegistry,
    pub(crate) workdir: PathBuf,
}

impl Workflow {
    pub fn default_target(&self) -> &str {
        &self.default_target
    }

    pub fn env_command(&self) -> Option<&Template> {
        self.env_command.as_ref()
    }

    pub fn config(&self) -> &ConfigValues {
        &self.config
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Directory relative paths are resolved against and commands run in.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }
}
