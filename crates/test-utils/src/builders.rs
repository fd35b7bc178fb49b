#![allow(dead_code)]

use std::collections::BTreeMap;

use fixturedag::config::{PathSpec, PathValue, RawWorkflowFile, RuleConfig, Workflow};
use fixturedag::errors::Result;

/// Builder for `Workflow` to simplify test setup.
pub struct WorkflowBuilder {
    raw: RawWorkflowFile,
}

impl WorkflowBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawWorkflowFile::default(),
        }
    }

    pub fn with_rule(mut self, name: &str, rule: RuleConfig) -> Self {
        self.raw.rule.insert(name.to_string(), rule);
        self
    }

    pub fn with_config(mut self, key: &str, value: impl Into<toml::Value>) -> Self {
        self.raw.config.insert(key.to_string(), value.into());
        self
    }

    pub fn with_list(mut self, key: &str, values: &[&str]) -> Self {
        let list = values.iter().map(|v| toml::Value::from(*v)).collect::<Vec<_>>();
        self.raw.config.insert(key.to_string(), toml::Value::Array(list));
        self
    }

    pub fn with_default_target(mut self, target: &str) -> Self {
        self.raw.workflow.default_target = target.to_string();
        self
    }

    pub fn with_env_command(mut self, template: &str) -> Self {
        self.raw.workflow.env_command = Some(template.to_string());
        self
    }

    pub fn try_build(self) -> Result<Workflow> {
        Workflow::try_from(self.raw)
    }

    pub fn build(self) -> Workflow {
        self.try_build().expect("Failed to build valid workflow from builder")
    }
}

impl Default for WorkflowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `RuleConfig`.
pub struct RuleBuilder {
    rule: RuleConfig,
    inputs: Vec<String>,
    named_inputs: BTreeMap<String, PathValue>,
    outputs: Vec<String>,
    named_outputs: BTreeMap<String, PathValue>,
}

impl RuleBuilder {
    fn empty() -> Self {
        Self {
            rule: RuleConfig::default(),
            inputs: Vec::new(),
            named_inputs: BTreeMap::new(),
            outputs: Vec::new(),
            named_outputs: BTreeMap::new(),
        }
    }

    pub fn shell(cmd: &str) -> Self {
        let mut b = Self::empty();
        b.rule.shell = Some(cmd.to_string());
        b
    }

    pub fn remove(paths: &[&str]) -> Self {
        let mut b = Self::empty();
        b.rule.remove = Some(paths.iter().map(|p| p.to_string()).collect());
        b
    }

    /// A rule without an action that only pulls in its inputs.
    pub fn aggregate() -> Self {
        Self::empty()
    }

    pub fn input(mut self, path: &str) -> Self {
        self.inputs.push(path.to_string());
        self
    }

    pub fn named_input(mut self, name: &str, path: &str) -> Self {
        self.named_inputs
            .insert(name.to_string(), PathValue::One(path.to_string()));
        self
    }

    pub fn output(mut self, path: &str) -> Self {
        self.outputs.push(path.to_string());
        self
    }

    pub fn named_output(mut self, name: &str, path: &str) -> Self {
        self.named_outputs
            .insert(name.to_string(), PathValue::One(path.to_string()));
        self
    }

    pub fn param(mut self, name: &str, value: &str) -> Self {
        self.rule.params.insert(name.to_string(), value.to_string());
        self
    }

    pub fn env(mut self, env: &str) -> Self {
        self.rule.env = Some(env.to_string());
        self
    }

    pub fn constraint(mut self, wildcard: &str, regex: &str) -> Self {
        self.rule
            .constraints
            .insert(wildcard.to_string(), regex.to_string());
        self
    }

    pub fn build(mut self) -> RuleConfig {
        self.rule.input = path_spec(self.inputs, self.named_inputs);
        self.rule.output = path_spec(self.outputs, self.named_outputs);
        self.rule
    }
}

fn path_spec(plain: Vec<String>, named: BTreeMap<String, PathValue>) -> PathSpec {
    assert!(
        plain.is_empty() || named.is_empty(),
        "RuleBuilder cannot mix named and unnamed paths"
    );
    if named.is_empty() {
        PathSpec::List(plain)
    } else {
        PathSpec::Named(named)
    }
}
