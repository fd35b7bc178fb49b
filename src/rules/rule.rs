// src/rules/rule.rs

//! Compiled rules.
//!
//! A [`Rule`] is the validated, immutable form of a `[rule.<name>]` section:
//! templates are parsed, config placeholders in outputs are expanded, the
//! remaining output placeholders become wildcards, and every placeholder in
//! inputs, params, removals and the shell command is checked against what
//! the rule can actually bind.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;

use crate::config::model::RuleConfig;
use crate::config::values::ConfigValues;
use crate::errors::{FixturedagError, Result};
use crate::rules::normalize_path;
use crate::rules::pattern::{OutputPattern, Wildcards};
use crate::rules::template::{escape_braces, Substitution, Template};

/// A named (or positional) input template.
#[derive(Debug, Clone)]
pub struct InputEntry {
    pub name: Option<String>,
    pub template: Template,
}

/// A named (or positional) output pattern.
#[derive(Debug, Clone)]
pub struct OutputEntry {
    pub name: Option<String>,
    pub pattern: OutputPattern,
}

/// A rendered path together with the name it was declared under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedPath {
    pub name: Option<String>,
    pub path: String,
}

#[derive(Debug, Clone)]
pub enum RuleAction {
    /// Shell command template.
    Shell(Template),
    /// Inline cleanup: remove each path if present, then create the
    /// rule's outputs as zero-byte markers.
    Remove(Vec<Template>),
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub inputs: Vec<InputEntry>,
    pub outputs: Vec<OutputEntry>,
    pub params: BTreeMap<String, Template>,
    pub env: Option<String>,
    pub action: Option<RuleAction>,
    wildcards: BTreeSet<String>,
}

impl Rule {
    /// Compile a raw rule section against the merged configuration.
    pub fn compile(name: &str, raw: &RuleConfig, config: &ConfigValues) -> Result<Self> {
        if name.trim().is_empty() || name.chars().any(char::is_whitespace) {
            return Err(FixturedagError::ConfigError(format!(
                "invalid rule name {name:?}: names must be non-empty and contain no whitespace"
            )));
        }

        for (wildcard, constraint) in &raw.constraints {
            Regex::new(constraint).map_err(|e| {
                FixturedagError::ConfigError(format!(
                    "rule '{name}': invalid constraint for '{wildcard}': {e}"
                ))
            })?;
        }

        let outputs = compile_outputs(name, raw, config)?;

        let mut wildcards: Option<BTreeSet<String>> = None;
        for out in &outputs {
            let names = out.pattern.wildcard_names();
            match &wildcards {
                None => wildcards = Some(names),
                Some(existing) if *existing != names => {
                    return Err(FixturedagError::ConfigError(format!(
                        "rule '{name}': all outputs must use the same wildcards \
                         ({existing:?} vs {names:?} in {:?})",
                        out.pattern.source()
                    )));
                }
                Some(_) => {}
            }
        }
        let wildcards = wildcards.unwrap_or_default();

        for wildcard in raw.constraints.keys() {
            if !wildcards.contains(wildcard) {
                return Err(FixturedagError::ConfigError(format!(
                    "rule '{name}': constraint for unknown wildcard '{wildcard}'"
                )));
            }
        }

        let inputs = raw
            .input
            .entries()
            .into_iter()
            .map(|(entry_name, source)| {
                let template = Template::parse(&source)?;
                check_path_placeholders(name, "input", &template, &wildcards, config)?;
                Ok(InputEntry {
                    name: entry_name,
                    template,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut params = BTreeMap::new();
        for (param, source) in &raw.params {
            let template = Template::parse(source)?;
            check_path_placeholders(name, "params", &template, &wildcards, config)?;
            params.insert(param.clone(), template);
        }

        let action = match (&raw.shell, &raw.remove) {
            (Some(_), Some(_)) => {
                return Err(FixturedagError::ConfigError(format!(
                    "rule '{name}' declares both `shell` and `remove`; choose one action"
                )));
            }
            (Some(cmd), None) => Some(RuleAction::Shell(Template::parse(cmd)?)),
            (None, Some(paths)) => {
                if outputs.is_empty() {
                    return Err(FixturedagError::ConfigError(format!(
                        "rule '{name}' uses `remove` but declares no output marker"
                    )));
                }
                let templates = paths
                    .iter()
                    .map(|p| {
                        let t = Template::parse(p)?;
                        check_path_placeholders(name, "remove", &t, &wildcards, config)?;
                        Ok(t)
                    })
                    .collect::<Result<Vec<_>>>()?;
                Some(RuleAction::Remove(templates))
            }
            (None, None) => None,
        };

        let rule = Self {
            name: name.to_string(),
            inputs,
            outputs,
            params,
            env: raw.env.clone(),
            action,
            wildcards,
        };

        if let Some(RuleAction::Shell(cmd)) = &rule.action {
            rule.check_shell_placeholders(cmd, config)?;
        }

        Ok(rule)
    }

    pub fn wildcards(&self) -> &BTreeSet<String> {
        &self.wildcards
    }

    pub fn has_wildcards(&self) -> bool {
        !self.wildcards.is_empty()
    }

    /// Aggregate rules (no action) only pull in their inputs.
    pub fn is_aggregate(&self) -> bool {
        self.action.is_none()
    }

    /// Bind wildcards if any of this rule's outputs produces `path`.
    pub fn match_output(&self, path: &str) -> Option<Wildcards> {
        self.outputs.iter().find_map(|o| o.pattern.matches(path))
    }

    pub fn render_inputs(&self, wildcards: &Wildcards, config: &ConfigValues) -> Result<Vec<NamedPath>> {
        let mut paths = Vec::new();
        for entry in &self.inputs {
            for path in entry.template.expand(path_lookup(entry.template.source(), wildcards, config))? {
                paths.push(NamedPath {
                    name: entry.name.clone(),
                    path: normalize_path(&path),
                });
            }
        }
        Ok(paths)
    }

    pub fn render_outputs(&self, wildcards: &Wildcards) -> Result<Vec<NamedPath>> {
        self.outputs
            .iter()
            .map(|entry| {
                Ok(NamedPath {
                    name: entry.name.clone(),
                    path: normalize_path(&entry.pattern.render(wildcards)?),
                })
            })
            .collect()
    }

    pub fn render_params(
        &self,
        wildcards: &Wildcards,
        config: &ConfigValues,
    ) -> Result<BTreeMap<String, String>> {
        self.params
            .iter()
            .map(|(name, t)| Ok((name.clone(), t.render(path_lookup(t.source(), wildcards, config))?)))
            .collect()
    }

    pub fn render_removals(&self, wildcards: &Wildcards, config: &ConfigValues) -> Result<Vec<String>> {
        let mut paths = Vec::new();
        if let Some(RuleAction::Remove(templates)) = &self.action {
            for t in templates {
                for p in t.expand(path_lookup(t.source(), wildcards, config))? {
                    paths.push(normalize_path(&p));
                }
            }
        }
        Ok(paths)
    }

    /// Render the shell command for one job of this rule.
    pub fn render_shell(&self, ctx: &ShellContext<'_>) -> Result<Option<String>> {
        let Some(RuleAction::Shell(cmd)) = &self.action else {
            return Ok(None);
        };
        let rendered = cmd.render(|placeholder| {
            shell_value(self, ctx, placeholder).ok_or_else(|| {
                FixturedagError::template(
                    cmd.source(),
                    format!("cannot resolve placeholder '{{{placeholder}}}'"),
                )
            })
        })?;
        Ok(Some(rendered))
    }

    fn check_shell_placeholders(&self, cmd: &Template, config: &ConfigValues) -> Result<()> {
        let input_names: BTreeSet<&str> = self.inputs.iter().filter_map(|i| i.name.as_deref()).collect();
        let output_names: BTreeSet<&str> = self.outputs.iter().filter_map(|o| o.name.as_deref()).collect();

        for placeholder in cmd.placeholders() {
            let known = match placeholder.split_once('.') {
                None => {
                    matches!(placeholder, "input" | "output" | "env" | "rule")
                        || self.wildcards.contains(placeholder)
                        || config.contains(placeholder)
                }
                Some(("input", n)) => input_names.contains(n),
                Some(("output", n)) => output_names.contains(n),
                Some(("params", n)) => self.params.contains_key(n),
                Some(("wildcards", n)) => self.wildcards.contains(n),
                Some(_) => config.contains(placeholder),
            };
            if !known {
                return Err(FixturedagError::ConfigError(format!(
                    "rule '{}': unknown placeholder '{{{placeholder}}}' in shell command",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// Everything a shell template can reference for one job.
#[derive(Debug)]
pub struct ShellContext<'a> {
    pub wildcards: &'a Wildcards,
    pub inputs: &'a [NamedPath],
    pub outputs: &'a [NamedPath],
    pub params: &'a BTreeMap<String, String>,
    pub config: &'a ConfigValues,
}

fn shell_value(rule: &Rule, ctx: &ShellContext<'_>, placeholder: &str) -> Option<Substitution> {
    let join = |paths: &[NamedPath], name: Option<&str>| -> Option<Substitution> {
        let selected: Vec<String> = paths
            .iter()
            .filter(|p| name.is_none() || p.name.as_deref() == name)
            .map(|p| p.path.clone())
            .collect();
        if name.is_some() && selected.is_empty() {
            return None;
        }
        Some(Substitution::One(selected.join(" ")))
    };

    match placeholder.split_once('.') {
        None => match placeholder {
            "input" => join(ctx.inputs, None),
            "output" => join(ctx.outputs, None),
            "env" => Some(Substitution::One(rule.env.clone().unwrap_or_default())),
            "rule" => Some(Substitution::One(rule.name.clone())),
            other => ctx
                .wildcards
                .get(other)
                .map(|v| Substitution::One(v.clone()))
                .or_else(|| ctx.config.lookup(other)),
        },
        Some(("input", n)) => join(ctx.inputs, Some(n)),
        Some(("output", n)) => join(ctx.outputs, Some(n)),
        Some(("params", n)) => ctx.params.get(n).map(|v| Substitution::One(v.clone())),
        Some(("wildcards", n)) => ctx.wildcards.get(n).map(|v| Substitution::One(v.clone())),
        Some(_) => ctx.config.lookup(placeholder),
    }
}

/// Lookup used by input, param and removal templates: wildcards first, then
/// configuration values.
fn path_lookup<'a>(
    source: &'a str,
    wildcards: &'a Wildcards,
    config: &'a ConfigValues,
) -> impl FnMut(&str) -> Result<Substitution> + 'a {
    move |name| {
        let bare = name.strip_prefix("wildcards.").unwrap_or(name);
        if let Some(v) = wildcards.get(bare) {
            return Ok(Substitution::One(v.clone()));
        }
        config.lookup(name).ok_or_else(|| {
            FixturedagError::template(source, format!("unknown placeholder '{{{name}}}'"))
        })
    }
}

fn check_path_placeholders(
    rule: &str,
    field: &str,
    template: &Template,
    wildcards: &BTreeSet<String>,
    config: &ConfigValues,
) -> Result<()> {
    for placeholder in template.placeholders() {
        let bare = placeholder.strip_prefix("wildcards.").unwrap_or(placeholder);
        if wildcards.contains(bare) {
            continue;
        }
        if config.lookup(placeholder).is_none() {
            return Err(FixturedagError::ConfigError(format!(
                "rule '{rule}': `{field}` template {:?} references '{{{placeholder}}}', \
                 which is neither a wildcard nor a config value",
                template.source()
            )));
        }
    }
    Ok(())
}

/// Expand config placeholders in output templates; whatever is left becomes
/// a wildcard.
fn compile_outputs(name: &str, raw: &RuleConfig, config: &ConfigValues) -> Result<Vec<OutputEntry>> {
    let mut outputs = Vec::new();
    for (entry_name, source) in raw.output.entries() {
        let template = Template::parse(&source)?;
        let expanded = template.expand(|placeholder| {
            if let Some(value) = config.lookup(placeholder) {
                return Ok(match value {
                    Substitution::One(v) => Substitution::One(escape_braces(&v)),
                    Substitution::Many(vs) => {
                        Substitution::Many(vs.iter().map(|v| escape_braces(v)).collect())
                    }
                });
            }
            if placeholder.contains('.') {
                return Err(FixturedagError::ConfigError(format!(
                    "rule '{name}': output {source:?} references unknown config value '{{{placeholder}}}'"
                )));
            }
            Ok(Substitution::One(format!("{{{placeholder}}}")))
        })?;

        for pattern_source in expanded {
            let normalized = normalize_path(&pattern_source);
            let pattern = OutputPattern::compile(Template::parse(&normalized)?, &raw.constraints)?;
            outputs.push(OutputEntry {
                name: entry_name.clone(),
                pattern,
            });
        }
    }
    Ok(outputs)
}
