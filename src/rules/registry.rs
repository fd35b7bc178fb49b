// src/rules/registry.rs

use std::collections::HashMap;

use tracing::debug;

use crate::errors::{FixturedagError, Result};
use crate::rules::normalize_path;
use crate::rules::pattern::Wildcards;
use crate::rules::rule::Rule;

/// Immutable set of compiled rules, built once at workflow-load time.
///
/// Concrete (wildcard-free) outputs are indexed for direct lookup; wildcard
/// outputs are matched by regex. Construction enforces that no path is
/// claimed by two rules.
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    rules: Vec<Rule>,
    by_name: HashMap<String, usize>,
    concrete_outputs: HashMap<String, usize>,
}

impl RuleRegistry {
    pub fn new(rules: Vec<Rule>) -> Result<Self> {
        let mut by_name = HashMap::new();
        let mut concrete_outputs: HashMap<String, usize> = HashMap::new();

        for (idx, rule) in rules.iter().enumerate() {
            by_name.insert(rule.name.clone(), idx);

            for out in rule.outputs.iter().filter(|o| o.pattern.is_concrete()) {
                let path = out.pattern.source().to_string();
                if let Some(&other) = concrete_outputs.get(&path) {
                    return Err(FixturedagError::DuplicateOutput {
                        path,
                        first: rules[other].name.clone(),
                        second: rule.name.clone(),
                    });
                }
                concrete_outputs.insert(path, idx);
            }
        }

        // A concrete output must not also match another rule's wildcard
        // pattern, otherwise two rules could produce the same file.
        for (path, &owner) in &concrete_outputs {
            for (idx, rule) in rules.iter().enumerate() {
                if idx == owner || !rule.has_wildcards() {
                    continue;
                }
                if rule.match_output(path).is_some() {
                    let (first, second) = ordered_pair(&rules[owner].name, &rule.name);
                    return Err(FixturedagError::DuplicateOutput {
                        path: path.clone(),
                        first,
                        second,
                    });
                }
            }
        }

        debug!(
            rules = rules.len(),
            concrete_outputs = concrete_outputs.len(),
            "rule registry built"
        );

        Ok(Self {
            rules,
            by_name,
            concrete_outputs,
        })
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.by_name.get(name).map(|&idx| &self.rules[idx])
    }

    /// Concrete output paths and the rule that declares each.
    pub fn concrete_outputs(&self) -> impl Iterator<Item = (&str, &Rule)> {
        self.concrete_outputs
            .iter()
            .map(|(path, &idx)| (path.as_str(), &self.rules[idx]))
    }

    /// Find the single rule able to produce `path`.
    ///
    /// Returns `Ok(None)` when no rule matches and an `AmbiguousRule` error
    /// when more than one does.
    pub fn producer_of(&self, path: &str) -> Result<Option<(&Rule, Wildcards)>> {
        let path = normalize_path(path);

        if let Some(&idx) = self.concrete_outputs.get(&path) {
            return Ok(Some((&self.rules[idx], Wildcards::new())));
        }

        let mut matches: Vec<(&Rule, Wildcards)> = self
            .rules
            .iter()
            .filter(|r| r.has_wildcards())
            .filter_map(|r| r.match_output(&path).map(|wc| (r, wc)))
            .collect();

        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            _ => Err(FixturedagError::AmbiguousRule {
                target: path,
                rules: matches.iter().map(|(r, _)| r.name.clone()).collect(),
            }),
        }
    }
}

fn ordered_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}
