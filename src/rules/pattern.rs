// src/rules/pattern.rs

//! Output patterns: output templates whose remaining placeholders are
//! wildcards, compiled into anchored regular expressions.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;

use crate::errors::{FixturedagError, Result};
use crate::rules::template::{Segment, Substitution, Template};

/// Wildcard bindings of a job, e.g. `{"fixture": "lif_exp_firing_rates"}`.
pub type Wildcards = BTreeMap<String, String>;

/// Default constraint for a wildcard with no explicit constraint.
pub const DEFAULT_WILDCARD_CONSTRAINT: &str = ".+";

#[derive(Debug, Clone)]
pub struct OutputPattern {
    template: Template,
    regex: Regex,
    /// Wildcard name for each capture group `w0`, `w1`, ...
    groups: Vec<String>,
}

impl OutputPattern {
    /// Compile a template whose placeholders are all wildcards.
    pub fn compile(template: Template, constraints: &BTreeMap<String, String>) -> Result<Self> {
        let mut re = String::from("^");
        let mut groups = Vec::new();

        for segment in template.segments() {
            match segment {
                Segment::Literal(text) => re.push_str(&regex::escape(text)),
                Segment::Placeholder(name) => {
                    let constraint = constraints
                        .get(name)
                        .map(String::as_str)
                        .unwrap_or(DEFAULT_WILDCARD_CONSTRAINT);
                    re.push_str(&format!("(?P<w{}>{})", groups.len(), constraint));
                    groups.push(name.clone());
                }
            }
        }
        re.push('$');

        let regex = Regex::new(&re).map_err(|e| {
            FixturedagError::template(template.source(), format!("invalid output pattern: {e}"))
        })?;

        Ok(Self {
            template,
            regex,
            groups,
        })
    }

    pub fn source(&self) -> &str {
        self.template.source()
    }

    /// True when the pattern has no wildcards, i.e. names exactly one path.
    pub fn is_concrete(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn wildcard_names(&self) -> BTreeSet<String> {
        self.groups.iter().cloned().collect()
    }

    /// Match `path` and return the wildcard bindings.
    ///
    /// A wildcard that appears more than once must bind the same text each
    /// time.
    pub fn matches(&self, path: &str) -> Option<Wildcards> {
        let caps = self.regex.captures(path)?;
        let mut wildcards = Wildcards::new();
        for (idx, name) in self.groups.iter().enumerate() {
            let value = caps.name(&format!("w{idx}"))?.as_str();
            match wildcards.get(name) {
                Some(existing) if existing != value => return None,
                Some(_) => {}
                None => {
                    wildcards.insert(name.clone(), value.to_string());
                }
            }
        }
        Some(wildcards)
    }

    /// Substitute bound wildcards back into the pattern.
    pub fn render(&self, wildcards: &Wildcards) -> Result<String> {
        self.template.render(|name| {
            wildcards
                .get(name)
                .map(|v| Substitution::One(v.clone()))
                .ok_or_else(|| {
                    FixturedagError::template(
                        self.template.source(),
                        format!("wildcard '{name}' is not bound"),
                    )
                })
        })
    }
}
