// src/rules/mod.rs

//! Rule definitions.
//!
//! - [`template`] parses `{placeholder}` templates and expands them.
//! - [`pattern`] compiles wildcard output templates into regexes.
//! - [`rule`] holds the compiled, immutable [`Rule`].
//! - [`registry`] indexes rules by name and by the paths they produce.

pub mod pattern;
pub mod registry;
pub mod rule;
pub mod template;

pub use pattern::{OutputPattern, Wildcards};
pub use registry::RuleRegistry;
pub use rule::{NamedPath, Rule, RuleAction, ShellContext};
pub use template::{Substitution, Template};

/// Canonical textual form of a workflow-relative path: no leading `./`.
pub fn normalize_path(path: &str) -> String {
    let mut p = path.trim();
    while let Some(rest) = p.strip_prefix("./") {
        p = rest.trim_start_matches('/');
    }
    p.to_string()
}
