// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FixturedagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Template error in {template:?}: {message}")]
    TemplateError { template: String, message: String },

    #[error("No rule to produce target: {0}")]
    NoRuleToProduce(String),

    #[error("Circular dependency: {0}")]
    CircularDependency(String),

    #[error("Ambiguous rule for {target}: rules {rules:?} can all produce it")]
    AmbiguousRule { target: String, rules: Vec<String> },

    #[error("Duplicate output {path}: declared by rule '{first}' and rule '{second}'")]
    DuplicateOutput {
        path: String,
        first: String,
        second: String,
    },

    #[error("{} job(s) failed: {}", .0.len(), .0.join(", "))]
    JobsFailed(Vec<String>),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FixturedagError {
    pub(crate) fn template(template: &str, message: impl Into<String>) -> Self {
        FixturedagError::TemplateError {
            template: template.to_string(),
            message: message.into(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, FixturedagError>;
