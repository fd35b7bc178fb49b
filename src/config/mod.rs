// src/config/mod.rs

//! Workflow loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Merge configuration layers (`values.rs`).
//! - Load a workflow file from disk (`loader.rs`).
//! - Compile and validate rules (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;
pub mod values;

pub use loader::{default_workflow_path, load_and_validate, load_from_path};
pub use model::{PathSpec, PathValue, RawWorkflowFile, RuleConfig, Workflow, WorkflowSection};
pub use values::{ConfigOverride, ConfigValues};
