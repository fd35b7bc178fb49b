// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{RawWorkflowFile, Workflow};
use crate::config::values::{ConfigOverride, ConfigValues};
use crate::errors::{FixturedagError, Result};

/// Load a workflow file from a given path and return the raw document.
///
/// This only performs TOML deserialization; it does **not** read the
/// `configfile` or compile any rule. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawWorkflowFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        FixturedagError::ConfigError(format!("reading workflow file {:?}: {e}", path))
    })?;

    let raw: RawWorkflowFile = toml::from_str(&contents)?;

    Ok(raw)
}

/// Load a workflow, merge its configuration layers and validate it.
///
/// - Reads TOML.
/// - Merges inline `[config]`, then the `configfile` document, then the
///   command-line overrides.
/// - Compiles every rule and checks templates, wildcards and output
///   uniqueness.
/// - Sets the working directory to the workflow file's directory.
pub fn load_and_validate(
    path: impl AsRef<Path>,
    overrides: &[ConfigOverride],
) -> Result<Workflow> {
    let path = path.as_ref();
    let mut raw = load_from_path(path)?;
    let root = workflow_root_dir(path);

    let mut values = ConfigValues::new(std::mem::take(&mut raw.config));

    if let Some(configfile) = raw.workflow.configfile.as_deref() {
        let config_path = root.join(configfile);
        let contents = fs::read_to_string(&config_path).map_err(|e| {
            FixturedagError::ConfigError(format!("reading configfile {:?}: {e}", config_path))
        })?;
        let table: toml::Table = toml::from_str(&contents)?;
        debug!(path = ?config_path, keys = table.len(), "merged configfile");
        values.merge(table);
    }

    for ov in overrides {
        debug!(key = %ov.key, value = %ov.value, "applying config override");
        values.apply_override(ov);
    }

    raw.config = values.table().clone();

    let workflow = Workflow::try_from(raw)?.with_workdir(root);
    Ok(workflow)
}

/// Default workflow path: `Fixtures.toml` in the current working directory.
pub fn default_workflow_path() -> PathBuf {
    PathBuf::from("Fixtures.toml")
}

/// Directory of the workflow file.
///
/// A bare filename like `Fixtures.toml` (parent = "") falls back to `.`.
pub fn workflow_root_dir(workflow_path: &Path) -> PathBuf {
    match workflow_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
