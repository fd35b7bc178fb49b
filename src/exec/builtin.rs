// src/exec/builtin.rs

//! Builtin cleanup procedure used by `remove` rules.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::fs::FileSystem;

/// Remove every path in `paths` that exists, then create each marker as an
/// empty file.
///
/// Paths that are already gone are skipped. The first removal error aborts
/// the procedure before any marker is written, so a failed cleanup is
/// retried on the next run.
pub fn remove_then_mark(fs: &dyn FileSystem, workdir: &Path, paths: &[String], markers: &[String]) -> Result<()> {
    for path in paths {
        let full = workdir.join(path);
        if !fs.exists(&full) {
            debug!(path = %path, "nothing to remove");
            continue;
        }
        fs.remove(&full)
            .with_context(|| format!("removing {path}"))?;
        info!(path = %path, "removed");
    }

    for marker in markers {
        fs.touch(&workdir.join(marker))
            .with_context(|| format!("writing marker {marker}"))?;
        debug!(marker = %marker, "marker written");
    }

    Ok(())
}
