// src/exec/mod.rs

//! Job execution layer.
//!
//! This module is responsible for actually running the jobs the scheduler
//! hands out, using `tokio::process::Command` for shell rules and the
//! builtin cleanup procedure for remove rules, and reporting back to the
//! orchestration runtime via `RuntimeEvent`s.
//!
//! - [`command`] builds the shell command line (environment wrapping,
//!   quoting, platform shell).
//! - [`executor_loop`] owns the main executor loop which manages job tasks.
//! - [`job_runner`] handles a single job from start to completion event.
//! - [`builtin`] implements the remove-then-mark cleanup procedure.
//! - [`backend`] provides the `ExecutorBackend` trait and a concrete
//!   `RealExecutorBackend` that the runtime uses in production, and which
//!   tests can replace with a fake implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::fs::{FileSystem, RealFileSystem};
use crate::rules::Template;

pub mod backend;
pub mod builtin;
pub mod command;
pub mod executor_loop;
pub mod job_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use builtin::remove_then_mark;
pub use executor_loop::spawn_executor;

/// Settings shared by every job of a run.
#[derive(Debug, Clone)]
pub struct ExecOptions {
    /// Directory commands run in; job paths are relative to it.
    pub workdir: PathBuf,
    /// `[workflow].env_command`, used when `use_envs` is set.
    pub env_command: Option<Template>,
    pub use_envs: bool,
    pub fs: Arc<dyn FileSystem>,
}

impl ExecOptions {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            env_command: None,
            use_envs: false,
            fs: Arc::new(RealFileSystem),
        }
    }

    pub fn with_envs(mut self, env_command: Option<Template>, use_envs: bool) -> Self {
        self.env_command = env_command;
        self.use_envs = use_envs;
        self
    }

    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub(crate) fn resolve(&self, path: &str) -> PathBuf {
        self.workdir.join(Path::new(path))
    }
}
