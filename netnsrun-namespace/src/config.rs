//! Executor configuration

use netnsrun_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Executor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Where the process-information filesystem is mounted
    pub proc_root: PathBuf,

    /// Binary re-executed in worker mode (default: current executable)
    pub worker_exe: Option<PathBuf>,

    /// Log filter forwarded to workers
    pub log_filter: Option<String>,
}

impl ExecutorConfig {
    /// Create a new executor configuration reading `/proc`
    #[must_use]
    pub fn new() -> Self {
        Self {
            proc_root: PathBuf::from(netnsrun_discovery::config::DEFAULT_PROC_ROOT),
            ..Self::default()
        }
    }

    /// Open namespace references under a different proc mount
    #[must_use]
    pub fn with_proc_root(mut self, proc_root: impl Into<PathBuf>) -> Self {
        self.proc_root = proc_root.into();
        self
    }

    /// Re-execute a specific binary as the worker
    #[must_use]
    pub fn with_worker_exe(mut self, worker_exe: impl Into<PathBuf>) -> Self {
        self.worker_exe = Some(worker_exe.into());
        self
    }

    /// Forward a log filter to workers
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = Some(filter.into());
        self
    }

    /// Binary to launch as the worker
    ///
    /// # Errors
    /// Returns error if no binary is configured and the current executable
    /// cannot be determined
    pub fn resolve_worker_exe(&self) -> Result<PathBuf> {
        if let Some(ref exe) = self.worker_exe {
            return Ok(exe.clone());
        }

        std::env::current_exe().map_err(|e| Error::InvalidConfig {
            message: format!("cannot locate current executable: {e}"),
        })
    }
}
