//! Discovery configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default mount point of the process-information filesystem
pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// First argument of the per-pod sandbox process that holds a namespace open
pub const DEFAULT_ANCHOR_COMMAND: &str = "/pause";

/// Discovery configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Where the process-information filesystem is mounted
    pub proc_root: PathBuf,

    /// argv\[0\] that marks a namespace anchor process
    pub anchor_command: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from(DEFAULT_PROC_ROOT),
            anchor_command: DEFAULT_ANCHOR_COMMAND.to_string(),
        }
    }
}

impl DiscoveryConfig {
    /// Create a new discovery configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan a different proc mount
    #[must_use]
    pub fn with_proc_root(mut self, proc_root: impl Into<PathBuf>) -> Self {
        self.proc_root = proc_root.into();
        self
    }

    /// Recognize a different anchor command
    #[must_use]
    pub fn with_anchor_command(mut self, anchor_command: impl Into<String>) -> Self {
        self.anchor_command = anchor_command.into();
        self
    }
}
