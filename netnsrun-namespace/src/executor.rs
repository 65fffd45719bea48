//! Sequential execution across every discovered namespace

use netnsrun_core::{NamespaceEntry, NamespaceId, ProcessId, Result, TargetCommand};
use netnsrun_discovery::NamespaceCollection;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ExecutorConfig;
use crate::handle::NamespaceHandle;
use crate::launcher::{ReexecLauncher, WorkerExit, WorkerLauncher};
use crate::protocol::{
    EXIT_ATTACH_FAILED, EXIT_LAUNCH_FAILED, EXIT_PAYLOAD_FAILED, WorkerMessage,
};

/// What happened in one namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NamespaceOutcome {
    /// The target command ran; its own exit status is not judged
    Completed,
    /// The command could not be run in this namespace
    Failed {
        /// Why
        reason: String,
    },
}

impl NamespaceOutcome {
    fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Whether the command ran
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl From<WorkerExit> for NamespaceOutcome {
    fn from(exit: WorkerExit) -> Self {
        match exit {
            WorkerExit::Exited(0) => Self::Completed,
            WorkerExit::Exited(EXIT_ATTACH_FAILED) => {
                Self::failed("worker could not join the namespace")
            }
            WorkerExit::Exited(EXIT_PAYLOAD_FAILED) => Self::failed("worker rejected the payload"),
            WorkerExit::Exited(EXIT_LAUNCH_FAILED) => {
                Self::failed("target command could not be started")
            }
            WorkerExit::Exited(code) => Self::failed(format!("worker exited with status {code}")),
            WorkerExit::Signaled(signal) => {
                Self::failed(format!("worker killed by signal {signal}"))
            }
        }
    }
}

impl fmt::Display for NamespaceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "ok"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

/// Outcome recorded against one namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceReport {
    /// Namespace identity
    pub namespace: NamespaceId,
    /// Representative process
    pub pid: ProcessId,
    /// Result
    pub outcome: NamespaceOutcome,
}

/// Outcomes of a whole run, one per namespace, in execution order
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    reports: Vec<NamespaceReport>,
}

impl RunReport {
    /// Per-namespace reports in execution order
    #[must_use]
    pub fn reports(&self) -> &[NamespaceReport] {
        &self.reports
    }

    /// Report for one namespace
    #[must_use]
    pub fn get(&self, namespace: &NamespaceId) -> Option<&NamespaceReport> {
        self.reports.iter().find(|r| &r.namespace == namespace)
    }

    /// Number of namespaces visited
    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    /// Whether no namespace was visited
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Namespaces where the command ran
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_completed()).count()
    }

    /// Namespaces where it did not
    #[must_use]
    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }
}

/// Runs a command once in every namespace of a collection
pub struct NamespaceExecutor {
    launcher: Arc<dyn WorkerLauncher>,
    proc_root: PathBuf,
}

impl NamespaceExecutor {
    /// Create an executor with any launcher
    #[must_use]
    pub fn new(launcher: Arc<dyn WorkerLauncher>, config: &ExecutorConfig) -> Self {
        Self {
            launcher,
            proc_root: config.proc_root.clone(),
        }
    }

    /// Create an executor that re-executes the worker binary
    ///
    /// # Errors
    /// Returns error if the worker binary cannot be resolved
    pub fn reexec(config: &ExecutorConfig) -> Result<Self> {
        Ok(Self::new(
            Arc::new(ReexecLauncher::from_config(config)?),
            config,
        ))
    }

    /// Run `command` in every namespace, one at a time, ordered by
    /// representative pid
    ///
    /// Failures are recorded per namespace and never stop the run.
    pub async fn run_all(
        &self,
        collection: &NamespaceCollection,
        command: &TargetCommand,
    ) -> RunReport {
        let mut report = RunReport::default();

        for entry in collection.by_representative() {
            let outcome = self.run_one(entry, command).await;

            match outcome {
                NamespaceOutcome::Completed => tracing::debug!(
                    namespace = %entry.namespace,
                    pid = %entry.representative,
                    "Namespace done"
                ),
                NamespaceOutcome::Failed { ref reason } => tracing::warn!(
                    namespace = %entry.namespace,
                    pid = %entry.representative,
                    reason = %reason,
                    "Namespace failed"
                ),
            }

            report.reports.push(NamespaceReport {
                namespace: entry.namespace.clone(),
                pid: entry.representative,
                outcome,
            });
        }

        report
    }

    /// Run `command` in a single namespace
    pub async fn run_one(&self, entry: &NamespaceEntry, command: &TargetCommand) -> NamespaceOutcome {
        let handle = match NamespaceHandle::open(&self.proc_root, entry) {
            Ok(handle) => handle,
            Err(e) => return NamespaceOutcome::failed(e.to_string()),
        };

        let outcome = match self.dispatch(&handle, entry, command).await {
            Ok(exit) => NamespaceOutcome::from(exit),
            Err(e) => NamespaceOutcome::failed(e.to_string()),
        };

        let path = handle.path().to_path_buf();
        if let Err(e) = handle.release() {
            tracing::warn!(path = %path.display(), error = %e, "Failed to release namespace handle");
        }

        outcome
    }

    async fn dispatch(
        &self,
        handle: &NamespaceHandle,
        entry: &NamespaceEntry,
        command: &TargetCommand,
    ) -> Result<WorkerExit> {
        let frame = WorkerMessage {
            command: command.clone(),
            origin_pid: entry.representative,
            namespace: entry.namespace.clone(),
        }
        .encode()?;

        tracing::info!(
            namespace = %entry.namespace,
            pid = %entry.representative,
            "Launching worker"
        );
        self.launcher.launch(handle, frame).await
    }
}
