//! Worker launchers
//!
//! This module uses `unsafe` for the `pre_exec` hook that moves the
//! namespace handle and payload pipe onto their fixed descriptors.

#![allow(unsafe_code)]

use async_trait::async_trait;
use bytes::Bytes;
use netnsrun_core::{Error, NamespaceId, Result};
use std::collections::HashMap;
use std::io::{self, Write};
use std::os::fd::{AsFd, AsRawFd, RawFd};
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::ExecutorConfig;
use crate::handle::NamespaceHandle;
use crate::protocol::{NAMESPACE_FD, PAYLOAD_FD, WORKER_LOG_ENV, WORKER_MODE_ENV, WorkerMessage};

/// Lowest descriptor used for scratch copies in the child
const SCRATCH_FD_FLOOR: RawFd = 10;

/// How a worker process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Exited normally with a status code
    Exited(i32),
    /// Killed by a signal
    Signaled(i32),
}

impl From<ExitStatus> for WorkerExit {
    fn from(status: ExitStatus) -> Self {
        match (status.code(), status.signal()) {
            (Some(code), _) => Self::Exited(code),
            (None, Some(signal)) => Self::Signaled(signal),
            (None, None) => Self::Exited(-1),
        }
    }
}

/// Trait for starting a worker inside a namespace
///
/// This allows for different implementations:
/// - [`ReexecLauncher`] - Production re-exec of the current binary
/// - [`MockLauncher`] - Testing without spawning processes
#[async_trait]
pub trait WorkerLauncher: Send + Sync {
    /// Start a worker for `handle`, hand it `frame`, and wait for it to exit
    ///
    /// # Errors
    /// Returns error if the worker could not be spawned or waited on
    async fn launch(&self, handle: &NamespaceHandle, frame: Bytes) -> Result<WorkerExit>;
}

/// Launches workers by re-executing a binary in worker mode
#[derive(Debug, Clone)]
pub struct ReexecLauncher {
    exe: PathBuf,
    log_filter: Option<String>,
}

impl ReexecLauncher {
    /// Create a launcher for a specific worker binary
    #[must_use]
    pub fn new(exe: impl Into<PathBuf>) -> Self {
        Self {
            exe: exe.into(),
            log_filter: None,
        }
    }

    /// Create a launcher from executor configuration
    ///
    /// # Errors
    /// Returns error if the worker binary cannot be resolved
    pub fn from_config(config: &ExecutorConfig) -> Result<Self> {
        Ok(Self {
            exe: config.resolve_worker_exe()?,
            log_filter: config.log_filter.clone(),
        })
    }

    /// Binary being re-executed
    #[must_use]
    pub const fn exe(&self) -> &PathBuf {
        &self.exe
    }
}

#[async_trait]
impl WorkerLauncher for ReexecLauncher {
    async fn launch(&self, handle: &NamespaceHandle, frame: Bytes) -> Result<WorkerExit> {
        let (reader, mut writer) = io::pipe()?;

        let ns_fd = handle.as_fd().as_raw_fd();
        let payload_fd = reader.as_raw_fd();

        let mut command = tokio::process::Command::new(&self.exe);
        command
            .env(WORKER_MODE_ENV, "1")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(ref filter) = self.log_filter {
            command.env(WORKER_LOG_ENV, filter);
        }

        // SAFETY: the hook only calls fcntl(2) and dup2(2), both
        // async-signal-safe, on descriptors that stay open until spawn returns.
        unsafe {
            command.pre_exec(move || place_descriptors(ns_fd, payload_fd));
        }

        let mut child = command.spawn().map_err(|e| Error::Worker {
            message: format!("failed to spawn {}: {e}", self.exe.display()),
        })?;
        drop(reader);

        tracing::debug!(
            pid = ?child.id(),
            namespace = %handle.namespace(),
            "Worker spawned"
        );

        // A worker that died before reading makes this fail with EPIPE; its
        // exit status says more than the write error.
        if let Err(e) = writer.write_all(&frame) {
            tracing::warn!(namespace = %handle.namespace(), error = %e, "Failed to send payload");
        }
        drop(writer);

        let status = child.wait().await.map_err(|e| Error::Worker {
            message: format!("failed to wait for worker: {e}"),
        })?;

        Ok(WorkerExit::from(status))
    }
}

/// Move the namespace handle to [`NAMESPACE_FD`] and the payload pipe to
/// [`PAYLOAD_FD`], clearing close-on-exec on both
///
/// Both sources are first copied above [`SCRATCH_FD_FLOOR`] so that a source
/// already sitting on 3 or 4 is not clobbered by the other dup2.
fn place_descriptors(ns_fd: RawFd, payload_fd: RawFd) -> io::Result<()> {
    // SAFETY: plain descriptor syscalls; the scratch copies are close-on-exec.
    unsafe {
        let ns_scratch = cvt(libc::fcntl(ns_fd, libc::F_DUPFD_CLOEXEC, SCRATCH_FD_FLOOR))?;
        let payload_scratch =
            cvt(libc::fcntl(payload_fd, libc::F_DUPFD_CLOEXEC, SCRATCH_FD_FLOOR))?;
        cvt(libc::dup2(ns_scratch, NAMESPACE_FD))?;
        cvt(libc::dup2(payload_scratch, PAYLOAD_FD))?;
    }
    Ok(())
}

fn cvt(ret: libc::c_int) -> io::Result<libc::c_int> {
    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret)
    }
}

/// Mock launcher for testing (doesn't spawn anything)
///
/// Every launch is decoded and recorded; exits default to success.
#[derive(Clone, Default)]
pub struct MockLauncher {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    launched: Vec<WorkerMessage>,
    exits: HashMap<NamespaceId, WorkerExit>,
    spawn_failures: Vec<NamespaceId>,
}

impl MockLauncher {
    /// Create a new mock launcher
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the worker for `namespace` end with `exit`
    pub async fn set_exit(&self, namespace: NamespaceId, exit: WorkerExit) {
        self.state.lock().await.exits.insert(namespace, exit);
    }

    /// Make spawning the worker for `namespace` fail
    pub async fn fail_spawn(&self, namespace: NamespaceId) {
        self.state.lock().await.spawn_failures.push(namespace);
    }

    /// Messages handed to workers so far, in launch order
    pub async fn launched(&self) -> Vec<WorkerMessage> {
        self.state.lock().await.launched.clone()
    }
}

#[async_trait]
impl WorkerLauncher for MockLauncher {
    async fn launch(&self, handle: &NamespaceHandle, frame: Bytes) -> Result<WorkerExit> {
        let message = WorkerMessage::decode(&frame)?;
        let mut state = self.state.lock().await;

        if state.spawn_failures.contains(handle.namespace()) {
            return Err(Error::Worker {
                message: "mock spawn failure".to_string(),
            });
        }

        state.launched.push(message);
        Ok(state
            .exits
            .get(handle.namespace())
            .copied()
            .unwrap_or(WorkerExit::Exited(0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    #[test]
    fn test_worker_exit_from_status() {
        let status = Command::new("/bin/sh")
            .args(["-c", "exit 3"])
            .status()
            .unwrap();
        assert_eq!(WorkerExit::from(status), WorkerExit::Exited(3));

        let status = Command::new("/bin/sh")
            .args(["-c", "kill -9 $$"])
            .status()
            .unwrap();
        assert_eq!(WorkerExit::from(status), WorkerExit::Signaled(9));
    }

    #[test]
    fn test_reexec_from_config() {
        let config = ExecutorConfig::new()
            .with_worker_exe("/opt/netnsrun")
            .with_log_filter("trace");

        let launcher = ReexecLauncher::from_config(&config).unwrap();
        assert_eq!(launcher.exe(), &PathBuf::from("/opt/netnsrun"));
        assert_eq!(launcher.log_filter.as_deref(), Some("trace"));
    }
}
