//! Worker mode: join one namespace and run the target command there
//!
//! setns(2) with `CLONE_NEWNET` changes only the calling thread. The attach
//! and the spawn of the target therefore run on one dedicated OS thread that
//! does nothing else; the main thread only waits for it.
//!
//! This module uses `unsafe` to adopt the inherited descriptors.

#![allow(unsafe_code)]

use netnsrun_core::{Error, NamespaceId, Result, TargetCommand};
use nix::sched::{CloneFlags, setns};
use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::{FromRawFd, OwnedFd, RawFd};
use std::process::Command;
use std::thread;

use crate::protocol::{
    EXIT_ATTACH_FAILED, EXIT_LAUNCH_FAILED, EXIT_PAYLOAD_FAILED, HEADER_LEN, MAX_BODY_LEN,
    NAMESPACE_FD, PAYLOAD_FD, WORKER_LOG_ENV, WORKER_MODE_ENV, WorkerMessage,
};

/// Worker thread name
pub const THREAD_NAME: &str = "netns-worker";

/// Exit status used when the worker thread itself cannot run or panics
const EXIT_INTERNAL: i32 = 101;

/// Run the worker and return the process exit status
///
/// Must be called before any async runtime or other thread is started.
#[must_use]
pub fn run() -> i32 {
    let spawned = thread::Builder::new()
        .name(THREAD_NAME.to_string())
        .spawn(run_pinned);

    match spawned {
        Ok(thread) => thread.join().unwrap_or_else(|_| {
            tracing::error!("Worker thread panicked");
            EXIT_INTERNAL
        }),
        Err(e) => {
            tracing::error!(error = %e, "Failed to start worker thread");
            EXIT_INTERNAL
        }
    }
}

/// Start -> Attached -> Executing -> Terminal, on the calling thread
fn run_pinned() -> i32 {
    if let Err(e) = attach() {
        tracing::error!(error = %e, "Failed to join network namespace");
        return EXIT_ATTACH_FAILED;
    }

    let message = match receive() {
        Ok(message) => message,
        Err(e) => {
            tracing::error!(error = %e, "Payload deserialization failed");
            return EXIT_PAYLOAD_FAILED;
        }
    };
    verify_attached(&message.namespace);

    if let Err(e) = announce(&mut std::io::stdout(), &message) {
        tracing::debug!(error = %e, "Failed to write namespace banner");
    }

    match target_command(&message.command).status() {
        Ok(status) => {
            tracing::debug!(command = %message.command, status = %status, "Target command finished");
            0
        }
        Err(e) => {
            tracing::error!(command = %message.command, error = %e, "Failed to start target command");
            EXIT_LAUNCH_FAILED
        }
    }
}

/// Write the line identifying the namespace ahead of the target's output
fn announce(out: &mut impl Write, message: &WorkerMessage) -> std::io::Result<()> {
    writeln!(
        out,
        "\n>> entering network namespace [{}] (origin pid {})",
        message.namespace, message.origin_pid
    )?;
    out.flush()
}

/// Target process with the worker-mode variables stripped
fn target_command(command: &TargetCommand) -> Command {
    let mut target = Command::new(&command.name);
    target
        .args(&command.args)
        .env_remove(WORKER_MODE_ENV)
        .env_remove(WORKER_LOG_ENV);
    target
}

/// Join the namespace behind [`NAMESPACE_FD`], then close it
fn attach() -> Result<()> {
    let handle = adopt(NAMESPACE_FD)?;
    setns(&handle, CloneFlags::CLONE_NEWNET)?;
    Ok(())
}

/// Read and decode the frame behind [`PAYLOAD_FD`]
fn receive() -> Result<WorkerMessage> {
    let mut pipe = File::from(adopt(PAYLOAD_FD)?);

    let mut frame = Vec::new();
    #[allow(clippy::cast_possible_truncation)]
    let limit = (HEADER_LEN + MAX_BODY_LEN + 1) as u64;
    Read::by_ref(&mut pipe).take(limit).read_to_end(&mut frame)?;

    WorkerMessage::decode(&frame)
}

/// Take ownership of an inherited descriptor after checking it is open
fn adopt(fd: RawFd) -> Result<OwnedFd> {
    // SAFETY: F_GETFD only queries descriptor flags.
    if unsafe { libc::fcntl(fd, libc::F_GETFD) } == -1 {
        return Err(Error::Worker {
            message: format!("descriptor {fd} not inherited: {}", std::io::Error::last_os_error()),
        });
    }

    // SAFETY: the descriptor is open and nothing else in this process owns it.
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// Log which namespace the thread ended up in
fn verify_attached(expected: &NamespaceId) {
    match std::fs::read_link("/proc/thread-self/ns/net") {
        Ok(target) => {
            let target = target.to_string_lossy();
            match NamespaceId::from_link(&target) {
                Some(ref current) if current == expected => {
                    tracing::debug!(namespace = %current, "Attached");
                }
                _ => tracing::warn!(
                    expected = %expected,
                    current = %target,
                    "Thread namespace differs from the requested one"
                ),
            }
        }
        Err(e) => tracing::debug!(error = %e, "Cannot read thread namespace"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adopt_rejects_closed_descriptor() {
        let err = adopt(987_654).unwrap_err();
        assert!(err.to_string().contains("not inherited"));
    }

    fn message() -> WorkerMessage {
        WorkerMessage {
            command: TargetCommand::new("env", Vec::new()),
            origin_pid: netnsrun_core::ProcessId::from_raw(50),
            namespace: NamespaceId::new("net", 4_026_532_500),
        }
    }

    #[test]
    fn test_announce_banner() {
        let mut out = Vec::new();
        announce(&mut out, &message()).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\n>> entering network namespace [4026532500] (origin pid 50)\n"
        );
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }
    }

    #[test]
    fn test_announce_reports_write_failure() {
        let err = announce(&mut BrokenPipe, &message()).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_target_does_not_inherit_worker_mode() {
        let command = TargetCommand::new("ip", vec!["link".to_string()]);
        let target = target_command(&command);

        assert_eq!(target.get_program(), "ip");
        let removed: Vec<_> = target
            .get_envs()
            .filter(|(_, value)| value.is_none())
            .map(|(key, _)| key.to_string_lossy().into_owned())
            .collect();
        assert!(removed.contains(&WORKER_MODE_ENV.to_string()));
        assert!(removed.contains(&WORKER_LOG_ENV.to_string()));
    }
}
