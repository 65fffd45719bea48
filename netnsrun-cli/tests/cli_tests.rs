use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::File;
use std::os::fd::AsRawFd;
use std::os::unix::process::CommandExt;

/// Check if running as root
fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[test]
fn test_help_command() {
    Command::new(env!("CARGO_BIN_EXE_netnsrun"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("every network namespace"))
        .stdout(predicate::str::contains("--verbose"))
        .stdout(predicate::str::contains("netnsrun \"ip addr show\""));
}

#[test]
fn test_version_command() {
    Command::new(env!("CARGO_BIN_EXE_netnsrun"))
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("netnsrun"));
}

#[test]
fn test_missing_command_exits_one() {
    Command::new(env!("CARGO_BIN_EXE_netnsrun"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_unquoted_command_exits_one() {
    Command::new(env!("CARGO_BIN_EXE_netnsrun"))
        .arg("ip")
        .arg("addr")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unexpected argument"));
}

#[test]
fn test_blank_command_rejected() {
    Command::new(env!("CARGO_BIN_EXE_netnsrun"))
        .arg("   ")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("command cannot be empty"));
}

#[test]
fn test_worker_without_handle_fails_to_attach() {
    Command::new(env!("CARGO_BIN_EXE_netnsrun"))
        .env("NETNSRUN_WORKER", "1")
        .assert()
        .code(125)
        .stdout(predicate::str::contains("entering").not());
}

#[test]
fn test_worker_without_payload_exits_126() {
    // Joining a namespace needs CAP_SYS_ADMIN, even the current one
    if !is_root() {
        return;
    }

    let ns = File::open("/proc/self/ns/net").unwrap();
    let ns_fd = ns.as_raw_fd();

    let mut worker = std::process::Command::new(env!("CARGO_BIN_EXE_netnsrun"));
    worker.env("NETNSRUN_WORKER", "1");
    // SAFETY: only fcntl(2), dup2(2) and close(2) run in the child.
    unsafe {
        worker.pre_exec(move || {
            let scratch = libc::fcntl(ns_fd, libc::F_DUPFD_CLOEXEC, 10);
            if scratch == -1 || libc::dup2(scratch, 3) == -1 {
                return Err(std::io::Error::last_os_error());
            }
            libc::close(4);
            Ok(())
        });
    }

    Command::from_std(worker)
        .assert()
        .code(126)
        .stdout(predicate::str::contains("entering").not());
    drop(ns);
}

#[test]
#[ignore] // Requires root
fn test_echo_in_every_namespace() {
    if !is_root() {
        return;
    }

    Command::new(env!("CARGO_BIN_EXE_netnsrun"))
        .arg("echo hi")
        .assert()
        .success()
        .stdout(predicate::str::contains(">> entering network namespace"))
        .stdout(predicate::str::contains("hi"));
}
