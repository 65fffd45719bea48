//! Open references to network namespaces

use netnsrun_core::{Error, NamespaceEntry, NamespaceId, ProcessId, Result};
use std::fs::File;
use std::os::fd::{AsFd, BorrowedFd, IntoRawFd, OwnedFd};
use std::path::{Path, PathBuf};

/// An open `/proc/<pid>/ns/net` reference
///
/// Holding the descriptor keeps the namespace alive even if the
/// representative process exits before the worker attaches.
#[derive(Debug)]
pub struct NamespaceHandle {
    fd: OwnedFd,
    namespace: NamespaceId,
    pid: ProcessId,
    path: PathBuf,
}

impl NamespaceHandle {
    /// Open the namespace reference of an entry's representative
    ///
    /// # Errors
    /// Returns [`Error::NamespaceOpen`] if the process is gone or access is
    /// denied
    pub fn open(proc_root: &Path, entry: &NamespaceEntry) -> Result<Self> {
        let path = proc_root
            .join(entry.representative.to_string())
            .join("ns")
            .join("net");

        let file = File::open(&path).map_err(|source| Error::NamespaceOpen {
            pid: entry.representative,
            path: path.display().to_string(),
            source,
        })?;

        Ok(Self {
            fd: OwnedFd::from(file),
            namespace: entry.namespace.clone(),
            pid: entry.representative,
            path,
        })
    }

    /// Namespace this handle refers to
    #[must_use]
    pub const fn namespace(&self) -> &NamespaceId {
        &self.namespace
    }

    /// Process the handle was opened through
    #[must_use]
    pub const fn pid(&self) -> ProcessId {
        self.pid
    }

    /// Path the handle was opened from
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the handle, reporting close(2) failures instead of dropping them
    ///
    /// # Errors
    /// Returns error if close fails
    pub fn release(self) -> Result<()> {
        let raw = self.fd.into_raw_fd();

        // SAFETY: `raw` came out of an OwnedFd and is closed exactly once.
        if unsafe { libc::close(raw) } == 0 {
            Ok(())
        } else {
            Err(Error::Io(std::io::Error::last_os_error()))
        }
    }
}

impl AsFd for NamespaceHandle {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}
