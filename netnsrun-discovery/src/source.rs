//! Process source trait for pluggable implementations

use async_trait::async_trait;
use netnsrun_core::{Error, NamespaceId, ProcessId, Result};

/// Trait for anything that can enumerate processes and their namespaces
///
/// This allows for different implementations:
/// - [`ProcFs`](crate::ProcFs) - Production `/proc` reader
/// - [`MockSource`] - Testing without filesystem
///
/// # Thread Safety
/// All implementations must be `Send + Sync` for use across async tasks.
#[async_trait]
pub trait ProcessSource: Send + Sync {
    /// List every visible process, in scan order
    ///
    /// Entries that are not processes are skipped, not reported.
    ///
    /// # Errors
    /// Returns error if the process list cannot be read at all
    async fn pids(&self) -> Result<Vec<ProcessId>>;

    /// Resolve the network namespace a process belongs to
    ///
    /// # Errors
    /// Returns [`Error::NamespaceResolution`] if the process vanished, access
    /// was denied or the identity is malformed
    async fn net_namespace(&self, pid: ProcessId) -> Result<NamespaceId>;

    /// Read a process' argv
    ///
    /// # Errors
    /// Returns error if the command line is missing or empty
    async fn cmdline(&self, pid: ProcessId) -> Result<Vec<String>>;
}

/// Mock source for testing (doesn't touch filesystem)
///
/// Processes are reported in the order they were added.
///
/// # Example
/// ```
/// use netnsrun_discovery::{MockSource, NamespaceId, ProcessId, ProcessSource};
///
/// # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # rt.block_on(async {
/// let source = MockSource::new()
///     .with_process(1, NamespaceId::new("net", 10), &["/sbin/init"])
///     .with_process(50, NamespaceId::new("net", 10), &[]);
///
/// let pids = source.pids().await.unwrap();
/// assert_eq!(pids, vec![ProcessId::from_raw(1), ProcessId::from_raw(50)]);
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockSource {
    processes: Vec<MockProcess>,
    list_fails: bool,
}

#[derive(Debug, Clone)]
struct MockProcess {
    pid: ProcessId,
    namespace: Option<NamespaceId>,
    cmdline: Option<Vec<String>>,
}

impl MockSource {
    /// Create an empty mock source
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a process living in `namespace`
    ///
    /// An empty `cmdline` makes the command line unreadable, like a kernel
    /// thread.
    #[must_use]
    pub fn with_process(mut self, pid: i32, namespace: NamespaceId, cmdline: &[&str]) -> Self {
        self.processes.push(MockProcess {
            pid: ProcessId::from_raw(pid),
            namespace: Some(namespace),
            cmdline: Some(cmdline.iter().map(|s| (*s).to_string()).collect()),
        });
        self
    }

    /// Add a process whose namespace cannot be resolved
    #[must_use]
    pub fn with_unresolvable(mut self, pid: i32) -> Self {
        self.processes.push(MockProcess {
            pid: ProcessId::from_raw(pid),
            namespace: None,
            cmdline: None,
        });
        self
    }

    /// Make listing processes fail
    #[must_use]
    pub const fn with_failing_list(mut self) -> Self {
        self.list_fails = true;
        self
    }

    fn find(&self, pid: ProcessId) -> Option<&MockProcess> {
        self.processes.iter().find(|p| p.pid == pid)
    }
}

#[async_trait]
impl ProcessSource for MockSource {
    async fn pids(&self) -> Result<Vec<ProcessId>> {
        if self.list_fails {
            return Err(Error::ProcessList {
                path: "mock".to_string(),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            });
        }
        Ok(self.processes.iter().map(|p| p.pid).collect())
    }

    async fn net_namespace(&self, pid: ProcessId) -> Result<NamespaceId> {
        self.find(pid)
            .and_then(|p| p.namespace.clone())
            .ok_or_else(|| Error::NamespaceResolution {
                pid,
                message: "no such process".to_string(),
            })
    }

    async fn cmdline(&self, pid: ProcessId) -> Result<Vec<String>> {
        self.find(pid)
            .and_then(|p| p.cmdline.clone())
            .filter(|args| !args.is_empty())
            .ok_or_else(|| Error::Io(std::io::Error::from(std::io::ErrorKind::NotFound)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_lookup() {
        let ns = NamespaceId::new("net", 1);
        let source = MockSource::new()
            .with_process(7, ns.clone(), &["/bin/app", "--flag"])
            .with_unresolvable(8);

        let pid = ProcessId::from_raw(7);
        assert_eq!(source.net_namespace(pid).await.unwrap(), ns);
        assert_eq!(source.cmdline(pid).await.unwrap(), vec!["/bin/app", "--flag"]);

        let err = source.net_namespace(ProcessId::from_raw(8)).await.unwrap_err();
        assert!(matches!(err, Error::NamespaceResolution { .. }));
        assert!(source.cmdline(ProcessId::from_raw(8)).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_failing_list() {
        let source = MockSource::new().with_failing_list();
        assert!(source.pids().await.is_err());
    }
}
