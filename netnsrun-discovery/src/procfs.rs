//! `/proc` backed process source

use async_trait::async_trait;
use netnsrun_core::{Error, NamespaceId, ProcessId, Result};
use std::path::{Path, PathBuf};

use crate::source::ProcessSource;

/// Production process source reading the process-information filesystem
#[derive(Debug, Clone)]
pub struct ProcFs {
    root: PathBuf,
}

impl ProcFs {
    /// Read processes from a proc mount
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Mount point being read
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a process' network namespace reference
    #[must_use]
    pub fn net_ns_path(&self, pid: ProcessId) -> PathBuf {
        self.root.join(pid.to_string()).join("ns").join("net")
    }

    fn cmdline_path(&self, pid: ProcessId) -> PathBuf {
        self.root.join(pid.to_string()).join("cmdline")
    }

    fn list_error(&self, source: std::io::Error) -> Error {
        Error::ProcessList {
            path: self.root.display().to_string(),
            source,
        }
    }
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_PROC_ROOT)
    }
}

#[async_trait]
impl ProcessSource for ProcFs {
    async fn pids(&self) -> Result<Vec<ProcessId>> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| self.list_error(e))?;

        let mut pids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| self.list_error(e))? {
            let name = entry.file_name();
            match name.to_str().and_then(ProcessId::from_proc_entry) {
                Some(pid) => pids.push(pid),
                None => tracing::trace!(entry = ?name, "Skipping non-process entry"),
            }
        }

        Ok(pids)
    }

    async fn net_namespace(&self, pid: ProcessId) -> Result<NamespaceId> {
        let path = self.net_ns_path(pid);

        let target = tokio::fs::read_link(&path)
            .await
            .map_err(|e| Error::NamespaceResolution {
                pid,
                message: format!("readlink {}: {e}", path.display()),
            })?;

        let target = target.to_string_lossy();
        NamespaceId::from_link(&target).ok_or_else(|| Error::NamespaceResolution {
            pid,
            message: format!("malformed namespace link {target:?}"),
        })
    }

    async fn cmdline(&self, pid: ProcessId) -> Result<Vec<String>> {
        let raw = tokio::fs::read(self.cmdline_path(pid)).await?;

        let args: Vec<String> = raw
            .split(|b| *b == 0)
            .filter(|part| !part.is_empty())
            .map(|part| String::from_utf8_lossy(part).into_owned())
            .collect();

        if args.is_empty() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "empty command line",
            )));
        }

        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::symlink;
    use tempfile::tempdir;

    fn fake_process(root: &Path, pid: &str, link: &str, cmdline: Option<&[u8]>) {
        let dir = root.join(pid);
        fs::create_dir_all(dir.join("ns")).unwrap();
        symlink(link, dir.join("ns").join("net")).unwrap();
        if let Some(cmdline) = cmdline {
            fs::write(dir.join("cmdline"), cmdline).unwrap();
        }
    }

    #[tokio::test]
    async fn test_pids_skip_non_numeric() {
        let tmp = tempdir().unwrap();
        fake_process(tmp.path(), "1", "net:[100]", Some(b"/sbin/init\0"));
        fake_process(tmp.path(), "42", "net:[100]", None);
        fs::create_dir_all(tmp.path().join("self")).unwrap();
        fs::create_dir_all(tmp.path().join("sys")).unwrap();
        fs::write(tmp.path().join("uptime"), "1.0 1.0").unwrap();

        let procfs = ProcFs::new(tmp.path());
        let mut pids = procfs.pids().await.unwrap();
        pids.sort();

        assert_eq!(pids, vec![ProcessId::ROOT, ProcessId::from_raw(42)]);
    }

    #[tokio::test]
    async fn test_missing_root_is_list_error() {
        let tmp = tempdir().unwrap();
        let procfs = ProcFs::new(tmp.path().join("absent"));

        let err = procfs.pids().await.unwrap_err();
        assert!(matches!(err, Error::ProcessList { .. }));
    }

    #[tokio::test]
    async fn test_net_namespace_from_link() {
        let tmp = tempdir().unwrap();
        fake_process(tmp.path(), "7", "net:[4026531840]", None);

        let procfs = ProcFs::new(tmp.path());
        let ns = procfs.net_namespace(ProcessId::from_raw(7)).await.unwrap();

        assert_eq!(ns, NamespaceId::new("net", 4_026_531_840));
    }

    #[tokio::test]
    async fn test_net_namespace_malformed_link() {
        let tmp = tempdir().unwrap();
        fake_process(tmp.path(), "7", "not-a-namespace", None);

        let procfs = ProcFs::new(tmp.path());
        let err = procfs.net_namespace(ProcessId::from_raw(7)).await.unwrap_err();

        match err {
            Error::NamespaceResolution { pid, message } => {
                assert_eq!(pid, ProcessId::from_raw(7));
                assert!(message.contains("malformed"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_net_namespace_vanished_process() {
        let tmp = tempdir().unwrap();
        let procfs = ProcFs::new(tmp.path());

        let err = procfs.net_namespace(ProcessId::from_raw(9)).await.unwrap_err();
        assert!(matches!(err, Error::NamespaceResolution { .. }));
    }

    #[tokio::test]
    async fn test_cmdline_split_on_nul() {
        let tmp = tempdir().unwrap();
        fake_process(
            tmp.path(),
            "12",
            "net:[1]",
            Some(b"/usr/bin/python3\0-m\0http.server\0"),
        );

        let procfs = ProcFs::new(tmp.path());
        let args = procfs.cmdline(ProcessId::from_raw(12)).await.unwrap();

        assert_eq!(args, vec!["/usr/bin/python3", "-m", "http.server"]);
    }

    #[tokio::test]
    async fn test_cmdline_empty_or_missing() {
        let tmp = tempdir().unwrap();
        fake_process(tmp.path(), "2", "net:[1]", Some(b""));
        fake_process(tmp.path(), "3", "net:[1]", None);

        let procfs = ProcFs::new(tmp.path());
        assert!(procfs.cmdline(ProcessId::from_raw(2)).await.is_err());
        assert!(procfs.cmdline(ProcessId::from_raw(3)).await.is_err());
    }
}
