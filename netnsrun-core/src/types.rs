//! Core type definitions with strong typing and validation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Process identifier
///
/// Always a positive integer; `/proc` entries that do not parse as one are
/// not processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct ProcessId(i32);

impl ProcessId {
    /// The init process of the scanned pid namespace
    pub const ROOT: Self = Self(1);

    /// Create from raw PID
    #[must_use]
    pub const fn from_raw(pid: i32) -> Self {
        Self(pid)
    }

    /// Parse a `/proc` directory name
    ///
    /// Returns `None` for anything that is not a plain positive decimal
    /// number (`self`, `sys`, `0`, `+5`, ...).
    #[must_use]
    pub fn from_proc_entry(name: &str) -> Option<Self> {
        if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        match name.parse::<i32>() {
            Ok(pid) if pid > 0 => Some(Self(pid)),
            _ => None,
        }
    }

    /// Get the current process ID
    #[must_use]
    pub fn current() -> Self {
        #[allow(clippy::cast_possible_wrap)]
        Self(std::process::id() as i32)
    }

    /// Whether this is pid 1
    #[must_use]
    pub const fn is_root(self) -> bool {
        self.0 == Self::ROOT.0
    }

    /// Get raw PID value
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a network namespace
///
/// Taken from the target of `/proc/<pid>/ns/net`, which reads
/// `net:[4026531840]`. Equality is all that is meaningful; the inode number
/// carries no ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamespaceId {
    kind: String,
    inode: u64,
}

impl NamespaceId {
    /// Create from a kind word and inode number
    #[must_use]
    pub fn new(kind: impl Into<String>, inode: u64) -> Self {
        Self {
            kind: kind.into(),
            inode,
        }
    }

    /// Parse a namespace link target of shape `word:[number]`
    #[must_use]
    pub fn from_link(target: &str) -> Option<Self> {
        let (kind, rest) = target.split_once(':')?;
        let inode = rest.strip_prefix('[')?.strip_suffix(']')?;

        if kind.is_empty() || !kind.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            return None;
        }
        if inode.is_empty() || !inode.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        Some(Self::new(kind, inode.parse().ok()?))
    }

    /// Namespace kind as reported by the kernel (`net`)
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Inode number of the namespace
    #[must_use]
    pub const fn inode(&self) -> u64 {
        self.inode
    }
}

impl fmt::Display for NamespaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inode)
    }
}

/// One scanned process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    /// Process identifier
    pub pid: ProcessId,
    /// Network namespace the process lives in
    pub namespace: NamespaceId,
    /// argv, `None` when unreadable or empty
    pub cmdline: Option<Vec<String>>,
}

impl ProcessRecord {
    /// First command-line argument, if any
    #[must_use]
    pub fn first_arg(&self) -> Option<&str> {
        first_arg(self.cmdline.as_deref())
    }
}

/// The single process chosen to represent a namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceEntry {
    /// Namespace key
    pub namespace: NamespaceId,
    /// Representative process
    pub representative: ProcessId,
    /// Representative's argv
    pub cmdline: Option<Vec<String>>,
}

impl NamespaceEntry {
    /// First command-line argument of the representative, if any
    #[must_use]
    pub fn first_arg(&self) -> Option<&str> {
        first_arg(self.cmdline.as_deref())
    }
}

impl From<ProcessRecord> for NamespaceEntry {
    fn from(record: ProcessRecord) -> Self {
        Self {
            namespace: record.namespace,
            representative: record.pid,
            cmdline: record.cmdline,
        }
    }
}

fn first_arg(cmdline: Option<&[String]>) -> Option<&str> {
    cmdline.and_then(<[String]>::first).map(String::as_str)
}

/// The command the operator asked to run in every namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetCommand {
    /// Executable name or path
    pub name: String,
    /// Arguments, possibly empty
    #[serde(default)]
    pub args: Vec<String>,
}

impl TargetCommand {
    /// Create from a program and its arguments
    #[must_use]
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Split a space-delimited command string
    ///
    /// # Errors
    /// Returns error if the string holds no words
    pub fn parse(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace().map(str::to_string);

        let Some(name) = words.next() else {
            return Err(Error::InvalidCommand {
                message: "command cannot be empty".to_string(),
            });
        };

        Ok(Self::new(name, words.collect()))
    }
}

impl fmt::Display for TargetCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

impl FromStr for TargetCommand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
