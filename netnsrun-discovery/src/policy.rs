//! Representative selection among processes sharing a namespace

use netnsrun_core::{NamespaceEntry, ProcessId, ProcessRecord};
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_ANCHOR_COMMAND;

/// How suitable a process is to stand in for its namespace
///
/// Variants are declared lowest rank first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateClass {
    /// Any other process
    Ordinary,
    /// Minimal process whose only job is holding the namespace open
    Anchor,
    /// pid 1
    Root,
}

/// Ranked comparator over candidate representatives
///
/// Higher class wins. Among anchors the highest pid wins, the one a `/proc`
/// walk would reach last; among ordinary processes the lowest pid wins, the
/// one it would reach first. The result does not depend on the order
/// processes are scanned in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepresentativePolicy {
    anchor_command: String,
}

impl Default for RepresentativePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ANCHOR_COMMAND)
    }
}

impl RepresentativePolicy {
    /// Create a policy recognizing `anchor_command` as argv\[0\] of anchors
    #[must_use]
    pub fn new(anchor_command: impl Into<String>) -> Self {
        Self {
            anchor_command: anchor_command.into(),
        }
    }

    /// Anchor sentinel in use
    #[must_use]
    pub fn anchor_command(&self) -> &str {
        &self.anchor_command
    }

    /// Classify a process by pid and first argument
    #[must_use]
    pub fn classify(&self, pid: ProcessId, first_arg: Option<&str>) -> CandidateClass {
        if pid.is_root() {
            CandidateClass::Root
        } else if first_arg == Some(self.anchor_command.as_str()) {
            CandidateClass::Anchor
        } else {
            CandidateClass::Ordinary
        }
    }

    fn rank(&self, pid: ProcessId, first_arg: Option<&str>) -> (CandidateClass, i64) {
        let class = self.classify(pid, first_arg);
        let pid = i64::from(pid.as_raw());
        match class {
            CandidateClass::Anchor => (class, pid),
            CandidateClass::Root | CandidateClass::Ordinary => (class, -pid),
        }
    }

    /// Whether `candidate` should replace the current representative
    #[must_use]
    pub fn prefers(&self, candidate: &ProcessRecord, current: &NamespaceEntry) -> bool {
        self.rank(candidate.pid, candidate.first_arg())
            > self.rank(current.representative, current.first_arg())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netnsrun_core::NamespaceId;

    fn record(pid: i32, cmdline: Option<&[&str]>) -> ProcessRecord {
        ProcessRecord {
            pid: ProcessId::from_raw(pid),
            namespace: NamespaceId::new("net", 1),
            cmdline: cmdline.map(|args| args.iter().map(|s| (*s).to_string()).collect()),
        }
    }

    fn entry(pid: i32, cmdline: Option<&[&str]>) -> NamespaceEntry {
        record(pid, cmdline).into()
    }

    #[test]
    fn test_classify() {
        let policy = RepresentativePolicy::default();

        assert_eq!(policy.classify(ProcessId::ROOT, None), CandidateClass::Root);
        assert_eq!(
            policy.classify(ProcessId::ROOT, Some("/pause")),
            CandidateClass::Root
        );
        assert_eq!(
            policy.classify(ProcessId::from_raw(50), Some("/pause")),
            CandidateClass::Anchor
        );
        assert_eq!(
            policy.classify(ProcessId::from_raw(50), Some("pause")),
            CandidateClass::Ordinary
        );
        assert_eq!(
            policy.classify(ProcessId::from_raw(50), None),
            CandidateClass::Ordinary
        );
    }

    #[test]
    fn test_root_beats_anchor() {
        let policy = RepresentativePolicy::default();
        let pause: &[&str] = &["/pause"];

        assert!(policy.prefers(&record(1, None), &entry(50, Some(pause))));
        assert!(!policy.prefers(&record(50, Some(pause)), &entry(1, None)));
    }

    #[test]
    fn test_root_beats_ordinary() {
        let policy = RepresentativePolicy::default();
        let app: &[&str] = &["/bin/app"];

        assert!(policy.prefers(&record(1, None), &entry(99, Some(app))));
        assert!(!policy.prefers(&record(99, Some(app)), &entry(1, None)));
    }

    #[test]
    fn test_anchor_beats_ordinary() {
        let policy = RepresentativePolicy::default();
        let pause: &[&str] = &["/pause"];
        let app: &[&str] = &["/bin/app"];

        assert!(policy.prefers(&record(500, Some(pause)), &entry(99, Some(app))));
        assert!(!policy.prefers(&record(99, Some(app)), &entry(500, Some(pause))));
    }

    #[test]
    fn test_lower_pid_wins_among_ordinary() {
        let policy = RepresentativePolicy::default();
        let app: &[&str] = &["/bin/app"];

        assert!(policy.prefers(&record(10, Some(app)), &entry(20, None)));
        assert!(!policy.prefers(&record(20, None), &entry(10, Some(app))));
    }

    #[test]
    fn test_higher_pid_wins_among_anchors() {
        let policy = RepresentativePolicy::default();
        let pause: &[&str] = &["/pause"];

        assert!(policy.prefers(&record(40, Some(pause)), &entry(30, Some(pause))));
        assert!(!policy.prefers(&record(30, Some(pause)), &entry(40, Some(pause))));
    }

    #[test]
    fn test_custom_anchor() {
        let policy = RepresentativePolicy::new("/usr/bin/holder");
        assert_eq!(policy.anchor_command(), "/usr/bin/holder");
        assert_eq!(
            policy.classify(ProcessId::from_raw(3), Some("/usr/bin/holder")),
            CandidateClass::Anchor
        );
        assert_eq!(
            policy.classify(ProcessId::from_raw(3), Some("/pause")),
            CandidateClass::Ordinary
        );
    }
}
