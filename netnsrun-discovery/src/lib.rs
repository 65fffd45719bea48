//! Network namespace discovery with pluggable process sources
//!
//! Walks every visible process, resolves its network namespace and command
//! line, and folds the results into one entry per distinct namespace.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod policy;
pub mod procfs;
pub mod scanner;
pub mod source;

pub use config::DiscoveryConfig;
pub use policy::{CandidateClass, RepresentativePolicy};
pub use procfs::ProcFs;
pub use scanner::{NamespaceCollection, NamespaceScanner};
pub use source::{MockSource, ProcessSource};

// Re-export commonly used types
pub use netnsrun_core::{NamespaceEntry, NamespaceId, ProcessId, ProcessRecord};
