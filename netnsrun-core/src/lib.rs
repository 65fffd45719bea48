//! netnsrun core - data model and error types
//!
//! This crate provides the types shared by namespace discovery, the
//! cross-namespace executor and the CLI.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{NamespaceEntry, NamespaceId, ProcessId, ProcessRecord, TargetCommand};
