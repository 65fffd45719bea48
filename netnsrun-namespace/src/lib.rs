//! Cross-namespace command execution
//!
//! The controller side opens each namespace, re-executes the current binary
//! in worker mode with the namespace handle and a framed payload on fixed
//! descriptors, and waits for it. The worker side joins the namespace on a
//! dedicated thread and runs the target command there.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod config;
pub mod executor;
pub mod handle;
pub mod launcher;
pub mod protocol;
pub mod worker;

pub use config::ExecutorConfig;
pub use executor::{NamespaceExecutor, NamespaceOutcome, NamespaceReport, RunReport};
pub use handle::NamespaceHandle;
pub use launcher::{MockLauncher, ReexecLauncher, WorkerExit, WorkerLauncher};
pub use protocol::WorkerMessage;
