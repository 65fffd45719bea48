//! Controller: discover namespaces, then visit each one

use anyhow::{Context, Result};
use netnsrun_core::TargetCommand;
use netnsrun_discovery::{DiscoveryConfig, NamespaceScanner};
use netnsrun_namespace::{ExecutorConfig, NamespaceExecutor, RunReport};
use tracing::{info, warn};

use crate::cli::Cli;

/// Only discovery failures make this return an error; per-namespace
/// failures end up in the summary.
pub async fn execute(cli: Cli, log_filter: String) -> Result<()> {
    let command = TargetCommand::parse(&cli.command).context("Cannot parse command")?;
    info!(command = %command, "Running in every network namespace");

    if !nix::unistd::geteuid().is_root() {
        warn!("Not running as root; other users' namespaces cannot be read or joined");
    }

    let discovery = DiscoveryConfig::new();
    let namespaces = NamespaceScanner::procfs(&discovery)
        .scan()
        .await
        .context("Namespace discovery failed")?;

    let config = ExecutorConfig::new()
        .with_proc_root(discovery.proc_root.clone())
        .with_log_filter(log_filter);
    let executor = NamespaceExecutor::reexec(&config).context("Failed to set up executor")?;

    let report = executor.run_all(&namespaces, &command).await;
    print_summary(&report);

    Ok(())
}

fn print_summary(report: &RunReport) {
    println!("\n📋 Network namespaces");
    println!("{:-<60}", "");

    for entry in report.reports() {
        println!(
            "  {:<12} pid {:<8} {}",
            entry.namespace.to_string(),
            entry.pid.to_string(),
            entry.outcome
        );
    }

    println!("{:-<60}", "");
    println!(
        "Total: {} namespace(s), {} ok, {} failed",
        report.len(),
        report.succeeded(),
        report.failed()
    );
}
