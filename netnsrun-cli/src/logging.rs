//! Logging setup for controller and worker processes

use netnsrun_namespace::protocol::WORKER_LOG_ENV;
use tracing_subscriber::EnvFilter;

/// Initialize logging for the controller
///
/// `RUST_LOG` wins over the verbose flag. Returns the filter in effect so it
/// can be forwarded to workers.
pub fn init_controller(verbose: bool) -> String {
    let default = if verbose { "debug" } else { "info" };
    let directives = std::env::var("RUST_LOG").unwrap_or_else(|_| default.to_string());

    init(&directives);
    directives
}

/// Initialize logging for a worker from the filter its controller passed on
pub fn init_worker() {
    let directives = std::env::var(WORKER_LOG_ENV).unwrap_or_else(|_| "warn".to_string());
    init(&directives);
}

fn init(directives: &str) {
    let filter = EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
