//! netnsrun CLI
//!
//! Runs one command inside every distinct network namespace on the host.
//! The same binary doubles as the per-namespace worker.

use netnsrun_namespace::{protocol, worker};
use std::process;

mod cli;
mod logging;
mod run;

fn main() {
    // Workers must not start a runtime: the namespace switch is per thread.
    if protocol::is_worker_invocation() {
        logging::init_worker();
        process::exit(worker::run());
    }

    let cli = cli::parse();
    let log_filter = logging::init_controller(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("❌ Error: failed to start runtime: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run::execute(cli, log_filter)) {
        eprintln!("❌ Error: {e:#}");
        process::exit(1);
    }
}
