//! CLI argument definitions

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "netnsrun")]
#[command(about = "Run a command once in every network namespace on the host", long_about = None)]
#[command(version)]
#[command(after_help = "Example:\n  netnsrun \"ip addr show\"")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to run, quoted as a single space-delimited argument
    pub command: String,
}

/// Parse arguments; usage errors exit with status 1
pub fn parse() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    }
}
