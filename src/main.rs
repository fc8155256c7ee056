mod cli;

use colored::Colorize;
use tracing_subscriber::EnvFilter;

/// Logging goes to stderr, and only when `NODETYPE_GEN_LOG` (or `RUST_LOG`)
/// is set; stdout carries the generated JSON.
fn init_logging() {
    let filter = EnvFilter::try_from_env("NODETYPE_GEN_LOG").or_else(|_| EnvFilter::try_from_default_env());
    let Ok(filter) = filter else {
        return
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}

fn main() {
    init_logging();
    let command_line_interface = cli::CommandLineInterface::load();
    if let Err(error) = command_line_interface.run() {
        eprintln!("{} {error:#}", "error:".red().bold());
        std::process::exit(1);
    }
}
