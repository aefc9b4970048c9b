#![allow(clippy::print_stderr)]

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;

use propel::cli::args::CliArgs;
use propel::cli::driver;

fn main() -> Result<()> {
    // Tracing is opt-in via PROPEL_LOG or RUST_LOG; zero cost otherwise.
    init_tracing();

    let args = CliArgs::parse();
    let color = std::io::stdout().is_terminal();
    let code = driver::run(&args, color)?;
    std::process::exit(code);
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = std::env::var("PROPEL_LOG").or_else(|_| std::env::var("RUST_LOG"));
    if let Ok(filter) = filter {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(filter))
            .with_writer(std::io::stderr)
            .init();
    }
}
