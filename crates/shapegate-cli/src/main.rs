//! shapegate main entry point

use anyhow::Result;
use clap::Parser;
use shapegate_cli::commands::{Cli, CommandExecutor};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the report
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.default_log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let executor = CommandExecutor::new();
    let result = match executor.execute(&cli).await {
        Ok(result) => result,
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(shapegate_engine::Outcome::FileError.exit_code());
        }
    };

    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    if let Some(message) = &result.error {
        eprintln!("error: {}", message);
    }
    std::process::exit(result.exit_code);
}
