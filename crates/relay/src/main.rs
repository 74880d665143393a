//! contest-relay CLI
//!
//! Creates contests through a contest factory, waits for the eventually
//! consistent ledger to report them, and drives their lifecycle. Progress is
//! logged to stderr; stdout carries a single JSON report.

mod cli;
mod commands;
mod context;
mod output;
mod report;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;
use report::Report;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize rustls crypto provider (required for rustls 0.23+)
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let report = match commands::run(cli.command, cli.config.as_deref(), cli.sandbox).await {
        Ok(report) => report,
        Err(err) => {
            output::error(&format!("{:#}", err));
            Report::from_error(&err)
        }
    };

    tracing::debug!(success = report.is_success(), "command finished");
    println!("{}", report.to_json());
    Ok(())
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
