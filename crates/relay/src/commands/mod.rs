//! Command implementations

pub mod create;
pub mod lifecycle;
pub mod status;

use anyhow::Result;
use camino::Utf8Path;

use crate::cli::Commands;
use crate::context::RelayContext;
use crate::report::Report;

/// Run one command against the selected ledger
pub async fn run(command: Commands, config_path: Option<&Utf8Path>, sandbox: bool) -> Result<Report> {
    let ctx = RelayContext::load(config_path, sandbox)?;

    match command {
        Commands::CreateContest(args) => create::run(args, &ctx).await,
        Commands::RunContest(args) => lifecycle::run(args, &ctx).await,
        Commands::Status(args) => status::run(args, &ctx).await,
    }
}
