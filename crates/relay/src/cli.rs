//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// contest-relay - create, drive and inspect contests on the ledger
#[derive(Parser, Debug)]
#[command(name = "contest-relay")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to relay.yaml config file
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Run against the in-memory sandbox ledger instead of the gateway
    #[arg(long, global = true)]
    pub sandbox: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a contest and wait until the factory reports it
    CreateContest(CreateContestArgs),

    /// Start, join, end and claim an existing contest
    RunContest(RunContestArgs),

    /// Show the factory's contest count and latest contest
    Status(StatusArgs),
}

#[derive(Args, Debug, Default)]
pub struct CreateContestArgs {
    /// Factory address (overrides contest.factory-address)
    #[arg(long)]
    pub factory: Option<String>,

    /// Seconds from now until the contest starts
    #[arg(long)]
    pub start_in: Option<u64>,

    /// Contest duration in seconds
    #[arg(long)]
    pub duration: Option<u64>,

    /// Value attached to the create message, in TON
    #[arg(long)]
    pub value: Option<String>,

    /// Seconds to wait after sending before the first check
    #[arg(long)]
    pub settle: Option<u64>,
}

#[derive(Args, Debug, Default)]
pub struct RunContestArgs {
    /// Contest address; defaults to the factory's latest contest
    #[arg(long)]
    pub contest: Option<String>,

    /// Factory address used to find the latest contest
    #[arg(long)]
    pub factory: Option<String>,

    /// Contest duration in seconds
    #[arg(long)]
    pub duration: Option<u64>,

    /// Value sent when participating, in TON
    #[arg(long)]
    pub stake: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct StatusArgs {
    /// Factory address (overrides contest.factory-address)
    #[arg(long)]
    pub factory: Option<String>,

    /// Also report the state of this contest
    #[arg(long)]
    pub contest: Option<String>,
}
