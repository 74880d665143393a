//! status command

use anyhow::Result;
use relay_core::retry::{RetryExecutor, TracingObserver};
use relay_core::types::RetryPolicy;
use relay_ledger::{Address, Contest, ContestFactory, ContestInfo, ContestStatus, TransientLedgerErrors};

use crate::cli::StatusArgs;
use crate::context::RelayContext;
use crate::output;
use crate::report::Report;

/// What the factory and, optionally, one contest currently report
#[derive(Debug, Clone, PartialEq)]
pub struct FactoryStatus {
    pub contest_count: u64,
    pub latest: Option<Address>,
    pub contest: Option<(Address, ContestStatus, ContestInfo)>,
}

pub async fn run(args: StatusArgs, ctx: &RelayContext) -> Result<Report> {
    let factory = ctx.factory(args.factory.as_deref())?;
    let contest = match &args.contest {
        Some(raw) => Some(Contest::new(ctx.client.clone(), Address::parse(raw)?)),
        None => None,
    };

    let status = read_status(&factory, contest.as_ref(), &ctx.config.retry).await?;

    output::header("Factory status");
    output::kv("Factory", &factory.address().to_string());
    output::kv("Backend", ctx.client.name());
    output::kv("Contests", &status.contest_count.to_string());
    match &status.latest {
        Some(address) => output::kv("Latest contest", &address.to_string()),
        None => output::kv("Latest contest", "none"),
    }
    if let Some((address, state, info)) = &status.contest {
        output::header("Contest");
        output::kv("Address", &address.to_string());
        output::kv("Status", &state.to_string());
        output::kv("Start time", &info.start_time.to_string());
        output::kv("Duration", &format!("{} seconds", info.duration));
        output::kv("Pool", &format!("{} TON", info.pool));
    }

    Ok(Report::factory_status(
        status.contest_count,
        status.latest.map(|a| a.to_string()),
        status.contest.map(|(_, state, _)| state.to_string()),
    ))
}

/// Read the factory's count, its newest contest and the state of `contest`
pub async fn read_status(
    factory: &ContestFactory,
    contest: Option<&Contest>,
    retry: &RetryPolicy,
) -> Result<FactoryStatus> {
    let executor = RetryExecutor::builder()
        .with_policy(retry.clone())
        .with_predicate(TransientLedgerErrors)
        .with_observer(TracingObserver::new("status"))
        .build();

    let contest_count = executor.execute(|| factory.contest_count()).await?;
    let latest = match contest_count {
        0 => None,
        n => executor.execute(|| factory.contest_address(n - 1)).await?,
    };

    let contest = match contest {
        Some(contest) => {
            let state = executor.execute(|| contest.status()).await?;
            let info = executor.execute(|| contest.info()).await?;
            Some((*contest.address(), state, info))
        }
        None => None,
    };

    Ok(FactoryStatus {
        contest_count,
        latest,
        contest,
    })
}
