//! run-contest command
//!
//! Drives a deployed contest through start, participation, end and claim.
//! Each message is sent exactly once.

use std::time::Duration;

use anyhow::{anyhow, Result};
use relay_core::retry::{RetryExecutor, TracingObserver};
use relay_core::types::RetryPolicy;
use relay_ledger::{Address, Coins, Contest, LedgerError, TransientLedgerErrors};
use tokio::time::Instant;
use tracing::info;

use crate::cli::RunContestArgs;
use crate::context::RelayContext;
use crate::output;
use crate::report::{ledger_kind, ErrorKind, Report};

/// Longest single sleep while waiting for the contest to end
const COUNTDOWN_TICK: Duration = Duration::from_secs(30);

const QUERY_ID: u64 = 0;

#[derive(Debug, Clone)]
pub struct LifecyclePlan {
    pub message_value: Coins,
    pub stake: Coins,
    pub duration: Duration,
    pub step_delay: Duration,
    pub end_grace: Duration,
    pub retry: RetryPolicy,
}

impl LifecyclePlan {
    /// Time to wait after participating before the contest can be ended
    ///
    /// Bounded by the contract's 32-bit duration field.
    pub fn end_wait(&self) -> Result<Duration, relay_core::Error> {
        self.duration
            .checked_add(self.end_grace)
            .filter(|wait| wait.as_secs() <= u64::from(u32::MAX))
            .ok_or_else(|| {
                relay_core::Error::invalid_argument(format!(
                    "contest duration of {} seconds plus {} seconds of grace is out of range",
                    self.duration.as_secs(),
                    self.end_grace.as_secs()
                ))
            })
    }
}

pub async fn run(args: RunContestArgs, ctx: &RelayContext) -> Result<Report> {
    let contest_config = &ctx.config.contest;

    let address = match &args.contest {
        Some(raw) => Address::parse(raw)?,
        None => latest_contest(ctx, args.factory.as_deref()).await?,
    };

    let plan = LifecyclePlan {
        message_value: ctx.coins(&contest_config.message_value)?,
        stake: ctx.coins(args.stake.as_deref().unwrap_or(&contest_config.participation_value))?,
        duration: Duration::from_secs(args.duration.unwrap_or(contest_config.duration_secs)),
        step_delay: Duration::from_secs(contest_config.step_delay_secs),
        end_grace: Duration::from_secs(contest_config.end_grace_secs),
        retry: ctx.config.retry.clone(),
    };

    let end_wait = plan.end_wait()?;

    output::header("Run contest");
    output::kv("Contest", &address.to_string());
    output::kv("Stake", &format!("{} TON", plan.stake));
    output::kv("Ends in", &format!("{} seconds", end_wait.as_secs()));

    let contest = Contest::new(ctx.client.clone(), address);
    let report = run_lifecycle(&contest, &plan).await;
    match &report {
        Report::Success { .. } => output::success("Contest completed"),
        Report::Error { message, .. } => output::error(message),
    }
    Ok(report)
}

/// Address of the factory's newest contest
async fn latest_contest(ctx: &RelayContext, factory: Option<&str>) -> Result<Address> {
    let factory = ctx.factory(factory)?;
    let executor = RetryExecutor::builder()
        .with_policy(ctx.config.retry.clone())
        .with_predicate(TransientLedgerErrors)
        .with_observer(TracingObserver::new("latest-contest"))
        .build();

    let count = executor.execute(|| factory.contest_count()).await?;
    if count == 0 {
        return Err(anyhow!("Factory {} has not created any contest", factory.address()));
    }

    executor
        .execute(|| factory.contest_address(count - 1))
        .await?
        .ok_or_else(|| anyhow!("Address of contest {} is not available yet", count - 1))
}

/// Start, join, end and claim `contest`, then report its final status
pub async fn run_lifecycle(contest: &Contest, plan: &LifecyclePlan) -> Report {
    let end_wait = match plan.end_wait() {
        Ok(wait) => wait,
        Err(err) => return Report::error(ErrorKind::InvalidInput, err.to_string()),
    };
    let mut transactions = Vec::new();

    match contest.start(plan.message_value, QUERY_ID).await {
        Ok(tx) => transactions.push(tx.hash),
        Err(err) => return step_failed("start", err),
    }
    tokio::time::sleep(plan.step_delay).await;

    match contest.participate(plan.stake).await {
        Ok(tx) => transactions.push(tx.hash),
        Err(err) => return step_failed("participate", err),
    }
    tokio::time::sleep(plan.step_delay).await;

    countdown(end_wait).await;

    match contest.end(plan.message_value, QUERY_ID).await {
        Ok(tx) => transactions.push(tx.hash),
        Err(err) => return step_failed("end", err),
    }
    tokio::time::sleep(plan.step_delay).await;

    match contest.claim_funds(plan.message_value, QUERY_ID).await {
        Ok(tx) => transactions.push(tx.hash),
        Err(err) => return step_failed("claim", err),
    }

    let status = RetryExecutor::builder()
        .with_policy(plan.retry.clone())
        .with_predicate(TransientLedgerErrors)
        .with_observer(TracingObserver::new("get_status"))
        .build()
        .execute(|| contest.status())
        .await;

    let status = match status {
        Ok(status) => Some(status.to_string()),
        Err(err) => {
            output::warning(&format!("Could not read final contest status: {}", err));
            None
        }
    };

    Report::contest_run(contest.address().to_string(), status, transactions)
}

/// Wait `total`, logging the time left at most every 30 seconds
async fn countdown(total: Duration) {
    let deadline = Instant::now() + total;
    info!(wait_secs = total.as_secs(), "waiting for the contest to end");

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        info!(remaining_secs = remaining.as_secs(), "time remaining");
        tokio::time::sleep(remaining.min(COUNTDOWN_TICK)).await;
    }
}

fn step_failed(step: &str, err: LedgerError) -> Report {
    Report::error(ledger_kind(&err), format!("Failed to send {} message: {}", step, err))
}
