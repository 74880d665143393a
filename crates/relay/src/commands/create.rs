//! create-contest command
//!
//! Reads the factory's contest count, sends the create message once, then
//! polls until the count has grown and the newest contest's address resolves.

use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use relay_core::poll::{ConditionPoller, PollOutcome, PollPhase};
use relay_core::retry::{RetryExecutor, TracingObserver};
use relay_core::types::{PollPolicy, RetryPolicy};
use relay_ledger::{Address, Coins, ContestFactory, LedgerError, TransientLedgerErrors};
use tracing::info;

use crate::cli::CreateContestArgs;
use crate::context::RelayContext;
use crate::output;
use crate::report::{ledger_kind, ErrorKind, Report};

/// Inputs of one create-and-confirm run
#[derive(Debug, Clone)]
pub struct CreatePlan {
    pub start_time: u32,
    pub duration: u32,
    pub value: Coins,
    pub settle_delay: Duration,
    pub retry: RetryPolicy,
    pub poll: PollPolicy,
}

/// Factory state seen by one poll round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Observation {
    count: u64,
    latest: Option<Address>,
}

pub async fn run(args: CreateContestArgs, ctx: &RelayContext) -> Result<Report> {
    let contest = &ctx.config.contest;
    let factory = ctx.factory(args.factory.as_deref())?;

    let start_in = args.start_in.unwrap_or(contest.start_offset_secs);
    let start_time = start_time_after(Utc::now().timestamp(), start_in)?;
    let duration = args.duration.unwrap_or(contest.duration_secs);
    let duration = u32::try_from(duration).map_err(|_| {
        relay_core::Error::invalid_argument(format!(
            "contest duration of {} seconds does not fit in 32 bits",
            duration
        ))
    })?;

    let plan = CreatePlan {
        start_time,
        duration,
        value: ctx.coins(args.value.as_deref().unwrap_or(&contest.create_value))?,
        settle_delay: Duration::from_secs(args.settle.unwrap_or(contest.settle_delay_secs)),
        retry: ctx.config.retry.clone(),
        poll: ctx.config.poll.clone(),
    };

    output::header("Create contest");
    output::kv("Factory", &factory.address().to_string());
    let start = DateTime::from_timestamp(start_time as i64, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| start_time.to_string());
    output::kv("Start time", &start);
    output::kv("Duration", &format!("{} seconds", duration));
    output::kv("Value", &format!("{} TON", plan.value));

    output::info(&format!(
        "Sending create message, first check in {} seconds",
        plan.settle_delay.as_secs()
    ));
    let report = create_and_confirm(&factory, &plan).await;
    match &report {
        Report::Success { .. } => output::success("Contest created"),
        Report::Error { message, .. } => output::error(message),
    }
    Ok(report)
}

/// Unix time `start_in` seconds after `now`, as the contract's 32-bit field
fn start_time_after(now: i64, start_in: u64) -> Result<u32, relay_core::Error> {
    i64::try_from(start_in)
        .ok()
        .and_then(|offset| now.checked_add(offset))
        .and_then(|at| u32::try_from(at).ok())
        .ok_or_else(|| {
            relay_core::Error::invalid_argument(format!(
                "a start {} seconds from now does not fit in 32-bit Unix time",
                start_in
            ))
        })
}

/// Create a contest and wait until the factory reports it
pub async fn create_and_confirm(factory: &ContestFactory, plan: &CreatePlan) -> Report {
    let count_reader = RetryExecutor::builder()
        .with_policy(plan.retry.clone())
        .with_predicate(TransientLedgerErrors)
        .with_observer(TracingObserver::new("get_contest_count"))
        .build();

    let initial = match count_reader.execute(|| factory.contest_count()).await {
        Ok(count) => count,
        Err(err) => {
            let kind = err.source_ref().map(ledger_kind).unwrap_or(ErrorKind::Ledger);
            return Report::error_with_count(kind, format!("Failed to read contest count: {}", err), None);
        }
    };
    info!(count = initial, "initial contest count");

    // sends are not idempotent; a failed send is reported, never repeated
    if let Err(err) = factory
        .create_contest(plan.start_time, plan.duration, plan.value)
        .await
    {
        return Report::error_with_count(
            ledger_kind(&err),
            format!("Failed to send create message: {}", err),
            Some(initial),
        );
    }

    info!(
        settle_secs = plan.settle_delay.as_secs(),
        "waiting for the transaction to be processed"
    );
    tokio::time::sleep(plan.settle_delay).await;

    let outcome = ConditionPoller::new(plan.poll.clone())
        .with_predicate(TransientLedgerErrors)
        .with_observer(TracingObserver::new("contest-lookup"))
        .with_label("contest-creation")
        .poll_until(
            || observe(factory, initial),
            |seen: &Observation| seen.count > initial && seen.latest.is_some(),
        )
        .await;

    outcome_report(outcome, initial)
}

/// Read the count and, once it has grown, the newest contest's address
async fn observe(factory: &ContestFactory, initial: u64) -> Result<Observation, LedgerError> {
    let count = factory.contest_count().await?;
    if count <= initial {
        info!(count, "no new contest detected yet");
        return Ok(Observation { count, latest: None });
    }

    let latest = factory.contest_address(count - 1).await?;
    if latest.is_none() {
        info!(id = count - 1, "contest address lookup returned null");
    }
    Ok(Observation { count, latest })
}

fn outcome_report(outcome: PollOutcome<Observation, LedgerError>, initial: u64) -> Report {
    match outcome {
        PollOutcome::Success { value, phase, .. } => {
            if phase == PollPhase::FinalCheck {
                info!("contest confirmed by the final check");
            }
            match value.latest {
                Some(address) => Report::created(value.count, address.to_string()),
                None => Report::error_with_count(
                    ErrorKind::InconsistentState,
                    "Poll succeeded without a contest address",
                    Some(value.count),
                ),
            }
        }
        PollOutcome::TimedOut {
            last_observed: Some(seen),
            ..
        } if seen.count > initial => Report::error_with_count(
            ErrorKind::InconsistentState,
            format!(
                "Contest count increased to {} but the address of contest {} never resolved",
                seen.count,
                seen.count - 1
            ),
            Some(seen.count),
        ),
        PollOutcome::TimedOut {
            last_observed,
            last_error,
            ..
        } => {
            let mut message = "Contest creation verification timed out".to_string();
            if let Some(err) = last_error {
                message.push_str(&format!(" (last error: {})", err));
            }
            Report::error_with_count(
                ErrorKind::TimedOut,
                message,
                last_observed.map(|seen| seen.count),
            )
        }
        PollOutcome::Aborted { error, round } => Report::error_with_count(
            ledger_kind(&error),
            format!("Contest lookup failed in round {}: {}", round, error),
            None,
        ),
    }
}
