//! In-memory ledger
//!
//! Hosts a single contest factory and the contests it creates. Reads observe
//! new contests only after a configurable number of factory reads, which
//! reproduces the eventual consistency of a real ledger without a network.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::address::Address;
use crate::cell::Cell;
use crate::client::{LedgerClient, StackValue, TransactionResult};
use crate::coins::Coins;
use crate::contracts::contest::{ContestStatus, GET_CONTEST_INFO, GET_STATUS};
use crate::contracts::factory::{GET_CONTEST_ADDRESS, GET_CONTEST_COUNT};
use crate::contracts::messages::ContestMessage;
use crate::error::{LedgerError, Result};

/// Exit code of a call to a get-method the contract does not have
const EXIT_METHOD_NOT_FOUND: i32 = 11;

/// A message accepted by the sandbox
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMessage {
    pub destination: Address,
    pub value: Coins,
    pub body: Cell,
    pub hash: String,
}

#[derive(Debug)]
struct ContestModel {
    address: Address,
    start_time: u32,
    duration: u32,
    status: ContestStatus,
    pool: Coins,
    participants: u32,
    /// First factory read that counts this contest
    visible_from_read: u64,
    address_lookups: u32,
}

#[derive(Debug, Default)]
struct SandboxState {
    contests: Vec<ContestModel>,
    sent: Vec<SentMessage>,
    factory_reads: u64,
    failing_reads: u32,
    failing_sends: u32,
}

pub struct SandboxLedger {
    factory: Address,
    visibility_lag: u32,
    address_lag: u32,
    state: Mutex<SandboxState>,
}

impl SandboxLedger {
    pub fn new(factory: Address) -> Self {
        Self {
            factory,
            visibility_lag: 0,
            address_lag: 0,
            state: Mutex::new(SandboxState::default()),
        }
    }

    /// A new contest is counted on the `lag + 1`-th factory read after its creation
    pub fn with_visibility_lag(mut self, lag: u32) -> Self {
        self.visibility_lag = lag;
        self
    }

    /// The first `lag` address lookups of a visible contest return null
    pub fn with_address_lag(mut self, lag: u32) -> Self {
        self.address_lag = lag;
        self
    }

    /// Contests that already exist and are fully visible
    pub fn with_existing_contests(self, count: u32) -> Self {
        {
            let mut state = self.state();
            for _ in 0..count {
                let id = state.contests.len() as u64;
                state.contests.push(ContestModel {
                    address: contest_address(&self.factory, id),
                    start_time: 0,
                    duration: 0,
                    status: ContestStatus::Claimed,
                    pool: Coins::ZERO,
                    participants: 0,
                    visible_from_read: 0,
                    address_lookups: u32::MAX,
                });
            }
        }
        self
    }

    pub fn factory(&self) -> &Address {
        &self.factory
    }

    /// Make the next `count` reads fail with a transient error
    pub fn fail_next_reads(&self, count: u32) {
        self.state().failing_reads = count;
    }

    /// Make the next `count` sends fail with a transient error
    pub fn fail_next_sends(&self, count: u32) {
        self.state().failing_sends = count;
    }

    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.state().sent.clone()
    }

    /// Contests created so far, visible or not
    pub fn created_contests(&self) -> u64 {
        self.state().contests.len() as u64
    }

    /// Current status and pool of the contest at `address`
    pub fn contest_state(&self, address: &Address) -> Option<(ContestStatus, Coins, u32)> {
        self.state()
            .contests
            .iter()
            .find(|c| c.address == *address)
            .map(|c| (c.status, c.pool, c.participants))
    }

    fn state(&self) -> MutexGuard<'_, SandboxState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn visible_count(&self, state: &SandboxState) -> usize {
        state
            .contests
            .iter()
            .take_while(|c| state.factory_reads >= c.visible_from_read)
            .count()
    }

    fn read_factory(&self, state: &mut SandboxState, method: &str, args: &[StackValue]) -> Result<Vec<StackValue>> {
        state.factory_reads += 1;
        let visible = self.visible_count(state);

        match method {
            GET_CONTEST_COUNT => Ok(vec![StackValue::Int(visible as i128)]),
            GET_CONTEST_ADDRESS => {
                let id = args
                    .first()
                    .and_then(StackValue::as_int)
                    .ok_or_else(|| LedgerError::ExitCode {
                        method: method.to_string(),
                        exit_code: 7,
                    })?;

                let contest = usize::try_from(id)
                    .ok()
                    .filter(|id| *id < visible)
                    .and_then(|id| state.contests.get_mut(id));

                match contest {
                    Some(contest) if contest.address_lookups >= self.address_lag => {
                        Ok(vec![StackValue::Address(contest.address)])
                    }
                    Some(contest) => {
                        contest.address_lookups = contest.address_lookups.saturating_add(1);
                        Ok(vec![StackValue::Null])
                    }
                    None => Ok(vec![StackValue::Null]),
                }
            }
            _ => Err(LedgerError::ExitCode {
                method: method.to_string(),
                exit_code: EXIT_METHOD_NOT_FOUND,
            }),
        }
    }

    fn deliver_to_factory(&self, state: &mut SandboxState, message: ContestMessage) {
        let ContestMessage::CreateContest {
            start_time,
            duration,
        } = message
        else {
            warn!(message = message.name(), "factory ignored message");
            return;
        };

        let id = state.contests.len() as u64;
        let address = contest_address(&self.factory, id);
        debug!(id, contest = %address, "sandbox created contest");

        let visible_from_read = state.factory_reads + self.visibility_lag as u64 + 1;
        state.contests.push(ContestModel {
            address,
            start_time,
            duration,
            status: ContestStatus::Created,
            pool: Coins::ZERO,
            participants: 0,
            visible_from_read,
            address_lookups: 0,
        });
    }

    fn deliver_to_contest(contest: &mut ContestModel, message: ContestMessage, value: Coins) {
        let next = match (contest.status, message) {
            (ContestStatus::Created, ContestMessage::StartContest { .. }) => ContestStatus::Active,
            (ContestStatus::Active, ContestMessage::Participate) => {
                contest.pool = Coins::from_nanos(contest.pool.nanos() + value.nanos());
                contest.participants += 1;
                ContestStatus::Active
            }
            (ContestStatus::Active, ContestMessage::EndContest { .. }) => ContestStatus::Ended,
            (ContestStatus::Ended, ContestMessage::ClaimFunds { .. }) => {
                contest.pool = Coins::ZERO;
                ContestStatus::Claimed
            }
            (status, message) => {
                warn!(
                    contest = %contest.address,
                    status = %status,
                    message = message.name(),
                    "contest bounced message"
                );
                status
            }
        };
        contest.status = next;
    }
}

/// Deterministic address of contest `id` created by `factory`
fn contest_address(factory: &Address, id: u64) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(factory.hash());
    hasher.update(id.to_be_bytes());
    Address::new(factory.workchain(), hasher.finalize().into())
}

fn message_hash(index: usize, destination: &Address, body: &Cell) -> String {
    let mut hasher = Sha256::new();
    hasher.update((index as u64).to_be_bytes());
    hasher.update(destination.hash());
    hasher.update(body.to_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl LedgerClient for SandboxLedger {
    fn name(&self) -> &'static str {
        "sandbox"
    }

    async fn send(&self, destination: &Address, value: Coins, body: Cell) -> Result<TransactionResult> {
        let mut state = self.state();
        if state.failing_sends > 0 {
            state.failing_sends -= 1;
            return Err(LedgerError::Unavailable("sandbox: injected send failure".into()));
        }

        let hash = message_hash(state.sent.len(), destination, &body);
        state.sent.push(SentMessage {
            destination: *destination,
            value,
            body: body.clone(),
            hash: hash.clone(),
        });

        // undecodable bodies still land on the ledger; the contract just rejects them
        match ContestMessage::from_cell(&body) {
            Ok(message) if *destination == self.factory => self.deliver_to_factory(&mut state, message),
            Ok(message) => match state.contests.iter_mut().find(|c| c.address == *destination) {
                Some(contest) => Self::deliver_to_contest(contest, message, value),
                None => warn!(destination = %destination, "message to unknown account"),
            },
            Err(err) => warn!(destination = %destination, error = %err, "contract rejected body"),
        }

        Ok(TransactionResult { hash })
    }

    async fn read(&self, address: &Address, method: &str, args: &[StackValue]) -> Result<Vec<StackValue>> {
        let mut state = self.state();
        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(LedgerError::Unavailable("sandbox: injected read failure".into()));
        }

        if *address == self.factory {
            return self.read_factory(&mut state, method, args);
        }

        let contest = state
            .contests
            .iter()
            .find(|c| c.address == *address)
            .ok_or_else(|| LedgerError::UnknownContract(address.to_string()))?;

        match method {
            GET_STATUS => Ok(vec![StackValue::Int(contest.status.code())]),
            GET_CONTEST_INFO => Ok(vec![
                StackValue::Int(contest.start_time as i128),
                StackValue::Int(contest.duration as i128),
                StackValue::Int(contest.pool.nanos() as i128),
            ]),
            _ => Err(LedgerError::ExitCode {
                method: method.to_string(),
                exit_code: EXIT_METHOD_NOT_FOUND,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{Contest, ContestFactory};
    use std::sync::Arc;

    const FACTORY: &str = "EQAU5chXz9IKIIqCbYCfHpOGfaF-Ec1Mq2_VMWQoJU2SvSJK";

    fn factory_address() -> Address {
        Address::parse(FACTORY).unwrap()
    }

    fn coins(amount: &str) -> Coins {
        Coins::parse(amount).unwrap()
    }

    #[tokio::test]
    async fn test_contest_visible_after_lag() {
        let ledger = Arc::new(SandboxLedger::new(factory_address()).with_visibility_lag(2));
        let factory = ContestFactory::new(ledger.clone(), factory_address());

        assert_eq!(factory.contest_count().await.unwrap(), 0);
        factory.create_contest(1_700_000_600, 1800, coins("1.2")).await.unwrap();
        assert_eq!(ledger.created_contests(), 1);

        assert_eq!(factory.contest_count().await.unwrap(), 0);
        assert_eq!(factory.contest_count().await.unwrap(), 0);
        assert_eq!(factory.contest_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_address_lookup_lags_behind_count() {
        let ledger = Arc::new(SandboxLedger::new(factory_address()).with_address_lag(2));
        let factory = ContestFactory::new(ledger.clone(), factory_address());

        factory.create_contest(600, 60, coins("1.2")).await.unwrap();
        assert_eq!(factory.contest_count().await.unwrap(), 1);

        assert_eq!(factory.contest_address(0).await.unwrap(), None);
        assert_eq!(factory.contest_address(0).await.unwrap(), None);
        let address = factory.contest_address(0).await.unwrap().unwrap();
        assert_eq!(address, contest_address(&factory_address(), 0));

        // ids past the count never resolve
        assert_eq!(factory.contest_address(1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_injected_read_failures_are_transient() {
        let ledger = SandboxLedger::new(factory_address());
        ledger.fail_next_reads(2);

        for _ in 0..2 {
            let err = ledger.read(&factory_address(), GET_CONTEST_COUNT, &[]).await.unwrap_err();
            assert!(err.is_transient());
        }
        let stack = ledger.read(&factory_address(), GET_CONTEST_COUNT, &[]).await.unwrap();
        assert_eq!(stack, vec![StackValue::Int(0)]);
    }

    #[tokio::test]
    async fn test_unknown_method_and_account_are_fatal() {
        let ledger = SandboxLedger::new(factory_address());

        let err = ledger.read(&factory_address(), "get_owner", &[]).await.unwrap_err();
        assert!(matches!(err, LedgerError::ExitCode { exit_code: 11, .. }));

        let stranger = Address::new(0, [1u8; 32]);
        let err = ledger.read(&stranger, GET_STATUS, &[]).await.unwrap_err();
        assert!(matches!(err, LedgerError::UnknownContract(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_contest_lifecycle() {
        let ledger = Arc::new(SandboxLedger::new(factory_address()).with_existing_contests(3));
        let factory = ContestFactory::new(ledger.clone(), factory_address());

        factory.create_contest(600, 60, coins("1.2")).await.unwrap();
        assert_eq!(factory.contest_count().await.unwrap(), 4);
        let address = factory.contest_address(3).await.unwrap().unwrap();
        let contest = Contest::new(ledger.clone(), address);

        assert_eq!(contest.status().await.unwrap(), ContestStatus::Created);

        // participating before the start bounces
        contest.participate(coins("0.5")).await.unwrap();
        assert_eq!(ledger.contest_state(&address).unwrap().2, 0);

        contest.start(coins("0.1"), 0).await.unwrap();
        contest.participate(coins("0.5")).await.unwrap();
        assert_eq!(contest.status().await.unwrap(), ContestStatus::Active);
        assert_eq!(
            ledger.contest_state(&address).unwrap(),
            (ContestStatus::Active, coins("0.5"), 1)
        );

        contest.end(coins("0.1"), 0).await.unwrap();
        assert_eq!(contest.status().await.unwrap(), ContestStatus::Ended);

        contest.claim_funds(coins("0.1"), 0).await.unwrap();
        assert_eq!(
            ledger.contest_state(&address).unwrap(),
            (ContestStatus::Claimed, Coins::ZERO, 1)
        );

        // create, participate (bounced), start, participate, end, claim
        assert_eq!(ledger.sent_messages().len(), 6);
    }

    #[tokio::test]
    async fn test_records_every_message() {
        let ledger = SandboxLedger::new(factory_address());
        ledger.fail_next_sends(1);

        let body = ContestMessage::StartContest { query_id: 0 }.to_cell().unwrap();
        assert!(ledger
            .send(&factory_address(), coins("0.1"), body.clone())
            .await
            .unwrap_err()
            .is_transient());

        let first = ledger.send(&factory_address(), coins("0.1"), body.clone()).await.unwrap();
        let second = ledger.send(&factory_address(), coins("0.1"), body).await.unwrap();
        assert_ne!(first.hash, second.hash);

        let sent = ledger.sent_messages();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].value, coins("0.1"));
        assert_eq!(ledger.created_contests(), 0);
    }
}
