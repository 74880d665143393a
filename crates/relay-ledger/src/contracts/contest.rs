//! Contest contract wrapper

use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::address::Address;
use crate::client::{LedgerClient, StackValue, TransactionResult};
use crate::coins::Coins;
use crate::error::{LedgerError, Result};

use super::messages::ContestMessage;

pub const GET_STATUS: &str = "get_status";
pub const GET_CONTEST_INFO: &str = "get_contest_info";

/// Lifecycle of a contest contract
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContestStatus {
    Created,
    Active,
    Ended,
    Claimed,
}

impl ContestStatus {
    pub fn code(&self) -> i128 {
        match self {
            ContestStatus::Created => 0,
            ContestStatus::Active => 1,
            ContestStatus::Ended => 2,
            ContestStatus::Claimed => 3,
        }
    }

    pub fn from_code(code: i128) -> Option<Self> {
        match code {
            0 => Some(ContestStatus::Created),
            1 => Some(ContestStatus::Active),
            2 => Some(ContestStatus::Ended),
            3 => Some(ContestStatus::Claimed),
            _ => None,
        }
    }
}

impl fmt::Display for ContestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContestStatus::Created => "created",
            ContestStatus::Active => "active",
            ContestStatus::Ended => "ended",
            ContestStatus::Claimed => "claimed",
        };
        f.write_str(name)
    }
}

/// Schedule and prize pool of a contest
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContestInfo {
    pub start_time: u32,
    pub duration: u32,
    pub pool: Coins,
}

/// Handle to a deployed contest
pub struct Contest {
    client: Arc<dyn LedgerClient>,
    address: Address,
}

impl fmt::Debug for Contest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Contest")
            .field("client", &self.client.name())
            .field("address", &format_args!("{}", self.address))
            .finish()
    }
}

impl Contest {
    pub fn new(client: Arc<dyn LedgerClient>, address: Address) -> Self {
        Self { client, address }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub async fn start(&self, value: Coins, query_id: u64) -> Result<TransactionResult> {
        self.send(ContestMessage::StartContest { query_id }, value).await
    }

    pub async fn participate(&self, value: Coins) -> Result<TransactionResult> {
        self.send(ContestMessage::Participate, value).await
    }

    pub async fn end(&self, value: Coins, query_id: u64) -> Result<TransactionResult> {
        self.send(ContestMessage::EndContest { query_id }, value).await
    }

    pub async fn claim_funds(&self, value: Coins, query_id: u64) -> Result<TransactionResult> {
        self.send(ContestMessage::ClaimFunds { query_id }, value).await
    }

    pub async fn status(&self) -> Result<ContestStatus> {
        let stack = self.client.read(&self.address, GET_STATUS, &[]).await?;
        let code = stack
            .first()
            .and_then(StackValue::as_int)
            .ok_or_else(|| LedgerError::unexpected_stack(GET_STATUS, "expected an integer"))?;

        ContestStatus::from_code(code)
            .ok_or_else(|| LedgerError::unexpected_stack(GET_STATUS, format!("unknown status {}", code)))
    }

    pub async fn info(&self) -> Result<ContestInfo> {
        let stack = self.client.read(&self.address, GET_CONTEST_INFO, &[]).await?;
        let field = |index: usize, name: &str| {
            stack
                .get(index)
                .and_then(StackValue::as_int)
                .ok_or_else(|| LedgerError::unexpected_stack(GET_CONTEST_INFO, format!("missing {}", name)))
        };

        let start_time = field(0, "start time")?;
        let duration = field(1, "duration")?;
        let pool = field(2, "pool")?;

        let out_of_range = |name: &str| LedgerError::unexpected_stack(GET_CONTEST_INFO, format!("{} out of range", name));
        Ok(ContestInfo {
            start_time: u32::try_from(start_time).map_err(|_| out_of_range("start time"))?,
            duration: u32::try_from(duration).map_err(|_| out_of_range("duration"))?,
            pool: Coins::from_nanos(u128::try_from(pool).map_err(|_| out_of_range("pool"))?),
        })
    }

    async fn send(&self, message: ContestMessage, value: Coins) -> Result<TransactionResult> {
        let body = message.to_cell()?;
        let result = self.client.send(&self.address, value, body).await?;
        info!(
            contest = %self.address,
            message = message.name(),
            value = %value,
            hash = %result.hash,
            "message sent"
        );
        Ok(result)
    }
}
