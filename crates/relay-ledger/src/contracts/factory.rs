//! Contest factory wrapper

use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::address::Address;
use crate::client::{LedgerClient, StackValue, TransactionResult};
use crate::coins::Coins;
use crate::error::{LedgerError, Result};

use super::messages::ContestMessage;

pub const GET_CONTEST_COUNT: &str = "get_contest_count";
pub const GET_CONTEST_ADDRESS: &str = "get_contest_address";

/// Handle to the factory that creates and indexes contests
#[derive(Clone)]
pub struct ContestFactory {
    client: Arc<dyn LedgerClient>,
    address: Address,
}

impl fmt::Debug for ContestFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContestFactory")
            .field("client", &self.client.name())
            .field("address", &format_args!("{}", self.address))
            .finish()
    }
}

impl ContestFactory {
    pub fn new(client: Arc<dyn LedgerClient>, address: Address) -> Self {
        Self { client, address }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn client(&self) -> &Arc<dyn LedgerClient> {
        &self.client
    }

    /// Number of contests the factory has created so far
    pub async fn contest_count(&self) -> Result<u64> {
        let stack = self.client.read(&self.address, GET_CONTEST_COUNT, &[]).await?;
        let count = stack
            .first()
            .and_then(StackValue::as_int)
            .ok_or_else(|| LedgerError::unexpected_stack(GET_CONTEST_COUNT, "expected an integer"))?;

        u64::try_from(count).map_err(|_| {
            LedgerError::unexpected_stack(GET_CONTEST_COUNT, format!("count {} out of range", count))
        })
    }

    /// Address of contest `id`, or `None` while the factory cannot resolve it
    pub async fn contest_address(&self, id: u64) -> Result<Option<Address>> {
        let args = [StackValue::Int(id as i128)];
        let stack = self.client.read(&self.address, GET_CONTEST_ADDRESS, &args).await?;

        match stack.first() {
            None => Ok(None),
            Some(entry) => entry.as_optional_address().map_err(|other| {
                LedgerError::unexpected_stack(
                    GET_CONTEST_ADDRESS,
                    format!("expected an address, got {:?}", other),
                )
            }),
        }
    }

    /// Ask the factory to create a contest starting at `start_time` (unix seconds)
    pub async fn create_contest(&self, start_time: u32, duration: u32, value: Coins) -> Result<TransactionResult> {
        let message = ContestMessage::CreateContest {
            start_time,
            duration,
        };
        let body = message.to_cell()?;
        let result = self.client.send(&self.address, value, body).await?;
        info!(
            factory = %self.address,
            start_time,
            duration,
            value = %value,
            hash = %result.hash,
            "create-contest message sent"
        );
        Ok(result)
    }
}
