//! Ledger client trait definitions

use async_trait::async_trait;
use relay_core::retry::RetryPredicate;

use crate::address::Address;
use crate::cell::Cell;
use crate::coins::Coins;
use crate::error::{LedgerError, Result};

/// Entry of a get-method argument or result stack
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StackValue {
    Int(i128),
    Address(Address),
    Null,
}

impl StackValue {
    pub fn as_int(&self) -> Option<i128> {
        match self {
            StackValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// `None` for a null entry; `Err` for anything that is neither
    pub fn as_optional_address(&self) -> std::result::Result<Option<Address>, &Self> {
        match self {
            StackValue::Address(address) => Ok(Some(*address)),
            StackValue::Null => Ok(None),
            other => Err(other),
        }
    }
}

/// Outcome of a submitted message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionResult {
    /// Hash the ledger assigned to the submitted message
    pub hash: String,
}

/// Access to an eventually-consistent ledger
///
/// `send` submits an internal message from the operator wallet; it is not
/// idempotent. `read` runs a get-method and may observe state that lags
/// behind recently sent messages.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Send `value` with message `body` to `destination`
    async fn send(&self, destination: &Address, value: Coins, body: Cell) -> Result<TransactionResult>;

    /// Run get-method `method` on the contract at `address`
    async fn read(&self, address: &Address, method: &str, args: &[StackValue]) -> Result<Vec<StackValue>>;
}

/// Retries only errors that another attempt may fix
#[derive(Debug, Clone, Copy, Default)]
pub struct TransientLedgerErrors;

impl RetryPredicate<LedgerError> for TransientLedgerErrors {
    fn should_retry(&self, error: &LedgerError) -> bool {
        error.is_transient()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_value_accessors() {
        assert_eq!(StackValue::Int(3).as_int(), Some(3));
        assert_eq!(StackValue::Null.as_int(), None);

        let address = Address::new(0, [7u8; 32]);
        assert_eq!(StackValue::Address(address).as_optional_address(), Ok(Some(address)));
        assert_eq!(StackValue::Null.as_optional_address(), Ok(None));
        assert!(StackValue::Int(1).as_optional_address().is_err());
    }

    #[test]
    fn test_transient_predicate() {
        let predicate = TransientLedgerErrors;
        assert!(predicate.should_retry(&LedgerError::Unavailable("reset".into())));
        assert!(!predicate.should_retry(&LedgerError::ExitCode {
            method: "get_status".into(),
            exit_code: 9,
        }));
    }
}
