//! Error types for ledger access

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors raised while talking to the ledger or preparing a request for it
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Transport failure (connect, timeout, body decode)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway answered with an error status
    #[error("Gateway error {status}: {message}")]
    Gateway { status: u16, message: String },

    /// The ledger could not be reached this time
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    /// A get-method ran but did not exit cleanly
    #[error("Get-method '{method}' failed with exit code {exit_code}")]
    ExitCode { method: String, exit_code: i32 },

    /// A get-method returned a stack of an unexpected shape
    #[error("Unexpected result from '{method}': {message}")]
    UnexpectedStack { method: String, message: String },

    /// No contract is deployed at the address
    #[error("No contract at {0}")]
    UnknownContract(String),

    /// Address string could not be parsed
    #[error("Invalid address '{input}': {reason}")]
    InvalidAddress { input: String, reason: String },

    /// Amount string could not be parsed
    #[error("Invalid amount '{0}'")]
    InvalidAmount(String),

    /// Message cell could not be built or decoded
    #[error("Cell encoding error: {0}")]
    Encoding(String),
}

impl LedgerError {
    pub fn invalid_address(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn unexpected_stack(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnexpectedStack {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Whether another attempt may succeed
    ///
    /// Transport failures, rate limiting and server-side errors are transient.
    /// Malformed input, client errors and failed get-methods are not.
    pub fn is_transient(&self) -> bool {
        match self {
            LedgerError::Http(err) => !err.is_builder(),
            LedgerError::Gateway { status, .. } => *status == 429 || *status >= 500,
            LedgerError::Unavailable(_) => true,
            LedgerError::ExitCode { .. }
            | LedgerError::UnexpectedStack { .. }
            | LedgerError::UnknownContract(_)
            | LedgerError::InvalidAddress { .. }
            | LedgerError::InvalidAmount(_)
            | LedgerError::Encoding(_) => false,
        }
    }
}
