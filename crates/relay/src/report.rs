//! Structured command reports
//!
//! Every command ends by printing exactly one report as a JSON line on stdout.

use relay_core::RetryError;
use relay_ledger::LedgerError;
use serde::Serialize;

/// Why a command did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// The condition never held within the poll budget
    TimedOut,
    /// The contest count increased but the new contest's address never resolved
    InconsistentState,
    /// A ledger call failed after its retries, or a send failed
    Ledger,
    /// A ledger call failed with an error retrying cannot fix
    Fatal,
    /// Bad address, amount or configuration
    InvalidInput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Report {
    Success {
        #[serde(skip_serializing_if = "Option::is_none")]
        contest_count: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        contest_address: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        contest_status: Option<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        transactions: Vec<String>,
    },
    Error {
        kind: ErrorKind,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        contest_count: Option<String>,
    },
}

impl Report {
    /// A contest was created and its address resolved
    pub fn created(contest_count: u64, contest_address: String) -> Self {
        Report::Success {
            contest_count: Some(contest_count.to_string()),
            contest_address: Some(contest_address),
            contest_status: None,
            transactions: Vec::new(),
        }
    }

    pub fn factory_status(contest_count: u64, latest: Option<String>, contest_status: Option<String>) -> Self {
        Report::Success {
            contest_count: Some(contest_count.to_string()),
            contest_address: latest,
            contest_status,
            transactions: Vec::new(),
        }
    }

    /// A contest was driven through its lifecycle
    pub fn contest_run(contest_address: String, contest_status: Option<String>, transactions: Vec<String>) -> Self {
        Report::Success {
            contest_count: None,
            contest_address: Some(contest_address),
            contest_status,
            transactions,
        }
    }

    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Report::Error {
            kind,
            message: message.into(),
            contest_count: None,
        }
    }

    /// Error report carrying the last known contest count, or "unknown"
    pub fn error_with_count(kind: ErrorKind, message: impl Into<String>, contest_count: Option<u64>) -> Self {
        Report::Error {
            kind,
            message: message.into(),
            contest_count: Some(
                contest_count
                    .map(|count| count.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
            ),
        }
    }

    /// Error report for a failure that escaped a command
    pub fn from_error(err: &anyhow::Error) -> Self {
        Report::error(classify(err), format!("{:#}", err))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Report::Success { .. })
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            format!(r#"{{"status":"error","kind":"fatal","message":"unserializable report: {}"}}"#, err)
        })
    }
}

/// Error kind for a ledger error
pub fn ledger_kind(err: &LedgerError) -> ErrorKind {
    match err {
        LedgerError::InvalidAddress { .. } | LedgerError::InvalidAmount(_) => ErrorKind::InvalidInput,
        err if err.is_transient() => ErrorKind::Ledger,
        _ => ErrorKind::Fatal,
    }
}

fn classify(err: &anyhow::Error) -> ErrorKind {
    if err.downcast_ref::<relay_core::Error>().is_some() {
        return ErrorKind::InvalidInput;
    }
    if let Some(ledger) = err.downcast_ref::<LedgerError>() {
        return ledger_kind(ledger);
    }
    match err.downcast_ref::<RetryError<LedgerError>>() {
        Some(retry) => retry.source_ref().map(ledger_kind).unwrap_or(ErrorKind::Ledger),
        None => ErrorKind::Fatal,
    }
}
