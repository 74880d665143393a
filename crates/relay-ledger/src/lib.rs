//! Ledger access for contest-relay
//!
//! The [`LedgerClient`] trait is the seam between the retry/poll loop and the
//! ledger. Two implementations ship here: [`GatewayClient`] for a real HTTP
//! relay gateway and [`SandboxLedger`] for an in-memory, eventually-consistent
//! stand-in.

pub mod address;
pub mod cell;
pub mod client;
pub mod coins;
pub mod contracts;
pub mod error;
pub mod gateway;
pub mod sandbox;

pub use address::Address;
pub use cell::{Cell, CellBuilder, CellSlice};
pub use client::{LedgerClient, StackValue, TransactionResult, TransientLedgerErrors};
pub use coins::Coins;
pub use contracts::{Contest, ContestFactory, ContestInfo, ContestMessage, ContestStatus};
pub use error::{LedgerError, Result};
pub use gateway::GatewayClient;
pub use sandbox::{SandboxLedger, SentMessage};
