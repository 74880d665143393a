//! Message bodies understood by the contest contracts

use crate::cell::{Cell, CellBuilder};
use crate::error::{LedgerError, Result};

/// Text command that asks the factory to create a contest
pub const CREATE_CONTEST_COMMAND: &str = "CreateContest";

pub const OP_START_CONTEST: u32 = 2854811286;
pub const OP_END_CONTEST: u32 = 2257752764;
pub const OP_CLAIM_FUNDS: u32 = 3456285011;

/// Prefix marking a text comment body
const TEXT_PREFIX: u32 = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContestMessage {
    /// Sent to the factory; the parameters live in a referenced cell
    CreateContest { start_time: u32, duration: u32 },
    StartContest { query_id: u64 },
    EndContest { query_id: u64 },
    ClaimFunds { query_id: u64 },
    /// Empty body carrying the participation stake
    Participate,
}

impl ContestMessage {
    pub fn name(&self) -> &'static str {
        match self {
            ContestMessage::CreateContest { .. } => "create-contest",
            ContestMessage::StartContest { .. } => "start-contest",
            ContestMessage::EndContest { .. } => "end-contest",
            ContestMessage::ClaimFunds { .. } => "claim-funds",
            ContestMessage::Participate => "participate",
        }
    }

    pub fn to_cell(&self) -> Result<Cell> {
        let cell = match *self {
            ContestMessage::CreateContest {
                start_time,
                duration,
            } => {
                let params = CellBuilder::new()
                    .store_string_tail(CREATE_CONTEST_COMMAND)?
                    .store_uint(start_time as u128, 32)?
                    .store_uint(duration as u128, 32)?
                    .build();
                CellBuilder::new()
                    .store_uint(TEXT_PREFIX as u128, 32)?
                    .store_string_tail(CREATE_CONTEST_COMMAND)?
                    .store_ref(params)?
                    .build()
            }
            ContestMessage::StartContest { query_id } => op_body(OP_START_CONTEST, query_id)?,
            ContestMessage::EndContest { query_id } => op_body(OP_END_CONTEST, query_id)?,
            ContestMessage::ClaimFunds { query_id } => op_body(OP_CLAIM_FUNDS, query_id)?,
            ContestMessage::Participate => Cell::empty(),
        };
        Ok(cell)
    }

    pub fn from_cell(cell: &Cell) -> Result<Self> {
        if cell.is_empty() {
            return Ok(ContestMessage::Participate);
        }

        let mut slice = cell.parse();
        let op = slice.load_uint(32)? as u32;

        let message = match op {
            TEXT_PREFIX => {
                let command = slice.load_string_tail()?;
                if command != CREATE_CONTEST_COMMAND {
                    return Err(LedgerError::Encoding(format!("unknown text command '{}'", command)));
                }

                let mut params = slice.load_ref()?.parse();
                let text_len = params
                    .remaining_bits()
                    .checked_sub(64)
                    .ok_or_else(|| LedgerError::Encoding("contest parameters truncated".into()))?;
                let echoed = params.load_bytes(text_len / 8)?;
                if echoed != CREATE_CONTEST_COMMAND.as_bytes() {
                    return Err(LedgerError::Encoding("contest parameters lack command tag".into()));
                }
                let start_time = params.load_uint(32)? as u32;
                let duration = params.load_uint(32)? as u32;
                params.end_parse()?;

                ContestMessage::CreateContest {
                    start_time,
                    duration,
                }
            }
            OP_START_CONTEST => ContestMessage::StartContest {
                query_id: slice.load_uint(64)? as u64,
            },
            OP_END_CONTEST => ContestMessage::EndContest {
                query_id: slice.load_uint(64)? as u64,
            },
            OP_CLAIM_FUNDS => ContestMessage::ClaimFunds {
                query_id: slice.load_uint(64)? as u64,
            },
            other => return Err(LedgerError::Encoding(format!("unknown op 0x{:08x}", other))),
        };

        slice.end_parse()?;
        Ok(message)
    }
}

fn op_body(op: u32, query_id: u64) -> Result<Cell> {
    Ok(CellBuilder::new()
        .store_uint(op as u128, 32)?
        .store_uint(query_id as u128, 64)?
        .build())
}
