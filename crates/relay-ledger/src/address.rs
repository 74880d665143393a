//! Ledger address codec
//!
//! Accepts the user-friendly form (48 characters of base64 or base64url over
//! `tag | workchain | hash | crc16`) and the raw form (`workchain:hex`).

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{LedgerError, Result};

const TAG_BOUNCEABLE: u8 = 0x11;
const TAG_NON_BOUNCEABLE: u8 = 0x51;
const TAG_TEST_ONLY: u8 = 0x80;

const FRIENDLY_LEN: usize = 48;
const FRIENDLY_BYTES: usize = 36;

/// Account address on the ledger
///
/// Equality and hashing consider only the workchain and the account hash;
/// the bounceable and test-only flags are presentation details.
#[derive(Clone, Copy, Debug)]
pub struct Address {
    workchain: i8,
    hash: [u8; 32],
    bounceable: bool,
    testnet: bool,
}

impl Address {
    /// Bounceable mainnet address
    pub fn new(workchain: i8, hash: [u8; 32]) -> Self {
        Self {
            workchain,
            hash,
            bounceable: true,
            testnet: false,
        }
    }

    pub fn workchain(&self) -> i8 {
        self.workchain
    }

    pub fn hash(&self) -> &[u8; 32] {
        &self.hash
    }

    pub fn is_bounceable(&self) -> bool {
        self.bounceable
    }

    pub fn is_testnet(&self) -> bool {
        self.testnet
    }

    /// Same account with different presentation flags
    pub fn with_flags(mut self, bounceable: bool, testnet: bool) -> Self {
        self.bounceable = bounceable;
        self.testnet = testnet;
        self
    }

    /// Parse either address form
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.contains(':') {
            Self::parse_raw(input)
        } else {
            Self::parse_friendly(input)
        }
    }

    /// Raw `workchain:hex` form
    pub fn to_raw(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.hash))
    }

    /// User-friendly url-safe form using this address's flags
    pub fn to_friendly(&self) -> String {
        let mut tag = if self.bounceable {
            TAG_BOUNCEABLE
        } else {
            TAG_NON_BOUNCEABLE
        };
        if self.testnet {
            tag |= TAG_TEST_ONLY;
        }

        let mut bytes = Vec::with_capacity(FRIENDLY_BYTES);
        bytes.push(tag);
        bytes.push(self.workchain as u8);
        bytes.extend_from_slice(&self.hash);
        let crc = crc16(&bytes);
        bytes.extend_from_slice(&crc.to_be_bytes());

        URL_SAFE.encode(bytes)
    }

    fn parse_raw(input: &str) -> Result<Self> {
        let (workchain, hash_hex) = input
            .split_once(':')
            .ok_or_else(|| LedgerError::invalid_address(input, "missing ':' separator"))?;

        let workchain: i8 = workchain
            .parse()
            .map_err(|_| LedgerError::invalid_address(input, "workchain is not an 8-bit integer"))?;

        let bytes = hex::decode(hash_hex)
            .map_err(|e| LedgerError::invalid_address(input, format!("bad hex: {}", e)))?;
        let hash: [u8; 32] = bytes
            .try_into()
            .map_err(|_| LedgerError::invalid_address(input, "hash must be 32 bytes"))?;

        Ok(Self::new(workchain, hash))
    }

    fn parse_friendly(input: &str) -> Result<Self> {
        if input.len() != FRIENDLY_LEN {
            return Err(LedgerError::invalid_address(
                input,
                format!("expected {} characters, got {}", FRIENDLY_LEN, input.len()),
            ));
        }

        let url_safe = input.contains('-') || input.contains('_');
        let standard = input.contains('+') || input.contains('/');
        if url_safe && standard {
            return Err(LedgerError::invalid_address(input, "mixed base64 alphabets"));
        }

        let engine = if url_safe { &URL_SAFE } else { &STANDARD };
        let bytes = engine
            .decode(input)
            .map_err(|e| LedgerError::invalid_address(input, format!("bad base64: {}", e)))?;
        if bytes.len() != FRIENDLY_BYTES {
            return Err(LedgerError::invalid_address(input, "decoded length is not 36 bytes"));
        }

        let expected = u16::from_be_bytes([bytes[34], bytes[35]]);
        if crc16(&bytes[..34]) != expected {
            return Err(LedgerError::invalid_address(input, "checksum mismatch"));
        }

        let mut tag = bytes[0];
        let testnet = tag & TAG_TEST_ONLY != 0;
        tag &= !TAG_TEST_ONLY;
        let bounceable = match tag {
            TAG_BOUNCEABLE => true,
            TAG_NON_BOUNCEABLE => false,
            other => {
                return Err(LedgerError::invalid_address(
                    input,
                    format!("unknown tag 0x{:02x}", other),
                ))
            }
        };

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes[2..34]);

        Ok(Self {
            workchain: bytes[1] as i8,
            hash,
            bounceable,
            testnet,
        })
    }
}

/// CRC-16/XMODEM
fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for byte in data {
        crc ^= (*byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.workchain == other.workchain && self.hash == other.hash
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.workchain.hash(state);
        self.hash.hash(state);
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_friendly())
    }
}

impl FromStr for Address {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_friendly())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::parse(&s).map_err(serde::de::Error::custom)
    }
}
