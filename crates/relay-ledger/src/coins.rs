//! Coin amounts in nanotons

use std::fmt;
use std::str::FromStr;

use crate::error::{LedgerError, Result};

const DECIMALS: usize = 9;
const NANOS_PER_COIN: u128 = 1_000_000_000;

/// Amount of coins, stored as nanotons
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coins(u128);

impl Coins {
    pub const ZERO: Coins = Coins(0);

    pub fn from_nanos(nanos: u128) -> Self {
        Self(nanos)
    }

    pub fn nanos(&self) -> u128 {
        self.0
    }

    /// Parse a decimal amount such as `"1.2"` or `"0.35"`
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || LedgerError::InvalidAmount(input.to_string());
        let trimmed = input.trim();

        let (whole, fraction) = match trimmed.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (trimmed, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if fraction.len() > DECIMALS {
            return Err(invalid());
        }
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(whole) || !all_digits(fraction) {
            return Err(invalid());
        }

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let fraction: u128 = if fraction.is_empty() {
            0
        } else {
            format!("{:0<width$}", fraction, width = DECIMALS)
                .parse()
                .map_err(|_| invalid())?
        };

        whole
            .checked_mul(NANOS_PER_COIN)
            .and_then(|n| n.checked_add(fraction))
            .map(Self)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / NANOS_PER_COIN;
        let fraction = self.0 % NANOS_PER_COIN;
        if fraction == 0 {
            return write!(f, "{}", whole);
        }
        let digits = format!("{:0width$}", fraction, width = DECIMALS);
        write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
    }
}

impl FromStr for Coins {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal_amounts() {
        assert_eq!(Coins::parse("1.2").unwrap().nanos(), 1_200_000_000);
        assert_eq!(Coins::parse("0.35").unwrap().nanos(), 350_000_000);
        assert_eq!(Coins::parse("0.1").unwrap().nanos(), 100_000_000);
        assert_eq!(Coins::parse("5").unwrap().nanos(), 5_000_000_000);
        assert_eq!(Coins::parse(".5").unwrap().nanos(), 500_000_000);
        assert_eq!(Coins::parse("0.000000001").unwrap().nanos(), 1);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for input in ["", ".", "1.2.3", "-1", "1e9", "0.0000000001", "abc", "1,5"] {
            assert!(
                matches!(Coins::parse(input), Err(LedgerError::InvalidAmount(_))),
                "accepted {:?}",
                input
            );
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Coins::from_nanos(1_200_000_000).to_string(), "1.2");
        assert_eq!(Coins::from_nanos(500_000_000).to_string(), "0.5");
        assert_eq!(Coins::from_nanos(3_000_000_000).to_string(), "3");
        assert_eq!(Coins::ZERO.to_string(), "0");
    }
}
