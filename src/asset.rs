use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

use crate::error::ChainError;

/// Largest precision the chain allows for a token symbol.
pub const MAX_PRECISION: u8 = 18;

/// Token symbol: code plus number of decimal places.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    pub code: String,
    pub precision: u8,
}

impl Symbol {
    /// 1-7 upper-case ASCII letters.
    pub fn is_valid_code(code: &str) -> bool {
        (1..=7).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_uppercase())
    }

    /// Number of base units in one whole token (`10^precision`).
    pub fn unit_scale(&self) -> f64 {
        10f64.powi(i32::from(self.precision))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.precision, self.code)
    }
}

/// A token quantity as the node renders it, e.g. `"1234.5678 EOS"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub amount: Decimal,
    pub symbol: Symbol,
}

impl Asset {
    pub fn to_f64(&self) -> f64 {
        self.amount.to_f64().unwrap_or(f64::NAN)
    }
}

impl FromStr for Asset {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ChainError::Malformed(format!("invalid asset {s:?}"));

        let (amount_str, code) = s.trim().split_once(' ').ok_or_else(malformed)?;
        let code = code.trim();
        if !Symbol::is_valid_code(code) {
            return Err(malformed());
        }

        let precision = match amount_str.split_once('.') {
            Some((_, frac)) => frac.len(),
            None => 0,
        };
        if precision > usize::from(MAX_PRECISION) {
            return Err(malformed());
        }
        let amount = Decimal::from_str(amount_str).map_err(|_| malformed())?;

        Ok(Asset {
            amount,
            symbol: Symbol {
                code: code.to_string(),
                precision: precision as u8,
            },
        })
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut amount = self.amount;
        amount.rescale(u32::from(self.symbol.precision));
        write!(f, "{} {}", amount, self.symbol.code)
    }
}

impl<'de> Deserialize<'de> for Asset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
