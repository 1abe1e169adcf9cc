use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::asset::Asset;
use crate::chain::messages::{de_time_point_sec, de_u64};
use crate::error::{ChainError, Result};
use crate::types::LoanTableRows;

/// The two REX loan tables of the system contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoanTable {
    Cpu,
    Net,
}

impl LoanTable {
    pub const ALL: [LoanTable; 2] = [LoanTable::Cpu, LoanTable::Net];

    pub fn as_str(self) -> &'static str {
        match self {
            LoanTable::Cpu => "cpuloan",
            LoanTable::Net => "netloan",
        }
    }
}

impl fmt::Display for LoanTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row of `cpuloan` / `netloan`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoanRecord {
    #[serde(default)]
    pub version: u8,
    pub from: String,
    pub receiver: String,
    pub payment: Asset,
    pub balance: Asset,
    pub total_staked: Asset,
    #[serde(deserialize_with = "de_u64")]
    pub loan_num: u64,
    #[serde(deserialize_with = "de_time_point_sec")]
    pub expiration: DateTime<Utc>,
}

impl LoanRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration <= now
    }
}

impl LoanTableRows {
    /// Typed view of the rows. Fails on the first row that is not a loan.
    pub fn loan_records(&self) -> Result<Vec<LoanRecord>> {
        self.rows
            .iter()
            .map(|row| LoanRecord::deserialize(row).map_err(ChainError::from))
            .collect()
    }
}
