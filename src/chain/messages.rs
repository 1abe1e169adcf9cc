//! Wire shapes of the node's `/v1/chain/*` JSON API.
//!
//! nodeos renders 64-bit integers and floats either as JSON numbers or as
//! strings depending on magnitude and version, so numeric fields go through
//! the lenient helpers below.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ChainError, Result};
use crate::pricing::UsageSample;
use crate::types::{KeyType, TableQuery, TableRows};

/// Scale used by the sampled usage figures (units per 10^6 weight).
pub const SAMPLE_PRECISION: u128 = 1_000_000;

// ---------------------------------------------------------------------------
// get_table_rows
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct GetTableRowsRequest<'a> {
    pub json: bool,
    pub code: &'a str,
    pub scope: &'a str,
    pub table: &'a str,
    pub lower_bound: &'a str,
    pub upper_bound: &'a str,
    pub index_position: String,
    pub key_type: KeyType,
    pub limit: u32,
}

impl<'a> GetTableRowsRequest<'a> {
    pub fn from_query(query: &'a TableQuery) -> Self {
        Self {
            json: true,
            code: &query.contract,
            scope: &query.scope,
            table: &query.table,
            lower_bound: &query.lower_bound_key,
            upper_bound: &query.upper_bound_key,
            index_position: query.index_position.to_string(),
            key_type: query.key_type,
            limit: query.row_limit,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GetTableRowsResponse {
    #[serde(default)]
    pub rows: Vec<serde_json::Value>,
    #[serde(default)]
    pub more: bool,
    #[serde(default)]
    pub next_key: Option<String>,
}

impl From<GetTableRowsResponse> for TableRows {
    fn from(resp: GetTableRowsResponse) -> Self {
        TableRows {
            rows: resp.rows,
            more: resp.more,
            next_key: resp.next_key.filter(|k| !k.is_empty()),
        }
    }
}

// ---------------------------------------------------------------------------
// get_account
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct GetAccountRequest<'a> {
    pub account_name: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct AccountResourceLimit {
    #[serde(deserialize_with = "de_i128")]
    pub used: i128,
    #[serde(deserialize_with = "de_i128")]
    pub available: i128,
    #[serde(deserialize_with = "de_i128")]
    pub max: i128,
}

#[derive(Debug, Deserialize)]
pub struct GetAccountResponse {
    pub account_name: String,
    #[serde(deserialize_with = "de_i128")]
    pub cpu_weight: i128,
    #[serde(deserialize_with = "de_i128")]
    pub net_weight: i128,
    pub cpu_limit: AccountResourceLimit,
    pub net_limit: AccountResourceLimit,
}

impl GetAccountResponse {
    /// Convert the sample account's limits into per-weight usage rates.
    pub fn into_usage_sample(self) -> Result<UsageSample> {
        Ok(UsageSample {
            cpu: per_weight(self.cpu_limit.max, self.cpu_weight, "cpu")?,
            net: per_weight(self.net_limit.max, self.net_weight, "net")?,
            account: self.account_name,
        })
    }
}

fn per_weight(max: i128, weight: i128, what: &str) -> Result<u128> {
    if max < 0 || weight <= 0 {
        return Err(ChainError::Malformed(format!(
            "sample account has unusable {what} limits (max={max}, weight={weight})"
        )));
    }
    let scaled = (max as u128)
        .checked_mul(SAMPLE_PRECISION)
        .ok_or_else(|| ChainError::Malformed(format!("{what} limit overflows")))?;
    Ok(scaled.div_ceil(weight as u128))
}

// ---------------------------------------------------------------------------
// Error body
// ---------------------------------------------------------------------------

/// nodeos error envelope: `{"code":500,"message":"...","error":{"what":"..."}}`.
#[derive(Debug, Deserialize)]
pub struct NodeErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<NodeErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct NodeErrorDetail {
    #[serde(default)]
    pub what: Option<String>,
}

/// Best human-readable message from a non-2xx reply body.
pub fn node_error_message(body: &str) -> String {
    match serde_json::from_str::<NodeErrorBody>(body) {
        Ok(parsed) => parsed
            .error
            .and_then(|e| e.what)
            .or(parsed.message)
            .unwrap_or_else(|| body.to_string()),
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Lenient field decoders
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Int(i64),
    Float(f64),
    Str(String),
}

pub fn de_f64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<f64, D::Error> {
    match NumberOrString::deserialize(d)? {
        NumberOrString::Int(i) => Ok(i as f64),
        NumberOrString::Float(f) => Ok(f),
        NumberOrString::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

pub fn de_i128<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<i128, D::Error> {
    match NumberOrString::deserialize(d)? {
        NumberOrString::Int(i) => Ok(i128::from(i)),
        NumberOrString::Float(f) if f.fract() == 0.0 && f.is_finite() => Ok(f as i128),
        NumberOrString::Float(f) => Err(serde::de::Error::custom(format!("expected integer, got {f}"))),
        NumberOrString::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

pub fn de_u64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<u64, D::Error> {
    let wide = de_i128(d)?;
    u64::try_from(wide).map_err(serde::de::Error::custom)
}

/// `time_point_sec` is rendered without a zone, e.g. `"2021-03-08T00:00:00"`.
pub fn parse_time_point_sec(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim().trim_end_matches('Z');
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

pub fn de_time_point_sec<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(d)?;
    parse_time_point_sec(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid time_point_sec {raw:?}")))
}
