use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::asset::{Symbol, MAX_PRECISION};
use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Markets
// ---------------------------------------------------------------------------

/// Resource markets a node may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    /// REX: demand-priced rental of staked capacity.
    Rental,
    /// PowerUp: capacity priced straight from the market state.
    PayAsYouGo,
}

impl Market {
    /// Contract feature name advertised by the node's wallet metadata.
    pub fn feature_name(self) -> &'static str {
        match self {
            Market::Rental => "rex",
            Market::PayAsYouGo => "powerup",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Market::Rental => "rental",
            Market::PayAsYouGo => "pay_as_you_go",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Market {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rex" => Ok(Market::Rental),
            "powerup" => Ok(Market::PayAsYouGo),
            other => Err(ConfigError::UnknownFeature(other.to_string())),
        }
    }
}

/// Parse a comma-separated list of supported contracts, e.g. `"rex,powerup,msig"`.
/// Features that are not resource markets are ignored.
pub fn parse_capabilities(list: &str) -> BTreeSet<Market> {
    list.split(',')
        .filter_map(|s| s.parse::<Market>().ok())
        .collect()
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// Everything a query needs to know about the node it talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    endpoint_url: String,
    token_symbol_code: String,
    token_precision: u8,
    capabilities: BTreeSet<Market>,
}

impl ConnectionDescriptor {
    pub fn new(
        endpoint_url: &str,
        token_symbol_code: &str,
        token_precision: u8,
    ) -> Result<Self, ConfigError> {
        let parsed = reqwest::Url::parse(endpoint_url).map_err(|e| ConfigError::Endpoint {
            url: endpoint_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Endpoint {
                url: endpoint_url.to_string(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }
        if !Symbol::is_valid_code(token_symbol_code) {
            return Err(ConfigError::SymbolCode(token_symbol_code.to_string()));
        }
        if token_precision > MAX_PRECISION {
            return Err(ConfigError::Precision(token_precision));
        }

        Ok(Self {
            endpoint_url: endpoint_url.trim_end_matches('/').to_string(),
            token_symbol_code: token_symbol_code.to_string(),
            token_precision,
            capabilities: BTreeSet::new(),
        })
    }

    pub fn with_capabilities(mut self, markets: impl IntoIterator<Item = Market>) -> Self {
        self.capabilities = markets.into_iter().collect();
        self
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    pub fn token_symbol_code(&self) -> &str {
        &self.token_symbol_code
    }

    pub fn token_precision(&self) -> u8 {
        self.token_precision
    }

    pub fn capabilities(&self) -> &BTreeSet<Market> {
        &self.capabilities
    }

    pub fn supports(&self, market: Market) -> bool {
        self.capabilities.contains(&market)
    }
}

// ---------------------------------------------------------------------------
// Quotes
// ---------------------------------------------------------------------------

/// Estimated price for a resource duration, denominated in the connection's token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub amount: Decimal,
    pub symbol_code: String,
    pub precision: u8,
}

impl fmt::Display for PriceQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.symbol_code)
    }
}

// ---------------------------------------------------------------------------
// Table queries
// ---------------------------------------------------------------------------

/// Secondary index key encodings understood by `get_table_rows`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Name,
    I64,
    I128,
    I256,
    Float64,
    Float128,
    Sha256,
    Ripemd160,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KeyType::Name => "name",
            KeyType::I64 => "i64",
            KeyType::I128 => "i128",
            KeyType::I256 => "i256",
            KeyType::Float64 => "float64",
            KeyType::Float128 => "float128",
            KeyType::Sha256 => "sha256",
            KeyType::Ripemd160 => "ripemd160",
        };
        write!(f, "{s}")
    }
}

/// A single bounded-range lookup against a contract table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    pub contract: String,
    pub scope: String,
    pub table: String,
    pub lower_bound_key: String,
    pub upper_bound_key: String,
    pub index_position: u8,
    pub key_type: KeyType,
    pub row_limit: u32,
}

/// Raw rows returned by the node for a [`TableQuery`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableRows {
    pub rows: Vec<serde_json::Value>,
    /// Node reports more rows beyond `row_limit`.
    pub more: bool,
    /// Continuation cursor. Never followed by the table reader.
    pub next_key: Option<String>,
}

/// Rows matched by a successful table read, with the coordinates they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoanTableRows {
    pub rows: Vec<serde_json::Value>,
    pub contract: String,
    pub scope: String,
    pub table: String,
}

/// Why a table read produced no rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQueryFailure {
    pub contract: String,
    pub scope: String,
    pub table: String,
    pub error_detail: String,
}

/// Outcome of a table read. Never an error crossing the reader boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum TableQueryResult {
    Success(LoanTableRows),
    Failure(TableQueryFailure),
}

impl TableQueryResult {
    pub fn is_success(&self) -> bool {
        matches!(self, TableQueryResult::Success(_))
    }

    pub fn table(&self) -> &str {
        match self {
            TableQueryResult::Success(s) => &s.table,
            TableQueryResult::Failure(f) => &f.table,
        }
    }
}
