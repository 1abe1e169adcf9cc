use std::collections::BTreeSet;

use crate::error::ConfigError;
use crate::types::{parse_capabilities, ConnectionDescriptor, Market};

pub const DEFAULT_RPC_ENDPOINT: &str = "https://eos.greymass.com";
pub const DEFAULT_TOKEN_SYMBOL: &str = "EOS";
pub const DEFAULT_TOKEN_PRECISION: u8 = 4;
pub const DEFAULT_SUPPORTED_CONTRACTS: &str = "rex,powerup";

/// Account whose resource limits stand in for network-wide usage.
pub const DEFAULT_SAMPLE_ACCOUNT: &str = "b1";

/// System contract owning the REX and PowerUp tables.
pub const SYSTEM_CONTRACT: &str = "eosio";

/// Secondary index of `cpuloan`/`netloan` keyed by the loan owner.
pub const LOAN_OWNER_INDEX_POSITION: u8 = 3;

/// Upper bound on rows returned by one loan table read. No continuation is followed.
pub const LOAN_ROW_LIMIT: u32 = 1000;

/// Duration the quoted prices cover, matching what wallets display ("per ms").
pub const DEFAULT_PRICE_DURATION_MS: u64 = 1;

/// Connect + response timeout for node requests (seconds).
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_endpoint: String,
    pub token_symbol: String,
    pub token_precision: u8,
    /// Contract features the node supports (SUPPORTED_CONTRACTS, comma-separated).
    /// Only `rex` and `powerup` matter here; anything else is ignored.
    pub supported_markets: BTreeSet<Market>,
    pub sample_account: String,
    /// Account whose loans are read (ACCOUNT_NAME). Loans are skipped when unset.
    pub account_name: Option<String>,
    pub price_duration_ms: u64,
    pub http_timeout_secs: u64,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            rpc_endpoint: std::env::var("RPC_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_RPC_ENDPOINT.to_string()),
            token_symbol: std::env::var("TOKEN_SYMBOL")
                .unwrap_or_else(|_| DEFAULT_TOKEN_SYMBOL.to_string()),
            token_precision: std::env::var("TOKEN_PRECISION")
                .unwrap_or_else(|_| DEFAULT_TOKEN_PRECISION.to_string())
                .parse::<u8>()
                .map_err(|_| ConfigError::Env {
                    name: "TOKEN_PRECISION",
                    expected: "an integer between 0 and 18",
                })?,
            supported_markets: parse_capabilities(
                &std::env::var("SUPPORTED_CONTRACTS")
                    .unwrap_or_else(|_| DEFAULT_SUPPORTED_CONTRACTS.to_string()),
            ),
            sample_account: std::env::var("SAMPLE_ACCOUNT")
                .unwrap_or_else(|_| DEFAULT_SAMPLE_ACCOUNT.to_string()),
            account_name: std::env::var("ACCOUNT_NAME")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            price_duration_ms: std::env::var("PRICE_DURATION_MS")
                .unwrap_or_else(|_| DEFAULT_PRICE_DURATION_MS.to_string())
                .parse::<u64>()
                .map_err(|_| ConfigError::Env {
                    name: "PRICE_DURATION_MS",
                    expected: "a non-negative integer",
                })?,
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_HTTP_TIMEOUT_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validated connection built from the configured endpoint and token.
    pub fn connection(&self) -> Result<ConnectionDescriptor, ConfigError> {
        Ok(
            ConnectionDescriptor::new(&self.rpc_endpoint, &self.token_symbol, self.token_precision)?
                .with_capabilities(self.supported_markets.iter().copied()),
        )
    }
}
