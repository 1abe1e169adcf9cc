use thiserror::Error;

use crate::types::Market;

/// Failures talking to a chain node.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("node rejected request ({status}): {message}")]
    Node { status: u16, message: String },

    #[error("malformed chain data: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, ChainError>;

/// Failures producing a price quote.
#[derive(Debug, Error)]
pub enum EstimateError {
    #[error("{market} market unavailable: {reason}")]
    MarketUnavailable { market: Market, reason: String },
}

impl EstimateError {
    pub fn unavailable(market: Market, reason: impl Into<String>) -> Self {
        EstimateError::MarketUnavailable {
            market,
            reason: reason.into(),
        }
    }

    pub fn market(&self) -> Market {
        match self {
            EstimateError::MarketUnavailable { market, .. } => *market,
        }
    }
}

/// Invalid runtime configuration or connection parameters.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid endpoint URL {url:?}: {reason}")]
    Endpoint { url: String, reason: String },

    #[error("invalid token symbol code {0:?}")]
    SymbolCode(String),

    #[error("token precision {0} exceeds the maximum of 18")]
    Precision(u8),

    #[error("unknown contract feature {0:?}")]
    UnknownFeature(String),

    #[error("{name} must be {expected}")]
    Env { name: &'static str, expected: &'static str },
}

/// Market state a pricing formula cannot consume.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    #[error("{0} is zero or negative")]
    NonPositive(&'static str),

    #[error("{0}")]
    Invalid(&'static str),

    #[error("price is not a finite number")]
    NotFinite,
}
