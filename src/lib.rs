//! Resource pricing and loan-table queries against EOSIO-family chain nodes.
//!
//! [`ResourcePriceEstimator`] quotes CPU on the REX and PowerUp markets;
//! [`BoundedRangeTableReader`] reads an account's `cpuloan`/`netloan` rows.
//! Both talk to the node through a [`ChainTransport`].

pub mod asset;
pub mod chain;
pub mod config;
pub mod error;
pub mod pricing;
pub mod tables;
pub mod types;

pub use chain::{ChainTransport, RpcTransport};
pub use error::{ChainError, ConfigError, EstimateError, FormulaError};
pub use pricing::{MarketQuotes, PricingFormulas, ResourcePriceEstimator};
pub use tables::{BoundedRangeTableReader, LoanTable};
pub use types::{
    ConnectionDescriptor, KeyType, LoanTableRows, Market, PriceQuote, TableQuery,
    TableQueryFailure, TableQueryResult,
};
