use async_trait::async_trait;

use crate::error::Result;
use crate::pricing::{PayAsYouGoMarketState, RentalMarketState, UsageSample};
use crate::types::{TableQuery, TableRows};

/// Chain-query seam. Every call names the node it goes to; implementations
/// hold no per-endpoint state.
#[async_trait]
pub trait ChainTransport: Send + Sync {
    /// Single bounded-range read of a contract table.
    async fn get_table_rows(&self, endpoint: &str, query: &TableQuery) -> Result<TableRows>;

    /// Current REX pool.
    async fn get_rental_market_state(&self, endpoint: &str) -> Result<RentalMarketState>;

    /// Recent network-wide usage, measured through a sample account.
    async fn get_usage_sample(&self, endpoint: &str) -> Result<UsageSample>;

    /// Current PowerUp state, stamped with the usage sample and time it was observed at.
    async fn get_pay_as_you_go_state(&self, endpoint: &str) -> Result<PayAsYouGoMarketState>;
}

#[async_trait]
impl<T: ChainTransport + ?Sized> ChainTransport for std::sync::Arc<T> {
    async fn get_table_rows(&self, endpoint: &str, query: &TableQuery) -> Result<TableRows> {
        (**self).get_table_rows(endpoint, query).await
    }

    async fn get_rental_market_state(&self, endpoint: &str) -> Result<RentalMarketState> {
        (**self).get_rental_market_state(endpoint).await
    }

    async fn get_usage_sample(&self, endpoint: &str) -> Result<UsageSample> {
        (**self).get_usage_sample(endpoint).await
    }

    async fn get_pay_as_you_go_state(&self, endpoint: &str) -> Result<PayAsYouGoMarketState> {
        (**self).get_pay_as_you_go_state(endpoint).await
    }
}
