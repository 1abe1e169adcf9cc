//! Scripted in-memory transport for tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::chain::ChainTransport;
use crate::error::{ChainError, Result};
use crate::pricing::{PayAsYouGoMarketState, RentalMarketState, UsageSample};
use crate::types::{TableQuery, TableRows};

/// Each field is what the fake node answers; `None` answers with an error.
#[derive(Default)]
pub struct FakeTransport {
    pub rental: Option<RentalMarketState>,
    pub sample: Option<UsageSample>,
    pub pay_as_you_go: Option<PayAsYouGoMarketState>,
    pub rows: Option<TableRows>,
    /// Every query seen, in call order.
    pub queries: Mutex<Vec<(String, TableQuery)>>,
    /// Names of the transport calls made, in call order.
    pub calls: Mutex<Vec<&'static str>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<(String, TableQuery)> {
        self.queries.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

fn unreachable_node() -> ChainError {
    ChainError::Node {
        status: 503,
        message: "connection refused".to_string(),
    }
}

#[async_trait]
impl ChainTransport for FakeTransport {
    async fn get_table_rows(&self, endpoint: &str, query: &TableQuery) -> Result<TableRows> {
        self.record("get_table_rows");
        self.queries
            .lock()
            .unwrap()
            .push((endpoint.to_string(), query.clone()));
        self.rows.clone().ok_or_else(unreachable_node)
    }

    async fn get_rental_market_state(&self, _endpoint: &str) -> Result<RentalMarketState> {
        self.record("get_rental_market_state");
        self.rental.clone().ok_or_else(unreachable_node)
    }

    async fn get_usage_sample(&self, _endpoint: &str) -> Result<UsageSample> {
        self.record("get_usage_sample");
        self.sample.clone().ok_or_else(unreachable_node)
    }

    async fn get_pay_as_you_go_state(&self, _endpoint: &str) -> Result<PayAsYouGoMarketState> {
        self.record("get_pay_as_you_go_state");
        self.pay_as_you_go.clone().ok_or_else(unreachable_node)
    }
}
