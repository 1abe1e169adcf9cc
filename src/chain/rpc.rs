use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::chain::messages::{
    node_error_message, GetAccountRequest, GetAccountResponse, GetTableRowsRequest,
    GetTableRowsResponse,
};
use crate::chain::ChainTransport;
use crate::config::SYSTEM_CONTRACT;
use crate::error::{ChainError, Result};
use crate::pricing::{PayAsYouGoMarketState, PowerUpState, RentalMarketState, UsageSample};
use crate::types::{KeyType, TableQuery, TableRows};

const GET_TABLE_ROWS_PATH: &str = "/v1/chain/get_table_rows";
const GET_ACCOUNT_PATH: &str = "/v1/chain/get_account";

/// [`ChainTransport`] over the node's HTTP JSON API.
///
/// One pooled client is shared by every endpoint it is asked to talk to.
#[derive(Debug, Clone)]
pub struct RpcTransport {
    client: reqwest::Client,
    sample_account: String,
}

impl RpcTransport {
    pub fn new(timeout: Duration, sample_account: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            sample_account: sample_account.into(),
        })
    }

    pub fn sample_account(&self) -> &str {
        &self.sample_account
    }

    async fn post<B, R>(&self, endpoint: &str, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned + Send,
    {
        let url = format!("{}{}", endpoint.trim_end_matches('/'), path);
        debug!("[RPC] POST {url}");

        let resp = self.client.post(&url).json(body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(ChainError::Node {
                status: status.as_u16(),
                message: node_error_message(&text),
            });
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// First row of a system singleton table.
    async fn singleton_row<R: DeserializeOwned + Send>(
        &self,
        endpoint: &str,
        scope: &str,
        table: &str,
    ) -> Result<R> {
        let query = TableQuery {
            contract: SYSTEM_CONTRACT.to_string(),
            scope: scope.to_string(),
            table: table.to_string(),
            lower_bound_key: String::new(),
            upper_bound_key: String::new(),
            index_position: 1,
            key_type: KeyType::I64,
            row_limit: 1,
        };
        let result = self.get_table_rows(endpoint, &query).await?;
        first_row(table, result)
    }
}

/// Decode the only row a singleton read returns; an empty table is malformed.
fn first_row<R: DeserializeOwned>(table: &str, result: TableRows) -> Result<R> {
    let row = result
        .rows
        .into_iter()
        .next()
        .ok_or_else(|| ChainError::Malformed(format!("{table} table is empty")))?;
    Ok(serde_json::from_value(row)?)
}

#[async_trait]
impl ChainTransport for RpcTransport {
    async fn get_table_rows(&self, endpoint: &str, query: &TableQuery) -> Result<TableRows> {
        let body = GetTableRowsRequest::from_query(query);
        let resp: GetTableRowsResponse = self.post(endpoint, GET_TABLE_ROWS_PATH, &body).await?;
        Ok(resp.into())
    }

    async fn get_rental_market_state(&self, endpoint: &str) -> Result<RentalMarketState> {
        self.singleton_row(endpoint, SYSTEM_CONTRACT, "rexpool").await
    }

    async fn get_usage_sample(&self, endpoint: &str) -> Result<UsageSample> {
        let body = GetAccountRequest {
            account_name: &self.sample_account,
        };
        let account: GetAccountResponse = self.post(endpoint, GET_ACCOUNT_PATH, &body).await?;
        account.into_usage_sample()
    }

    async fn get_pay_as_you_go_state(&self, endpoint: &str) -> Result<PayAsYouGoMarketState> {
        let (state, sample) = tokio::try_join!(
            self.singleton_row::<PowerUpState>(endpoint, "", "powup.state"),
            self.get_usage_sample(endpoint),
        )?;
        Ok(PayAsYouGoMarketState {
            state,
            sample,
            observed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::rex::tests::rexpool_json;

    fn response(json: &str) -> TableRows {
        serde_json::from_str::<GetTableRowsResponse>(json).unwrap().into()
    }

    #[test]
    fn empty_singleton_is_malformed() {
        let err = first_row::<RentalMarketState>("rexpool", response(r#"{"rows":[]}"#)).unwrap_err();
        match err {
            ChainError::Malformed(msg) => assert_eq!(msg, "rexpool table is empty"),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn singleton_decodes_first_row() {
        let body = format!(r#"{{"rows":[{}],"more":false,"next_key":""}}"#, rexpool_json());
        let state: RentalMarketState = first_row("rexpool", response(&body)).unwrap();
        assert_eq!(state.loan_num, 42);
    }

    #[test]
    fn singleton_row_of_wrong_shape_is_json_error() {
        let err = first_row::<RentalMarketState>("rexpool", response(r#"{"rows":[{"x":1}]}"#))
            .unwrap_err();
        assert!(matches!(err, ChainError::Json(_)), "{err:?}");
    }

    #[test]
    fn keeps_sample_account() {
        let transport = RpcTransport::new(Duration::from_secs(1), "b1").unwrap();
        assert_eq!(transport.sample_account(), "b1");
    }
}
