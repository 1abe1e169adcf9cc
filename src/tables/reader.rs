use tracing::{debug, warn};

use crate::chain::ChainTransport;
use crate::config::{LOAN_OWNER_INDEX_POSITION, LOAN_ROW_LIMIT, SYSTEM_CONTRACT};
use crate::types::{
    ConnectionDescriptor, KeyType, LoanTableRows, TableQuery, TableQueryFailure, TableQueryResult,
};

/// Account names: 1-12 of `a-z`, `1-5`, `.`, not ending in `.`.
pub fn is_valid_account_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 12
        && !name.ends_with('.')
        && name
            .bytes()
            .all(|b| matches!(b, b'a'..=b'z' | b'1'..=b'5' | b'.'))
}

/// Single-shot reads of system tables filtered to one account.
///
/// Every call is exactly one request; failures come back as
/// [`TableQueryResult::Failure`], never as an error.
pub struct BoundedRangeTableReader<T> {
    transport: T,
}

impl<T: ChainTransport> BoundedRangeTableReader<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Equality lookup of `account_name` on the loan owner index of `table_name`.
    pub fn loan_query(table_name: &str, account_name: &str) -> TableQuery {
        TableQuery {
            contract: SYSTEM_CONTRACT.to_string(),
            scope: SYSTEM_CONTRACT.to_string(),
            table: table_name.to_string(),
            lower_bound_key: account_name.to_string(),
            upper_bound_key: account_name.to_string(),
            index_position: LOAN_OWNER_INDEX_POSITION,
            key_type: KeyType::Name,
            row_limit: LOAN_ROW_LIMIT,
        }
    }

    /// Loans owned by `account_name` in `table_name` (`cpuloan` or `netloan`).
    pub async fn read_loan_table(
        &self,
        connection: &ConnectionDescriptor,
        table_name: &str,
        account_name: &str,
    ) -> TableQueryResult {
        let query = Self::loan_query(table_name, account_name);
        if !is_valid_account_name(account_name) {
            warn!(
                endpoint = connection.endpoint_url(),
                table = %table_name,
                account = %account_name,
                "[LOANS] refusing query for invalid account name",
            );
            return failure(&query, format!("invalid account name {account_name:?}"));
        }
        self.read_table(connection, &query).await
    }

    /// Issue `query` once and normalize the outcome.
    pub async fn read_table(
        &self,
        connection: &ConnectionDescriptor,
        query: &TableQuery,
    ) -> TableQueryResult {
        let endpoint = connection.endpoint_url();
        match self.transport.get_table_rows(endpoint, query).await {
            Ok(result) => {
                if result.more {
                    debug!(
                        table = %query.table,
                        limit = query.row_limit,
                        next_key = ?result.next_key,
                        "[LOANS] more rows available beyond limit, not following",
                    );
                }
                debug!(
                    endpoint,
                    contract = %query.contract,
                    scope = %query.scope,
                    table = %query.table,
                    account = %query.lower_bound_key,
                    rows = result.rows.len(),
                    "[LOANS] table read complete",
                );
                TableQueryResult::Success(LoanTableRows {
                    rows: result.rows,
                    contract: query.contract.clone(),
                    scope: query.scope.clone(),
                    table: query.table.clone(),
                })
            }
            Err(e) => {
                warn!(
                    endpoint,
                    table = %query.table,
                    account = %query.lower_bound_key,
                    error = %e,
                    "[LOANS] table read failed",
                );
                failure(query, e.to_string())
            }
        }
    }
}

fn failure(query: &TableQuery, detail: String) -> TableQueryResult {
    let error_detail = if detail.trim().is_empty() {
        "unknown table query failure".to_string()
    } else {
        detail
    };
    TableQueryResult::Failure(TableQueryFailure {
        contract: query.contract.clone(),
        scope: query.scope.clone(),
        table: query.table.clone(),
        error_detail,
    })
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::fmt::MakeWriter;

    use super::*;
    use crate::chain::fake::FakeTransport;
    use crate::tables::loans::tests::loan_row;
    use crate::types::TableRows;

    fn connection() -> ConnectionDescriptor {
        ConnectionDescriptor::new("https://node.example", "EOS", 4).unwrap()
    }

    fn two_rows() -> FakeTransport {
        FakeTransport {
            rows: Some(TableRows {
                rows: vec![loan_row(1, "alice"), loan_row(2, "bob")],
                more: false,
                next_key: None,
            }),
            ..FakeTransport::new()
        }
    }

    /// Shared buffer the test subscriber writes formatted events into.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn loan_read_returns_rows_and_coordinates() {
        let reader = BoundedRangeTableReader::new(two_rows());
        let result = reader.read_loan_table(&connection(), "cpuloan", "alice").await;

        match result {
            TableQueryResult::Success(ok) => {
                assert_eq!(ok.rows.len(), 2);
                assert_eq!(ok.contract, "eosio");
                assert_eq!(ok.scope, "eosio");
                assert_eq!(ok.table, "cpuloan");
            }
            other => panic!("expected Success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn every_query_is_an_equality_filter() {
        let reader = BoundedRangeTableReader::new(two_rows());
        for (table, account) in [("cpuloan", "alice"), ("netloan", "bob.x"), ("cpuloan", "z")] {
            reader.read_loan_table(&connection(), table, account).await;
        }

        let queries = reader.transport().queries();
        assert_eq!(queries.len(), 3);
        for (endpoint, query) in &queries {
            assert_eq!(endpoint, "https://node.example");
            assert_eq!(query.lower_bound_key, query.upper_bound_key);
            assert_eq!(query.index_position, 3);
            assert_eq!(query.key_type, KeyType::Name);
            assert_eq!(query.row_limit, 1000);
        }
        assert_eq!(queries[1].1.table, "netloan");
        assert_eq!(queries[1].1.lower_bound_key, "bob.x");
    }

    #[tokio::test]
    async fn repeated_reads_are_identical() {
        let reader = BoundedRangeTableReader::new(two_rows());
        let first = reader.read_loan_table(&connection(), "netloan", "alice").await;
        let second = reader.read_loan_table(&connection(), "netloan", "alice").await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn transport_error_becomes_failure() {
        let reader = BoundedRangeTableReader::new(FakeTransport::new());
        let result = reader.read_loan_table(&connection(), "cpuloan", "alice").await;

        match result {
            TableQueryResult::Failure(f) => {
                assert!(!f.error_detail.is_empty());
                assert!(f.error_detail.contains("connection refused"), "{}", f.error_detail);
                assert_eq!(f.table, "cpuloan");
                assert_eq!(f.contract, "eosio");
            }
            other => panic!("expected Failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_account_fails_without_request() {
        let reader = BoundedRangeTableReader::new(two_rows());
        for bad in ["", "Alice", "toolongaccount1", "trailing.", "has space"] {
            let result = reader.read_loan_table(&connection(), "cpuloan", bad).await;
            assert!(!result.is_success(), "{bad:?} should fail");
            assert_eq!(result.table(), "cpuloan");
        }
        assert!(reader.transport().calls().is_empty());
    }

    #[tokio::test]
    async fn continuation_cursor_is_not_followed() {
        let transport = FakeTransport {
            rows: Some(TableRows {
                rows: vec![loan_row(1, "alice")],
                more: true,
                next_key: Some("12345".to_string()),
            }),
            ..FakeTransport::new()
        };
        let reader = BoundedRangeTableReader::new(transport);
        let result = reader.read_loan_table(&connection(), "cpuloan", "alice").await;
        assert!(result.is_success());
        assert_eq!(reader.transport().calls(), vec!["get_table_rows"]);
    }

    #[tokio::test]
    async fn read_is_logged_with_structured_fields() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let reader = BoundedRangeTableReader::new(two_rows());
        reader.read_loan_table(&connection(), "cpuloan", "alice").await;

        let out = logs.contents();
        assert!(out.contains("[LOANS] table read complete"), "{out}");
        assert!(out.contains("table=cpuloan"), "{out}");
        assert!(out.contains("account=alice"), "{out}");
        assert!(out.contains("rows=2"), "{out}");
    }

    #[test]
    fn account_name_rules() {
        assert!(is_valid_account_name("alice"));
        assert!(is_valid_account_name("eosio.token"));
        assert!(is_valid_account_name("a1b2c3d4e5.z"));
        assert!(!is_valid_account_name("a6"));
        assert!(!is_valid_account_name("abcdefghijklm"));
    }
}
