use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use rexi::config::Config;
use rexi::tables::LoanTable;
use rexi::{
    BoundedRangeTableReader, ConnectionDescriptor, MarketQuotes, PriceQuote, ResourcePriceEstimator,
    RpcTransport, TableQueryResult,
};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let connection = cfg.connection()?;
    let transport = Arc::new(RpcTransport::new(
        Duration::from_secs(cfg.http_timeout_secs),
        cfg.sample_account.clone(),
    )?);

    info!(
        endpoint = connection.endpoint_url(),
        markets = ?connection.capabilities(),
        sample_account = transport.sample_account(),
        "Querying {} ({},{})",
        connection.endpoint_url(),
        connection.token_precision(),
        connection.token_symbol_code(),
    );

    let estimator = ResourcePriceEstimator::new(Arc::clone(&transport));
    let quotes = estimator
        .estimate_available_markets(&connection, cfg.price_duration_ms)
        .await;
    log_quotes(&quotes, cfg.price_duration_ms);

    match &cfg.account_name {
        Some(account) => read_loans(transport, &connection, account).await,
        None => warn!("ACCOUNT_NAME not set, skipping loan tables."),
    }

    Ok(())
}

async fn read_loans(transport: Arc<RpcTransport>, connection: &ConnectionDescriptor, account: &str) {
    let reader = BoundedRangeTableReader::new(transport);
    let reads = LoanTable::ALL
        .iter()
        .map(|table| reader.read_loan_table(connection, table.as_str(), account));

    for result in join_all(reads).await {
        match result {
            TableQueryResult::Success(ok) => {
                info!(
                    table = %ok.table,
                    account,
                    rows = ok.rows.len(),
                    "[LOANS] {account} has {} {} row(s)",
                    ok.rows.len(),
                    ok.table,
                );
                match ok.loan_records() {
                    Ok(loans) => {
                        let now = Utc::now();
                        for loan in loans {
                            let status = if loan.is_expired_at(now) { "expired" } else { "active" };
                            info!(
                                "[LOANS]   #{} {} -> {} staked={} paid={} expires={} ({status})",
                                loan.loan_num,
                                loan.from,
                                loan.receiver,
                                loan.total_staked,
                                loan.payment,
                                loan.expiration,
                            );
                        }
                    }
                    Err(e) => warn!("[LOANS] rows of {} are not loans: {e}", ok.table),
                }
            }
            TableQueryResult::Failure(f) => {
                warn!(table = %f.table, "[LOANS] read failed: {}", f.error_detail);
            }
        }
    }
}

fn log_quotes(quotes: &MarketQuotes, duration_ms: u64) {
    log_quote("REX", quotes.rental.as_ref(), duration_ms);
    log_quote("POWERUP", quotes.pay_as_you_go.as_ref(), duration_ms);
}

fn log_quote(
    label: &str,
    quote: Option<&Result<PriceQuote, rexi::EstimateError>>,
    duration_ms: u64,
) {
    match quote {
        Some(Ok(q)) => info!("[{label}] {q} per {duration_ms}ms CPU"),
        Some(Err(e)) => warn!("[{label}] unavailable: {e}"),
        None => info!("[{label}] not supported by this node"),
    }
}
