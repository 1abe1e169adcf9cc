use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, info, warn};

use crate::chain::ChainTransport;
use crate::error::EstimateError;
use crate::pricing::PricingFormulas;
use crate::types::{ConnectionDescriptor, Market, PriceQuote};

/// Quotes for every market a connection advertises. `None` = not supported.
#[derive(Debug)]
pub struct MarketQuotes {
    pub rental: Option<Result<PriceQuote, EstimateError>>,
    pub pay_as_you_go: Option<Result<PriceQuote, EstimateError>>,
}

/// Turns live market state into a token price for a CPU duration.
///
/// Stateless between calls: every estimate re-fetches the market it prices.
pub struct ResourcePriceEstimator<T> {
    transport: T,
    formulas: PricingFormulas,
}

impl<T: ChainTransport> ResourcePriceEstimator<T> {
    pub fn new(transport: T) -> Self {
        Self::with_formulas(transport, PricingFormulas::default())
    }

    pub fn with_formulas(transport: T, formulas: PricingFormulas) -> Self {
        Self { transport, formulas }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Price of `duration_ms` of CPU rented through REX.
    ///
    /// Fetches the pool, then the usage sample; any failure along the way is
    /// `MarketUnavailable`.
    pub async fn estimate_rental_market_price(
        &self,
        connection: &ConnectionDescriptor,
        duration_ms: u64,
    ) -> Result<PriceQuote, EstimateError> {
        let market = Market::Rental;
        let endpoint = connection.endpoint_url();

        let state = self
            .transport
            .get_rental_market_state(endpoint)
            .await
            .map_err(|e| report(market, endpoint, "fetching rexpool", e))?;

        let sample = self
            .transport
            .get_usage_sample(endpoint)
            .await
            .map_err(|e| report(market, endpoint, "sampling usage", e))?;

        let raw = (self.formulas.rental)(&state, &sample, duration_ms)
            .map_err(|e| report(market, endpoint, "pricing", e))?;

        let quote = to_quote(market, raw, connection)?;
        info!(
            market = %market,
            endpoint,
            duration_ms,
            sample_account = %sample.account,
            rex_value = state.rex_value().unwrap_or(0.0),
            price = %quote,
            "[REX] {duration_ms}ms of CPU costs {quote}",
        );
        Ok(quote)
    }

    /// Price of `duration_ms` of CPU through PowerUp.
    pub async fn estimate_pay_as_you_go_price(
        &self,
        connection: &ConnectionDescriptor,
        duration_ms: u64,
    ) -> Result<PriceQuote, EstimateError> {
        let market = Market::PayAsYouGo;
        let endpoint = connection.endpoint_url();

        let state = self
            .transport
            .get_pay_as_you_go_state(endpoint)
            .await
            .map_err(|e| report(market, endpoint, "fetching powup.state", e))?;

        let raw = (self.formulas.pay_as_you_go)(&state, duration_ms)
            .map_err(|e| report(market, endpoint, "pricing", e))?;

        let quote = to_quote(market, raw, connection)?;
        info!(
            market = %market,
            endpoint,
            duration_ms,
            price = %quote,
            "[POWERUP] {duration_ms}ms of CPU costs {quote}",
        );
        Ok(quote)
    }

    /// Estimate every market in the connection's capability set concurrently.
    pub async fn estimate_available_markets(
        &self,
        connection: &ConnectionDescriptor,
        duration_ms: u64,
    ) -> MarketQuotes {
        let rental = async {
            if connection.supports(Market::Rental) {
                Some(self.estimate_rental_market_price(connection, duration_ms).await)
            } else {
                debug!(endpoint = connection.endpoint_url(), "[REX] not supported, skipping");
                None
            }
        };
        let pay_as_you_go = async {
            if connection.supports(Market::PayAsYouGo) {
                Some(self.estimate_pay_as_you_go_price(connection, duration_ms).await)
            } else {
                debug!(endpoint = connection.endpoint_url(), "[POWERUP] not supported, skipping");
                None
            }
        };

        let (rental, pay_as_you_go) = tokio::join!(rental, pay_as_you_go);
        MarketQuotes {
            rental,
            pay_as_you_go,
        }
    }
}

fn report(
    market: Market,
    endpoint: &str,
    stage: &str,
    err: impl std::fmt::Display,
) -> EstimateError {
    warn!(market = %market, endpoint, stage, error = %err, "{market} market unavailable");
    EstimateError::unavailable(market, format!("{stage}: {err}"))
}

/// Rental quotes round half away from zero like any asset built from a float.
/// PowerUp fees round up so a non-zero fee is never quoted as free.
fn rounding_for(market: Market) -> RoundingStrategy {
    match market {
        Market::Rental => RoundingStrategy::MidpointAwayFromZero,
        Market::PayAsYouGo => RoundingStrategy::AwayFromZero,
    }
}

/// Round a raw token amount to exactly the connection's precision.
fn to_quote(
    market: Market,
    raw: f64,
    connection: &ConnectionDescriptor,
) -> Result<PriceQuote, EstimateError> {
    if !raw.is_finite() || raw < 0.0 {
        return Err(EstimateError::unavailable(
            market,
            format!("pricing produced unusable amount {raw}"),
        ));
    }

    let precision = connection.token_precision();
    let exact = if raw == 0.0 {
        Decimal::ZERO
    } else {
        Decimal::from_f64_retain(raw).ok_or_else(|| {
            EstimateError::unavailable(market, format!("price {raw} out of decimal range"))
        })?
    };
    let scale = u32::from(precision);
    let mut amount = exact.round_dp_with_strategy(scale, rounding_for(market));
    amount.rescale(scale);
    // rescale lowers the scale instead of failing when the digits do not fit
    if amount.scale() != scale {
        return Err(EstimateError::unavailable(
            market,
            format!("price {raw} out of decimal range at precision {precision}"),
        ));
    }

    Ok(PriceQuote {
        amount,
        symbol_code: connection.token_symbol_code().to_string(),
        precision,
    })
}
