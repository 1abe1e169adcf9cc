use serde::Deserialize;

use crate::asset::Asset;
use crate::chain::messages::{de_u64, SAMPLE_PRECISION};
use crate::error::FormulaError;
use crate::pricing::UsageSample;

/// Row of `eosio::rexpool`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RentalMarketState {
    #[serde(default)]
    pub version: u8,
    pub total_lent: Asset,
    pub total_unlent: Asset,
    pub total_rent: Asset,
    pub total_lendable: Asset,
    pub total_rex: Asset,
    pub namebid_proceeds: Asset,
    #[serde(deserialize_with = "de_u64")]
    pub loan_num: u64,
}

impl RentalMarketState {
    /// Core tokens backing a single REX.
    pub fn rex_value(&self) -> Option<f64> {
        let rex = self.total_rex.to_f64();
        (rex > 0.0).then(|| (self.total_lent.to_f64() + self.total_unlent.to_f64()) / rex)
    }

    /// Tokens paid per token of stake rented, at the current pool balance.
    pub fn rent_ratio(&self) -> Result<f64, FormulaError> {
        let rent = self.total_rent.to_f64();
        let unlent = self.total_unlent.to_f64();
        if !(rent > 0.0) {
            return Err(FormulaError::NonPositive("total_rent"));
        }
        if !(unlent > 0.0) {
            return Err(FormulaError::NonPositive("total_unlent"));
        }
        Ok(rent / unlent)
    }
}

/// Price of `duration_ms` of CPU rented through REX, in whole tokens of the pool's symbol.
///
/// One token of rented stake costs `total_rent / total_unlent` tokens, and one
/// base unit of stake buys `sample.cpu / 10^6` microseconds.
pub fn rental_price(
    state: &RentalMarketState,
    sample: &UsageSample,
    duration_ms: u64,
) -> Result<f64, FormulaError> {
    if sample.cpu == 0 {
        return Err(FormulaError::NonPositive("sampled cpu"));
    }
    let ratio = state.rent_ratio()?;

    let us = duration_ms as f64 * 1000.0;
    let weight_per_us = SAMPLE_PRECISION as f64 / sample.cpu as f64;
    let base_units = ratio * weight_per_us * us;
    let price = base_units / state.total_rent.symbol.unit_scale();

    if !price.is_finite() {
        return Err(FormulaError::NotFinite);
    }
    Ok(price)
}
