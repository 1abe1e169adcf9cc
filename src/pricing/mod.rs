pub mod estimator;
pub mod powerup;
pub mod rex;

pub use estimator::{MarketQuotes, ResourcePriceEstimator};
pub use powerup::{PayAsYouGoMarketState, PowerUpResource, PowerUpState};
pub use rex::RentalMarketState;

use crate::error::FormulaError;

/// Network-wide usage as seen through a sample account.
///
/// `cpu` is microseconds and `net` bytes per 10^6 units of stake weight,
/// rounded up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageSample {
    pub account: String,
    pub cpu: u128,
    pub net: u128,
}

pub type RentalFormula = fn(&RentalMarketState, &UsageSample, u64) -> Result<f64, FormulaError>;
pub type PayAsYouGoFormula = fn(&PayAsYouGoMarketState, u64) -> Result<f64, FormulaError>;

/// Pricing functions applied to fetched market state. Both must be pure.
#[derive(Debug, Clone, Copy)]
pub struct PricingFormulas {
    pub rental: RentalFormula,
    pub pay_as_you_go: PayAsYouGoFormula,
}

impl Default for PricingFormulas {
    fn default() -> Self {
        Self {
            rental: rex::rental_price,
            pay_as_you_go: powerup::pay_as_you_go_price,
        }
    }
}
