use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::asset::Asset;
use crate::chain::messages::{de_f64, de_time_point_sec, SAMPLE_PRECISION};
use crate::error::FormulaError;
use crate::pricing::UsageSample;

/// One resource (cpu or net) of `eosio::powup.state`.
///
/// `weight`, `utilization` and `adjusted_utilization` are in stake weight
/// units; prices are for the whole of `weight` over a PowerUp period.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PowerUpResource {
    #[serde(default)]
    pub version: u8,
    #[serde(deserialize_with = "de_f64")]
    pub weight: f64,
    #[serde(deserialize_with = "de_f64")]
    pub weight_ratio: f64,
    #[serde(deserialize_with = "de_f64")]
    pub assumed_stake_weight: f64,
    #[serde(deserialize_with = "de_f64")]
    pub initial_weight_ratio: f64,
    #[serde(deserialize_with = "de_f64")]
    pub target_weight_ratio: f64,
    #[serde(deserialize_with = "de_time_point_sec")]
    pub initial_timestamp: DateTime<Utc>,
    #[serde(deserialize_with = "de_time_point_sec")]
    pub target_timestamp: DateTime<Utc>,
    #[serde(deserialize_with = "de_f64")]
    pub exponent: f64,
    #[serde(deserialize_with = "de_f64")]
    pub decay_secs: f64,
    pub min_price: Asset,
    pub max_price: Asset,
    #[serde(deserialize_with = "de_f64")]
    pub utilization: f64,
    #[serde(deserialize_with = "de_f64")]
    pub adjusted_utilization: f64,
    #[serde(deserialize_with = "de_time_point_sec")]
    pub utilization_timestamp: DateTime<Utc>,
}

/// Row of `eosio::powup.state` (singleton, empty scope).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PowerUpState {
    #[serde(default)]
    pub version: u8,
    pub net: PowerUpResource,
    pub cpu: PowerUpResource,
    #[serde(deserialize_with = "de_f64")]
    pub powerup_days: f64,
    pub min_powerup_fee: Asset,
}

/// PowerUp snapshot together with what is needed to price it deterministically.
#[derive(Debug, Clone, PartialEq)]
pub struct PayAsYouGoMarketState {
    pub state: PowerUpState,
    /// Converts microseconds into stake weight.
    pub sample: UsageSample,
    /// Moment the snapshot was taken; drives utilization decay.
    pub observed_at: DateTime<Utc>,
}

impl PowerUpResource {
    fn validate(&self) -> Result<(), FormulaError> {
        if !(self.weight > 0.0) {
            return Err(FormulaError::NonPositive("weight"));
        }
        if !(self.exponent >= 1.0) {
            return Err(FormulaError::Invalid("exponent must be at least 1"));
        }
        let (min, max) = (self.min_price.to_f64(), self.max_price.to_f64());
        if !(min >= 0.0 && max >= min) {
            return Err(FormulaError::Invalid("price bounds out of order"));
        }
        Ok(())
    }

    /// `adjusted_utilization` decayed toward `utilization` as of `now`.
    pub fn adjusted_utilization_at(&self, now: DateTime<Utc>) -> f64 {
        let utilization = self.utilization;
        let adjusted = self.adjusted_utilization;
        if utilization >= adjusted {
            return adjusted;
        }
        if self.decay_secs <= 0.0 {
            return utilization;
        }

        let diff = adjusted - utilization;
        let elapsed = (now - self.utilization_timestamp).num_milliseconds() as f64 / 1000.0;
        let delta = (diff * (-elapsed / self.decay_secs).exp()).clamp(0.0, diff);
        utilization + delta
    }

    /// Instantaneous price of the whole resource at `utilization`.
    pub fn price_function(&self, utilization: f64) -> f64 {
        let min = self.min_price.to_f64();
        let max = self.max_price.to_f64();
        let new_exponent = self.exponent - 1.0;
        if new_exponent <= 0.0 {
            return max;
        }
        min + (max - min) * (utilization / self.weight).powf(new_exponent)
    }

    /// Integral of [`Self::price_function`] between two utilizations, per unit weight.
    pub fn price_integral_delta(&self, start_utilization: f64, end_utilization: f64) -> f64 {
        let min = self.min_price.to_f64();
        let max = self.max_price.to_f64();
        let coefficient = (max - min) / self.exponent;
        let start_u = start_utilization / self.weight;
        let end_u = end_utilization / self.weight;
        min * end_u - min * start_u + coefficient * end_u.powf(self.exponent)
            - coefficient * start_u.powf(self.exponent)
    }

    /// Fee for raising utilization by `utilization_increase` weight units.
    pub fn fee(&self, utilization_increase: f64, adjusted_utilization: f64) -> f64 {
        let mut start_utilization = self.utilization;
        let end_utilization = start_utilization + utilization_increase;

        let mut fee = 0.0;
        if start_utilization < adjusted_utilization {
            let covered = utilization_increase.min(adjusted_utilization - start_utilization);
            fee += self.price_function(adjusted_utilization) * covered / self.weight;
            start_utilization = adjusted_utilization;
        }
        if start_utilization < end_utilization {
            fee += self.price_integral_delta(start_utilization, end_utilization);
        }
        fee
    }

    /// Price in whole tokens for `us` microseconds, given the sampled usage rate.
    pub fn price_per_us(
        &self,
        sample_rate: u128,
        us: f64,
        now: DateTime<Utc>,
    ) -> Result<f64, FormulaError> {
        self.validate()?;
        if sample_rate == 0 {
            return Err(FormulaError::NonPositive("sampled usage"));
        }

        let utilization_increase = (us * SAMPLE_PRECISION as f64 / sample_rate as f64).floor();
        let adjusted = self.adjusted_utilization_at(now);
        let fee = self.fee(utilization_increase, adjusted);

        if !fee.is_finite() {
            return Err(FormulaError::NotFinite);
        }
        Ok(fee.max(0.0))
    }
}

/// Price of `duration_ms` of CPU through PowerUp, in whole tokens.
pub fn pay_as_you_go_price(
    market: &PayAsYouGoMarketState,
    duration_ms: u64,
) -> Result<f64, FormulaError> {
    let us = duration_ms as f64 * 1000.0;
    market
        .state
        .cpu
        .price_per_us(market.sample.cpu, us, market.observed_at)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::chain::messages::parse_time_point_sec;

    pub(crate) fn powerup_json() -> &'static str {
        r#"{
            "version": 0,
            "net": {
                "version": 0, "weight": "1000000000", "weight_ratio": "1000000000000000",
                "assumed_stake_weight": "1000000", "initial_weight_ratio": "1000000000000000",
                "target_weight_ratio": "10000000000000", "initial_timestamp": "2021-03-01T00:00:00",
                "target_timestamp": "2021-06-01T00:00:00", "exponent": "2.00000000000000000",
                "decay_secs": 86400, "min_price": "0.0000 EOS", "max_price": "100000.0000 EOS",
                "utilization": 0, "adjusted_utilization": 0,
                "utilization_timestamp": "2021-03-08T00:00:00"
            },
            "cpu": {
                "version": 0, "weight": "1000000000", "weight_ratio": "1000000000000000",
                "assumed_stake_weight": "1000000", "initial_weight_ratio": "1000000000000000",
                "target_weight_ratio": "10000000000000", "initial_timestamp": "2021-03-01T00:00:00",
                "target_timestamp": "2021-06-01T00:00:00", "exponent": "2.00000000000000000",
                "decay_secs": 86400, "min_price": "0.0000 EOS", "max_price": "100000.0000 EOS",
                "utilization": "0", "adjusted_utilization": "0",
                "utilization_timestamp": "2021-03-08T00:00:00"
            },
            "powerup_days": 1,
            "min_powerup_fee": "0.0001 EOS"
        }"#
    }

    pub(crate) fn market(cpu_rate: u128) -> PayAsYouGoMarketState {
        PayAsYouGoMarketState {
            state: serde_json::from_str(powerup_json()).unwrap(),
            sample: UsageSample {
                account: "b1".to_string(),
                cpu: cpu_rate,
                net: 1,
            },
            observed_at: parse_time_point_sec("2021-03-08T00:00:00").unwrap(),
        }
    }

    #[test]
    fn parses_powerup_row() {
        let state: PowerUpState = serde_json::from_str(powerup_json()).unwrap();
        assert_eq!(state.cpu.weight, 1e9);
        assert_eq!(state.cpu.exponent, 2.0);
        assert_eq!(state.cpu.decay_secs, 86_400.0);
        assert_eq!(state.min_powerup_fee.to_string(), "0.0001 EOS");
    }

    #[test]
    fn empty_market_prices_along_the_integral() {
        // 1ms at 1_000_000 per weight -> 1000 weight units out of 1e9.
        // exponent 2, min 0: fee = (max / 2) * u^2 = 50_000 * 1e-12 = 5e-8
        let price = pay_as_you_go_price(&market(1_000_000), 1).unwrap();
        assert!((price - 5e-8).abs() < 1e-15, "price={price}");
    }

    #[test]
    fn price_grows_with_duration() {
        let m = market(1_000_000);
        let short = pay_as_you_go_price(&m, 1).unwrap();
        let long = pay_as_you_go_price(&m, 100).unwrap();
        assert!(long > short);
        assert_eq!(pay_as_you_go_price(&m, 0).unwrap(), 0.0);
    }

    #[test]
    fn adjusted_utilization_decays() {
        let mut m = market(1_000_000);
        m.state.cpu.utilization = 100.0;
        m.state.cpu.adjusted_utilization = 200.0;
        let at_stamp = m.state.cpu.adjusted_utilization_at(m.observed_at);
        assert!((at_stamp - 200.0).abs() < 1e-9);

        let one_decay_later = m.observed_at + chrono::Duration::seconds(86_400);
        let decayed = m.state.cpu.adjusted_utilization_at(one_decay_later);
        let expected = 100.0 + 100.0 * (-1.0f64).exp();
        assert!((decayed - expected).abs() < 1e-9, "decayed={decayed}");
    }

    #[test]
    fn adjusted_utilization_charges_flat_price_below_it() {
        let mut m = market(1_000_000);
        m.state.cpu.utilization = 0.0;
        m.state.cpu.adjusted_utilization = 1e8;
        // Entire 1000-unit increase sits below the adjusted utilization:
        // price_function(1e8) = 100_000 * 0.1 = 10_000; * 1000 / 1e9 = 0.01
        let price = pay_as_you_go_price(&m, 1).unwrap();
        assert!((price - 0.01).abs() < 1e-12, "price={price}");
    }

    #[test]
    fn malformed_resource_is_rejected() {
        let mut m = market(1_000_000);
        m.state.cpu.weight = 0.0;
        assert_eq!(
            pay_as_you_go_price(&m, 1),
            Err(FormulaError::NonPositive("weight"))
        );

        let mut m = market(1_000_000);
        m.state.cpu.exponent = 0.5;
        assert!(matches!(pay_as_you_go_price(&m, 1), Err(FormulaError::Invalid(_))));

        let m = market(0);
        assert_eq!(
            pay_as_you_go_price(&m, 1),
            Err(FormulaError::NonPositive("sampled usage"))
        );
    }
}
