// Exchange fee calculation from a configured tier table

use std::collections::BTreeMap;

use crate::config::FeeRates;
use crate::error::{SimResult, SimulatorError};
use crate::types::FeeBreakdown;

#[derive(Debug, Clone)]
pub struct FeeCalculator {
    tiers: BTreeMap<String, FeeRates>,
}

impl FeeCalculator {
    pub fn new(tiers: BTreeMap<String, FeeRates>) -> Self {
        Self { tiers }
    }

    /// Blended fee for an order split between maker and taker fills:
    /// value * (maker_fraction * maker_rate + taker_fraction * taker_rate).
    /// Linear in order value; zero value yields zero fee.
    pub fn calculate_fees(
        &self,
        order_value: f64,
        fee_tier: &str,
        maker_fraction: f64,
    ) -> SimResult<FeeBreakdown> {
        let rates = self.tier_details(fee_tier)?;
        let maker_fraction = maker_fraction.clamp(0.0, 1.0);
        let taker_fraction = 1.0 - maker_fraction;

        if order_value <= 0.0 {
            return Ok(FeeBreakdown {
                maker_rate: rates.maker,
                taker_rate: rates.taker,
                ..FeeBreakdown::default()
            });
        }

        let maker_fee = order_value * maker_fraction * rates.maker;
        let taker_fee = order_value * taker_fraction * rates.taker;
        let total = maker_fee + taker_fee;

        Ok(FeeBreakdown {
            maker_rate: rates.maker,
            taker_rate: rates.taker,
            maker_fee,
            taker_fee,
            total,
            effective_rate: total / order_value,
        })
    }

    pub fn tier_details(&self, fee_tier: &str) -> SimResult<FeeRates> {
        self.tiers
            .get(fee_tier)
            .copied()
            .ok_or_else(|| SimulatorError::UnknownTier(fee_tier.to_string()))
    }

    pub fn all_tiers(&self) -> &BTreeMap<String, FeeRates> {
        &self.tiers
    }
}
