use std::env;

use anyhow::anyhow;
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Percentage the platform keeps from each order. Absorbed by the
    /// merchant at payout, never added to the customer total.
    pub platform_fee_percent: Decimal,
    /// Bound on re-running a read-modify-write cycle after a version
    /// conflict before surfacing the failure.
    pub max_conflict_retries: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            platform_fee_percent: Decimal::from(2),
            max_conflict_retries: 3,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let platform_fee_percent = match env::var("PLATFORM_FEE_PERCENT") {
            Ok(raw) => raw
                .parse::<Decimal>()
                .map_err(|e| anyhow!("PLATFORM_FEE_PERCENT: {e}"))?,
            Err(_) => defaults.platform_fee_percent,
        };
        let max_conflict_retries = match env::var("ORDER_CONFLICT_RETRIES") {
            Ok(raw) => raw
                .parse::<u32>()
                .map_err(|e| anyhow!("ORDER_CONFLICT_RETRIES: {e}"))?,
            Err(_) => defaults.max_conflict_retries,
        };
        Ok(Self {
            platform_fee_percent,
            max_conflict_retries,
        })
    }
}
