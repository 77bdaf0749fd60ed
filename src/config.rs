use crate::error::{PayoutError, Result};
use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;

/// Business and integration settings for the payout services.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Smallest balance a user may withdraw.
    pub minimum_payout: Decimal,
    /// Share of a referred order's total credited to the referrer.
    pub commission_rate: Decimal,
    /// Upper bound for every payment gateway round trip.
    pub gateway_timeout: Duration,
    pub currency: String,
    /// Narration attached to gateway transfers.
    pub transfer_reason: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            minimum_payout: dec!(5000),
            commission_rate: dec!(0.05),
            gateway_timeout: Duration::from_secs(10),
            currency: "NGN".to_string(),
            transfer_reason: "Referral earnings payout".to_string(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.minimum_payout <= Decimal::ZERO {
            return Err(PayoutError::ValidationError(
                "Minimum payout must be positive".to_string(),
            ));
        }
        if self.commission_rate <= Decimal::ZERO || self.commission_rate > Decimal::ONE {
            return Err(PayoutError::ValidationError(
                "Commission rate must be in (0, 1]".to_string(),
            ));
        }
        if self.gateway_timeout.is_zero() {
            return Err(PayoutError::ValidationError(
                "Gateway timeout must be positive".to_string(),
            ));
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(PayoutError::ValidationError(format!(
                "Invalid currency code '{}'",
                self.currency
            )));
        }
        Ok(())
    }
}

/// Command-line view of [`Settings`]; every flag falls back to an environment variable.
#[derive(Args, Debug, Clone)]
pub struct SettingsArgs {
    /// Minimum referral balance that can be paid out
    #[arg(long, env = "PAYOUT_MIN_AMOUNT", default_value = "5000")]
    pub min_payout: Decimal,

    /// Commission credited per referred order, as a fraction of the order total
    #[arg(long, env = "PAYOUT_COMMISSION_RATE", default_value = "0.05")]
    pub commission_rate: Decimal,

    /// Payment gateway timeout in milliseconds
    #[arg(long, env = "PAYOUT_GATEWAY_TIMEOUT_MS", default_value_t = 10_000)]
    pub gateway_timeout_ms: u64,

    /// ISO currency code of payouts
    #[arg(long, env = "PAYOUT_CURRENCY", default_value = "NGN")]
    pub currency: String,
}

impl SettingsArgs {
    pub fn into_settings(self) -> Result<Settings> {
        let settings = Settings {
            minimum_payout: self.min_payout,
            commission_rate: self.commission_rate,
            gateway_timeout: Duration::from_millis(self.gateway_timeout_ms),
            currency: self.currency.trim().to_ascii_uppercase(),
            ..Settings::default()
        };
        settings.validate()?;
        Ok(settings)
    }
}
