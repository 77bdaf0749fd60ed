use crate::config::Settings;
use crate::domain::account::{Amount, ReferralAccount, ReferralEarning};
use crate::domain::ports::ReferralStoreRef;
use crate::error::{PayoutError, Result};
use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, info};

/// Credits referral commissions and reports referral balances.
pub struct ReferralProgram {
    referrals: ReferralStoreRef,
    settings: Settings,
}

impl ReferralProgram {
    pub fn new(referrals: ReferralStoreRef, settings: Settings) -> Self {
        Self {
            referrals,
            settings,
        }
    }

    /// Commission for an order total, rounded to kobo with midpoints away from zero.
    pub fn commission_for(&self, order_total: Amount) -> Result<Amount> {
        let commission = (order_total.value() * self.settings.commission_rate)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        Amount::new(commission).map_err(|_| {
            PayoutError::ValidationError(format!(
                "Order total {order_total} earns no commission"
            ))
        })
    }

    /// Credits the referrer of a completed order.
    ///
    /// Returns `None` when the order was already credited.
    pub async fn credit_purchase(
        &self,
        referrer_id: &str,
        order_id: &str,
        order_total: Decimal,
    ) -> Result<Option<ReferralEarning>> {
        let referrer_id = referrer_id.trim();
        let order_id = order_id.trim();
        if referrer_id.is_empty() || order_id.is_empty() {
            return Err(PayoutError::ValidationError(
                "Referrer and order ids are required".to_string(),
            ));
        }
        let order_total = Amount::new(order_total)?;
        let commission = self.commission_for(order_total)?;

        let earning = ReferralEarning {
            order_id: order_id.to_string(),
            referrer_id: referrer_id.to_string(),
            order_total,
            commission,
            credited_at: Utc::now(),
        };
        if self.referrals.record_earning(earning.clone()).await? {
            info!(referrer_id, order_id, commission = %commission, "referral commission credited");
            Ok(Some(earning))
        } else {
            debug!(order_id, "order already credited");
            Ok(None)
        }
    }

    /// The owner's referral balances; an owner without earnings gets an empty account.
    pub async fn account(&self, owner_id: &str) -> Result<ReferralAccount> {
        Ok(self
            .referrals
            .account(owner_id)
            .await?
            .unwrap_or_else(|| ReferralAccount::new(owner_id)))
    }

    pub async fn earnings(&self, owner_id: &str) -> Result<Vec<ReferralEarning>> {
        self.referrals.earnings(owner_id).await
    }
}
