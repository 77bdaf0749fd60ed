use crate::domain::account::{BalanceAdjustment, ReferralAccount, ReferralEarning};
use crate::domain::payout::{PayoutId, PayoutRequest, PayoutStatus};
use crate::domain::ports::{PayoutStore, ReferralStore};
use crate::domain::query::{Page, PayoutQuery};
use crate::error::{PayoutError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for payout requests.
///
/// The write lock is held across the status comparison in `update`, which makes the
/// conditional write atomic.
#[derive(Default, Clone)]
pub struct InMemoryPayoutStore {
    payouts: Arc<RwLock<HashMap<PayoutId, PayoutRequest>>>,
}

impl InMemoryPayoutStore {
    /// Creates a new, empty in-memory payout store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PayoutStore for InMemoryPayoutStore {
    async fn insert(&self, payout: PayoutRequest) -> Result<()> {
        let mut payouts = self.payouts.write().await;
        if payouts.contains_key(&payout.id) {
            return Err(PayoutError::ValidationError(format!(
                "Payout {} already exists",
                payout.id
            )));
        }
        payouts.insert(payout.id, payout);
        Ok(())
    }

    async fn get(&self, id: PayoutId) -> Result<Option<PayoutRequest>> {
        let payouts = self.payouts.read().await;
        Ok(payouts.get(&id).cloned())
    }

    async fn update(&self, payout: PayoutRequest, expected: PayoutStatus) -> Result<()> {
        let mut payouts = self.payouts.write().await;
        let current = payouts
            .get_mut(&payout.id)
            .ok_or_else(|| PayoutError::NotFound(format!("payout {}", payout.id)))?;
        if current.status != expected {
            return Err(PayoutError::AlreadyProcessed(current.status));
        }
        *current = payout;
        Ok(())
    }

    async fn query(&self, query: &PayoutQuery) -> Result<Page<PayoutRequest>> {
        let payouts = self.payouts.read().await;
        Ok(query.apply(payouts.values().cloned()))
    }
}

#[derive(Default)]
struct ReferralLedger {
    accounts: HashMap<String, ReferralAccount>,
    earnings: HashMap<String, ReferralEarning>,
}

/// A thread-safe in-memory store for referral accounts and their earnings.
///
/// Accounts and earnings share one lock so crediting an order is a single atomic step.
#[derive(Default, Clone)]
pub struct InMemoryReferralStore {
    ledger: Arc<RwLock<ReferralLedger>>,
}

impl InMemoryReferralStore {
    /// Creates a new, empty in-memory referral store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReferralStore for InMemoryReferralStore {
    async fn account(&self, owner_id: &str) -> Result<Option<ReferralAccount>> {
        let ledger = self.ledger.read().await;
        Ok(ledger.accounts.get(owner_id).cloned())
    }

    async fn record_earning(&self, earning: ReferralEarning) -> Result<bool> {
        let mut ledger = self.ledger.write().await;
        // Ignore duplicate order IDs
        if ledger.earnings.contains_key(&earning.order_id) {
            return Ok(false);
        }
        ledger
            .accounts
            .entry(earning.referrer_id.clone())
            .or_insert_with(|| ReferralAccount::new(earning.referrer_id.clone()))
            .credit(earning.commission);
        ledger.earnings.insert(earning.order_id.clone(), earning);
        Ok(true)
    }

    async fn adjust(
        &self,
        owner_id: &str,
        adjustment: BalanceAdjustment,
    ) -> Result<ReferralAccount> {
        let mut ledger = self.ledger.write().await;
        let mut account = ledger
            .accounts
            .get(owner_id)
            .cloned()
            .unwrap_or_else(|| ReferralAccount::new(owner_id));
        account.apply(adjustment)?;
        ledger
            .accounts
            .insert(owner_id.to_string(), account.clone());
        Ok(account)
    }

    async fn earnings(&self, owner_id: &str) -> Result<Vec<ReferralEarning>> {
        let ledger = self.ledger.read().await;
        let mut earnings: Vec<ReferralEarning> = ledger
            .earnings
            .values()
            .filter(|e| e.referrer_id == owner_id)
            .cloned()
            .collect();
        earnings.sort_by(|a, b| a.credited_at.cmp(&b.credited_at));
        Ok(earnings)
    }
}
