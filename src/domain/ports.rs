use super::account::{Amount, BalanceAdjustment, ReferralAccount, ReferralEarning};
use super::gateway::{GatewayTransferStatus, TransferInit};
use super::payout::{BankDetails, PayoutId, PayoutRequest, PayoutStatus};
use super::query::{Page, PayoutQuery};
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

#[async_trait]
pub trait PayoutStore: Send + Sync {
    /// Stores a new payout. Fails with `ValidationError` if the id is taken.
    async fn insert(&self, payout: PayoutRequest) -> Result<()>;
    async fn get(&self, id: PayoutId) -> Result<Option<PayoutRequest>>;
    /// Replaces a payout only if its stored status is still `expected`.
    ///
    /// Fails with `NotFound` for unknown ids and `AlreadyProcessed` when another writer
    /// moved the payout first.
    async fn update(&self, payout: PayoutRequest, expected: PayoutStatus) -> Result<()>;
    async fn query(&self, query: &PayoutQuery) -> Result<Page<PayoutRequest>>;
}

#[async_trait]
pub trait ReferralStore: Send + Sync {
    async fn account(&self, owner_id: &str) -> Result<Option<ReferralAccount>>;
    /// Atomically records an earning and credits the referrer.
    ///
    /// Returns `false` without touching anything when the order was already credited.
    async fn record_earning(&self, earning: ReferralEarning) -> Result<bool>;
    /// Atomically applies an adjustment, persisting nothing if it is rejected.
    async fn adjust(
        &self,
        owner_id: &str,
        adjustment: BalanceAdjustment,
    ) -> Result<ReferralAccount>;
    async fn earnings(&self, owner_id: &str) -> Result<Vec<ReferralEarning>>;
}

/// Bank transfer provider.
///
/// Errors returned here are reported by the lifecycle as `GatewayUnavailable`.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_transfer(
        &self,
        bank_details: &BankDetails,
        amount: Amount,
        reason: &str,
    ) -> Result<TransferInit>;
    /// Returns `false` when the gateway rejects the code.
    async fn finalize_transfer(&self, reference: &str, otp: &str) -> Result<bool>;
    async fn resend_otp(&self, reference: &str) -> Result<()>;
    async fn transfer_status(&self, reference: &str) -> Result<GatewayTransferStatus>;
}

/// Emitted after a payout transition has been persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayoutEvent {
    pub payout_id: PayoutId,
    pub owner_id: String,
    pub amount: Amount,
    /// `None` when the payout was just created.
    pub previous: Option<PayoutStatus>,
    pub status: PayoutStatus,
}

impl PayoutEvent {
    pub fn transition(payout: &PayoutRequest, previous: Option<PayoutStatus>) -> Self {
        Self {
            payout_id: payout.id,
            owner_id: payout.owner_id.clone(),
            amount: payout.amount,
            previous,
            status: payout.status,
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &PayoutEvent) -> Result<()>;
}

pub type PayoutStoreRef = Arc<dyn PayoutStore>;
pub type ReferralStoreRef = Arc<dyn ReferralStore>;
pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;
pub type NotifierRef = Arc<dyn Notifier>;
