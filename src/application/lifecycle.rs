use super::locks::KeyedLocks;
use crate::config::Settings;
use crate::domain::account::{Amount, BalanceAdjustment, ReferralAccount};
use crate::domain::payout::{BankDetails, PayoutId, PayoutRequest, PayoutStatus};
use crate::domain::ports::{
    NotifierRef, PaymentGatewayRef, PayoutEvent, PayoutStoreRef, ReferralStoreRef,
};
use crate::domain::query::{MAX_PAGE_LIMIT, Page, PayoutQuery, PayoutSummary};
use crate::error::{PayoutError, Result};
use chrono::Utc;
use tracing::{debug, error, info, warn};

/// Drives payout requests through their lifecycle.
///
/// Every operation that can change a payout runs under a per-payout lock, and the final
/// write is conditional on the status the operation started from. Gateway calls are
/// bounded by `Settings::gateway_timeout`; when one fails or times out the payout is
/// left exactly as it was.
pub struct PayoutLifecycle {
    payouts: PayoutStoreRef,
    referrals: ReferralStoreRef,
    gateway: PaymentGatewayRef,
    notifier: NotifierRef,
    settings: Settings,
    locks: KeyedLocks<PayoutId>,
}

impl PayoutLifecycle {
    pub fn new(
        payouts: PayoutStoreRef,
        referrals: ReferralStoreRef,
        gateway: PaymentGatewayRef,
        notifier: NotifierRef,
        settings: Settings,
    ) -> Self {
        Self {
            payouts,
            referrals,
            gateway,
            notifier,
            settings,
            locks: KeyedLocks::new(),
        }
    }

    /// Turns the owner's whole available referral balance into a pending payout.
    ///
    /// Fails with `ValidationError` when the balance is below the minimum payout. The
    /// amount stays reserved on the owner's referral account until the payout completes
    /// or is cancelled.
    pub async fn request_payout(
        &self,
        owner_id: &str,
        bank_details: BankDetails,
    ) -> Result<PayoutRequest> {
        let owner_id = owner_id.trim();
        if owner_id.is_empty() {
            return Err(PayoutError::ValidationError(
                "Owner id is required".to_string(),
            ));
        }

        let account = self
            .referrals
            .account(owner_id)
            .await?
            .unwrap_or_else(|| ReferralAccount::new(owner_id));
        let available = account.available.value();
        if available < self.settings.minimum_payout {
            return Err(PayoutError::ValidationError(format!(
                "Available earnings of {} {currency} are below the minimum payout of {} {currency}",
                available,
                self.settings.minimum_payout,
                currency = self.settings.currency,
            )));
        }
        let amount = Amount::new(available)?;

        // A concurrent request for the same owner fails here on insufficient earnings.
        self.referrals
            .adjust(owner_id, BalanceAdjustment::Reserve(amount))
            .await?;

        let payout = PayoutRequest::new(owner_id, amount, bank_details, Utc::now());
        if let Err(e) = self.payouts.insert(payout.clone()).await {
            self.adjust_ledger(&payout, BalanceAdjustment::Release(amount))
                .await;
            return Err(e);
        }

        info!(payout_id = %payout.id, owner_id, amount = %amount, "payout requested");
        self.notify(PayoutEvent::transition(&payout, None));
        Ok(payout)
    }

    /// pending -> processing, or pending -> otp when the gateway holds the transfer.
    pub async fn initiate_transfer(&self, id: PayoutId) -> Result<PayoutRequest> {
        let _guard = self.locks.acquire(&id).await;
        let mut payout = self.load(id).await?;
        if payout.status != PayoutStatus::Pending {
            return Err(PayoutError::AlreadyProcessed(payout.status));
        }

        let init = self
            .call_gateway(
                "create_transfer",
                self.gateway.create_transfer(
                    &payout.bank_details,
                    payout.amount,
                    &self.settings.transfer_reason,
                ),
            )
            .await?;

        let previous = payout.status;
        if let Err(e) = payout.start_transfer(&init, Utc::now()) {
            error!(
                payout_id = %id,
                reference = ?init.reference,
                error = %e,
                "unusable transfer response"
            );
            return Err(e);
        }
        self.commit(payout, previous).await
    }

    /// otp -> processing once the gateway accepts `code`.
    pub async fn submit_otp(&self, id: PayoutId, code: &str) -> Result<PayoutRequest> {
        let _guard = self.locks.acquire(&id).await;
        let mut payout = self.load(id).await?;
        let reference = Self::otp_reference(&payout, "submit an OTP for")?;

        let code = code.trim();
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(PayoutError::ValidationError(
                "OTP must be a non-empty numeric code".to_string(),
            ));
        }

        let accepted = self
            .call_gateway(
                "finalize_transfer",
                self.gateway.finalize_transfer(&reference, code),
            )
            .await?;
        if !accepted {
            warn!(payout_id = %id, "gateway rejected OTP");
            return Err(PayoutError::InvalidCode);
        }

        let previous = payout.status;
        payout.accept_otp(Utc::now())?;
        self.commit(payout, previous).await
    }

    /// Asks the gateway to send the OTP again. The payout itself does not change.
    pub async fn resend_otp(&self, id: PayoutId) -> Result<PayoutRequest> {
        let _guard = self.locks.acquire(&id).await;
        let payout = self.load(id).await?;
        let reference = Self::otp_reference(&payout, "resend an OTP for")?;

        self.call_gateway("resend_otp", self.gateway.resend_otp(&reference))
            .await?;
        info!(payout_id = %id, "OTP resent");
        Ok(payout)
    }

    /// Polls the gateway for a processing payout and applies a terminal outcome.
    ///
    /// Returns the payout untouched when it is not processing or the gateway has not
    /// resolved the transfer.
    pub async fn check_status(&self, id: PayoutId) -> Result<PayoutRequest> {
        let _guard = self.locks.acquire(&id).await;
        let mut payout = self.load(id).await?;
        if payout.status != PayoutStatus::Processing {
            debug!(payout_id = %id, status = %payout.status, "no transfer in flight to poll");
            return Ok(payout);
        }
        let reference = Self::in_flight_reference(&payout)?;

        let status = self
            .call_gateway("transfer_status", self.gateway.transfer_status(&reference))
            .await?;
        let previous = payout.status;
        if !payout.apply_gateway_status(status, Utc::now()) {
            debug!(payout_id = %id, gateway_status = ?status, "transfer not resolved yet");
            return Ok(payout);
        }

        let payout = self.commit(payout, previous).await?;
        if payout.status == PayoutStatus::Completed {
            self.adjust_ledger(&payout, BalanceAdjustment::Settle(payout.amount))
                .await;
        }
        Ok(payout)
    }

    /// pending -> completed for a transfer an administrator made outside the gateway.
    pub async fn mark_manual_complete(
        &self,
        id: PayoutId,
        reference: &str,
    ) -> Result<PayoutRequest> {
        let _guard = self.locks.acquire(&id).await;
        let mut payout = self.load(id).await?;
        let previous = payout.status;
        payout.complete_manually(reference, Utc::now())?;

        let payout = self.commit(payout, previous).await?;
        self.adjust_ledger(&payout, BalanceAdjustment::Settle(payout.amount))
            .await;
        Ok(payout)
    }

    /// failed -> pending.
    pub async fn retry(&self, id: PayoutId) -> Result<PayoutRequest> {
        let _guard = self.locks.acquire(&id).await;
        let mut payout = self.load(id).await?;
        let previous = payout.status;
        payout.reset_for_retry(Utc::now())?;
        self.commit(payout, previous).await
    }

    /// pending | failed -> cancelled, handing the reserved earnings back to the owner.
    pub async fn cancel(&self, id: PayoutId) -> Result<PayoutRequest> {
        let _guard = self.locks.acquire(&id).await;
        let mut payout = self.load(id).await?;
        let previous = payout.status;
        payout.cancel(Utc::now())?;

        let payout = self.commit(payout, previous).await?;
        self.adjust_ledger(&payout, BalanceAdjustment::Release(payout.amount))
            .await;
        Ok(payout)
    }

    pub async fn get(&self, id: PayoutId) -> Result<PayoutRequest> {
        self.load(id).await
    }

    pub async fn list(&self, query: &PayoutQuery) -> Result<Page<PayoutRequest>> {
        self.payouts.query(query).await
    }

    /// Every payout matching `query`, walking all pages.
    pub async fn list_all(&self, query: &PayoutQuery) -> Result<Vec<PayoutRequest>> {
        let mut query = query.clone().page(1, MAX_PAGE_LIMIT);
        let mut payouts = Vec::new();
        loop {
            let page = self.payouts.query(&query).await?;
            let last = page.page >= page.total_pages;
            payouts.extend(page.items);
            if last {
                return Ok(payouts);
            }
            query.page += 1;
        }
    }

    pub async fn summary(&self) -> Result<PayoutSummary> {
        let payouts = self.list_all(&PayoutQuery::default()).await?;
        Ok(PayoutSummary::from_payouts(&payouts))
    }

    async fn load(&self, id: PayoutId) -> Result<PayoutRequest> {
        self.payouts
            .get(id)
            .await?
            .ok_or_else(|| PayoutError::NotFound(format!("payout {id}")))
    }

    fn otp_reference(payout: &PayoutRequest, operation: &'static str) -> Result<String> {
        if payout.status != PayoutStatus::Otp {
            return Err(PayoutError::InvalidState {
                operation,
                status: payout.status,
            });
        }
        Self::in_flight_reference(payout)
    }

    fn in_flight_reference(payout: &PayoutRequest) -> Result<String> {
        payout
            .current_reference()
            .map(str::to_string)
            .ok_or_else(|| {
                PayoutError::InternalError(
                    format!(
                        "payout {} is {} without an open transfer attempt",
                        payout.id, payout.status
                    )
                    .into(),
                )
            })
    }

    /// Persists a transition made from `previous` and announces it.
    async fn commit(
        &self,
        payout: PayoutRequest,
        previous: PayoutStatus,
    ) -> Result<PayoutRequest> {
        debug_assert!(payout.is_consistent());
        self.payouts.update(payout.clone(), previous).await?;
        info!(
            payout_id = %payout.id,
            from = %previous,
            to = %payout.status,
            reference = ?payout.attempts.last().map(|attempt| &attempt.reference),
            "payout transitioned"
        );
        self.notify(PayoutEvent::transition(&payout, Some(previous)));
        Ok(payout)
    }

    async fn call_gateway<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.settings.gateway_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!(operation, error = %e, "payment gateway call failed");
                Err(match e {
                    PayoutError::GatewayUnavailable(message) => {
                        PayoutError::GatewayUnavailable(message)
                    }
                    other => PayoutError::GatewayUnavailable(other.to_string()),
                })
            }
            Err(_) => {
                warn!(operation, "payment gateway call timed out");
                Err(PayoutError::GatewayTimeout(
                    self.settings.gateway_timeout.as_millis(),
                ))
            }
        }
    }

    /// Ledger bookkeeping after a committed transition. The payout record stays
    /// authoritative, so a failure here is logged rather than returned.
    async fn adjust_ledger(&self, payout: &PayoutRequest, adjustment: BalanceAdjustment) {
        if let Err(e) = self.referrals.adjust(&payout.owner_id, adjustment).await {
            error!(
                payout_id = %payout.id,
                owner_id = %payout.owner_id,
                ?adjustment,
                error = %e,
                "referral ledger adjustment failed"
            );
        }
    }

    fn notify(&self, event: PayoutEvent) {
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&event).await {
                warn!(payout_id = %event.payout_id, error = %e, "payout notification failed");
            }
        });
    }
}
