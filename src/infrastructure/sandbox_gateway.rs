use crate::domain::account::Amount;
use crate::domain::gateway::{GatewayTransferStatus, TransferInit};
use crate::domain::payout::BankDetails;
use crate::domain::ports::PaymentGateway;
use crate::error::{PayoutError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// Behaviour of a [`SandboxGateway`].
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Hold every new transfer until an OTP is finalized.
    pub require_otp: bool,
    /// The only code `finalize_transfer` accepts.
    pub otp_code: String,
    /// Status reported for a released transfer unless overridden per reference.
    pub outcome: GatewayTransferStatus,
    /// Artificial delay added to every call.
    pub latency: Duration,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            require_otp: true,
            otp_code: "123456".to_string(),
            outcome: GatewayTransferStatus::Success,
            latency: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
struct SandboxTransfer {
    awaiting_otp: bool,
    status: Option<GatewayTransferStatus>,
    otp_sends: u32,
}

/// An in-process payment gateway with scriptable outcomes.
///
/// Stands in for the real provider in the CLI and in tests. References are issued as
/// `TRF_sbx_<n>`.
#[derive(Clone, Default)]
pub struct SandboxGateway {
    config: SandboxConfig,
    transfers: Arc<RwLock<HashMap<String, SandboxTransfer>>>,
    next_reference: Arc<AtomicU64>,
    unavailable: Arc<AtomicBool>,
}

impl SandboxGateway {
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Makes every subsequent call fail as if the provider were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Overrides the status reported for one transfer.
    pub async fn set_status(&self, reference: &str, status: GatewayTransferStatus) {
        if let Some(transfer) = self.transfers.write().await.get_mut(reference) {
            transfer.status = Some(status);
        }
    }

    /// Number of transfers created so far.
    pub fn transfers_created(&self) -> u64 {
        self.next_reference.load(Ordering::SeqCst)
    }

    /// How many times an OTP was sent for a transfer (the initial send included).
    pub async fn otp_sends(&self, reference: &str) -> u32 {
        self.transfers
            .read()
            .await
            .get(reference)
            .map_or(0, |t| t.otp_sends)
    }

    async fn round_trip(&self) -> Result<()> {
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PayoutError::GatewayUnavailable(
                "sandbox gateway is offline".to_string(),
            ));
        }
        Ok(())
    }

    fn unknown(reference: &str) -> PayoutError {
        PayoutError::GatewayUnavailable(format!("unknown transfer reference '{reference}'"))
    }
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
    async fn create_transfer(
        &self,
        _bank_details: &BankDetails,
        _amount: Amount,
        _reason: &str,
    ) -> Result<TransferInit> {
        self.round_trip().await?;
        let n = self.next_reference.fetch_add(1, Ordering::SeqCst) + 1;
        let reference = format!("TRF_sbx_{n}");
        let transfer = SandboxTransfer {
            awaiting_otp: self.config.require_otp,
            status: None,
            otp_sends: u32::from(self.config.require_otp),
        };
        self.transfers
            .write()
            .await
            .insert(reference.clone(), transfer);
        Ok(TransferInit {
            reference: Some(reference),
            requires_otp: self.config.require_otp,
        })
    }

    async fn finalize_transfer(&self, reference: &str, otp: &str) -> Result<bool> {
        self.round_trip().await?;
        let mut transfers = self.transfers.write().await;
        let transfer = transfers
            .get_mut(reference)
            .ok_or_else(|| Self::unknown(reference))?;
        if !transfer.awaiting_otp || otp != self.config.otp_code {
            return Ok(false);
        }
        transfer.awaiting_otp = false;
        Ok(true)
    }

    async fn resend_otp(&self, reference: &str) -> Result<()> {
        self.round_trip().await?;
        let mut transfers = self.transfers.write().await;
        let transfer = transfers
            .get_mut(reference)
            .ok_or_else(|| Self::unknown(reference))?;
        transfer.otp_sends += 1;
        Ok(())
    }

    async fn transfer_status(&self, reference: &str) -> Result<GatewayTransferStatus> {
        self.round_trip().await?;
        let transfers = self.transfers.read().await;
        let transfer = transfers
            .get(reference)
            .ok_or_else(|| Self::unknown(reference))?;
        Ok(match (transfer.status, transfer.awaiting_otp) {
            (Some(status), _) => status,
            (None, true) => GatewayTransferStatus::Otp,
            (None, false) => self.config.outcome,
        })
    }
}
