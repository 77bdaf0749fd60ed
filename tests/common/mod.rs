#![allow(dead_code)]

use async_trait::async_trait;
use payout_lifecycle::application::lifecycle::PayoutLifecycle;
use payout_lifecycle::application::referrals::ReferralProgram;
use payout_lifecycle::config::Settings;
use payout_lifecycle::domain::payout::{BankDetails, PayoutRequest};
use payout_lifecycle::domain::ports::{Notifier, PayoutEvent};
use payout_lifecycle::error::{PayoutError, Result};
use payout_lifecycle::infrastructure::in_memory::{InMemoryPayoutStore, InMemoryReferralStore};
use payout_lifecycle::infrastructure::sandbox_gateway::{SandboxConfig, SandboxGateway};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Collects every event it is handed.
#[derive(Default, Clone)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<PayoutEvent>>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<PayoutEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Notifications are delivered off the caller's task; wait until `count` arrived.
    pub async fn wait_for(&self, count: usize) -> Vec<PayoutEvent> {
        for _ in 0..100 {
            let events = self.events();
            if events.len() >= count {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.events()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &PayoutEvent) -> Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// A notifier whose channel is always down.
pub struct BrokenNotifier;

#[async_trait]
impl Notifier for BrokenNotifier {
    async fn notify(&self, _event: &PayoutEvent) -> Result<()> {
        Err(PayoutError::InternalError("mail server unreachable".into()))
    }
}

pub struct Harness {
    pub lifecycle: Arc<PayoutLifecycle>,
    pub referrals: ReferralProgram,
    pub gateway: SandboxGateway,
    pub notifier: RecordingNotifier,
}

impl Harness {
    pub fn new(config: SandboxConfig) -> Self {
        Self::with_settings(config, Settings::default())
    }

    pub fn with_settings(config: SandboxConfig, settings: Settings) -> Self {
        let referral_store = Arc::new(InMemoryReferralStore::new());
        let gateway = SandboxGateway::new(config);
        let notifier = RecordingNotifier::default();
        let lifecycle = PayoutLifecycle::new(
            Arc::new(InMemoryPayoutStore::new()),
            referral_store.clone(),
            Arc::new(gateway.clone()),
            Arc::new(notifier.clone()),
            settings.clone(),
        );
        Self {
            lifecycle: Arc::new(lifecycle),
            referrals: ReferralProgram::new(referral_store, settings),
            gateway,
            notifier,
        }
    }

    /// Sandbox gateway that demands an OTP for every transfer.
    pub fn with_otp() -> Self {
        Self::new(SandboxConfig::default())
    }

    /// Sandbox gateway that releases transfers without an OTP.
    pub fn without_otp() -> Self {
        Self::new(SandboxConfig {
            require_otp: false,
            ..SandboxConfig::default()
        })
    }

    /// Credits `owner` with exactly `earnings` and requests a payout of it.
    pub async fn pending_payout(&self, owner: &str, earnings: Decimal) -> PayoutRequest {
        // Default commission is 5%.
        let order_total = earnings * Decimal::from(20);
        self.referrals
            .credit_purchase(owner, &format!("order-{owner}-{earnings}"), order_total)
            .await
            .unwrap()
            .unwrap();
        self.lifecycle
            .request_payout(owner, bank_details())
            .await
            .unwrap()
    }
}

pub fn bank_details() -> BankDetails {
    BankDetails::new("Ada Obi", "0123456789", "058").unwrap()
}
