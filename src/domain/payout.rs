use super::account::Amount;
use super::gateway::{GatewayTransferStatus, TransferInit};
use crate::error::{PayoutError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque payout identifier, assigned at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayoutId(Uuid);

impl PayoutId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for PayoutId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for PayoutId {
    type Err = PayoutError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| PayoutError::ValidationError(format!("Invalid payout id '{s}': {e}")))
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
    Pending,
    Processing,
    Otp,
    Completed,
    Failed,
    Cancelled,
}

impl PayoutStatus {
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Processing,
        Self::Otp,
        Self::Completed,
        Self::Failed,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Otp => "otp",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayoutStatus {
    type Err = PayoutError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| PayoutError::ValidationError(format!("Unknown payout status '{s}'")))
    }
}

/// Mirror of the gateway's view of the transfer.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Success,
    Failed,
}

/// Destination account, snapshotted when the payout is requested.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct BankDetails {
    pub account_name: String,
    pub account_number: String,
    pub bank_code: String,
}

impl BankDetails {
    /// Validates and trims the destination account fields.
    ///
    /// Account numbers are 10-digit NUBANs; bank codes are numeric.
    pub fn new(
        account_name: impl Into<String>,
        account_number: impl Into<String>,
        bank_code: impl Into<String>,
    ) -> Result<Self> {
        let account_name = account_name.into().trim().to_string();
        let account_number = account_number.into().trim().to_string();
        let bank_code = bank_code.into().trim().to_string();

        if account_name.is_empty() {
            return Err(PayoutError::ValidationError(
                "Account name is required".to_string(),
            ));
        }
        if account_number.len() != 10 || !account_number.chars().all(|c| c.is_ascii_digit()) {
            return Err(PayoutError::ValidationError(
                "Account number must be 10 digits".to_string(),
            ));
        }
        if bank_code.is_empty() || !bank_code.chars().all(|c| c.is_ascii_digit()) {
            return Err(PayoutError::ValidationError(
                "Bank code must be numeric".to_string(),
            ));
        }

        Ok(Self {
            account_name,
            account_number,
            bank_code,
        })
    }
}

/// One `create_transfer` call that the gateway accepted, and what became of it.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TransferAttempt {
    pub reference: String,
    pub payment_status: PaymentStatus,
    pub started_at: DateTime<Utc>,
    /// Set once the gateway reported a terminal outcome.
    pub closed_at: Option<DateTime<Utc>>,
}

/// A request to disburse referral earnings to a bank account.
///
/// Mutated only through the transition methods below; each one checks the current
/// status and leaves the record untouched when it returns an error.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PayoutRequest {
    pub id: PayoutId,
    pub owner_id: String,
    pub amount: Amount,
    pub bank_details: BankDetails,
    pub status: PayoutStatus,
    pub payment_status: PaymentStatus,
    /// Reference of the first transfer attempt. Never changes once set.
    pub paystack_reference: Option<String>,
    pub manual_reference: Option<String>,
    /// Every transfer attempt, oldest first.
    #[serde(default)]
    pub attempts: Vec<TransferAttempt>,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl PayoutRequest {
    pub fn new(
        owner_id: impl Into<String>,
        amount: Amount,
        bank_details: BankDetails,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PayoutId::new(),
            owner_id: owner_id.into(),
            amount,
            bank_details,
            status: PayoutStatus::Pending,
            payment_status: PaymentStatus::Pending,
            paystack_reference: None,
            manual_reference: None,
            attempts: Vec::new(),
            requested_at: now,
            processed_at: None,
            updated_at: now,
        }
    }

    /// Reference of the transfer in flight, if any.
    pub fn current_reference(&self) -> Option<&str> {
        self.attempts
            .last()
            .filter(|attempt| attempt.closed_at.is_none())
            .map(|attempt| attempt.reference.as_str())
    }

    fn current_attempt_mut(&mut self) -> Option<&mut TransferAttempt> {
        self.attempts
            .last_mut()
            .filter(|attempt| attempt.closed_at.is_none())
    }

    /// Whether `status`, `payment_status`, `processed_at` and the attempt history agree.
    pub fn is_consistent(&self) -> bool {
        let payment_ok = match self.status {
            PayoutStatus::Pending | PayoutStatus::Otp => {
                self.payment_status == PaymentStatus::Pending
            }
            PayoutStatus::Processing => self.payment_status == PaymentStatus::Processing,
            PayoutStatus::Completed => self.payment_status == PaymentStatus::Success,
            PayoutStatus::Failed => self.payment_status == PaymentStatus::Failed,
            PayoutStatus::Cancelled => matches!(
                self.payment_status,
                PaymentStatus::Pending | PaymentStatus::Failed
            ),
        };
        let processed_ok = match self.status {
            PayoutStatus::Completed | PayoutStatus::Failed => self.processed_at.is_some(),
            PayoutStatus::Pending | PayoutStatus::Otp | PayoutStatus::Processing => {
                self.processed_at.is_none()
            }
            PayoutStatus::Cancelled => true,
        };
        let in_flight = matches!(self.status, PayoutStatus::Otp | PayoutStatus::Processing);
        let attempt_ok = in_flight == self.current_reference().is_some();
        let reference_ok = self.paystack_reference.as_deref()
            == self.attempts.first().map(|attempt| attempt.reference.as_str());
        payment_ok && processed_ok && attempt_ok && reference_ok
    }

    fn expect_status(&self, expected: PayoutStatus, operation: &'static str) -> Result<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(PayoutError::InvalidState {
                operation,
                status: self.status,
            })
        }
    }

    /// Applies the result of a successful `create_transfer` call and opens a new attempt.
    ///
    /// pending -> otp when the gateway holds the transfer for an OTP,
    /// pending -> processing otherwise. A response without a reference cannot be
    /// tracked and is rejected as `GatewayUnavailable`.
    pub fn start_transfer(&mut self, init: &TransferInit, now: DateTime<Utc>) -> Result<()> {
        if self.status != PayoutStatus::Pending {
            return Err(PayoutError::AlreadyProcessed(self.status));
        }
        let reference = init
            .reference
            .as_deref()
            .map(str::trim)
            .filter(|reference| !reference.is_empty())
            .ok_or_else(|| {
                PayoutError::GatewayUnavailable(
                    "gateway accepted a transfer without a reference".to_string(),
                )
            })?;

        let (status, payment_status) = if init.requires_otp {
            (PayoutStatus::Otp, PaymentStatus::Pending)
        } else {
            (PayoutStatus::Processing, PaymentStatus::Processing)
        };
        if self.paystack_reference.is_none() {
            self.paystack_reference = Some(reference.to_string());
        }
        self.attempts.push(TransferAttempt {
            reference: reference.to_string(),
            payment_status,
            started_at: now,
            closed_at: None,
        });
        self.status = status;
        self.payment_status = payment_status;
        self.updated_at = now;
        Ok(())
    }

    /// otp -> processing once the gateway accepted the code.
    pub fn accept_otp(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.expect_status(PayoutStatus::Otp, "submit an OTP for")?;
        self.status = PayoutStatus::Processing;
        self.payment_status = PaymentStatus::Processing;
        if let Some(attempt) = self.current_attempt_mut() {
            attempt.payment_status = PaymentStatus::Processing;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Folds a polled gateway status into the payout. Returns whether anything changed.
    ///
    /// Only a `processing` payout reacts; terminal gateway outcomes move it to
    /// `completed` or `failed` and close the current attempt.
    pub fn apply_gateway_status(
        &mut self,
        status: GatewayTransferStatus,
        now: DateTime<Utc>,
    ) -> bool {
        if self.status != PayoutStatus::Processing {
            return false;
        }
        let (status, payment_status) = match status {
            GatewayTransferStatus::Success => (PayoutStatus::Completed, PaymentStatus::Success),
            GatewayTransferStatus::Failed | GatewayTransferStatus::Reversed => {
                (PayoutStatus::Failed, PaymentStatus::Failed)
            }
            GatewayTransferStatus::Pending | GatewayTransferStatus::Otp => return false,
        };
        self.status = status;
        self.payment_status = payment_status;
        if let Some(attempt) = self.current_attempt_mut() {
            attempt.payment_status = payment_status;
            attempt.closed_at = Some(now);
        }
        self.processed_at = Some(now);
        self.updated_at = now;
        true
    }

    /// pending -> completed for transfers made outside the gateway.
    pub fn complete_manually(&mut self, reference: &str, now: DateTime<Utc>) -> Result<()> {
        self.expect_status(PayoutStatus::Pending, "manually complete")?;
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(PayoutError::ValidationError(
                "Manual reference is required".to_string(),
            ));
        }
        self.manual_reference = Some(reference.to_string());
        self.status = PayoutStatus::Completed;
        self.payment_status = PaymentStatus::Success;
        self.processed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// failed -> pending.
    ///
    /// The failed attempt stays on record; the next `start_transfer` opens another one
    /// while `paystack_reference` keeps the first attempt's reference.
    pub fn reset_for_retry(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.expect_status(PayoutStatus::Failed, "retry")?;
        self.status = PayoutStatus::Pending;
        self.payment_status = PaymentStatus::Pending;
        self.processed_at = None;
        self.updated_at = now;
        Ok(())
    }

    /// pending | failed -> cancelled.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<()> {
        if !matches!(self.status, PayoutStatus::Pending | PayoutStatus::Failed) {
            return Err(PayoutError::InvalidState {
                operation: "cancel",
                status: self.status,
            });
        }
        self.status = PayoutStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn payout() -> PayoutRequest {
        PayoutRequest::new(
            "user-1",
            Amount::new(dec!(500000)).unwrap(),
            BankDetails::new("Ada Obi", "0123456789", "058").unwrap(),
            Utc::now(),
        )
    }

    fn otp_init(reference: &str) -> TransferInit {
        TransferInit {
            reference: Some(reference.to_string()),
            requires_otp: true,
        }
    }

    #[test]
    fn test_new_payout_is_pending_and_consistent() {
        let payout = payout();
        assert_eq!(payout.status, PayoutStatus::Pending);
        assert_eq!(payout.payment_status, PaymentStatus::Pending);
        assert!(payout.paystack_reference.is_none());
        assert!(payout.is_consistent());
    }

    #[test]
    fn test_bank_details_validation() {
        assert!(BankDetails::new(" Ada ", "0123456789", "058").is_ok());
        assert!(matches!(
            BankDetails::new("", "0123456789", "058"),
            Err(PayoutError::ValidationError(_))
        ));
        assert!(matches!(
            BankDetails::new("Ada", "12345", "058"),
            Err(PayoutError::ValidationError(_))
        ));
        assert!(matches!(
            BankDetails::new("Ada", "01234567ab", "058"),
            Err(PayoutError::ValidationError(_))
        ));
        assert!(matches!(
            BankDetails::new("Ada", "0123456789", "GTB"),
            Err(PayoutError::ValidationError(_))
        ));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("OTP".parse::<PayoutStatus>().unwrap(), PayoutStatus::Otp);
        assert_eq!(
            "completed".parse::<PayoutStatus>().unwrap(),
            PayoutStatus::Completed
        );
        assert!("done".parse::<PayoutStatus>().is_err());
    }

    #[test]
    fn test_start_transfer_with_otp() {
        let mut payout = payout();
        payout.start_transfer(&otp_init("TRF_1"), Utc::now()).unwrap();
        assert_eq!(payout.status, PayoutStatus::Otp);
        assert_eq!(payout.payment_status, PaymentStatus::Pending);
        assert_eq!(payout.paystack_reference.as_deref(), Some("TRF_1"));
        assert_eq!(payout.current_reference(), Some("TRF_1"));
        assert!(payout.is_consistent());
    }

    #[test]
    fn test_start_transfer_without_otp() {
        let mut payout = payout();
        let init = TransferInit {
            reference: Some("TRF_2".to_string()),
            requires_otp: false,
        };
        payout.start_transfer(&init, Utc::now()).unwrap();
        assert_eq!(payout.status, PayoutStatus::Processing);
        assert_eq!(payout.payment_status, PaymentStatus::Processing);
        assert!(payout.is_consistent());
    }

    #[test]
    fn test_start_transfer_otp_without_reference_leaves_payout_untouched() {
        let mut payout = payout();
        let before = payout.clone();
        let init = TransferInit {
            reference: None,
            requires_otp: true,
        };
        assert!(matches!(
            payout.start_transfer(&init, Utc::now()),
            Err(PayoutError::GatewayUnavailable(_))
        ));
        assert_eq!(payout, before);
    }

    #[test]
    fn test_start_transfer_twice_is_already_processed() {
        let mut payout = payout();
        payout.start_transfer(&otp_init("TRF_1"), Utc::now()).unwrap();
        let before = payout.clone();
        assert!(matches!(
            payout.start_transfer(&otp_init("TRF_9"), Utc::now()),
            Err(PayoutError::AlreadyProcessed(PayoutStatus::Otp))
        ));
        assert_eq!(payout, before);
    }

    #[test]
    fn test_start_transfer_without_reference_leaves_payout_untouched() {
        let mut payout = payout();
        let before = payout.clone();
        for reference in [None, Some("  ".to_string())] {
            let init = TransferInit {
                reference,
                requires_otp: false,
            };
            assert!(matches!(
                payout.start_transfer(&init, Utc::now()),
                Err(PayoutError::GatewayUnavailable(_))
            ));
        }
        assert_eq!(payout, before);
    }

    #[test]
    fn test_gateway_status_only_moves_processing_payouts() {
        let mut payout = payout();
        assert!(!payout.apply_gateway_status(GatewayTransferStatus::Success, Utc::now()));
        assert_eq!(payout.status, PayoutStatus::Pending);

        payout.start_transfer(&otp_init("TRF_1"), Utc::now()).unwrap();
        assert!(!payout.apply_gateway_status(GatewayTransferStatus::Success, Utc::now()));
        assert_eq!(payout.status, PayoutStatus::Otp);

        payout.accept_otp(Utc::now()).unwrap();
        assert!(!payout.apply_gateway_status(GatewayTransferStatus::Pending, Utc::now()));
        assert!(payout.apply_gateway_status(GatewayTransferStatus::Success, Utc::now()));
        assert_eq!(payout.status, PayoutStatus::Completed);
        assert_eq!(payout.payment_status, PaymentStatus::Success);
        assert!(payout.processed_at.is_some());
        assert!(payout.is_consistent());
    }

    #[test]
    fn test_reversed_transfer_fails_payout() {
        let mut payout = payout();
        payout
            .start_transfer(
                &TransferInit {
                    reference: Some("TRF_1".into()),
                    requires_otp: false,
                },
                Utc::now(),
            )
            .unwrap();
        assert!(payout.apply_gateway_status(GatewayTransferStatus::Reversed, Utc::now()));
        assert_eq!(payout.status, PayoutStatus::Failed);
        assert_eq!(payout.payment_status, PaymentStatus::Failed);
        assert!(payout.is_consistent());
    }

    #[test]
    fn test_manual_completion() {
        let mut payout = payout();
        assert!(matches!(
            payout.complete_manually("  ", Utc::now()),
            Err(PayoutError::ValidationError(_))
        ));
        assert_eq!(payout.status, PayoutStatus::Pending);

        payout.complete_manually("BANK-REF-77", Utc::now()).unwrap();
        assert_eq!(payout.status, PayoutStatus::Completed);
        assert_eq!(payout.payment_status, PaymentStatus::Success);
        assert_eq!(payout.manual_reference.as_deref(), Some("BANK-REF-77"));
        assert!(payout.is_consistent());

        assert!(matches!(
            payout.complete_manually("again", Utc::now()),
            Err(PayoutError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_retry_keeps_first_reference_and_opens_new_attempt() {
        let mut payout = payout();
        let init = |reference: &str| TransferInit {
            reference: Some(reference.into()),
            requires_otp: false,
        };
        payout.start_transfer(&init("TRF_1"), Utc::now()).unwrap();
        payout.apply_gateway_status(GatewayTransferStatus::Failed, Utc::now());
        assert!(payout.current_reference().is_none());
        assert_eq!(payout.attempts[0].payment_status, PaymentStatus::Failed);
        assert!(payout.attempts[0].closed_at.is_some());

        payout.reset_for_retry(Utc::now()).unwrap();
        assert_eq!(payout.status, PayoutStatus::Pending);
        assert_eq!(payout.payment_status, PaymentStatus::Pending);
        assert!(payout.processed_at.is_none());
        assert_eq!(payout.paystack_reference.as_deref(), Some("TRF_1"));
        assert!(payout.is_consistent());

        payout.start_transfer(&init("TRF_2"), Utc::now()).unwrap();
        assert_eq!(payout.paystack_reference.as_deref(), Some("TRF_1"));
        assert_eq!(payout.current_reference(), Some("TRF_2"));
        assert_eq!(payout.attempts.len(), 2);
        assert!(payout.is_consistent());

        payout.apply_gateway_status(GatewayTransferStatus::Success, Utc::now());
        assert_eq!(payout.attempts[1].payment_status, PaymentStatus::Success);
        assert_eq!(payout.paystack_reference.as_deref(), Some("TRF_1"));
        assert!(payout.is_consistent());
    }

    #[test]
    fn test_retry_on_pending_is_invalid_state() {
        let mut payout = payout();
        assert!(matches!(
            payout.reset_for_retry(Utc::now()),
            Err(PayoutError::InvalidState {
                status: PayoutStatus::Pending,
                ..
            })
        ));
    }

    #[test]
    fn test_cancel() {
        let mut payout = payout();
        payout.cancel(Utc::now()).unwrap();
        assert_eq!(payout.status, PayoutStatus::Cancelled);
        assert!(payout.is_consistent());
        assert!(payout.cancel(Utc::now()).is_err());
    }
}
