use crate::error::PayoutError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// Represents a monetary balance in the payout currency.
///
/// Thin wrapper around `rust_decimal::Decimal` so ledger arithmetic cannot be mixed up
/// with arbitrary decimals.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balance(pub Decimal);

/// A strictly positive monetary amount (commissions, payout amounts).
///
/// Deserialization goes through [`Amount::new`], so a stored or submitted zero or
/// negative amount is rejected at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, PayoutError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(PayoutError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PayoutError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl Add for Balance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Balance {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for Balance {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Balance {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

/// A change to a referral account driven by the payout lifecycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BalanceAdjustment {
    /// Earnings set aside for a newly requested payout.
    Reserve(Amount),
    /// A cancelled payout hands its reservation back.
    Release(Amount),
    /// A completed payout turns its reservation into paid-out funds.
    Settle(Amount),
}

/// Referral earnings of a single user.
///
/// `total_earned` always equals `available + reserved + paid_out`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ReferralAccount {
    pub owner_id: String,
    /// Earnings that can be requested as a payout.
    pub available: Balance,
    /// Earnings locked by payouts that have not completed yet.
    pub reserved: Balance,
    /// Earnings already transferred to the user's bank.
    pub paid_out: Balance,
    pub total_earned: Balance,
}

impl ReferralAccount {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            available: Balance::ZERO,
            reserved: Balance::ZERO,
            paid_out: Balance::ZERO,
            total_earned: Balance::ZERO,
        }
    }

    /// Credits a referral commission
    pub fn credit(&mut self, amount: Amount) {
        self.available += amount.into();
        self.total_earned += amount.into();
    }

    /// Moves funds from available to reserved
    pub fn reserve(&mut self, amount: Amount) -> Result<(), PayoutError> {
        let amount = Balance::from(amount);
        if self.available >= amount {
            self.available -= amount;
            self.reserved += amount;
            Ok(())
        } else {
            Err(PayoutError::ValidationError(
                "Insufficient referral earnings".to_string(),
            ))
        }
    }

    /// Moves funds from reserved back to available
    pub fn release(&mut self, amount: Amount) -> Result<(), PayoutError> {
        let amount = Balance::from(amount);
        if self.reserved >= amount {
            self.reserved -= amount;
            self.available += amount;
            Ok(())
        } else {
            Err(PayoutError::ValidationError(
                "Reserved earnings mismatch".to_string(),
            ))
        }
    }

    /// Moves funds from reserved to paid out
    pub fn settle(&mut self, amount: Amount) -> Result<(), PayoutError> {
        let amount = Balance::from(amount);
        if self.reserved >= amount {
            self.reserved -= amount;
            self.paid_out += amount;
            Ok(())
        } else {
            Err(PayoutError::ValidationError(
                "Reserved earnings mismatch".to_string(),
            ))
        }
    }

    pub fn apply(&mut self, adjustment: BalanceAdjustment) -> Result<(), PayoutError> {
        match adjustment {
            BalanceAdjustment::Reserve(amount) => self.reserve(amount),
            BalanceAdjustment::Release(amount) => self.release(amount),
            BalanceAdjustment::Settle(amount) => self.settle(amount),
        }
    }
}

/// A commission credited to a referrer for one qualifying order.
///
/// `order_id` is unique across all earnings; a second credit for the same order is ignored.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ReferralEarning {
    pub order_id: String,
    pub referrer_id: String,
    pub order_total: Amount,
    pub commission: Amount,
    pub credited_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn amount(value: Decimal) -> Amount {
        Amount::new(value).unwrap()
    }

    #[test]
    fn test_balance_arithmetic() {
        let b1 = Balance::new(dec!(10.0));
        let b2 = Balance::new(dec!(5.0));
        assert_eq!(b1 + b2, Balance::new(dec!(15.0)));
        assert_eq!(b1 - b2, Balance::new(dec!(5.0)));
    }

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(1.0)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0.0)),
            Err(PayoutError::ValidationError(_))
        ));
        assert!(matches!(
            Amount::new(dec!(-1.0)),
            Err(PayoutError::ValidationError(_))
        ));
    }

    #[test]
    fn test_amount_deserialization_rejects_non_positive() {
        let ok: Amount = serde_json::from_str("\"250.50\"").unwrap();
        assert_eq!(ok.value(), dec!(250.50));
        assert!(serde_json::from_str::<Amount>("\"0\"").is_err());
    }

    #[test]
    fn test_account_credit() {
        let mut account = ReferralAccount::new("user-1");
        account.credit(amount(dec!(10.0)));
        assert_eq!(account.available, Balance::new(dec!(10.0)));
        assert_eq!(account.total_earned, Balance::new(dec!(10.0)));
    }

    #[test]
    fn test_account_reserve_success() {
        let mut account = ReferralAccount::new("user-1");
        account.credit(amount(dec!(10.0)));

        account.reserve(amount(dec!(4.0))).unwrap();
        assert_eq!(account.available, Balance::new(dec!(6.0)));
        assert_eq!(account.reserved, Balance::new(dec!(4.0)));
        assert_eq!(account.total_earned, Balance::new(dec!(10.0)));
    }

    #[test]
    fn test_account_reserve_insufficient() {
        let mut account = ReferralAccount::new("user-1");
        account.credit(amount(dec!(10.0)));

        let result = account.reserve(amount(dec!(20.0)));
        assert!(matches!(result, Err(PayoutError::ValidationError(_))));
        assert_eq!(account.available, Balance::new(dec!(10.0)));
        assert_eq!(account.reserved, Balance::ZERO);
    }

    #[test]
    fn test_account_release() {
        let mut account = ReferralAccount::new("user-1");
        account.credit(amount(dec!(10.0)));
        account.reserve(amount(dec!(10.0))).unwrap();

        account.release(amount(dec!(10.0))).unwrap();
        assert_eq!(account.available, Balance::new(dec!(10.0)));
        assert_eq!(account.reserved, Balance::ZERO);
    }

    #[test]
    fn test_account_settle() {
        let mut account = ReferralAccount::new("user-1");
        account.credit(amount(dec!(10.0)));
        account.reserve(amount(dec!(10.0))).unwrap();

        account
            .apply(BalanceAdjustment::Settle(amount(dec!(10.0))))
            .unwrap();
        assert_eq!(account.available, Balance::ZERO);
        assert_eq!(account.reserved, Balance::ZERO);
        assert_eq!(account.paid_out, Balance::new(dec!(10.0)));
        assert_eq!(account.total_earned, Balance::new(dec!(10.0)));
    }

    #[test]
    fn test_account_settle_more_than_reserved() {
        let mut account = ReferralAccount::new("user-1");
        account.credit(amount(dec!(10.0)));
        account.reserve(amount(dec!(5.0))).unwrap();

        let result = account.settle(amount(dec!(6.0)));
        assert!(matches!(result, Err(PayoutError::ValidationError(_))));
        assert_eq!(account.reserved, Balance::new(dec!(5.0)));
        assert_eq!(account.paid_out, Balance::ZERO);
    }
}
