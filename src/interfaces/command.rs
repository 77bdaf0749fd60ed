use super::csv::command_reader::CommandRecord;
use crate::domain::payout::BankDetails;
use crate::error::{PayoutError, Result};
use rust_decimal::Decimal;

/// A validated operator command.
///
/// Payouts are addressed by a handle: either an alias given to the payout by a
/// `request` row earlier in the same batch, or the payout's id.
#[derive(Debug, Clone, PartialEq)]
pub enum PayoutCommand {
    Credit {
        referrer: String,
        order: String,
        total: Decimal,
    },
    Request {
        owner: String,
        alias: String,
        bank_details: BankDetails,
    },
    Initiate {
        payout: String,
    },
    SubmitOtp {
        payout: String,
        code: String,
    },
    ResendOtp {
        payout: String,
    },
    CheckStatus {
        payout: String,
    },
    ManualComplete {
        payout: String,
        reference: String,
    },
    Retry {
        payout: String,
    },
    Cancel {
        payout: String,
    },
}

fn required(value: Option<String>, column: &str, op: &str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| PayoutError::ValidationError(format!("'{op}' requires the {column} column")))
}

impl TryFrom<CommandRecord> for PayoutCommand {
    type Error = PayoutError;

    fn try_from(record: CommandRecord) -> Result<Self> {
        let op = record.op.to_ascii_lowercase();
        let payout = || required(record.payout.clone(), "payout", &op);

        let command = match op.as_str() {
            "credit" => Self::Credit {
                referrer: required(record.owner, "owner", &op)?,
                order: required(record.order, "order", &op)?,
                total: record.amount.ok_or_else(|| {
                    PayoutError::ValidationError("'credit' requires the amount column".to_string())
                })?,
            },
            "request" => Self::Request {
                alias: payout()?,
                owner: required(record.owner, "owner", &op)?,
                bank_details: BankDetails::new(
                    required(record.account_name, "account_name", &op)?,
                    required(record.account_number, "account_number", &op)?,
                    required(record.bank_code, "bank_code", &op)?,
                )?,
            },
            "initiate" => Self::Initiate { payout: payout()? },
            "otp" => Self::SubmitOtp {
                payout: payout()?,
                code: required(record.code, "code", &op)?,
            },
            "resend" => Self::ResendOtp { payout: payout()? },
            "check" => Self::CheckStatus { payout: payout()? },
            "complete" => Self::ManualComplete {
                payout: payout()?,
                reference: required(record.reference, "reference", &op)?,
            },
            "retry" => Self::Retry { payout: payout()? },
            "cancel" => Self::Cancel { payout: payout()? },
            other => {
                return Err(PayoutError::ValidationError(format!(
                    "Unknown operation '{other}'"
                )));
            }
        };
        Ok(command)
    }
}
