use super::command::PayoutCommand;
use crate::application::lifecycle::PayoutLifecycle;
use crate::application::referrals::ReferralProgram;
use crate::domain::payout::{PayoutId, PayoutRequest};
use crate::error::Result;
use std::collections::HashMap;
use tracing::debug;

/// What a command did, for logging by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Credited { order: String, applied: bool },
    Payout(PayoutRequest),
}

/// Executes operator commands in order against the payout services.
///
/// Keeps the aliases that `request` rows give to the payouts they create, so later rows
/// of the same batch can address them.
pub struct BatchRunner<'a> {
    lifecycle: &'a PayoutLifecycle,
    referrals: &'a ReferralProgram,
    aliases: HashMap<String, PayoutId>,
}

impl<'a> BatchRunner<'a> {
    pub fn new(lifecycle: &'a PayoutLifecycle, referrals: &'a ReferralProgram) -> Self {
        Self {
            lifecycle,
            referrals,
            aliases: HashMap::new(),
        }
    }

    fn resolve(&self, handle: &str) -> Result<PayoutId> {
        match self.aliases.get(handle) {
            Some(id) => Ok(*id),
            None => handle.parse(),
        }
    }

    pub async fn execute(&mut self, command: PayoutCommand) -> Result<Outcome> {
        debug!(?command, "executing command");
        let payout = match command {
            PayoutCommand::Credit {
                referrer,
                order,
                total,
            } => {
                let applied = self
                    .referrals
                    .credit_purchase(&referrer, &order, total)
                    .await?
                    .is_some();
                return Ok(Outcome::Credited { order, applied });
            }
            PayoutCommand::Request {
                owner,
                alias,
                bank_details,
            } => {
                let payout = self.lifecycle.request_payout(&owner, bank_details).await?;
                self.aliases.insert(alias, payout.id);
                payout
            }
            PayoutCommand::Initiate { payout } => {
                self.lifecycle
                    .initiate_transfer(self.resolve(&payout)?)
                    .await?
            }
            PayoutCommand::SubmitOtp { payout, code } => {
                self.lifecycle
                    .submit_otp(self.resolve(&payout)?, &code)
                    .await?
            }
            PayoutCommand::ResendOtp { payout } => {
                self.lifecycle.resend_otp(self.resolve(&payout)?).await?
            }
            PayoutCommand::CheckStatus { payout } => {
                self.lifecycle.check_status(self.resolve(&payout)?).await?
            }
            PayoutCommand::ManualComplete { payout, reference } => {
                self.lifecycle
                    .mark_manual_complete(self.resolve(&payout)?, &reference)
                    .await?
            }
            PayoutCommand::Retry { payout } => self.lifecycle.retry(self.resolve(&payout)?).await?,
            PayoutCommand::Cancel { payout } => {
                self.lifecycle.cancel(self.resolve(&payout)?).await?
            }
        };
        Ok(Outcome::Payout(payout))
    }
}
