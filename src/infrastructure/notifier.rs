use crate::domain::ports::{Notifier, PayoutEvent};
use crate::error::Result;
use async_trait::async_trait;
use tracing::info;

/// Writes payout status changes to the log instead of emailing the owner.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &PayoutEvent) -> Result<()> {
        info!(
            payout_id = %event.payout_id,
            owner_id = %event.owner_id,
            amount = %event.amount,
            from = ?event.previous,
            to = %event.status,
            "payout status changed"
        );
        Ok(())
    }
}
