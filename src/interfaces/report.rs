use crate::domain::payout::PayoutRequest;
use crate::error::{PayoutError, Result};
use std::io::Write;

/// Writes payouts as JSON lines, one record per line.
pub struct PayoutWriter<W: Write> {
    writer: W,
}

impl<W: Write> PayoutWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_payouts(&mut self, payouts: impl IntoIterator<Item = PayoutRequest>) -> Result<()> {
        for payout in payouts {
            serde_json::to_writer(&mut self.writer, &payout)
                .map_err(|e| PayoutError::InternalError(Box::new(e)))?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
