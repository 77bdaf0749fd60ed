use crate::error::{PayoutError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One raw row of an operator command batch.
///
/// Only `op` is mandatory; which other columns matter depends on the operation and is
/// checked when the row is turned into a `PayoutCommand`.
#[derive(Debug, Deserialize, PartialEq, Clone, Default)]
#[serde(default)]
pub struct CommandRecord {
    pub op: String,
    pub owner: Option<String>,
    pub payout: Option<String>,
    pub amount: Option<Decimal>,
    pub order: Option<String>,
    pub code: Option<String>,
    pub reference: Option<String>,
    pub account_name: Option<String>,
    pub account_number: Option<String>,
    pub bank_code: Option<String>,
}

/// Reads operator commands from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<CommandRecord>`.
/// It handles whitespace trimming and short rows automatically.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    /// Creates a new `CommandReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes command rows.
    pub fn records(self) -> impl Iterator<Item = Result<CommandRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PayoutError::from))
    }
}
