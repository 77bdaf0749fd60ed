use crate::domain::payout::PayoutStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PayoutError {
    #[error("Invalid state: cannot {operation} a payout in status {status}")]
    InvalidState {
        operation: &'static str,
        status: PayoutStatus,
    },
    #[error("Payout already processed (status {0})")]
    AlreadyProcessed(PayoutStatus),
    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),
    #[error("Payment gateway timed out after {0} ms")]
    GatewayTimeout(u128),
    #[error("Invalid OTP code")]
    InvalidCode,
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl PayoutError {
    /// Whether the failed operation may be reissued as-is by the operator.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::GatewayUnavailable(_) | Self::GatewayTimeout(_) | Self::InvalidCode
        )
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for PayoutError {
    fn from(e: rocksdb::Error) -> Self {
        Self::InternalError(Box::new(e))
    }
}

pub type Result<T> = std::result::Result<T, PayoutError>;
