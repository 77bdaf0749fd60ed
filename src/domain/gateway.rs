use serde::{Deserialize, Serialize};

/// What the gateway hands back when a transfer is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferInit {
    /// Gateway transfer reference. A response without one cannot be tracked and is
    /// treated as a failed call.
    pub reference: Option<String>,
    /// The gateway holds the transfer until an OTP is finalized against `reference`.
    pub requires_otp: bool,
}

/// The gateway's view of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayTransferStatus {
    Pending,
    Otp,
    Success,
    Failed,
    Reversed,
}
