//! Payout and referral domain: value objects, the payout state machine and the ports
//! the application layer drives.

pub mod account;
pub mod gateway;
pub mod payout;
pub mod ports;
pub mod query;
