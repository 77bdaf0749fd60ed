//! Application layer containing the payout and referral use cases.
//!
//! `PayoutLifecycle` is the entry point for moving payouts between states. It
//! serializes writers per payout id with `tokio` mutexes and relies on the store's
//! conditional update for writers in other processes.

pub mod lifecycle;
pub mod locks;
pub mod referrals;
