//! Records stored in the Realtime Database.
//!
//! Field names are camelCase and timestamps are epoch milliseconds, matching
//! what the browser front-end reads from the same nodes.

pub mod account;
pub mod registration;

pub use account::{Account, AccountDetails, AccountSummary, ApprovalRecord, Profile};
pub use registration::PendingRegistration;
