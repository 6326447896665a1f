//! Core domain entities
//!
//! All sync entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

pub mod bank;
mod document;
pub mod outcome;
mod requisition;
pub mod result;

pub use bank::{BankKey, BankRegistry, ResolvedBank};
pub use document::{
    AccountMetadata, AccountRecord, AccountResources, BookedTransactions, OwnerInfo, SkipReason,
    SyncDocument, TransactionsEnvelope,
};
pub use outcome::{BankSyncReport, SyncOutcome, SyncRequest};
pub use requisition::{Requisition, ACCESS_VALID_FOR_DAYS};
