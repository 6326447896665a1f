//! Sync requests and per-bank outcomes

use serde::Serialize;

use super::bank::BankKey;

/// What the caller asked to sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncRequest {
    SyncAll,
    SyncOne(BankKey),
}

/// Result of syncing a single bank
///
/// Empty states (`NoRequisition`, `NoAccounts`, `NoBookedData`) are expected
/// outcomes, not failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    Uploaded { count: usize, key: String },
    NoRequisition,
    CredentialExpired,
    NoAccounts,
    NoBookedData,
    FetchFailed { status: Option<u16>, reason: String },
    /// Token exchange, storage write or task failure
    Failed { reason: String },
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Uploaded { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SyncOutcome::CredentialExpired
                | SyncOutcome::FetchFailed { .. }
                | SyncOutcome::Failed { .. }
        )
    }

    /// Human-readable status line for `bank`
    pub fn message(&self, bank: BankKey) -> String {
        match self {
            SyncOutcome::Uploaded { .. } => format!("Data for {} uploaded successfully.", bank),
            SyncOutcome::NoRequisition => format!("No requisition ID found for {}", bank),
            SyncOutcome::CredentialExpired => format!(
                "Authorization for {} has expired. Please re-authorize to continue.",
                bank
            ),
            SyncOutcome::NoAccounts => format!("No accounts found for {}", bank),
            SyncOutcome::NoBookedData => format!(
                "No data to upload for {}. Possible reason: no booked transactions available.",
                bank
            ),
            SyncOutcome::FetchFailed { reason, .. } => {
                format!("Failed to fetch accounts for {}: {}", bank, reason)
            }
            SyncOutcome::Failed { reason } => format!("Error processing bank {}: {}", bank, reason),
        }
    }
}

/// Outcome of one bank within a sync run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BankSyncReport {
    pub bank: BankKey,
    #[serde(flatten)]
    pub outcome: SyncOutcome,
    pub message: String,
}

impl BankSyncReport {
    pub fn new(bank: BankKey, outcome: SyncOutcome) -> Self {
        let message = outcome.message(bank);
        Self {
            bank,
            outcome,
            message,
        }
    }
}
