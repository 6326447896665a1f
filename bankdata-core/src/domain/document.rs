//! Per-bank export document
//!
//! The stored artifact is a JSON array: one entry per account that has booked
//! transactions, followed by exactly one owner record.

use std::fmt;

use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value as JsonValue;

use super::result::FetchError;

/// Account metadata as returned by `GET /accounts/{id}/`
///
/// Fields missing upstream are left out of the export rather than written as null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iban: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookedTransactions {
    /// Upstream transaction objects, passed through untouched
    #[serde(default)]
    pub booked: Vec<JsonValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionsEnvelope {
    pub transactions: BookedTransactions,
}

/// One exported account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountRecord {
    pub metadata: AccountMetadata,
    pub details: JsonValue,
    pub balances: JsonValue,
    pub transactions: TransactionsEnvelope,
}

/// Raw sub-resources fetched for one account
#[derive(Debug, Clone)]
pub struct AccountResources {
    pub metadata: JsonValue,
    pub transactions: JsonValue,
    pub balances: JsonValue,
    pub details: JsonValue,
}

/// Why an account was left out of the export
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// One of the four sub-resource calls failed
    FetchFailed {
        resource: &'static str,
        error: FetchError,
    },
    /// A sub-resource came back empty or malformed
    Incomplete { resource: &'static str },
    /// No booked transactions (empty or missing list)
    NoBookedTransactions,
}

impl SkipReason {
    /// The account was dropped because its consent has lapsed
    pub fn is_credential_expired(&self) -> bool {
        matches!(self, SkipReason::FetchFailed { error, .. } if error.is_credential_expired())
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::FetchFailed { resource, error } => {
                write!(f, "failed to fetch {}: {}", resource, error)
            }
            SkipReason::Incomplete { resource } => write!(f, "incomplete {} data", resource),
            SkipReason::NoBookedTransactions => f.write_str("no booked transactions"),
        }
    }
}

fn is_blank(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::Object(map) => map.is_empty(),
        _ => false,
    }
}

impl AccountRecord {
    /// Build the export record for one account
    ///
    /// Only accounts with at least one booked transaction become records.
    pub fn from_resources(resources: AccountResources) -> Result<Self, SkipReason> {
        let AccountResources {
            metadata,
            transactions,
            balances,
            details,
        } = resources;

        for (resource, value) in [
            ("metadata", &metadata),
            ("transactions", &transactions),
            ("balances", &balances),
            ("details", &details),
        ] {
            if is_blank(value) {
                return Err(SkipReason::Incomplete { resource });
            }
        }

        let metadata: AccountMetadata = serde_json::from_value(metadata)
            .map_err(|_| SkipReason::Incomplete { resource: "metadata" })?;

        let booked = match transactions.pointer("/transactions/booked") {
            Some(JsonValue::Array(booked)) if !booked.is_empty() => booked.clone(),
            _ => return Err(SkipReason::NoBookedTransactions),
        };

        Ok(Self {
            metadata,
            details,
            balances,
            transactions: TransactionsEnvelope {
                transactions: BookedTransactions { booked },
            },
        })
    }

    pub fn booked_count(&self) -> usize {
        self.transactions.transactions.booked.len()
    }
}

/// The single account owner embedded in every export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerInfo {
    pub user_name: String,
    pub user_last_name: String,
    pub user_email: String,
    pub user_full_name: String,
    pub institution: String,
}

impl OwnerInfo {
    pub fn new(name: &str, last_name: &str, email: &str, institution: &str) -> Self {
        Self {
            user_name: name.to_string(),
            user_last_name: last_name.to_string(),
            user_email: email.to_string(),
            user_full_name: format!("{} {}", name, last_name).trim().to_string(),
            institution: institution.to_string(),
        }
    }
}

/// Export document for one bank
///
/// Serializes as `[account, ..., owner]`; the owner record is always last.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncDocument {
    accounts: Vec<AccountRecord>,
    owner: OwnerInfo,
}

impl SyncDocument {
    pub fn new(accounts: Vec<AccountRecord>, owner: OwnerInfo) -> Self {
        Self { accounts, owner }
    }

    pub fn accounts(&self) -> &[AccountRecord] {
        &self.accounts
    }

    pub fn owner(&self) -> &OwnerInfo {
        &self.owner
    }

    /// Storage key: `"<owner full name> <institution id>.json"`
    pub fn storage_key(&self) -> String {
        format!("{} {}.json", self.owner.user_full_name, self.owner.institution)
    }

    /// Pretty-printed UTF-8 JSON, two-space indent
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }
}

impl Serialize for SyncDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.accounts.len() + 1))?;
        for account in &self.accounts {
            seq.serialize_element(account)?;
        }
        seq.serialize_element(&self.owner)?;
        seq.end()
    }
}
