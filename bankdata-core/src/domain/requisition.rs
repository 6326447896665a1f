//! Authorization record (requisition) returned by the aggregator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Days an end-user agreement stays valid after the requisition is created
pub const ACCESS_VALID_FOR_DAYS: i64 = 90;

/// Upstream consent grant linking bank accounts to the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Requisition {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    /// RFC 3339 timestamp, kept as sent
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub institution_id: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    /// Linked account ids; `null` upstream is treated as empty
    #[serde(default, deserialize_with = "deserialize_accounts")]
    pub accounts: Vec<String>,
}

fn deserialize_accounts<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let accounts: Option<Vec<String>> = Option::deserialize(deserializer)?;
    Ok(accounts.unwrap_or_default())
}

impl Requisition {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Whole days of access left, counted from `created`
    pub fn days_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        self.created_at()
            .map(|created| ACCESS_VALID_FOR_DAYS - (now - created).num_days())
    }
}
