//! Bank registry - the fixed set of supported bank connections

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Key of a supported bank connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BankKey {
    Mbank,
    Pko,
}

impl BankKey {
    /// Every registered bank, in a stable order
    pub const ALL: [BankKey; 2] = [BankKey::Mbank, BankKey::Pko];

    pub fn as_str(&self) -> &'static str {
        match self {
            BankKey::Mbank => "mbank",
            BankKey::Pko => "pko",
        }
    }

    /// Upstream institution identifier
    pub fn institution_id(&self) -> &'static str {
        match self {
            BankKey::Mbank => "MBANK_RETAIL_BREXPLPW",
            BankKey::Pko => "PKO_BPKOPLPW",
        }
    }

    /// Key under which the authorization record id is configured
    pub fn config_key(&self) -> String {
        self.as_str().to_uppercase()
    }
}

impl fmt::Display for BankKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BankKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mbank" => Ok(BankKey::Mbank),
            "pko" => Ok(BankKey::Pko),
            _ => Err(Error::UnknownBank(s.to_string())),
        }
    }
}

/// A bank key resolved against the registry and configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBank {
    pub key: BankKey,
    pub institution_id: &'static str,
    /// `None` when the bank has not been authorized yet
    pub authorization_record_id: Option<String>,
}

/// Lookup from bank key to institution and authorization record
///
/// Borrows the configured authorization ids so every `resolve` sees the
/// configuration as it is at call time.
pub struct BankRegistry<'a> {
    authorization_ids: &'a HashMap<String, String>,
}

impl<'a> BankRegistry<'a> {
    pub fn new(authorization_ids: &'a HashMap<String, String>) -> Self {
        Self { authorization_ids }
    }

    /// Resolve a raw bank key; fails with `UnknownBank` outside the fixed set
    pub fn resolve(&self, bank_key: &str) -> Result<ResolvedBank> {
        let key = bank_key.parse::<BankKey>()?;
        Ok(self.resolve_key(key))
    }

    pub fn resolve_key(&self, key: BankKey) -> ResolvedBank {
        let authorization_record_id = self
            .authorization_ids
            .get(&key.config_key())
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        ResolvedBank {
            key,
            institution_id: key.institution_id(),
            authorization_record_id,
        }
    }
}
