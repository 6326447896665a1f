//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "credentials": { "secretId": "...", "secretKey": "..." },
//!   "bankAuthorizationIds": { "MBANK": "...", "PKO": "..." },
//!   "redirectUrl": "https://example.com/done",
//!   "owner": { "name": "Jan", "lastName": "Kowalski", "email": "jan@example.com" },
//!   "storage": { "type": "local", "dir": "/srv/exports" }
//! }
//! ```
//! Every field is optional; environment variables override the file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::{BankKey, BankRegistry, OwnerInfo};

/// Default GoCardless Bank Account Data API
pub const DEFAULT_API_BASE_URL: &str = "https://bankaccountdata.gocardless.com/api/v2";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_ACCOUNT_CONCURRENCY: usize = 4;

pub const ENV_SECRET_ID: &str = "GOCARDLESS_SECRET_ID";
pub const ENV_SECRET_KEY: &str = "GOCARDLESS_SECRET_KEY";
pub const ENV_BASE_URL: &str = "GOCARDLESS_BASE_URL";
pub const ENV_REDIRECT_URL: &str = "BANKDATA_REDIRECT_URL";
pub const ENV_GCS_BUCKET: &str = "BANKDATA_GCS_BUCKET";
pub const ENV_GCS_TOKEN: &str = "BANKDATA_GCS_TOKEN";
/// Prefix for per-bank requisition ids, e.g. `BANKDATA_REQUISITION_ID_MBANK`
pub const ENV_REQUISITION_PREFIX: &str = "BANKDATA_REQUISITION_ID_";

/// Aggregator client credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(default)]
    pub secret_id: String,
    #[serde(default)]
    pub secret_key: String,
}

impl Credentials {
    pub fn is_complete(&self) -> bool {
        !self.secret_id.is_empty() && !self.secret_key.is_empty()
    }
}

/// The single account owner written into every export
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSettings {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
}

impl Default for OwnerSettings {
    fn default() -> Self {
        Self {
            name: "Account".to_string(),
            last_name: "Owner".to_string(),
            email: String::new(),
        }
    }
}

impl OwnerSettings {
    pub fn owner_info(&self, institution_id: &str) -> OwnerInfo {
        OwnerInfo::new(&self.name, &self.last_name, &self.email, institution_id)
    }
}

/// Where export documents are written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageSettings {
    Local {
        #[serde(default)]
        dir: Option<PathBuf>,
    },
    Gcs {
        bucket: String,
        #[serde(default, rename = "accessToken")]
        access_token: Option<String>,
    },
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings::Local { dir: None }
    }
}

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    credentials: Credentials,
    #[serde(default)]
    bank_authorization_ids: HashMap<String, String>,
    #[serde(default)]
    redirect_url: Option<String>,
    #[serde(default)]
    api_base_url: Option<String>,
    #[serde(default)]
    request_timeout_secs: Option<u64>,
    #[serde(default)]
    account_concurrency: Option<usize>,
    #[serde(default)]
    owner: Option<OwnerSettings>,
    #[serde(default)]
    storage: Option<StorageSettings>,
}

/// Sync configuration
///
/// Loaded once per invocation and handed to the services; the core never
/// mutates it.
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    /// Requisition ids keyed by upper-cased bank key
    pub bank_authorization_ids: HashMap<String, String>,
    pub redirect_url: Option<String>,
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub account_concurrency: usize,
    pub owner: OwnerSettings,
    pub storage: StorageSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            bank_authorization_ids: HashMap::new(),
            redirect_url: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            account_concurrency: DEFAULT_ACCOUNT_CONCURRENCY,
            owner: OwnerSettings::default(),
            storage: StorageSettings::default(),
        }
    }
}

impl Config {
    /// Load config from the data directory, then apply environment overrides
    pub fn load(data_dir: &Path) -> Result<Self> {
        Self::load_with_env(data_dir, |key| std::env::var(key).ok())
    }

    /// Load config with a custom environment lookup
    pub fn load_with_env<F>(data_dir: &Path, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings_path = data_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).map_err(|e| {
                Error::config(format!("Invalid {}: {}", settings_path.display(), e))
            })?
        } else {
            SettingsFile::default()
        };

        let mut config = Self::from_settings(raw);
        config.apply_env(env);

        if let StorageSettings::Local { dir } = &mut config.storage {
            if dir.is_none() {
                *dir = Some(data_dir.join("exports"));
            }
        }

        Ok(config)
    }

    fn from_settings(raw: SettingsFile) -> Self {
        let defaults = Config::default();
        Self {
            credentials: raw.credentials,
            bank_authorization_ids: raw
                .bank_authorization_ids
                .into_iter()
                .map(|(k, v)| (k.to_uppercase(), v))
                .collect(),
            redirect_url: raw.redirect_url,
            api_base_url: raw.api_base_url.unwrap_or(defaults.api_base_url),
            request_timeout: raw
                .request_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            account_concurrency: raw
                .account_concurrency
                .filter(|n| *n > 0)
                .unwrap_or(defaults.account_concurrency),
            owner: raw.owner.unwrap_or(defaults.owner),
            storage: raw.storage.unwrap_or(defaults.storage),
        }
    }

    fn apply_env<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        if let Some(id) = env(ENV_SECRET_ID) {
            self.credentials.secret_id = id;
        }
        if let Some(key) = env(ENV_SECRET_KEY) {
            self.credentials.secret_key = key;
        }
        if let Some(url) = env(ENV_BASE_URL) {
            self.api_base_url = url;
        }
        if let Some(url) = env(ENV_REDIRECT_URL) {
            self.redirect_url = Some(url);
        }

        for bank in BankKey::ALL {
            let var = format!("{}{}", ENV_REQUISITION_PREFIX, bank.config_key());
            if let Some(id) = env(&var) {
                self.bank_authorization_ids.insert(bank.config_key(), id);
            }
        }

        if let Some(bucket) = env(ENV_GCS_BUCKET) {
            self.storage = StorageSettings::Gcs {
                bucket,
                access_token: env(ENV_GCS_TOKEN),
            };
        } else if let (StorageSettings::Gcs { access_token, .. }, Some(token)) =
            (&mut self.storage, env(ENV_GCS_TOKEN))
        {
            *access_token = Some(token);
        }
    }

    /// Bank registry backed by this configuration
    pub fn registry(&self) -> BankRegistry<'_> {
        BankRegistry::new(&self.bank_authorization_ids)
    }
}
