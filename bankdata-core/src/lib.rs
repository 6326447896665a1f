//! Bankdata Core - pull bank account data from GoCardless into blob storage
//!
//! This crate implements the sync pipeline following hexagonal architecture:
//!
//! - **domain**: Bank registry, requisitions, export documents and outcomes
//! - **ports**: Trait definitions for external dependencies (token, fetch, storage)
//! - **services**: Aggregation, sync orchestration and authorization
//! - **adapters**: Concrete implementations (GoCardless HTTP, local/GCS/memory storage)

pub mod domain;
pub mod ports;
pub mod services;
pub mod adapters;
pub mod config;

use std::path::Path;
use std::sync::Arc;

use adapters::gocardless::GoCardlessClient;
use adapters::storage::{storage_from_config, MemoryStorage};
use config::Config;
use ports::BlobStorage;
use services::*;

// Re-export commonly used types at crate root
pub use domain::{BankKey, BankSyncReport, SyncOutcome, SyncRequest};
pub use domain::result::{Error, FetchError, Result};

/// Main context for sync operations
///
/// Holds the configuration, the storage backend and all services, wired to
/// the GoCardless HTTP client.
pub struct SyncContext {
    pub config: Arc<Config>,
    pub storage: Arc<dyn BlobStorage>,
    pub sync_service: SyncService,
    pub authorization_service: AuthorizationService,
}

impl SyncContext {
    /// Create a context from the settings in `data_dir` plus the environment
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;
        Self::from_config(config)
    }

    /// Like `new`, but exports are kept in memory instead of being written out
    pub fn dry_run(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;
        Self::with_storage(config, Arc::new(MemoryStorage::new()))
    }

    pub fn from_config(config: Config) -> Result<Self> {
        let storage = storage_from_config(&config)?;
        Self::with_storage(config, storage)
    }

    pub fn with_storage(config: Config, storage: Arc<dyn BlobStorage>) -> Result<Self> {
        let client = Arc::new(GoCardlessClient::from_config(&config)?);
        let config = Arc::new(config);

        let aggregator = AccountAggregator::new(
            Arc::clone(&config),
            client.clone(),
            client.clone(),
            Arc::clone(&storage),
        );
        let sync_service = SyncService::new(Arc::new(aggregator));
        let authorization_service =
            AuthorizationService::new(Arc::clone(&config), client.clone(), client.clone(), client);

        Ok(Self {
            config,
            storage,
            sync_service,
            authorization_service,
        })
    }
}

/// Authorization service for commands that never write exports
///
/// Skips the storage backend, so an incomplete storage configuration does not
/// block `status` or `link`.
pub fn authorization_service(data_dir: &Path) -> Result<AuthorizationService> {
    authorization_service_from_config(Config::load(data_dir)?)
}

pub fn authorization_service_from_config(config: Config) -> Result<AuthorizationService> {
    let client = Arc::new(GoCardlessClient::from_config(&config)?);
    Ok(AuthorizationService::new(
        Arc::new(config),
        client.clone(),
        client.clone(),
        client,
    ))
}
