//! Account aggregator - fetch, filter and store one bank's accounts

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde_json::Value as JsonValue;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::domain::result::{FetchError, Result};
use crate::domain::{
    AccountRecord, AccountResources, BankKey, Requisition, SkipReason, SyncDocument, SyncOutcome,
};
use crate::ports::{AccessToken, ApiPath, BlobStorage, CredentialProvider, ResourceFetcher};

const CONTENT_TYPE_JSON: &str = "application/json";

/// Runs the per-bank pipeline: requisition, accounts, filter, upload
pub struct AccountAggregator {
    config: Arc<Config>,
    credentials: Arc<dyn CredentialProvider>,
    fetcher: Arc<dyn ResourceFetcher>,
    storage: Arc<dyn BlobStorage>,
}

impl AccountAggregator {
    pub fn new(
        config: Arc<Config>,
        credentials: Arc<dyn CredentialProvider>,
        fetcher: Arc<dyn ResourceFetcher>,
        storage: Arc<dyn BlobStorage>,
    ) -> Self {
        Self {
            config,
            credentials,
            fetcher,
            storage,
        }
    }

    /// Sync a single bank
    ///
    /// Expected empty states come back as `Ok` outcomes. Token exchange and
    /// storage failures are returned as errors for the caller to report.
    #[tracing::instrument(skip_all, fields(bank = %bank))]
    pub async fn sync_bank(&self, bank: BankKey) -> Result<SyncOutcome> {
        let resolved = self.config.registry().resolve_key(bank);
        let Some(requisition_id) = resolved.authorization_record_id else {
            warn!("No requisition id configured");
            return Ok(SyncOutcome::NoRequisition);
        };

        let token = self.credentials.get_token().await?;

        let requisition = match self.fetch_requisition(&requisition_id, &token).await {
            Ok(requisition) => requisition,
            Err(e) if e.is_credential_expired() => {
                warn!(requisition_id = %requisition_id, "Authorization has expired");
                return Ok(SyncOutcome::CredentialExpired);
            }
            Err(e) => {
                error!(requisition_id = %requisition_id, error = %e, "Failed to fetch requisition");
                return Ok(SyncOutcome::FetchFailed {
                    status: e.status(),
                    reason: e.to_string(),
                });
            }
        };

        if requisition.accounts.is_empty() {
            info!("Requisition has no linked accounts");
            return Ok(SyncOutcome::NoAccounts);
        }

        let results = self.fetch_accounts(&requisition.accounts, &token).await;
        if results
            .iter()
            .all(|result| matches!(result, Err(reason) if reason.is_credential_expired()))
        {
            warn!(requisition_id = %requisition_id, "Account access has expired");
            return Ok(SyncOutcome::CredentialExpired);
        }

        let records: Vec<AccountRecord> = results.into_iter().filter_map(|r| r.ok()).collect();
        if records.is_empty() {
            info!(accounts = requisition.accounts.len(), "No account has booked transactions");
            return Ok(SyncOutcome::NoBookedData);
        }

        let count = records.len();
        let document = SyncDocument::new(
            records,
            self.config.owner.owner_info(resolved.institution_id),
        );
        let key = document.storage_key();
        self.storage
            .put(&key, document.to_bytes()?, CONTENT_TYPE_JSON)
            .await?;

        info!(count, key = %key, backend = self.storage.name(), "Uploaded export");
        Ok(SyncOutcome::Uploaded { count, key })
    }

    async fn fetch_requisition(
        &self,
        requisition_id: &str,
        token: &AccessToken,
    ) -> std::result::Result<Requisition, FetchError> {
        let value = self
            .fetcher
            .fetch_json(ApiPath::Requisition(requisition_id), token)
            .await?;
        serde_json::from_value(value)
            .map_err(|e| FetchError::Decode(format!("invalid requisition: {}", e)))
    }

    /// Fetch every account, keeping requisition order
    ///
    /// Skipped accounts are logged here; the caller decides what an
    /// all-skipped bank means.
    async fn fetch_accounts(
        &self,
        account_ids: &[String],
        token: &AccessToken,
    ) -> Vec<std::result::Result<AccountRecord, SkipReason>> {
        let fetches: Vec<_> = account_ids
            .iter()
            .map(|id| async move { (id, self.fetch_account(id, token).await) })
            .collect();

        let results: Vec<_> = stream::iter(fetches)
            .buffered(self.config.account_concurrency.max(1))
            .collect()
            .await;

        results
            .into_iter()
            .map(|(id, result)| {
                match &result {
                    Ok(record) => {
                        debug!(account_id = %id, booked = record.booked_count(), "Account ready")
                    }
                    Err(reason) => warn!(account_id = %id, reason = %reason, "Skipping account"),
                }
                result
            })
            .collect()
    }

    async fn fetch_account(
        &self,
        account_id: &str,
        token: &AccessToken,
    ) -> std::result::Result<AccountRecord, SkipReason> {
        let (metadata, transactions, balances, details) = tokio::try_join!(
            self.fetch_resource("metadata", ApiPath::Account(account_id), token),
            self.fetch_resource("transactions", ApiPath::AccountTransactions(account_id), token),
            self.fetch_resource("balances", ApiPath::AccountBalances(account_id), token),
            self.fetch_resource("details", ApiPath::AccountDetails(account_id), token),
        )?;

        AccountRecord::from_resources(AccountResources {
            metadata,
            transactions,
            balances,
            details,
        })
    }

    async fn fetch_resource(
        &self,
        resource: &'static str,
        path: ApiPath<'_>,
        token: &AccessToken,
    ) -> std::result::Result<JsonValue, SkipReason> {
        self.fetcher
            .fetch_json(path, token)
            .await
            .map_err(|error| SkipReason::FetchFailed { resource, error })
    }
}
