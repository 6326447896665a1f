//! Sync service - run the aggregator for one bank or all of them
//!
//! Each bank runs in its own task so a failure or panic in one bank never
//! prevents the others from completing.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{error, info};

use crate::domain::result::Result;
use crate::domain::{BankKey, BankSyncReport, SyncOutcome, SyncRequest};
use crate::services::AccountAggregator;

/// Sync orchestrator
pub struct SyncService {
    aggregator: Arc<AccountAggregator>,
}

impl SyncService {
    pub fn new(aggregator: Arc<AccountAggregator>) -> Self {
        Self { aggregator }
    }

    /// Dispatch a sync request
    pub async fn handle(&self, request: SyncRequest) -> Vec<BankSyncReport> {
        match request {
            SyncRequest::SyncAll => self.sync_all().await,
            SyncRequest::SyncOne(bank) => vec![self.sync_one(bank).await],
        }
    }

    /// Sync a bank named by its key, e.g. `"mbank"`
    ///
    /// Unknown keys fail before any network call.
    pub async fn sync_named(&self, bank_key: &str) -> Result<BankSyncReport> {
        let bank: BankKey = bank_key.parse()?;
        Ok(self.sync_one(bank).await)
    }

    pub async fn sync_one(&self, bank: BankKey) -> BankSyncReport {
        let report = BankSyncReport::new(bank, self.run(bank).await);
        log_report(&report);
        report
    }

    /// Sync every registered bank concurrently
    ///
    /// Reports come back in registry order regardless of completion order.
    pub async fn sync_all(&self) -> Vec<BankSyncReport> {
        let outcomes = join_all(BankKey::ALL.iter().map(|bank| self.run(*bank))).await;

        BankKey::ALL
            .iter()
            .zip(outcomes)
            .map(|(bank, outcome)| {
                let report = BankSyncReport::new(*bank, outcome);
                log_report(&report);
                report
            })
            .collect()
    }

    async fn run(&self, bank: BankKey) -> SyncOutcome {
        let aggregator = Arc::clone(&self.aggregator);
        let handle = tokio::spawn(async move { aggregator.sync_bank(bank).await });

        match handle.await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => SyncOutcome::Failed {
                reason: e.to_string(),
            },
            Err(e) if e.is_panic() => SyncOutcome::Failed {
                reason: "sync task panicked".to_string(),
            },
            Err(e) => SyncOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }
}

fn log_report(report: &BankSyncReport) {
    if report.outcome.is_failure() {
        error!(bank = %report.bank, "{}", report.message);
    } else {
        info!(bank = %report.bank, "{}", report.message);
    }
}
