//! Authorization service - bank consent links and requisition status

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::result::{Error, Result};
use crate::domain::{BankKey, Requisition, ACCESS_VALID_FOR_DAYS};
use crate::ports::{AccessToken, ApiPath, ConsentProvider, CredentialProvider, ResourceFetcher};

/// A freshly created requisition awaiting user consent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationLink {
    pub bank: BankKey,
    pub requisition_id: String,
    /// URL the user opens to grant access
    pub link: String,
}

/// Authorization state of one bank
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequisitionStatus {
    pub bank: BankKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requisition_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_remaining: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RequisitionStatus {
    fn unconfigured(bank: BankKey) -> Self {
        Self {
            bank,
            requisition_id: None,
            status: None,
            created: None,
            days_remaining: None,
            error: None,
        }
    }

    fn expired(&self) -> bool {
        self.days_remaining.is_some_and(|days| days <= 0)
    }
}

pub struct AuthorizationService {
    config: Arc<Config>,
    credentials: Arc<dyn CredentialProvider>,
    fetcher: Arc<dyn ResourceFetcher>,
    consent: Arc<dyn ConsentProvider>,
}

impl AuthorizationService {
    pub fn new(
        config: Arc<Config>,
        credentials: Arc<dyn CredentialProvider>,
        fetcher: Arc<dyn ResourceFetcher>,
        consent: Arc<dyn ConsentProvider>,
    ) -> Self {
        Self {
            config,
            credentials,
            fetcher,
            consent,
        }
    }

    /// Create an end-user agreement and requisition for `bank`
    ///
    /// The returned requisition id must be stored in configuration once the
    /// user has completed the link.
    pub async fn create_link(&self, bank: BankKey) -> Result<AuthorizationLink> {
        let redirect_url = self
            .config
            .redirect_url
            .as_deref()
            .ok_or_else(|| Error::config("Redirect URL not configured"))?;

        let token = self.credentials.get_token().await?;
        let institution_id = bank.institution_id();

        let agreement_id = self
            .consent
            .create_agreement(&token, institution_id, ACCESS_VALID_FOR_DAYS)
            .await?;

        let reference = Uuid::new_v4().to_string();
        let requisition = self
            .consent
            .create_requisition(&token, &agreement_id, institution_id, redirect_url, &reference)
            .await?;

        let link = requisition
            .link
            .filter(|link| !link.is_empty())
            .ok_or_else(|| Error::Auth("Requisition response has no link".to_string()))?;

        info!(bank = %bank, requisition_id = %requisition.id, "Created requisition");
        Ok(AuthorizationLink {
            bank,
            requisition_id: requisition.id,
            link,
        })
    }

    /// Status of every registered bank as of now
    pub async fn status(&self) -> Result<Vec<RequisitionStatus>> {
        self.status_at(Utc::now()).await
    }

    /// Status of every registered bank, computing days remaining against `now`
    ///
    /// Banks without a requisition id are reported without contacting the API.
    /// Per-bank fetch failures land in `error`; only a failed token exchange
    /// fails the whole call.
    pub async fn status_at(&self, now: DateTime<Utc>) -> Result<Vec<RequisitionStatus>> {
        let registry = self.config.registry();
        let resolved: Vec<_> = BankKey::ALL
            .iter()
            .map(|bank| registry.resolve_key(*bank))
            .collect();

        if resolved.iter().all(|r| r.authorization_record_id.is_none()) {
            return Ok(BankKey::ALL
                .iter()
                .map(|bank| RequisitionStatus::unconfigured(*bank))
                .collect());
        }

        let token = self.credentials.get_token().await?;
        let statuses = join_all(resolved.into_iter().map(|r| {
            let token = &token;
            async move {
                match r.authorization_record_id {
                    Some(id) => self.requisition_status(r.key, id, token, now).await,
                    None => RequisitionStatus::unconfigured(r.key),
                }
            }
        }))
        .await;

        for status in statuses.iter().filter(|s| s.expired()) {
            warn!(bank = %status.bank, "Authorization has expired");
        }
        Ok(statuses)
    }

    async fn requisition_status(
        &self,
        bank: BankKey,
        requisition_id: String,
        token: &AccessToken,
        now: DateTime<Utc>,
    ) -> RequisitionStatus {
        let mut status = RequisitionStatus::unconfigured(bank);

        let fetched = self
            .fetcher
            .fetch_json(ApiPath::Requisition(&requisition_id), token)
            .await
            .map_err(|e| e.to_string())
            .and_then(|value| {
                serde_json::from_value::<Requisition>(value).map_err(|e| e.to_string())
            });

        match fetched {
            Ok(requisition) => {
                status.days_remaining = requisition.days_remaining(now);
                status.status = requisition.status;
                status.created = requisition.created;
            }
            Err(e) => {
                warn!(bank = %bank, error = %e, "Failed to fetch requisition");
                status.error = Some(e);
            }
        }
        status.requisition_id = Some(requisition_id);
        status
    }
}
