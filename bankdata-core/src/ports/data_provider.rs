//! Aggregator ports
//!
//! Defines the interface for talking to the open-banking aggregator:
//! exchanging credentials for a token, reading resources, and setting up
//! new consent links.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::domain::result::{FetchError, Result};
use crate::domain::Requisition;

/// Short-lived bearer token
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Read-only API resources, relative to the API base URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiPath<'a> {
    Requisition(&'a str),
    Account(&'a str),
    AccountTransactions(&'a str),
    AccountBalances(&'a str),
    AccountDetails(&'a str),
}

impl ApiPath<'_> {
    pub fn path(&self) -> String {
        match self {
            ApiPath::Requisition(id) => format!("requisitions/{}/", id),
            ApiPath::Account(id) => format!("accounts/{}/", id),
            ApiPath::AccountTransactions(id) => format!("accounts/{}/transactions/", id),
            ApiPath::AccountBalances(id) => format!("accounts/{}/balances/", id),
            ApiPath::AccountDetails(id) => format!("accounts/{}/details/", id),
        }
    }
}

/// Exchanges the configured client credentials for a bearer token
///
/// No retry: a failure is reported as `Error::Auth` carrying the upstream body.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn get_token(&self) -> Result<AccessToken>;
}

/// Authenticated GET against the aggregator
///
/// One attempt per call. Any 2xx yields parsed JSON; anything else is a
/// `FetchError::Status` with the HTTP status and status text.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch_json(
        &self,
        path: ApiPath<'_>,
        token: &AccessToken,
    ) -> std::result::Result<JsonValue, FetchError>;
}

/// Consent setup: end-user agreements and requisitions
#[async_trait]
pub trait ConsentProvider: Send + Sync {
    /// Create an end-user agreement, returning its id
    async fn create_agreement(
        &self,
        token: &AccessToken,
        institution_id: &str,
        access_valid_for_days: i64,
    ) -> Result<String>;

    /// Create a requisition; the returned record carries the authorization link
    async fn create_requisition(
        &self,
        token: &AccessToken,
        agreement_id: &str,
        institution_id: &str,
        redirect_url: &str,
        reference: &str,
    ) -> Result<Requisition>;
}
