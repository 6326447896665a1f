//! GoCardless Bank Account Data API client
//!
//! Handles token exchange, read-only account resources and consent setup
//! against the GoCardless (formerly Nordigen) open-banking API.
//!
//! API Documentation: https://developer.gocardless.com/bank-account-data/overview

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;
use url::Url;

use crate::config::{Config, Credentials};
use crate::domain::result::{Error, FetchError, Result};
use crate::domain::Requisition;
use crate::ports::{AccessToken, ApiPath, ConsentProvider, CredentialProvider, ResourceFetcher};

// =============================================================================
// API Request/Response Models
// =============================================================================

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    secret_id: &'a str,
    secret_key: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access: String,
}

#[derive(Debug, Serialize)]
struct AgreementRequest<'a> {
    institution_id: &'a str,
    access_valid_for_days: i64,
}

#[derive(Debug, Deserialize)]
struct AgreementResponse {
    id: String,
}

#[derive(Debug, Serialize)]
struct RequisitionRequest<'a> {
    redirect: &'a str,
    institution_id: &'a str,
    agreement: &'a str,
    reference: &'a str,
}

/// Pull the human-readable error out of an upstream error body
///
/// The API uses `error` on some endpoints and `summary` on others.
fn upstream_error(body: &str) -> Option<String> {
    let value: JsonValue = serde_json::from_str(body).ok()?;
    ["error", "summary", "detail"]
        .iter()
        .find_map(|field| value.get(*field).and_then(|v| v.as_str()))
        .map(str::to_string)
}

// =============================================================================
// GoCardless HTTP Client
// =============================================================================

/// GoCardless API client
#[derive(Debug, Clone)]
pub struct GoCardlessClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
    timeout: Duration,
}

impl GoCardlessClient {
    /// Create a new client against `base_url` with a per-request timeout
    pub fn new(
        credentials: Credentials,
        base_url: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let parsed = Url::parse(base_url).context("Invalid GoCardless base URL")?;
        if !matches!(parsed.scheme(), "https" | "http") {
            anyhow::bail!("GoCardless base URL must use HTTP(S)");
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.credentials.clone(),
            &config.api_base_url,
            config.request_timeout,
        )
        .map_err(|e| Error::config(format!("{:#}", e)))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Map request errors to user-friendly messages
    fn map_request_error(&self, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Transport(format!("Connection timed out after {:?}", self.timeout))
        } else if error.is_connect() {
            FetchError::Transport("Unable to connect to GoCardless servers".to_string())
        } else {
            FetchError::Transport(format!("GoCardless request failed: {}", error))
        }
    }

    /// Turn a response into JSON, or a status failure carrying the upstream error
    async fn read_json<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> std::result::Result<T, FetchError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_request_error(e))?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&AccessToken>,
        body: &B,
    ) -> std::result::Result<T, FetchError> {
        let mut request = self
            .client
            .post(self.url(path))
            .header(ACCEPT, "application/json")
            .json(body);
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token.as_str()));
        }

        let response = request.send().await.map_err(|e| self.map_request_error(e))?;
        self.read_json(response).await
    }
}

fn status_error(status: StatusCode, body: &str) -> FetchError {
    FetchError::Status {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or("").to_string(),
        upstream_error: upstream_error(body),
    }
}

#[async_trait]
impl CredentialProvider for GoCardlessClient {
    async fn get_token(&self) -> Result<AccessToken> {
        if !self.credentials.is_complete() {
            return Err(Error::config("GoCardless secret id/key not configured"));
        }

        debug!("Requesting GoCardless access token");
        let request = TokenRequest {
            secret_id: &self.credentials.secret_id,
            secret_key: &self.credentials.secret_key,
        };

        let response = self
            .client
            .post(self.url("token/new/"))
            .header(ACCEPT, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Auth(self.map_request_error(e).to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Auth(self.map_request_error(e).to_string()))?;

        if !status.is_success() {
            return Err(Error::Auth(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Auth(format!("malformed token response ({}): {}", e, body)))?;

        Ok(AccessToken::new(token.access))
    }
}

#[async_trait]
impl ResourceFetcher for GoCardlessClient {
    async fn fetch_json(
        &self,
        path: ApiPath<'_>,
        token: &AccessToken,
    ) -> std::result::Result<JsonValue, FetchError> {
        let url = self.url(&path.path());

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", token.as_str()))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        self.read_json(response).await
    }
}

#[async_trait]
impl ConsentProvider for GoCardlessClient {
    async fn create_agreement(
        &self,
        token: &AccessToken,
        institution_id: &str,
        access_valid_for_days: i64,
    ) -> Result<String> {
        let request = AgreementRequest {
            institution_id,
            access_valid_for_days,
        };
        let agreement: AgreementResponse = self
            .post_json("agreements/enduser/", Some(token), &request)
            .await?;
        Ok(agreement.id)
    }

    async fn create_requisition(
        &self,
        token: &AccessToken,
        agreement_id: &str,
        institution_id: &str,
        redirect_url: &str,
        reference: &str,
    ) -> Result<Requisition> {
        let request = RequisitionRequest {
            redirect: redirect_url,
            institution_id,
            agreement: agreement_id,
            reference,
        };
        Ok(self.post_json("requisitions/", Some(token), &request).await?)
    }
}

// =============================================================================
// Tests
// =============================================================================
