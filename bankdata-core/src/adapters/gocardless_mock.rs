//! Mock GoCardless API server for testing
//!
//! Simulates the subset of the Bank Account Data API the sync pipeline uses:
//! - POST /token/new/ returns { access, access_expires, refresh, refresh_expires }
//! - GET /requisitions/{id}/ returns the requisition with its linked accounts
//! - GET /accounts/{id}/, /transactions/, /balances/, /details/
//! - POST /agreements/enduser/ and POST /requisitions/ for link setup

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::{json, Value as JsonValue};

/// Mock account served by the server
#[derive(Debug, Clone)]
pub struct MockAccount {
    pub id: String,
    /// Number of booked transactions to generate
    pub booked: usize,
    /// Status code returned for this account's transactions endpoint
    pub fail_transactions: Option<u16>,
}

impl MockAccount {
    pub fn new(id: &str, booked: usize) -> Self {
        Self {
            id: id.to_string(),
            booked,
            fail_transactions: None,
        }
    }

    pub fn failing(id: &str, status: u16) -> Self {
        Self {
            id: id.to_string(),
            booked: 0,
            fail_transactions: Some(status),
        }
    }
}

/// Configuration for mock data generation
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub requisition_id: String,
    pub accounts: Vec<MockAccount>,
    /// Reject the token exchange
    pub fail_auth: bool,
    /// Answer the requisition with the "expired" 400
    pub expired_requisition: bool,
    /// Delay in milliseconds before responding
    pub delay_ms: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            requisition_id: "req-1".to_string(),
            accounts: vec![MockAccount::new("acc-1", 3), MockAccount::new("acc-2", 0)],
            fail_auth: false,
            expired_requisition: false,
            delay_ms: 0,
        }
    }
}

pub const MOCK_TOKEN: &str = "mock-access-token";

/// Mock GoCardless server for testing
pub struct MockGoCardlessServer {
    port: u16,
    running: Arc<AtomicBool>,
    requests: Arc<AtomicUsize>,
    paths: Arc<Mutex<Vec<String>>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl MockGoCardlessServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let requests = Arc::new(AtomicUsize::new(0));
        let paths = Arc::new(Mutex::new(Vec::new()));

        // Non-blocking accept so `stop` can end the loop
        listener.set_nonblocking(true)?;

        let running_clone = running.clone();
        let requests_clone = requests.clone();
        let paths_clone = paths.clone();
        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let cfg = config.clone();
                        let requests = requests_clone.clone();
                        let paths = paths_clone.clone();
                        thread::spawn(move || {
                            handle_connection(stream, &cfg, &requests, &paths);
                        });
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            requests,
            paths,
            thread_handle: Some(thread_handle),
        })
    }

    /// Get the base URL for this mock server
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Number of requests served so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Request lines ("GET /path") served so far
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockGoCardlessServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Read the request head plus any `Content-Length` body
fn read_request(stream: &mut TcpStream) -> Option<String> {
    stream.set_nonblocking(false).ok()?;
    let mut data = Vec::new();
    let mut buffer = [0; 4096];

    loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..n]);

        let text = String::from_utf8_lossy(&data);
        if let Some(head_end) = text.find("\r\n\r\n") {
            let content_length = text[..head_end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if data.len() >= head_end + 4 + content_length {
                break;
            }
        }
    }

    Some(String::from_utf8_lossy(&data).into_owned())
}

fn handle_connection(
    mut stream: TcpStream,
    config: &MockConfig,
    requests: &AtomicUsize,
    paths: &Mutex<Vec<String>>,
) {
    let Some(request) = read_request(&mut stream) else {
        return;
    };

    if config.delay_ms > 0 {
        thread::sleep(std::time::Duration::from_millis(config.delay_ms));
    }

    let first_line = request.lines().next().unwrap_or("");
    let parts: Vec<&str> = first_line.split_whitespace().collect();
    if parts.len() < 2 {
        send_response(&mut stream, 400, "Bad Request", r#"{"error": "Invalid request"}"#);
        return;
    }
    let (method, path) = (parts[0], parts[1]);

    requests.fetch_add(1, Ordering::SeqCst);
    if let Ok(mut p) = paths.lock() {
        p.push(format!("{} {}", method, path));
    }

    let authorized = request
        .to_lowercase()
        .contains(&format!("authorization: bearer {}", MOCK_TOKEN));

    let (status, text, body) = route(method, path, authorized, config);
    send_response(&mut stream, status, text, &body.to_string());
}

fn route(
    method: &str,
    path: &str,
    authorized: bool,
    config: &MockConfig,
) -> (u16, &'static str, JsonValue) {
    let segments: Vec<&str> = path
        .split('?')
        .next()
        .unwrap_or(path)
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    if method == "POST" && segments == ["token", "new"] {
        if config.fail_auth {
            return (
                401,
                "Unauthorized",
                json!({
                    "summary": "Authentication failed",
                    "detail": "No active account found with the given credentials",
                    "status_code": 401
                }),
            );
        }
        return (
            200,
            "OK",
            json!({
                "access": MOCK_TOKEN,
                "access_expires": 86400,
                "refresh": "mock-refresh-token",
                "refresh_expires": 2592000
            }),
        );
    }

    if !authorized {
        return (
            401,
            "Unauthorized",
            json!({ "summary": "Invalid token", "status_code": 401 }),
        );
    }

    match (method, segments.as_slice()) {
        ("GET", ["requisitions", id]) => {
            if *id != config.requisition_id {
                return (
                    404,
                    "Not Found",
                    json!({ "summary": "Not found.", "status_code": 404 }),
                );
            }
            if config.expired_requisition {
                return (
                    400,
                    "Bad Request",
                    json!({ "error": "Requisition ID has expired", "status_code": 400 }),
                );
            }
            (200, "OK", requisition_body(config))
        }
        ("POST", ["agreements", "enduser"]) => (
            201,
            "Created",
            json!({ "id": "agreement-1", "access_valid_for_days": 180 }),
        ),
        ("POST", ["requisitions"]) => (
            201,
            "Created",
            json!({
                "id": "req-new",
                "status": "CR",
                "created": "2024-05-01T12:00:00.000000Z",
                "accounts": [],
                "link": "https://ob.gocardless.com/psd2/start/req-new"
            }),
        ),
        ("GET", ["accounts", id, rest @ ..]) => {
            let Some(account) = config.accounts.iter().find(|a| a.id == *id) else {
                return (
                    404,
                    "Not Found",
                    json!({ "summary": "Account not found", "status_code": 404 }),
                );
            };
            account_resource(account, rest)
        }
        _ => (
            404,
            "Not Found",
            json!({ "summary": "Endpoint not found", "status_code": 404 }),
        ),
    }
}

fn requisition_body(config: &MockConfig) -> JsonValue {
    let ids: Vec<&str> = config.accounts.iter().map(|a| a.id.as_str()).collect();
    json!({
        "id": config.requisition_id,
        "created": "2024-05-01T12:00:00.000000Z",
        "status": "LN",
        "institution_id": "PKO_BPKOPLPW",
        "accounts": ids,
        "link": format!("https://ob.gocardless.com/psd2/start/{}", config.requisition_id)
    })
}

fn account_resource(account: &MockAccount, rest: &[&str]) -> (u16, &'static str, JsonValue) {
    match rest {
        [] => (
            200,
            "OK",
            json!({
                "id": account.id,
                "created": "2024-05-01T12:00:00.000000Z",
                "last_accessed": "2024-05-02T08:30:00.000000Z",
                "iban": "PL61109010140000071219812874",
                "institution_id": "PKO_BPKOPLPW",
                "status": "READY",
                "owner_name": "Jan Kowalski"
            }),
        ),
        ["transactions"] => match account.fail_transactions {
            Some(500) => (
                500,
                "Internal Server Error",
                json!({ "summary": "Internal error", "status_code": 500 }),
            ),
            Some(_) => (
                429,
                "Too Many Requests",
                json!({ "summary": "Rate limit exceeded", "status_code": 429 }),
            ),
            None => {
                let booked: Vec<JsonValue> = (0..account.booked)
                    .map(|i| {
                        json!({
                            "transactionId": format!("{}-tx-{}", account.id, i + 1),
                            "bookingDate": format!("2024-04-{:02}", (i % 28) + 1),
                            "transactionAmount": { "amount": "-12.50", "currency": "PLN" },
                            "remittanceInformationUnstructured": format!("ZABKA #{}", i + 1)
                        })
                    })
                    .collect();
                (
                    200,
                    "OK",
                    json!({ "transactions": { "booked": booked, "pending": [] } }),
                )
            }
        },
        ["balances"] => (
            200,
            "OK",
            json!({
                "balances": [{
                    "balanceAmount": { "amount": "1520.33", "currency": "PLN" },
                    "balanceType": "closingBooked"
                }]
            }),
        ),
        ["details"] => (
            200,
            "OK",
            json!({
                "account": { "currency": "PLN", "ownerName": "Jan Kowalski", "product": "Konto" }
            }),
        ),
        _ => (
            404,
            "Not Found",
            json!({ "summary": "Endpoint not found", "status_code": 404 }),
        ),
    }
}

fn send_response(stream: &mut TcpStream, status: u16, status_text: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::adapters::gocardless::GoCardlessClient;
    use crate::adapters::storage::MemoryStorage;
    use crate::config::{Config, Credentials};
    use crate::domain::result::Error;
    use crate::domain::{BankKey, SyncOutcome};
    use crate::ports::{AccessToken, ApiPath, CredentialProvider, ResourceFetcher};
    use crate::services::{AccountAggregator, AuthorizationService};

    fn client(server: &MockGoCardlessServer) -> GoCardlessClient {
        GoCardlessClient::new(
            Credentials {
                secret_id: "id".to_string(),
                secret_key: "key".to_string(),
            },
            &server.base_url(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn config(server: &MockGoCardlessServer) -> Config {
        let mut config = Config::default();
        config.api_base_url = server.base_url();
        config.credentials = Credentials {
            secret_id: "id".to_string(),
            secret_key: "key".to_string(),
        };
        config
            .bank_authorization_ids
            .insert("PKO".to_string(), "req-1".to_string());
        config.owner.name = "Jan".to_string();
        config.owner.last_name = "Kowalski".to_string();
        config
    }

    #[tokio::test]
    async fn test_token_exchange() {
        let server = MockGoCardlessServer::start(MockConfig::default()).unwrap();
        let token = client(&server).get_token().await.unwrap();
        assert_eq!(token.as_str(), MOCK_TOKEN);
    }

    #[tokio::test]
    async fn test_token_failure_carries_body() {
        let server = MockGoCardlessServer::start(MockConfig {
            fail_auth: true,
            ..Default::default()
        })
        .unwrap();

        let err = client(&server).get_token().await.unwrap_err();
        match err {
            Error::Auth(message) => {
                assert!(message.contains("401"));
                assert!(message.contains("No active account found"));
            }
            other => panic!("expected auth error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_json_reports_status() {
        let server = MockGoCardlessServer::start(MockConfig::default()).unwrap();
        let client = client(&server);
        let token = AccessToken::new(MOCK_TOKEN);

        let requisition = client
            .fetch_json(ApiPath::Requisition("req-1"), &token)
            .await
            .unwrap();
        assert_eq!(requisition["accounts"], json!(["acc-1", "acc-2"]));

        let err = client
            .fetch_json(ApiPath::Requisition("missing"), &token)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(!err.is_credential_expired());
    }

    #[tokio::test]
    async fn test_fetch_json_detects_expiry() {
        let server = MockGoCardlessServer::start(MockConfig {
            expired_requisition: true,
            ..Default::default()
        })
        .unwrap();

        let err = client(&server)
            .fetch_json(ApiPath::Requisition("req-1"), &AccessToken::new(MOCK_TOKEN))
            .await
            .unwrap_err();
        assert!(err.is_credential_expired());
    }

    #[tokio::test]
    async fn test_fetch_json_timeout() {
        let server = MockGoCardlessServer::start(MockConfig {
            delay_ms: 1500,
            ..Default::default()
        })
        .unwrap();

        let client = GoCardlessClient::new(
            Credentials::default(),
            &server.base_url(),
            Duration::from_millis(200),
        )
        .unwrap();
        let err = client
            .fetch_json(ApiPath::Account("acc-1"), &AccessToken::new(MOCK_TOKEN))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_full_sync_against_mock_server() {
        let server = MockGoCardlessServer::start(MockConfig::default()).unwrap();
        let config = config(&server);
        let api = Arc::new(client(&server));
        let storage = Arc::new(MemoryStorage::new());
        let aggregator = AccountAggregator::new(
            Arc::new(config),
            api.clone(),
            api,
            storage.clone(),
        );

        let outcome = aggregator.sync_bank(BankKey::Pko).await.unwrap();
        assert_eq!(
            outcome,
            SyncOutcome::Uploaded {
                count: 1,
                key: "Jan Kowalski PKO_BPKOPLPW.json".to_string()
            }
        );

        let stored = storage.get("Jan Kowalski PKO_BPKOPLPW.json").unwrap();
        assert_eq!(stored.content_type, "application/json");
        let doc: JsonValue = serde_json::from_slice(&stored.bytes).unwrap();
        let entries = doc.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["metadata"]["id"], "acc-1");
        assert_eq!(
            entries[0]["transactions"]["transactions"]["booked"]
                .as_array()
                .unwrap()
                .len(),
            3
        );
        assert_eq!(entries[1]["user_full_name"], "Jan Kowalski");

        // token + requisition + 4 per account
        assert_eq!(server.request_count(), 10);
    }

    #[tokio::test]
    async fn test_failing_account_is_skipped() {
        let server = MockGoCardlessServer::start(MockConfig {
            accounts: vec![MockAccount::failing("acc-bad", 500), MockAccount::new("acc-ok", 2)],
            ..Default::default()
        })
        .unwrap();
        let api = Arc::new(client(&server));
        let storage = Arc::new(MemoryStorage::new());
        let aggregator =
            AccountAggregator::new(Arc::new(config(&server)), api.clone(), api, storage.clone());

        let outcome = aggregator.sync_bank(BankKey::Pko).await.unwrap();
        assert!(matches!(outcome, SyncOutcome::Uploaded { count: 1, .. }));
        assert!(server
            .paths()
            .iter()
            .any(|p| p == "GET /accounts/acc-bad/transactions/"));
    }

    #[tokio::test]
    async fn test_create_link_against_mock_server() {
        let server = MockGoCardlessServer::start(MockConfig::default()).unwrap();
        let mut config = config(&server);
        config.redirect_url = Some("https://example.com/done".to_string());
        let api = Arc::new(client(&server));
        let service = AuthorizationService::new(Arc::new(config), api.clone(), api.clone(), api);

        let link = service.create_link(BankKey::Mbank).await.unwrap();
        assert_eq!(link.requisition_id, "req-new");
        assert_eq!(link.link, "https://ob.gocardless.com/psd2/start/req-new");
        assert_eq!(
            server.paths(),
            vec![
                "POST /token/new/".to_string(),
                "POST /agreements/enduser/".to_string(),
                "POST /requisitions/".to_string(),
            ]
        );
    }
}
