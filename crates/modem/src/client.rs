//! The modem client: authenticated XML request/response over HTTP.
//!
//! Every public operation is bracketed by the shared circuit breaker:
//! checked before any I/O, with the outcome recorded after. The
//! session/token handshake result is cached for five minutes and refreshed
//! transparently on expiry.

use std::time::Duration;

use chrono::Utc;
use reqwest::Url;

use crate::breaker::{CircuitBreaker, CircuitState};
use crate::error::ModemError;
use crate::session::{SessionCache, SessionTokens};
use crate::types::{DeliveryStatus, InboxMessage, ModemHealth};
use crate::wire;

/// Hard timeout for every HTTP call to the modem.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Inbox box type for received messages.
pub const INBOX: i32 = 1;

/// How many inbox entries a single listing requests.
const INBOX_READ_COUNT: u32 = 50;

const SESSION_PATH: &str = "/api/webserver/SesTokInfo";
const SEND_PATH: &str = "/api/sms/send-sms";
const LIST_PATH: &str = "/api/sms/sms-list";
const STATUS_PATH: &str = "/api/sms/delivery-status";
const MONITORING_PATH: &str = "/api/monitoring/status";

/// Client for a single Huawei E303/E3372-class modem.
///
/// Cheap to share behind an `Arc`; the session cache and circuit breaker
/// are internal and process-wide by construction.
pub struct ModemClient {
    http: reqwest::Client,
    base_url: String,
    /// `Host` header value; some firmware variants reject requests
    /// without it.
    host: String,
    session: SessionCache,
    breaker: CircuitBreaker,
}

impl ModemClient {
    /// Create a client for the modem at `base_url` (e.g. `http://192.168.8.1`).
    ///
    /// Panics on a malformed URL. Misconfiguration should fail at startup,
    /// not on the first send.
    pub fn new(base_url: &str) -> Self {
        Self::with_breaker(base_url, CircuitBreaker::new())
    }

    /// Client with a caller-supplied breaker (tests use short cooldowns).
    pub fn with_breaker(base_url: &str, breaker: CircuitBreaker) -> Self {
        let url = Url::parse(base_url)
            .unwrap_or_else(|e| panic!("Invalid modem base URL '{base_url}': {e}"));
        let host = match (url.host_str(), url.port()) {
            (Some(h), Some(p)) => format!("{h}:{p}"),
            (Some(h), None) => h.to_string(),
            (None, _) => panic!("Modem base URL '{base_url}' has no host"),
        };

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            host,
            session: SessionCache::new(),
            breaker,
        }
    }

    /// Current circuit state, for health reporting.
    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    // -----------------------------------------------------------------------
    // Public operations
    // -----------------------------------------------------------------------

    /// Send one SMS. Returns the modem-assigned message id.
    pub async fn send_sms(&self, phone: &str, content: &str) -> Result<String, ModemError> {
        self.breaker.check()?;
        let result = self.send_sms_inner(phone, content).await;
        self.observe(&result);
        result
    }

    /// List the modem inbox for the given box type (use [`INBOX`] for
    /// received messages). Entries come back ordered by index.
    pub async fn list_inbox(&self, box_type: i32) -> Result<Vec<InboxMessage>, ModemError> {
        self.breaker.check()?;
        let result = self.list_inbox_inner(box_type).await;
        self.observe(&result);
        result
    }

    /// Look up the delivery status of a previously sent message.
    pub async fn get_status(
        &self,
        modem_message_id: &str,
    ) -> Result<DeliveryStatus, ModemError> {
        self.breaker.check()?;
        let result = self.get_status_inner(modem_message_id).await;
        self.observe(&result);
        result
    }

    /// Fetch the modem's monitoring snapshot.
    pub async fn health_check(&self) -> Result<ModemHealth, ModemError> {
        self.breaker.check()?;
        let result = self.health_check_inner().await;
        self.observe(&result);
        result
    }

    // -----------------------------------------------------------------------
    // Operation bodies
    // -----------------------------------------------------------------------

    async fn send_sms_inner(&self, phone: &str, content: &str) -> Result<String, ModemError> {
        let tokens = self.session_tokens().await?;
        let body = wire::build_send_body(phone, content, Utc::now());
        let xml = self.post_xml(SEND_PATH, &tokens, body).await?;
        wire::parse_send_response(&xml)
    }

    async fn list_inbox_inner(&self, box_type: i32) -> Result<Vec<InboxMessage>, ModemError> {
        let tokens = self.session_tokens().await?;
        let body = wire::build_inbox_body(box_type, INBOX_READ_COUNT);
        let xml = self.post_xml(LIST_PATH, &tokens, body).await?;
        wire::parse_inbox(&xml)
    }

    async fn get_status_inner(&self, modem_message_id: &str) -> Result<DeliveryStatus, ModemError> {
        let tokens = self.session_tokens().await?;
        let url = format!(
            "{}{}?message_id={}",
            self.base_url, STATUS_PATH, modem_message_id
        );
        let xml = self.get_xml(&url, Some(&tokens)).await?;
        wire::parse_delivery_status(&xml)
    }

    async fn health_check_inner(&self) -> Result<ModemHealth, ModemError> {
        let tokens = self.session_tokens().await?;
        let url = format!("{}{}", self.base_url, MONITORING_PATH);
        let xml = self.get_xml(&url, Some(&tokens)).await?;
        wire::parse_health(&xml)
    }

    // -----------------------------------------------------------------------
    // Handshake and transport
    // -----------------------------------------------------------------------

    /// Return cached session tokens, performing the handshake on a miss.
    ///
    /// Concurrent callers may each fetch a fresh pair; every pair is
    /// valid, so the cache is simple last-write-wins.
    async fn session_tokens(&self) -> Result<SessionTokens, ModemError> {
        if let Some(tokens) = self.session.get().await {
            return Ok(tokens);
        }

        let url = format!("{}{}", self.base_url, SESSION_PATH);
        let xml = self.get_xml(&url, None).await?;
        let tokens = wire::parse_session_tokens(&xml)?;
        tracing::debug!("Modem session tokens refreshed");
        self.session.store(tokens.clone()).await;
        Ok(tokens)
    }

    async fn post_xml(
        &self,
        path: &str,
        tokens: &SessionTokens,
        body: String,
    ) -> Result<String, ModemError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .header("Host", self.host.as_str())
            .header("Cookie", tokens.session_id.as_str())
            .header("__RequestVerificationToken", tokens.verification_token.as_str())
            .header("Content-Type", "application/xml")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_body(response).await
    }

    async fn get_xml(
        &self,
        url: &str,
        tokens: Option<&SessionTokens>,
    ) -> Result<String, ModemError> {
        let mut request = self.http.get(url).header("Host", self.host.as_str());
        if let Some(tokens) = tokens {
            request = request
                .header("Cookie", tokens.session_id.as_str())
                .header("__RequestVerificationToken", tokens.verification_token.as_str());
        }
        let response = request.send().await.map_err(map_reqwest_error)?;
        read_body(response).await
    }

    /// Feed an operation outcome to the breaker. Fast-failed calls
    /// (`CircuitOpen`) never reach here with I/O behind them, and are
    /// excluded from the failure count.
    fn observe<T>(&self, result: &Result<T, ModemError>) {
        match result {
            Ok(_) => self.breaker.record_success(),
            Err(e) if e.counts_for_breaker() => self.breaker.record_failure(),
            Err(_) => {}
        }
    }
}

/// Check the HTTP status and read the response body.
async fn read_body(response: reqwest::Response) -> Result<String, ModemError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ModemError::Http(status.as_u16()));
    }
    response.text().await.map_err(map_reqwest_error)
}

fn map_reqwest_error(e: reqwest::Error) -> ModemError {
    if e.is_timeout() {
        ModemError::Timeout
    } else {
        ModemError::Transport(e.to_string())
    }
}
