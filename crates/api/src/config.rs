use std::time::Duration;

use smsgate_core::api_keys::DEFAULT_HOURLY_LIMIT;

/// Server configuration loaded from environment variables.
///
/// All fields except `DATABASE_URL` (read separately at startup) have
/// defaults suitable for a single-node deployment next to the modem.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Modem root URL (default: `http://192.168.8.1`).
    pub modem_base_url: String,
    /// Inbound poll period (default: 30 s).
    pub modem_poll_interval: Duration,
    /// Status monitor period (default: 60 s).
    pub modem_health_check_interval: Duration,
    /// Fallback hourly per-key quota (default: 100).
    pub default_rate_limit: u32,
    /// Simultaneous sends (default: 6, the hardware limit).
    pub sms_send_concurrency: usize,
    /// Sends started per rolling 60 s (default: 6, the hardware limit).
    pub sms_send_rate_limit: usize,
    /// Static bearer token for the admin key-management endpoints.
    /// Unset disables those endpoints entirely.
    pub admin_token: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default                 |
    /// |----------------------------------|-------------------------|
    /// | `HOST`                           | `0.0.0.0`               |
    /// | `PORT`                           | `8080`                  |
    /// | `CORS_ORIGINS`                   | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`           | `30`                    |
    /// | `MODEM_BASE_URL`                 | `http://192.168.8.1`    |
    /// | `MODEM_POLL_INTERVAL`            | `30000` (ms)            |
    /// | `MODEM_HEALTH_CHECK_INTERVAL`    | `60000` (ms)            |
    /// | `DEFAULT_RATE_LIMIT`             | `100`                   |
    /// | `SMS_SEND_CONCURRENCY`           | `6`                     |
    /// | `SMS_SEND_RATE_LIMIT`            | `6`                     |
    /// | `ADMIN_TOKEN`                    | unset (admin disabled)  |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = parsed_env("PORT", 8080);

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = parsed_env("REQUEST_TIMEOUT_SECS", 30);

        let modem_base_url =
            std::env::var("MODEM_BASE_URL").unwrap_or_else(|_| "http://192.168.8.1".into());

        let modem_poll_interval =
            Duration::from_millis(parsed_env("MODEM_POLL_INTERVAL", 30_000));
        let modem_health_check_interval =
            Duration::from_millis(parsed_env("MODEM_HEALTH_CHECK_INTERVAL", 60_000));

        let default_rate_limit: u32 = parsed_env("DEFAULT_RATE_LIMIT", DEFAULT_HOURLY_LIMIT);
        let sms_send_concurrency: usize = parsed_env("SMS_SEND_CONCURRENCY", 6);
        let sms_send_rate_limit: usize = parsed_env("SMS_SEND_RATE_LIMIT", 6);

        let admin_token = std::env::var("ADMIN_TOKEN").ok().filter(|t| !t.is_empty());

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            modem_base_url,
            modem_poll_interval,
            modem_health_check_interval,
            default_rate_limit,
            sms_send_concurrency,
            sms_send_rate_limit,
            admin_token,
        }
    }
}

/// Parse an env var, panicking on malformed values: misconfiguration
/// should fail at startup, not at first use.
fn parsed_env<T: std::str::FromStr>(name: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("{name} must be a valid value: {e}")),
        Err(_) => default,
    }
}
