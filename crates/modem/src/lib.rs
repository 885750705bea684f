//! HTTP client for Huawei E303/E3372-class USB modems.
//!
//! Provides the four gateway operations (send, inbox listing, delivery
//! status, health check) over the modem's XML web interface, with:
//!
//! - [`client::ModemClient`] — authenticated request plumbing with the
//!   session/token handshake cached for five minutes.
//! - [`breaker::CircuitBreaker`] — process-wide guard that fails fast after
//!   five consecutive failures and, once the cooldown elapses, lets a
//!   single probe through to test recovery.
//! - [`error::ModemError`] — classified errors carrying their retry policy.

pub mod breaker;
pub mod client;
pub mod error;
pub mod types;

mod session;
mod wire;

pub use breaker::CircuitState;
pub use client::ModemClient;
pub use error::{ModemError, Retryability};
pub use types::{DeliveryStatus, InboxMessage, ModemHealth};
