//! Pure domain logic for the SMS gateway.
//!
//! This crate has no internal dependencies so it can be used by the
//! persistence layer, the delivery pipeline, and the HTTP surface alike:
//!
//! - [`message`] — message state machine and input validation.
//! - [`api_keys`] — API-key secret generation, hashing, and verification.
//! - [`rate_limit`] — in-process per-key hourly quota counters.
//! - [`error`] — the shared domain error taxonomy.

pub mod api_keys;
pub mod error;
pub mod message;
pub mod rate_limit;
pub mod types;

pub use error::CoreError;
