//! Authentication middleware.
//!
//! - [`api_key::require_api_key`] — layer for the messages routes:
//!   validates the `X-API-Key` credential, enforces the per-key hourly
//!   quota, and stamps `X-RateLimit-*` headers on every response.
//! - [`api_key::AuthedKey`] — extractor for the authenticated key.
//! - [`admin::RequireAdmin`] — static-token guard for operator endpoints.

pub mod admin;
pub mod api_key;
