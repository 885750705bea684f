//! Session/token cache for the modem's authentication handshake.
//!
//! Concurrent callers may race to refresh an expired entry; every refresh
//! produces a valid pair, so last-write-wins is safe.

use std::time::{Duration, Instant};

use tokio::sync::RwLock;

/// How long a `(session, token)` pair stays usable.
const SESSION_TTL: Duration = Duration::from_secs(300);

/// A cached handshake result.
#[derive(Debug, Clone)]
pub(crate) struct SessionTokens {
    /// Value of `<SesInfo>`, sent back as the `Cookie` header.
    pub session_id: String,
    /// Value of `<TokInfo>`, sent back as `__RequestVerificationToken`.
    pub verification_token: String,
}

#[derive(Debug)]
struct Entry {
    tokens: SessionTokens,
    expires_at: Instant,
}

#[derive(Debug, Default)]
pub(crate) struct SessionCache {
    entry: RwLock<Option<Entry>>,
}

impl SessionCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Return the cached pair if it has not expired.
    pub(crate) async fn get(&self) -> Option<SessionTokens> {
        let guard = self.entry.read().await;
        guard
            .as_ref()
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.tokens.clone())
    }

    /// Replace the cached pair, restarting the TTL.
    pub(crate) async fn store(&self, tokens: SessionTokens) {
        let mut guard = self.entry.write().await;
        *guard = Some(Entry {
            tokens,
            expires_at: Instant::now() + SESSION_TTL,
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
