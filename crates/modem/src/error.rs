//! Modem error taxonomy and retry classification.

/// How the delivery worker should react to a failed send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retryability {
    /// Transient: return the job to the queue with backoff.
    Retry,
    /// Permanent: mark the message failed, no further attempts.
    Fatal,
    /// The circuit is open: defer the job without counting an attempt.
    Snooze,
}

/// Errors from the modem client, classified per failure mode.
#[derive(Debug, thiserror::Error)]
pub enum ModemError {
    /// The circuit breaker rejected the call without touching the network.
    #[error("Modem circuit is open")]
    CircuitOpen,

    /// The modem answered with a non-success HTTP status.
    #[error("Modem returned HTTP {0}")]
    Http(u16),

    /// The request exceeded the per-call timeout.
    #[error("Modem request timed out")]
    Timeout,

    /// Connection-level failure (refused, reset, DNS, ...).
    #[error("Modem transport error: {0}")]
    Transport(String),

    /// The response body was not the XML we expect.
    #[error("Modem response parse error: {0}")]
    Parse(String),

    /// The modem reported an application-level error code.
    #[error("{}", code_message(*.0))]
    Code(u16),
}

/// Modem application error codes observed on E303/E3372 firmware.
pub mod codes {
    /// Modem busy with a previous operation.
    pub const BUSY: u16 = 113;
    /// On-device SMS storage is full; requires operator intervention.
    pub const BOX_FULL: u16 = 114;
    /// Network error.
    pub const NETWORK_ERROR: u16 = 115;
    /// The destination number was rejected.
    pub const INVALID_PHONE: u16 = 117;
    /// Network temporarily unavailable.
    pub const NETWORK_UNAVAILABLE: u16 = 118;
}

fn code_message(code: u16) -> String {
    match code {
        codes::BUSY => "Modem busy (113)".into(),
        codes::BOX_FULL => "SMS storage full (114)".into(),
        codes::NETWORK_ERROR => "Network error (115)".into(),
        codes::INVALID_PHONE => "Invalid phone number (117)".into(),
        codes::NETWORK_UNAVAILABLE => "Network temporarily unavailable (118)".into(),
        other => format!("Modem error code {other}"),
    }
}

impl ModemError {
    /// Classify this error for the delivery worker.
    ///
    /// Unknown numeric codes default to retryable, the fail-safe choice
    /// for codes this firmware generation has not been seen to emit.
    pub fn retryability(&self) -> Retryability {
        match self {
            ModemError::CircuitOpen => Retryability::Snooze,
            ModemError::Timeout | ModemError::Transport(_) => Retryability::Retry,
            ModemError::Http(status) if (500..600).contains(&u32::from(*status)) => {
                Retryability::Retry
            }
            // 4xx from the web interface will not get better on its own.
            ModemError::Http(_) => Retryability::Fatal,
            // Garbage XML marks the message failed but still trips the
            // breaker (a wedged modem tends to return garbage repeatedly).
            ModemError::Parse(_) => Retryability::Fatal,
            ModemError::Code(codes::BOX_FULL) | ModemError::Code(codes::INVALID_PHONE) => {
                Retryability::Fatal
            }
            ModemError::Code(_) => Retryability::Retry,
        }
    }

    /// Whether this failure counts toward the circuit breaker.
    ///
    /// A fast-failed call must not re-trip the breaker that produced it.
    pub fn counts_for_breaker(&self) -> bool {
        !matches!(self, ModemError::CircuitOpen)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
