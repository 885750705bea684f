//! Circuit breaker guarding the modem's web interface.
//!
//! One breaker instance is shared by every caller of the modem client.
//! After [`FAILURE_THRESHOLD`] consecutive failures the circuit opens and
//! all operations fail fast with [`ModemError::CircuitOpen`] until the
//! cooldown elapses; the next attempted operation then becomes the single
//! recovery probe, and everyone else keeps failing fast until that probe
//! reports back.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::ModemError;

/// Consecutive failures before the circuit opens.
const FAILURE_THRESHOLD: u32 = 5;

/// How long the circuit stays open before allowing a probe.
const OPEN_COOLDOWN: Duration = Duration::from_secs(300);

/// Externally visible breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    /// Set while the half-open probe is outstanding; cleared by whichever
    /// of `record_success` / `record_failure` resolves it.
    probe_in_flight: bool,
}

/// Shared circuit breaker with interior synchronisation.
///
/// A caller admitted by [`check`](Self::check) must report the outcome of
/// its operation through `record_success` or `record_failure`; the modem
/// client does this unconditionally for every admitted call.
#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    cooldown: Duration,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::with_cooldown(OPEN_COOLDOWN)
    }

    /// Breaker with a custom open cooldown (tests use short ones).
    pub fn with_cooldown(cooldown: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                probe_in_flight: false,
            }),
            cooldown,
        }
    }

    /// Gate a call: `Ok(())` to proceed, `Err(CircuitOpen)` to fail fast.
    ///
    /// When the cooldown has elapsed, exactly one caller is admitted as
    /// the half-open probe; concurrent callers keep failing fast until
    /// the probe's outcome is recorded.
    pub fn check(&self) -> Result<(), ModemError> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Ok(()),
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    Err(ModemError::CircuitOpen)
                } else {
                    inner.probe_in_flight = true;
                    Ok(())
                }
            }
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| at.elapsed())
                    .unwrap_or(Duration::MAX);
                if elapsed >= self.cooldown {
                    inner.state = CircuitState::HalfOpen;
                    inner.probe_in_flight = true;
                    tracing::info!("Modem circuit half-open, probing");
                    Ok(())
                } else {
                    Err(ModemError::CircuitOpen)
                }
            }
        }
    }

    /// Record a successful modem interaction.
    ///
    /// Clears the failure counter, `opened_at`, and any outstanding probe
    /// in every state, so a half-open probe success fully closes the
    /// circuit.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        if inner.state != CircuitState::Closed {
            tracing::info!("Modem circuit closed after successful probe");
        }
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.probe_in_flight = false;
    }

    /// Record a failed modem interaction.
    pub fn record_failure(&self) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::HalfOpen => {
                // Probe failed: straight back to open with a fresh cooldown.
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.probe_in_flight = false;
                tracing::warn!("Modem probe failed, circuit re-opened");
            }
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= FAILURE_THRESHOLD {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                    tracing::warn!(
                        failures = inner.consecutive_failures,
                        "Modem circuit opened"
                    );
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Current state, for telemetry and the health endpoint.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("circuit breaker mutex poisoned")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
