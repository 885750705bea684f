//! Send-rate limiter for the modem hardware.
//!
//! A token bucket over a rolling window: at most `capacity` sends may
//! *start* within any `window`-long span. The bucket tracks the start
//! instants of recent sends; a slot frees when the oldest falls out of
//! the window.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Rolling-window token bucket. Safe to share behind an `Arc`.
#[derive(Debug)]
pub struct SendRateLimiter {
    capacity: usize,
    window: Duration,
    starts: Mutex<VecDeque<Instant>>,
}

impl SendRateLimiter {
    pub fn new(capacity: usize, window: Duration) -> Self {
        Self {
            capacity,
            window,
            starts: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Try to take a slot at `now`. On refusal, returns how long until
    /// the next slot frees.
    fn try_acquire_at(&self, now: Instant) -> Result<(), Duration> {
        let mut starts = self.starts.lock().expect("rate limiter mutex poisoned");
        while let Some(front) = starts.front() {
            if now.duration_since(*front) >= self.window {
                starts.pop_front();
            } else {
                break;
            }
        }
        if starts.len() < self.capacity {
            starts.push_back(now);
            return Ok(());
        }
        // Deque is non-empty here: capacity slots are all inside the window.
        let oldest = *starts.front().expect("non-empty bucket");
        Err(self.window - now.duration_since(oldest))
    }

    /// Wait for a send slot.
    pub async fn acquire(&self) {
        loop {
            match self.try_acquire_at(Instant::now()) {
                Ok(()) => return,
                Err(wait) => tokio::time::sleep(wait).await,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
