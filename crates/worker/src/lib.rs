//! The delivery pipeline: everything between the job queue and the modem.
//!
//! - [`dispatcher`] — consumes `sms_send` jobs under a concurrency cap and
//!   the hardware send-rate limit, with retry classification.
//! - [`poller`] — discovers inbound SMS without duplication.
//! - [`reconciler`] — promotes `sent` messages to `delivered`/`failed`.
//! - [`monitor`] — health-checks the modem and pauses/resumes the queue.
//! - [`gate`] / [`limiter`] — queue pause gate and send token bucket.
//! - [`last_used`] — bounded async updater for API-key usage timestamps.

pub mod dispatcher;
pub mod gate;
pub mod last_used;
pub mod limiter;
pub mod monitor;
pub mod poller;
pub mod reconciler;

pub use gate::QueueGate;
pub use monitor::ModemStatus;
