mod api_key_repo;
mod job_repo;
mod message_repo;
mod poll_cursor_repo;

pub use api_key_repo::ApiKeyRepo;
pub use job_repo::{retry_delay_secs, JobRepo};
pub use message_repo::MessageRepo;
pub use poll_cursor_repo::{PollCursorRepo, CURSOR_INBOX};
