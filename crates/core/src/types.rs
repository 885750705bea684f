/// Messages and API keys are identified by opaque UUIDs assigned at creation.
pub type EntityId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
