/// Primary keys are PostgreSQL BIGSERIAL across all tables.
pub type DbId = i64;

/// Timestamps are always UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
