use chrono::NaiveDateTime;

/// Storage format of `scheduled_at` — also the due-matching key.
pub(crate) const MINUTE_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Truncate `at` to minute precision and render the canonical key.
///
/// The key sorts lexicographically in chronological order, so range
/// comparisons in SQL work on the raw TEXT column.
pub fn minute_key(at: NaiveDateTime) -> String {
    at.format(MINUTE_FORMAT).to_string()
}

pub(crate) fn parse_minute_key(key: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(key, MINUTE_FORMAT).ok()
}

pub(crate) fn truncate_to_minute(at: NaiveDateTime) -> NaiveDateTime {
    use chrono::Timelike;
    at.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

/// Dispatch state of a stored task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Waiting for its scheduled minute.
    Pending,
    /// Handed to the transport once; never a dispatch candidate again.
    Sent,
    /// The scheduled minute passed while no engine was running.
    Missed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Sent => "sent",
            TaskStatus::Missed => "missed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "sent" => Ok(TaskStatus::Sent),
            "missed" => Ok(TaskStatus::Missed),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// A notification task that has not been persisted yet.
///
/// Construction is pure — validation already happened in the parser; the
/// store assigns the id on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationTask {
    /// Telegram chat the payload goes back to.
    pub chat_id: i64,
    /// Text to deliver.
    pub payload: String,
    /// Requested delivery time; truncated to the minute on insert.
    pub scheduled_at: NaiveDateTime,
}

impl NotificationTask {
    pub fn new(chat_id: i64, scheduled_at: NaiveDateTime, payload: impl Into<String>) -> Self {
        Self {
            chat_id,
            payload: payload.into(),
            scheduled_at,
        }
    }
}

/// A persisted task record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTask {
    /// Rowid — assigned by SQLite on insert.
    pub id: i64,
    pub chat_id: i64,
    pub payload: String,
    /// Minute-aligned delivery time.
    pub scheduled_at: NaiveDateTime,
    pub status: TaskStatus,
    /// ISO-8601 insert timestamp.
    pub created_at: String,
}
