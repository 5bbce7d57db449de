//! Delivery types — shared between the dispatch engine and the Telegram adapter.

/// A notification the dispatch engine has taken out of the store and handed
/// to the transport. By the time one of these exists the task is already
/// marked `sent`; delivery is fire-and-forget.
#[derive(Debug, Clone)]
pub struct NotificationDelivery {
    /// Originating task id — used for logging.
    pub task_id: i64,
    /// Telegram chat the payload goes back to.
    pub chat_id: i64,
    /// Text to send.
    pub payload: String,
}
