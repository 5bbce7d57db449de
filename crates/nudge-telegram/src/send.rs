//! Outbound message helper for the Telegram adapter.

use teloxide::prelude::*;
use tracing::{debug, warn};

/// Send `text` to `chat_id`, logging the outcome.
///
/// A non-ok response from Telegram is a warning, never an error the caller
/// has to handle — every reply and notification in this bot is
/// fire-and-forget.
pub async fn send_text(bot: &Bot, chat_id: ChatId, text: &str) {
    match bot.send_message(chat_id, text).await {
        Ok(_) => debug!(chat_id = chat_id.0, "message sent"),
        Err(e) => warn!(chat_id = chat_id.0, error = %e, "message delivery failed"),
    }
}
