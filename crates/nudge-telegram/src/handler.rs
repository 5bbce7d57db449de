//! Inbound message handler registered in the teloxide Dispatcher.

use std::sync::Arc;

use teloxide::prelude::*;
use tracing::{error, info, warn};

use nudge_core::parse::parse;
use nudge_store::{NotificationStore, NotificationTask};

use crate::send;

/// The only reserved command; never treated as a notification request.
pub const START_COMMAND: &str = "/start";

const GREETING: &str = "Hi! I am a reminder bot.\n\
    Send me a message in the format <dd.MM.yyyy HH:mm Notification text> \
    (without the brackets) and I will send the text back to you at that minute.\n\
    For example: 24.12.2030 18:30 wrap the presents";

const SAVED: &str = "Your notification saved";

const BAD_REQUEST: &str = "Incorrect notification text. \
    Enter the notification in the format <dd.MM.yyyy HH:mm Notification text> \
    without quotes and brackets";

const SERVICE_ERROR: &str =
    "Something went wrong on our side and the notification was not saved. Please try again later.";

/// Runs for every incoming `Message`.
///
/// Always returns `Ok(())` — a bad message gets an instructional reply and
/// an internal failure gets a logged apology, but nothing here may make the
/// dispatcher treat the update as unprocessed.
pub async fn handle_message(
    bot: Bot,
    msg: Message,
    store: Arc<NotificationStore>,
) -> ResponseResult<()> {
    // Stickers, photos and other non-text updates carry no request.
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let reply = build_reply(&store, msg.chat.id.0, text);
    send::send_text(&bot, msg.chat.id, &reply).await;
    Ok(())
}

/// Route one inbound text and return the reply to send.
///
/// Stateless between calls; the store is the only thing written to.
fn build_reply(store: &NotificationStore, chat_id: i64, text: &str) -> String {
    if text == START_COMMAND {
        return GREETING.to_string();
    }

    match parse(text) {
        Ok(req) => {
            let task = NotificationTask::new(chat_id, req.scheduled_at, req.payload);
            match store.insert(task) {
                Ok(stored) => {
                    info!(
                        task_id = stored.id,
                        chat_id,
                        scheduled_at = %stored.scheduled_at,
                        "notification saved"
                    );
                    SAVED.to_string()
                }
                Err(e) => {
                    error!(chat_id, "failed to persist notification: {e}");
                    SERVICE_ERROR.to_string()
                }
            }
        }
        Err(e) => {
            warn!(chat_id, "rejected notification request: {e}");
            BAD_REQUEST.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn store() -> NotificationStore {
        NotificationStore::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn start_command_greets_and_persists_nothing() {
        let store = store();
        let reply = build_reply(&store, 1, "/start");

        assert_eq!(reply, GREETING);
        assert!(store.list_pending().unwrap().is_empty());
    }

    #[test]
    fn start_command_with_trailing_text_is_not_a_greeting() {
        let store = store();
        let reply = build_reply(&store, 1, "/start now");

        assert_eq!(reply, BAD_REQUEST);
        assert!(store.list_pending().unwrap().is_empty());
    }

    #[test]
    fn valid_request_is_saved_and_confirmed() {
        let store = store();
        let reply = build_reply(&store, 42, "01.01.2030 10:00 happy new year");

        assert_eq!(reply, SAVED);
        let pending = store.list_pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].chat_id, 42);
        assert_eq!(pending[0].payload, "happy new year");
    }

    #[test]
    fn malformed_text_is_rejected_with_instructions() {
        let store = store();
        let reply = build_reply(&store, 1, "hello world");

        assert_eq!(reply, BAD_REQUEST);
        assert!(store.list_pending().unwrap().is_empty());
    }

    #[test]
    fn invalid_calendar_date_is_rejected_with_instructions() {
        let store = store();
        let reply = build_reply(&store, 1, "31.02.2030 10:00 !!!");

        assert_eq!(reply, BAD_REQUEST);
        assert!(store.list_pending().unwrap().is_empty());
    }

    #[test]
    fn each_message_is_handled_independently() {
        let store = store();

        assert_eq!(build_reply(&store, 1, "garbage"), BAD_REQUEST);
        assert_eq!(build_reply(&store, 1, "01.01.2030 10:00 still works"), SAVED);
        assert_eq!(build_reply(&store, 1, "more garbage"), BAD_REQUEST);

        assert_eq!(store.list_pending().unwrap().len(), 1);
    }
}
