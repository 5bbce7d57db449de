//! Proactive delivery — sends dispatcher-fired notifications to their chats.

use teloxide::prelude::*;
use tracing::{info, warn};

use nudge_core::delivery::NotificationDelivery;

/// Background task that receives fired notifications and delivers them.
///
/// Spawned once in `adapter.rs` when the adapter starts; runs until the
/// dispatch engine drops its sender. A failed send is logged and the
/// notification is gone — the task was already marked `sent` when it left
/// the store, so there is nothing to retry.
pub async fn run_delivery(bot: Bot, mut rx: tokio::sync::mpsc::Receiver<NotificationDelivery>) {
    info!("telegram delivery task started");
    while let Some(delivery) = rx.recv().await {
        let chat_id = ChatId(delivery.chat_id);
        let text = notification_text(&delivery.payload);

        match bot.send_message(chat_id, text).await {
            Ok(_) => info!(
                task_id = delivery.task_id,
                chat_id = delivery.chat_id,
                "notification delivered"
            ),
            Err(e) => warn!(
                task_id = delivery.task_id,
                chat_id = delivery.chat_id,
                error = %e,
                "notification delivery failed"
            ),
        }
    }
    info!("telegram delivery task exiting (channel closed)");
}

fn notification_text(payload: &str) -> String {
    format!("new notification - {payload}")
}
