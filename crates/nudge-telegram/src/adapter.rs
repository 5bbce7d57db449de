//! Telegram channel adapter.
//!
//! Wraps a teloxide `Bot` + `Dispatcher` and drives the long-polling event
//! loop until the process exits. Long polling — no public URL required.

use std::sync::Arc;

use teloxide::prelude::*;
use tracing::info;

use nudge_core::config::TelegramConfig;
use nudge_core::delivery::NotificationDelivery;
use nudge_store::NotificationStore;

use crate::handler::handle_message;

pub struct TelegramAdapter {
    config: TelegramConfig,
    store: Arc<NotificationStore>,
}

impl TelegramAdapter {
    pub fn new(config: &TelegramConfig, store: Arc<NotificationStore>) -> Self {
        Self {
            config: config.clone(),
            store,
        }
    }

    /// Connect to Telegram and drive the long-polling loop.
    ///
    /// Spawns the proactive delivery task for `delivery_rx` first, then
    /// attaches the inbound handler and blocks until the dispatcher stops
    /// (ctrl-c).
    pub async fn run(self, delivery_rx: tokio::sync::mpsc::Receiver<NotificationDelivery>) {
        let bot = Bot::new(&self.config.bot_token);

        tokio::spawn(crate::delivery::run_delivery(bot.clone(), delivery_rx));

        info!("telegram: starting long-polling dispatcher");

        let store = Arc::clone(&self.store);
        let handler = Update::filter_message().endpoint(handle_message);

        Dispatcher::builder(bot, handler)
            .dependencies(dptree::deps![store])
            .default_handler(|_upd| async {})
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }
}
