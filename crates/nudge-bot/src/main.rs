use std::sync::Arc;

use tracing::info;

use nudge_core::delivery::NotificationDelivery;
use nudge_dispatch::DispatchEngine;
use nudge_store::NotificationStore;
use nudge_telegram::TelegramAdapter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "nudge_bot=info,nudge_dispatch=info,nudge_telegram=info,nudge_store=info"
                        .into()
                }),
        )
        .init();

    // load config: NUDGE_CONFIG env > ~/.nudge/nudge.toml
    // No fallback to defaults — the bot token is required.
    let config_path = std::env::var("NUDGE_CONFIG").ok();
    let config = nudge_core::config::NudgeConfig::load(config_path.as_deref())
        .map_err(|e| anyhow::anyhow!("cannot start: {e}"))?;

    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");

    // Separate connections for the inbound handler and the dispatch engine;
    // SQLite row-level atomicity covers concurrent insert vs. query+update.
    let handler_conn = rusqlite::Connection::open(db_path)?;
    handler_conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    let store = Arc::new(NotificationStore::new(handler_conn)?);

    let engine_store = NotificationStore::new(rusqlite::Connection::open(db_path)?)?;

    let pending = store.list_pending()?;
    info!(count = pending.len(), "pending notifications loaded");

    // Fired-task channel: DispatchEngine → Telegram delivery task
    let (fired_tx, fired_rx) = tokio::sync::mpsc::channel::<NotificationDelivery>(256);
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let engine = DispatchEngine::new(engine_store, fired_tx);
    let engine_task = tokio::spawn(engine.run(shutdown_rx));

    // Blocks until the dispatcher's ctrl-c handler fires.
    let adapter = TelegramAdapter::new(&config.telegram, Arc::clone(&store));
    adapter.run(fired_rx).await;

    let _ = shutdown_tx.send(true);
    let _ = engine_task.await;
    info!("shutdown complete");
    Ok(())
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
