use rusqlite::Connection;

use crate::error::Result;

/// Initialise the notification schema in `conn`.
///
/// Creates the `notifications` table (idempotent) and an index on
/// `(status, scheduled_at)` so the per-minute due query stays cheap even
/// with a large backlog of sent rows.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS notifications (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            chat_id      INTEGER NOT NULL,
            payload      TEXT    NOT NULL,
            scheduled_at TEXT    NOT NULL,   -- canonical minute key, %Y-%m-%dT%H:%M
            status       TEXT    NOT NULL DEFAULT 'pending',
            created_at   TEXT    NOT NULL
        ) STRICT;

        -- Due query: SELECT … WHERE status = 'pending' AND scheduled_at = ?
        CREATE INDEX IF NOT EXISTS idx_notifications_due
            ON notifications (status, scheduled_at);
        ",
    )?;
    Ok(())
}
