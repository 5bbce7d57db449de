use std::sync::Mutex;

use chrono::NaiveDateTime;
use rusqlite::Connection;
use tracing::debug;

use crate::db::init_db;
use crate::error::{Result, StoreError};
use crate::types::{
    minute_key, parse_minute_key, truncate_to_minute, NotificationTask, StoredTask, TaskStatus,
};

/// SQLite-backed collection of notification tasks.
///
/// Thread-safe: wraps its connection in a Mutex. Concurrent writers from a
/// second `NotificationStore` on the same database file are fine — every
/// operation is a single row-level statement, so SQLite's own atomicity is
/// the synchronisation point, not in-process locking.
pub struct NotificationStore {
    conn: Mutex<Connection>,
}

impl NotificationStore {
    /// Wrap `conn`, initialising the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Persist `task` with status `pending` and return the stored record.
    ///
    /// The scheduled time is truncated to its minute here, so every row in
    /// the table is minute-aligned by construction.
    pub fn insert(&self, task: NotificationTask) -> Result<StoredTask> {
        let conn = self.conn.lock().unwrap();
        let scheduled_at = truncate_to_minute(task.scheduled_at);
        let key = minute_key(scheduled_at);
        let created_at = chrono::Local::now().to_rfc3339();

        conn.execute(
            "INSERT INTO notifications (chat_id, payload, scheduled_at, status, created_at)
             VALUES (?1, ?2, ?3, 'pending', ?4)",
            rusqlite::params![task.chat_id, task.payload, key, created_at],
        )?;
        let id = conn.last_insert_rowid();
        debug!(task_id = id, chat_id = task.chat_id, scheduled_at = %key, "task inserted");

        Ok(StoredTask {
            id,
            chat_id: task.chat_id,
            payload: task.payload,
            scheduled_at,
            status: TaskStatus::Pending,
            created_at,
        })
    }

    /// Every pending task scheduled for the minute containing `instant`.
    ///
    /// Order is unspecified. Rows already `sent` or `missed` are never
    /// returned, so calling this twice within one minute cannot surface a
    /// task the dispatcher has already taken.
    pub fn find_due_at(&self, instant: NaiveDateTime) -> Result<Vec<StoredTask>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT id, chat_id, payload, scheduled_at, status, created_at
             FROM notifications
             WHERE status = 'pending' AND scheduled_at = ?1",
        )?;
        let tasks = stmt
            .query_map([minute_key(instant)], row_to_task)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(tasks)
    }

    /// Flip a task to `sent`. Returns `TaskNotFound` if no row was updated.
    pub fn mark_sent(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE notifications SET status = 'sent' WHERE id = ?1",
            [id],
        )?;
        if n == 0 {
            return Err(StoreError::TaskNotFound { id });
        }
        Ok(())
    }

    /// Mark every pending task scheduled strictly before `instant`'s minute
    /// as `missed`. Returns how many rows changed.
    ///
    /// Run once at engine startup: such tasks can never match a future
    /// minute, and leaving them `pending` would hide that they were lost.
    pub fn mark_missed_before(&self, instant: NaiveDateTime) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE notifications SET status = 'missed'
             WHERE status = 'pending' AND scheduled_at < ?1",
            [minute_key(instant)],
        )?;
        Ok(n)
    }

    /// All pending tasks, soonest first.
    pub fn list_pending(&self) -> Result<Vec<StoredTask>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, chat_id, payload, scheduled_at, status, created_at
             FROM notifications
             WHERE status = 'pending'
             ORDER BY scheduled_at",
        )?;
        let tasks = stmt
            .query_map([], row_to_task)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(tasks)
    }
}

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredTask> {
    let key: String = row.get(3)?;
    let status_str: String = row.get(4)?;
    Ok(StoredTask {
        id: row.get(0)?,
        chat_id: row.get(1)?,
        payload: row.get(2)?,
        scheduled_at: parse_minute_key(&key).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("bad minute key: {key}").into(),
            )
        })?,
        status: status_str.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, e.into())
        })?,
        created_at: row.get(5)?,
    })
}
