use thiserror::Error;

/// Errors that can occur within the notification store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No task with the given ID exists in the store.
    #[error("Task not found: {id}")]
    TaskNotFound { id: i64 },
}

pub type Result<T> = std::result::Result<T, StoreError>;
