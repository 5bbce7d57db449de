//! `nudge-store` — SQLite persistence for notification tasks.
//!
//! # Overview
//!
//! Tasks are rows in a `notifications` table. The scheduled time is
//! truncated to a canonical minute key on insert, so "due" is a plain
//! string-equality match and second components can never leak into the
//! matching semantics.
//!
//! # Status lifecycle
//!
//! | Status    | Meaning                                              |
//! |-----------|------------------------------------------------------|
//! | `pending` | Waiting for its scheduled minute                     |
//! | `sent`    | Handed to the transport once; never dispatched again |
//! | `missed`  | Scheduled minute passed while no engine was running  |

pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use error::{Result, StoreError};
pub use store::NotificationStore;
pub use types::{minute_key, NotificationTask, StoredTask, TaskStatus};
