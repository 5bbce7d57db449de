use chrono::NaiveDateTime;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use nudge_core::delivery::NotificationDelivery;
use nudge_store::{minute_key, NotificationStore, StoredTask};

/// Drives due-task dispatch at minute granularity.
///
/// Owns its own [`NotificationStore`] (and therefore its own SQLite
/// connection) so ticks never contend with the inbound handler's inserts
/// on a single handle.
pub struct DispatchEngine {
    store: NotificationStore,
    /// Fired tasks are sent here for delivery by the transport adapter.
    fired_tx: mpsc::Sender<NotificationDelivery>,
}

impl DispatchEngine {
    pub fn new(store: NotificationStore, fired_tx: mpsc::Sender<NotificationDelivery>) -> Self {
        Self { store, fired_tx }
    }

    /// Main event loop. Runs until `shutdown` broadcasts `true`.
    ///
    /// Polls every second but fires [`tick`](Self::tick) only when the
    /// wall-clock minute changes, so each minute is processed exactly once
    /// and within a second of its boundary. A failed tick is logged and the
    /// minute is simply over — unprocessed tasks stay `pending`, and tasks
    /// for later minutes are untouched.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("dispatch engine started");

        match self.store.mark_missed_before(now_local()) {
            Ok(n) if n > 0 => warn!(count = n, "overdue tasks marked missed on startup"),
            Err(e) => error!("missed-on-startup sweep failed: {e}"),
            _ => {}
        }

        let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
        let mut last_minute: Option<String> = None;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let now = now_local();
                    let minute = minute_key(now);
                    if last_minute.as_deref() == Some(minute.as_str()) {
                        continue;
                    }
                    last_minute = Some(minute);
                    match self.tick(now) {
                        Ok(0) => {}
                        Ok(n) => info!(count = n, "dispatched due notifications"),
                        Err(e) => error!("dispatch tick failed: {e}"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("dispatch engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Process every task due in the minute containing `now`.
    ///
    /// Returns how many tasks were dispatched. Tasks are handled
    /// independently: one task's failure is logged and the rest still run.
    /// Only the due query itself can fail the whole tick.
    pub fn tick(&self, now: NaiveDateTime) -> nudge_store::Result<usize> {
        let due = self.store.find_due_at(now)?;
        let count = due.len();
        for task in due {
            if let Err(e) = self.dispatch(&task) {
                warn!(task_id = task.id, "task dispatch failed: {e}");
            }
        }
        Ok(count)
    }

    /// Mark one task `sent`, then hand it to the delivery channel.
    ///
    /// Marking comes first: a crash between the two steps must lose the
    /// notification, not deliver it twice.
    fn dispatch(&self, task: &StoredTask) -> nudge_store::Result<()> {
        self.store.mark_sent(task.id)?;

        if task.payload.is_empty() {
            warn!(task_id = task.id, "empty payload, nothing to deliver");
            return Ok(());
        }

        let delivery = NotificationDelivery {
            task_id: task.id,
            chat_id: task.chat_id,
            payload: task.payload.clone(),
        };
        // try_send never blocks the tick; the task stays processed either way.
        if self.fired_tx.try_send(delivery).is_err() {
            warn!(task_id = task.id, "delivery channel full or closed — notification dropped");
        } else {
            info!(task_id = task.id, chat_id = task.chat_id, "notification dispatched");
        }
        Ok(())
    }
}

fn now_local() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use nudge_store::NotificationTask;
    use rusqlite::Connection;

    fn engine(capacity: usize) -> (DispatchEngine, mpsc::Receiver<NotificationDelivery>) {
        let store = NotificationStore::new(Connection::open_in_memory().unwrap()).unwrap();
        let (tx, rx) = mpsc::channel(capacity);
        (DispatchEngine::new(store, tx), rx)
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2030, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn due_task_is_delivered_and_marked() {
        let (engine, mut rx) = engine(8);
        engine
            .store
            .insert(NotificationTask::new(7, at(10, 0, 0), "feed the cat"))
            .unwrap();

        let n = engine.tick(at(10, 0, 0)).unwrap();
        assert_eq!(n, 1);

        let delivery = rx.try_recv().unwrap();
        assert_eq!(delivery.chat_id, 7);
        assert_eq!(delivery.payload, "feed the cat");

        // Processed: the same minute has nothing left.
        assert!(engine.store.find_due_at(at(10, 0, 0)).unwrap().is_empty());
    }

    #[test]
    fn second_tick_in_the_same_minute_redelivers_nothing() {
        let (engine, mut rx) = engine(8);
        engine
            .store
            .insert(NotificationTask::new(1, at(10, 0, 0), "once"))
            .unwrap();

        assert_eq!(engine.tick(at(10, 0, 5)).unwrap(), 1);
        assert_eq!(engine.tick(at(10, 0, 40)).unwrap(), 0);

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn later_minute_redelivers_nothing() {
        let (engine, mut rx) = engine(8);
        engine
            .store
            .insert(NotificationTask::new(1, at(10, 0, 0), "once"))
            .unwrap();

        assert_eq!(engine.tick(at(10, 0, 0)).unwrap(), 1);
        assert_eq!(engine.tick(at(10, 1, 0)).unwrap(), 0);
        assert_eq!(engine.tick(at(10, 2, 0)).unwrap(), 0);

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn task_is_not_a_candidate_before_its_minute() {
        let (engine, mut rx) = engine(8);
        engine
            .store
            .insert(NotificationTask::new(1, at(10, 5, 0), "later"))
            .unwrap();

        assert_eq!(engine.tick(at(10, 4, 59)).unwrap(), 0);
        assert!(rx.try_recv().is_err());

        assert_eq!(engine.tick(at(10, 5, 0)).unwrap(), 1);
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn empty_payload_is_marked_but_not_delivered() {
        let (engine, mut rx) = engine(8);
        engine
            .store
            .insert(NotificationTask::new(1, at(10, 0, 0), ""))
            .unwrap();

        assert_eq!(engine.tick(at(10, 0, 0)).unwrap(), 1);
        assert!(rx.try_recv().is_err());
        assert!(engine.store.find_due_at(at(10, 0, 0)).unwrap().is_empty());
    }

    #[test]
    fn full_channel_drops_delivery_but_still_marks_both_tasks() {
        let (engine, mut rx) = engine(1);
        engine
            .store
            .insert(NotificationTask::new(1, at(10, 0, 0), "first"))
            .unwrap();
        engine
            .store
            .insert(NotificationTask::new(2, at(10, 0, 0), "second"))
            .unwrap();

        assert_eq!(engine.tick(at(10, 0, 0)).unwrap(), 2);

        // Only one fits the channel, but neither task stays pending.
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
        assert!(engine.store.find_due_at(at(10, 0, 0)).unwrap().is_empty());
    }

    #[test]
    fn tasks_in_other_minutes_are_untouched() {
        let (engine, _rx) = engine(8);
        engine
            .store
            .insert(NotificationTask::new(1, at(10, 0, 0), "now"))
            .unwrap();
        let later = engine
            .store
            .insert(NotificationTask::new(1, at(10, 30, 0), "half past"))
            .unwrap();

        engine.tick(at(10, 0, 0)).unwrap();

        let pending = engine.store.list_pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, later.id);
    }
}
