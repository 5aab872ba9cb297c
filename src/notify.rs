use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

pub use crate::error::NotifyError;
use crate::models::{Task, Timestamp};

pub const REMINDER_TITLE: &str = "Reminder for due task";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub task_id: String,
    pub title: String,
    pub body: String,
    pub fire_at: Timestamp,
}

impl Reminder {
    /// `None` when the task has no due time.
    pub fn for_task(task: &Task) -> Option<Self> {
        let fire_at = task.due_at?;
        Some(Self {
            task_id: task.id.clone(),
            title: REMINDER_TITLE.to_string(),
            body: task.title.clone(),
            fire_at,
        })
    }
}

/// Local reminder delivery, keyed by task id.
///
/// `schedule` replaces any pending reminder for the same task; `cancel` is a
/// no-op when nothing is pending.
pub trait Notifier {
    fn schedule(&self, reminder: &Reminder) -> Result<(), NotifyError>;
    fn cancel(&self, task_id: &str) -> Result<(), NotifyError>;
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn schedule(&self, reminder: &Reminder) -> Result<(), NotifyError> {
        (**self).schedule(reminder)
    }

    fn cancel(&self, task_id: &str) -> Result<(), NotifyError> {
        (**self).cancel(task_id)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn schedule(&self, _reminder: &Reminder) -> Result<(), NotifyError> {
        Ok(())
    }

    fn cancel(&self, _task_id: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// In-process reminder queue. Pair it with [`start_ticker`] to fire reminders.
#[derive(Debug, Default)]
pub struct ReminderQueue {
    pending: Mutex<HashMap<String, Reminder>>,
}

impl ReminderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Vec<Reminder> {
        let guard = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let mut out: Vec<Reminder> = guard.values().cloned().collect();
        sort_by_fire_time(&mut out);
        out
    }

    /// Removes and returns every reminder due at `now`, earliest first.
    pub fn take_due(&self, now: Timestamp) -> Vec<Reminder> {
        let mut guard = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let due_ids: Vec<String> = guard
            .values()
            .filter(|reminder| reminder.fire_at <= now)
            .map(|reminder| reminder.task_id.clone())
            .collect();
        let mut due: Vec<Reminder> = due_ids
            .iter()
            .filter_map(|id| guard.remove(id))
            .collect();
        sort_by_fire_time(&mut due);
        due
    }
}

impl Notifier for ReminderQueue {
    fn schedule(&self, reminder: &Reminder) -> Result<(), NotifyError> {
        let mut guard = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        guard.insert(reminder.task_id.clone(), reminder.clone());
        Ok(())
    }

    fn cancel(&self, task_id: &str) -> Result<(), NotifyError> {
        let mut guard = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        guard.remove(task_id);
        Ok(())
    }
}

fn sort_by_fire_time(reminders: &mut [Reminder]) {
    reminders.sort_by(|a, b| {
        a.fire_at
            .cmp(&b.fire_at)
            .then_with(|| a.task_id.cmp(&b.task_id))
    });
}

/// Polls `queue` once a second against the wall clock and hands due reminders to `sink`.
pub fn start_ticker<F>(queue: Arc<ReminderQueue>, sink: F) -> JoinHandle<()>
where
    F: FnMut(Vec<Reminder>) + Send + 'static,
{
    spawn_ticker(queue, Duration::from_secs(1), || Utc::now().timestamp(), sink)
}

pub fn spawn_ticker<C, F>(
    queue: Arc<ReminderQueue>,
    period: Duration,
    clock: C,
    mut sink: F,
) -> JoinHandle<()>
where
    C: Fn() -> Timestamp + Send + 'static,
    F: FnMut(Vec<Reminder>) + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let due = queue.take_due(clock());
            if !due.is_empty() {
                log::debug!("reminders: firing count={}", due.len());
                sink(due);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    fn make_reminder(id: &str, fire_at: Timestamp) -> Reminder {
        Reminder {
            task_id: id.to_string(),
            title: REMINDER_TITLE.to_string(),
            body: format!("task-{id}"),
            fire_at,
        }
    }

    #[test]
    fn reminder_for_task_requires_due_time() {
        let mut task = Task {
            id: "a".to_string(),
            title: "pay rent".to_string(),
            content: String::new(),
            created_at: 1,
            due_at: None,
            priority: 1,
            is_completed: false,
            category: "Home".to_string(),
            collaborators: Vec::new(),
        };
        assert!(Reminder::for_task(&task).is_none());

        task.due_at = Some(99);
        let reminder = Reminder::for_task(&task).expect("due task gets a reminder");
        assert_eq!(reminder.task_id, "a");
        assert_eq!(reminder.title, REMINDER_TITLE);
        assert_eq!(reminder.body, "pay rent");
        assert_eq!(reminder.fire_at, 99);
    }

    #[test]
    fn schedule_supersedes_and_cancel_is_idempotent() {
        let queue = ReminderQueue::new();
        queue.schedule(&make_reminder("a", 10)).unwrap();
        queue.schedule(&make_reminder("a", 20)).unwrap();
        queue.schedule(&make_reminder("b", 5)).unwrap();

        let pending = queue.pending();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].task_id, "b");
        assert_eq!(pending[1].fire_at, 20);

        queue.cancel("a").unwrap();
        queue.cancel("a").unwrap();
        queue.cancel("missing").unwrap();
        assert_eq!(queue.pending().len(), 1);
    }

    #[test]
    fn take_due_drains_only_due_reminders_in_order() {
        let queue = ReminderQueue::new();
        queue.schedule(&make_reminder("late", 300)).unwrap();
        queue.schedule(&make_reminder("b", 200)).unwrap();
        queue.schedule(&make_reminder("a", 100)).unwrap();

        let due = queue.take_due(200);
        let ids: Vec<&str> = due.iter().map(|r| r.task_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        // Already fired reminders are not returned again.
        assert!(queue.take_due(200).is_empty());
        assert_eq!(queue.pending().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_fires_due_reminders_once() {
        let queue = Arc::new(ReminderQueue::new());
        queue.schedule(&make_reminder("a", 5)).unwrap();

        let clock = Arc::new(AtomicI64::new(0));
        let clock_ref = Arc::clone(&clock);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let handle = spawn_ticker(
            Arc::clone(&queue),
            Duration::from_secs(1),
            move || clock_ref.load(Ordering::SeqCst),
            move |due| {
                let _ = tx.send(due);
            },
        );

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(rx.try_recv().is_err());

        clock.store(5, Ordering::SeqCst);
        let fired = rx.recv().await.expect("ticker should fire");
        assert_eq!(fired, vec![make_reminder("a", 5)]);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(rx.try_recv().is_err());
        handle.abort();
    }
}
