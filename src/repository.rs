use std::sync::{Mutex, PoisonError};

use crate::error::RepositoryError;
use crate::models::{Task, UserRecord};
use crate::notify::{Notifier, Reminder};
use crate::storage::RecordStore;

/// Task CRUD for one user at a time, expressed as read-modify-write over a [`RecordStore`].
///
/// Mutations made through the same repository are serialized. Writers that bypass
/// it (another process, another repository over the same files) can still lose
/// updates because the store only offers whole-collection writes.
pub struct TaskRepository<S, N> {
    store: S,
    notifier: N,
    write_lock: Mutex<()>,
}

impl<S: RecordStore, N: Notifier> TaskRepository<S, N> {
    pub fn new(store: S, notifier: N) -> Self {
        Self {
            store,
            notifier,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Email of the logged-in user.
    pub fn active_owner(&self) -> Result<String, RepositoryError> {
        self.store
            .active_user()?
            .map(|user| user.email)
            .ok_or(RepositoryError::NoActiveUser)
    }

    pub fn list_tasks(&self, owner: &str) -> Result<Vec<Task>, RepositoryError> {
        let records = self.store.load_all_records()?;
        let index = find_owner(&records, owner)?;
        Ok(records[index].tasks.clone())
    }

    pub fn add_task(&self, owner: &str, task: Task) -> Result<Vec<Task>, RepositoryError> {
        task.validate()?;
        let tasks = self.mutate(owner, |tasks| {
            if tasks.iter().any(|existing| existing.id == task.id) {
                return Err(RepositoryError::DuplicateTask(task.id.clone()));
            }
            tasks.push(task.clone());
            Ok(())
        })?;
        log::debug!("repository: added task id={} owner={owner}", task.id);
        self.schedule_reminder(&task);
        Ok(tasks)
    }

    pub fn update_task(&self, owner: &str, task: Task) -> Result<Vec<Task>, RepositoryError> {
        task.validate()?;
        let mut had_due = false;
        let tasks = self.mutate(owner, |tasks| {
            let existing = tasks
                .iter_mut()
                .find(|existing| existing.id == task.id)
                .ok_or_else(|| RepositoryError::TaskNotFound(task.id.clone()))?;
            had_due = existing.due_at.is_some();
            *existing = task.clone();
            Ok(())
        })?;
        log::debug!("repository: updated task id={} owner={owner}", task.id);
        if had_due {
            self.cancel_reminder(&task.id);
        }
        self.schedule_reminder(&task);
        Ok(tasks)
    }

    pub fn delete_task(&self, owner: &str, task_id: &str) -> Result<Vec<Task>, RepositoryError> {
        let tasks = self.mutate(owner, |tasks| {
            tasks.retain(|task| task.id != task_id);
            Ok(())
        })?;
        log::debug!("repository: deleted task id={task_id} owner={owner}");
        self.cancel_reminder(task_id);
        Ok(tasks)
    }

    pub fn set_completed(
        &self,
        owner: &str,
        task_id: &str,
        completed: bool,
    ) -> Result<Vec<Task>, RepositoryError> {
        let tasks = self.mutate(owner, |tasks| {
            let task = tasks
                .iter_mut()
                .find(|task| task.id == task_id)
                .ok_or_else(|| RepositoryError::TaskNotFound(task_id.to_string()))?;
            task.is_completed = completed;
            Ok(())
        })?;
        log::debug!("repository: task id={task_id} completed={completed} owner={owner}");
        Ok(tasks)
    }

    /// Load, locate the owner's record, apply `change`, save. Nothing is written if
    /// `change` fails.
    fn mutate<F>(&self, owner: &str, change: F) -> Result<Vec<Task>, RepositoryError>
    where
        F: FnOnce(&mut Vec<Task>) -> Result<(), RepositoryError>,
    {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut records = self.store.load_all_records()?;
        let index = find_owner(&records, owner)?;
        change(&mut records[index].tasks)?;
        self.store.save_all_records(&records)?;
        Ok(records.swap_remove(index).tasks)
    }

    fn schedule_reminder(&self, task: &Task) {
        let Some(reminder) = Reminder::for_task(task) else {
            return;
        };
        if let Err(err) = self.notifier.schedule(&reminder) {
            log::warn!("repository: failed to schedule reminder id={}: {err}", task.id);
        }
    }

    fn cancel_reminder(&self, task_id: &str) {
        if let Err(err) = self.notifier.cancel(task_id) {
            log::warn!("repository: failed to cancel reminder id={task_id}: {err}");
        }
    }
}

fn find_owner(records: &[UserRecord], owner: &str) -> Result<usize, RepositoryError> {
    records
        .iter()
        .position(|record| record.user.email == owner)
        .ok_or_else(|| RepositoryError::UserNotFound(owner.to_string()))
}
