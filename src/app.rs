use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use tokio::task::JoinHandle;

use crate::config::{Settings, SettingsFile};
use crate::debounce::Debouncer;
use crate::error::RepositoryError;
use crate::models::Task;
use crate::notify::{start_ticker, Reminder, ReminderQueue};
use crate::query::{Section, SortMode};
use crate::repository::TaskRepository;
use crate::state::TaskListState;
use crate::storage::{FileRecordStore, RecordStore};

/// Wires the file store, repository, list state, search debouncer and reminder ticker
/// together. Must be opened inside a tokio runtime.
pub struct TodoApp {
    repository: TaskRepository<Arc<FileRecordStore>, Arc<ReminderQueue>>,
    state: TaskListState,
    settings: Settings,
    search: Debouncer<String>,
    ticker: JoinHandle<()>,
}

impl TodoApp {
    pub fn open<F>(data_dir: PathBuf, on_reminder: F) -> Result<Self, RepositoryError>
    where
        F: FnMut(Vec<Reminder>) + Send + 'static,
    {
        let store = Arc::new(FileRecordStore::new(data_dir));
        store.ensure_dirs()?;
        let settings = store.load_settings()?.settings;

        let queue = Arc::new(ReminderQueue::new());
        let ticker = start_ticker(Arc::clone(&queue), on_reminder);

        let state = TaskListState::new(Vec::new(), settings.default_sort);
        let target = state.clone();
        let search = Debouncer::spawn(settings.search_debounce(), move |text: String| {
            target.apply_search(text)
        });

        let app = Self {
            repository: TaskRepository::new(store, queue),
            state,
            settings,
            search,
            ticker,
        };
        if app.repository.store().active_user()?.is_some() {
            app.reload()?;
        }
        log::info!("app: opened");
        Ok(app)
    }

    pub fn state(&self) -> &TaskListState {
        &self.state
    }

    pub fn repository(&self) -> &TaskRepository<Arc<FileRecordStore>, Arc<ReminderQueue>> {
        &self.repository
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn update_settings(&mut self, settings: Settings) -> Result<(), RepositoryError> {
        self.repository.store().save_settings(&SettingsFile {
            settings: settings.clone(),
            ..SettingsFile::default()
        })?;
        self.settings = settings;
        Ok(())
    }

    /// Reloads the active user's tasks into the list state.
    pub fn reload(&self) -> Result<(), RepositoryError> {
        let owner = self.repository.active_owner()?;
        self.state.replace_tasks(self.repository.list_tasks(&owner)?);
        Ok(())
    }

    /// Reloads tasks and resets search and sort. Keystrokes still waiting in the
    /// debouncer are replaced by an empty search so they cannot land afterwards.
    pub fn refresh(&self) -> Result<(), RepositoryError> {
        let owner = self.repository.active_owner()?;
        self.type_search("");
        self.state.refresh(self.repository.list_tasks(&owner)?);
        Ok(())
    }

    pub fn add_task(&self, task: Task) -> Result<(), RepositoryError> {
        let owner = self.repository.active_owner()?;
        self.state.replace_tasks(self.repository.add_task(&owner, task)?);
        Ok(())
    }

    pub fn update_task(&self, task: Task) -> Result<(), RepositoryError> {
        let owner = self.repository.active_owner()?;
        self.state
            .replace_tasks(self.repository.update_task(&owner, task)?);
        Ok(())
    }

    pub fn delete_task(&self, task_id: &str) -> Result<(), RepositoryError> {
        let owner = self.repository.active_owner()?;
        self.state
            .replace_tasks(self.repository.delete_task(&owner, task_id)?);
        Ok(())
    }

    pub fn set_completed(&self, task_id: &str, completed: bool) -> Result<(), RepositoryError> {
        let owner = self.repository.active_owner()?;
        self.state
            .replace_tasks(self.repository.set_completed(&owner, task_id, completed)?);
        Ok(())
    }

    pub fn toggle_sort(&self, mode: SortMode) {
        self.state.toggle_sort(mode);
    }

    /// Raw keystroke input; reaches the list state after the debounce delay.
    pub fn type_search(&self, text: &str) {
        if !self.search.push(text.to_string()) {
            log::warn!("app: search input after shutdown ignored");
        }
    }

    pub fn sections(&self) -> Vec<Section> {
        self.state.sections(&Local)
    }

    pub fn shutdown(&self) {
        self.search.cancel();
        self.ticker.abort();
    }
}

impl Drop for TodoApp {
    fn drop(&mut self) {
        self.ticker.abort();
    }
}
