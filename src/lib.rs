pub mod accounts;
pub mod app;
pub mod config;
pub mod debounce;
pub mod error;
pub mod logging;
pub mod models;
pub mod notify;
pub mod query;
pub mod repository;
pub mod state;
pub mod storage;

pub use app::TodoApp;
pub use error::{NotifyError, RepositoryError, StorageError};
pub use models::{Priority, Task, Timestamp, User, UserRecord};
pub use query::{build_sections, Section, SortMode, SortOrder, SortSpec, TaskQuery};
pub use repository::TaskRepository;
pub use state::TaskListState;
pub use storage::{FileRecordStore, MemoryRecordStore, RecordStore};
