#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StorageError),
    #[error("no active user")]
    NoActiveUser,
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("user already exists: {0}")]
    DuplicateUser(String),
    #[error("task id already in use: {0}")]
    DuplicateTask(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid task: {0}")]
    InvalidTask(String),
}

/// Failure reported by a [`crate::notify::Notifier`]. Never fatal to a task mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    #[error("notification permission denied")]
    PermissionDenied,
    #[error("notification backend error: {0}")]
    Backend(String),
}
