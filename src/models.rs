use serde::{Deserialize, Serialize};

use crate::error::RepositoryError;

pub type Timestamp = i64;

pub const DEFAULT_CATEGORY: &str = "General";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct User {
    pub email: String,
    /// Checksum from [`crate::accounts::generate_hash`], not a secure credential.
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct UserRecord {
    pub user: User,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl UserRecord {
    pub fn new(user: User) -> Self {
        Self {
            user,
            tasks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Priority {
    pub fn from_level(level: i32) -> Option<Self> {
        match level {
            1 => Some(Self::High),
            2 => Some(Self::Medium),
            3 => Some(Self::Low),
            _ => None,
        }
    }

    pub fn level(self) -> i32 {
        self as i32
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

/// Display label for a raw priority level; unset levels read as "Medium".
pub fn priority_label(level: i32) -> &'static str {
    Priority::from_level(level)
        .unwrap_or(Priority::Medium)
        .label()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub created_at: Timestamp,
    #[serde(default)]
    pub due_at: Option<Timestamp>,
    pub priority: i32,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub collaborators: Vec<String>,
}

impl Task {
    pub fn priority(&self) -> Option<Priority> {
        Priority::from_level(self.priority)
    }

    pub fn category_key(&self) -> String {
        self.category.to_lowercase()
    }

    pub fn validate(&self) -> Result<(), RepositoryError> {
        if self.id.trim().is_empty() {
            return Err(RepositoryError::InvalidTask("empty id".to_string()));
        }
        if self.title.trim().is_empty() {
            return Err(RepositoryError::InvalidTask(format!(
                "task {} has an empty title",
                self.id
            )));
        }
        if self.category.trim().is_empty() {
            return Err(RepositoryError::InvalidTask(format!(
                "task {} has an empty category",
                self.id
            )));
        }
        Ok(())
    }
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}
