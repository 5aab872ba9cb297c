use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::SettingsFile;
pub use crate::error::StorageError;
use crate::models::{User, UserRecord};

const USERS_FILE: &str = "users.json";
const LOGIN_FILE: &str = "login.json";
const SETTINGS_FILE: &str = "settings.json";

/// Whole-collection persistence for user records and the active-user pointer.
///
/// Each call is atomic on its own; there is no transaction spanning calls.
pub trait RecordStore {
    fn load_all_records(&self) -> Result<Vec<UserRecord>, StorageError>;
    fn save_all_records(&self, records: &[UserRecord]) -> Result<(), StorageError>;
    fn active_user(&self) -> Result<Option<User>, StorageError>;
    fn set_active_user(&self, user: Option<&User>) -> Result<(), StorageError>;
}

impl<S: RecordStore + ?Sized> RecordStore for std::sync::Arc<S> {
    fn load_all_records(&self) -> Result<Vec<UserRecord>, StorageError> {
        (**self).load_all_records()
    }

    fn save_all_records(&self, records: &[UserRecord]) -> Result<(), StorageError> {
        (**self).save_all_records(records)
    }

    fn active_user(&self) -> Result<Option<User>, StorageError> {
        (**self).active_user()
    }

    fn set_active_user(&self, user: Option<&User>) -> Result<(), StorageError> {
        (**self).set_active_user(user)
    }
}

pub struct FileRecordStore {
    root: PathBuf,
}

impl FileRecordStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn load_settings(&self) -> Result<SettingsFile, StorageError> {
        Ok(self
            .load_json(self.root.join(SETTINGS_FILE))?
            .unwrap_or_default())
    }

    pub fn save_settings(&self, data: &SettingsFile) -> Result<(), StorageError> {
        self.write_atomic(self.root.join(SETTINGS_FILE), data)
    }

    /// A missing file is an absent key, not an error.
    fn load_json<T: DeserializeOwned>(&self, path: PathBuf) -> Result<Option<T>, StorageError> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        Ok(Some(serde_json::from_str(&buf)?))
    }

    fn write_atomic<T: Serialize + ?Sized>(
        &self,
        path: PathBuf,
        data: &T,
    ) -> Result<(), StorageError> {
        let temp_path = path.with_extension("tmp");
        let json = serde_json::to_vec_pretty(data)?;
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(temp_path, path)?;
        Ok(())
    }

    fn remove(&self, filename: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.root.join(filename)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl RecordStore for FileRecordStore {
    fn load_all_records(&self) -> Result<Vec<UserRecord>, StorageError> {
        Ok(self
            .load_json(self.root.join(USERS_FILE))?
            .unwrap_or_default())
    }

    fn save_all_records(&self, records: &[UserRecord]) -> Result<(), StorageError> {
        self.write_atomic(self.root.join(USERS_FILE), records)
    }

    fn active_user(&self) -> Result<Option<User>, StorageError> {
        self.load_json(self.root.join(LOGIN_FILE))
    }

    fn set_active_user(&self, user: Option<&User>) -> Result<(), StorageError> {
        match user {
            Some(user) => self.write_atomic(self.root.join(LOGIN_FILE), user),
            None => self.remove(LOGIN_FILE),
        }
    }
}

#[derive(Default)]
pub struct MemoryRecordStore {
    inner: Mutex<MemoryData>,
}

#[derive(Default)]
struct MemoryData {
    records: Vec<UserRecord>,
    active: Option<User>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<UserRecord>, active: Option<User>) -> Self {
        Self {
            inner: Mutex::new(MemoryData { records, active }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryData> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RecordStore for MemoryRecordStore {
    fn load_all_records(&self) -> Result<Vec<UserRecord>, StorageError> {
        Ok(self.lock().records.clone())
    }

    fn save_all_records(&self, records: &[UserRecord]) -> Result<(), StorageError> {
        self.lock().records = records.to_vec();
        Ok(())
    }

    fn active_user(&self) -> Result<Option<User>, StorageError> {
        Ok(self.lock().active.clone())
    }

    fn set_active_user(&self, user: Option<&User>) -> Result<(), StorageError> {
        self.lock().active = user.cloned();
        Ok(())
    }
}
