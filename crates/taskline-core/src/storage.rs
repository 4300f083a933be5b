use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::task::Task;

// Bump when the serialized shape of Task changes.
pub const STORAGE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("No saved tasks at {0}")]
    NotFound(PathBuf),
    #[error("Storage IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Saved tasks at {path} are unreadable: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Saved tasks at {path} use unsupported format version {version}")]
    UnsupportedVersion { path: PathBuf, version: u32 },
    #[error("Failed to serialize tasks: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Whole-list persistence for the task store.
pub trait Storage {
    /// Fails with [`StorageError::NotFound`] when nothing was saved yet.
    fn load(&self) -> Result<Vec<Task>, StorageError>;
    fn save(&self, tasks: &[Task]) -> Result<(), StorageError>;
}

impl<S: Storage + ?Sized> Storage for Rc<S> {
    fn load(&self) -> Result<Vec<Task>, StorageError> {
        (**self).load()
    }

    fn save(&self, tasks: &[Task]) -> Result<(), StorageError> {
        (**self).save(tasks)
    }
}

#[derive(Serialize, Deserialize)]
struct StoredTasks {
    #[serde(default)]
    version: u32,
    tasks: Vec<Task>,
}

#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `tasks.json` -> `tasks.json<suffix>`, next to the data file.
    fn sibling_path(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(suffix);
        self.path.with_file_name(name)
    }

    // Never removed: a waiting process may already have it open.
    fn lock_path(&self) -> PathBuf {
        self.sibling_path(".lock")
    }

    fn temp_path(&self) -> PathBuf {
        self.sibling_path(".tmp")
    }

    fn with_lock<T>(&self, f: impl FnOnce() -> Result<T, StorageError>) -> Result<T, StorageError> {
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.lock_path())?;
        file.lock_exclusive()?;
        let result = f();
        file.unlock()?;
        result
    }
}

impl Storage for JsonFileStorage {
    fn load(&self) -> Result<Vec<Task>, StorageError> {
        if !self.path.exists() {
            return Err(StorageError::NotFound(self.path.clone()));
        }
        let raw = self.with_lock(|| Ok(fs::read_to_string(&self.path)?))?;
        let stored: StoredTasks =
            serde_json::from_str(&raw).map_err(|source| StorageError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        if stored.version != STORAGE_VERSION {
            return Err(StorageError::UnsupportedVersion {
                path: self.path.clone(),
                version: stored.version,
            });
        }
        debug!(path = %self.path.display(), count = stored.tasks.len(), "loaded tasks");
        Ok(stored.tasks)
    }

    fn save(&self, tasks: &[Task]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let stored = StoredTasks {
            version: STORAGE_VERSION,
            tasks: tasks.to_vec(),
        };
        let json = serde_json::to_string_pretty(&stored).map_err(StorageError::Serialize)?;
        self.with_lock(|| {
            let tmp = self.temp_path();
            fs::write(&tmp, &json)?;
            fs::rename(&tmp, &self.path)?;
            Ok(())
        })?;
        debug!(path = %self.path.display(), count = tasks.len(), "saved tasks");
        Ok(())
    }
}

/// Keeps tasks in memory only. `load` reports `NotFound` until the first save.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    saved: RefCell<Option<Vec<Task>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            saved: RefCell::new(Some(tasks)),
        }
    }

    pub fn saved(&self) -> Option<Vec<Task>> {
        self.saved.borrow().clone()
    }
}

impl Storage for MemoryStorage {
    fn load(&self) -> Result<Vec<Task>, StorageError> {
        self.saved
            .borrow()
            .clone()
            .ok_or_else(|| StorageError::NotFound(PathBuf::from("<memory>")))
    }

    fn save(&self, tasks: &[Task]) -> Result<(), StorageError> {
        *self.saved.borrow_mut() = Some(tasks.to_vec());
        Ok(())
    }
}
