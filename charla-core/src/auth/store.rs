//! Durable storage for the single saved session

use parking_lot::Mutex;
use std::path::{Path, PathBuf};

/// Fixed key the session record is stored under
pub const SESSION_KEY: &str = "user";

/// Key-value facility holding the raw session record
pub trait SessionStore: Send + Sync {
    /// Read the stored record, if any
    fn load(&self) -> crate::Result<Option<String>>;
    /// Replace the stored record
    fn save(&self, record: &str) -> crate::Result<()>;
    /// Remove the stored record; removing a missing record is not an error
    fn clear(&self) -> crate::Result<()>;
}

/// Stores the record as `<dir>/user.json`
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the stored record
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", SESSION_KEY))
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> crate::Result<Option<String>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(&path)?))
    }

    fn save(&self, record: &str) -> crate::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path(), record)?;
        Ok(())
    }

    fn clear(&self) -> crate::Result<()> {
        match std::fs::remove_file(self.path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(crate::Error::Session(format!(
                "failed to remove {}: {}",
                self.path().display(),
                e
            ))),
        }
    }
}

/// In-process store for tests and throwaway runs
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    record: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `record`
    pub fn with_record(record: impl Into<String>) -> Self {
        Self {
            record: Mutex::new(Some(record.into())),
        }
    }

    /// Current raw record
    pub fn snapshot(&self) -> Option<String> {
        self.record.lock().clone()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> crate::Result<Option<String>> {
        Ok(self.record.lock().clone())
    }

    fn save(&self, record: &str) -> crate::Result<()> {
        *self.record.lock() = Some(record.to_string());
        Ok(())
    }

    fn clear(&self) -> crate::Result<()> {
        *self.record.lock() = None;
        Ok(())
    }
}
