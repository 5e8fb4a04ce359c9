//! Durable session persistence.
//!
//! One record under one well-known location: the bearer token plus the
//! cached identity fields. Absence of the record is a valid state and
//! means Guest. The store is purely mechanical; it never validates
//! record contents.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid persisted record: {0}")]
    Json(#[from] serde_json::Error),
}

/// The record persisted between page loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub access_token: String,
    pub id: String,
    pub name: String,
    pub is_guest: bool,
}

/// Key/value persistence for the session record.
pub trait SessionStore: Send + Sync {
    /// Persist the record, overwriting any prior value.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn save(&self, record: &SessionRecord) -> Result<(), StoreError>;

    /// The previously saved record, or `Ok(None)` when nothing is saved.
    ///
    /// # Errors
    ///
    /// Returns an error if a present record cannot be read or parsed. A
    /// missing record is not an error.
    fn load(&self) -> Result<Option<SessionRecord>, StoreError>;

    /// Remove any saved record. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if a present record cannot be removed.
    fn clear(&self) -> Result<(), StoreError>;
}

impl<S: SessionStore + ?Sized> SessionStore for Arc<S> {
    fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        (**self).save(record)
    }

    fn load(&self) -> Result<Option<SessionRecord>, StoreError> {
        (**self).load()
    }

    fn clear(&self) -> Result<(), StoreError> {
        (**self).clear()
    }
}

/// File-backed store: one JSON document at a caller-chosen path.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStore for FileStore {
    fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_vec(record)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    fn load(&self) -> Result<Option<SessionRecord>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-memory store, for tests and embedded use.
#[derive(Debug, Default)]
pub struct MemoryStore {
    record: Mutex<Option<SessionRecord>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let mut guard = self.record.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(record.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<SessionRecord>, StoreError> {
        let guard = self.record.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.clone())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut guard = self.record.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = None;
        Ok(())
    }
}
