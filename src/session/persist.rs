//! Persistence port for the session blob
//!
//! The store writes the whole session as one serialized record under one
//! key, so any backend that can hold a single string works: browser local
//! storage, a file on disk, or memory for tests.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::AuthError;
use crate::session::types::SessionState;

/// Storage backend for the serialized session record
pub trait SessionPersist: Send + Sync {
    /// Load the persisted session, if any
    fn load(&self) -> Result<Option<SessionState>, AuthError>;

    /// Persist the full session state
    fn save(&self, state: &SessionState) -> Result<(), AuthError>;

    /// Remove the persisted session
    fn clear(&self) -> Result<(), AuthError>;
}

/// In-memory backend holding one serialized blob; the default for tests
/// and for embedders that manage persistence themselves
#[derive(Debug, Default)]
pub struct MemoryPersist {
    blob: Mutex<Option<String>>,
}

impl MemoryPersist {
    /// Create an empty in-memory backend
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionPersist for MemoryPersist {
    fn load(&self) -> Result<Option<SessionState>, AuthError> {
        let blob = self.blob.lock().unwrap();
        match blob.as_deref() {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    fn save(&self, state: &SessionState) -> Result<(), AuthError> {
        let json = serde_json::to_string(state)?;
        *self.blob.lock().unwrap() = Some(json);
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        *self.blob.lock().unwrap() = None;
        Ok(())
    }
}

/// File-backed backend storing the session as a JSON file on disk
#[derive(Debug)]
pub struct FilePersist {
    path: PathBuf,
}

impl FilePersist {
    /// Create a backend writing to the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionPersist for FilePersist {
    fn load(&self) -> Result<Option<SessionState>, AuthError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    fn save(&self, state: &SessionState) -> Result<(), AuthError> {
        let json = serde_json::to_string(state)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
