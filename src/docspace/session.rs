use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Handle to file bytes that are only reachable during the current run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionHandle(String);

impl SessionHandle {
    pub fn new() -> Self {
        Self(format!("blob:docspace/{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a handle points at.
#[derive(Debug, Clone)]
pub enum SessionPayload {
    Bytes(Arc<[u8]>),
    Path(PathBuf),
}

/// Process-local table of live session handles.
///
/// Handles must be released when their record is purged; anything left is
/// dropped by `release_all` at teardown.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    entries: Mutex<HashMap<SessionHandle, SessionPayload>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, payload: SessionPayload) -> SessionHandle {
        let handle = SessionHandle::new();
        self.entries.lock().insert(handle.clone(), payload);
        handle
    }

    pub fn contains(&self, handle: &SessionHandle) -> bool {
        self.entries.lock().contains_key(handle)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Read the bytes behind a handle.
    pub async fn read(&self, handle: &SessionHandle) -> Result<Vec<u8>> {
        let payload = self
            .entries
            .lock()
            .get(handle)
            .cloned()
            .with_context(|| format!("Session handle {handle} is no longer valid"))?;
        match payload {
            SessionPayload::Bytes(bytes) => Ok(bytes.to_vec()),
            SessionPayload::Path(path) => tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    /// Returns true if the handle was live.
    pub fn release(&self, handle: &SessionHandle) -> bool {
        self.entries.lock().remove(handle).is_some()
    }

    pub fn release_all(&self) -> usize {
        let mut entries = self.entries.lock();
        let released = entries.len();
        entries.clear();
        released
    }
}
