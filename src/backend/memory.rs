/// In-memory backend, optionally seeded from a JSON file
///
/// Useful for running the gateway without a Namecoin node. The file maps
/// names to entries:
///
/// ```json
/// { "id/phelix": { "value": {"gpg": {"fpr": "..."}}, "height": 250000 } }
/// ```
use super::{BackendError, BackendResult, NameBackend, NameEntry};
use crate::{
    error::{KeyserverError, KeyserverResult},
    identity::IdentityName,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct FileEntry {
    value: Value,
    #[serde(default)]
    expired: bool,
    #[serde(default)]
    height: u64,
}

#[derive(Default)]
pub struct MemoryBackend {
    names: RwLock<HashMap<String, NameEntry>>,
    block_times: RwLock<HashMap<u64, i64>>,
    /// When set, every call fails with this transport error
    outage: RwLock<Option<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load entries from a JSON file
    pub fn from_file(path: &Path) -> KeyserverResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let entries: HashMap<String, FileEntry> = serde_json::from_str(&contents).map_err(|e| {
            KeyserverError::Internal(format!("Invalid names file {}: {}", path.display(), e))
        })?;

        let backend = Self::new();
        for (name, entry) in entries {
            backend.names.write().insert(
                name,
                NameEntry {
                    value: entry.value,
                    expired: entry.expired,
                    height: entry.height,
                },
            );
        }
        Ok(backend)
    }

    /// Publish or replace the value of a name
    pub fn set(&self, name: &str, value: Value, height: u64) {
        self.names.write().insert(
            name.to_string(),
            NameEntry {
                value,
                expired: false,
                height,
            },
        );
    }

    pub fn expire(&self, name: &str) {
        if let Some(entry) = self.names.write().get_mut(name) {
            entry.expired = true;
        }
    }

    pub fn set_block_time(&self, height: u64, time: i64) {
        self.block_times.write().insert(height, time);
    }

    /// Simulate an unreachable node; `None` restores service
    pub fn set_outage(&self, reason: Option<&str>) {
        *self.outage.write() = reason.map(str::to_string);
    }

    fn check_outage(&self) -> BackendResult<()> {
        match self.outage.read().as_ref() {
            Some(reason) => Err(BackendError::Transport(reason.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl NameBackend for MemoryBackend {
    async fn name_show(&self, name: &IdentityName) -> BackendResult<NameEntry> {
        self.check_outage()?;
        self.names
            .read()
            .get(name.as_str())
            .cloned()
            .ok_or(BackendError::NotFound)
    }

    async fn block_time(&self, height: u64) -> BackendResult<Option<i64>> {
        self.check_outage()?;
        Ok(self.block_times.read().get(&height).copied())
    }
}
