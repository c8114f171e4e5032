//! Key/value persistence for the backend configuration.
//!
//! The host supplies the real store; [`MemoryStorage`] is the in-process
//! implementation used by tests and the demo binary.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;

use crate::config::CentrifyConfig;

/// Key the configuration record is stored under.
pub const CONFIG_KEY: &str = "config";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Error reading configuration: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("Error encoding configuration: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Host-provided storage. Reads and writes are single-record and atomic;
/// concurrent writers resolve as last-writer-wins inside the store.
pub trait Storage: Send + Sync + 'static {
    /// Fetch the raw entry under `key`, `None` if it was never written.
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, StorageError>> + Send;

    /// Replace the entry under `key`.
    fn put(
        &self,
        key: &str,
        value: Vec<u8>,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Drop the entry under `key`; deleting a missing key is not an error.
    fn delete(&self, key: &str) -> impl Future<Output = Result<(), StorageError>> + Send;
}

#[derive(Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<DashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Read the configuration record, `None` when never written.
pub async fn load_config_record<S: Storage>(
    storage: &S,
) -> Result<Option<CentrifyConfig>, StorageError> {
    let Some(raw) = storage.get(CONFIG_KEY).await? else {
        return Ok(None);
    };
    serde_json::from_slice(&raw)
        .map(Some)
        .map_err(StorageError::Decode)
}

/// Persist the configuration record as-is.
///
/// No normalization happens here; config writes go through
/// [`crate::config::apply_update`] first.
pub async fn save_config_record<S: Storage>(
    storage: &S,
    config: &CentrifyConfig,
) -> Result<(), StorageError> {
    let raw = serde_json::to_vec(config).map_err(StorageError::Encode)?;
    storage.put(CONFIG_KEY, raw).await
}
