//! In-process storage provider.
//!
//! Backs the in-memory server mode and the service tests. Deletes can be
//! made to fail per key so best-effort deletion paths can be exercised,
//! and writes can be held so an operation stays in flight.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::{DashMap, DashSet};
use tokio::sync::{Mutex, OwnedMutexGuard};

use tally_core::error::AppError;
use tally_core::result::AppResult;
use tally_core::traits::storage::{ByteStream, StorageProvider};

/// Storage provider holding artifacts in a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryStorageProvider {
    objects: DashMap<String, Bytes>,
    failing_deletes: DashSet<String>,
    write_gate: Arc<Mutex<()>>,
}

impl MemoryStorageProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later delete of `path` fail with a storage error.
    pub fn fail_deletes_for(&self, path: impl Into<String>) {
        self.failing_deletes.insert(path.into());
    }

    /// Block every write until the returned guard is dropped.
    pub async fn hold_writes(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.write_gate).lock_owned().await
    }

    /// Number of stored artifacts.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn get(&self, path: &str) -> AppResult<Bytes> {
        self.objects
            .get(path)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::not_found(format!("Artifact not found: {path}")))
    }
}

#[async_trait]
impl StorageProvider for MemoryStorageProvider {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn read(&self, path: &str) -> AppResult<ByteStream> {
        let data = self.get(path)?;
        Ok(Box::pin(futures::stream::once(async move { Ok(data) })))
    }

    async fn read_bytes(&self, path: &str) -> AppResult<Bytes> {
        self.get(path)
    }

    async fn write(&self, path: &str, data: Bytes) -> AppResult<()> {
        let _open = self.write_gate.lock().await;
        self.objects.insert(path.to_string(), data);
        Ok(())
    }

    async fn delete(&self, path: &str) -> AppResult<bool> {
        if self.failing_deletes.contains(path) {
            return Err(AppError::storage(format!("Failed to delete artifact: {path}")));
        }
        Ok(self.objects.remove(path).is_some())
    }

    async fn exists(&self, path: &str) -> AppResult<bool> {
        Ok(self.objects.contains_key(path))
    }
}
