//! Storage provider trait for pluggable artifact storage backends.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::result::AppResult;

/// A byte stream type used for reading file contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Key-value blob storage for uploaded and derived spreadsheets.
///
/// Paths are opaque, forward-slash separated keys relative to the
/// provider's root. The trait is defined here and implemented in
/// `tally-storage`.
#[async_trait]
pub trait StorageProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local").
    fn provider_type(&self) -> &str;

    /// Check whether the provider is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Read an artifact and return its byte stream.
    async fn read(&self, path: &str) -> AppResult<ByteStream>;

    /// Read an artifact into memory.
    async fn read_bytes(&self, path: &str) -> AppResult<Bytes>;

    /// Write bytes to the given path, creating parent directories.
    async fn write(&self, path: &str, data: Bytes) -> AppResult<()>;

    /// Delete the artifact at the given path.
    ///
    /// Returns `true` when an artifact existed and was removed, `false`
    /// when nothing was stored under the path.
    async fn delete(&self, path: &str) -> AppResult<bool>;

    /// Check whether an artifact exists at the given path.
    async fn exists(&self, path: &str) -> AppResult<bool>;
}
