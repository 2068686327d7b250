/// Storage collaborators used by the workers
///
/// The workers only depend on the [`DataStore`] and [`LogStore`] traits. The
/// file-backed implementations keep one JSON document per record and one
/// line-oriented log per check, with gzip+base64 archives for rotated logs.
pub mod data;
pub mod logs;

pub use data::FileDataStore;
pub use logs::FileLogStore;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{collection}/{key} not found")]
    NotFound { collection: String, key: String },
    #[error("{collection}/{key} already exists")]
    AlreadyExists { collection: String, key: String },
    #[error("invalid key {0:?}")]
    InvalidKey(String),
    #[error("{0:#}")]
    Io(#[from] std::io::Error),
    #[error("malformed record: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("archive {0} is not valid base64")]
    Encoding(String),
}

/// Record store keyed by collection and id
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Ids of every record in `collection`
    async fn list(&self, collection: &str) -> Result<Vec<String>, StoreError>;

    async fn read(&self, collection: &str, id: &str) -> Result<Value, StoreError>;

    /// Replace an existing record
    async fn update(&self, collection: &str, id: &str, record: &Value) -> Result<(), StoreError>;
}

/// Append-only per-check logs with compressed archives
#[async_trait]
pub trait LogStore: Send + Sync {
    async fn append(&self, log_name: &str, line: &str) -> Result<(), StoreError>;

    /// Live log names, plus archive names when `include_compressed` is set
    async fn list(&self, include_compressed: bool) -> Result<Vec<String>, StoreError>;

    /// Write the contents of `log_name` to a new archive called `archive_name`
    async fn compress(&self, log_name: &str, archive_name: &str) -> Result<(), StoreError>;

    /// Empty `log_name` in place
    async fn truncate(&self, log_name: &str) -> Result<(), StoreError>;
}

/// Keys become file names, so anything that could escape the store's
/// directory is refused.
pub(crate) fn checked_key(key: &str) -> Result<&str, StoreError> {
    let valid = !key.is_empty()
        && key != "."
        && key != ".."
        && !key.contains(['/', '\\', '\0']);
    if valid { Ok(key) } else { Err(StoreError::InvalidKey(key.to_string())) }
}
