use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{DataStore, StoreError, checked_key};

/// JSON documents stored as `{base_dir}/{collection}/{id}.json`
pub struct FileDataStore {
    base_dir: PathBuf,
}

impl FileDataStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    fn record_path(&self, collection: &str, id: &str) -> Result<PathBuf, StoreError> {
        Ok(self
            .base_dir
            .join(checked_key(collection)?)
            .join(format!("{}.json", checked_key(id)?)))
    }

    fn not_found(collection: &str, id: &str) -> StoreError {
        StoreError::NotFound { collection: collection.to_string(), key: id.to_string() }
    }

    #[allow(dead_code)] // Public API method
    /// Write a new record, failing if one already exists under `id`
    pub async fn create(&self, collection: &str, id: &str, record: &Value) -> Result<(), StoreError> {
        let path = self.record_path(collection, id)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists {
                    collection: collection.to_string(),
                    key: id.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(&serde_json::to_vec(record)?).await?;
        file.flush().await?;
        Ok(())
    }

    #[allow(dead_code)] // Public API method
    pub async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let path = self.record_path(collection, id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Self::not_found(collection, id)),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl DataStore for FileDataStore {
    async fn list(&self, collection: &str) -> Result<Vec<String>, StoreError> {
        let dir = self.base_dir.join(checked_key(collection)?);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(id) = name.to_str().and_then(|name| name.strip_suffix(".json")) {
                ids.push(id.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    async fn read(&self, collection: &str, id: &str) -> Result<Value, StoreError> {
        let path = self.record_path(collection, id)?;
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(Self::not_found(collection, id)),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&raw)?)
    }

    async fn update(&self, collection: &str, id: &str, record: &Value) -> Result<(), StoreError> {
        let path = self.record_path(collection, id)?;
        if !fs::try_exists(&path).await? {
            return Err(Self::not_found(collection, id));
        }

        // Write beside the record and rename over it so readers never see a
        // half-written document.
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, serde_json::to_vec(record)?).await?;
        fs::rename(&staging, &path).await?;
        Ok(())
    }
}
