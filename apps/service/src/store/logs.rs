use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{ErrorKind, Read, Write};
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{LogStore, StoreError, checked_key};

const LIVE_EXTENSION: &str = ".log";
const ARCHIVE_EXTENSION: &str = ".gz.b64";

/// Line-oriented logs in `{base_dir}/{name}.log`.
///
/// Rotated logs are kept next to them as `{archive}.gz.b64`: the gzip stream
/// of the live log, base64 encoded.
pub struct FileLogStore {
    base_dir: PathBuf,
}

impl FileLogStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    fn live_path(&self, log_name: &str) -> Result<PathBuf, StoreError> {
        Ok(self.base_dir.join(format!("{}{LIVE_EXTENSION}", checked_key(log_name)?)))
    }

    fn archive_path(&self, archive_name: &str) -> Result<PathBuf, StoreError> {
        Ok(self.base_dir.join(format!("{}{ARCHIVE_EXTENSION}", checked_key(archive_name)?)))
    }

    fn not_found(log_name: &str) -> StoreError {
        StoreError::NotFound { collection: "logs".to_string(), key: log_name.to_string() }
    }

    /// Inflate an archive back into the text of the log it was made from
    pub async fn decompress(&self, archive_name: &str) -> Result<String, StoreError> {
        let path = self.archive_path(archive_name)?;
        let encoded = match fs::read_to_string(&path).await {
            Ok(encoded) => encoded,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(Self::not_found(archive_name)),
            Err(e) => return Err(e.into()),
        };

        let compressed = STANDARD
            .decode(encoded.trim())
            .map_err(|_| StoreError::Encoding(archive_name.to_string()))?;

        let mut text = String::new();
        GzDecoder::new(compressed.as_slice()).read_to_string(&mut text)?;
        Ok(text)
    }
}

fn gzip_base64(raw: &[u8]) -> std::io::Result<String> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw)?;
    Ok(STANDARD.encode(encoder.finish()?))
}

#[async_trait]
impl LogStore for FileLogStore {
    async fn append(&self, log_name: &str, line: &str) -> Result<(), StoreError> {
        let path = self.live_path(log_name)?;
        fs::create_dir_all(&self.base_dir).await?;

        let mut file = fs::OpenOptions::new().create(true).append(true).open(&path).await?;
        let mut record = String::with_capacity(line.len() + 1);
        record.push_str(line);
        record.push('\n');
        file.write_all(record.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn list(&self, include_compressed: bool) -> Result<Vec<String>, StoreError> {
        let mut entries = match fs::read_dir(&self.base_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some(name) = file_name.strip_suffix(LIVE_EXTENSION) {
                names.push(name.to_string());
            } else if include_compressed {
                if let Some(name) = file_name.strip_suffix(ARCHIVE_EXTENSION) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn compress(&self, log_name: &str, archive_name: &str) -> Result<(), StoreError> {
        let source = self.live_path(log_name)?;
        let destination = self.archive_path(archive_name)?;

        let raw = match fs::read(&source).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(Self::not_found(log_name)),
            Err(e) => return Err(e.into()),
        };

        let encoded = tokio::task::spawn_blocking(move || gzip_base64(&raw))
            .await
            .map_err(std::io::Error::other)??;

        let mut file =
            match fs::OpenOptions::new().write(true).create_new(true).open(&destination).await {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    return Err(StoreError::AlreadyExists {
                        collection: "logs".to_string(),
                        key: archive_name.to_string(),
                    });
                }
                Err(e) => return Err(e.into()),
            };
        file.write_all(encoded.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn truncate(&self, log_name: &str) -> Result<(), StoreError> {
        let path = self.live_path(log_name)?;
        let file = match fs::OpenOptions::new().write(true).open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(Self::not_found(log_name)),
            Err(e) => return Err(e.into()),
        };
        file.set_len(0).await?;
        Ok(())
    }
}
