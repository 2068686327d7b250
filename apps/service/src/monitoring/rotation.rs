//! Daily rotation of the per-check outcome logs.
//!
//! Every live log is compressed into `{check id}-{unix millis}` and only then
//! emptied. A log whose compression fails keeps its contents until the next
//! rotation.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::store::LogStore;

/// What happened to a single log during a rotation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationResult {
    Rotated { archive: String },
    /// Nothing was archived, so the live log was left alone
    CompressFailed(String),
    /// The archive exists but the live log still holds its old entries
    TruncateFailed { archive: String, error: String },
}

#[derive(Debug, Default)]
pub struct RotationReport {
    pub results: Vec<(String, RotationResult)>,
}

impl RotationReport {
    pub fn result(&self, log_name: &str) -> Option<&RotationResult> {
        self.results.iter().find(|(name, _)| name == log_name).map(|(_, result)| result)
    }

    pub fn rotated(&self) -> usize {
        self.results
            .iter()
            .filter(|(_, result)| matches!(result, RotationResult::Rotated { .. }))
            .count()
    }
}

pub struct LogRotator {
    log_store: Arc<dyn LogStore>,
}

impl LogRotator {
    pub fn new(log_store: Arc<dyn LogStore>) -> Self {
        Self { log_store }
    }

    /// Archive and clear every uncompressed log
    pub async fn rotate(&self) -> RotationReport {
        let logs = match self.log_store.list(false).await {
            Ok(logs) if logs.is_empty() => {
                debug!("Could not find any logs to rotate");
                return RotationReport::default();
            }
            Ok(logs) => logs,
            Err(e) => {
                error!("Could not list logs for rotation: {e}");
                return RotationReport::default();
            }
        };

        let now = chrono::Utc::now().timestamp_millis();
        let results = join_all(logs.iter().map(|log_name| self.rotate_one(log_name, now))).await;

        let report = RotationReport { results: logs.into_iter().zip(results).collect() };
        info!("Log rotation finished: {}/{} logs rotated", report.rotated(), report.results.len());
        report
    }

    async fn rotate_one(&self, log_name: &str, now: i64) -> RotationResult {
        let check_id = check_id_from_log_name(log_name);
        let archive = archive_name(check_id, now);

        if let Err(e) = self.log_store.compress(check_id, &archive).await {
            warn!("Error compressing log {log_name}: {e}");
            return RotationResult::CompressFailed(e.to_string());
        }

        match self.log_store.truncate(check_id).await {
            Ok(()) => {
                debug!("Rotated log {log_name} into {archive}");
                RotationResult::Rotated { archive }
            }
            Err(e) => {
                warn!("Error truncating log {log_name} after archiving it as {archive}: {e}");
                RotationResult::TruncateFailed { archive, error: e.to_string() }
            }
        }
    }
}

/// Log names may or may not carry the `.log` extension
pub fn check_id_from_log_name(log_name: &str) -> &str {
    log_name.strip_suffix(".log").unwrap_or(log_name)
}

pub fn archive_name(check_id: &str, timestamp_millis: i64) -> String {
    format!("{check_id}-{timestamp_millis}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FileLogStore;
    use crate::testing::MemoryLogStore;
    use tempfile::tempdir;

    #[test]
    fn test_names() {
        assert_eq!(check_id_from_log_name("abc.log"), "abc");
        assert_eq!(check_id_from_log_name("abc"), "abc");
        assert_eq!(archive_name("abc", 1_700_000_000_000), "abc-1700000000000");
    }

    #[tokio::test]
    async fn test_rotates_every_log() {
        let store = Arc::new(MemoryLogStore::default());
        store.seed("aaa", &["1", "2"]);
        store.seed("bbb", &["3"]);

        let report = LogRotator::new(store.clone()).rotate().await;
        assert_eq!(report.rotated(), 2);

        let archives = store.archive_names();
        assert_eq!(archives.len(), 2);
        assert!(archives[0].starts_with("aaa-"));
        assert!(archives[1].starts_with("bbb-"));
        assert_eq!(store.archive(&archives[0]).unwrap(), vec!["1", "2"]);
        assert!(store.lines("aaa").is_empty());
        assert!(store.lines("bbb").is_empty());
    }

    #[tokio::test]
    async fn test_compress_failure_never_truncates() {
        let store = Arc::new(MemoryLogStore::default());
        store.seed("aaa", &["keep me"]);
        store.seed("bbb", &["rotate me"]);
        store.fail_compress_of("aaa");

        let report = LogRotator::new(store.clone()).rotate().await;

        assert!(matches!(report.result("aaa"), Some(RotationResult::CompressFailed(_))));
        assert!(matches!(report.result("bbb"), Some(RotationResult::Rotated { .. })));
        assert!(!store.calls().contains(&"truncate:aaa".to_string()));
        assert_eq!(store.lines("aaa"), vec!["keep me"]);
        assert!(store.lines("bbb").is_empty());
    }

    #[tokio::test]
    async fn test_truncate_happens_after_compress() {
        let store = Arc::new(MemoryLogStore::default());
        store.seed("aaa", &["x"]);

        LogRotator::new(store.clone()).rotate().await;
        assert_eq!(store.calls(), vec!["compress:aaa", "truncate:aaa"]);
    }

    #[tokio::test]
    async fn test_truncate_failure_is_reported() {
        let store = Arc::new(MemoryLogStore::default());
        store.seed("aaa", &["x"]);
        store.fail_truncate_of("aaa");

        let report = LogRotator::new(store.clone()).rotate().await;
        match report.result("aaa") {
            Some(RotationResult::TruncateFailed { archive, .. }) => {
                assert!(archive.starts_with("aaa-"));
                assert_eq!(store.archive(archive).unwrap(), vec!["x"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_nothing_to_rotate() {
        let store = Arc::new(MemoryLogStore::default());
        assert!(LogRotator::new(store.clone()).rotate().await.results.is_empty());

        store.seed("aaa", &["x"]);
        store.fail_list(true);
        assert!(LogRotator::new(store.clone()).rotate().await.results.is_empty());
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_rotation_on_disk() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FileLogStore::new(dir.path()));
        store.append("abcdefghij0123456789", r#"{"newState":"up"}"#).await.unwrap();

        let report = LogRotator::new(store.clone()).rotate().await;
        let Some(RotationResult::Rotated { archive }) = report.result("abcdefghij0123456789") else {
            panic!("log was not rotated: {report:?}");
        };

        assert_eq!(store.decompress(archive).await.unwrap(), "{\"newState\":\"up\"}\n");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("abcdefghij0123456789.log")).unwrap(),
            ""
        );
        // Archives are not rotated again.
        assert_eq!(store.list(false).await.unwrap(), vec!["abcdefghij0123456789"]);
    }
}
