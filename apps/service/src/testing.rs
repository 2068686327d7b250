//! In-memory collaborators with failure injection for pipeline tests.

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::monitoring::prober::Prober;
use crate::monitoring::types::{Check, CheckOutcome, CheckState, HttpMethod, Protocol};
use crate::notify::{Notifier, NotifyError};
use crate::store::{DataStore, LogStore, StoreError};

pub fn sample_check(id: &str) -> Check {
    Check {
        id: id.to_string(),
        phone: "5551234567".into(),
        protocol: Protocol::Https,
        url: "example.com".into(),
        method: HttpMethod::Get,
        success_codes: vec![200],
        timeout_sec: 3,
        state: CheckState::Down,
        last_checked: None,
        extra: Map::new(),
    }
}

pub fn sample_record(id: &str) -> Value {
    json!({
        "id": id,
        "phone": "5551234567",
        "protocol": "https",
        "url": "example.com",
        "method": "GET",
        "successCodes": [200],
        "timeoutSec": 3
    })
}

fn io_failure(what: &str) -> StoreError {
    StoreError::Io(std::io::Error::other(format!("injected {what} failure")))
}

#[derive(Default)]
pub struct MemoryDataStore {
    records: Mutex<BTreeMap<String, BTreeMap<String, Value>>>,
    fail_list: AtomicBool,
    fail_updates: AtomicBool,
    unreadable: Mutex<HashSet<String>>,
}

impl MemoryDataStore {
    pub fn insert(&self, collection: &str, id: &str, record: Value) {
        self.records
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), record);
    }

    pub fn get(&self, collection: &str, id: &str) -> Option<Value> {
        self.records.lock().unwrap().get(collection).and_then(|c| c.get(id)).cloned()
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn make_unreadable(&self, id: &str) {
        self.unreadable.lock().unwrap().insert(id.to_string());
    }
}

#[async_trait]
impl DataStore for MemoryDataStore {
    async fn list(&self, collection: &str) -> Result<Vec<String>, StoreError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(io_failure("list"));
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(collection)
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn read(&self, collection: &str, id: &str) -> Result<Value, StoreError> {
        if self.unreadable.lock().unwrap().contains(id) {
            return Err(io_failure("read"));
        }
        self.get(collection, id).ok_or_else(|| StoreError::NotFound {
            collection: collection.to_string(),
            key: id.to_string(),
        })
    }

    async fn update(&self, collection: &str, id: &str, record: &Value) -> Result<(), StoreError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(io_failure("update"));
        }
        let mut records = self.records.lock().unwrap();
        match records.get_mut(collection).and_then(|c| c.get_mut(id)) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound {
                collection: collection.to_string(),
                key: id.to_string(),
            }),
        }
    }
}

#[derive(Default)]
pub struct MemoryLogStore {
    logs: Mutex<BTreeMap<String, Vec<String>>>,
    archives: Mutex<BTreeMap<String, Vec<String>>>,
    calls: Mutex<Vec<String>>,
    fail_appends: AtomicBool,
    fail_list: AtomicBool,
    failing_compress: Mutex<HashSet<String>>,
    failing_truncate: Mutex<HashSet<String>>,
}

impl MemoryLogStore {
    pub fn lines(&self, log_name: &str) -> Vec<String> {
        self.logs.lock().unwrap().get(log_name).cloned().unwrap_or_default()
    }

    pub fn archive_names(&self) -> Vec<String> {
        self.archives.lock().unwrap().keys().cloned().collect()
    }

    pub fn archive(&self, archive_name: &str) -> Option<Vec<String>> {
        self.archives.lock().unwrap().get(archive_name).cloned()
    }

    /// `compress:{name}` / `truncate:{name}` in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn seed(&self, log_name: &str, lines: &[&str]) {
        self.logs
            .lock()
            .unwrap()
            .insert(log_name.to_string(), lines.iter().map(|l| l.to_string()).collect());
    }

    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_compress_of(&self, log_name: &str) {
        self.failing_compress.lock().unwrap().insert(log_name.to_string());
    }

    pub fn fail_truncate_of(&self, log_name: &str) {
        self.failing_truncate.lock().unwrap().insert(log_name.to_string());
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn append(&self, log_name: &str, line: &str) -> Result<(), StoreError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(io_failure("append"));
        }
        self.logs.lock().unwrap().entry(log_name.to_string()).or_default().push(line.to_string());
        Ok(())
    }

    async fn list(&self, include_compressed: bool) -> Result<Vec<String>, StoreError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(io_failure("list"));
        }
        let mut names: Vec<String> = self.logs.lock().unwrap().keys().cloned().collect();
        if include_compressed {
            names.extend(self.archive_names());
        }
        Ok(names)
    }

    async fn compress(&self, log_name: &str, archive_name: &str) -> Result<(), StoreError> {
        self.calls.lock().unwrap().push(format!("compress:{log_name}"));
        if self.failing_compress.lock().unwrap().contains(log_name) {
            return Err(io_failure("compress"));
        }
        let lines = self.lines(log_name);
        self.archives.lock().unwrap().insert(archive_name.to_string(), lines);
        Ok(())
    }

    async fn truncate(&self, log_name: &str) -> Result<(), StoreError> {
        self.calls.lock().unwrap().push(format!("truncate:{log_name}"));
        if self.failing_truncate.lock().unwrap().contains(log_name) {
            return Err(io_failure("truncate"));
        }
        if let Some(lines) = self.logs.lock().unwrap().get_mut(log_name) {
            lines.clear();
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, destination: &str, message: &str) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Rejected { status: 500, body: "injected".into() });
        }
        self.sent.lock().unwrap().push((destination.to_string(), message.to_string()));
        Ok(())
    }
}

/// Answers every probe from a table keyed by check url
pub struct ScriptedProber {
    outcomes: HashMap<String, CheckOutcome>,
    fallback: CheckOutcome,
    delay: Duration,
    probed: Mutex<Vec<String>>,
}

impl ScriptedProber {
    pub fn always(outcome: CheckOutcome) -> Self {
        Self {
            outcomes: HashMap::new(),
            fallback: outcome,
            delay: Duration::ZERO,
            probed: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, url: &str, outcome: CheckOutcome) -> Self {
        self.outcomes.insert(url.to_string(), outcome);
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Ids of every check probed so far
    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, check: &Check) -> CheckOutcome {
        self.probed.lock().unwrap().push(check.id.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcomes.get(&check.url).cloned().unwrap_or_else(|| self.fallback.clone())
    }
}
