//! Saved traces ("threads"), newest first, capped at `MAX_THREADS`.
//!
//! The whole list is stored as one JSON blob under `STORAGE_KEY` in a
//! key-value store and rewritten on every change. Storage failures are logged
//! and otherwise ignored: the in-memory list stays authoritative.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::error::StoreError;
use crate::trace::TraceData;

pub const STORAGE_KEY: &str = "trace-viewer-threads";
pub const MAX_THREADS: usize = 50;
const UNTITLED: &str = "Untitled Trace";

/// A normalized trace the user opened, kept for later
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: String,
    pub title: String,
    pub data: TraceData,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub event_count: usize,
}

/// Thread without its trace payload (for sidebar listings)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSummary {
    pub id: String,
    pub title: String,
    pub timestamp: i64,
    pub event_count: usize,
}

impl From<&Thread> for ThreadSummary {
    fn from(t: &Thread) -> Self {
        Self {
            id: t.id.clone(),
            title: t.title.clone(),
            timestamp: t.timestamp,
            event_count: t.event_count,
        }
    }
}

/// Partial update; unset fields are left alone
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadUpdate {
    pub title: Option<String>,
    pub data: Option<TraceData>,
}

/// Blob storage the thread list is persisted into
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// One `<key>.json` file per key inside a directory
pub struct FileKvStore {
    dir: PathBuf,
}

impl FileKvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        // Write-then-rename so a crash never leaves a truncated blob
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Process-local store, used when nothing should touch disk
#[derive(Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, String>>,
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

pub struct ThreadStore {
    threads: RwLock<Vec<Thread>>,
    kv: Arc<dyn KvStore>,
}

impl ThreadStore {
    /// Open the store, starting from whatever list was persisted last.
    pub fn load(kv: Arc<dyn KvStore>) -> Self {
        let threads = match read_threads(kv.as_ref()) {
            Ok(threads) => {
                info!("Loaded {} saved threads", threads.len());
                threads
            }
            Err(e) => {
                error!("Failed to load threads from storage: {}", e);
                Vec::new()
            }
        };
        Self {
            threads: RwLock::new(threads),
            kv,
        }
    }

    /// Save a trace as a new thread at the top of the list. Returns its id.
    pub async fn add(&self, data: TraceData) -> String {
        let id = new_thread_id();
        let title = if data.title.is_empty() {
            UNTITLED.to_string()
        } else {
            data.title.clone()
        };
        let thread = Thread {
            id: id.clone(),
            title,
            event_count: data.events.len(),
            data,
            timestamp: now_millis(),
        };

        let mut threads = self.threads.write().await;
        threads.insert(0, thread);
        if threads.len() > MAX_THREADS {
            let evicted = threads.len() - MAX_THREADS;
            threads.truncate(MAX_THREADS);
            debug!("Evicted {} oldest threads", evicted);
        }
        self.persist(&threads);
        id
    }

    /// Apply a partial update. Returns false when the id is unknown.
    pub async fn update(&self, id: &str, update: ThreadUpdate) -> bool {
        let mut threads = self.threads.write().await;
        let Some(thread) = threads.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        if let Some(title) = update.title {
            thread.title = title;
        }
        if let Some(data) = update.data {
            thread.event_count = data.events.len();
            thread.data = data;
        }
        thread.timestamp = now_millis();
        self.persist(&threads);
        true
    }

    pub async fn rename(&self, id: &str, title: String) -> bool {
        self.update(
            id,
            ThreadUpdate {
                title: Some(title),
                data: None,
            },
        )
        .await
    }

    pub async fn delete(&self, id: &str) -> bool {
        let mut threads = self.threads.write().await;
        let before = threads.len();
        threads.retain(|t| t.id != id);
        let removed = threads.len() != before;
        if removed {
            self.persist(&threads);
        }
        removed
    }

    pub async fn get(&self, id: &str) -> Option<Thread> {
        self.threads.read().await.iter().find(|t| t.id == id).cloned()
    }

    pub async fn list(&self) -> Vec<ThreadSummary> {
        self.threads.read().await.iter().map(ThreadSummary::from).collect()
    }

    pub async fn clear(&self) {
        let mut threads = self.threads.write().await;
        threads.clear();
        self.persist(&threads);
    }

    fn persist(&self, threads: &[Thread]) {
        let result = serde_json::to_string(threads)
            .map_err(StoreError::from)
            .and_then(|json| self.kv.set(STORAGE_KEY, &json));
        if let Err(e) = result {
            error!("Failed to save threads to storage: {}", e);
        }
    }
}

fn read_threads(kv: &dyn KvStore) -> Result<Vec<Thread>, StoreError> {
    match kv.get(STORAGE_KEY)? {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(Vec::new()),
    }
}

fn new_thread_id() -> String {
    let token = uuid::Uuid::new_v4().simple().to_string();
    format!("thread-{}-{}", now_millis(), &token[..9])
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
