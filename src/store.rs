//! # Headlines store
//! One JSON document of headlines plus its derived statistics, kept in a
//! key-value backend.
//!
//! There is no version check: concurrent writers overwrite each other's
//! whole document, last write wins. That is fine for a single-operator
//! editing tool and wrong for anything multi-user. Saves through one
//! [`HeadlinesStore`] are serialized, so the document and its statistics
//! always come from the same writer.
//!
//! The two keys are not written atomically. The document goes first; if
//! the statistics write then fails the save reports an error, but the new
//! document is already in place and `latest_stats` is stale until the next
//! successful save.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::aggregate::compute_stats;
use crate::error::StoreError;
use crate::model::{Article, HeadlinesDoc, Snapshot};

/// Key of the headlines document.
pub const HEADLINES_KEY: &str = "all_headlines";
/// Key of the statistics recomputed on every save.
pub const STATS_KEY: &str = "latest_stats";

/// Minimal string key-value backend.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn put(&self, key: &str, value: String) -> Result<(), StoreError>;
}

/// Process-local backend; contents vanish with the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.inner.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// One `<key>.json` file per key inside `dir`. Every write goes to its own
/// temp file in `dir` and is renamed into place, so overlapping writes to
/// one key never see each other's partial output.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let ok = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !ok {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(value.as_bytes())?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Io(std::io::Error::other(e)))?
    }
}

/// Result of a successful save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOutcome {
    pub count: usize,
}

/// Typed access to the headlines document on top of a [`KvStore`].
pub struct HeadlinesStore {
    kv: Arc<dyn KvStore>,
    /// Held across both writes of a save.
    write_lock: Arc<Mutex<()>>,
}

impl Clone for HeadlinesStore {
    fn clone(&self) -> Self {
        Self {
            kv: Arc::clone(&self.kv),
            write_lock: Arc::clone(&self.write_lock),
        }
    }
}

impl HeadlinesStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            kv,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Stored document, or an empty one if nothing has been saved yet.
    pub async fn load(&self) -> Result<HeadlinesDoc, StoreError> {
        match self.kv.get(HEADLINES_KEY).await? {
            Some(raw) => {
                let doc: HeadlinesDoc = serde_json::from_str(&raw)?;
                Ok(doc)
            }
            None => Ok(HeadlinesDoc::empty()),
        }
    }

    /// Replace the whole document and recompute statistics.
    pub async fn save(&self, headlines: Vec<Article>) -> Result<SaveOutcome, StoreError> {
        let stats = compute_stats(&headlines);
        let doc = HeadlinesDoc::new(headlines);
        let count = doc.count;

        let doc_json = serde_json::to_string(&doc)?;
        let stats_json = serde_json::to_string(&Snapshot {
            generated_at: doc.generated_at.clone(),
            ..stats
        })?;

        let _guard = self.write_lock.lock().await;
        self.kv.put(HEADLINES_KEY, doc_json).await?;
        self.kv.put(STATS_KEY, stats_json).await?;

        info!(target: "store", count, "headlines saved");
        Ok(SaveOutcome { count })
    }

    /// Statistics written by the last save, if any.
    pub async fn latest_stats(&self) -> Result<Option<Snapshot>, StoreError> {
        match self.kv.get(STATS_KEY).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => {
                debug!(target: "store", "no stats stored yet");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sentiment;

    #[tokio::test]
    async fn empty_store_loads_empty_doc() {
        let s = HeadlinesStore::in_memory();
        let doc = s.load().await.unwrap();
        assert_eq!(doc.count, 0);
        assert!(doc.headlines.is_empty());
        assert!(s.latest_stats().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_writes_doc_and_stats() {
        let s = HeadlinesStore::in_memory();
        let arts = vec![
            Article {
                title: "a".into(),
                source: Some("CNN".into()),
                sentiment: Some(Sentiment::Positive),
                ..Default::default()
            },
            Article {
                title: "b".into(),
                source: Some("CNN".into()),
                sentiment: Some(Sentiment::Negative),
                ..Default::default()
            },
        ];
        let out = s.save(arts).await.unwrap();
        assert_eq!(out.count, 2);

        let doc = s.load().await.unwrap();
        assert_eq!(doc.count, 2);
        let stats = s.latest_stats().await.unwrap().unwrap();
        assert_eq!(stats.generated_at, doc.generated_at);
        assert_eq!(stats.totals.positive, 1);
        assert_eq!(stats.by_publication[0].count, 2);
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let fs = FileStore::new("/tmp/x");
        assert!(matches!(fs.path_for("../etc"), Err(StoreError::InvalidKey(_))));
        assert!(fs.path_for(HEADLINES_KEY).is_ok());
    }
}
