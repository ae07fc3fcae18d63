//! One JSON file per key under a data directory.
//!
//! Writes go to a temporary sibling file that is then renamed over the
//! target, so readers see either the old or the new document. Writers are
//! serialized by a single async mutex, which also makes `append` atomic.

use async_trait::async_trait;
use aurora_kernel::storage::{JsonStore, StoreError, StoreResult, validate_key};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

pub struct FileJsonStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileJsonStore {
    /// Open (creating if needed) the store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        debug!(root = %root.display(), "opened file store");
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    async fn load(&self, key: &str) -> StoreResult<Option<Value>> {
        match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn replace(&self, key: &str, value: &Value) -> StoreResult<()> {
        let tmp = self.root.join(format!(".{key}.{}.tmp", Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(value)?).await?;
        if let Err(e) = tokio::fs::rename(&tmp, self.path(key)).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl JsonStore for FileJsonStore {
    async fn read(&self, key: &str) -> StoreResult<Option<Value>> {
        validate_key(key)?;
        self.load(key).await
    }

    async fn write(&self, key: &str, value: &Value) -> StoreResult<()> {
        validate_key(key)?;
        let _guard = self.write_lock.lock().await;
        self.replace(key, value).await
    }

    async fn append(&self, key: &str, value: Value) -> StoreResult<usize> {
        validate_key(key)?;
        let _guard = self.write_lock.lock().await;
        let mut items = match self.load(key).await? {
            None => Vec::new(),
            Some(Value::Array(items)) => items,
            Some(_) => return Err(StoreError::NotAnArray(key.to_string())),
        };
        items.push(value);
        let len = items.len();
        self.replace(key, &Value::Array(items)).await?;
        Ok(len)
    }

    async fn list(&self) -> StoreResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(key) = name.strip_suffix(".json").filter(|k| validate_key(k).is_ok()) {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn write_read_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileJsonStore::open(dir.path().join("data")).await.unwrap();

        assert_eq!(store.read("stats").await.unwrap(), None);
        store.write("stats", &json!({ "results": 1 })).await.unwrap();
        store.write("questions", &json!([])).await.unwrap();
        assert_eq!(
            store.read("stats").await.unwrap(),
            Some(json!({ "results": 1 }))
        );
        assert_eq!(store.list().await.unwrap(), vec!["questions", "stats"]);
    }

    #[tokio::test]
    async fn list_skips_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileJsonStore::open(dir.path()).await.unwrap();
        store.write("results", &json!([])).await.unwrap();
        for stray in ["notes.txt", "bad key.json", ".json", "results.json.tmp"] {
            tokio::fs::write(dir.path().join(stray), b"{}").await.unwrap();
        }
        assert_eq!(store.list().await.unwrap(), vec!["results"]);
    }

    #[tokio::test]
    async fn concurrent_appends_are_all_kept() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileJsonStore::open(dir.path()).await.unwrap());
        let mut tasks = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.append("results", json!({ "n": i })).await.unwrap()
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }
        let stored = store.read("results").await.unwrap().unwrap();
        assert_eq!(stored.as_array().unwrap().len(), 20);
    }

    #[tokio::test]
    async fn rejects_path_traversal_and_non_arrays() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileJsonStore::open(dir.path()).await.unwrap();
        assert!(matches!(
            store.read("../secret").await,
            Err(StoreError::InvalidKey(_))
        ));
        store.write("stats", &json!({})).await.unwrap();
        assert!(matches!(
            store.append("stats", json!(1)).await,
            Err(StoreError::NotAnArray(_))
        ));
    }

    #[tokio::test]
    async fn corrupt_document_is_a_serde_error() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("stats.json"), b"{not json")
            .await
            .unwrap();
        let store = FileJsonStore::open(dir.path()).await.unwrap();
        assert!(matches!(store.read("stats").await, Err(StoreError::Serde(_))));
    }
}
