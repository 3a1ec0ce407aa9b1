//! File-based table store implementation

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use super::traits::TableStore;
use crate::application::errors::StorageError;

/// File-backed table store. Each table is a directory under the root; each
/// row is a JSON file named by the SHA256 of its key, written atomically via
/// a temporary file and rename.
pub struct FileTableStore {
    root: PathBuf,
    /// Mutex per row file to prevent concurrent write conflicts
    file_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl FileTableStore {
    /// Create a new file-backed store rooted at `root`
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            file_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Generate a SHA256-based file name to ensure uniqueness and avoid
    /// filesystem issues with caller-defined keys
    fn row_name(key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn table_dir(&self, table: &str) -> PathBuf {
        self.root.join(table)
    }

    fn row_path(&self, table: &str, key: &str) -> PathBuf {
        self.table_dir(table).join(format!("{}.json", Self::row_name(key)))
    }

    fn temp_row_path(&self, table: &str, key: &str) -> PathBuf {
        self.table_dir(table).join(format!("{}.tmp", Self::row_name(key)))
    }

    /// Get or create a file lock for the given table/key pair
    async fn file_lock(&self, table: &str, key: &str) -> Arc<Mutex<()>> {
        let lock_key = format!("{}/{}", table, Self::row_name(key));
        let mut locks = self.file_locks.lock().await;
        locks
            .entry(lock_key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Ensure the table directory exists
    async fn ensure_table_dir(&self, table: &str) -> Result<(), StorageError> {
        let dir = self.table_dir(table);
        if !dir.exists() {
            fs::create_dir_all(&dir).await.map_err(|e| {
                error!("Failed to create table directory {:?}: {}", dir, e);
                StorageError::Io(e)
            })?;
            debug!("Created table directory: {:?}", dir);
        }
        Ok(())
    }
}

#[async_trait]
impl TableStore for FileTableStore {
    async fn upsert(
        &self,
        table: &str,
        key: &str,
        row: serde_json::Value,
    ) -> Result<(), StorageError> {
        self.ensure_table_dir(table).await?;

        let lock = self.file_lock(table, key).await;
        let _guard = lock.lock().await;

        let content = serde_json::to_string_pretty(&row).map_err(StorageError::Json)?;
        let temp_path = self.temp_row_path(table, key);
        let final_path = self.row_path(table, key);

        // Write to a temporary file first, then rename into place
        fs::write(&temp_path, content).await.map_err(|e| {
            error!("Failed to write temporary row file {:?}: {}", temp_path, e);
            StorageError::Io(e)
        })?;
        fs::rename(&temp_path, &final_path).await.map_err(|e| {
            error!("Failed to rename row file {:?}: {}", final_path, e);
            StorageError::Io(e)
        })?;

        debug!("Upserted row {}/{}", table, key);
        Ok(())
    }

    async fn get(&self, table: &str, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        let path = self.row_path(table, key);

        let lock = self.file_lock(table, key).await;
        let _guard = lock.lock().await;

        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await.map_err(StorageError::Io)?;
        let row = serde_json::from_str(&content).map_err(StorageError::Json)?;
        Ok(Some(row))
    }

    async fn list(&self, table: &str) -> Result<Vec<serde_json::Value>, StorageError> {
        let dir = self.table_dir(table);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut rows = Vec::new();
        let mut entries = fs::read_dir(&dir).await.map_err(StorageError::Io)?;

        while let Some(entry) = entries.next_entry().await.map_err(StorageError::Io)? {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }

            match fs::read_to_string(&path).await {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(row) => rows.push(row),
                    Err(e) => {
                        // Corrupted rows are skipped rather than failing the scan
                        warn!("Skipping corrupted row file {:?}: {}", path, e);
                    }
                },
                Err(e) => {
                    warn!("Failed to read row file {:?}: {}", path, e);
                }
            }
        }

        Ok(rows)
    }

    async fn delete(&self, table: &str, key: &str) -> Result<bool, StorageError> {
        let path = self.row_path(table, key);

        let lock = self.file_lock(table, key).await;
        let _guard = lock.lock().await;

        if !path.exists() {
            return Ok(false);
        }

        fs::remove_file(&path).await.map_err(|e| {
            error!("Failed to delete row file {:?}: {}", path, e);
            StorageError::Io(e)
        })?;
        debug!("Deleted row {}/{}", table, key);
        Ok(true)
    }

    async fn clear(&self, table: &str) -> Result<u64, StorageError> {
        let dir = self.table_dir(table);
        if !dir.exists() {
            return Ok(0);
        }

        let mut removed = 0u64;
        let mut entries = fs::read_dir(&dir).await.map_err(StorageError::Io)?;

        while let Some(entry) = entries.next_entry().await.map_err(StorageError::Io)? {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            if let Err(e) = fs::remove_file(&path).await {
                warn!("Failed to remove row file {:?}: {}", path, e);
            } else {
                removed += 1;
            }
        }

        debug!("Cleared {} rows from table {}", removed, table);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> (tempfile::TempDir, FileTableStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTableStore::new(dir.path().to_path_buf());
        (dir, store)
    }

    #[tokio::test]
    async fn upsert_and_get_roundtrip() {
        let (_dir, store) = store();

        store
            .upsert("cache", "users:all", json!({"value": 1}))
            .await
            .unwrap();

        let row = store.get("cache", "users:all").await.unwrap();
        assert_eq!(row, Some(json!({"value": 1})));
    }

    #[tokio::test]
    async fn upsert_replaces_existing_row() {
        let (_dir, store) = store();

        store.upsert("cache", "k", json!({"v": 1})).await.unwrap();
        store.upsert("cache", "k", json!({"v": 2})).await.unwrap();

        assert_eq!(store.get("cache", "k").await.unwrap(), Some(json!({"v": 2})));
        assert_eq!(store.list("cache").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_missing_row_returns_none() {
        let (_dir, store) = store();
        assert_eq!(store.get("cache", "absent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_returns_all_rows() {
        let (_dir, store) = store();

        store.upsert("detections", "a", json!({"id": "a"})).await.unwrap();
        store.upsert("detections", "b", json!({"id": "b"})).await.unwrap();

        let rows = store.list("detections").await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn list_missing_table_is_empty() {
        let (_dir, store) = store();
        assert!(store.list("nothing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let (_dir, store) = store();

        store.upsert("cache", "k", json!(1)).await.unwrap();
        assert!(store.delete("cache", "k").await.unwrap());
        assert!(!store.delete("cache", "k").await.unwrap());
        assert_eq!(store.get("cache", "k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn clear_removes_all_rows() {
        let (_dir, store) = store();

        store.upsert("cache", "a", json!(1)).await.unwrap();
        store.upsert("cache", "b", json!(2)).await.unwrap();

        assert_eq!(store.clear("cache").await.unwrap(), 2);
        assert!(store.list("cache").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupted_rows_are_skipped_on_list() {
        let (dir, store) = store();

        store.upsert("cache", "good", json!({"v": 1})).await.unwrap();
        tokio::fs::write(dir.path().join("cache").join("broken.json"), "not json")
            .await
            .unwrap();

        let rows = store.list("cache").await.unwrap();
        assert_eq!(rows.len(), 1);
    }
}
