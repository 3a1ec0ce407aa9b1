//! Traits for the pluggable persistence backend

use async_trait::async_trait;

use crate::application::errors::StorageError;

/// Key-addressed CRUD over JSON rows. Tables are logical namespaces; a row is
/// written whole with a single primary-keyed upsert and never partially.
/// Table creation is idempotent and handled by the implementation.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Insert or replace the row stored under `key`
    async fn upsert(
        &self,
        table: &str,
        key: &str,
        row: serde_json::Value,
    ) -> Result<(), StorageError>;

    /// Read the row stored under `key`, if any
    async fn get(&self, table: &str, key: &str) -> Result<Option<serde_json::Value>, StorageError>;

    /// Read every row in the table, in no particular order
    async fn list(&self, table: &str) -> Result<Vec<serde_json::Value>, StorageError>;

    /// Delete the row stored under `key`. Returns whether a row existed.
    async fn delete(&self, table: &str, key: &str) -> Result<bool, StorageError>;

    /// Delete every row in the table, returning the number removed
    async fn clear(&self, table: &str) -> Result<u64, StorageError>;
}
