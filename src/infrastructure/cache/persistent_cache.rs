//! Persistent stale-while-revalidate cache
//!
//! Serves stored tenant state instantly while refreshing entries that have
//! crossed half their TTL in the background. Refreshes drain through a single
//! FIFO worker with an inter-task delay so the upstream API is never hit in
//! bursts, and a periodic sweeper removes expired rows from storage.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::application::errors::ApplicationError;
use crate::config::CacheConfig;
use crate::infrastructure::storage::TableStore;

/// Storage table holding cache rows
pub const CACHE_TABLE: &str = "cache";

/// A stored cache row. `(entry_type, key)` is unique; the payload is opaque
/// to the cache and overwritten whole on every refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub entry_type: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Storage row key for an `(entry_type, key)` pair
    pub fn row_key(entry_type: &str, key: &str) -> String {
        format!("{}:{}", entry_type, key)
    }

    /// Full lifetime this entry was written with
    pub fn ttl(&self) -> chrono::Duration {
        self.expires_at - self.updated_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// An entry is stale once its age exceeds half its TTL. Staleness is a
    /// per-entry age comparison, never a global mark-dirty pass.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired(now) && (now - self.updated_at) > self.ttl() / 2
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub background_refreshes: u64,
    pub refresh_failures: u64,
    pub dropped_refreshes: u64,
    pub swept_entries: u64,
    pub sweep_runs: u64,
}

/// Cache tuning knobs, usually derived from [`CacheConfig`]
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub default_ttl: Duration,
    pub ttl_overrides: HashMap<String, Duration>,
    pub refresh_delay: Duration,
    pub refresh_queue_capacity: usize,
    pub sweep_interval: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(1800),
            ttl_overrides: HashMap::new(),
            refresh_delay: Duration::from_millis(100),
            refresh_queue_capacity: 64,
            sweep_interval: Duration::from_secs(300),
        }
    }
}

impl CacheSettings {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            default_ttl: Duration::from_secs(config.default_ttl_seconds),
            ttl_overrides: config
                .ttl_overrides
                .iter()
                .map(|(entry_type, seconds)| (entry_type.clone(), Duration::from_secs(*seconds)))
                .collect(),
            refresh_delay: Duration::from_millis(config.refresh_delay_ms),
            refresh_queue_capacity: config.refresh_queue_capacity.max(1),
            sweep_interval: Duration::from_secs(config.sweep_interval_seconds.max(1)),
        }
    }

    /// Default TTL for an entry type
    pub fn ttl_for(&self, entry_type: &str) -> Duration {
        self.ttl_overrides
            .get(entry_type)
            .copied()
            .unwrap_or(self.default_ttl)
    }
}

type BoxedFetchFuture = Pin<Box<dyn Future<Output = Result<serde_json::Value, ApplicationError>> + Send>>;

/// One queued background refresh. Never persisted; consumed exactly once.
struct RefreshTask {
    entry_type: String,
    key: String,
    ttl: Duration,
    fetch: Box<dyn FnOnce() -> BoxedFetchFuture + Send>,
}

/// Durable key/type-addressed cache with per-entry TTL and background refresh
pub struct PersistentCache {
    store: Arc<dyn TableStore>,
    settings: CacheSettings,
    refresh_tx: mpsc::Sender<RefreshTask>,
    stats: Arc<Mutex<CacheStats>>,
    worker: std::sync::Mutex<Option<JoinHandle<()>>>,
    sweeper: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl PersistentCache {
    /// Open the cache over a storage backend, spawning the refresh worker and
    /// the expiry sweeper. The returned cache owns both tasks; call
    /// [`PersistentCache::close`] to stop them.
    pub fn open(store: Arc<dyn TableStore>, settings: CacheSettings) -> Self {
        let (refresh_tx, refresh_rx) = mpsc::channel(settings.refresh_queue_capacity);
        let stats = Arc::new(Mutex::new(CacheStats::default()));

        let worker = tokio::spawn(refresh_worker(
            refresh_rx,
            store.clone(),
            stats.clone(),
            settings.refresh_delay,
        ));
        let sweeper = tokio::spawn(sweep_loop(
            store.clone(),
            stats.clone(),
            settings.sweep_interval,
        ));

        Self {
            store,
            settings,
            refresh_tx,
            stats,
            worker: std::sync::Mutex::new(Some(worker)),
            sweeper: std::sync::Mutex::new(Some(sweeper)),
        }
    }

    /// Stop the background refresh worker and sweeper
    pub fn close(&self) {
        if let Ok(mut guard) = self.worker.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
        if let Ok(mut guard) = self.sweeper.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
        debug!("Cache background tasks stopped");
    }

    /// Read a non-expired entry. Absent, expired, and undecodable entries are
    /// all misses, as is a storage read failure (the cache fails open toward
    /// freshness rather than crashing the read path).
    pub async fn get<T>(&self, entry_type: &str, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let now = Utc::now();
        if let Some(entry) = self.load_entry(entry_type, key).await {
            if !entry.is_expired(now) {
                match serde_json::from_value(entry.payload) {
                    Ok(value) => {
                        self.stats.lock().await.hits += 1;
                        debug!("Cache hit for {}:{}", entry_type, key);
                        return Some(value);
                    }
                    Err(e) => {
                        warn!(
                            "Discarding undecodable cache payload for {}:{}: {}",
                            entry_type, key, e
                        );
                    }
                }
            }
        }
        self.stats.lock().await.misses += 1;
        None
    }

    /// Upsert an entry with `expires_at = now + ttl`, defaulting the TTL to
    /// the entry type's configured value
    pub async fn set<T>(
        &self,
        entry_type: &str,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), ApplicationError>
    where
        T: Serialize,
    {
        let payload = serde_json::to_value(value)?;
        let ttl = ttl.unwrap_or_else(|| self.settings.ttl_for(entry_type));
        persist_entry(&self.store, entry_type, key, payload, ttl).await
    }

    /// Delete a single entry, every entry of a type, or everything
    pub async fn invalidate(
        &self,
        entry_type: Option<&str>,
        key: Option<&str>,
    ) -> Result<u64, ApplicationError> {
        match (entry_type, key) {
            (Some(entry_type), Some(key)) => {
                let removed = self
                    .store
                    .delete(CACHE_TABLE, &CacheEntry::row_key(entry_type, key))
                    .await?;
                Ok(u64::from(removed))
            }
            (Some(entry_type), None) => {
                let mut removed = 0u64;
                for row in self.store.list(CACHE_TABLE).await? {
                    let Ok(entry) = serde_json::from_value::<CacheEntry>(row) else {
                        continue;
                    };
                    if entry.entry_type == entry_type {
                        let row_key = CacheEntry::row_key(&entry.entry_type, &entry.key);
                        if self.store.delete(CACHE_TABLE, &row_key).await? {
                            removed += 1;
                        }
                    }
                }
                Ok(removed)
            }
            (None, None) => Ok(self.store.clear(CACHE_TABLE).await?),
            (None, Some(_)) => Err(ApplicationError::Domain(
                crate::domain::DomainError::InvalidInput {
                    field: "entry_type".to_string(),
                    message: "Invalidating by key requires an entry type".to_string(),
                },
            )),
        }
    }

    /// Primary read path: return a stored value instantly, scheduling a
    /// background refresh once the entry has crossed half its TTL; fetch
    /// synchronously on a miss. A failed store of the fetched value is logged
    /// and swallowed so the caller still receives it.
    pub async fn get_or_fetch<T, F, Fut>(
        &self,
        entry_type: &str,
        key: &str,
        fetch: F,
    ) -> Result<T, ApplicationError>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApplicationError>> + Send + 'static,
    {
        let now = Utc::now();
        if let Some(entry) = self.load_entry(entry_type, key).await {
            if !entry.is_expired(now) {
                match serde_json::from_value::<T>(entry.payload.clone()) {
                    Ok(value) => {
                        self.stats.lock().await.hits += 1;
                        if entry.is_stale(now) {
                            let ttl = entry
                                .ttl()
                                .to_std()
                                .unwrap_or_else(|_| self.settings.ttl_for(entry_type));
                            self.schedule_refresh(entry_type, key, ttl, fetch).await;
                        }
                        return Ok(value);
                    }
                    Err(e) => {
                        warn!(
                            "Discarding undecodable cache payload for {}:{}: {}",
                            entry_type, key, e
                        );
                    }
                }
            }
        }

        self.stats.lock().await.misses += 1;
        debug!("Cache miss for {}:{}, fetching", entry_type, key);
        let value = fetch().await?;
        if let Err(e) = self.set(entry_type, key, &value, None).await {
            warn!("Failed to persist fetched entry {}:{}: {}", entry_type, key, e);
        }
        Ok(value)
    }

    /// Get cache statistics for monitoring
    pub async fn stats(&self) -> CacheStats {
        self.stats.lock().await.clone()
    }

    async fn load_entry(&self, entry_type: &str, key: &str) -> Option<CacheEntry> {
        let row_key = CacheEntry::row_key(entry_type, key);
        match self.store.get(CACHE_TABLE, &row_key).await {
            Ok(Some(row)) => match serde_json::from_value(row) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Discarding corrupted cache entry {}: {}", row_key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                // Storage failures are read as misses rather than errors
                warn!("Cache read failed for {}, treating as miss: {}", row_key, e);
                None
            }
        }
    }

    async fn schedule_refresh<T, F, Fut>(&self, entry_type: &str, key: &str, ttl: Duration, fetch: F)
    where
        T: Serialize + Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApplicationError>> + Send + 'static,
    {
        let task = RefreshTask {
            entry_type: entry_type.to_string(),
            key: key.to_string(),
            ttl,
            fetch: Box::new(move || {
                Box::pin(async move {
                    let value = fetch().await?;
                    serde_json::to_value(value).map_err(ApplicationError::Json)
                })
            }),
        };

        match self.refresh_tx.try_send(task) {
            Ok(()) => debug!("Scheduled background refresh for {}:{}", entry_type, key),
            Err(TrySendError::Full(_)) => {
                // The entry is still valid; the next stale read re-queues it
                debug!("Refresh queue full, dropping refresh for {}:{}", entry_type, key);
                self.stats.lock().await.dropped_refreshes += 1;
            }
            Err(TrySendError::Closed(_)) => {
                warn!("Refresh queue closed, cache is shutting down");
            }
        }
    }
}

impl Drop for PersistentCache {
    fn drop(&mut self) {
        self.close();
    }
}

/// Write an entry, preserving `created_at` across overwrites
async fn persist_entry(
    store: &Arc<dyn TableStore>,
    entry_type: &str,
    key: &str,
    payload: serde_json::Value,
    ttl: Duration,
) -> Result<(), ApplicationError> {
    let now = Utc::now();
    let row_key = CacheEntry::row_key(entry_type, key);

    let created_at = match store.get(CACHE_TABLE, &row_key).await {
        Ok(Some(row)) => serde_json::from_value::<CacheEntry>(row)
            .map(|existing| existing.created_at)
            .unwrap_or(now),
        _ => now,
    };

    let ttl = chrono::Duration::from_std(ttl).map_err(|_| ApplicationError::Configuration {
        message: format!("Cache TTL out of range for {}:{}", entry_type, key),
    })?;

    let entry = CacheEntry {
        key: key.to_string(),
        entry_type: entry_type.to_string(),
        payload,
        created_at,
        updated_at: now,
        expires_at: now + ttl,
    };

    store
        .upsert(CACHE_TABLE, &row_key, serde_json::to_value(&entry)?)
        .await?;
    Ok(())
}

/// Single FIFO consumer of the refresh queue. The inter-task delay keeps
/// refresh traffic from bursting the upstream API; a failed refresh never
/// evicts the stale value already being served.
async fn refresh_worker(
    mut refresh_rx: mpsc::Receiver<RefreshTask>,
    store: Arc<dyn TableStore>,
    stats: Arc<Mutex<CacheStats>>,
    refresh_delay: Duration,
) {
    while let Some(task) = refresh_rx.recv().await {
        tokio::time::sleep(refresh_delay).await;

        match (task.fetch)().await {
            Ok(payload) => {
                match persist_entry(&store, &task.entry_type, &task.key, payload, task.ttl).await {
                    Ok(()) => {
                        stats.lock().await.background_refreshes += 1;
                        debug!("Refreshed cache entry {}:{}", task.entry_type, task.key);
                    }
                    Err(e) => {
                        warn!(
                            "Failed to persist refreshed entry {}:{}: {}",
                            task.entry_type, task.key, e
                        );
                        stats.lock().await.refresh_failures += 1;
                    }
                }
            }
            Err(e) => {
                warn!(
                    "Background refresh failed for {}:{}: {}",
                    task.entry_type, task.key, e
                );
                stats.lock().await.refresh_failures += 1;
            }
        }
    }
    debug!("Refresh worker stopped");
}

/// Periodically delete rows whose `expires_at` has passed
async fn sweep_loop(
    store: Arc<dyn TableStore>,
    stats: Arc<Mutex<CacheStats>>,
    sweep_interval: Duration,
) {
    let mut ticker = interval(sweep_interval);
    // The first tick completes immediately; skip it so sweeps are spaced
    ticker.tick().await;

    loop {
        ticker.tick().await;

        match sweep_expired(&store).await {
            Ok(removed) => {
                let mut stats = stats.lock().await;
                stats.swept_entries += removed;
                stats.sweep_runs += 1;
                if removed > 0 {
                    info!("Cache sweep removed {} expired entries", removed);
                }
            }
            Err(e) => error!("Cache sweep failed: {}", e),
        }
    }
}

async fn sweep_expired(store: &Arc<dyn TableStore>) -> Result<u64, ApplicationError> {
    let now = Utc::now();
    let mut removed = 0u64;

    for row in store.list(CACHE_TABLE).await? {
        let Ok(entry) = serde_json::from_value::<CacheEntry>(row) else {
            continue;
        };
        if entry.is_expired(now) {
            let row_key = CacheEntry::row_key(&entry.entry_type, &entry.key);
            if store.delete(CACHE_TABLE, &row_key).await? {
                removed += 1;
            }
        }
    }

    Ok(removed)
}
