//! Cache store seam and snapshot lookups.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;
use thiserror::Error;

use crate::entry::CachedEntry;
use crate::key::CacheKey;
use crate::policy::SnapshotPolicy;

/// Errors that can occur when using a cache store.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Failed to open the store.
    #[error("Failed to open store: {0}")]
    Open(String),

    /// Failed to serialize or deserialize an entry.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to perform a store operation.
    #[error("Store operation failed: {0}")]
    Store(String),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Key-value storage for rendered snapshots.
///
/// Implementations decide eviction; the gateway never deletes entries.
#[async_trait(?Send)]
pub trait CacheStore {
    /// Fetch the entry stored under a key.
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<CachedEntry>>;

    /// Store an entry under a key, replacing any previous one.
    async fn put(&self, key: &CacheKey, entry: CachedEntry) -> CacheResult<()>;
}

/// Process-local store for long-lived hosts and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, CachedEntry>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Check if a key has an entry.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.borrow().contains_key(key.as_str())
    }
}

#[async_trait(?Send)]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<CachedEntry>> {
        Ok(self.entries.borrow().get(key.as_str()).cloned())
    }

    async fn put(&self, key: &CacheKey, entry: CachedEntry) -> CacheResult<()> {
        self.entries
            .borrow_mut()
            .insert(key.as_str().to_string(), entry);
        Ok(())
    }
}

/// Stand-in for a store that could not be opened.
///
/// Every read and write fails with the recorded reason, so lookups degrade
/// to misses and the request is still served.
#[derive(Debug, Clone)]
pub struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    /// Create a store that fails every operation with `reason`.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Why the real store is unavailable.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[async_trait(?Send)]
impl CacheStore for UnavailableStore {
    async fn get(&self, _key: &CacheKey) -> CacheResult<Option<CachedEntry>> {
        Err(CacheError::Store(self.reason.clone()))
    }

    async fn put(&self, _key: &CacheKey, _entry: CachedEntry) -> CacheResult<()> {
        Err(CacheError::Store(self.reason.clone()))
    }
}

/// Snapshot store backed by Spin's Key-Value Store.
///
/// Entries are stored as JSON under the key's storage string.
#[cfg(target_arch = "wasm32")]
pub struct SpinKvStore {
    store: spin_sdk::key_value::Store,
}

#[cfg(target_arch = "wasm32")]
impl SpinKvStore {
    /// Open the default Key-Value store.
    pub fn open_default() -> CacheResult<Self> {
        let store = spin_sdk::key_value::Store::open_default()
            .map_err(|e| CacheError::Open(e.to_string()))?;
        Ok(Self { store })
    }

    /// Open a named Key-Value store.
    pub fn open(name: &str) -> CacheResult<Self> {
        let store =
            spin_sdk::key_value::Store::open(name).map_err(|e| CacheError::Open(e.to_string()))?;
        Ok(Self { store })
    }
}

#[cfg(target_arch = "wasm32")]
#[async_trait(?Send)]
impl CacheStore for SpinKvStore {
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<CachedEntry>> {
        match self.store.get(key.as_str()) {
            Ok(Some(bytes)) => Ok(Some(CachedEntry::from_bytes(&bytes)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(CacheError::Store(e.to_string())),
        }
    }

    async fn put(&self, key: &CacheKey, entry: CachedEntry) -> CacheResult<()> {
        let bytes = entry.to_bytes()?;
        self.store
            .set(key.as_str(), &bytes)
            .map_err(|e| CacheError::Store(e.to_string()))
    }
}

/// Cache status reported on bot responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from the store.
    Hit,
    /// Not found (or unreadable) in the store.
    Miss,
}

impl CacheStatus {
    /// Header value for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a snapshot lookup.
#[derive(Debug)]
pub enum CacheLookup {
    /// A usable entry was found.
    Hit(CachedEntry),
    /// No entry, or an entry recorded for a different URL.
    Miss,
    /// The store failed. Treated as a miss.
    Unavailable(CacheError),
}

impl CacheLookup {
    /// The status this outcome reports.
    pub fn status(&self) -> CacheStatus {
        match self {
            CacheLookup::Hit(_) => CacheStatus::Hit,
            CacheLookup::Miss | CacheLookup::Unavailable(_) => CacheStatus::Miss,
        }
    }
}

/// Snapshot cache over a pluggable store.
///
/// Store failures never propagate: lookups degrade to misses and writes
/// report their error to the caller for logging.
#[derive(Clone)]
pub struct SnapshotCache {
    store: Rc<dyn CacheStore>,
    policy: SnapshotPolicy,
}

impl SnapshotCache {
    /// Create a snapshot cache.
    pub fn new(store: Rc<dyn CacheStore>, policy: SnapshotPolicy) -> Self {
        Self { store, policy }
    }

    /// Policy applied to new entries.
    pub fn policy(&self) -> &SnapshotPolicy {
        &self.policy
    }

    /// The underlying store.
    pub fn store(&self) -> Rc<dyn CacheStore> {
        Rc::clone(&self.store)
    }

    /// Look up the snapshot for a key.
    pub async fn lookup(&self, key: &CacheKey) -> CacheLookup {
        match self.store.get(key).await {
            Ok(Some(entry)) if entry.url == key.url() => CacheLookup::Hit(entry),
            Ok(_) => CacheLookup::Miss,
            Err(e) => CacheLookup::Unavailable(e),
        }
    }

    /// Build an entry for freshly rendered HTML under this cache's policy.
    pub fn entry_for(&self, key: &CacheKey, html: impl Into<Vec<u8>>) -> CachedEntry {
        CachedEntry::new(key.url(), html, &self.policy)
    }

    /// Store an entry.
    pub async fn put(&self, key: &CacheKey, entry: CachedEntry) -> CacheResult<()> {
        self.store.put(key, entry).await
    }
}

impl std::fmt::Debug for SnapshotCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotCache")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
