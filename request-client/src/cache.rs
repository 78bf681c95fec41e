use crate::error::Result;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Weak};

#[cfg(feature = "graphql")]
use async_graphql::SimpleObject;

/// A pending GET whose outcome is handed to every holder of a clone.
/// Awaiting a clone never issues the request a second time.
pub type SharedOperation = Shared<BoxFuture<'static, Result<Value>>>;

/// Tracking slot for one request identity
#[derive(Clone)]
pub struct CacheEntry {
    pending: Option<SharedOperation>,
    created_at: DateTime<Utc>,
}

impl CacheEntry {
    fn empty() -> Self {
        Self {
            pending: None,
            created_at: Utc::now(),
        }
    }

    fn with_pending(operation: SharedOperation) -> Self {
        Self {
            pending: Some(operation),
            ..Self::empty()
        }
    }

    pub fn pending(&self) -> Option<&SharedOperation> {
        self.pending.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the slot was first created, kept across stores and clears
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("pending", &self.is_pending())
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// In-flight request tracking, keyed by request identity.
///
/// Holds only operations that have not settled yet; completed results are
/// never kept. Slots are created lazily and stay behind as empty
/// placeholders after their operation settles, until [`InFlightCache::reset`].
#[derive(Default)]
pub struct InFlightCache {
    entries: DashMap<String, CacheEntry>,
}

impl InFlightCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// The operation currently in flight for `key`, if any
    pub fn lookup_pending(&self, key: &str) -> Option<SharedOperation> {
        self.entries
            .get(key)
            .and_then(|entry| entry.pending.clone())
    }

    /// Record `operation` as in flight for `key`, keeping the rest of an
    /// existing slot intact.
    pub fn store(&self, key: &str, operation: SharedOperation) {
        let replaced = match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => occupied.get_mut().pending.replace(operation),
            Entry::Vacant(vacant) => {
                vacant.insert(CacheEntry::with_pending(operation));
                None
            }
        };
        // Dropping the last handle of an unpolled operation runs its guard,
        // which takes the shard lock again
        drop(replaced);
        log::debug!("Stored in-flight request for key: {}", key);
    }

    /// Join the operation in flight for `key`, or record the one built by
    /// `make` when there is none. Lookup and store happen under the same
    /// entry lock, so two callers can never both miss.
    ///
    /// Returns the operation and whether it was newly created.
    pub fn pending_or_store<F>(&self, key: &str, make: F) -> (SharedOperation, bool)
    where
        F: FnOnce() -> SharedOperation,
    {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if let Some(pending) = &occupied.get().pending {
                    log::debug!("Joining in-flight request for key: {}", key);
                    return (pending.clone(), false);
                }
                let operation = make();
                occupied.get_mut().pending = Some(operation.clone());
                log::debug!("Stored in-flight request for key: {}", key);
                (operation, true)
            }
            Entry::Vacant(vacant) => {
                let operation = make();
                vacant.insert(CacheEntry::with_pending(operation.clone()));
                log::debug!("Stored in-flight request for key: {}", key);
                (operation, true)
            }
        }
    }

    /// Empty the slot for `key`, creating it if needed.
    pub fn clear(&self, key: &str) {
        let released = self
            .entries
            .entry(key.to_string())
            .or_insert_with(CacheEntry::empty)
            .pending
            .take();
        // Released outside the shard lock, see `store`
        drop(released);
        log::debug!("Cleared in-flight request for key: {}", key);
    }

    /// Forget every slot. Holders of an operation keep it; only the
    /// tracking is dropped.
    pub fn reset(&self) {
        let keys: Vec<String> = self
            .entries
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        let removed: Vec<(String, CacheEntry)> = keys
            .iter()
            .filter_map(|key| self.entries.remove(key))
            .collect();
        // Released outside the shard locks, see `store`
        drop(removed);
        log::info!("In-flight request cache reset");
    }

    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).map(|entry| entry.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let total_entries = self.entries.len();
        let pending_entries = self
            .entries
            .iter()
            .filter(|entry| entry.value().is_pending())
            .count();

        CacheStats {
            total_entries,
            pending_entries,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "graphql", derive(SimpleObject))]
pub struct CacheStats {
    pub total_entries: usize,
    pub pending_entries: usize,
}

/// Thread-safe handle to a cache shared between clients
pub type SharedInFlightCache = Arc<InFlightCache>;

/// Clears the slot for its key when dropped, so every way an operation can
/// end (value, error, panic) releases the slot exactly once.
///
/// Holds the cache weakly: a stored operation owns its guard, and the cache
/// owns the stored operation.
pub(crate) struct SettlementGuard {
    cache: Weak<InFlightCache>,
    key: String,
}

impl SettlementGuard {
    pub(crate) fn new(cache: &SharedInFlightCache, key: String) -> Self {
        Self {
            cache: Arc::downgrade(cache),
            key,
        }
    }
}

impl Drop for SettlementGuard {
    fn drop(&mut self) {
        if let Some(cache) = self.cache.upgrade() {
            cache.clear(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use futures::FutureExt;
    use serde_json::json;

    fn ready(value: Value) -> SharedOperation {
        futures::future::ready(Ok(value)).boxed().shared()
    }

    #[test]
    fn test_lookup_on_unknown_key() {
        let cache = InFlightCache::new();
        assert!(cache.lookup_pending("/x").is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_store_then_lookup() {
        let cache = InFlightCache::new();
        cache.store("/x", ready(json!({"id": 1})));

        let pending = cache.lookup_pending("/x").unwrap();
        assert_eq!(pending.await.unwrap(), json!({"id": 1}));
        assert!(cache.lookup_pending("/y").is_none());
    }

    #[test]
    fn test_clear_keeps_placeholder() {
        let cache = InFlightCache::new();
        cache.store("/x", ready(json!(1)));
        cache.clear("/x");

        assert!(cache.lookup_pending("/x").is_none());
        assert_eq!(cache.len(), 1);
        assert!(!cache.entry("/x").unwrap().is_pending());
    }

    #[test]
    fn test_clear_creates_missing_entry() {
        let cache = InFlightCache::new();
        cache.clear("/never-stored");

        let entry = cache.entry("/never-stored").unwrap();
        assert!(!entry.is_pending());
        assert_eq!(cache.stats(), CacheStats { total_entries: 1, pending_entries: 0 });
    }

    #[test]
    fn test_store_preserves_creation_time() {
        let cache = InFlightCache::new();
        cache.clear("/x");
        let created_at = cache.entry("/x").unwrap().created_at();

        cache.store("/x", ready(json!(1)));
        let entry = cache.entry("/x").unwrap();
        assert!(entry.is_pending());
        assert_eq!(entry.created_at(), created_at);
    }

    #[test]
    fn test_pending_or_store_joins_existing() {
        let cache = InFlightCache::new();
        let (_, created) = cache.pending_or_store("/x", || ready(json!(1)));
        assert!(created);

        let (_, created) = cache.pending_or_store("/x", || panic!("must join the pending operation"));
        assert!(!created);

        cache.clear("/x");
        let (_, created) = cache.pending_or_store("/x", || ready(json!(2)));
        assert!(created);
    }

    #[tokio::test]
    async fn test_reset_keeps_held_operations() {
        let cache = InFlightCache::new();
        cache.store("/x", ready(json!("kept")));
        let held = cache.lookup_pending("/x").unwrap();

        cache.reset();

        assert!(cache.is_empty());
        assert!(cache.lookup_pending("/x").is_none());
        assert_eq!(held.await.unwrap(), json!("kept"));
    }

    #[test]
    fn test_stats_counts_pending() {
        let cache = InFlightCache::new();
        cache.store("/a", ready(json!(1)));
        cache.store("/b", ready(json!(2)));
        cache.clear("/c");

        assert_eq!(cache.stats(), CacheStats { total_entries: 3, pending_entries: 2 });
    }

    #[test]
    fn test_settlement_guard_clears_on_drop() {
        let cache = Arc::new(InFlightCache::new());
        cache.store("/x", futures::future::ready(Err(TransportError::status("Bad Gateway"))).boxed().shared());

        drop(SettlementGuard::new(&cache, "/x".to_string()));

        assert!(cache.lookup_pending("/x").is_none());
        assert_eq!(cache.len(), 1);
    }
}
