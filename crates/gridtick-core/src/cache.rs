//! Bounded in-memory TTL tables.
//!
//! [`TtlCache`] backs both the primary cache store and the fallback table.
//!
//! Expiry is lazy: an entry is logically absent as soon as its deadline has
//! passed, and `get` removes an expired entry it finds. [`TtlCache::purge_expired`]
//! is an explicit sweep for callers that want to reclaim memory eagerly.
//!
//! Capacity eviction is least-recently-inserted. Inserting a new key into a
//! full table evicts exactly the oldest insertion; replacing an existing key
//! never evicts and counts as a fresh insertion.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

/// Documented default capacity for the acquisition caches.
pub const DEFAULT_CAPACITY: usize = 1_000;

/// A value returned from the cache together with how long it has been stored.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit<V> {
    pub value: V,
    pub stored_for: Duration,
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    expires_at: Instant,
    sequence: u64,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        now <= self.expires_at
    }
}

#[derive(Debug)]
struct CacheInner<K, V> {
    map: HashMap<K, CacheEntry<V>>,
    insertion_order: BTreeMap<u64, K>,
    next_sequence: u64,
    capacity: usize,
    default_ttl: Duration,
}

impl<K, V> CacheInner<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn new(capacity: usize, default_ttl: Duration) -> Self {
        Self {
            map: HashMap::new(),
            insertion_order: BTreeMap::new(),
            next_sequence: 0,
            capacity,
            default_ttl,
        }
    }

    fn peek(&self, key: &K, now: Instant) -> Lookup<V> {
        match self.map.get(key) {
            None => Lookup::Absent,
            Some(entry) if entry.is_live(now) => Lookup::Live(CacheHit {
                value: entry.value.clone(),
                stored_for: now.saturating_duration_since(entry.inserted_at),
            }),
            Some(_) => Lookup::Expired,
        }
    }

    fn remove_if_expired(&mut self, key: &K, now: Instant) {
        let expired = self
            .map
            .get(key)
            .is_some_and(|entry| !entry.is_live(now));
        if expired {
            self.remove(key);
        }
    }

    fn remove(&mut self, key: &K) -> Option<CacheEntry<V>> {
        let entry = self.map.remove(key)?;
        self.insertion_order.remove(&entry.sequence);
        Some(entry)
    }

    /// Returns the key evicted to make room, if any.
    fn put(&mut self, key: K, value: V, ttl: Duration, now: Instant) -> Option<K> {
        let mut evicted = None;
        if self.remove(&key).is_none() && self.map.len() >= self.capacity {
            if let Some((_, oldest)) = self.insertion_order.pop_first() {
                self.map.remove(&oldest);
                evicted = Some(oldest);
            }
        }

        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.insertion_order.insert(sequence, key.clone());
        self.map.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
                expires_at: now + ttl,
                sequence,
            },
        );

        evicted
    }

    fn purge_expired(&mut self, now: Instant) -> usize {
        let expired = self
            .map
            .iter()
            .filter(|(_, entry)| !entry.is_live(now))
            .map(|(key, _)| key.clone())
            .collect::<Vec<_>>();
        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }

    fn clear(&mut self) {
        self.map.clear();
        self.insertion_order.clear();
    }
}

enum Lookup<V> {
    Absent,
    Expired,
    Live(CacheHit<V>),
}

/// Thread-safe, capacity-bounded TTL table.
///
/// Clones share the same underlying storage.
#[derive(Debug, Clone)]
pub struct TtlCache<K, V> {
    inner: Arc<RwLock<CacheInner<K, V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a table holding at most `capacity` entries (minimum one).
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheInner::new(capacity.max(1), default_ttl))),
        }
    }

    /// Create a table with [`DEFAULT_CAPACITY`] entries.
    pub fn with_default_capacity(default_ttl: Duration) -> Self {
        Self::new(DEFAULT_CAPACITY, default_ttl)
    }

    /// Returns the stored value if present and not expired.
    ///
    /// An expired entry found here is removed before returning `None`.
    pub async fn get(&self, key: &K) -> Option<CacheHit<V>> {
        let now = Instant::now();
        {
            let store = self.inner.read().await;
            match store.peek(key, now) {
                Lookup::Live(hit) => return Some(hit),
                Lookup::Absent => return None,
                Lookup::Expired => {}
            }
        }

        let mut store = self.inner.write().await;
        store.remove_if_expired(key, now);
        None
    }

    /// Inserts `value` with `ttl` or the table default, returning any evicted key.
    ///
    /// A zero TTL is a no-op: the entry would already be expired.
    pub async fn put(&self, key: K, value: V, ttl: Option<Duration>) -> Option<K> {
        let mut store = self.inner.write().await;
        let ttl = ttl.unwrap_or(store.default_ttl);
        if ttl.is_zero() {
            return None;
        }
        store.put(key, value, ttl, Instant::now())
    }

    /// Remove every expired entry, returning how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let mut store = self.inner.write().await;
        store.purge_expired(Instant::now())
    }

    pub async fn remove(&self, key: &K) -> Option<V> {
        let mut store = self.inner.write().await;
        store.remove(key).map(|entry| entry.value)
    }

    pub async fn clear(&self) {
        let mut store = self.inner.write().await;
        store.clear();
    }

    /// Number of physically stored entries, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        self.inner.read().await.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn capacity(&self) -> usize {
        self.inner.read().await.capacity
    }

    pub async fn default_ttl(&self) -> Duration {
        self.inner.read().await.default_ttl
    }
}
