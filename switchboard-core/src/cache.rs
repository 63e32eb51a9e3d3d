//! Bounded recency (LRU) cache.
//!
//! Entries live in a slab (`Vec`) threaded by an intrusive doubly-linked list
//! ordered from most- to least-recently used, with a `HashMap` from key to
//! slot. `get` and `put` are O(1). The whole structure sits behind one
//! `Mutex`, so a single cache can be shared by concurrent lookups.
//!
//! # Invariants
//!
//! - `len() <= capacity()` after every operation
//! - the tail of the list is always the next eviction victim
//! - there is no age-based expiry

use crate::error::CacheError;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::mem;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Default capacity for lookup caches.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of values written, including replacements.
    pub insertions: u64,
    /// Number of evictions due to capacity.
    pub evictions: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug)]
struct Slot<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug)]
struct LruState<K, V> {
    index: HashMap<K, usize>,
    slots: Vec<Slot<K, V>>,
    /// Most recently used.
    head: Option<usize>,
    /// Least recently used.
    tail: Option<usize>,
    stats: CacheStats,
}

impl<K: Eq + Hash + Clone, V> LruState<K, V> {
    fn with_capacity(capacity: usize) -> Self {
        // Avoid reserving the full default capacity up front.
        let initial = capacity.min(1024);
        Self {
            index: HashMap::with_capacity(initial),
            slots: Vec::with_capacity(initial),
            head: None,
            tail: None,
            stats: CacheStats::default(),
        }
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);
        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }
        self.slots[idx].prev = None;
        self.slots[idx].next = None;
    }

    fn push_front(&mut self, idx: usize) {
        self.slots[idx].prev = None;
        self.slots[idx].next = self.head;
        if let Some(h) = self.head {
            self.slots[h].prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn touch(&mut self, idx: usize) {
        if self.head != Some(idx) {
            self.detach(idx);
            self.push_front(idx);
        }
    }

    fn put(&mut self, key: K, value: V, capacity: usize) -> Option<V> {
        self.stats.insertions += 1;

        if let Some(&idx) = self.index.get(&key) {
            let previous = mem::replace(&mut self.slots[idx].value, value);
            self.touch(idx);
            return Some(previous);
        }

        let victim = self.tail.filter(|_| self.index.len() >= capacity);
        let idx = match victim {
            Some(lru) => {
                // Reuse the evicted slot in place.
                self.detach(lru);
                let slot = &mut self.slots[lru];
                let evicted_key = mem::replace(&mut slot.key, key.clone());
                slot.value = value;
                self.index.remove(&evicted_key);
                self.stats.evictions += 1;
                lru
            }
            None => {
                self.slots.push(Slot {
                    key: key.clone(),
                    value,
                    prev: None,
                    next: None,
                });
                self.slots.len() - 1
            }
        };

        self.index.insert(key, idx);
        self.push_front(idx);
        None
    }

    fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.index.remove(key)?;
        self.detach(idx);

        let last = self.slots.len() - 1;
        if idx != last {
            // `last` is about to be moved into `idx` by swap_remove.
            let (prev, next) = (self.slots[last].prev, self.slots[last].next);
            match prev {
                Some(p) => self.slots[p].next = Some(idx),
                None => self.head = Some(idx),
            }
            match next {
                Some(n) => self.slots[n].prev = Some(idx),
                None => self.tail = Some(idx),
            }
            if let Some(position) = self.index.get_mut::<K>(&self.slots[last].key) {
                *position = idx;
            }
        }

        Some(self.slots.swap_remove(idx).value)
    }

    fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.head = None;
        self.tail = None;
    }
}

/// Fixed-capacity key/value store with least-recently-used eviction.
///
/// # Example
///
/// ```
/// use switchboard_core::LruCache;
///
/// let cache = LruCache::new(2).unwrap();
/// cache.put("a".to_string(), 1);
/// cache.put("b".to_string(), 2);
/// cache.get("a");
/// cache.put("c".to_string(), 3);
///
/// assert_eq!(cache.get("b"), None);
/// assert_eq!(cache.get("a"), Some(1));
/// ```
#[derive(Debug)]
pub struct LruCache<K, V> {
    state: Mutex<LruState<K, V>>,
    capacity: usize,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache holding at most `capacity` entries.
    ///
    /// # Errors
    /// Returns [`CacheError::ZeroCapacity`] when `capacity` is 0.
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        if capacity == 0 {
            return Err(CacheError::ZeroCapacity);
        }
        Ok(Self {
            state: Mutex::new(LruState::with_capacity(capacity)),
            capacity,
        })
    }

    // The list is consistent between every mutation, so a panic elsewhere
    // while the lock was held cannot leave it half-updated.
    fn lock(&self) -> MutexGuard<'_, LruState<K, V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a value and mark it most-recently-used.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut state = self.lock();
        match state.index.get(key).copied() {
            Some(idx) => {
                state.touch(idx);
                state.stats.hits += 1;
                Some(state.slots[idx].value.clone())
            }
            None => {
                state.stats.misses += 1;
                None
            }
        }
    }

    /// Insert or replace a value and mark it most-recently-used, evicting
    /// the least-recently-used entry if the cache is full.
    ///
    /// Returns the previous value stored under `key`.
    pub fn put(&self, key: K, value: V) -> Option<V> {
        self.lock().put(key, value, self.capacity)
    }

    /// Whether `key` is present. Does not affect recency.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lock().index.contains_key(key)
    }

    /// Remove an entry, returning its value.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lock().remove(key)
    }

    /// Drop all entries. Statistics are kept.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Keys ordered from most- to least-recently used.
    pub fn keys_by_recency(&self) -> Vec<K> {
        let state = self.lock();
        let mut keys = Vec::with_capacity(state.index.len());
        let mut cursor = state.head;
        while let Some(idx) = cursor {
            keys.push(state.slots[idx].key.clone());
            cursor = state.slots[idx].next;
        }
        keys
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            entry_count: state.index.len() as u64,
            ..state.stats.clone()
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::VecDeque;

    fn cache(capacity: usize) -> LruCache<String, i32> {
        LruCache::new(capacity).unwrap()
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(
            LruCache::<String, i32>::new(0).unwrap_err(),
            CacheError::ZeroCapacity
        );
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let cache = cache(2);
        cache.put("A".into(), 1);
        cache.put("B".into(), 2);
        cache.put("C".into(), 3);

        assert_eq!(cache.get("A"), None);
        assert_eq!(cache.get("B"), Some(2));
        assert_eq!(cache.get("C"), Some(3));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_get_refreshes_recency() {
        let cache = cache(2);
        cache.put("A".into(), 1);
        cache.put("B".into(), 2);
        cache.get("A");
        cache.put("C".into(), 3);

        assert_eq!(cache.get("B"), None);
        assert_eq!(cache.get("A"), Some(1));
        assert_eq!(cache.get("C"), Some(3));
    }

    #[test]
    fn test_put_existing_key_replaces_and_refreshes() {
        let cache = cache(2);
        cache.put("A".into(), 1);
        cache.put("B".into(), 2);
        assert_eq!(cache.put("A".into(), 10), Some(1));
        cache.put("C".into(), 3);

        assert_eq!(cache.get("A"), Some(10));
        assert_eq!(cache.get("B"), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_capacity_one() {
        let cache = cache(1);
        cache.put("A".into(), 1);
        cache.put("B".into(), 2);
        assert_eq!(cache.get("A"), None);
        assert_eq!(cache.get("B"), Some(2));
        assert_eq!(cache.keys_by_recency(), vec!["B".to_string()]);
    }

    #[test]
    fn test_contains_does_not_touch() {
        let cache = cache(2);
        cache.put("A".into(), 1);
        cache.put("B".into(), 2);
        assert!(cache.contains("A"));
        cache.put("C".into(), 3);
        assert!(!cache.contains("A"));
    }

    #[test]
    fn test_remove_keeps_list_consistent() {
        let cache = cache(3);
        cache.put("A".into(), 1);
        cache.put("B".into(), 2);
        cache.put("C".into(), 3);

        assert_eq!(cache.remove("A"), Some(1));
        assert_eq!(cache.remove("A"), None);
        assert_eq!(
            cache.keys_by_recency(),
            vec!["C".to_string(), "B".to_string()]
        );

        cache.put("D".into(), 4);
        cache.put("E".into(), 5);
        assert_eq!(cache.get("B"), None);
        assert_eq!(
            cache.keys_by_recency(),
            vec!["E".to_string(), "D".to_string(), "C".to_string()]
        );
    }

    #[test]
    fn test_remove_relinks_moved_slot() {
        let cache = cache(4);
        cache.put("A".into(), 1);
        cache.put("B".into(), 2);
        cache.put("C".into(), 3);
        cache.put("D".into(), 4);

        // "D" occupies the last slot and is moved into the freed one.
        assert_eq!(cache.remove("B"), Some(2));
        assert_eq!(cache.get("D"), Some(4));
        assert_eq!(cache.remove("D"), Some(4));
        assert!(!cache.contains("D"));
        assert_eq!(
            cache.keys_by_recency(),
            vec!["C".to_string(), "A".to_string()]
        );
    }

    #[test]
    fn test_clear_empties_cache() {
        let cache = cache(4);
        cache.put("A".into(), 1);
        cache.put("B".into(), 2);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get("A"), None);
        cache.put("C".into(), 3);
        assert_eq!(cache.get("C"), Some(3));
    }

    #[test]
    fn test_stats_track_hits_misses_evictions() {
        let cache = cache(1);
        cache.put("A".into(), 1);
        cache.get("A");
        cache.get("missing");
        cache.put("B".into(), 2);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.insertions, 2);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.entry_count, 1);
        assert!((stats.hit_rate() - 0.5).abs() < 0.001);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Get(u8),
        Put(u8, i32),
        Remove(u8),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..16).prop_map(Op::Get),
            (0u8..16, any::<i32>()).prop_map(|(k, v)| Op::Put(k, v)),
            (0u8..16).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn prop_size_never_exceeds_capacity(
            capacity in 1usize..8,
            ops in prop::collection::vec(op_strategy(), 0..200),
        ) {
            let cache: LruCache<u8, i32> = LruCache::new(capacity).unwrap();
            for op in ops {
                match op {
                    Op::Get(k) => { cache.get(&k); }
                    Op::Put(k, v) => {
                        cache.put(k, v);
                        prop_assert_eq!(cache.get(&k), Some(v));
                    }
                    Op::Remove(k) => { cache.remove(&k); }
                }
                prop_assert!(cache.len() <= capacity);
                prop_assert_eq!(cache.keys_by_recency().len(), cache.len());
            }
        }

        #[test]
        fn prop_matches_reference_model(
            capacity in 1usize..6,
            ops in prop::collection::vec(op_strategy(), 0..300),
        ) {
            let cache: LruCache<u8, i32> = LruCache::new(capacity).unwrap();
            let mut model = RecencyModel::new(capacity);
            for op in ops {
                match op {
                    Op::Get(k) => {
                        prop_assert_eq!(cache.get(&k), model.get(k));
                    }
                    Op::Put(k, v) => {
                        prop_assert_eq!(cache.put(k, v), model.put(k, v));
                    }
                    Op::Remove(k) => {
                        prop_assert_eq!(cache.remove(&k), model.remove(k));
                    }
                }
                prop_assert_eq!(cache.keys_by_recency(), model.keys());
            }
        }
    }

    /// Linear-time LRU over a deque, front is most recent.
    struct RecencyModel {
        entries: VecDeque<(u8, i32)>,
        capacity: usize,
    }

    impl RecencyModel {
        fn new(capacity: usize) -> Self {
            Self {
                entries: VecDeque::new(),
                capacity,
            }
        }

        fn take(&mut self, key: u8) -> Option<i32> {
            let pos = self.entries.iter().position(|(k, _)| *k == key)?;
            self.entries.remove(pos).map(|(_, v)| v)
        }

        fn get(&mut self, key: u8) -> Option<i32> {
            let value = self.take(key)?;
            self.entries.push_front((key, value));
            Some(value)
        }

        fn put(&mut self, key: u8, value: i32) -> Option<i32> {
            let previous = self.take(key);
            if previous.is_none() && self.entries.len() >= self.capacity {
                self.entries.pop_back();
            }
            self.entries.push_front((key, value));
            previous
        }

        fn remove(&mut self, key: u8) -> Option<i32> {
            self.take(key)
        }

        fn keys(&self) -> Vec<u8> {
            self.entries.iter().map(|(k, _)| *k).collect()
        }
    }
}
