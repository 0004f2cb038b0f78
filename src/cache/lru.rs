use crate::cache::RandomState;
use crate::cache::recency_list::{Iter, NodeHandle, RecencyList};
use crate::cache::stats::{Counters, Stats};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::mem;

type EvictionCallback<V> = Box<dyn FnMut(V) + Send>;

/// Fixed-capacity cache that evicts the least recently used entry once it is full.
///
/// Every successful [`get`](LruCache::get) and every [`set`](LruCache::set) marks the entry as the
/// most recently used one. All operations are O(1).
///
/// This type is not thread-safe on its own. Use [`SynchronizedCache`](crate::SynchronizedCache)
/// to share a cache between threads.
///
/// A cache with a capacity of zero is disabled: it never retains an entry.
pub struct LruCache<K, V, S = RandomState> {
    index: HashMap<K, NodeHandle, S>,
    list: RecencyList<K, V>,
    capacity: usize,
    on_evict: Option<EvictionCallback<V>>,
    counters: Counters,
}

impl<K, V> LruCache<K, V, RandomState>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    /// Creates an empty cache holding at most `capacity` entries.
    pub fn with_capacity(capacity: usize) -> LruCache<K, V, RandomState> {
        LruCache::with_capacity_and_hasher(capacity, Default::default())
    }
}

impl<K, V, S> LruCache<K, V, S>
where
    K: Clone + Eq + Hash,
    V: Clone,
    S: BuildHasher,
{
    /// Creates an empty cache holding at most `capacity` entries, using `hash_builder` to hash the
    /// keys.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> LruCache<K, V, S> {
        tracing::debug!(capacity, "creating lru cache");

        Self {
            index: HashMap::with_capacity_and_hasher(capacity, hash_builder),
            list: RecencyList::with_capacity(capacity),
            capacity,
            on_evict: None,
            counters: Counters::default(),
        }
    }

    /// Registers a callback that receives every value dropped by a capacity eviction or by
    /// [`erase`](LruCache::erase).
    ///
    /// The callback runs synchronously, before the operation that triggered it returns.
    pub fn on_evict<F>(mut self, on_evict: F) -> Self
    where
        F: FnMut(V) + Send + 'static,
    {
        self.on_evict = Some(Box::new(on_evict));
        self
    }

    /// Inserts a key-value pair into the cache and marks it as most recently used.
    ///
    /// If the cache did not have this key present, [`None`] is returned. Inserting a new key into a
    /// full cache evicts the least recently used entry first.
    ///
    /// If the cache did have this key present, the value is updated, and the old value is returned.
    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&handle) = self.index.get(&key) {
            let current = self
                .list
                .get_mut(handle)
                .expect("an indexed key must point at a linked node");
            let previous = mem::replace(current, value);
            self.list.move_to_back(handle);
            return Some(previous);
        }

        if self.capacity == 0 {
            return None;
        }

        if self.list.len() == self.capacity {
            self.evict();
        }

        let handle = self.list.push_back(key.clone(), value);
        self.index.insert(key, handle);

        None
    }

    /// Returns the value corresponding to the key and marks it as most recently used.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let Some(&handle) = self.index.get(key) else {
            self.counters.increment_miss_count();
            return None;
        };

        self.counters.increment_hit_count();
        self.list.move_to_back(handle);
        self.list.get(handle).map(|(_, value)| value)
    }

    /// Returns the value corresponding to the key without touching its recency.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let handle = self.index.get(key)?;
        self.list.get(*handle).map(|(_, value)| value)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.index.contains_key(key)
    }

    /// Removes a key from the cache and returns its value.
    ///
    /// The eviction callback, if any, receives the removed value. Nothing happens if the key is
    /// absent.
    pub fn erase<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let handle = self.index.remove(key)?;
        let (_, value) = self.list.remove(handle)?;

        if let Some(on_evict) = self.on_evict.as_mut() {
            on_evict(value.clone());
        }

        Some(value)
    }

    fn evict(&mut self) {
        let Some((key, value)) = self.list.pop_front() else {
            return;
        };

        self.index.remove(&key);
        self.counters.increment_eviction_count();
        tracing::trace!(capacity = self.capacity, "evicted least recently used entry");

        if let Some(on_evict) = self.on_evict.as_mut() {
            on_evict(value);
        }
    }
}

impl<K, V, S> LruCache<K, V, S> {
    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Removes all entries without invoking the eviction callback.
    pub fn clear(&mut self) {
        tracing::debug!(len = self.list.len(), "clearing lru cache");
        self.index.clear();
        self.list.clear();
    }

    /// Iterates over the entries from the least to the most recently used one.
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.list.iter()
    }

    /// Returns the counters accumulated since the last call and resets them.
    ///
    /// `millis_elapsed` is only tracked by [`SynchronizedCache`](crate::SynchronizedCache) and is
    /// always zero here.
    pub fn stats(&mut self) -> Stats {
        let mut stats = Stats::default();
        self.counters.drain_into(&mut stats);
        stats
    }
}

impl<'a, K, V, S> IntoIterator for &'a LruCache<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, S> fmt::Debug for LruCache<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("capacity", &self.capacity)
            .field("entries", &DebugEntries(&self.list))
            .field("on_evict", &self.on_evict.is_some())
            .finish_non_exhaustive()
    }
}

struct DebugEntries<'a, K, V>(&'a RecencyList<K, V>);

impl<K, V> fmt::Debug for DebugEntries<'_, K, V>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}
