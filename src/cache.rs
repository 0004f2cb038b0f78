use crate::Stats;
use crate::cache::lru::LruCache;
use parking_lot::Mutex;
use parking_lot::lock_api::{self, RawMutex};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::time::Instant;

pub mod lru;
mod node;
pub mod recency_list;
pub(crate) mod stats;

pub(crate) type RandomState = ahash::RandomState;

type Notification<V> = Box<dyn Fn(V) + Send + Sync>;

/// Thread-safe LRU cache, generic over the lock that guards it.
///
/// Every operation takes the lock, delegates to an inner [`LruCache`] and releases the lock again,
/// so operations on one instance are linearizable. The lock is `parking_lot`'s mutex by default;
/// pass [`SpinLock`](crate::SpinLock) as `R` to busy-wait instead of parking.
///
/// Wrap the cache in a [`std::sync::Arc`] to share it between threads. All operations only require
/// shared references to the cache.
///
/// # Notifications
///
/// The callback registered with [`on_evict`](SynchronizedCache::on_evict) always runs after the
/// lock has been released, so it may call back into the cache. It fires
///
/// - on every [`set`](SynchronizedCache::set), with the value that was just written, and
/// - on every [`erase`](SynchronizedCache::erase) that removed an entry, with the removed value.
///
/// Entries the inner cache drops because it is full do not trigger the callback.
pub struct SynchronizedCache<K, V, R = parking_lot::RawMutex, S = RandomState> {
    cache: lock_api::Mutex<R, LruCache<K, V, S>>,
    on_evict: Option<Notification<V>>,
    metrics_last_accessed: Mutex<Instant>,
}

impl<K, V> SynchronizedCache<K, V, parking_lot::RawMutex, RandomState>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    /// Creates a new cache holding at most `capacity` entries, guarded by a `parking_lot` mutex.
    pub fn with_capacity(capacity: usize) -> Self {
        SynchronizedCache::with_capacity_and_hasher(capacity, Default::default())
    }
}

impl<K, V, R> SynchronizedCache<K, V, R, RandomState>
where
    K: Clone + Eq + Hash,
    V: Clone,
    R: RawMutex,
{
    /// Creates a new cache holding at most `capacity` entries, guarded by the lock type `R`.
    ///
    /// The lock type usually comes from a type annotation:
    ///
    /// ```rust
    /// use lru_lock::{SpinLock, SynchronizedCache};
    ///
    /// let cache: SynchronizedCache<u64, String, SpinLock> = SynchronizedCache::new(16);
    /// ```
    pub fn new(capacity: usize) -> Self {
        SynchronizedCache::with_capacity_and_hasher(capacity, Default::default())
    }
}

impl<K, V, R, S> SynchronizedCache<K, V, R, S>
where
    K: Clone + Eq + Hash,
    V: Clone,
    R: RawMutex,
    S: BuildHasher,
{
    /// Creates a new cache holding at most `capacity` entries, using `hash_builder` to hash the
    /// keys.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            cache: lock_api::Mutex::new(LruCache::with_capacity_and_hasher(
                capacity,
                hash_builder,
            )),
            on_evict: None,
            metrics_last_accessed: Mutex::new(Instant::now()),
        }
    }

    /// Registers the notification callback. See the [type level docs](SynchronizedCache) for
    /// when it fires.
    pub fn on_evict<F>(mut self, on_evict: F) -> Self
    where
        F: Fn(V) + Send + Sync + 'static,
    {
        self.on_evict = Some(Box::new(on_evict));
        self
    }

    /// Inserts a key-value pair into the cache.
    ///
    /// If the cache did not have this key present, [`None`] is returned.
    ///
    /// If the cache did have this key present, the value is updated, and the old value is returned.
    ///
    /// The notification callback receives a clone of `value` once the lock has been released,
    /// whether or not the insert evicted anything.
    pub fn set(&self, key: K, value: V) -> Option<V> {
        let notification = self.on_evict.as_ref().map(|_| value.clone());

        let previous = self.cache.lock().set(key, value);

        if let (Some(on_evict), Some(value)) = (&self.on_evict, notification) {
            on_evict(value);
        }

        previous
    }

    /// Returns the value corresponding to the key and marks it as most recently used.
    ///
    /// This method clones the value when returning the item. Consider wrapping your values in
    /// [`std::sync::Arc`] if cloning is too expensive for your use case.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.cache.lock().get(key).cloned()
    }

    /// Removes a key from the cache and returns its value.
    ///
    /// The notification callback receives the removed value once the lock has been released.
    /// Nothing happens if the key is absent.
    pub fn erase<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let erased = self.cache.lock().erase(key);

        if let (Some(on_evict), Some(value)) = (&self.on_evict, &erased) {
            on_evict(value.clone());
        }

        erased
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.cache.lock().contains(key)
    }

    /// Runs `f` on the inner cache while holding the lock.
    ///
    /// Everything `f` does happens in a single critical section. The notification callback is not
    /// involved. `f` must not call back into this cache, or it deadlocks.
    pub fn with_locked<T>(&self, f: impl FnOnce(&mut LruCache<K, V, S>) -> T) -> T {
        let mut cache = self.cache.lock();
        f(&mut cache)
    }
}

impl<K, V, R, S> SynchronizedCache<K, V, R, S>
where
    R: RawMutex,
{
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cache.lock().capacity()
    }

    /// Removes all entries without invoking the notification callback.
    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    /// Returns the statistics accumulated since the last call and resets them.
    pub fn stats(&self) -> Stats {
        let millis_elapsed = {
            let mut guard = self.metrics_last_accessed.lock();
            let millis_elapsed = guard.elapsed().as_millis();
            *guard = Instant::now();
            millis_elapsed
        };

        let mut stats = self.cache.lock().stats();
        stats.millis_elapsed = millis_elapsed;
        stats
    }
}

impl<K, V, R, S> fmt::Debug for SynchronizedCache<K, V, R, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
    R: RawMutex,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynchronizedCache")
            .field("cache", &self.cache)
            .field("on_evict", &self.on_evict.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SpinLock;
    use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
    use std::sync::{Arc, OnceLock};
    use std::thread;

    #[derive(Clone, Debug, PartialEq)]
    enum Op {
        Set(u8, u32),
        Get(u8),
        Erase(u8),
    }

    fn apply(cache: &mut LruCache<u8, u32>, op: &Op) -> Option<u32> {
        match *op {
            Op::Set(key, value) => cache.set(key, value),
            Op::Get(key) => cache.get(&key).copied(),
            Op::Erase(key) => cache.erase(&key),
        }
    }

    fn snapshot(cache: &LruCache<u8, u32>) -> Vec<(u8, u32)> {
        cache.iter().map(|(key, value)| (*key, *value)).collect()
    }

    #[test]
    fn it_sets_and_gets_basic_values() {
        // given
        let cache = SynchronizedCache::with_capacity(100);

        // when
        cache.set("key1", "value1");

        // then
        assert_eq!(cache.get("key1"), Some("value1"));
        assert_eq!(cache.get("key2"), None);
    }

    #[test]
    fn it_updates_existing_value() {
        // given
        let cache = SynchronizedCache::with_capacity(100);
        cache.set("key1", "value1");

        // when
        let old_value = cache.set("key1", "new_value");

        // then
        assert_eq!(old_value, Some("value1"));
        assert_eq!(cache.get("key1"), Some("new_value"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn it_erases_keys() {
        // given
        let cache = SynchronizedCache::with_capacity(4);

        // when / then
        assert_eq!(cache.erase("1"), None);

        cache.set("1", 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("1"), Some(1));

        assert_eq!(cache.erase("1"), Some(1));
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.get("1"), None);

        cache.set("1", 1);
        cache.set("2", 2);
        assert_eq!(cache.len(), 2);

        cache.erase("1");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("2"), Some(2));
        assert_eq!(cache.get("1"), None);

        cache.erase("2");
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.get("2"), None);
    }

    #[test]
    fn it_erases_from_the_middle() {
        // given
        let cache = SynchronizedCache::with_capacity(4);
        cache.set("1", 1);
        cache.set("2", 2);
        cache.set("3", 3);
        cache.set("4", 4);

        // when
        cache.erase("2");

        // then
        assert_eq!(cache.get("1"), Some(1));
        assert_eq!(cache.get("3"), Some(3));
        assert_eq!(cache.get("4"), Some(4));
        assert_eq!(cache.get("2"), None);
    }

    #[test]
    fn it_notifies_after_every_set() {
        // given
        let expected = Arc::new(AtomicI32::new(1));
        let expected_in_callback = Arc::clone(&expected);
        let cache = SynchronizedCache::with_capacity(4).on_evict(move |value: i32| {
            assert_eq!(value, expected_in_callback.fetch_add(1, Ordering::SeqCst));
        });

        // when
        cache.set("1", 1);
        cache.set("2", 2);
        cache.set("3", 3);
        cache.set("4", 4);
        cache.set("5", 5);

        // then
        assert_eq!(expected.load(Ordering::SeqCst), 6);
        assert_eq!(cache.get("1"), None);
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn it_notifies_on_erase_only_when_present() {
        // given
        let notified = Arc::new(AtomicUsize::new(0));
        let notified_in_callback = Arc::clone(&notified);
        let cache = SynchronizedCache::with_capacity(4).on_evict(move |_: i32| {
            notified_in_callback.fetch_add(1, Ordering::SeqCst);
        });
        cache.set("1", 1);

        // when
        cache.erase("2");
        cache.erase("1");

        // then
        // one notification for the set, one for the erase of "1"
        assert_eq!(notified.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn it_allows_reentrant_callbacks() {
        // given
        let slot: Arc<OnceLock<Arc<SynchronizedCache<&str, i32, SpinLock>>>> =
            Arc::new(OnceLock::new());
        let slot_in_callback = Arc::clone(&slot);
        let cache = Arc::new(SynchronizedCache::<&str, i32, SpinLock>::new(4).on_evict(
            move |value| {
                // a spin lock still held here would never be released
                if let Some(cache) = slot_in_callback.get() {
                    if value < 3 {
                        cache.set("again", value + 1);
                    }
                }
            },
        ));
        let _ = slot.set(Arc::clone(&cache));

        // when
        cache.set("key", 1);

        // then
        assert_eq!(cache.get("key"), Some(1));
        assert_eq!(cache.get("again"), Some(3));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn it_handles_zero_capacity() {
        // given
        let cache = SynchronizedCache::with_capacity(0);

        // when
        cache.set("key1", "value1");

        // then
        assert_eq!(cache.get("key1"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn it_works_with_a_spin_lock() {
        // given
        let cache: SynchronizedCache<&str, i32, SpinLock> = SynchronizedCache::new(2);

        // when
        cache.set("q", 1);
        cache.set("w", 2);
        cache.set("e", 3);

        // then
        assert_eq!(cache.capacity(), 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("q"), None);
        assert_eq!(cache.get("w"), Some(2));
        assert_eq!(cache.get("e"), Some(3));
    }

    #[test]
    fn it_works_with_custom_hasher() {
        // given
        use std::collections::hash_map::RandomState;
        let cache: SynchronizedCache<&str, &str, parking_lot::RawMutex, _> =
            SynchronizedCache::with_capacity_and_hasher(100, RandomState::new());

        // when
        cache.set("key1", "value1");

        // then
        assert!(cache.contains("key1"));
        assert_eq!(cache.get("key1"), Some("value1"));
    }

    #[test]
    fn it_is_thread_safe() {
        // given
        let cache: Arc<SynchronizedCache<String, String, SpinLock>> =
            Arc::new(SynchronizedCache::new(1_000));
        let mut handles = vec![];

        // when
        for i in 0..5 {
            let cache_clone = Arc::clone(&cache);
            let key = format!("key{}", i);
            let value = format!("value{}", i);
            let handle = thread::spawn(move || {
                cache_clone.set(key.clone(), value.clone());
                assert_eq!(cache_clone.get(&key), Some(value));
            });
            handles.push(handle);
        }

        for handle in handles {
            handle.join().unwrap();
        }

        // then
        for i in 0..5 {
            let key = format!("key{}", i);
            let value = format!("value{}", i);
            assert_eq!(cache.get(&key), Some(value));
        }
    }

    #[test]
    fn it_respects_capacity_under_contention() {
        // given
        let cache: Arc<SynchronizedCache<u32, u32>> = Arc::new(SynchronizedCache::with_capacity(8));

        // when
        let handles: Vec<_> = (0..4)
            .map(|thread_id| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..1_000 {
                        let key = thread_id * 1_000 + i;
                        cache.set(key, i);
                        cache.get(&key);
                        assert!(cache.len() <= 8);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        // then
        assert_eq!(cache.len(), 8);
    }

    #[test]
    fn it_is_linearizable() {
        // given
        let cache: Arc<SynchronizedCache<u8, u32, SpinLock>> = Arc::new(SynchronizedCache::new(4));
        let log = Arc::new(Mutex::new(Vec::new()));

        // when
        let handles: Vec<_> = (0..4_u32)
            .map(|thread_id| {
                let cache = Arc::clone(&cache);
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    for i in 0..500_u32 {
                        let key = ((thread_id + i) % 7) as u8;
                        let op = match i % 3 {
                            0 => Op::Set(key, thread_id * 1_000 + i),
                            1 => Op::Get(key),
                            _ => Op::Erase(key),
                        };
                        cache.with_locked(|inner| {
                            let result = apply(inner, &op);
                            log.lock().push((op, result));
                        });
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        // then
        let mut replay = LruCache::with_capacity(4);
        for (op, result) in log.lock().iter() {
            assert_eq!(apply(&mut replay, op), *result, "diverged at {:?}", op);
        }

        let final_state = cache.with_locked(|inner| snapshot(inner));
        assert_eq!(final_state, snapshot(&replay));
        assert_eq!(log.lock().len(), 2_000);
    }

    #[test]
    fn it_returns_and_resets_stats() {
        // given
        let cache = SynchronizedCache::with_capacity(1_000);

        // when
        for i in 0..10 {
            cache.set(i, i);
        }

        // 5 hits
        for i in 0..5 {
            cache.get(&i);
        }

        // 5 misses
        for i in 10..15 {
            cache.get(&i);
        }

        // then
        let stats = cache.stats();
        assert_eq!(stats.hit_count, 5);
        assert_eq!(stats.miss_count, 5);
        assert_eq!(stats.eviction_count, 0);

        let stats = cache.stats();
        assert_eq!(stats.hit_count, 0);
        assert_eq!(stats.miss_count, 0);
    }

    #[test]
    fn it_counts_capacity_evictions() {
        // given
        let cache = SynchronizedCache::with_capacity(2);

        // when
        cache.set("q", 1);
        cache.set("w", 2);
        cache.set("e", 3);
        cache.erase("w");

        // then
        assert_eq!(cache.stats().eviction_count, 1);
    }
}
