//! A fixed-capacity, in-memory LRU cache.
//!
//! This crate provides a key-value cache with least-recently-used eviction. Lookups, inserts and
//! removals all run in O(1): entries live in an arena-backed doubly-linked list ordered by recency,
//! and a hash index maps every key to its position in that list.
//!
//! # Features
//!
//! - [`LruCache`] for single-threaded use, with an optional eviction callback
//! - [`SynchronizedCache`] for concurrent callers, generic over the raw lock it uses
//! - [`SpinLock`], a busy-waiting lock that can replace the default `parking_lot` mutex
//! - Hit, miss and eviction statistics
//!
//! # Examples
//!
//! Basic usage with string keys and values:
//!
//! ```rust
//! use lru_lock::LruCache;
//!
//! let mut cache = LruCache::with_capacity(2);
//!
//! cache.set("q", 1);
//! cache.set("w", 2);
//!
//! // "q" is the least recently used entry and gets evicted
//! cache.set("e", 3);
//!
//! assert_eq!(cache.get("q"), None);
//! assert_eq!(cache.get("w"), Some(&2));
//! assert_eq!(cache.get("e"), Some(&3));
//! ```
//!
//! Getting notified about evictions:
//!
//! ```rust
//! use lru_lock::LruCache;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let evicted = Arc::new(AtomicUsize::new(0));
//! let evicted_in_callback = Arc::clone(&evicted);
//!
//! let mut cache = LruCache::with_capacity(1).on_evict(move |value: usize| {
//!     evicted_in_callback.store(value, Ordering::SeqCst);
//! });
//!
//! cache.set("key1", 1);
//! cache.set("key2", 2);
//!
//! assert_eq!(evicted.load(Ordering::SeqCst), 1);
//! ```
//!
//! Thread-safe usage across multiple threads, once with the default mutex and once with a spin
//! lock:
//!
//! ```rust
//! use lru_lock::{SpinLock, SynchronizedCache};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let cache = Arc::new(SynchronizedCache::with_capacity(100));
//! cache.set("key1", "value1");
//!
//! let cache_in_arc = Arc::clone(&cache);
//! let handle = thread::spawn(move || {
//!     cache_in_arc.set("key2", "value2");
//! });
//!
//! handle.join().unwrap();
//!
//! assert_eq!(cache.get("key1"), Some("value1"));
//! assert_eq!(cache.get("key2"), Some("value2"));
//!
//! let spinning: SynchronizedCache<&str, u32, SpinLock> = SynchronizedCache::new(10);
//! spinning.set("key1", 1);
//! assert_eq!(spinning.get("key1"), Some(1));
//! ```

#![deny(unsafe_code)]
pub mod cache;
pub mod spin_lock;

pub use cache::SynchronizedCache;
pub use cache::lru::LruCache;
pub use cache::recency_list::{NodeHandle, RecencyList};
pub use cache::stats::Stats;
pub use spin_lock::{SpinLock, SpinMutex};
