//! Bounded cache of decrypted values.
//!
//! Eviction is by insertion order: when full, the entry inserted longest ago
//! goes first. Reading an entry does not refresh it, and overwriting an
//! existing key keeps its original slot.
//!
//! Every `invalidate` and `clear` advances an epoch counter. A reader that
//! captured the epoch before decrypting compares it again before inserting,
//! so a value decrypted before a write never lands in the cache after it.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;
use serde_json::Value;

/// Counters for cache observability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Current number of entries.
    pub size: usize,
    /// Maximum allowed entries (`None` = unlimited).
    pub max_size: Option<usize>,
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
    pub invalidations: u64,
}

impl CacheStats {
    /// Hits divided by total lookups, or 0.0 before the first lookup.
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
pub struct DecryptCache {
    entries: HashMap<String, Value>,
    /// Insertion order, oldest at the front.
    order: VecDeque<String>,
    max_size: usize,
    epoch: u64,
    stats: CacheStats,
}

impl DecryptCache {
    /// Create a cache holding at most `max_size` entries. `0` means unbounded.
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            max_size,
            epoch: 0,
            stats: CacheStats {
                max_size: (max_size > 0).then_some(max_size),
                ..CacheStats::default()
            },
        }
    }

    pub fn get(&mut self, key: &str) -> Option<Value> {
        match self.entries.get(key) {
            Some(value) => {
                self.stats.hits += 1;
                Some(value.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Look up without touching the hit/miss counters.
    pub fn peek(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Insert or overwrite. Returns the evicted key, if any.
    pub fn put(&mut self, key: impl Into<String>, value: Value) -> Option<String> {
        let key = key.into();
        self.stats.inserts += 1;

        if let Some(existing) = self.entries.get_mut(&key) {
            *existing = value;
            return None;
        }

        let evicted = if self.max_size > 0 && self.entries.len() >= self.max_size {
            self.evict_oldest()
        } else {
            None
        };

        self.order.push_back(key.clone());
        self.entries.insert(key, value);
        evicted
    }

    pub fn invalidate(&mut self, key: &str) {
        self.epoch += 1;
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
            self.stats.invalidations += 1;
        }
    }

    pub fn clear(&mut self) {
        self.epoch += 1;
        self.stats.invalidations += self.entries.len() as u64;
        self.entries.clear();
        self.order.clear();
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            ..self.stats.clone()
        }
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let oldest = self.order.pop_front()?;
        self.entries.remove(&oldest);
        self.stats.evictions += 1;
        Some(oldest)
    }
}

impl Default for DecryptCache {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_evicts_oldest_inserted() {
        let mut cache = DecryptCache::new(3);
        for i in 1..=3 {
            cache.put(format!("key{i}"), json!(i));
        }
        // Reading key1 does not protect it.
        assert_eq!(cache.get("key1"), Some(json!(1)));

        let evicted = cache.put("key4", json!(4));
        assert_eq!(evicted.as_deref(), Some("key1"));
        assert_eq!(cache.size(), 3);
        assert!(!cache.contains("key1"));
        assert!(cache.contains("key4"));
    }

    #[test]
    fn test_overwrite_keeps_slot_and_does_not_evict() {
        let mut cache = DecryptCache::new(2);
        cache.put("a", json!("a1"));
        cache.put("b", json!("b1"));
        assert_eq!(cache.put("a", json!("a2")), None);
        assert_eq!(cache.size(), 2);

        // "a" is still the oldest insertion.
        assert_eq!(cache.put("c", json!("c1")).as_deref(), Some("a"));
        assert_eq!(cache.peek("b"), Some(&json!("b1")));
    }

    #[test]
    fn test_zero_capacity_is_unbounded() {
        let mut cache = DecryptCache::new(0);
        for i in 0..500 {
            cache.put(i.to_string(), json!(i));
        }
        assert_eq!(cache.size(), 500);
        assert_eq!(cache.stats().evictions, 0);
        assert_eq!(cache.stats().max_size, None);
    }

    #[test]
    fn test_invalidate_and_clear() {
        let mut cache = DecryptCache::new(10);
        cache.put("x", json!(1));
        cache.put("y", json!(2));

        cache.invalidate("missing");
        assert_eq!(cache.size(), 2);

        cache.invalidate("x");
        assert_eq!(cache.get("x"), None);
        assert_eq!(cache.size(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidated_key_frees_its_order_slot() {
        let mut cache = DecryptCache::new(2);
        cache.put("a", json!(1));
        cache.put("b", json!(2));
        cache.invalidate("a");
        cache.put("c", json!(3));
        assert_eq!(cache.size(), 2);
        assert_eq!(cache.put("d", json!(4)).as_deref(), Some("b"));
    }

    #[test]
    fn test_epoch_advances_on_every_invalidation() {
        let mut cache = DecryptCache::new(4);
        let start = cache.epoch();
        // Even a miss counts: a concurrent reader must not insert afterwards.
        cache.invalidate("absent");
        assert_eq!(cache.epoch(), start + 1);
        cache.put("k", json!(1));
        assert_eq!(cache.epoch(), start + 1);
        cache.clear();
        assert_eq!(cache.epoch(), start + 2);
    }

    #[test]
    fn test_stats_track_hits_and_misses() {
        let mut cache = DecryptCache::new(3);
        cache.put("a", json!(1));
        cache.get("a");
        cache.get("b");
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }
}
