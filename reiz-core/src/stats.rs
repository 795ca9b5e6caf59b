//! Bounded memoization of per-node-kind row counts
//! (`spec.md` §5 "Shared resources", §9 "Memoization of statistics").
//!
//! A small hand-rolled LRU over a `Vec` — not a new dependency, since a
//! cache of depth 16 keyed by a sorted tuple of node-kind names does not
//! need one. Grounded on `original_source/reiz/fetch.py`'s
//! `@lru_cache(8)` on `get_stats`, generalized to an explicit, droppable
//! cache object rather than a global memoized function (`reiz-core` has
//! no ambient global state, per `spec.md` §5 "no shared mutable state").

use std::collections::HashMap;

const DEFAULT_CAPACITY: usize = 16;

/// Key: the sorted, deduplicated tuple of node-kind names a `get_stats`
/// call was made with — order-independent, since the count-per-kind
/// result does not depend on the caller's ordering.
fn cache_key(node_kinds: &[String]) -> Vec<String> {
    let mut key: Vec<String> = node_kinds.to_vec();
    key.sort();
    key.dedup();
    key
}

/// A bounded least-recently-used cache of `{node_kind: count}` maps,
/// keyed by the set of node kinds requested together.
pub struct StatsCache {
    capacity: usize,
    order: Vec<Vec<String>>,
    entries: HashMap<Vec<String>, HashMap<String, i64>>,
}

impl StatsCache {
    pub fn new() -> Self {
        StatsCache::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        StatsCache {
            capacity: capacity.max(1),
            order: Vec::new(),
            entries: HashMap::new(),
        }
    }

    pub fn get(&mut self, node_kinds: &[String]) -> Option<HashMap<String, i64>> {
        let key = cache_key(node_kinds);
        if let Some(hit) = self.entries.get(&key).cloned() {
            self.touch(&key);
            Some(hit)
        } else {
            None
        }
    }

    pub fn put(&mut self, node_kinds: &[String], counts: HashMap<String, i64>) {
        let key = cache_key(node_kinds);
        if !self.entries.contains_key(&key) && self.order.len() >= self.capacity {
            let oldest = self.order.remove(0);
            self.entries.remove(&oldest);
        }
        self.entries.insert(key.clone(), counts);
        self.touch(&key);
    }

    fn touch(&mut self, key: &[String]) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push(key.to_vec());
    }
}

impl Default for StatsCache {
    fn default() -> Self {
        StatsCache::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn miss_then_hit() {
        let mut cache = StatsCache::new();
        assert!(cache.get(&kinds(&["Name"])).is_none());
        let mut counts = HashMap::new();
        counts.insert("Name".to_string(), 10);
        cache.put(&kinds(&["Name"]), counts.clone());
        assert_eq!(cache.get(&kinds(&["Name"])), Some(counts));
    }

    #[test]
    fn key_is_order_independent() {
        let mut cache = StatsCache::new();
        let mut counts = HashMap::new();
        counts.insert("Name".to_string(), 1);
        counts.insert("Call".to_string(), 2);
        cache.put(&kinds(&["Name", "Call"]), counts.clone());
        assert_eq!(cache.get(&kinds(&["Call", "Name"])), Some(counts));
    }

    #[test]
    fn evicts_oldest_past_capacity() {
        let mut cache = StatsCache::with_capacity(2);
        cache.put(&kinds(&["A"]), HashMap::new());
        cache.put(&kinds(&["B"]), HashMap::new());
        cache.put(&kinds(&["C"]), HashMap::new());
        assert!(cache.get(&kinds(&["A"])).is_none());
        assert!(cache.get(&kinds(&["B"])).is_some());
        assert!(cache.get(&kinds(&["C"])).is_some());
    }
}
