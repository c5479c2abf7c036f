use std::collections::{BTreeMap, BTreeSet};

/// A multiset. Every key is counted once per insertion; keys whose count drops to zero disappear.
///
/// Backed by a `BTreeMap`, so iteration order is deterministic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Counter<T: Ord> {
    map: BTreeMap<T, usize>,
    sum: usize,
}

impl<T: Ord> Default for Counter<T> {
    fn default() -> Counter<T> {
        Counter::new()
    }
}

impl<T: Ord> Counter<T> {
    pub fn new() -> Counter<T> {
        Counter {
            map: BTreeMap::new(),
            sum: 0,
        }
    }

    pub fn add(&mut self, val: T, amount: usize) -> usize {
        if amount == 0 {
            return self.get(&val);
        }
        self.sum += amount;
        let entry = self.map.entry(val).or_insert(0);
        *entry += amount;
        *entry
    }

    /// Returns the count after incrementing.
    pub fn inc(&mut self, val: T) -> usize {
        self.add(val, 1)
    }

    /// Drops every occurrence of a key, returning how many there were.
    pub fn remove_all(&mut self, val: &T) -> usize {
        let count = self.map.remove(val).unwrap_or(0);
        self.sum -= count;
        count
    }

    pub fn get(&self, val: &T) -> usize {
        self.map.get(val).copied().unwrap_or(0)
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Total of all counts, so repeated keys contribute multiple times
    pub fn sum(&self) -> usize {
        self.sum
    }

    pub fn keys(&self) -> impl Iterator<Item = &T> {
        self.map.keys()
    }

}

/// A map from one key to a set of values. Empty sets are never stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultiMap<K: Ord, V: Ord> {
    map: BTreeMap<K, BTreeSet<V>>,
    empty: BTreeSet<V>,
}

impl<K: Ord, V: Ord> Default for MultiMap<K, V> {
    fn default() -> MultiMap<K, V> {
        MultiMap::new()
    }
}

impl<K: Ord, V: Ord> MultiMap<K, V> {
    pub fn new() -> MultiMap<K, V> {
        MultiMap {
            map: BTreeMap::new(),
            empty: BTreeSet::new(),
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.map.entry(key).or_insert_with(BTreeSet::new).insert(value);
    }

    pub fn remove(&mut self, key: K, value: V) {
        if let Some(values) = self.map.get_mut(&key) {
            values.remove(&value);
            if values.is_empty() {
                self.map.remove(&key);
            }
        }
    }

    pub fn get(&self, key: K) -> &BTreeSet<V> {
        self.map.get(&key).unwrap_or(&self.empty)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &BTreeSet<V>)> {
        self.map.iter()
    }
}
