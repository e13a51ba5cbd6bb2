//! The map façades over the two engines.
//!
//! `InlineMap` runs on the sentinel-keyed quadratic-probing engine and
//! therefore needs an [`InlineOptions`] at construction. `HopMap` runs on
//! the hopscotch engine and needs no configuration at all. Both keep their
//! first `N` buckets inside the map value itself, so small maps never touch
//! the heap.

use std::borrow::Borrow;
use std::hash::{BuildHasher, Hash, RandomState};

use crate::entry::{
    HopEntry, HopOccupiedEntry, HopVacantEntry, InlineEntry, InlineOccupiedEntry,
    InlineVacantEntry,
};
use crate::hopscotch::RawHopTable;
use crate::inline::{InlineOptions, RawInlineTable};
use crate::iter::{Iter, IterMut, Keys, Values, ValuesMut};

/// A hash map with `N` inline buckets, quadratic probing, and sentinel keys
/// for slot bookkeeping.
///
/// The empty sentinel (and the deleted sentinel, if removal is used) must
/// never be inserted or looked up; doing so is a contract violation caught
/// by debug assertions.
pub struct InlineMap<K, V, const N: usize, S = RandomState>
where
    K: Eq + Clone,
{
    pub(crate) table: RawInlineTable<K, V, N, S>,
}

impl<K, V, const N: usize> InlineMap<K, V, N, RandomState>
where
    K: Eq + Clone,
{
    /// Create an empty map with the given sentinel configuration.
    #[inline]
    pub fn new(options: InlineOptions<K>) -> Self {
        Self::with_capacity_and_hasher(options, 0, RandomState::new())
    }

    /// Create an empty map with room for `capacity` buckets.
    #[inline]
    pub fn with_capacity(options: InlineOptions<K>, capacity: usize) -> Self {
        Self::with_capacity_and_hasher(options, capacity, RandomState::new())
    }
}

impl<K, V, const N: usize, S> InlineMap<K, V, N, S>
where
    K: Eq + Clone,
{
    /// Create an empty map with the provided hasher.
    #[inline]
    pub fn with_hasher(options: InlineOptions<K>, hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(options, 0, hash_builder)
    }

    /// Create an empty map with room for `capacity` buckets and the provided
    /// hasher.
    #[inline]
    pub fn with_capacity_and_hasher(
        options: InlineOptions<K>,
        capacity: usize,
        hash_builder: S,
    ) -> Self {
        Self {
            table: RawInlineTable::with_capacity_and_hasher(options, capacity, hash_builder),
        }
    }

    /// Returns the number of entries in the map.
    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the total bucket count, inline and heap together.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns a reference to the hasher.
    #[inline]
    pub fn hasher(&self) -> &S {
        self.table.hasher()
    }

    /// Removes all entries, keeping the allocated capacity. Also discards
    /// tombstones, so no deleted key is required.
    #[inline]
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Returns an iterator over all key-value pairs.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.table.iter())
    }

    /// Returns a mutable iterator over all key-value pairs.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(self.table.iter_mut())
    }

    /// Returns an iterator over all keys.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self.iter())
    }

    /// Returns an iterator over all values.
    pub fn values(&self) -> Values<'_, K, V> {
        Values::new(self.iter())
    }

    /// Returns a mutable iterator over all values.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut::new(self.iter_mut())
    }

    /// Keeps only the entries for which the predicate returns `true`.
    ///
    /// # Panics
    /// Panics if an entry is dropped and no deleted key was configured.
    pub fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        self.table.retain(f);
    }
}

impl<K, V, const N: usize, S> InlineMap<K, V, N, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    /// Returns a reference to the value associated with the given key.
    #[inline]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.get(key)
    }

    /// Returns a mutable reference to the value associated with the given key.
    #[inline]
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.get_mut(key)
    }

    /// Returns `true` if the map contains a value for the given key.
    #[inline]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.find_index(key).is_some()
    }

    /// Inserts a key-value pair if the key is not already present.
    ///
    /// Returns `true` on insertion. Returns `false` if the key was already
    /// present, in which case the existing entry is left unchanged and the
    /// given pair is dropped. Use [`entry`](Self::entry) or
    /// [`get_mut`](Self::get_mut) to update an existing value.
    #[inline]
    pub fn insert(&mut self, key: K, value: V) -> bool {
        self.table.insert(key, value)
    }

    /// Removes a key from the map, returning its value if it was present.
    ///
    /// # Panics
    /// Panics if the key is present and no deleted key was configured.
    #[inline]
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.remove(key)
    }

    /// Gets the given key's corresponding entry in the map for in-place
    /// manipulation.
    pub fn entry(&mut self, key: K) -> InlineEntry<'_, K, V, N, S> {
        if self.table.find_index(&key).is_some() {
            InlineEntry::Occupied(InlineOccupiedEntry::new(self, key))
        } else {
            InlineEntry::Vacant(InlineVacantEntry::new(self, key))
        }
    }
}

impl<K, V, const N: usize, S> Clone for InlineMap<K, V, N, S>
where
    K: Eq + Clone,
    V: Clone,
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}

/// A hash map with `N` inline buckets and hopscotch collision resolution:
/// every entry lives within 27 buckets of its home, so lookups probe a
/// bounded neighborhood driven by one word of per-bucket metadata.
pub struct HopMap<K, V, const N: usize, S = RandomState> {
    pub(crate) table: RawHopTable<K, V, N, S>,
}

impl<K, V, const N: usize> HopMap<K, V, N, RandomState> {
    /// Create an empty map.
    #[inline]
    pub fn new() -> Self {
        Self::with_capacity_and_hasher(0, RandomState::new())
    }

    /// Create an empty map with room for `capacity` buckets.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }
}

impl<K, V, const N: usize, S> HopMap<K, V, N, S> {
    /// Create an empty map with the provided hasher.
    #[inline]
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(0, hash_builder)
    }

    /// Create an empty map with room for `capacity` buckets and the provided
    /// hasher.
    #[inline]
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            table: RawHopTable::with_capacity_and_hasher(capacity, hash_builder),
        }
    }

    /// Returns the number of entries in the map.
    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the total bucket count, inline and heap together.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns a reference to the hasher.
    #[inline]
    pub fn hasher(&self) -> &S {
        self.table.hasher()
    }

    /// Removes all entries, keeping the allocated capacity.
    #[inline]
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Returns an iterator over all key-value pairs.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.table.iter())
    }

    /// Returns a mutable iterator over all key-value pairs.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(self.table.iter_mut())
    }

    /// Returns an iterator over all keys.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self.iter())
    }

    /// Returns an iterator over all values.
    pub fn values(&self) -> Values<'_, K, V> {
        Values::new(self.iter())
    }

    /// Returns a mutable iterator over all values.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut::new(self.iter_mut())
    }

    /// Keeps only the entries for which the predicate returns `true`.
    pub fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        self.table.retain(f);
    }
}

impl<K, V, const N: usize, S> HopMap<K, V, N, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    /// Returns a reference to the value associated with the given key.
    #[inline]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.get(key)
    }

    /// Returns a mutable reference to the value associated with the given key.
    #[inline]
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.get_mut(key)
    }

    /// Returns `true` if the map contains a value for the given key.
    #[inline]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.find_index(key).is_some()
    }

    /// Inserts a key-value pair if the key is not already present.
    ///
    /// Returns `true` on insertion. Returns `false` if the key was already
    /// present, in which case the existing entry is left unchanged and the
    /// given pair is dropped. Use [`entry`](Self::entry) or
    /// [`get_mut`](Self::get_mut) to update an existing value.
    #[inline]
    pub fn insert(&mut self, key: K, value: V) -> bool {
        self.table.insert(key, value)
    }

    /// Removes a key from the map, returning its value if it was present.
    #[inline]
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.remove(key)
    }

    /// Gets the given key's corresponding entry in the map for in-place
    /// manipulation.
    pub fn entry(&mut self, key: K) -> HopEntry<'_, K, V, N, S> {
        if self.table.find_index(&key).is_some() {
            HopEntry::Occupied(HopOccupiedEntry::new(self, key))
        } else {
            HopEntry::Vacant(HopVacantEntry::new(self, key))
        }
    }

    /// Verifies the hopscotch metadata invariants, walking every bucket.
    /// Intended for tests.
    pub fn check_consistency(&self) {
        self.table.check_consistency();
    }
}

impl<K, V, const N: usize> Default for HopMap<K, V, N, RandomState> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, const N: usize, S> Clone for HopMap<K, V, N, S>
where
    K: Clone,
    V: Clone,
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> InlineOptions<String> {
        InlineOptions::new(String::new()).deleted_key("\u{0}".to_string())
    }

    #[test]
    fn test_new() {
        let map: HopMap<u64, u64, 8> = HopMap::new();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
        assert_eq!(map.capacity(), 8);

        let map: InlineMap<u64, u64, 8> = InlineMap::new(InlineOptions::new(u64::MAX));
        assert!(map.is_empty());
        assert_eq!(map.capacity(), 8);
    }

    #[test]
    fn test_insert_get_erase_roundtrip() {
        let mut map: InlineMap<String, String, 8> = InlineMap::new(opts());

        assert!(map.insert("hello".to_string(), "world".to_string()));
        assert!(!map.is_empty());
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("hello"), Some(&"world".to_string()));

        assert_eq!(map.remove("hello"), Some("world".to_string()));
        assert!(map.is_empty());
        assert_eq!(map.get("hello"), None);
    }

    #[test]
    fn test_insert_get_erase_roundtrip_hop() {
        let mut map: HopMap<String, String, 8> = HopMap::new();

        assert!(map.insert("hello".to_string(), "world".to_string()));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("hello"), Some(&"world".to_string()));

        assert_eq!(map.remove("hello"), Some("world".to_string()));
        assert!(map.is_empty());
        assert_eq!(map.get("hello"), None);
        map.check_consistency();
    }

    #[test]
    fn test_duplicate_insert_keeps_existing() {
        let mut map: HopMap<u64, u64, 8> = HopMap::new();
        assert!(map.insert(1, 100));
        assert!(!map.insert(1, 200));
        assert_eq!(map.get(&1), Some(&100));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_get_mut() {
        let mut map: HopMap<u64, u64, 8> = HopMap::new();
        map.insert(1, 100);

        if let Some(v) = map.get_mut(&1) {
            *v = 999;
        }
        assert_eq!(map.get(&1), Some(&999));
    }

    #[test]
    fn test_get_with_borrow() {
        let mut map: InlineMap<String, i32, 8> = InlineMap::new(opts());
        map.insert("hello".to_string(), 42);

        // Look up with &str instead of &String
        assert_eq!(map.get("hello"), Some(&42));
        assert_eq!(map.get("world"), None);
        assert!(map.contains_key("hello"));
    }

    #[test]
    fn test_clear_without_deleted_key() {
        // No deleted key configured: insert and clear must still work.
        let mut map: InlineMap<String, String, 8> =
            InlineMap::new(InlineOptions::new(String::new()));
        map.insert("hello".to_string(), "world".to_string());
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.get("hello"), None);
    }

    #[test]
    fn test_iteration_yields_all_pairs() {
        let mut map: HopMap<String, String, 8> = HopMap::new();
        map.insert("h0".to_string(), "w0".to_string());
        map.insert("h1".to_string(), "w1".to_string());

        let mut pairs: Vec<(String, String)> =
            map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("h0".to_string(), "w0".to_string()),
                ("h1".to_string(), "w1".to_string()),
            ]
        );
    }

    #[test]
    fn test_iter_mut() {
        let mut map: HopMap<u64, u64, 8> = HopMap::new();
        for i in 0..100 {
            map.insert(i, i);
        }
        for (_, v) in map.iter_mut() {
            *v *= 2;
        }
        for i in 0..100 {
            assert_eq!(map.get(&i), Some(&(i * 2)));
        }
    }

    #[test]
    fn test_keys_values() {
        let mut map: HopMap<u64, u64, 8> = HopMap::new();
        map.insert(1, 10);
        map.insert(2, 20);
        map.insert(3, 30);

        let keys: Vec<_> = map.keys().copied().collect();
        let values: Vec<_> = map.values().copied().collect();
        assert_eq!(keys.len(), 3);
        assert_eq!(values.len(), 3);
        assert!(keys.contains(&1) && keys.contains(&2) && keys.contains(&3));
        assert!(values.contains(&10) && values.contains(&20) && values.contains(&30));
    }

    #[test]
    fn test_for_loop() {
        let mut map: HopMap<String, i32, 8> = HopMap::new();
        map.insert("a".to_string(), 1);
        map.insert("b".to_string(), 2);

        let mut sum = 0;
        for (_, v) in &map {
            sum += v;
        }
        assert_eq!(sum, 3);
    }

    #[test]
    fn test_values_mut_via_for_loop() {
        let mut map: HopMap<u64, u64, 8> = HopMap::new();
        map.insert(1, 1);
        map.insert(2, 2);

        for (_, v) in &mut map {
            *v += 10;
        }
        assert_eq!(map.get(&1), Some(&11));
        assert_eq!(map.get(&2), Some(&12));
    }

    #[test]
    fn test_capacity_hint() {
        let map: HopMap<u64, u64, 8> = HopMap::with_capacity(100);
        assert!(map.capacity() >= 100);
        assert_eq!(map.capacity(), 128);
    }

    #[test]
    fn test_clone_is_deep() {
        let mut map: InlineMap<String, String, 4> = InlineMap::new(opts());
        map.insert("h0".to_string(), "w0".to_string());

        let mut copy = map.clone();
        assert_eq!(copy.len(), 1);
        assert_eq!(copy.get("h0"), Some(&"w0".to_string()));

        copy.insert("h1".to_string(), "w1".to_string());
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("h1"), None);
    }

    #[test]
    fn test_move_transfers_contents() {
        let mut map: HopMap<String, String, 4> = HopMap::new();
        map.insert("h0".to_string(), "w0".to_string());

        let moved = map;
        assert_eq!(moved.len(), 1);
        assert_eq!(moved.get("h0"), Some(&"w0".to_string()));
    }

    #[test]
    fn test_retain() {
        let mut map: HopMap<u64, u64, 8> = HopMap::new();
        for i in 0..100 {
            map.insert(i, i);
        }
        map.retain(|k, _| k % 2 == 0);
        assert_eq!(map.len(), 50);
        assert!(map.contains_key(&4));
        assert!(!map.contains_key(&5));
    }

    #[test]
    fn test_custom_hasher() {
        let hasher = RandomState::new();
        let mut map: HopMap<u64, u64, 8, _> = HopMap::with_hasher(hasher);
        map.insert(1, 100);
        assert!(map.contains_key(&1));
        let _ = map.hasher();
    }
}
