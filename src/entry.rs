//! Entry APIs for `InlineMap` and `HopMap`.
//!
//! `map.entry(k).or_default()` is the insert-if-absent-then-mutate idiom
//! both engines are built around: updates never create a second entry for an
//! existing key.

use std::hash::{BuildHasher, Hash};

use crate::map::{HopMap, InlineMap};

/// A view into a single entry in an `InlineMap`, which may either be vacant
/// or occupied.
pub enum InlineEntry<'a, K, V, const N: usize, S>
where
    K: Eq + Clone,
{
    Occupied(InlineOccupiedEntry<'a, K, V, N, S>),
    Vacant(InlineVacantEntry<'a, K, V, N, S>),
}

/// A view into an occupied entry in an `InlineMap`.
pub struct InlineOccupiedEntry<'a, K, V, const N: usize, S>
where
    K: Eq + Clone,
{
    map: &'a mut InlineMap<K, V, N, S>,
    key: K,
}

/// A view into a vacant entry in an `InlineMap`.
pub struct InlineVacantEntry<'a, K, V, const N: usize, S>
where
    K: Eq + Clone,
{
    map: &'a mut InlineMap<K, V, N, S>,
    key: K,
}

impl<'a, K, V, const N: usize, S> InlineEntry<'a, K, V, N, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    /// Returns a reference to this entry's key.
    pub fn key(&self) -> &K {
        match self {
            InlineEntry::Occupied(entry) => &entry.key,
            InlineEntry::Vacant(entry) => &entry.key,
        }
    }

    /// Ensures a value is in the entry by inserting the default if empty,
    /// and returns a mutable reference to the value in the entry.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            InlineEntry::Occupied(entry) => entry.into_mut(),
            InlineEntry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Ensures a value is in the entry by inserting the result of the
    /// default function if empty, and returns a mutable reference to the
    /// value in the entry.
    pub fn or_insert_with<F: FnOnce() -> V>(self, default: F) -> &'a mut V {
        match self {
            InlineEntry::Occupied(entry) => entry.into_mut(),
            InlineEntry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Like [`or_insert_with`](Self::or_insert_with), but the default
    /// function receives the key.
    pub fn or_insert_with_key<F: FnOnce(&K) -> V>(self, default: F) -> &'a mut V {
        match self {
            InlineEntry::Occupied(entry) => entry.into_mut(),
            InlineEntry::Vacant(entry) => {
                let value = default(entry.key());
                entry.insert(value)
            }
        }
    }

    /// Provides in-place mutable access to an occupied entry before any
    /// potential inserts into the map.
    pub fn and_modify<F: FnOnce(&mut V)>(mut self, f: F) -> Self {
        if let InlineEntry::Occupied(entry) = &mut self {
            f(entry.get_mut());
        }
        self
    }
}

impl<'a, K, V, const N: usize, S> InlineEntry<'a, K, V, N, S>
where
    K: Eq + Hash + Clone,
    V: Default,
    S: BuildHasher,
{
    /// Ensures a value is in the entry by inserting the default value if
    /// empty, and returns a mutable reference to the value in the entry.
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(V::default)
    }
}

impl<'a, K, V, const N: usize, S> InlineOccupiedEntry<'a, K, V, N, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    pub(crate) fn new(map: &'a mut InlineMap<K, V, N, S>, key: K) -> Self {
        Self { map, key }
    }

    /// Gets a reference to the key in the entry.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        self.map
            .table
            .get(&self.key)
            .expect("OccupiedEntry: key not found")
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        self.map
            .table
            .get_mut(&self.key)
            .expect("OccupiedEntry: key not found")
    }

    /// Converts the entry into a mutable reference to its value.
    pub fn into_mut(self) -> &'a mut V {
        self.map
            .table
            .get_mut(&self.key)
            .expect("OccupiedEntry: key not found")
    }

    /// Sets the value of the entry, and returns the entry's old value.
    pub fn insert(&mut self, value: V) -> V {
        std::mem::replace(self.get_mut(), value)
    }

    /// Takes the value out of the entry, and returns it.
    ///
    /// # Panics
    /// Panics if no deleted key was configured.
    pub fn remove(self) -> V {
        self.map
            .table
            .remove(&self.key)
            .expect("OccupiedEntry: key not found")
    }
}

impl<'a, K, V, const N: usize, S> InlineVacantEntry<'a, K, V, N, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    pub(crate) fn new(map: &'a mut InlineMap<K, V, N, S>, key: K) -> Self {
        Self { map, key }
    }

    /// Gets a reference to the key that would be used when inserting.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Takes ownership of the key.
    pub fn into_key(self) -> K {
        self.key
    }

    /// Sets the value of the entry, and returns a mutable reference to it.
    pub fn insert(self, value: V) -> &'a mut V {
        let key = self.key.clone();
        self.map.table.insert(self.key, value);
        self.map
            .table
            .get_mut(&key)
            .expect("VacantEntry::insert: failed to find inserted entry")
    }
}

/// A view into a single entry in a `HopMap`, which may either be vacant or
/// occupied.
pub enum HopEntry<'a, K, V, const N: usize, S> {
    Occupied(HopOccupiedEntry<'a, K, V, N, S>),
    Vacant(HopVacantEntry<'a, K, V, N, S>),
}

/// A view into an occupied entry in a `HopMap`.
pub struct HopOccupiedEntry<'a, K, V, const N: usize, S> {
    map: &'a mut HopMap<K, V, N, S>,
    key: K,
}

/// A view into a vacant entry in a `HopMap`.
pub struct HopVacantEntry<'a, K, V, const N: usize, S> {
    map: &'a mut HopMap<K, V, N, S>,
    key: K,
}

impl<'a, K, V, const N: usize, S> HopEntry<'a, K, V, N, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    /// Returns a reference to this entry's key.
    pub fn key(&self) -> &K {
        match self {
            HopEntry::Occupied(entry) => &entry.key,
            HopEntry::Vacant(entry) => &entry.key,
        }
    }

    /// Ensures a value is in the entry by inserting the default if empty,
    /// and returns a mutable reference to the value in the entry.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            HopEntry::Occupied(entry) => entry.into_mut(),
            HopEntry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Ensures a value is in the entry by inserting the result of the
    /// default function if empty, and returns a mutable reference to the
    /// value in the entry.
    pub fn or_insert_with<F: FnOnce() -> V>(self, default: F) -> &'a mut V {
        match self {
            HopEntry::Occupied(entry) => entry.into_mut(),
            HopEntry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Like [`or_insert_with`](Self::or_insert_with), but the default
    /// function receives the key.
    pub fn or_insert_with_key<F: FnOnce(&K) -> V>(self, default: F) -> &'a mut V {
        match self {
            HopEntry::Occupied(entry) => entry.into_mut(),
            HopEntry::Vacant(entry) => {
                let value = default(entry.key());
                entry.insert(value)
            }
        }
    }

    /// Provides in-place mutable access to an occupied entry before any
    /// potential inserts into the map.
    pub fn and_modify<F: FnOnce(&mut V)>(mut self, f: F) -> Self {
        if let HopEntry::Occupied(entry) = &mut self {
            f(entry.get_mut());
        }
        self
    }
}

impl<'a, K, V, const N: usize, S> HopEntry<'a, K, V, N, S>
where
    K: Eq + Hash + Clone,
    V: Default,
    S: BuildHasher,
{
    /// Ensures a value is in the entry by inserting the default value if
    /// empty, and returns a mutable reference to the value in the entry.
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(V::default)
    }
}

impl<'a, K, V, const N: usize, S> HopOccupiedEntry<'a, K, V, N, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub(crate) fn new(map: &'a mut HopMap<K, V, N, S>, key: K) -> Self {
        Self { map, key }
    }

    /// Gets a reference to the key in the entry.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        self.map
            .table
            .get(&self.key)
            .expect("OccupiedEntry: key not found")
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        self.map
            .table
            .get_mut(&self.key)
            .expect("OccupiedEntry: key not found")
    }

    /// Converts the entry into a mutable reference to its value.
    pub fn into_mut(self) -> &'a mut V {
        self.map
            .table
            .get_mut(&self.key)
            .expect("OccupiedEntry: key not found")
    }

    /// Sets the value of the entry, and returns the entry's old value.
    pub fn insert(&mut self, value: V) -> V {
        std::mem::replace(self.get_mut(), value)
    }

    /// Takes the value out of the entry, and returns it.
    pub fn remove(self) -> V {
        self.map
            .table
            .remove(&self.key)
            .expect("OccupiedEntry: key not found")
    }
}

impl<'a, K, V, const N: usize, S> HopVacantEntry<'a, K, V, N, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    pub(crate) fn new(map: &'a mut HopMap<K, V, N, S>, key: K) -> Self {
        Self { map, key }
    }

    /// Gets a reference to the key that would be used when inserting.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Takes ownership of the key.
    pub fn into_key(self) -> K {
        self.key
    }

    /// Sets the value of the entry, and returns a mutable reference to it.
    pub fn insert(self, value: V) -> &'a mut V {
        let key = self.key.clone();
        self.map.table.insert(self.key, value);
        self.map
            .table
            .get_mut(&key)
            .expect("VacantEntry::insert: failed to find inserted entry")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inline::InlineOptions;

    #[test]
    fn test_entry_or_insert() {
        let mut map: HopMap<u64, u64, 8> = HopMap::new();

        map.entry(1).or_insert(10);
        assert_eq!(map.get(&1), Some(&10));

        map.entry(1).or_insert(20);
        assert_eq!(map.get(&1), Some(&10)); // unchanged
    }

    #[test]
    fn test_entry_or_insert_with() {
        let mut map: HopMap<u64, u64, 8> = HopMap::new();
        map.entry(1).or_insert_with(|| 100);
        assert_eq!(map.get(&1), Some(&100));
    }

    #[test]
    fn test_entry_or_insert_with_key() {
        let mut map: HopMap<u64, u64, 8> = HopMap::new();
        map.entry(7).or_insert_with_key(|k| k * 3);
        assert_eq!(map.get(&7), Some(&21));
    }

    #[test]
    fn test_entry_and_modify() {
        let mut map: HopMap<u64, u64, 8> = HopMap::new();
        map.insert(1, 10);

        map.entry(1).and_modify(|v| *v += 5).or_insert(0);
        assert_eq!(map.get(&1), Some(&15));

        map.entry(2).and_modify(|v| *v += 5).or_insert(0);
        assert_eq!(map.get(&2), Some(&0));
    }

    #[test]
    fn test_entry_or_default_accumulates() {
        let mut map: HopMap<u64, u64, 8> = HopMap::new();
        *map.entry(1).or_default() += 1;
        *map.entry(1).or_default() += 1;
        assert_eq!(map.get(&1), Some(&2));
    }

    #[test]
    fn test_occupied_entry() {
        let mut map: HopMap<u64, u64, 8> = HopMap::new();
        map.insert(1, 10);

        if let HopEntry::Occupied(mut entry) = map.entry(1) {
            assert_eq!(entry.key(), &1);
            assert_eq!(entry.get(), &10);

            *entry.get_mut() = 20;
            assert_eq!(entry.get(), &20);

            let old = entry.insert(30);
            assert_eq!(old, 20);
        } else {
            panic!("expected occupied entry");
        }
        assert_eq!(map.get(&1), Some(&30));
    }

    #[test]
    fn test_vacant_entry() {
        let mut map: HopMap<u64, u64, 8> = HopMap::new();

        if let HopEntry::Vacant(entry) = map.entry(1) {
            assert_eq!(entry.key(), &1);
            let value = entry.insert(100);
            *value += 1;
        } else {
            panic!("expected vacant entry");
        }
        assert_eq!(map.get(&1), Some(&101));
    }

    #[test]
    fn test_entry_remove() {
        let mut map: HopMap<u64, u64, 8> = HopMap::new();
        map.insert(1, 10);

        if let HopEntry::Occupied(entry) = map.entry(1) {
            assert_eq!(entry.remove(), 10);
        }
        assert!(map.get(&1).is_none());
    }

    #[test]
    fn test_inline_entry_update_idiom() {
        let opts = InlineOptions::new(i64::MIN).deleted_key(i64::MIN + 1);
        let mut map: InlineMap<i64, String, 8> = InlineMap::new(opts);

        *map.entry(1).or_default() = "w0".to_string();
        *map.entry(1).or_default() = "w1".to_string();
        assert_eq!(map.get(&1), Some(&"w1".to_string()));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_inline_entry_survives_growth() {
        let opts = InlineOptions::new(i64::MIN).deleted_key(i64::MIN + 1);
        let mut map: InlineMap<i64, i64, 8> = InlineMap::new(opts);

        for i in 0..100 {
            *map.entry(i).or_insert(0) += i;
        }
        for i in 0..100 {
            assert_eq!(map.get(&i), Some(&i));
        }
    }

    #[test]
    fn test_inline_entry_remove() {
        let opts = InlineOptions::new(i64::MIN).deleted_key(i64::MIN + 1);
        let mut map: InlineMap<i64, i64, 8> = InlineMap::new(opts);
        map.insert(1, 10);

        if let InlineEntry::Occupied(entry) = map.entry(1) {
            assert_eq!(entry.remove(), 10);
        }
        assert!(map.is_empty());
    }
}
