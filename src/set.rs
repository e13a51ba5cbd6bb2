//! The set façades: thin pass-throughs over the same engines with a unit
//! payload, so the stored value is the key itself.

use std::borrow::Borrow;
use std::hash::{BuildHasher, Hash, RandomState};

use crate::hopscotch::RawHopTable;
use crate::inline::{InlineOptions, RawInlineTable};
use crate::iter::SetIter;

/// A hash set with `N` inline buckets, quadratic probing, and sentinel
/// values for slot bookkeeping.
///
/// The empty sentinel (and the deleted sentinel, if removal is used) must
/// never be inserted or looked up.
pub struct InlineSet<T, const N: usize, S = RandomState>
where
    T: Eq + Clone,
{
    table: RawInlineTable<T, (), N, S>,
}

impl<T, const N: usize> InlineSet<T, N, RandomState>
where
    T: Eq + Clone,
{
    /// Create an empty set with the given sentinel configuration.
    #[inline]
    pub fn new(options: InlineOptions<T>) -> Self {
        Self::with_capacity_and_hasher(options, 0, RandomState::new())
    }

    /// Create an empty set with room for `capacity` buckets.
    #[inline]
    pub fn with_capacity(options: InlineOptions<T>, capacity: usize) -> Self {
        Self::with_capacity_and_hasher(options, capacity, RandomState::new())
    }
}

impl<T, const N: usize, S> InlineSet<T, N, S>
where
    T: Eq + Clone,
{
    /// Create an empty set with the provided hasher.
    #[inline]
    pub fn with_hasher(options: InlineOptions<T>, hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(options, 0, hash_builder)
    }

    /// Create an empty set with room for `capacity` buckets and the provided
    /// hasher.
    #[inline]
    pub fn with_capacity_and_hasher(
        options: InlineOptions<T>,
        capacity: usize,
        hash_builder: S,
    ) -> Self {
        Self {
            table: RawInlineTable::with_capacity_and_hasher(options, capacity, hash_builder),
        }
    }

    /// Returns the number of values in the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set contains no values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the total bucket count, inline and heap together.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Removes all values, keeping the allocated capacity. Also discards
    /// tombstones, so no deleted sentinel is required.
    #[inline]
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Returns an iterator over all values.
    pub fn iter(&self) -> SetIter<'_, T> {
        SetIter::new(self.table.iter().map(|(value, _)| value))
    }

    /// Keeps only the values for which the predicate returns `true`.
    ///
    /// # Panics
    /// Panics if a value is dropped and no deleted sentinel was configured.
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.table.retain(|value, _| f(value));
    }
}

impl<T, const N: usize, S> InlineSet<T, N, S>
where
    T: Eq + Hash + Clone,
    S: BuildHasher,
{
    /// Returns `true` if the set contains the given value.
    #[inline]
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.find_index(value).is_some()
    }

    /// Returns a reference to the stored value equal to the given one.
    #[inline]
    pub fn get<Q>(&self, value: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.get_entry(value).map(|(stored, _)| stored)
    }

    /// Adds a value to the set. Returns `true` if it was not already
    /// present; an existing value is left unchanged.
    #[inline]
    pub fn insert(&mut self, value: T) -> bool {
        self.table.insert(value, ())
    }

    /// Removes a value from the set. Returns `true` if it was present.
    ///
    /// # Panics
    /// Panics if the value is present and no deleted sentinel was
    /// configured.
    #[inline]
    pub fn remove<Q>(&mut self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.remove(value).is_some()
    }
}

impl<T, const N: usize, S> Clone for InlineSet<T, N, S>
where
    T: Eq + Clone,
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}

/// A hash set with `N` inline buckets and hopscotch collision resolution.
pub struct HopSet<T, const N: usize, S = RandomState> {
    table: RawHopTable<T, (), N, S>,
}

impl<T, const N: usize> HopSet<T, N, RandomState> {
    /// Create an empty set.
    #[inline]
    pub fn new() -> Self {
        Self::with_capacity_and_hasher(0, RandomState::new())
    }

    /// Create an empty set with room for `capacity` buckets.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }
}

impl<T, const N: usize, S> HopSet<T, N, S> {
    /// Create an empty set with the provided hasher.
    #[inline]
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(0, hash_builder)
    }

    /// Create an empty set with room for `capacity` buckets and the provided
    /// hasher.
    #[inline]
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            table: RawHopTable::with_capacity_and_hasher(capacity, hash_builder),
        }
    }

    /// Returns the number of values in the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set contains no values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the total bucket count, inline and heap together.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Removes all values, keeping the allocated capacity.
    #[inline]
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Returns an iterator over all values.
    pub fn iter(&self) -> SetIter<'_, T> {
        SetIter::new(self.table.iter().map(|(value, _)| value))
    }

    /// Keeps only the values for which the predicate returns `true`.
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.table.retain(|value, _| f(value));
    }
}

impl<T, const N: usize, S> HopSet<T, N, S>
where
    T: Eq + Hash,
    S: BuildHasher,
{
    /// Returns `true` if the set contains the given value.
    #[inline]
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.find_index(value).is_some()
    }

    /// Returns a reference to the stored value equal to the given one.
    #[inline]
    pub fn get<Q>(&self, value: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.get_entry(value).map(|(stored, _)| stored)
    }

    /// Adds a value to the set. Returns `true` if it was not already
    /// present; an existing value is left unchanged.
    #[inline]
    pub fn insert(&mut self, value: T) -> bool {
        self.table.insert(value, ())
    }

    /// Removes a value from the set. Returns `true` if it was present.
    #[inline]
    pub fn remove<Q>(&mut self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.remove(value).is_some()
    }

    /// Verifies the hopscotch metadata invariants, walking every bucket.
    /// Intended for tests.
    pub fn check_consistency(&self) {
        self.table.check_consistency();
    }
}

impl<T, const N: usize> Default for HopSet<T, N, RandomState> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize, S> Clone for HopSet<T, N, S>
where
    T: Clone,
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}
