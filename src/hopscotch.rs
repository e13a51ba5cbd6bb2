//! Hopscotch engine.
//!
//! Every entry lives within `HOP_RANGE` buckets of its home. The home
//! bucket's leaf mask records which of those neighbors hold its residents,
//! and each occupied bucket's origin field points back at its home, so no
//! sentinel keys are needed. Insertion finds any empty bucket within a
//! linear scan window and, if it is too far out, repeatedly swaps it toward
//! the home with entries that can legally move.

use std::borrow::Borrow;
use std::hash::{BuildHasher, Hash};
use std::mem::MaybeUninit;

use crate::meta::HopMeta;
use crate::storage::SplitArray;

/// Neighborhood size: the furthest distance an entry may live from its home.
pub(crate) const HOP_RANGE: usize = HopMeta::MASK_BITS;

/// Linear-scan window when looking for any empty bucket during insertion.
const ADD_RANGE: usize = 128;

/// Growth attempts per insert before declaring the hash degenerate.
const GROW_RETRIES: usize = 4;

/// One bucket: metadata plus an entry cell that is initialized iff the
/// metadata says the bucket is occupied.
struct HopBucket<K, U> {
    meta: HopMeta,
    slot: MaybeUninit<(K, U)>,
}

impl<K, U> HopBucket<K, U> {
    fn new() -> Self {
        Self {
            meta: HopMeta::empty(),
            slot: MaybeUninit::uninit(),
        }
    }
}

impl<K, U> Drop for HopBucket<K, U> {
    fn drop(&mut self) {
        if self.meta.is_occupied() {
            // Safety: occupied buckets always hold an initialized entry
            unsafe { self.slot.assume_init_drop() };
        }
    }
}

impl<K: Clone, U: Clone> Clone for HopBucket<K, U> {
    fn clone(&self) -> Self {
        let mut bucket = Self::new();
        bucket.meta = self.meta;
        if self.meta.is_occupied() {
            // Safety: occupied buckets always hold an initialized entry
            bucket.slot.write(unsafe { self.slot.assume_init_ref() }.clone());
        }
        bucket
    }
}

/// Open-addressed hopscotch table with `N` inline buckets. Backs both the
/// map and the set façade; sets store `U = ()`.
pub struct RawHopTable<K, U, const N: usize, S> {
    buckets: SplitArray<HopBucket<K, U>, N>,
    hasher: S,
    len: usize,
}

impl<K, U, const N: usize, S> RawHopTable<K, U, N, S> {
    pub(crate) fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            buckets: SplitArray::new_with(Self::compute_capacity(capacity), HopBucket::new),
            hasher,
            len: 0,
        }
    }

    /// Smallest valid capacity holding `desired` buckets: a power of two,
    /// at least `N`. Zero only before the first growth of an `N = 0` table.
    fn compute_capacity(desired: usize) -> usize {
        let desired = desired.max(N);
        if desired == 0 {
            0
        } else {
            desired.next_power_of_two()
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.buckets.capacity()
    }

    #[inline]
    pub(crate) fn hasher(&self) -> &S {
        &self.hasher
    }

    #[inline]
    fn is_occupied(&self, index: usize) -> bool {
        self.buckets.get(index).meta.is_occupied()
    }

    /// Smallest occupied index at or after `from`.
    fn next_live(&self, from: usize) -> Option<usize> {
        (from..self.buckets.capacity()).find(|&i| self.is_occupied(i))
    }

    /// Key and value at an occupied index.
    fn entry_at(&self, index: usize) -> (&K, &U) {
        debug_assert!(self.is_occupied(index));
        // Safety: occupied buckets always hold an initialized entry
        let entry = unsafe { self.buckets.get(index).slot.assume_init_ref() };
        (&entry.0, &entry.1)
    }

    fn value_at_mut(&mut self, index: usize) -> &mut U {
        debug_assert!(self.is_occupied(index));
        // Safety: occupied buckets always hold an initialized entry
        let entry = unsafe { self.buckets.get_mut(index).slot.assume_init_mut() };
        &mut entry.1
    }

    /// Unlink and take the entry at an occupied index: clear the leaf bit on
    /// its home bucket, clear its origin, move the entry out.
    pub(crate) fn remove_at(&mut self, index: usize) -> (K, U) {
        let bucket = self.buckets.get_mut(index);
        let dist = bucket
            .meta
            .origin()
            .expect("remove_at called on an empty bucket");
        // Safety: occupied buckets always hold an initialized entry; the
        // origin is cleared before anything else can observe the bucket
        let entry = unsafe { bucket.slot.assume_init_read() };
        bucket.meta.clear_origin();

        let home = self.buckets.clamp(index.wrapping_sub(dist));
        self.buckets.get_mut(home).meta.clear_leaf(dist);
        self.len -= 1;
        entry
    }

    /// Drop every entry and zero all metadata. Capacity is retained.
    pub(crate) fn clear(&mut self) {
        for bucket in self.buckets.buckets_mut() {
            if bucket.meta.is_occupied() {
                // Safety: occupied buckets always hold an initialized entry
                unsafe { bucket.slot.assume_init_drop() };
            }
            bucket.meta.clear_all();
        }
        self.len = 0;
    }

    /// Iterate entries in index order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&K, &U)> {
        let mut from = 0;
        std::iter::from_fn(move || {
            let index = self.next_live(from)?;
            from = index + 1;
            Some(self.entry_at(index))
        })
    }

    /// Iterate entries with mutable values.
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut U)> {
        self.buckets.buckets_mut().filter_map(|bucket| {
            if bucket.meta.is_occupied() {
                // Safety: occupied buckets always hold an initialized entry
                let entry = unsafe { bucket.slot.assume_init_mut() };
                Some((&entry.0, &mut entry.1))
            } else {
                None
            }
        })
    }

    /// Keep only the entries the predicate approves. Never rehashes, so
    /// every entry is visited exactly once.
    pub(crate) fn retain(&mut self, mut f: impl FnMut(&K, &mut U) -> bool) {
        for index in 0..self.buckets.capacity() {
            if !self.is_occupied(index) {
                continue;
            }
            let keep = {
                // Safety: occupied buckets always hold an initialized entry
                let entry = unsafe { self.buckets.get_mut(index).slot.assume_init_mut() };
                f(&entry.0, &mut entry.1)
            };
            if !keep {
                self.remove_at(index);
            }
        }
    }
}

impl<K, U, const N: usize, S> RawHopTable<K, U, N, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Index of the entry for `key`, if present.
    pub(crate) fn find_index<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find_hashed(self.hasher.hash_one(key), key)
    }

    fn find_hashed<Q>(&self, hash: u64, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        if self.buckets.capacity() == 0 {
            return None;
        }
        let home = self.buckets.clamp(hash as usize);
        for dist in self.buckets.get(home).meta.leaves() {
            let index = self.buckets.clamp(home + dist);
            if self.entry_at(index).0.borrow() == key {
                return Some(index);
            }
        }
        None
    }

    pub(crate) fn get<Q>(&self, key: &Q) -> Option<&U>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find_index(key).map(|i| self.entry_at(i).1)
    }

    pub(crate) fn get_entry<Q>(&self, key: &Q) -> Option<(&K, &U)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find_index(key).map(|i| self.entry_at(i))
    }

    pub(crate) fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut U>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.find_index(key)?;
        Some(self.value_at_mut(index))
    }

    /// Insert the entry if the key is absent. Returns `true` on insertion;
    /// `false` leaves the existing entry unchanged.
    ///
    /// # Panics
    /// Panics if placement keeps failing after repeated growth, which only
    /// happens with a degenerate hash function.
    pub(crate) fn insert(&mut self, key: K, value: U) -> bool {
        let hash = self.hasher.hash_one(&key);
        if self.find_hashed(hash, &key).is_some() {
            return false;
        }
        for _ in 0..GROW_RETRIES {
            if let Some(index) = self.place(hash) {
                self.buckets.get_mut(index).slot.write((key, value));
                self.len += 1;
                return true;
            }
            self.grow();
        }
        panic!("hopscotch placement failed after {GROW_RETRIES} growth attempts; degenerate hash function?");
    }

    /// Remove the entry for `key`, returning its value.
    pub(crate) fn remove<Q>(&mut self, key: &Q) -> Option<U>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.find_index(key)?;
        Some(self.remove_at(index).1)
    }

    /// Claim a bucket within `HOP_RANGE` of the hash's home and link its
    /// metadata. The entry itself is written by the caller. Returns `None`
    /// when no such bucket can be produced at the current capacity.
    fn place(&mut self, hash: u64) -> Option<usize> {
        if self.buckets.capacity() == 0 {
            return None;
        }
        let home = self.buckets.clamp(hash as usize);

        // Any empty bucket within the scan window will do as a start.
        let scan = ADD_RANGE.min(self.buckets.capacity());
        let mut free = (0..scan)
            .map(|i| self.buckets.clamp(home + i))
            .find(|&i| !self.is_occupied(i))?;

        loop {
            let dist = self.buckets.distance(home, free);
            if dist < HOP_RANGE {
                self.buckets.get_mut(home).meta.set_leaf(dist);
                self.buckets.get_mut(free).meta.set_origin(dist);
                return Some(free);
            }
            free = self.pull_free_closer(free)?;
        }
    }

    /// Move the free bucket closer to the insertion home by swapping it with
    /// the furthest-back entry that can relocate into it without leaving its
    /// own neighborhood. Returns the vacated bucket.
    fn pull_free_closer(&mut self, free: usize) -> Option<usize> {
        for dist in (1..HOP_RANGE).rev() {
            let cand = self.buckets.clamp(free.wrapping_sub(dist));
            let Some(leaf) = self.buckets.get(cand).meta.first_leaf() else {
                continue;
            };
            if leaf >= dist {
                // All of cand's residents already sit at or past the free
                // bucket.
                continue;
            }

            let victim = self.buckets.clamp(cand + leaf);
            // Safety: victim is a leaf of cand, hence occupied; its origin
            // is cleared right after the move so it is never read again
            let entry = unsafe { self.buckets.get_mut(victim).slot.assume_init_read() };
            self.buckets.get_mut(victim).meta.clear_origin();

            let cand_meta = &mut self.buckets.get_mut(cand).meta;
            cand_meta.clear_leaf(leaf);
            cand_meta.set_leaf(dist);

            let free_bucket = self.buckets.get_mut(free);
            free_bucket.slot.write(entry);
            free_bucket.meta.set_origin(dist);

            return Some(victim);
        }
        None
    }

    fn grow(&mut self) {
        let new_capacity = Self::compute_capacity(self.buckets.capacity() + 1).max(1);
        self.rehash(new_capacity);
    }

    /// Move every entry into a fresh array of `new_capacity` buckets.
    fn rehash(&mut self, new_capacity: usize) {
        let fresh = SplitArray::new_with(new_capacity, HopBucket::new);
        let old = std::mem::replace(&mut self.buckets, fresh);

        for mut bucket in old {
            if !bucket.meta.is_occupied() {
                continue;
            }
            // Safety: occupied buckets always hold an initialized entry; the
            // metadata is zeroed so the bucket's drop will not touch it
            let (key, value) = unsafe { bucket.slot.assume_init_read() };
            bucket.meta.clear_all();

            let hash = self.hasher.hash_one(&key);
            let index = self
                .place(hash)
                .expect("hopscotch rehash failed to place a surviving entry");
            self.buckets.get_mut(index).slot.write((key, value));
        }
    }

    /// Walk the whole table and assert the leaf/origin bijection: every leaf
    /// points at an occupied bucket homed here, and every occupied bucket is
    /// a leaf of its home at the recorded distance. Intended for tests.
    pub(crate) fn check_consistency(&self) {
        let mut occupied = 0;
        for bi in 0..self.buckets.capacity() {
            let meta = &self.buckets.get(bi).meta;
            for dist in meta.leaves() {
                let leaf_index = self.buckets.clamp(bi + dist);
                let leaf = self.buckets.get(leaf_index);
                assert!(leaf.meta.is_occupied(), "leaf points at an empty bucket");
                assert_eq!(
                    leaf.meta.origin(),
                    Some(dist),
                    "leaf distance and origin disagree"
                );
                let home = self
                    .buckets
                    .clamp(self.hasher.hash_one(self.entry_at(leaf_index).0) as usize);
                assert_eq!(home, bi, "entry is linked to a bucket that is not its home");
            }
            if let Some(dist) = meta.origin() {
                occupied += 1;
                assert!(dist < HOP_RANGE);
                let home = self.buckets.clamp(bi.wrapping_sub(dist));
                assert!(
                    self.buckets.get(home).meta.has_leaf(dist),
                    "occupied bucket is not a leaf of its home"
                );
            }
        }
        assert_eq!(occupied, self.len, "len does not match occupied buckets");
    }
}

impl<K, U, const N: usize, S> Clone for RawHopTable<K, U, N, S>
where
    K: Clone,
    U: Clone,
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            buckets: self.buckets.clone(),
            hasher: self.hasher.clone(),
            len: self.len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::hash::{BuildHasherDefault, Hasher, RandomState};

    type Table<const N: usize> = RawHopTable<u64, u64, N, RandomState>;

    fn table<const N: usize>(capacity: usize) -> Table<N> {
        RawHopTable::with_capacity_and_hasher(capacity, RandomState::new())
    }

    /// Hashes every key to itself. Lets tests aim keys at specific homes.
    #[derive(Default)]
    struct IdentityHasher(u64);

    impl Hasher for IdentityHasher {
        fn finish(&self) -> u64 {
            self.0
        }

        fn write(&mut self, _bytes: &[u8]) {
            unimplemented!("identity hashing is only defined for u64 keys");
        }

        fn write_u64(&mut self, n: u64) {
            self.0 = n;
        }
    }

    /// Hashes every key to zero, defeating the neighborhood entirely.
    #[derive(Default)]
    struct ConstantHasher;

    impl Hasher for ConstantHasher {
        fn finish(&self) -> u64 {
            0
        }

        fn write(&mut self, _bytes: &[u8]) {}

        fn write_u64(&mut self, _n: u64) {}
    }

    #[test]
    fn test_insert_find_remove() {
        let mut t: Table<8> = table(0);
        assert!(t.insert(1, 10));
        assert!(t.insert(2, 20));
        assert!(!t.insert(1, 99), "duplicate insert must not overwrite");

        assert_eq!(t.get(&1), Some(&10));
        assert_eq!(t.get(&2), Some(&20));
        assert_eq!(t.get(&3), None);
        assert_eq!(t.len(), 2);

        assert_eq!(t.remove(&1), Some(10));
        assert_eq!(t.remove(&1), None);
        assert_eq!(t.len(), 1);
        t.check_consistency();
    }

    #[test]
    fn test_zero_inline_starts_empty() {
        let mut t: Table<0> = table(0);
        assert_eq!(t.capacity(), 0);
        assert_eq!(t.get(&1), None);

        assert!(t.insert(1, 10));
        assert!(t.capacity() > 0);
        assert_eq!(t.get(&1), Some(&10));
        t.check_consistency();
    }

    #[test]
    fn test_growth_keeps_entries() {
        let mut t: Table<8> = table(0);
        for i in 0..1000 {
            assert!(t.insert(i, i * 7));
        }
        assert_eq!(t.len(), 1000);
        for i in 0..1000 {
            assert_eq!(t.get(&i), Some(&(i * 7)), "missing key {i}");
        }
        t.check_consistency();
    }

    #[test]
    fn test_consistency_after_every_operation() {
        let mut t: Table<8> = table(0);
        for i in 0..300 {
            t.insert(i, i);
            t.check_consistency();
        }
        for i in (0..300).step_by(3) {
            t.remove(&i);
            t.check_consistency();
        }
        t.clear();
        t.check_consistency();
        assert!(t.is_empty());
    }

    #[test]
    fn test_swap_back_path() {
        // Identity hashing, capacity 64. Keys 0..27 each sit in their own
        // home bucket, so an extra entry homed at bucket 0 finds its first
        // free bucket exactly 27 away and must swap a neighbor backwards to
        // make room inside the neighborhood.
        let mut t: RawHopTable<u64, u64, 0, BuildHasherDefault<IdentityHasher>> =
            RawHopTable::with_capacity_and_hasher(64, BuildHasherDefault::default());

        for i in 0..27 {
            assert!(t.insert(i, i));
        }
        assert!(t.insert(64, 1000));
        assert_eq!(t.capacity(), 64, "swap-back must succeed without growth");
        t.check_consistency();

        for i in 0..27 {
            assert_eq!(t.get(&i), Some(&i));
        }
        assert_eq!(t.get(&64), Some(&1000));

        // Further entries homed at bucket 0 keep displacing neighbors.
        for i in 2..10 {
            assert!(t.insert(i * 64, 1000 + i));
            t.check_consistency();
        }
        for i in 2..10 {
            assert_eq!(t.get(&(i * 64)), Some(&(1000 + i)));
        }
        assert_eq!(t.capacity(), 64);
    }

    #[test]
    fn test_neighborhood_overflow_grows() {
        // 28 keys with the same home cannot share one neighborhood; the 28th
        // insert must grow the table, which spreads the homes apart.
        let mut t: RawHopTable<u64, u64, 0, BuildHasherDefault<IdentityHasher>> =
            RawHopTable::with_capacity_and_hasher(64, BuildHasherDefault::default());
        for i in 0..28 {
            assert!(t.insert(i * 64, i));
        }
        assert!(t.capacity() > 64);
        for i in 0..28 {
            assert_eq!(t.get(&(i * 64)), Some(&i));
        }
        t.check_consistency();
    }

    #[test]
    #[should_panic(expected = "degenerate hash")]
    fn test_degenerate_hash_aborts() {
        let mut t: RawHopTable<u64, u64, 8, BuildHasherDefault<ConstantHasher>> =
            RawHopTable::with_capacity_and_hasher(0, BuildHasherDefault::default());
        // Every key hashes to bucket 0; growth cannot spread them, so the
        // 28th insert exhausts its retries.
        for i in 0..28 {
            t.insert(i, i);
        }
    }

    #[test]
    fn test_iter_visits_each_entry_once() {
        let mut t: Table<8> = table(0);
        for i in 0..50 {
            t.insert(i, i * 2);
        }
        let mut seen: Vec<u64> = t.iter().map(|(k, _)| *k).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..50).collect::<Vec<_>>());

        t.clear();
        assert_eq!(t.iter().count(), 0);
    }

    #[test]
    fn test_iter_mut_updates() {
        let mut t: Table<8> = table(0);
        for i in 0..10 {
            t.insert(i, i);
        }
        for (_, v) in t.iter_mut() {
            *v *= 3;
        }
        for i in 0..10 {
            assert_eq!(t.get(&i), Some(&(i * 3)));
        }
    }

    #[test]
    fn test_retain() {
        let mut t: Table<8> = table(0);
        for i in 0..30 {
            t.insert(i, i);
        }
        t.retain(|k, _| k % 3 == 0);
        assert_eq!(t.len(), 10);
        for i in 0..30 {
            assert_eq!(t.get(&i).is_some(), i % 3 == 0);
        }
        t.check_consistency();
    }

    #[test]
    fn test_clone_is_independent() {
        let mut t: Table<8> = table(0);
        t.insert(1, 10);
        t.insert(2, 20);

        let mut copy = t.clone();
        copy.insert(3, 30);
        t.insert(4, 40);

        assert_eq!(copy.get(&3), Some(&30));
        assert_eq!(copy.get(&4), None);
        assert_eq!(t.get(&3), None);
        assert_eq!(t.get(&4), Some(&40));
        copy.check_consistency();
        t.check_consistency();
    }

    #[test]
    fn test_string_entries_drop_cleanly() {
        let mut t: RawHopTable<String, String, 8, RandomState> =
            RawHopTable::with_capacity_and_hasher(0, RandomState::new());
        t.insert("hello".to_string(), "world".to_string());
        assert_eq!(t.get("hello"), Some(&"world".to_string()));
        assert_eq!(t.remove("hello"), Some("world".to_string()));
        assert!(t.is_empty());
    }
}
