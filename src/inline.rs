//! Quadratic-probing engine with sentinel keys.
//!
//! Slot state lives in the key itself: a user-chosen *empty* key marks a
//! never-occupied slot and an optional *deleted* key marks a tombstone. The
//! value cell is only initialized while the slot is live. Probing steps by
//! 1, 2, 3, ... from the home bucket, which on a power-of-two table visits
//! every bucket within `capacity` probes.

use std::borrow::Borrow;
use std::hash::{BuildHasher, Hash};
use std::mem::MaybeUninit;

use crate::storage::SplitArray;

/// Growth attempts per insert before declaring the table broken.
const GROW_RETRIES: usize = 4;

/// Configuration for the sentinel-keyed engine.
///
/// The empty key is mandatory and must never be inserted or looked up. A
/// deleted key is only needed if entries will be removed.
#[derive(Clone)]
pub struct InlineOptions<K> {
    empty_key: K,
    deleted_key: Option<K>,
    max_load_factor: f64,
}

impl<K> InlineOptions<K> {
    /// Options with the given empty-slot sentinel and a load factor of 0.5.
    pub fn new(empty_key: K) -> Self {
        Self {
            empty_key,
            deleted_key: None,
            max_load_factor: 0.5,
        }
    }

    /// Set the tombstone sentinel, enabling removal.
    pub fn deleted_key(mut self, key: K) -> Self {
        self.deleted_key = Some(key);
        self
    }

    /// Override the maximum load factor.
    ///
    /// # Panics
    /// Panics unless `0.0 < factor <= 1.0`.
    pub fn max_load_factor(mut self, factor: f64) -> Self {
        assert!(
            factor > 0.0 && factor <= 1.0,
            "max load factor must be in (0, 1]"
        );
        self.max_load_factor = factor;
        self
    }
}

/// One slot: the key doubles as the occupancy marker, the value cell is
/// initialized iff the slot is live.
struct Slot<K, U> {
    key: K,
    val: MaybeUninit<U>,
}

enum Place {
    /// The key is already present at this index.
    Found(usize),
    /// A slot was claimed for the key at this index.
    Claimed(usize),
    /// No slot available without growing.
    Full,
}

/// Open-addressed table with quadratic probing, sentinel keys, and `N`
/// inline buckets. Backs both the map and the set façade; sets store
/// `U = ()`.
pub struct RawInlineTable<K, U, const N: usize, S>
where
    K: Eq + Clone,
{
    buckets: SplitArray<Slot<K, U>, N>,
    opts: InlineOptions<K>,
    hasher: S,
    len: usize,
    /// Remaining empty-slot claims before the next growth. Tombstone reuse
    /// does not consume this budget.
    free_slots: usize,
}

impl<K, U, const N: usize, S> RawInlineTable<K, U, N, S>
where
    K: Eq + Clone,
{
    pub(crate) fn with_capacity_and_hasher(
        opts: InlineOptions<K>,
        capacity: usize,
        hasher: S,
    ) -> Self {
        let capacity = Self::compute_capacity(capacity);
        let empty = opts.empty_key.clone();
        let buckets = SplitArray::new_with(capacity, || Slot {
            key: empty.clone(),
            val: MaybeUninit::uninit(),
        });
        let free_slots = Self::free_budget(capacity, opts.max_load_factor);
        Self {
            buckets,
            opts,
            hasher,
            len: 0,
            free_slots,
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

    /// Empty-slot claims a table of this capacity admits before growing:
    /// growth fires when an insert would leave the table strictly above the
    /// load-factor line.
    fn free_budget(capacity: usize, max_load_factor: f64) -> usize {
        if capacity == 0 {
            0
        } else {
            (capacity as f64 * max_load_factor) as usize + 1
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
    fn is_empty_key(&self, key: &K) -> bool {
        *key == self.opts.empty_key
    }

    #[inline]
    fn is_deleted_key(&self, key: &K) -> bool {
        self.opts.deleted_key.as_ref() == Some(key)
    }

    #[inline]
    fn is_live(&self, index: usize) -> bool {
        let key = &self.buckets.get(index).key;
        !self.is_empty_key(key) && !self.is_deleted_key(key)
    }

    /// Smallest live index at or after `from`.
    fn next_live(&self, from: usize) -> Option<usize> {
        (from..self.buckets.capacity()).find(|&i| self.is_live(i))
    }

    /// Key and value at a live index.
    fn entry_at(&self, index: usize) -> (&K, &U) {
        debug_assert!(self.is_live(index));
        let slot = self.buckets.get(index);
        // Safety: live slots always hold an initialized value
        (&slot.key, unsafe { slot.val.assume_init_ref() })
    }

    fn value_at_mut(&mut self, index: usize) -> &mut U {
        debug_assert!(self.is_live(index));
        let slot = self.buckets.get_mut(index);
        // Safety: live slots always hold an initialized value
        unsafe { slot.val.assume_init_mut() }
    }

    /// Tombstone a live slot and take its value out.
    ///
    /// # Panics
    /// Panics if no deleted key was configured.
    pub(crate) fn remove_at(&mut self, index: usize) -> U {
        debug_assert!(self.is_live(index));
        let deleted = self
            .opts
            .deleted_key
            .clone()
            .expect("removal requires InlineOptions::deleted_key");
        let slot = self.buckets.get_mut(index);
        slot.key = deleted;
        // Safety: the slot was live, so the value is initialized; the key is
        // now the tombstone sentinel, so it will not be read or dropped again
        let val = unsafe { slot.val.assume_init_read() };
        self.len -= 1;
        val
    }

    /// Drop every live value and reset all slots to empty. Tombstones are
    /// discarded and the free-slot budget is restored, so no deleted key is
    /// required.
    pub(crate) fn clear(&mut self) {
        let empty = self.opts.empty_key.clone();
        let deleted = self.opts.deleted_key.clone();
        for slot in self.buckets.buckets_mut() {
            let live = slot.key != empty && deleted.as_ref() != Some(&slot.key);
            if live {
                // Safety: live slots always hold an initialized value
                unsafe { slot.val.assume_init_drop() };
            }
            if slot.key != empty {
                slot.key = empty.clone();
            }
        }
        self.len = 0;
        self.free_slots = Self::free_budget(self.buckets.capacity(), self.opts.max_load_factor);
    }

    /// Iterate live entries in index order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&K, &U)> {
        let mut from = 0;
        std::iter::from_fn(move || {
            let index = self.next_live(from)?;
            from = index + 1;
            Some(self.entry_at(index))
        })
    }

    /// Iterate live entries with mutable values.
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut U)> {
        let empty = self.opts.empty_key.clone();
        let deleted = self.opts.deleted_key.clone();
        self.buckets.buckets_mut().filter_map(move |slot| {
            let live = slot.key != empty && deleted.as_ref() != Some(&slot.key);
            if live {
                let Slot { key, val } = slot;
                // Safety: live slots always hold an initialized value
                Some((&*key, unsafe { val.assume_init_mut() }))
            } else {
                None
            }
        })
    }

    /// Keep only the entries the predicate approves. Never rehashes, so
    /// every live entry is visited exactly once.
    ///
    /// # Panics
    /// Panics if an entry is dropped and no deleted key was configured.
    pub(crate) fn retain(&mut self, mut f: impl FnMut(&K, &mut U) -> bool) {
        for index in 0..self.buckets.capacity() {
            if !self.is_live(index) {
                continue;
            }
            let slot = self.buckets.get_mut(index);
            let keep = {
                let Slot { key, val } = slot;
                // Safety: live slots always hold an initialized value
                f(&*key, unsafe { val.assume_init_mut() })
            };
            if !keep {
                self.remove_at(index);
            }
        }
    }
}

impl<K, U, const N: usize, S> RawInlineTable<K, U, N, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    #[inline]
    fn debug_assert_valid_key<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        debug_assert!(
            self.opts.empty_key.borrow() != key,
            "key equals the empty sentinel"
        );
        debug_assert!(
            self.opts.deleted_key.as_ref().map(Borrow::borrow) != Some(key),
            "key equals the deleted sentinel"
        );
    }

    /// Index of the live entry for `key`, if present.
    pub(crate) fn find_index<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.debug_assert_valid_key(key);
        if self.buckets.capacity() == 0 {
            return None;
        }
        let hash = self.hasher.hash_one(key);
        let capacity = self.buckets.capacity();
        let mut index = self.buckets.clamp(hash as usize);
        let mut step = 1;
        loop {
            let slot = self.buckets.get(index);
            if slot.key.borrow() == key {
                return Some(index);
            }
            if self.is_empty_key(&slot.key) {
                return None;
            }
            if step > capacity {
                return None;
            }
            index = self.buckets.clamp(index + step);
            step += 1;
        }
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

    /// Probe for `key`, either finding it or claiming a slot for it. The
    /// first tombstone on the probe chain is preferred over a fresh empty
    /// slot; claiming a tombstone leaves the free-slot budget untouched.
    fn place(&mut self, hash: u64, key: &K) -> Place {
        if self.buckets.capacity() == 0 {
            return Place::Full;
        }
        let capacity = self.buckets.capacity();
        let mut index = self.buckets.clamp(hash as usize);
        let mut step = 1;
        let mut tombstone = None;
        loop {
            let slot = self.buckets.get(index);
            if slot.key == *key {
                return Place::Found(index);
            }
            if self.is_empty_key(&slot.key) {
                if let Some(reuse) = tombstone {
                    return Place::Claimed(reuse);
                }
                if self.free_slots > 0 {
                    self.free_slots -= 1;
                    return Place::Claimed(index);
                }
                return Place::Full;
            }
            if tombstone.is_none() && self.is_deleted_key(&slot.key) {
                tombstone = Some(index);
            }
            if step > capacity {
                return Place::Full;
            }
            index = self.buckets.clamp(index + step);
            step += 1;
        }
    }

    /// Insert the entry if the key is absent. Returns `true` on insertion;
    /// `false` leaves the existing entry unchanged.
    pub(crate) fn insert(&mut self, key: K, value: U) -> bool {
        self.debug_assert_valid_key(&key);
        let hash = self.hasher.hash_one(&key);
        for _ in 0..GROW_RETRIES {
            match self.place(hash, &key) {
                Place::Found(_) => return false,
                Place::Claimed(index) => {
                    let slot = self.buckets.get_mut(index);
                    slot.key = key;
                    slot.val.write(value);
                    self.len += 1;
                    return true;
                }
                Place::Full => self.grow(),
            }
        }
        panic!("insert failed after {GROW_RETRIES} growth attempts");
    }

    /// Remove the entry for `key`, returning its value.
    ///
    /// # Panics
    /// Panics if an entry is found and no deleted key was configured.
    pub(crate) fn remove<Q>(&mut self, key: &Q) -> Option<U>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.find_index(key)?;
        Some(self.remove_at(index))
    }

    fn grow(&mut self) {
        let needed = ((self.len + 1) as f64 / self.opts.max_load_factor).ceil() as usize;
        self.rehash(Self::compute_capacity(needed));
    }

    /// Move every live entry into a fresh array of `new_capacity` buckets.
    /// Tombstones are dropped on the floor and the free-slot budget is
    /// recomputed.
    fn rehash(&mut self, new_capacity: usize) {
        let empty = self.opts.empty_key.clone();
        let deleted = self.opts.deleted_key.clone();
        let fresh = SplitArray::new_with(new_capacity, || Slot {
            key: empty.clone(),
            val: MaybeUninit::uninit(),
        });
        let old = std::mem::replace(&mut self.buckets, fresh);

        for slot in old {
            let live = slot.key != empty && deleted.as_ref() != Some(&slot.key);
            if !live {
                continue;
            }
            // Safety: live slots always hold an initialized value; the old
            // array is consumed, so nothing reads or drops it again
            let val = unsafe { slot.val.assume_init_read() };
            let key = slot.key;

            let hash = self.hasher.hash_one(&key);
            let mut index = self.buckets.clamp(hash as usize);
            let mut step = 1;
            loop {
                let dst = self.buckets.get_mut(index);
                if dst.key == empty {
                    dst.key = key;
                    dst.val.write(val);
                    break;
                }
                if dst.key == key {
                    panic!("duplicate key encountered during rehash");
                }
                if step > new_capacity {
                    panic!("no empty slot found during rehash");
                }
                index = self.buckets.clamp(index + step);
                step += 1;
            }
        }
        self.free_slots =
            Self::free_budget(new_capacity, self.opts.max_load_factor) - self.len;
    }
}

impl<K, U, const N: usize, S> Drop for RawInlineTable<K, U, N, S>
where
    K: Eq + Clone,
{
    fn drop(&mut self) {
        for index in 0..self.buckets.capacity() {
            if self.is_live(index) {
                // Safety: live slots always hold an initialized value
                unsafe { self.buckets.get_mut(index).val.assume_init_drop() };
            }
        }
    }
}

impl<K, U, const N: usize, S> Clone for RawInlineTable<K, U, N, S>
where
    K: Eq + Clone,
    U: Clone,
    S: Clone,
{
    fn clone(&self) -> Self {
        let empty = self.opts.empty_key.clone();
        let mut buckets = SplitArray::new_with(self.buckets.capacity(), || Slot {
            key: empty.clone(),
            val: MaybeUninit::uninit(),
        });
        for index in 0..self.buckets.capacity() {
            let src = self.buckets.get(index);
            let live = self.is_live(index);
            let dst = buckets.get_mut(index);
            dst.key = src.key.clone();
            if live {
                // Safety: live slots always hold an initialized value
                dst.val.write(unsafe { src.val.assume_init_ref() }.clone());
            }
        }
        Self {
            buckets,
            opts: self.opts.clone(),
            hasher: self.hasher.clone(),
            len: self.len,
            free_slots: self.free_slots,
        }
    }
}
