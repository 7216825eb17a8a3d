#![doc = include_str!("../README.md")]

#![no_std]

#![warn(
    anonymous_parameters,
    missing_copy_implementations,
    missing_debug_implementations,
    nonstandard_style,
    rust_2018_idioms,
    single_use_lifetimes,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_extern_crates,
    unused_qualifications,
    variant_size_differences
)]

extern crate alloc;

mod error;
mod iter;

pub use error::{Collision, InsertError};
pub use iter::{IntoIter, Iter, Keys, Values};

use core::{fmt, mem};
use core::borrow::Borrow;
use core::hash::{Hash, BuildHasher};
use core::iter::FromIterator;

use alloc::vec::Vec;

use hashbrown::{HashTable, DefaultHashBuilder};

/// Handle to one entry of a `BiHashMap`.
///
/// Lookups by key and by value return the same `Position` for the same entry,
/// so positions can be compared across directions. A position goes stale once
/// its entry is removed and never resolves again, even if the slot behind it
/// is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    index: usize,
    generation: u32,
}

/// A stored pair with the hashes both tables were built from.
#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    key_hash: u64,
    value_hash: u64,
}

/// One cell of the slot store.
///
/// `entry` is `None` for a vacant slot waiting on the free list.
#[derive(Debug)]
struct Slot<K, V> {
    entry: Option<Entry<K, V>>,
    generation: u32,

    // doubly linked list of live entries (indexes into slots)
    prev: Option<usize>,
    next: Option<usize>,
}

impl<K, V> Slot<K, V> {
    #[inline(always)]
    const fn new(entry: Entry<K, V>, generation: u32) -> Self {
        Self { entry: Some(entry), generation, prev: None, next: None }
    }

    #[inline(always)]
    fn key_hash(&self) -> u64 {
        self.entry.as_ref().map_or(0, |e| e.key_hash)
    }

    #[inline(always)]
    fn value_hash(&self) -> u64 {
        self.entry.as_ref().map_or(0, |e| e.value_hash)
    }
}

/// A hash map in which keys are unique and values are unique, with
/// O(1) expected lookup from either side.
///
/// Each pair lives once in a slot store. `forward` indexes the store by key,
/// `reverse` by value, and both are updated together by every mutation.
///
/// The map is not synchronized. Callers sharing it between threads must
/// provide their own locking.
pub struct BiHashMap<K, V, S = DefaultHashBuilder> {
    forward: HashTable<usize>, // key -> index in slots
    reverse: HashTable<usize>, // value -> index in slots
    slots: Vec<Slot<K, V>>,
    free: Vec<usize>, // vacant slots, reused before the store grows

    // doubly linked list of live entries, defines iteration order
    head: Option<usize>,
    tail: Option<usize>,

    len: usize,
    // generation given to freshly pushed slots, raised by compaction
    epoch: u32,
    hasher: S,
}

impl<K, V> BiHashMap<K, V, DefaultHashBuilder> {
    /// Creates an empty `BiHashMap`.
    ///
    /// The map is initially created with a capacity of 0, so it will not
    /// allocate until it is first inserted into.
    #[inline]
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder::default())
    }

    /// Creates an empty `BiHashMap` able to hold at least `n` pairs without
    /// reallocating.
    #[inline]
    pub fn with_capacity(n: usize) -> Self {
        Self::with_capacity_and_hasher(n, DefaultHashBuilder::default())
    }
}

impl<K, V, S> BiHashMap<K, V, S> {
    /// Creates an empty `BiHashMap` using the provided hasher `h` for both
    /// keys and values.
    #[inline]
    pub fn with_hasher(h: S) -> Self {
        Self::with_capacity_and_hasher(0, h)
    }

    /// Creates an empty `BiHashMap` with the specified initial capacity `n`
    /// and hasher `h`.
    #[inline]
    pub fn with_capacity_and_hasher(n: usize, h: S) -> Self {
        Self {
            forward: HashTable::with_capacity(n),
            reverse: HashTable::with_capacity(n),
            slots: Vec::with_capacity(n),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
            epoch: 0,
            hasher: h,
        }
    }

    #[inline]
    pub const fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Returns the number of pairs in the map.
    #[inline(always)]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the map holds no pairs.
    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of pairs the map can hold without growing either index.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.forward.capacity().min(self.reverse.capacity())
    }

    /// Returns the pair a position refers to, or `None` if it is stale.
    #[cfg_attr(feature = "inline-more", inline)]
    pub fn get(&self, pos: Position) -> Option<(&K, &V)> {
        let idx = self.resolve(pos)?;
        self.slots[idx].entry.as_ref().map(|e| (&e.key, &e.value))
    }

    /// Position of the first pair in iteration order.
    #[inline]
    pub fn first(&self) -> Option<Position> {
        self.head.map(|idx| self.position_of(idx))
    }

    /// Position of the pair that follows `pos` in iteration order.
    ///
    /// `None` at the end of the map or when `pos` is stale.
    #[inline]
    pub fn next_position(&self, pos: Position) -> Option<Position> {
        let idx = self.resolve(pos)?;
        self.slots[idx].next.map(|next| self.position_of(next))
    }

    /// Returns an iterator over the pairs.
    ///
    /// The order is unspecified but stays the same as long as the map is not
    /// mutated. The iterator implements `ExactSizeIterator` and
    /// `FusedIterator`.
    #[inline]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: &self.slots,
            curr: self.head,
            remaining: self.len,
        }
    }

    /// Returns an iterator over the keys, in the order of [`iter`](Self::iter).
    #[inline]
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over the values, in the order of [`iter`](Self::iter).
    #[inline]
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Removes every pair, keeping the allocated storage.
    ///
    /// Positions taken before the call never resolve afterwards.
    ///
    /// # Examples
    ///
    /// ```
    /// use bihash_map::BiHashMap;
    ///
    /// let mut map = BiHashMap::new();
    /// let (pos, _) = map.insert('x', 24);
    /// map.clear();
    /// assert!(map.is_empty());
    /// assert_eq!(map.get(pos), None);
    /// ```
    pub fn clear(&mut self) {
        self.forward.clear();
        self.reverse.clear();
        self.free.clear();

        for (idx, slot) in self.slots.iter_mut().enumerate().rev() {
            if slot.entry.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
            slot.prev = None;
            slot.next = None;
            self.free.push(idx);
        }

        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    #[inline(always)]
    fn position_of(&self, idx: usize) -> Position {
        Position { index: idx, generation: self.slots[idx].generation }
    }

    /// Maps a position back to its slot if the entry it named is still there.
    #[inline]
    fn resolve(&self, pos: Position) -> Option<usize> {
        let slot = self.slots.get(pos.index)?;
        if slot.generation == pos.generation && slot.entry.is_some() {
            Some(pos.index)
        } else {
            None
        }
    }

    #[inline(always)]
    fn key_at(&self, idx: usize) -> Option<&K> {
        self.slots[idx].entry.as_ref().map(|e| &e.key)
    }

    #[inline(always)]
    fn value_at(&self, idx: usize) -> Option<&V> {
        self.slots[idx].entry.as_ref().map(|e| &e.value)
    }

    /// Removes an entry from the internal linked list
    fn unlink(&mut self, idx: usize) {
        let slot = &mut self.slots[idx];

        let prev = slot.prev.take();
        let next = slot.next.take();

        if let Some(prev_idx) = prev {
            self.slots[prev_idx].next = next
        } else {
            // this was the head
            self.head = next
        }

        if let Some(next_idx) = next {
            self.slots[next_idx].prev = prev
        } else {
            // this was the tail
            self.tail = prev
        }
    }

    /// Adds an entry to the end of the internal linked list.
    fn link_tail(&mut self, idx: usize) {
        let slot = &mut self.slots[idx];
        slot.prev = self.tail;
        slot.next = None;

        if let Some(tail_idx) = self.tail {
            self.slots[tail_idx].next = Some(idx)
        } else {
            self.head = Some(idx)
        }

        self.tail = Some(idx)
    }

    /// Takes the entry out of slot `idx`, drops it from both indices and the
    /// live list, and frees the slot.
    ///
    /// Returns the entry and the slot that followed it.
    fn remove_at(&mut self, idx: usize) -> Option<(Entry<K, V>, Option<usize>)> {
        let entry = self.slots[idx].entry.take()?;
        let next = self.slots[idx].next;

        if let Ok(found) = self.forward.find_entry(entry.key_hash, |&i| i == idx) {
            found.remove();
        }
        if let Ok(found) = self.reverse.find_entry(entry.value_hash, |&i| i == idx) {
            found.remove();
        }

        self.unlink(idx);

        let slot = &mut self.slots[idx];
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(idx);
        self.len -= 1;

        Some((entry, next))
    }
}

impl<K, V, S> BiHashMap<K, V, S>
where
    K: Eq + Hash,
    V: Eq + Hash,
    S: BuildHasher,
{
    /// Inserts a pair unless its key or its value is already present.
    ///
    /// Returns the position of the new entry and `true` on success. On
    /// failure the pair is dropped, the map is left as it was, and the
    /// returned position names the blocking entry: the one holding `key` if
    /// there is one, otherwise the one holding `value`.
    ///
    /// # Examples
    ///
    /// ```
    /// use bihash_map::BiHashMap;
    ///
    /// let mut map = BiHashMap::new();
    /// let (a, inserted) = map.insert(1, "a");
    /// assert!(inserted);
    ///
    /// // value taken: reports the entry holding "a"
    /// assert_eq!(map.insert(3, "a"), (a, false));
    /// // key taken
    /// assert_eq!(map.insert(1, "c"), (a, false));
    /// assert_eq!(map.len(), 1);
    /// ```
    #[cfg_attr(feature = "inline-more", inline)]
    pub fn insert(&mut self, key: K, value: V) -> (Position, bool) {
        match self.try_insert(key, value) {
            Ok(pos) => (pos, true),
            Err(err) => (err.position(), false),
        }
    }

    /// Inserts a pair, or gives it back inside an [`InsertError`] describing
    /// which side collided.
    ///
    /// # Examples
    ///
    /// ```
    /// use bihash_map::{BiHashMap, Collision};
    ///
    /// let mut map = BiHashMap::new();
    /// map.insert(1, 'a');
    /// map.insert(2, 'b');
    ///
    /// let err = map.try_insert(1, 'b').unwrap_err();
    /// assert_eq!(err.collision(), Collision::Both);
    /// assert_eq!(err.position(), map.find_by_key(&1).unwrap());
    /// assert_eq!(err.into_pair(), (1, 'b'));
    /// ```
    pub fn try_insert(&mut self, key: K, value: V) -> Result<Position, InsertError<K, V>> {
        let key_hash = self.hasher.hash_one(&key);
        let value_hash = self.hasher.hash_one(&value);

        let by_key = self
            .forward
            .find(key_hash, |&i| self.key_at(i) == Some(&key))
            .copied();
        let by_value = self
            .reverse
            .find(value_hash, |&i| self.value_at(i) == Some(&value))
            .copied();

        let (idx, collision) = match (by_key, by_value) {
            (None, None) => return Ok(self.store(Entry { key, value, key_hash, value_hash })),
            (Some(k), None) => (k, Collision::Key),
            (None, Some(v)) => (v, Collision::Value),
            (Some(k), Some(_)) => (k, Collision::Both),
        };

        Err(InsertError {
            key,
            value,
            position: self.position_of(idx),
            collision,
        })
    }

    /// Puts a new entry in a slot and registers it in both indices.
    fn store(&mut self, entry: Entry<K, V>) -> Position {
        let (key_hash, value_hash) = (entry.key_hash, entry.value_hash);

        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx].entry = Some(entry);
                idx
            }
            None => {
                self.slots.push(Slot::new(entry, self.epoch));
                self.slots.len() - 1
            }
        };

        let slots = &self.slots;
        self.forward.insert_unique(key_hash, idx, |&i| slots[i].key_hash());
        self.reverse.insert_unique(value_hash, idx, |&i| slots[i].value_hash());

        self.link_tail(idx);
        self.len += 1;

        self.position_of(idx)
    }

    #[inline]
    fn locate_key<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.is_empty() {
            return None
        }
        let hash = self.hasher.hash_one(key);
        self.forward
            .find(hash, |&i| self.key_at(i).is_some_and(|k| k.borrow() == key))
            .copied()
    }

    #[inline]
    fn locate_value<Q>(&self, value: &Q) -> Option<usize>
    where
        V: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.is_empty() {
            return None
        }
        let hash = self.hasher.hash_one(value);
        self.reverse
            .find(hash, |&i| self.value_at(i).is_some_and(|v| v.borrow() == value))
            .copied()
    }

    /// Returns the position of the entry holding `key`.
    #[cfg_attr(feature = "inline-more", inline)]
    pub fn find_by_key<Q>(&self, key: &Q) -> Option<Position>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.locate_key(key).map(|idx| self.position_of(idx))
    }

    /// Returns the position of the entry holding `value`.
    ///
    /// This is the same position [`find_by_key`](Self::find_by_key) gives for
    /// that entry's key.
    #[cfg_attr(feature = "inline-more", inline)]
    pub fn find_by_value<Q>(&self, value: &Q) -> Option<Position>
    where
        V: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.locate_value(value).map(|idx| self.position_of(idx))
    }

    /// Returns the value bound to `key`.
    #[cfg_attr(feature = "inline-more", inline)]
    pub fn get_by_key<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.locate_key(key).and_then(|idx| self.value_at(idx))
    }

    /// Returns the key bound to `value`.
    #[cfg_attr(feature = "inline-more", inline)]
    pub fn get_by_value<Q>(&self, value: &Q) -> Option<&K>
    where
        V: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.locate_value(value).and_then(|idx| self.key_at(idx))
    }

    #[inline]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.locate_key(key).is_some()
    }

    #[inline]
    pub fn contains_value<Q>(&self, value: &Q) -> bool
    where
        V: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.locate_value(value).is_some()
    }

    /// Removes the pair holding `key`.
    ///
    /// Returns the position of the pair that followed it in iteration order,
    /// or `None` if it was the last one or `key` was absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use bihash_map::BiHashMap;
    ///
    /// let mut map = BiHashMap::new();
    /// map.insert(1, "a");
    /// let (b, _) = map.insert(2, "b");
    ///
    /// assert_eq!(map.erase_by_key(&1), Some(b));
    /// assert_eq!(map.find_by_value("a"), None);
    /// assert_eq!(map.erase_by_key(&1), None);
    /// assert_eq!(map.len(), 1);
    /// ```
    #[cfg_attr(feature = "inline-more", inline)]
    pub fn erase_by_key<Q>(&mut self, key: &Q) -> Option<Position>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.locate_key(key)?;
        self.erase_at(idx)
    }

    /// Removes the pair holding `value`, see
    /// [`erase_by_key`](Self::erase_by_key).
    #[cfg_attr(feature = "inline-more", inline)]
    pub fn erase_by_value<Q>(&mut self, value: &Q) -> Option<Position>
    where
        V: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.locate_value(value)?;
        self.erase_at(idx)
    }

    /// Removes the pair at `pos` and returns the position that followed it.
    ///
    /// A stale position is a no-op returning `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use bihash_map::BiHashMap;
    ///
    /// let mut map: BiHashMap<_, _> = (0..4).map(|i| (i, i * 10)).collect();
    ///
    /// // erase every pair by walking positions
    /// let mut pos = map.first();
    /// while let Some(p) = pos {
    ///     pos = map.erase(p);
    /// }
    /// assert!(map.is_empty());
    /// ```
    #[cfg_attr(feature = "inline-more", inline)]
    pub fn erase(&mut self, pos: Position) -> Option<Position> {
        let idx = self.resolve(pos)?;
        self.erase_at(idx)
    }

    /// Removes the pair holding `key` and returns it.
    #[cfg_attr(feature = "inline-more", inline)]
    pub fn remove_by_key<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.locate_key(key)?;
        self.remove_at(idx).map(|(e, _)| (e.key, e.value))
    }

    /// Removes the pair holding `value` and returns it.
    #[cfg_attr(feature = "inline-more", inline)]
    pub fn remove_by_value<Q>(&mut self, value: &Q) -> Option<(K, V)>
    where
        V: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.locate_value(value)?;
        self.remove_at(idx).map(|(e, _)| (e.key, e.value))
    }

    #[inline]
    fn erase_at(&mut self, idx: usize) -> Option<Position> {
        let (_, next) = self.remove_at(idx)?;
        next.map(|next| self.position_of(next))
    }

    /// Reserves capacity for at least `additional` more pairs.
    ///
    /// # Examples
    ///
    /// ```
    /// use bihash_map::BiHashMap;
    ///
    /// let mut map = BiHashMap::<i32, i32>::new();
    /// map.reserve(100);
    /// assert!(map.capacity() >= 100);
    /// ```
    pub fn reserve(&mut self, additional: usize) {
        let slots = &self.slots;
        self.forward.reserve(additional, |&i| slots[i].key_hash());
        self.reverse.reserve(additional, |&i| slots[i].value_hash());
        self.slots.reserve(additional.saturating_sub(self.free.len()));
    }

    /// Compacts the slot store so it holds only live pairs, then shrinks
    /// every allocation as much as possible.
    ///
    /// Iteration order is preserved. If any slot was vacant, every position
    /// taken before the call is invalidated, including positions of pairs
    /// still in the map.
    pub fn shrink_to_fit(&mut self) {
        if self.free.is_empty() {
            let slots = &self.slots;
            self.forward.shrink_to_fit(|&i| slots[i].key_hash());
            self.reverse.shrink_to_fit(|&i| slots[i].value_hash());
            self.slots.shrink_to_fit();
            self.free.shrink_to_fit();
            return
        }

        // newer than anything an outstanding position can carry
        let max_generation = self.slots.iter().map(|s| s.generation).max().unwrap_or(self.epoch);
        self.epoch = max_generation.max(self.epoch).wrapping_add(1);

        let old_head = self.head;
        let mut old_slots = mem::take(&mut self.slots);

        self.forward.clear();
        self.reverse.clear();
        self.free = Vec::new();
        self.head = None;
        self.tail = None;
        self.slots = Vec::with_capacity(self.len);

        let mut curr = old_head;
        while let Some(old_idx) = curr {
            let old_slot = &mut old_slots[old_idx];
            curr = old_slot.next;

            let Some(entry) = old_slot.entry.take() else {
                continue
            };

            let new_idx = self.slots.len();
            self.slots.push(Slot::new(entry, self.epoch));
            self.link_tail(new_idx);
        }

        let slots = &self.slots;
        for (idx, slot) in slots.iter().enumerate() {
            self.forward.insert_unique(slot.key_hash(), idx, |&i| slots[i].key_hash());
            self.reverse.insert_unique(slot.value_hash(), idx, |&i| slots[i].value_hash());
        }
        self.forward.shrink_to_fit(|&i| slots[i].key_hash());
        self.reverse.shrink_to_fit(|&i| slots[i].value_hash());
    }
}

impl<'a, K, V, S> IntoIterator for &'a BiHashMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, S> IntoIterator for BiHashMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            slots: self.slots,
            curr: self.head,
            remaining: self.len,
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for BiHashMap<K, V, S>
where
    K: Eq + Hash,
    V: Eq + Hash,
    S: Default + BuildHasher,
{
    /// Builds a map from pairs in order; a pair colliding with an earlier one
    /// is skipped.
    #[cfg_attr(feature = "inline-more", inline)]
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let iter = iter.into_iter();
        let mut map = BiHashMap::with_capacity_and_hasher(
            iter.size_hint().0,
            S::default()
        );
        iter.for_each(|(k, v)| _ = map.insert(k, v));
        map
    }
}

impl<K, V, S> Extend<(K, V)> for BiHashMap<K, V, S>
where
    K: Eq + Hash,
    V: Eq + Hash,
    S: BuildHasher,
{
    #[cfg_attr(feature = "inline-more", inline)]
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        let iter = iter.into_iter();
        let reserve = if self.is_empty() {
            iter.size_hint().0
        } else {
            (iter.size_hint().0 + 1) / 2
        };
        self.reserve(reserve);
        iter.for_each(move |(k, v)| _ = self.insert(k, v));
    }
}

impl<K, V, S> Default for BiHashMap<K, V, S>
where
    S: Default,
{
    #[inline]
    fn default() -> Self {
        Self::with_capacity_and_hasher(0, S::default())
    }
}

/// Builds an independent map by re-inserting every pair in iteration order.
impl<K, V, S> Clone for BiHashMap<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Eq + Hash + Clone,
    S: BuildHasher + Clone,
{
    fn clone(&self) -> Self {
        let mut map = Self::with_capacity_and_hasher(self.len, self.hasher.clone());
        self.iter().for_each(|(k, v)| _ = map.insert(k.clone(), v.clone()));
        map
    }
}

/// Two maps are equal when they hold the same pairs, in any order.
impl<K, V, S> PartialEq for BiHashMap<K, V, S>
where
    K: Eq + Hash,
    V: Eq + Hash,
    S: BuildHasher,
{
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|(k, v)| other.get_by_key(k) == Some(v))
    }
}

impl<K, V, S> Eq for BiHashMap<K, V, S>
where
    K: Eq + Hash,
    V: Eq + Hash,
    S: BuildHasher,
{
}

impl<K, V, S> fmt::Debug for BiHashMap<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    use alloc::vec;
    use alloc::string::String;

    /// Checks both indices, the slot store and the live list against each other.
    fn assert_consistent<K, V, S>(map: &BiHashMap<K, V, S>)
    where
        K: Eq + Hash + fmt::Debug,
        V: Eq + Hash + fmt::Debug,
        S: BuildHasher,
    {
        let live = map.slots.iter().filter(|s| s.entry.is_some()).count();
        assert_eq!(map.len(), live);
        assert_eq!(map.len(), map.iter().count());
        assert_eq!(map.forward.len(), map.len());
        assert_eq!(map.reverse.len(), map.len());
        assert_eq!(map.free.len() + live, map.slots.len());

        for (k, v) in map.iter() {
            let pos = map.find_by_key(k).unwrap();
            assert_eq!(map.find_by_value(v), Some(pos));
            assert_eq!(map.get(pos), Some((k, v)));
            assert_eq!(map.get_by_key(k), Some(v));
            assert_eq!(map.get_by_value(v), Some(k));
        }
    }

    #[test]
    fn test_new_and_default_and_with_capacity() {
        let a: BiHashMap<u64, u64> = BiHashMap::new();
        assert!(a.is_empty());
        let b: BiHashMap<u64, u64> = BiHashMap::default();
        assert!(b.is_empty());
        let c: BiHashMap<u64, u64> = BiHashMap::with_capacity(10);
        assert!(c.is_empty());
        assert!(c.capacity() >= 10);
        assert!(c.slots.capacity() >= 10);
        assert_eq!(c.first(), None);
    }

    #[test]
    fn test_insert_find_erase_scenario() {
        let mut m = BiHashMap::new();
        let (one, inserted) = m.insert(1, "a");
        assert!(inserted);
        assert!(m.insert(2, "b").1);

        // key 1 is bound to "a"
        assert_eq!(m.insert(1, "c"), (one, false));
        assert_eq!(m.len(), 2);

        // value "a" is bound to key 1
        assert_eq!(m.insert(3, "a"), (one, false));
        assert_eq!(m.len(), 2);
        assert_eq!(m.get_by_key(&3), None);

        m.erase_by_key(&1);
        assert_eq!(m.find_by_value(&"a"), None);
        assert_eq!(m.find_by_key(&1), None);
        assert_eq!(m.len(), 1);
        assert_consistent(&m);
    }

    #[test]
    fn test_exact_duplicate_is_rejected() {
        let mut m = BiHashMap::new();
        let (pos, _) = m.insert(7, 70);
        assert_eq!(m.insert(7, 70), (pos, false));
        assert_eq!(m.len(), 1);
        assert_eq!(m.try_insert(7, 70).unwrap_err().collision(), Collision::Both);
    }

    #[test]
    fn test_dual_collision_reports_key_entry() {
        let mut m = BiHashMap::new();
        let (k_owner, _) = m.insert(1, 'a');
        let (v_owner, _) = m.insert(2, 'b');
        assert_ne!(k_owner, v_owner);

        // key 1 belongs to one entry, value 'b' to another
        assert_eq!(m.insert(1, 'b'), (k_owner, false));

        let err = m.try_insert(1, 'b').unwrap_err();
        assert_eq!(err.collision(), Collision::Both);
        assert_eq!(err.position(), k_owner);
        assert_eq!(err.key(), &1);
        assert_eq!(err.value(), &'b');

        let err = m.try_insert(9, 'b').unwrap_err();
        assert_eq!(err.collision(), Collision::Value);
        assert_eq!(err.position(), v_owner);
        assert_eq!(err.into_pair(), (9, 'b'));

        let err = m.try_insert(2, 'z').unwrap_err();
        assert_eq!(err.collision(), Collision::Key);
        assert_eq!(err.position(), v_owner);

        assert_eq!(m.len(), 2);
        assert_consistent(&m);
    }

    #[test]
    fn test_insert_error_display() {
        let mut m = BiHashMap::new();
        m.insert(1, 'a');
        let err = m.try_insert(1, 'q').unwrap_err();
        assert_eq!(format!("{err}"), "key already present in the map");
        let err = m.try_insert(5, 'a').unwrap_err();
        assert_eq!(format!("{err}"), "value already present in the map");
        let err = m.try_insert(1, 'a').unwrap_err();
        assert_eq!(format!("{err}"), "key and value already present in the map");
        assert!(format!("{err:?}").contains("Both"));
    }

    #[test]
    fn test_find_is_symmetric() {
        let mut m = BiHashMap::new();
        for i in 0..50u32 {
            m.insert(i, format!("v{i}"));
        }
        for i in 0..50u32 {
            let by_key = m.find_by_key(&i);
            assert!(by_key.is_some());
            assert_eq!(by_key, m.find_by_value(format!("v{i}").as_str()));
        }
        assert_eq!(m.find_by_value("v50"), None);
    }

    #[test]
    fn test_erase_by_value_and_position() {
        let mut m = BiHashMap::new();
        m.insert("x", 1);
        let (y, _) = m.insert("y", 2);
        let (z, _) = m.insert("z", 3);

        assert_eq!(m.erase_by_value(&1), Some(y));
        assert_eq!(m.get_by_key("x"), None);
        assert_eq!(m.erase_by_value(&1), None);

        assert_eq!(m.erase(z), None); // last one
        assert_eq!(m.erase(z), None); // stale
        assert_eq!(m.len(), 1);
        assert_eq!(m.get(y), Some((&"y", &2)));
        assert_consistent(&m);
    }

    #[test]
    fn test_remove_returns_pair() {
        let mut m = BiHashMap::new();
        m.insert(String::from("one"), 1);
        m.insert(String::from("two"), 2);

        assert_eq!(m.remove_by_key("one"), Some((String::from("one"), 1)));
        assert_eq!(m.remove_by_key("one"), None);
        assert_eq!(m.remove_by_value(&2), Some((String::from("two"), 2)));
        assert!(m.is_empty());
        assert_consistent(&m);
    }

    #[test]
    fn test_stale_position_after_slot_reuse() {
        let mut m = BiHashMap::new();
        let (old, _) = m.insert(1, 10);
        m.erase(old);
        assert_eq!(m.get(old), None);

        let (new, _) = m.insert(2, 20);
        assert_eq!(new.index, old.index); // slot was recycled
        assert_ne!(new, old);
        assert_eq!(m.get(old), None);
        assert_eq!(m.erase(old), None);
        assert_eq!(m.get(new), Some((&2, &20)));
        assert_eq!(m.slots.len(), 1);
    }

    #[test]
    fn test_positional_walk_matches_iter() {
        let m: BiHashMap<_, _> = (0..10).map(|i| (i, -i)).collect();
        let mut walked = Vec::new();
        let mut pos = m.first();
        while let Some(p) = pos {
            walked.push(m.get(p).unwrap());
            pos = m.next_position(p);
        }
        assert_eq!(walked, m.iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_iter_exact_size_and_fused() {
        let mut m = BiHashMap::new();
        m.insert(1, "a");
        m.insert(2, "b");
        m.insert(3, "c");
        m.erase_by_key(&2);
        let mut it = m.iter();
        assert_eq!(it.len(), 2);
        assert!(it.next().is_some());
        assert_eq!(it.len(), 1);
        assert!(it.next().is_some());
        assert_eq!(it.len(), 0);
        assert_eq!(it.next(), None);
        // fused: subsequent next() continue returning None
        assert_eq!(it.next(), None);
    }

    #[test]
    fn test_iter_is_restartable() {
        let m: BiHashMap<_, _> = [(1, 'a'), (2, 'b'), (3, 'c')].into_iter().collect();
        let first: Vec<_> = m.iter().collect();
        let second: Vec<_> = m.iter().collect();
        assert_eq!(first, second);

        let mut keys: Vec<_> = m.keys().copied().collect();
        keys.sort();
        assert_eq!(keys, vec![1, 2, 3]);
        let mut values: Vec<_> = m.values().copied().collect();
        values.sort();
        assert_eq!(values, vec!['a', 'b', 'c']);
    }

    #[test]
    fn test_into_iter_yields_all_pairs() {
        let mut m = BiHashMap::new();
        for i in 0..6 {
            m.insert(i, i + 100);
        }
        m.erase_by_key(&3);
        let mut pairs: Vec<_> = m.into_iter().collect();
        pairs.sort();
        assert_eq!(pairs, vec![(0, 100), (1, 101), (2, 102), (4, 104), (5, 105)]);
    }

    #[test]
    fn test_clear_resets_and_invalidates() {
        let mut m = BiHashMap::new();
        let (p, _) = m.insert(1, 1);
        m.insert(2, 2);
        m.clear();
        assert!(m.is_empty());
        assert_eq!(m.iter().count(), 0);
        assert_eq!(m.get(p), None);
        assert_eq!(m.find_by_key(&1), None);
        assert_eq!(m.find_by_value(&2), None);

        // pairs are insertable again
        assert!(m.insert(1, 1).1);
        assert!(m.insert(2, 2).1);
        assert_eq!(m.get(p), None);
        assert_consistent(&m);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut a = BiHashMap::new();
        a.insert(1u8, 10u8);
        a.insert(2, 20);
        let mut b = a.clone();
        assert_eq!(a, b);

        b.erase_by_key(&1);
        b.insert(3, 30);
        assert_ne!(a, b);
        assert_eq!(a.len(), 2);
        assert_eq!(a.get_by_key(&1), Some(&10));
        assert_eq!(a.get_by_value(&30), None);
        assert_consistent(&a);
        assert_consistent(&b);
    }

    #[test]
    fn test_clone_of_fragmented_map_is_compact() {
        let mut a = BiHashMap::new();
        for i in 0..8 {
            a.insert(i, i * 2);
        }
        a.erase_by_key(&1);
        a.erase_by_key(&4);
        let b = a.clone();
        assert_eq!(b.slots.len(), 6);
        assert!(b.free.is_empty());
        assert_eq!(a, b);
    }

    #[test]
    fn test_eq_ignores_order() {
        let a: BiHashMap<_, _> = [(1, 'a'), (2, 'b')].into_iter().collect();
        let b: BiHashMap<_, _> = [(2, 'b'), (1, 'a')].into_iter().collect();
        assert_eq!(a, b);

        let c: BiHashMap<_, _> = [(1, 'b'), (2, 'a')].into_iter().collect();
        assert_ne!(a, c);
    }

    #[test]
    fn test_from_iterator_and_extend_skip_collisions() {
        let map: BiHashMap<_, _> = vec![(1u32, "a"), (2, "b"), (1, "c"), (3, "a")]
            .into_iter()
            .collect();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get_by_key(&1), Some(&"a"));

        let mut m2 = BiHashMap::new();
        m2.extend(vec![(5, 'x'), (6, 'y')]);
        m2.extend(vec![(6, 'z'), (7, 'x'), (8, 'w')]);
        assert_eq!(m2.len(), 3);
        assert_eq!(m2.get_by_value(&'w'), Some(&8));
        assert_consistent(&m2);
    }

    #[test]
    fn test_debug_contains_pairs() {
        let mut a = BiHashMap::new();
        a.insert(5, "five");
        a.insert(6, "six");
        let s = format!("{:?}", a);
        assert!(s.contains("5"));
        assert!(s.contains("six"));
    }

    #[test]
    fn test_reserve_affects_capacity() {
        let mut m: BiHashMap<u64, u64> = BiHashMap::new();
        m.reserve(100);
        assert!(m.forward.capacity() >= 100);
        assert!(m.reverse.capacity() >= 100);
        assert!(m.slots.capacity() >= 100);
        assert_eq!(m.len(), 0);
    }

    #[test]
    fn test_shrink_to_fit_compacts_and_preserves_order() {
        let mut m = BiHashMap::with_capacity(10);
        for i in 0..8 {
            m.insert(i, i * 10);
        }
        let before = m.find_by_key(&0).unwrap();
        m.erase_by_key(&2);
        m.erase_by_value(&50);
        assert_eq!(m.slots.len(), 8);
        assert_eq!(m.len(), 6);

        m.shrink_to_fit();
        assert_eq!(m.slots.len(), m.len());
        assert!(m.free.is_empty());
        assert_eq!(m.get(before), None);

        let survivors: Vec<_> = m.iter().map(|(k, v)| (*k, *v)).collect();
        let expected: Vec<_> = vec![(0, 0), (1, 10), (3, 30), (4, 40), (6, 60), (7, 70)];
        assert_eq!(survivors, expected);
        assert_consistent(&m);

        // the store keeps working after compaction
        assert!(m.insert(2, 20).1);
        assert!(!m.insert(9, 30).1);
        assert_consistent(&m);
    }

    #[test]
    fn test_shrink_to_fit_after_clear_keeps_positions_stale() {
        let mut m = BiHashMap::new();
        let (p, _) = m.insert('a', 1);
        m.clear();
        m.shrink_to_fit();
        assert!(m.slots.is_empty());

        let (q, _) = m.insert('b', 2);
        assert_eq!(q.index, p.index);
        assert_eq!(m.get(p), None);
        assert_eq!(m.get(q), Some((&'b', &2)));
    }

    #[test]
    fn test_random_operations_keep_invariants() {
        // small key and value ranges force plenty of collisions
        let mut m: BiHashMap<u8, u8> = BiHashMap::new();
        let mut model: Vec<(u8, u8)> = Vec::new();
        let mut state = 0x2545_f491_u32;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state
        };

        for _ in 0..2000 {
            let r = next();
            let k = (r % 16) as u8;
            let v = ((r >> 8) % 16) as u8;
            match r >> 28 {
                0..=8 => {
                    let free = model.iter().all(|&(mk, mv)| mk != k && mv != v);
                    let (pos, inserted) = m.insert(k, v);
                    assert_eq!(inserted, free);
                    if inserted {
                        model.push((k, v));
                        assert_eq!(m.get(pos), Some((&k, &v)));
                    } else {
                        let (pk, pv) = m.get(pos).unwrap();
                        assert!(*pk == k || *pv == v);
                    }
                }
                9..=11 => {
                    m.erase_by_key(&k);
                    model.retain(|&(mk, _)| mk != k);
                }
                12..=14 => {
                    m.erase_by_value(&v);
                    model.retain(|&(_, mv)| mv != v);
                }
                _ => {
                    if let Some(p) = m.first() {
                        let (pk, _) = m.get(p).map(|(k, v)| (*k, *v)).unwrap();
                        m.erase(p);
                        model.retain(|&(mk, _)| mk != pk);
                    }
                }
            }

            assert_eq!(m.len(), model.len());
            for &(mk, mv) in &model {
                assert_eq!(m.get_by_key(&mk), Some(&mv));
            }
            assert_consistent(&m);
        }
    }
}
