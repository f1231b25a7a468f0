//! Handle-indexed collections
//!
//! [`SlotMap`] stores values in a tightly packed, ordered dense array and hands
//! out generation-stamped [`Handle`]s that stay valid while the value lives,
//! independent of where the value currently sits in the dense array.
//!
//! ```text
//!  handle.id ──► slots[id] = { index, generation } ──► dense[index]
//!                                                       dense_ids[index] == id
//! ```
//!
//! Removal shifts the tail of the dense array down by one so that enumeration
//! order is preserved, and re-points every shifted slot at its new position.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use thiserror::Error;

/// Errors raised by handle-indexed collections
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    /// The handle was never issued, or its value has since been removed
    #[error("Invalid handle: id {id}, generation {generation}")]
    InvalidHandle {
        /// Slot id carried by the handle
        id: u32,
        /// Generation carried by the handle
        generation: u32,
    },

    /// Backing storage could not grow
    #[error("Resource exhausted: could not grow storage to {requested} elements")]
    ResourceExhausted {
        /// Capacity that was requested
        requested: usize,
    },
}

/// Typed, generation-stamped handle into a [`SlotMap<T>`]
///
/// The type parameter only scopes the handle to one kind of value; a
/// `Handle<Light>` cannot be passed where a `Handle<Texture>` is expected.
pub struct Handle<T> {
    id: u32,
    generation: u32,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// Sentinel handle that never resolves to a value
    pub const NULL: Self = Self {
        id: u32::MAX,
        generation: u32::MAX,
        _kind: PhantomData,
    };

    /// Build a handle from its raw parts
    pub const fn from_raw_parts(id: u32, generation: u32) -> Self {
        Self {
            id,
            generation,
            _kind: PhantomData,
        }
    }

    /// Slot id of this handle
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Generation this handle was issued with
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    /// Whether this is the [`Handle::NULL`] sentinel
    pub const fn is_null(&self) -> bool {
        self.id == u32::MAX
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Handle(null)")
        } else {
            write!(f, "Handle({}v{})", self.id, self.generation)
        }
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::NULL
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    /// Position of the value in the dense array (meaningless when vacant)
    index: u32,
    /// Bumped every time the value in this slot is removed
    generation: u32,
    occupied: bool,
}

/// Dense, order-preserving map from stable handles to values
pub struct SlotMap<T> {
    dense: Vec<T>,
    /// Reverse mapping: `dense_ids[i]` is the slot id owning `dense[i]`
    dense_ids: Vec<u32>,
    slots: Vec<Slot>,
    free_ids: Vec<u32>,
    capacity: usize,
    epoch: u64,
}

impl<T> SlotMap<T> {
    /// Create an empty map with room for `capacity` values before growing
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            dense: Vec::with_capacity(capacity),
            dense_ids: Vec::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            free_ids: Vec::new(),
            capacity,
            epoch: 0,
        }
    }

    /// Insert a value and return its handle
    ///
    /// Reuses the most recently freed id if one exists, otherwise issues the
    /// next unused id (which always equals the current length). The value is
    /// appended to the end of the dense array.
    pub fn insert(&mut self, value: T) -> Result<Handle<T>, CollectionError> {
        if self.dense.len() == self.capacity {
            self.grow()?;
        }

        let index = self.dense.len() as u32;
        let id = if let Some(id) = self.free_ids.pop() {
            id
        } else {
            let id = self.slots.len() as u32;
            debug_assert_eq!(id, index, "fresh ids must equal the live count");
            self.slots.push(Slot {
                index,
                generation: 0,
                occupied: false,
            });
            id
        };

        let slot = &mut self.slots[id as usize];
        slot.index = index;
        slot.occupied = true;
        let generation = slot.generation;

        self.dense.push(value);
        self.dense_ids.push(id);
        self.epoch += 1;

        Ok(Handle::from_raw_parts(id, generation))
    }

    /// Dense position currently holding the value for `handle`
    pub fn index_of(&self, handle: Handle<T>) -> Result<usize, CollectionError> {
        self.slots
            .get(handle.id as usize)
            .filter(|slot| slot.occupied && slot.generation == handle.generation)
            .map(|slot| slot.index as usize)
            .ok_or(CollectionError::InvalidHandle {
                id: handle.id,
                generation: handle.generation,
            })
    }

    /// Whether `handle` refers to a live value
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.index_of(handle).is_ok()
    }

    /// Borrow the value for `handle`
    pub fn get(&self, handle: Handle<T>) -> Result<&T, CollectionError> {
        let index = self.index_of(handle)?;
        Ok(&self.dense[index])
    }

    /// Mutably borrow the value for `handle`
    pub fn get_mut(&mut self, handle: Handle<T>) -> Result<&mut T, CollectionError> {
        let index = self.index_of(handle)?;
        Ok(&mut self.dense[index])
    }

    /// Remove the value for `handle`, keeping the remaining values in order
    ///
    /// Every value after the removed one shifts down by one position and its
    /// slot is updated to the new position. O(len - index).
    pub fn remove(&mut self, handle: Handle<T>) -> Result<T, CollectionError> {
        let index = self.index_of(handle)?;

        let value = self.dense.remove(index);
        self.dense_ids.remove(index);
        for (position, &id) in self.dense_ids.iter().enumerate().skip(index) {
            self.slots[id as usize].index = position as u32;
        }

        let slot = &mut self.slots[handle.id as usize];
        slot.occupied = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_ids.push(handle.id);
        self.epoch += 1;

        Ok(value)
    }

    /// Remove every value, returning them in dense order
    ///
    /// All outstanding handles become invalid.
    pub fn drain(&mut self) -> std::vec::Drain<'_, T> {
        for &id in self.dense_ids.iter().rev() {
            let slot = &mut self.slots[id as usize];
            slot.occupied = false;
            slot.generation = slot.generation.wrapping_add(1);
            self.free_ids.push(id);
        }
        self.dense_ids.clear();
        self.epoch += 1;
        self.dense.drain(..)
    }

    /// Live values, tightly packed in insertion order
    pub fn as_slice(&self) -> &[T] {
        &self.dense
    }

    /// Value at a dense position
    pub fn get_at(&self, index: usize) -> Option<&T> {
        self.dense.get(index)
    }

    /// Mutable value at a dense position
    pub fn get_at_mut(&mut self, index: usize) -> Option<&mut T> {
        self.dense.get_mut(index)
    }

    /// Handle of the value at a dense position
    pub fn handle_at(&self, index: usize) -> Option<Handle<T>> {
        let id = *self.dense_ids.get(index)?;
        Some(Handle::from_raw_parts(id, self.slots[id as usize].generation))
    }

    /// Iterate `(handle, value)` pairs in dense order
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> + '_ {
        self.dense_ids.iter().zip(&self.dense).map(|(&id, value)| {
            (Handle::from_raw_parts(id, self.slots[id as usize].generation), value)
        })
    }

    /// Every issued id with its dense position, `None` for vacant ids
    pub fn id_map(&self) -> impl Iterator<Item = (u32, Option<usize>)> + '_ {
        self.slots.iter().enumerate().map(|(id, slot)| {
            (id as u32, slot.occupied.then_some(slot.index as usize))
        })
    }

    /// Number of live values
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Whether the map holds no values
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Number of values that fit before the next growth
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Layout counter, advanced by every insert, remove and drain
    ///
    /// Dense positions observed at one epoch are only meaningful while the
    /// epoch is unchanged.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    fn grow(&mut self) -> Result<(), CollectionError> {
        let requested = self.capacity * 2;
        let exhausted = |_| CollectionError::ResourceExhausted { requested };

        self.dense
            .try_reserve_exact(requested - self.dense.len())
            .map_err(exhausted)?;
        self.dense_ids
            .try_reserve_exact(requested - self.dense_ids.len())
            .map_err(exhausted)?;
        self.slots
            .try_reserve_exact(requested - self.slots.len())
            .map_err(exhausted)?;

        log::debug!("SlotMap grew from {} to {} elements", self.capacity, requested);
        self.capacity = requested;
        Ok(())
    }
}

impl<T: fmt::Debug> fmt::Debug for SlotMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotMap")
            .field("len", &self.dense.len())
            .field("capacity", &self.capacity)
            .field("dense", &self.dense)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_bijection<T>(map: &SlotMap<T>) {
        assert_eq!(map.dense.len(), map.dense_ids.len());
        assert!(map.len() <= map.capacity());

        let mut seen = vec![false; map.len()];
        for (id, slot) in map.slots.iter().enumerate() {
            if !slot.occupied {
                continue;
            }
            let index = slot.index as usize;
            assert!(index < map.len(), "id {id} points past the dense array");
            assert!(!seen[index], "dense position {index} claimed twice");
            seen[index] = true;
            assert_eq!(map.dense_ids[index] as usize, id);
        }
        assert!(seen.iter().all(|&s| s), "dense array has an unowned position");
    }

    #[test]
    fn test_remove_preserves_order_and_reuses_id() {
        let mut map = SlotMap::with_capacity(4);
        let a = map.insert("a").unwrap();
        let b = map.insert("b").unwrap();
        let c = map.insert("c").unwrap();

        assert_eq!(map.remove(b).unwrap(), "b");
        assert_eq!(map.as_slice(), &["a", "c"]);

        let d = map.insert("d").unwrap();
        assert_eq!(map.as_slice(), &["a", "c", "d"]);
        assert_eq!(d.id(), b.id());
        assert_ne!(d, b);

        assert_eq!(*map.get(a).unwrap(), "a");
        assert_eq!(*map.get(c).unwrap(), "c");
        assert_eq!(*map.get(d).unwrap(), "d");
        assert_bijection(&map);
    }

    #[test]
    fn test_freed_id_reused_before_fresh_id() {
        let mut map = SlotMap::with_capacity(8);
        let handles: Vec<_> = (0..3).map(|i| map.insert(i).unwrap()).collect();
        assert_eq!(handles.iter().map(Handle::id).collect::<Vec<_>>(), vec![0, 1, 2]);

        map.remove(handles[2]).unwrap();
        assert_eq!(map.insert(10).unwrap().id(), 2);
        assert_eq!(map.insert(11).unwrap().id(), 3);
    }

    #[test]
    fn test_remove_fixes_up_shifted_indices() {
        let mut map = SlotMap::with_capacity(8);
        let l0 = map.insert(0).unwrap();
        let l1 = map.insert(1).unwrap();
        let l2 = map.insert(2).unwrap();

        map.remove(l1).unwrap();
        assert_eq!(map.index_of(l0).unwrap(), 0);
        assert_eq!(map.index_of(l2).unwrap(), 1);

        let l3 = map.insert(3).unwrap();
        assert_eq!(l3.id(), 1);
        assert_eq!(map.index_of(l3).unwrap(), 2);
        assert_bijection(&map);
    }

    #[test]
    fn test_growth_keeps_existing_handles() {
        let mut map = SlotMap::with_capacity(4);
        let handles: Vec<_> = (0..5).map(|i| map.insert(i * 10).unwrap()).collect();

        assert_eq!(map.capacity(), 8);
        for (i, handle) in handles.iter().enumerate() {
            assert_eq!(*map.get(*handle).unwrap(), i * 10);
        }
        assert_bijection(&map);
    }

    #[test]
    fn test_stale_handle_rejected_after_reuse() {
        let mut map = SlotMap::with_capacity(2);
        let old = map.insert("old").unwrap();
        map.remove(old).unwrap();
        let new = map.insert("new").unwrap();

        assert_eq!(old.id(), new.id());
        assert_eq!(
            map.get(old),
            Err(CollectionError::InvalidHandle { id: old.id(), generation: old.generation() })
        );
        assert!(map.remove(old).is_err());
        assert_eq!(*map.get(new).unwrap(), "new");
    }

    #[test]
    fn test_never_issued_and_null_handles_rejected() {
        let mut map: SlotMap<u8> = SlotMap::with_capacity(2);
        map.insert(1).unwrap();

        assert!(map.get(Handle::from_raw_parts(7, 0)).is_err());
        assert!(map.get(Handle::NULL).is_err());
        assert!(Handle::<u8>::NULL.is_null());
    }

    #[test]
    fn test_get_mut_updates_in_place() {
        let mut map = SlotMap::with_capacity(2);
        let h = map.insert(1).unwrap();
        let index = map.index_of(h).unwrap();
        *map.get_mut(h).unwrap() += 41;

        assert_eq!(*map.get(h).unwrap(), 42);
        assert_eq!(map.index_of(h).unwrap(), index);
    }

    #[test]
    fn test_drain_invalidates_all_handles() {
        let mut map = SlotMap::with_capacity(4);
        let a = map.insert('a').unwrap();
        let b = map.insert('b').unwrap();

        let drained: Vec<_> = map.drain().collect();
        assert_eq!(drained, vec!['a', 'b']);
        assert!(map.is_empty());
        assert!(!map.contains(a));
        assert!(!map.contains(b));

        // Ids are recycled lowest-first after a drain.
        assert_eq!(map.insert('c').unwrap().id(), 0);
        assert_bijection(&map);
    }

    #[test]
    fn test_epoch_advances_on_layout_change() {
        let mut map = SlotMap::with_capacity(2);
        let start = map.epoch();
        let h = map.insert(()).unwrap();
        let after_insert = map.epoch();
        map.get_mut(h).unwrap();
        assert_eq!(map.epoch(), after_insert);
        map.remove(h).unwrap();
        assert!(start < after_insert && after_insert < map.epoch());
    }

    #[test]
    fn test_random_operations_keep_bijection() {
        // Small LCG so the sequence is reproducible without extra dependencies.
        let mut state: u64 = 0x2545_F491_4F6C_DD1D;
        let mut next = move || {
            state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            (state >> 33) as usize
        };

        let mut map = SlotMap::with_capacity(2);
        let mut live: Vec<(Handle<usize>, usize)> = Vec::new();

        for step in 0..2000 {
            if live.is_empty() || next() % 3 != 0 {
                let value = step;
                live.push((map.insert(value).unwrap(), value));
            } else {
                let victim = next() % live.len();
                let (handle, value) = live.remove(victim);
                assert_eq!(map.remove(handle).unwrap(), value);
            }

            if step % 50 == 0 {
                if let Some((handle, value)) = live.first_mut() {
                    *value += 1;
                    *map.get_mut(*handle).unwrap() = *value;
                }
            }

            assert_bijection(&map);
            for (handle, value) in &live {
                assert_eq!(map.get(*handle).unwrap(), value);
            }
        }

        // `live` is kept in insertion order, which the dense array must match.
        let dense: Vec<_> = map.iter().map(|(h, _)| h).collect();
        let expected: Vec<_> = live.iter().map(|(h, _)| *h).collect();
        assert_eq!(dense, expected);
    }
}
