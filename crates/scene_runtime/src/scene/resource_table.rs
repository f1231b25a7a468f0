//! One resource category's storage
//!
//! A [`ResourceTable`] is a [`SlotMap`] plus the category's release hook
//! ([`Release`]). Removal runs the hook on the value while it is still in
//! place, then hands the slot back to the map.

use super::error::{ResourceKind, SceneError, SceneResult};
use crate::backend::{GpuAllocator, Release};
use crate::foundation::collections::{Handle, SlotMap};

/// Handle-indexed storage for one kind of scene resource
#[derive(Debug)]
pub struct ResourceTable<T> {
    kind: ResourceKind,
    slots: SlotMap<T>,
}

impl<T: Release> ResourceTable<T> {
    /// Create an empty table
    pub fn new(kind: ResourceKind, capacity: usize) -> Self {
        Self {
            kind,
            slots: SlotMap::with_capacity(capacity),
        }
    }

    /// Kind of resource stored
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Store a value and return its handle
    pub fn add(&mut self, value: T) -> SceneResult<Handle<T>> {
        let handle = self.slots.insert(value).map_err(|e| self.error(e))?;
        log::debug!("Added {} {:?} at index {}", self.kind, handle, self.slots.len() - 1);
        Ok(handle)
    }

    /// Release and remove the value for `handle`
    ///
    /// The release hook runs exactly once. A release failure is logged and the
    /// slot is reclaimed anyway, so the value can never be released twice.
    pub fn remove(&mut self, handle: Handle<T>, allocator: &mut dyn GpuAllocator) -> SceneResult<T> {
        let kind = self.kind;
        let value = self.slots.get_mut(handle).map_err(|e| SceneError::from_collection(kind, e))?;
        if let Err(e) = value.release(allocator) {
            log::warn!("Releasing {} {:?} failed: {}", kind, handle, e);
        }
        let value = self.slots.remove(handle).map_err(|e| self.error(e))?;
        log::debug!("Removed {} {:?}", kind, handle);
        Ok(value)
    }

    /// Apply an in-place mutation to the value for `handle`
    pub fn update<R>(&mut self, handle: Handle<T>, mutate: impl FnOnce(&mut T) -> R) -> SceneResult<R> {
        let kind = self.kind;
        let value = self.slots.get_mut(handle).map_err(|e| SceneError::from_collection(kind, e))?;
        Ok(mutate(value))
    }

    /// Release every value and empty the table, returning how many were released
    pub fn release_all(&mut self, allocator: &mut dyn GpuAllocator) -> usize {
        let kind = self.kind;
        let mut released = 0;
        for mut value in self.slots.drain() {
            if let Err(e) = value.release(allocator) {
                log::warn!("Releasing {} during teardown failed: {}", kind, e);
            }
            released += 1;
        }
        released
    }
}

impl<T> ResourceTable<T> {
    /// Borrow the value for `handle`
    pub fn get(&self, handle: Handle<T>) -> SceneResult<&T> {
        self.slots.get(handle).map_err(|e| self.error(e))
    }

    /// Mutably borrow the value for `handle`
    pub fn get_mut(&mut self, handle: Handle<T>) -> SceneResult<&mut T> {
        let kind = self.kind;
        self.slots.get_mut(handle).map_err(|e| SceneError::from_collection(kind, e))
    }

    /// Dense position of the value for `handle`
    pub fn index_of(&self, handle: Handle<T>) -> SceneResult<usize> {
        self.slots.index_of(handle).map_err(|e| self.error(e))
    }

    /// Whether `handle` refers to a live value
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.slots.contains(handle)
    }

    /// Live values in dense order
    pub fn as_slice(&self) -> &[T] {
        self.slots.as_slice()
    }

    /// `(handle, value)` pairs in dense order
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> + '_ {
        self.slots.iter()
    }

    /// Number of live values
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Values that fit before the next growth
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Layout epoch of the underlying map
    pub fn epoch(&self) -> u64 {
        self.slots.epoch()
    }

    /// Underlying map, for positional access
    pub fn slots(&self) -> &SlotMap<T> {
        &self.slots
    }

    pub(crate) fn slots_mut(&mut self) -> &mut SlotMap<T> {
        &mut self.slots
    }

    fn error(&self, err: crate::foundation::collections::CollectionError) -> SceneError {
        SceneError::from_collection(self.kind, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{GpuResult, HeadlessAllocator};
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Debug)]
    struct Tracked {
        name: &'static str,
        releases: Rc<Cell<u32>>,
    }

    impl Release for Tracked {
        fn release(&mut self, _allocator: &mut dyn GpuAllocator) -> GpuResult<()> {
            self.releases.set(self.releases.get() + 1);
            Ok(())
        }
    }

    fn tracked(name: &'static str) -> (Tracked, Rc<Cell<u32>>) {
        let releases = Rc::new(Cell::new(0));
        (
            Tracked {
                name,
                releases: Rc::clone(&releases),
            },
            releases,
        )
    }

    #[test]
    fn test_remove_runs_release_hook_once() {
        let mut allocator = HeadlessAllocator::new();
        let mut table = ResourceTable::new(ResourceKind::Texture, 4);
        let (value, releases) = tracked("a");
        let handle = table.add(value).unwrap();

        let removed = table.remove(handle, &mut allocator).unwrap();
        assert_eq!(removed.name, "a");
        assert_eq!(releases.get(), 1);

        let err = table.remove(handle, &mut allocator).unwrap_err();
        assert!(matches!(
            err,
            SceneError::InvalidHandle {
                kind: ResourceKind::Texture,
                ..
            }
        ));
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn test_update_mutates_in_place() {
        let mut table = ResourceTable::new(ResourceKind::Light, 2);
        let (a, _) = tracked("a");
        let (b, _) = tracked("b");
        let first = table.add(a).unwrap();
        let second = table.add(b).unwrap();

        let old = table.update(second, |value| std::mem::replace(&mut value.name, "renamed")).unwrap();
        assert_eq!(old, "b");
        assert_eq!(table.index_of(second).unwrap(), 1);
        assert_eq!(table.index_of(first).unwrap(), 0);
        assert_eq!(table.get(second).unwrap().name, "renamed");
    }

    #[test]
    fn test_release_all_releases_every_value() {
        let mut allocator = HeadlessAllocator::new();
        let mut table = ResourceTable::new(ResourceKind::Primitive, 1);
        let counters: Vec<_> = ["a", "b", "c"]
            .into_iter()
            .map(|name| {
                let (value, releases) = tracked(name);
                table.add(value).unwrap();
                releases
            })
            .collect();

        assert_eq!(table.release_all(&mut allocator), 3);
        assert!(table.is_empty());
        assert!(counters.iter().all(|c| c.get() == 1));
        assert_eq!(table.release_all(&mut allocator), 0);
    }
}
