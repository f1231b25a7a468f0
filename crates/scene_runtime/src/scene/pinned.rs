//! Positional access to table slots
//!
//! A [`PinnedSlot`] records a dense position together with the table epoch at
//! the time it was taken. It bypasses handle lookup, so it is only honoured
//! while the table layout is unchanged: any insert or remove on the table
//! makes it stale.

use super::error::{SceneError, SceneResult};
use crate::foundation::collections::SlotMap;

/// Dense position in a table, valid for one layout epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinnedSlot {
    index: usize,
    epoch: u64,
}

impl PinnedSlot {
    pub(crate) fn new(index: usize, epoch: u64) -> Self {
        Self { index, epoch }
    }

    /// Dense position captured by the pin
    pub fn index(&self) -> usize {
        self.index
    }

    /// Table epoch captured by the pin
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Whether the pin still addresses `map`'s current layout
    pub fn is_current<T>(&self, map: &SlotMap<T>) -> bool {
        self.epoch == map.epoch() && self.index < map.len()
    }

    /// Dense position, or `StaleSlot` if the layout has moved on
    pub(crate) fn resolve<T>(&self, map: &SlotMap<T>) -> SceneResult<usize> {
        if self.is_current(map) {
            Ok(self.index)
        } else {
            Err(SceneError::StaleSlot {
                index: self.index,
                pinned: self.epoch,
                current: map.epoch(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_goes_stale_on_insert() {
        let mut map = SlotMap::with_capacity(4);
        let handle = map.insert('a').unwrap();
        let pin = PinnedSlot::new(map.index_of(handle).unwrap(), map.epoch());
        assert_eq!(pin.resolve(&map).unwrap(), 0);

        map.insert('b').unwrap();
        assert!(matches!(pin.resolve(&map), Err(SceneError::StaleSlot { index: 0, .. })));
    }
}
