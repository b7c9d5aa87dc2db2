//! GPU resource ownership helpers
//!
//! - [`GpuSlot`]: a single owned resource that can be released early and is
//!   reset to empty in the same step.
//! - [`HandleTable`]: a free-list table that hands out non-zero `u32`
//!   handles, leaving `0` free to mean "invalid".

// ============================================================================
// GPU Slot
// ============================================================================

/// An optionally-present GPU resource.
///
/// Dropping the slot drops the resource, so every exit path (including an
/// early `?` during initialisation) releases it. [`GpuSlot::release`] is
/// idempotent.
#[derive(Debug)]
pub struct GpuSlot<T> {
    label: &'static str,
    inner: Option<T>,
}

impl<T> GpuSlot<T> {
    /// Create an empty slot
    pub const fn empty(label: &'static str) -> Self {
        Self { label, inner: None }
    }

    /// Store a resource, releasing any previous occupant first
    pub fn set(&mut self, resource: T) {
        self.release();
        self.inner = Some(resource);
    }

    /// Borrow the resource if present
    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.inner.as_ref()
    }

    /// Check whether the slot holds a resource
    #[inline]
    pub fn is_set(&self) -> bool {
        self.inner.is_some()
    }

    /// Drop the resource and leave the slot empty.
    ///
    /// Returns `true` if something was released.
    pub fn release(&mut self) -> bool {
        match self.inner.take() {
            Some(resource) => {
                drop(resource);
                log::trace!("Released {}", self.label);
                true
            }
            None => false,
        }
    }
}

// ============================================================================
// Handle Table
// ============================================================================

#[derive(Debug)]
enum Entry<T> {
    Occupied(T),
    /// Index of the next free entry, or `usize::MAX` at the end of the list
    Vacant(usize),
}

/// Table of objects addressed by non-zero `u32` handles.
///
/// Released handles are recycled (LIFO). Handle `0` is never issued.
#[derive(Debug)]
pub struct HandleTable<T> {
    entries: Vec<Entry<T>>,
    free_head: usize,
    live: usize,
}

impl<T> HandleTable<T> {
    const NONE: usize = usize::MAX;

    /// Create an empty table
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free_head: Self::NONE,
            live: 0,
        }
    }

    /// Store a value and return its handle
    pub fn insert(&mut self, value: T) -> u32 {
        self.live += 1;

        let index = if self.free_head != Self::NONE {
            let index = self.free_head;
            if let Entry::Vacant(next) = self.entries[index] {
                self.free_head = next;
            }
            self.entries[index] = Entry::Occupied(value);
            index
        } else {
            self.entries.push(Entry::Occupied(value));
            self.entries.len() - 1
        };

        Self::handle_of(index)
    }

    /// Look up a live handle
    pub fn get(&self, handle: u32) -> Option<&T> {
        let index = Self::index_of(handle)?;
        match self.entries.get(index)? {
            Entry::Occupied(value) => Some(value),
            Entry::Vacant(_) => None,
        }
    }

    /// Remove a value, returning it if the handle was live
    pub fn remove(&mut self, handle: u32) -> Option<T> {
        let index = Self::index_of(handle)?;
        if !matches!(self.entries.get(index)?, Entry::Occupied(_)) {
            return None;
        }

        let entry = std::mem::replace(&mut self.entries[index], Entry::Vacant(self.free_head));
        self.free_head = index;
        self.live -= 1;

        match entry {
            Entry::Occupied(value) => Some(value),
            Entry::Vacant(_) => None,
        }
    }

    /// Number of live handles
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Check if no handles are live
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Drop every value
    pub fn clear(&mut self) {
        self.entries.clear();
        self.free_head = Self::NONE;
        self.live = 0;
    }

    fn handle_of(index: usize) -> u32 {
        u32::try_from(index + 1).unwrap_or(u32::MAX)
    }

    fn index_of(handle: u32) -> Option<usize> {
        (handle as usize).checked_sub(1)
    }
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct DropCounter(Rc<Cell<u32>>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_slot_release_is_idempotent() {
        let drops = Rc::new(Cell::new(0));
        let mut slot = GpuSlot::empty("test buffer");
        slot.set(DropCounter(Rc::clone(&drops)));

        assert!(slot.is_set());
        assert!(slot.release());
        assert!(!slot.is_set());
        assert!(!slot.release());
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn test_slot_set_replaces_previous() {
        let drops = Rc::new(Cell::new(0));
        let mut slot = GpuSlot::empty("test buffer");
        slot.set(DropCounter(Rc::clone(&drops)));
        slot.set(DropCounter(Rc::clone(&drops)));

        assert_eq!(drops.get(), 1);
        drop(slot);
        assert_eq!(drops.get(), 2);
    }

    #[test]
    fn test_handles_are_never_zero() {
        let mut table = HandleTable::new();
        let a = table.insert("a");
        let b = table.insert("b");

        assert_ne!(a, 0);
        assert_ne!(b, 0);
        assert_ne!(a, b);
        assert!(table.get(0).is_none());
    }

    #[test]
    fn test_remove_and_reuse() {
        let mut table = HandleTable::new();
        let a = table.insert(1);
        let b = table.insert(2);

        assert_eq!(table.remove(a), Some(1));
        assert_eq!(table.remove(a), None);
        assert!(table.get(a).is_none());
        assert_eq!(table.get(b), Some(&2));

        let c = table.insert(3);
        assert_eq!(c, a, "freed handle should be recycled");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_invalid_handles() {
        let mut table: HandleTable<i32> = HandleTable::new();
        assert!(table.get(42).is_none());
        assert!(table.remove(0).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut table = HandleTable::new();
        table.insert(1);
        table.insert(2);
        table.clear();

        assert!(table.is_empty());
    }
}
