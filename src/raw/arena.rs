use alloc::vec::Vec;
use core::num::NonZeroU32;

/// Names one occupied slot of an [`Arena`].
///
/// The slot number is kept one past its position so that a missing child or
/// parent link, `Option<Handle>`, is no wider than the handle itself.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(transparent)]
pub(crate) struct Handle(NonZeroU32);

impl Handle {
    fn from_slot(slot: usize) -> Self {
        slot.checked_add(1)
            .and_then(|raw| u32::try_from(raw).ok())
            .and_then(NonZeroU32::new)
            .map(Self)
            .expect("`Arena::alloc()` - arena is out of node slots!")
    }

    /// Position of the slot in the arena.
    #[inline]
    pub(crate) const fn slot(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

/// Slot storage that owns every node of a tree.
///
/// Freed slots are recycled through a free list, so a handle stays valid until
/// the node it names is taken out.
pub(crate) struct Arena<T> {
    slots: Vec<Option<T>>,
    free: Vec<Handle>,
}

impl<T> Arena<T> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Number of occupied slots.
    pub(crate) const fn len(&self) -> usize {
        self.slots.len().saturating_sub(self.free.len())
    }

    pub(crate) fn alloc(&mut self, element: T) -> Handle {
        if let Some(handle) = self.free.pop() {
            self.slots[handle.slot()] = Some(element);
            handle
        } else {
            let handle = Handle::from_slot(self.slots.len());
            self.slots.push(Some(element));
            handle
        }
    }

    #[inline]
    pub(crate) fn get(&self, handle: Handle) -> &T {
        self.slots[handle.slot()].as_ref().expect("`Arena::get()` - `handle` is invalid!")
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, handle: Handle) -> &mut T {
        self.slots[handle.slot()].as_mut().expect("`Arena::get_mut()` - `handle` is invalid!")
    }

    /// Borrows two distinct slots mutably at once.
    pub(crate) fn pair_mut(&mut self, a: Handle, b: Handle) -> (&mut T, &mut T) {
        let (i, j) = (a.slot(), b.slot());
        assert_ne!(i, j, "`Arena::pair_mut()` - handles must be distinct!");

        let (low, high) = self.slots.split_at_mut(i.max(j));
        let first = low[i.min(j)].as_mut().expect("`Arena::pair_mut()` - `handle` is invalid!");
        let second = high[0].as_mut().expect("`Arena::pair_mut()` - `handle` is invalid!");
        if i < j { (first, second) } else { (second, first) }
    }

    pub(crate) fn take(&mut self, handle: Handle) -> T {
        let element = self.slots[handle.slot()].take().expect("`Arena::take()` - `handle` is invalid!");
        self.free.push(handle);
        element
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }
}
