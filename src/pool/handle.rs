use std::fmt;

use rand::Rng;

use crate::error::{Result, SynthError};

/// Small recyclable index identifying one slot of a pool or list.
///
/// Unique while active; may be handed out again after it is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u32);

impl Handle {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/*
Handle Allocation
=================

Handles live in one dense array split in two:

    dense:    [ a0 a1 a2 a3 | f0 f1 f2 ... ]
                 active       free
                 0..n_active  n_active..capacity

`position[h]` is the inverse index, so both directions are O(1):

  new     take dense[n_active], bump n_active. The slot right after the active
          range is always the most recently freed one (MRU reuse keeps the
          touched pool memory warm).

  delete  swap h with the last active entry, fix both inverse indices,
          shrink n_active. h lands at dense[n_active] and is next in line.


Iteration Cursor
----------------

There is exactly one cursor. dense[0..cursor) are the active handles already
visited in the current pass. Deleting a visited handle swaps an unvisited one
into its place; the swapped-in handle is rotated to cursor - 1 and the cursor
rewinds, so the pass neither skips nor repeats anything. Deleting the handle
just returned by `next_handle` is the common case and needs no rotation.
*/

#[derive(Debug, Clone, Default)]
pub struct HandleManager {
    dense: Vec<Handle>,
    position: Vec<usize>,
    n_active: usize,
    peak: usize,
    cursor: usize,
}

impl HandleManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut manager = Self::new();
        manager.allocate(capacity)?;
        Ok(manager)
    }

    /// One-time sizing. Fails on zero capacity or if already sized.
    pub fn allocate(&mut self, capacity: usize) -> Result<()> {
        if !self.dense.is_empty() {
            return Err(SynthError::AlreadyAllocated);
        }
        if capacity == 0 {
            return Err(SynthError::ZeroCapacity);
        }
        if capacity > u32::MAX as usize {
            return Err(SynthError::Configuration(format!(
                "handle capacity {capacity} exceeds u32 range"
            )));
        }

        self.dense = (0..capacity).map(Handle::from_index).collect();
        self.position = (0..capacity).collect();
        self.n_active = 0;
        self.peak = 0;
        self.cursor = 0;
        Ok(())
    }

    pub fn is_allocated(&self) -> bool {
        !self.dense.is_empty()
    }

    /// Next free handle, most recently freed first. `None` when full.
    pub fn new_handle(&mut self) -> Option<Handle> {
        if self.n_active == self.dense.len() {
            return None;
        }

        let handle = self.dense[self.n_active];
        self.n_active += 1;
        self.peak = self.peak.max(self.n_active);
        Some(handle)
    }

    pub fn delete_handle(&mut self, handle: Handle) -> Result<()> {
        if !self.is_handle_active(handle) {
            return Err(SynthError::InactiveHandle(handle));
        }

        let pos = self.position[handle.index()];
        let last = self.n_active - 1;
        self.swap_positions(pos, last);
        self.n_active = last;

        if pos < self.cursor {
            // dense[pos] now holds what used to be last; if that was not yet
            // visited, park it where the cursor will pick it up next
            let rewind = self.cursor - 1;
            if last >= self.cursor && pos != rewind {
                self.swap_positions(pos, rewind);
            }
            self.cursor = rewind;
        }

        Ok(())
    }

    pub fn is_handle_active(&self, handle: Handle) -> bool {
        self.position
            .get(handle.index())
            .is_some_and(|&pos| pos < self.n_active)
    }

    /// Start a new pass over the active handles.
    pub fn first_handle(&mut self) -> Option<Handle> {
        self.cursor = 0;
        self.next_handle()
    }

    pub fn next_handle(&mut self) -> Option<Handle> {
        if self.cursor < self.n_active {
            let handle = self.dense[self.cursor];
            self.cursor += 1;
            Some(handle)
        } else {
            None
        }
    }

    /// Uniform pick among the active handles.
    pub fn random_handle<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Handle> {
        if self.n_active == 0 {
            return None;
        }
        Some(self.dense[rng.random_range(0..self.n_active)])
    }

    /// Active handles in current iteration order.
    pub fn active(&self) -> &[Handle] {
        &self.dense[..self.n_active]
    }

    /// Free every handle at once.
    pub fn clear(&mut self) {
        self.n_active = 0;
        self.cursor = 0;
    }

    pub fn n_active(&self) -> usize {
        self.n_active
    }

    pub fn capacity(&self) -> usize {
        self.dense.len()
    }

    /// Highest simultaneous usage since allocation (or the last reset).
    pub fn peak(&self) -> usize {
        self.peak
    }

    pub fn reset_peak(&mut self) {
        self.peak = self.n_active;
    }

    fn swap_positions(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.dense.swap(a, b);
        self.position[self.dense[a].index()] = a;
        self.position[self.dense[b].index()] = b;
    }
}
