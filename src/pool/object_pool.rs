use crate::error::{Result, SynthError};
use crate::pool::handle::{Handle, HandleManager};

/// Fixed-capacity pool of long-lived objects keyed by [`Handle`].
///
/// All `T` are constructed once by `allocate`; `acquire`/`release` only flip
/// a slot between active and free. Callers reset object state themselves.
#[derive(Debug)]
pub struct ObjectPool<T> {
    items: Vec<T>,
    handles: HandleManager,
}

impl<T> Default for ObjectPool<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            handles: HandleManager::new(),
        }
    }
}

impl<T> ObjectPool<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize, init: impl FnMut(Handle) -> T) -> Result<Self> {
        let mut pool = Self::new();
        pool.allocate(capacity, init)?;
        Ok(pool)
    }

    /// Pre-construct `capacity` objects. Fails if already allocated.
    pub fn allocate(&mut self, capacity: usize, init: impl FnMut(Handle) -> T) -> Result<()> {
        self.handles.allocate(capacity)?;
        self.items = (0..capacity).map(Handle::from_index).map(init).collect();
        Ok(())
    }

    pub fn acquire(&mut self) -> Option<Handle> {
        self.handles.new_handle()
    }

    pub fn release(&mut self, handle: Handle) -> Result<()> {
        self.handles.delete_handle(handle)
    }

    pub fn is_active(&self, handle: Handle) -> bool {
        self.handles.is_handle_active(handle)
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        if self.is_active(handle) {
            self.items.get(handle.index())
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        if self.is_active(handle) {
            self.items.get_mut(handle.index())
        } else {
            None
        }
    }

    /// Like [`get_mut`](Self::get_mut) but reports the inactive handle.
    pub fn try_get_mut(&mut self, handle: Handle) -> Result<&mut T> {
        self.get_mut(handle)
            .ok_or(SynthError::InactiveHandle(handle))
    }

    /// Start a cursor pass. Releasing the handle under the cursor is allowed.
    pub fn first(&mut self) -> Option<Handle> {
        self.handles.first_handle()
    }

    pub fn next(&mut self) -> Option<Handle> {
        self.handles.next_handle()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.handles
            .active()
            .iter()
            .map(move |&h| (h, &self.items[h.index()]))
    }

    pub fn release_all(&mut self) {
        self.handles.clear();
    }

    pub fn n_active(&self) -> usize {
        self.handles.n_active()
    }

    pub fn capacity(&self) -> usize {
        self.handles.capacity()
    }

    pub fn peak(&self) -> usize {
        self.handles.peak()
    }

    pub fn usage(&self) -> PoolUsage {
        PoolUsage {
            active: self.n_active(),
            peak: self.peak(),
            capacity: self.capacity(),
        }
    }
}

/// Fixed-capacity list of small values stored by copy under the handle scheme.
#[derive(Debug, Default)]
pub struct ObjectList<T: Copy + Default> {
    values: Vec<T>,
    handles: HandleManager,
}

impl<T: Copy + Default> ObjectList<T> {
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            handles: HandleManager::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut list = Self::new();
        list.allocate(capacity)?;
        Ok(list)
    }

    pub fn allocate(&mut self, capacity: usize) -> Result<()> {
        self.handles.allocate(capacity)?;
        self.values = vec![T::default(); capacity];
        Ok(())
    }

    /// Store `value`, returning its handle, or `None` when the list is full.
    pub fn add(&mut self, value: T) -> Option<Handle> {
        let handle = self.handles.new_handle()?;
        self.values[handle.index()] = value;
        Some(handle)
    }

    pub fn remove(&mut self, handle: Handle) -> Result<T> {
        self.handles.delete_handle(handle)?;
        Ok(self.values[handle.index()])
    }

    pub fn get(&self, handle: Handle) -> Option<T> {
        if self.handles.is_handle_active(handle) {
            Some(self.values[handle.index()])
        } else {
            None
        }
    }

    pub fn first(&mut self) -> Option<(Handle, T)> {
        let handle = self.handles.first_handle()?;
        Some((handle, self.values[handle.index()]))
    }

    pub fn next(&mut self) -> Option<(Handle, T)> {
        let handle = self.handles.next_handle()?;
        Some((handle, self.values[handle.index()]))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle, T)> + '_ {
        self.handles
            .active()
            .iter()
            .map(move |&h| (h, self.values[h.index()]))
    }

    pub fn clear(&mut self) {
        self.handles.clear();
    }

    pub fn len(&self) -> usize {
        self.handles.n_active()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.handles.capacity()
    }

    pub fn usage(&self) -> PoolUsage {
        PoolUsage {
            active: self.handles.n_active(),
            peak: self.handles.peak(),
            capacity: self.handles.capacity(),
        }
    }
}

/// Current and historical usage of one pool, for capacity planning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolUsage {
    pub active: usize,
    pub peak: usize,
    pub capacity: usize,
}
