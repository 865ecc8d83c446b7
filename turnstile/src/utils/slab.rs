/// Indexed storage with reuse of freed slots.
///
/// Values are addressed by the `usize` key returned from
/// [`insert`](Self::insert). A key stays valid until it is passed to
/// [`remove`](Self::remove); afterwards it may be handed out again.
pub(crate) struct Slab<T> {
    /// Slot storage. `None` marks a vacant slot.
    entries: Vec<Option<T>>,
    /// Stack of vacant keys available for reuse.
    free: Vec<usize>,
    /// Number of occupied slots.
    len: usize,
}

impl<T> Slab<T> {
    /// Creates an empty slab with room for `capacity` values.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Stores `value` and returns its key.
    ///
    /// The most recently freed key is reused first; otherwise the slab grows.
    pub(crate) fn insert(&mut self, value: T) -> usize {
        self.len += 1;

        match self.free.pop() {
            Some(key) => {
                self.entries[key] = Some(value);
                key
            }
            None => {
                self.entries.push(Some(value));
                self.entries.len() - 1
            }
        }
    }

    /// Removes the value stored under `key`, if any.
    pub(crate) fn remove(&mut self, key: usize) -> Option<T> {
        let value = self.entries.get_mut(key)?.take()?;

        self.free.push(key);
        self.len -= 1;

        Some(value)
    }

    pub(crate) fn get(&self, key: usize) -> Option<&T> {
        self.entries.get(key)?.as_ref()
    }

    pub(crate) fn get_mut(&mut self, key: usize) -> Option<&mut T> {
        self.entries.get_mut(key)?.as_mut()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the key the next [`insert`](Self::insert) will hand out.
    pub(crate) fn vacant_key(&self) -> usize {
        self.free.last().copied().unwrap_or(self.entries.len())
    }
}
