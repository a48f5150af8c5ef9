use core::fmt::Debug;

use parking_lot::Mutex;

/// A value that can be read and replaced from several threads at once.
///
/// Every access holds the lock only for as long as it takes to copy the value in or out, so a
/// slow computation on a value never blocks other readers. There is no
/// update-in-place: compute the new value outside, then [`SharedCell::write`] it.
///
/// Separate `SharedCell`s are locked independently. Nothing orders a write to one against a
/// write to another as seen by a third thread.
#[derive(Default)]
pub struct SharedCell<T> {
    inner: Mutex<T>,
}

impl<T> SharedCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Snapshot of the current value.
    pub fn read(&self) -> T
    where
        T: Clone,
    {
        self.inner.lock().clone()
    }

    pub fn write(&self, value: T) {
        *self.inner.lock() = value;
    }

    /// Store `value` and hand back the value it replaced, as a single critical section.
    pub fn replace(&self, value: T) -> T {
        std::mem::replace(&mut *self.inner.lock(), value)
    }

    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T: Debug> Debug for SharedCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.try_lock() {
            Some(value) => f.debug_tuple("SharedCell").field(&*value).finish(),
            None => f.write_str("SharedCell(<locked>)"),
        }
    }
}
