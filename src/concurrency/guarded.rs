//! Data paired with the guard that protects it

use super::guard::{ConcurrencyGuard, ConcurrencyViolation};
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// A value only reachable through its [`ConcurrencyGuard`].
///
/// Guards are not reentrant. A thread holding a read guard must not ask for a second
/// guard on another element while a writer may be waiting on the first one; acquire,
/// copy out, release, then move on.
pub struct Guarded<T> {
    guard: ConcurrencyGuard,
    value: UnsafeCell<T>,
}

// Safety: every access to `value` goes through ReadGuard (shared, readers counted by the
// guard) or WriteGuard (exclusive, reader count drained to zero), so the guard provides the
// same exclusion a RwLock would.
unsafe impl<T: Send> Send for Guarded<T> {}
unsafe impl<T: Send + Sync> Sync for Guarded<T> {}

impl<T> Guarded<T> {
    pub fn new(value: T) -> Self {
        Self {
            guard: ConcurrencyGuard::new(),
            value: UnsafeCell::new(value),
        }
    }

    pub fn read(&self) -> Result<ReadGuard<'_, T>, ConcurrencyViolation> {
        self.guard.acquire_read()?;
        Ok(ReadGuard { owner: self })
    }

    pub fn write(&self) -> Result<WriteGuard<'_, T>, ConcurrencyViolation> {
        self.guard.acquire_write()?;
        Ok(WriteGuard { owner: self })
    }

    pub fn try_read(&self) -> Option<ReadGuard<'_, T>> {
        self.guard.try_acquire_read().then(|| ReadGuard { owner: self })
    }

    pub fn try_write(&self) -> Option<WriteGuard<'_, T>> {
        self.guard.try_acquire_write().then(|| WriteGuard { owner: self })
    }

    /// The raw guard, for callers that lock without touching the value
    pub fn guard(&self) -> &ConcurrencyGuard {
        &self.guard
    }

    /// Direct access when the caller owns the value exclusively
    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }

    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T: Default> Default for Guarded<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for Guarded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guarded")
            .field("readers", &self.guard.reader_count())
            .field("write_locked", &self.guard.is_write_locked())
            .finish()
    }
}

/// Shared access; releases the read lock on drop
pub struct ReadGuard<'a, T> {
    owner: &'a Guarded<T>,
}

impl<T> Deref for ReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Safety: a read lock is held for the lifetime of this guard
        unsafe { &*self.owner.value.get() }
    }
}

impl<T> Drop for ReadGuard<'_, T> {
    fn drop(&mut self) {
        self.owner.guard.release_read();
    }
}

/// Exclusive access; releases the write lock on drop
pub struct WriteGuard<'a, T> {
    owner: &'a Guarded<T>,
}

impl<T> Deref for WriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Safety: the write lock is held for the lifetime of this guard
        unsafe { &*self.owner.value.get() }
    }
}

impl<T> DerefMut for WriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // Safety: the write lock is held and no reader is inside
        unsafe { &mut *self.owner.value.get() }
    }
}

impl<T> Drop for WriteGuard<'_, T> {
    fn drop(&mut self) {
        self.owner.guard.release_write();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_guard_released_on_drop() {
        let cell = Guarded::new(vec![1, 2, 3]);
        {
            let read = cell.read().unwrap();
            assert_eq!(read.len(), 3);
            assert!(cell.try_write().is_none());
        }
        {
            let mut write = cell.write().unwrap();
            write.push(4);
            assert!(cell.try_read().is_none());
        }
        assert_eq!(cell.read().unwrap().len(), 4);
        assert_eq!(cell.guard().reader_count(), 0);
    }

    #[test]
    fn test_failed_try_leaves_holder_untouched() {
        let cell = Guarded::new(0u32);
        let write = cell.write().unwrap();
        assert!(cell.try_write().is_none());
        assert!(cell.try_read().is_none());
        assert!(cell.guard().is_write_locked());
        assert_eq!(cell.guard().reader_count(), 0);
        drop(write);

        let read = cell.read().unwrap();
        assert!(cell.try_write().is_none());
        assert_eq!(cell.guard().reader_count(), 1);
        assert!(!cell.guard().is_write_locked());
        drop(read);
        assert!(cell.try_write().is_some());
        assert!(!cell.guard().is_write_locked());
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let cell = Arc::new(Guarded::new(0u64));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cell = Arc::clone(&cell);
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        *cell.write().unwrap() += 1;
                        let _ = *cell.read().unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(*cell.read().unwrap(), 4_000);
    }
}
