//! Sleeping locks: a binary semaphore plus owner tracking.
//!
//! Contended acquisition blocks the thread instead of spinning, so these
//! are for thread context only. Recursive acquisition is a bug and is
//! asserted against.

use core::{
    cell::{Cell, UnsafeCell},
    ops::{Deref, DerefMut},
    ptr::NonNull,
};

use crate::thread::{self, Thread};

use super::Semaphore;

pub struct Lock {
    holder: Cell<Option<NonNull<Thread>>>,
    semaphore: Semaphore,
}

// holder is only written by the thread that just won (or owns) the
// semaphore.
unsafe impl Send for Lock {}
unsafe impl Sync for Lock {}

impl Lock {
    pub const fn new() -> Self {
        Self {
            holder: Cell::new(None),
            semaphore: Semaphore::new(1),
        }
    }

    /// Whether the calling thread holds this lock.
    pub fn is_held_by_current(&self) -> bool {
        self.holder.get() == Some(thread::current())
    }

    pub fn acquire(&self) {
        assert!(!self.is_held_by_current());

        self.semaphore.down();
        self.holder.set(Some(thread::current()));
    }

    /// Acquires without blocking; `true` iff the lock was taken.
    pub fn try_acquire(&self) -> bool {
        assert!(!self.is_held_by_current());

        let acquired = self.semaphore.try_down();
        if acquired {
            self.holder.set(Some(thread::current()));
        }
        acquired
    }

    pub fn release(&self) {
        assert!(self.is_held_by_current());

        self.holder.set(None);
        self.semaphore.up();
    }
}

impl Default for Lock {
    fn default() -> Self {
        Self::new()
    }
}

/// A value guarded by a [`Lock`].
pub struct Locked<T> {
    lock: Lock,
    value: UnsafeCell<T>,
}

unsafe impl<T> Sync for Locked<T> where T: Send {}

impl<T> Locked<T> {
    pub const fn new(value: T) -> Self {
        Self {
            lock: Lock::new(),
            value: UnsafeCell::new(value),
        }
    }

    pub fn lock(&self) -> LockedGuard<'_, T> {
        self.lock.acquire();
        LockedGuard { inner: self }
    }
}

pub struct LockedGuard<'a, T> {
    inner: &'a Locked<T>,
}

impl<T> Drop for LockedGuard<'_, T> {
    fn drop(&mut self) {
        self.inner.lock.release();
    }
}

impl<T> Deref for LockedGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.inner.value.get() }
    }
}

impl<T> DerefMut for LockedGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.inner.value.get() }
    }
}
