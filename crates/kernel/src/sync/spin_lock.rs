//! Interrupt-disabling spin locks.
//!
//! Short, non-sleeping critical sections only; a guard must never be held
//! across a context switch. Interrupts stay off while the lock is held, or
//! a handler on this hart could spin on it forever.

use core::{
    cell::UnsafeCell,
    hint,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicBool, Ordering},
};

use crate::interrupt;

pub struct SpinLock<T> {
    locked: AtomicBool,
    value: UnsafeCell<T>,
}

unsafe impl<T> Sync for SpinLock<T> where T: Send {}

impl<T> SpinLock<T> {
    pub const fn new(value: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            value: UnsafeCell::new(value),
        }
    }

    /// Acquires the lock, spinning until it is free.
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        // disable interrupts to avoid deadlock with handlers on this hart.
        let prev = interrupt::disable();

        // `Ordering::Acquire` keeps the critical section's memory accesses
        // strictly after the lock is taken; on RISC-V this is a fence.
        while self.locked.swap(true, Ordering::Acquire) {
            hint::spin_loop();
        }

        SpinLockGuard { lock: self, prev }
    }
}

pub struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
    prev: bool,
}

impl<T> Drop for SpinLockGuard<'_, T> {
    fn drop(&mut self) {
        // `Ordering::Release` publishes the critical section's stores
        // before the lock is seen free.
        self.lock.locked.store(false, Ordering::Release);
        interrupt::restore(self.prev);
    }
}

impl<T> Deref for SpinLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.lock.value.get() }
    }
}

impl<T> DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.lock.value.get() }
    }
}
