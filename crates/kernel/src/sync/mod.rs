pub use self::{
    lock::{Lock, Locked, LockedGuard},
    once::Once,
    semaphore::Semaphore,
    spin_lock::{SpinLock, SpinLockGuard},
};

mod lock;
mod once;
mod semaphore;
mod spin_lock;
