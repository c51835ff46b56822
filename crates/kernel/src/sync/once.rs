use core::{
    cell::UnsafeCell,
    mem::MaybeUninit,
    sync::atomic::{AtomicBool, Ordering},
};

/// A cell written once during bring-up and read ever after.
pub struct Once<T> {
    initialized: AtomicBool,
    value: UnsafeCell<MaybeUninit<T>>,
}

unsafe impl<T> Sync for Once<T> where T: Send {}

impl<T> Once<T> {
    pub const fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Initializes the cell.
    ///
    /// # Panics
    ///
    /// Panics if the cell is already initialized.
    pub fn init(&self, value: T) {
        self.initialized
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .expect("Once::init should be called at most once");

        unsafe {
            (*self.value.get()).write(value);
        }
    }

    /// Gets the contents of the cell.
    ///
    /// # Panics
    ///
    /// Panics if the cell is empty.
    pub fn get(&self) -> &T {
        assert!(
            self.initialized.load(Ordering::Acquire),
            "Once is not initialized"
        );

        unsafe { (*self.value.get()).assume_init_ref() }
    }
}
