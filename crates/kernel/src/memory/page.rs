//! The physical page allocator: the buddy allocator over the linker-defined
//! heap, behind a spin lock.
//!
//! Everything page-sized in the kernel comes from here: thread stacks, page
//! table levels, and the dynamic allocator's superblocks.

use core::ptr::{self, NonNull};

use buddy_alloc::BuddyAllocator;

use crate::{
    error::KernelError,
    info,
    memory::{PAGE_SIZE, layout, page_roundup},
    sync::{Once, SpinLock},
};

static PAGE_ALLOCATOR: Once<SpinLock<BuddyAllocator<PAGE_SIZE>>> = Once::new();

pub fn init() {
    let start = page_roundup(layout::heap_start());
    let end = layout::memory_end();
    let heap = ptr::with_exposed_provenance_mut::<u8>(start)
        ..ptr::with_exposed_provenance_mut::<u8>(end);

    let allocator = unsafe { BuddyAllocator::new(heap) };
    info!(
        "heap: \t{:#x} -> {:#x} ({} pages)",
        start,
        end,
        allocator.total_pages()
    );
    PAGE_ALLOCATOR.init(SpinLock::new(allocator));
}

/// Allocates a zeroed block of `2^order` contiguous pages.
pub fn alloc_pages(order: usize) -> Result<NonNull<u8>, KernelError> {
    PAGE_ALLOCATOR
        .get()
        .lock()
        .alloc_pages(order)
        .ok_or(KernelError::NoFreePage)
}

/// Frees a block of `2^order` contiguous pages.
///
/// # Safety
///
/// `ptr` must come from `alloc_pages(order)` with the same order, freed at
/// most once and never used again.
pub unsafe fn free_pages(ptr: NonNull<u8>, order: usize) {
    unsafe {
        PAGE_ALLOCATOR.get().lock().free_pages(ptr, order);
    }
}

/// Allocates one zeroed page.
pub fn alloc_page() -> Result<NonNull<u8>, KernelError> {
    alloc_pages(0)
}

/// Frees one page.
///
/// # Safety
///
/// Same contract as [`free_pages`] with order 0.
pub unsafe fn free_page(ptr: NonNull<u8>) {
    unsafe {
        free_pages(ptr, 0);
    }
}

/// Runs `f` with the allocator locked; for callers that batch several
/// operations (the dynamic allocator refilling a bucket).
pub fn with_allocator<T, F>(f: F) -> T
where
    F: FnOnce(&mut BuddyAllocator<PAGE_SIZE>) -> T,
{
    f(&mut PAGE_ALLOCATOR.get().lock())
}
