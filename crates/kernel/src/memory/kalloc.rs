//! The kernel dynamic allocator: slab buckets with per-bucket sleeping
//! locks over the page allocator.
//!
//! Bucketed requests take the bucket's lock, which may block; kalloc is
//! therefore for thread context only, never interrupt handlers. Uniblock
//! requests bypass the buckets and go straight to the page allocator,
//! whose spin lock is interrupt-safe.

use core::ptr::NonNull;

use slab_malloc::{BlockHome, Bucket, NUM_BUCKETS, bucket_block_size};

use crate::{
    info,
    memory::page,
    sync::{Locked, Once},
};

static BUCKETS: Once<[Locked<Bucket>; NUM_BUCKETS]> = Once::new();

pub fn init() {
    BUCKETS.init(core::array::from_fn(|i| Locked::new(Bucket::new(i))));
    info!(
        "malloc: {} buckets, blocks {}..={} bytes",
        NUM_BUCKETS,
        bucket_block_size(0),
        bucket_block_size(NUM_BUCKETS - 1)
    );
}

/// Allocates `size` bytes, aligned to at least 16. Returns `None` for
/// zero-size requests and on exhaustion.
pub fn alloc(size: usize) -> Option<NonNull<u8>> {
    if size == 0 {
        return None;
    }
    match slab_malloc::bucket_index_for(size) {
        Some(index) => {
            let mut bucket = BUCKETS.get()[index].lock();
            page::with_allocator(|pages| bucket.alloc(pages))
        }
        None => {
            let order = slab_malloc::large_page_order(size);
            let run = page::alloc_pages(order).ok()?;
            Some(unsafe { slab_malloc::init_uniblock(run, order) })
        }
    }
}

/// Allocates a zeroed array of `n` elements of `size` bytes each.
pub fn alloc_zeroed(n: usize, size: usize) -> Option<NonNull<u8>> {
    let total = n.checked_mul(size)?;
    let block = alloc(total)?;
    unsafe {
        block.write_bytes(0, total);
    }
    Some(block)
}

/// Frees a block from [`alloc`].
///
/// # Safety
///
/// `block` must be live and is dead after this call.
pub unsafe fn free(block: NonNull<u8>) {
    match unsafe { slab_malloc::home_of(block) } {
        BlockHome::Bucket(index) => {
            let mut bucket = BUCKETS.get()[index].lock();
            page::with_allocator(|pages| unsafe { bucket.free(block, pages) });
        }
        BlockHome::Pages { order } => unsafe {
            page::free_pages(slab_malloc::superblock_base(block), order);
        },
    }
}

/// Resizes a block, preserving the common prefix. `new_size == 0` frees;
/// if the new allocation fails the old block stays live.
///
/// # Safety
///
/// `block`, if present, must be live; on success it is consumed.
pub unsafe fn grow(block: Option<NonNull<u8>>, new_size: usize) -> Option<NonNull<u8>> {
    if new_size == 0 {
        if let Some(block) = block {
            unsafe {
                free(block);
            }
        }
        return None;
    }

    let new_block = alloc(new_size)?;
    if let Some(old_block) = block {
        let old_size = unsafe { slab_malloc::block_size_of(old_block) };
        unsafe {
            new_block
                .as_ptr()
                .copy_from_nonoverlapping(old_block.as_ptr(), old_size.min(new_size));
            free(old_block);
        }
    }
    Some(new_block)
}
