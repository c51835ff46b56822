//! Page allocation bitmap: one bit per page, set means allocated.
//!
//! The storage is borrowed raw memory (the allocator reserves it at the
//! bottom of the heap it manages), so every accessor goes through a raw
//! slice reconstruction.

use core::{ptr::NonNull, slice};

const PAGES_PER_WORD: usize = u64::BITS as usize;

/// Bitstring with ones at every bit >= `n`.
const fn mask_geq(n: usize) -> u64 {
    debug_assert!(n < PAGES_PER_WORD);
    !0 << n
}

/// Bitstring with ones at every bit < `n`.
const fn mask_lt(n: usize) -> u64 {
    debug_assert!(n < PAGES_PER_WORD);
    (1 << n) - 1
}

pub(crate) struct Bitmap {
    words: NonNull<u64>,
    words_len: usize,
}

impl Bitmap {
    /// Creates a bitmap over the given word storage.
    ///
    /// # Safety
    ///
    /// `words` must point to `words_len` writable `u64`s that outlive the
    /// bitmap and are not accessed through any other path.
    pub(crate) unsafe fn new(words: NonNull<u64>, words_len: usize) -> Self {
        Self { words, words_len }
    }

    fn words(&self) -> &[u64] {
        unsafe { slice::from_raw_parts(self.words.as_ptr(), self.words_len) }
    }

    fn words_mut(&mut self) -> &mut [u64] {
        unsafe { slice::from_raw_parts_mut(self.words.as_ptr(), self.words_len) }
    }

    /// Marks every page allocated. Ranges that are actually usable are
    /// freed afterwards, so pages outside them can never be handed out.
    pub(crate) fn fill_allocated(&mut self) {
        self.words_mut().fill(!0);
    }

    pub(crate) fn is_allocated(&self, page: usize) -> bool {
        let word = self.words()[page / PAGES_PER_WORD];
        word & (1 << (page % PAGES_PER_WORD)) != 0
    }

    /// Sets the bits for pages `[page, page + count)`.
    ///
    /// The range is assumed to be currently free.
    pub(crate) fn mark_allocated(&mut self, page: usize, count: usize) {
        debug_assert!(count > 0);
        let (start_idx, start_off) = (page / PAGES_PER_WORD, page % PAGES_PER_WORD);
        let end = page + count;
        let (end_idx, end_off) = (end / PAGES_PER_WORD, end % PAGES_PER_WORD);
        let words = self.words_mut();

        if start_idx == end_idx {
            words[start_idx] |= mask_geq(start_off) & mask_lt(end_off);
        } else {
            words[start_idx] |= mask_geq(start_off);
            for word in &mut words[start_idx + 1..end_idx] {
                *word = !0;
            }
            if end_off != 0 {
                words[end_idx] |= mask_lt(end_off);
            }
        }
    }

    /// Clears the bits for pages `[page, page + count)`.
    ///
    /// The range is assumed to be currently allocated.
    pub(crate) fn mark_free(&mut self, page: usize, count: usize) {
        debug_assert!(count > 0);
        let (start_idx, start_off) = (page / PAGES_PER_WORD, page % PAGES_PER_WORD);
        let end = page + count;
        let (end_idx, end_off) = (end / PAGES_PER_WORD, end % PAGES_PER_WORD);
        let words = self.words_mut();

        if start_idx == end_idx {
            words[start_idx] &= mask_lt(start_off) | mask_geq(end_off);
        } else {
            words[start_idx] &= mask_lt(start_off);
            for word in &mut words[start_idx + 1..end_idx] {
                *word = 0;
            }
            if end_off != 0 {
                words[end_idx] &= mask_geq(end_off);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitmap(storage: &mut Vec<u64>) -> Bitmap {
        let words = NonNull::new(storage.as_mut_ptr()).unwrap();
        unsafe { Bitmap::new(words, storage.len()) }
    }

    #[test]
    fn test_single_word_range() {
        let mut storage = vec![0_u64; 4];
        let mut map = bitmap(&mut storage);

        map.mark_allocated(3, 5);
        for page in 0..16 {
            assert_eq!(map.is_allocated(page), (3..8).contains(&page), "page {page}");
        }

        map.mark_free(3, 5);
        for page in 0..16 {
            assert!(!map.is_allocated(page), "page {page}");
        }
    }

    #[test]
    fn test_cross_word_range() {
        let mut storage = vec![0_u64; 4];
        let mut map = bitmap(&mut storage);

        map.mark_allocated(60, 80);
        for page in 0..256 {
            assert_eq!(
                map.is_allocated(page),
                (60..140).contains(&page),
                "page {page}"
            );
        }

        map.mark_free(64, 64);
        for page in 0..256 {
            assert_eq!(
                map.is_allocated(page),
                (60..64).contains(&page) || (128..140).contains(&page),
                "page {page}"
            );
        }
    }

    #[test]
    fn test_word_boundary_end() {
        let mut storage = vec![0_u64; 2];
        let mut map = bitmap(&mut storage);

        // range ends exactly at a word boundary (end_off == 0)
        map.mark_allocated(0, 128);
        assert!(map.is_allocated(0));
        assert!(map.is_allocated(127));

        map.mark_free(0, 128);
        assert!(!map.is_allocated(0));
        assert!(!map.is_allocated(127));
    }
}
