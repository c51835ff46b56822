use bitflags::bitflags;

bitflags! {
    /// Flags for page table entries.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PtEntryFlags: usize {
        /// Valid Bit of page table entry.
        ///
        /// If set, an entry for this virtual address exists.
        const V = 1 << 0;

        /// Read Bit of page table entry.
        ///
        /// If set, the CPU can read at this virtual address.
        const R = 1 << 1;

        /// Write Bit of page table entry.
        ///
        /// If set, the CPU can write at this virtual address.
        const W = 1 << 2;

        /// Executable Bit of page table entry.
        ///
        /// If set, the CPU can execute instructions at this virtual address.
        const X = 1 << 3;

        /// UserMode Bit of page table entry.
        ///
        /// If set, userspace can access this virtual address.
        const U = 1 << 4;

        /// Global Mapping Bit of page table entry.
        ///
        /// If set, this virtual address exists in all address spaces.
        const G = 1 << 5;

        /// Access Bit of page table entry.
        ///
        /// If set, this virtual address has been accessed.
        const A = 1 << 6;

        /// Dirty Bit of page table entry.
        ///
        /// If set, this virtual address has been written to.
        const D = 1 << 7;

        const RW = Self::R.bits() | Self::W.bits();
        const RX = Self::R.bits() | Self::X.bits();
        const RWX = Self::RW.bits() | Self::X.bits();
        const URWX = Self::U.bits() | Self::RWX.bits();
    }
}

/// A single Sv39 page table entry: PPN in bits 53..=10, flags in the low
/// ten bits.
#[repr(transparent)]
#[derive(Clone, Copy)]
pub(crate) struct PtEntry(usize);

impl PtEntry {
    const FLAGS_MASK: usize = 0x3ff;

    pub(crate) const INVALID: Self = Self(0);

    /// Builds an entry from a physical page number and flags.
    pub(crate) fn new(ppn: usize, flags: PtEntryFlags) -> Self {
        debug_assert!(ppn < 1 << 44);
        Self((ppn << 10) | flags.bits())
    }

    pub(crate) fn phys_page_num(self) -> usize {
        self.0 >> 10
    }

    pub(crate) fn phys_addr(self) -> usize {
        self.phys_page_num() << crate::PAGE_SHIFT
    }

    pub(crate) fn flags(self) -> PtEntryFlags {
        PtEntryFlags::from_bits_retain(self.0 & Self::FLAGS_MASK)
    }

    pub(crate) fn is_valid(self) -> bool {
        self.flags().contains(PtEntryFlags::V)
    }

    /// A valid entry with any of R/W/X set maps a page; without them it
    /// points at the next table level.
    pub(crate) fn is_leaf(self) -> bool {
        self.is_valid() && self.flags().intersects(PtEntryFlags::RWX)
    }

    pub(crate) fn is_non_leaf(self) -> bool {
        self.is_valid() && !self.is_leaf()
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::INVALID;
    }
}
