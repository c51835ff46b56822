//! The kernel's virtual address space.
//!
//! Tiny OS runs every thread in one shared address space: an identity map
//! of the kernel sections (each with its own permissions), the heap, and
//! the device MMIO windows. Paging buys protection, not separation — the
//! map's permission bits turn wild writes into page faults.

use core::ptr::NonNull;

use riscv::{asm, register::satp};
use sv39::{FrameSource, PageTable, PtEntryFlags};

use crate::{
    error::KernelError,
    info,
    memory::{
        PAGE_SIZE, layout,
        layout::{CLINT, CLINT_SIZE, PLIC, PLIC_SIZE, UART0},
        page,
    },
    sync::{Once, SpinLock},
};

/// Intermediate table levels come straight from the page allocator.
struct TableFrames;

impl FrameSource for TableFrames {
    fn alloc_frame(&mut self) -> Option<NonNull<u8>> {
        page::alloc_page().ok()
    }
}

struct KernelVm {
    root: NonNull<PageTable>,
}

unsafe impl Send for KernelVm {}

static KERNEL_VM: Once<SpinLock<KernelVm>> = Once::new();

/// Builds the kernel page table. Runs before paging is enabled, so every
/// table write goes through physical addresses.
pub fn init() {
    use PtEntryFlags as F;

    let root = PageTable::try_allocate(&mut TableFrames).expect("no page for the kernel page table");
    let vm = KernelVm { root };

    // device MMIO windows
    ident_map(&vm, UART0, PAGE_SIZE, F::RW, "uart");
    ident_map(&vm, PLIC, PLIC_SIZE, F::RW, "plic");
    ident_map(&vm, CLINT, CLINT_SIZE, F::RW, "clint");

    // kernel image, section by section
    ident_map(
        &vm,
        layout::text_start(),
        layout::text_end() - layout::text_start(),
        F::RX,
        "text",
    );
    ident_map(
        &vm,
        layout::rodata_start(),
        layout::rodata_end() - layout::rodata_start(),
        F::R,
        "rodata",
    );
    ident_map(
        &vm,
        layout::data_start(),
        layout::data_end() - layout::data_start(),
        F::RW,
        "data",
    );
    ident_map(
        &vm,
        layout::bss_start(),
        layout::bss_end() - layout::bss_start(),
        F::RW,
        "bss",
    );
    ident_map(
        &vm,
        layout::stack_start(),
        layout::stack_end() - layout::stack_start(),
        F::RW,
        "stack",
    );
    ident_map(
        &vm,
        layout::heap_start(),
        layout::memory_end() - layout::heap_start(),
        F::RW,
        "heap",
    );

    KERNEL_VM.init(SpinLock::new(vm));
}

fn ident_map(vm: &KernelVm, addr: usize, size: usize, perm: PtEntryFlags, what: &str) {
    let mut root = vm.root;
    unsafe { root.as_mut() }
        .map(addr, addr, size, perm, &mut TableFrames)
        .expect("kernel identity map");
    info!("{}: \t{:#x} -> {:#x}", what, addr, addr + size);
}

/// Switches this hart's page table register to the kernel's page table and
/// enables paging.
pub fn init_hart() {
    // wait for any previous writes to the page table memory to finish.
    asm::sfence_vma_all();

    let vm = KERNEL_VM.get().lock();
    let satp_bits = unsafe { vm.root.as_ref() }.satp();
    unsafe {
        satp::write(satp::Satp::from_bits(satp_bits));
    }

    // flush stale entries from the TLB.
    asm::sfence_vma_all();
}

/// Maps `len` bytes at `va` to physical addresses starting at `pa` in the
/// kernel page table.
pub fn kmap(va: usize, pa: usize, len: usize, perm: PtEntryFlags) -> Result<(), KernelError> {
    let mut vm = KERNEL_VM.get().lock();
    let mut root = vm.root;
    unsafe { root.as_mut() }.map(va, pa, len, perm, &mut TableFrames)?;
    asm::sfence_vma_all();
    Ok(())
}

/// Unmaps `len` bytes at `va` from the kernel page table. Detach-only: the
/// underlying frames stay with the caller.
pub fn kunmap(va: usize, len: usize) {
    let mut vm = KERNEL_VM.get().lock();
    let mut root = vm.root;
    unsafe { root.as_mut() }.unmap(va, len);
    asm::sfence_vma_all();
}

/// Translates `va` through the kernel page table; 0 for unmapped
/// addresses.
pub fn kwalk(va: usize) -> usize {
    let vm = KERNEL_VM.get().lock();
    unsafe { vm.root.as_ref() }.translate(va).unwrap_or(0)
}

/// Physical address of the kernel's root page table.
pub fn kernel_root() -> usize {
    KERNEL_VM.get().lock().root.as_ptr().addr()
}
