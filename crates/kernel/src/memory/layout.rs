//! Physical memory layout.
//!
//! qemu -machine virt is set up like this, based on qemu's
//! [hw/riscv/virt.c]:
//!
//! ```text
//! 0x0000_1000 -- boot ROM, provided by qemu
//! 0x0200_0000 -- CLINT
//! 0x0c00_0000 -- PLIC
//! 0x1000_0000 -- UART0
//! 0x8000_0000 -- boot ROM jumps here in machine mode;
//!                -kernel loads the kernel here
//! ```
//!
//! Platform irq numbers: UART0 is 10, the RTC 11, virtio devices 1..=8 and
//! PCIe 32..=35; only the uart is wired up.
//!
//! The linker splits the 128 MiB of DRAM at 0x8000_0000 into
//! text/rodata/data/bss/stack; everything from `__HEAP_START` up to
//! `__MEMORY_END` belongs to the page allocator.
//!
//! [hw/riscv/virt.c]: https://github.com/qemu/qemu/blob/v9.2.0/hw/riscv/virt.c

use core::arch::global_asm;

// qemu puts UART registers here in physical memory.
pub const UART0: usize = 0x1000_0000;
pub const UART0_IRQ: u32 = 10;

// core local interruptor (CLINT), which contains the timer.
pub const CLINT: usize = 0x200_0000;
pub const CLINT_SIZE: usize = 0x10000;

// qemu puts the platform-level interrupt controller (PLIC) here.
pub const PLIC: usize = 0x0c00_0000;
pub const PLIC_SIZE: usize = 0x400_0000;

// The linker symbols hold the section addresses as their *locations*, not
// values; these shims store each address as data so Rust can read it.
global_asm!(r#"
    .section .rodata
    .globl __text_start_addr
__text_start_addr: .dword __TEXT_START
    .globl __text_end_addr
__text_end_addr: .dword __TEXT_END
    .globl __rodata_start_addr
__rodata_start_addr: .dword __RODATA_START
    .globl __rodata_end_addr
__rodata_end_addr: .dword __RODATA_END
    .globl __data_start_addr
__data_start_addr: .dword __DATA_START
    .globl __data_end_addr
__data_end_addr: .dword __DATA_END
    .globl __bss_start_addr
__bss_start_addr: .dword __BSS_START
    .globl __bss_end_addr
__bss_end_addr: .dword __BSS_END
    .globl __stack_start_addr
__stack_start_addr: .dword __STACK_START
    .globl __stack_end_addr
__stack_end_addr: .dword __STACK_END
    .globl __heap_start_addr
__heap_start_addr: .dword __HEAP_START
    .globl __memory_end_addr
__memory_end_addr: .dword __MEMORY_END
    .section .text
"#);

unsafe extern "C" {
    #[link_name = "__text_start_addr"]
    static TEXT_START: usize;
    #[link_name = "__text_end_addr"]
    static TEXT_END: usize;
    #[link_name = "__rodata_start_addr"]
    static RODATA_START: usize;
    #[link_name = "__rodata_end_addr"]
    static RODATA_END: usize;
    #[link_name = "__data_start_addr"]
    static DATA_START: usize;
    #[link_name = "__data_end_addr"]
    static DATA_END: usize;
    #[link_name = "__bss_start_addr"]
    static BSS_START: usize;
    #[link_name = "__bss_end_addr"]
    static BSS_END: usize;
    #[link_name = "__stack_start_addr"]
    static STACK_START: usize;
    #[link_name = "__stack_end_addr"]
    static STACK_END: usize;
    #[link_name = "__heap_start_addr"]
    static HEAP_START: usize;
    #[link_name = "__memory_end_addr"]
    static MEMORY_END: usize;
}

pub fn text_start() -> usize {
    unsafe { TEXT_START }
}

pub fn text_end() -> usize {
    unsafe { TEXT_END }
}

pub fn rodata_start() -> usize {
    unsafe { RODATA_START }
}

pub fn rodata_end() -> usize {
    unsafe { RODATA_END }
}

pub fn data_start() -> usize {
    unsafe { DATA_START }
}

pub fn data_end() -> usize {
    unsafe { DATA_END }
}

pub fn bss_start() -> usize {
    unsafe { BSS_START }
}

pub fn bss_end() -> usize {
    unsafe { BSS_END }
}

pub fn stack_start() -> usize {
    unsafe { STACK_START }
}

pub fn stack_end() -> usize {
    unsafe { STACK_END }
}

/// Start of the page allocator's pool.
pub fn heap_start() -> usize {
    unsafe { HEAP_START }
}

/// End of the RAM the kernel uses.
pub fn memory_end() -> usize {
    unsafe { MEMORY_END }
}
