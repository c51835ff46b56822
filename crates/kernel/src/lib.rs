//! Tiny OS: a preemptive multitasking kernel for qemu -machine virt
//! (riscv64).
//!
//! The kernel boots in machine mode, drops to supervisor mode with Sv39
//! paging over an identity map, and multiplexes kernel threads with a
//! round-robin scheduler driven by the CLINT timer.

#![cfg_attr(target_arch = "riscv64", no_std)]

#[cfg(target_arch = "riscv64")]
pub mod console;
#[cfg(target_arch = "riscv64")]
mod entry;
#[cfg(target_arch = "riscv64")]
pub mod error;
#[cfg(target_arch = "riscv64")]
pub mod hart;
#[cfg(target_arch = "riscv64")]
pub mod interrupt;
#[cfg(target_arch = "riscv64")]
pub mod memory;
#[cfg(target_arch = "riscv64")]
pub mod param;
#[cfg(target_arch = "riscv64")]
mod start;
#[cfg(target_arch = "riscv64")]
pub mod sync;
#[cfg(target_arch = "riscv64")]
pub mod thread;

/// start() lands here in supervisor mode.
#[cfg(target_arch = "riscv64")]
extern "C" fn main() -> ! {
    if hart::id() != 0 {
        // bring-up is single-hart; park the others
        loop {
            riscv::asm::wfi();
        }
    }

    console::init();
    println!();
    println!("tiny os kernel is booting");
    println!();

    memory::page::init(); // physical page allocator
    memory::vm::init(); // build the kernel page table
    memory::vm::init_hart(); // turn on paging
    interrupt::trap::init_hart(); // install the supervisor trap vector
    interrupt::plic::init(); // set up the interrupt controller
    interrupt::plic::init_hart(); // ask the PLIC for device interrupts
    memory::kalloc::init(); // dynamic allocator buckets
    thread::init(); // kernel process
    thread::init_hart(); // adopt the boot flow as the first thread
    thread::scheduler::start(); // idle thread; enables interrupts

    let t1 = thread::spawn("t1", hello, 0).expect("spawn t1");
    info!("thread t1: {t1}");
    let t2 = thread::spawn("t2", hello, 0).expect("spawn t2");
    info!("thread t2: {t2}");

    loop {
        riscv::asm::wfi();
    }
}

#[cfg(target_arch = "riscv64")]
fn hello(_arg: usize) {
    info!("thread {} started", thread::current_tid());
    interrupt::timer::sleep(10);
    info!("{} ticks", interrupt::timer::ticks());
}
