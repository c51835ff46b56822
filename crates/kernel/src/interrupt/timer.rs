//! CLINT timer programming and the tick counter.
//!
//! The CLINT exposes one `mtimecmp` register per hart and a global `mtime`
//! counter; a timer interrupt fires whenever `mtime >= mtimecmp`. All of
//! that is machine-mode-only state, so each hart programs its first
//! deadline during machine-mode boot and the machine vector re-arms it on
//! every interrupt.

use core::{arch::asm, cell::UnsafeCell, ptr};

use riscv::register::{mhartid, mie, mscratch, mstatus, mtvec};

use crate::{
    param::{NCPU, TIMER_INTERVAL},
    sync::SpinLock,
    thread,
};

use super::timer_vec;

const CLINT: usize = 0x200_0000;
const CLINT_MTIME: usize = CLINT + 0xbff8;

const fn clint_mtimecmp(hart: usize) -> usize {
    CLINT + 0x4000 + 8 * hart
}

/// Per-hart scratch area handed to the machine timer vector through
/// `mscratch`: `{mtimecmp address, interval, three save slots}`.
#[repr(C, align(64))]
struct ScratchArea(UnsafeCell<[u64; 5]>);

unsafe impl Sync for ScratchArea {}

static MSCRATCH: [ScratchArea; NCPU] = [const { ScratchArea(UnsafeCell::new([0; 5])) }; NCPU];

/// Timer ticks since boot.
static TICKS: SpinLock<u64> = SpinLock::new(0);

/// Programs this hart's first timer deadline, scratch area and machine
/// trap vector, and enables machine timer interrupts.
///
/// # Safety
///
/// Must run in machine mode, once per hart, before `mret`.
pub unsafe fn init_machine() {
    let hart = mhartid::read();

    let scratch = MSCRATCH[hart].0.get();
    unsafe {
        (*scratch)[0] = clint_mtimecmp(hart) as u64;
        (*scratch)[1] = TIMER_INTERVAL;
    }

    // ask for the very first timer interrupt.
    unsafe {
        let mtime = ptr::with_exposed_provenance::<u64>(CLINT_MTIME).read_volatile();
        ptr::with_exposed_provenance_mut::<u64>(clint_mtimecmp(hart))
            .write_volatile(mtime + TIMER_INTERVAL);
    }

    unsafe {
        mscratch::write(scratch as usize);

        let mut mtvec = mtvec::Mtvec::from_bits(0);
        mtvec.set_address(timer_vec::m_timer_vec as usize);
        mtvec.set_trap_mode(mtvec::TrapMode::Direct);
        mtvec::write(mtvec);

        mstatus::set_mie();
        mie::set_mtimer();
    }
}

/// Timer ticks since boot.
pub fn ticks() -> u64 {
    *TICKS.lock()
}

/// Yields until at least `n` more ticks have elapsed.
///
/// Coarse and voluntary: the thread stays runnable and re-checks its
/// deadline every time it is scheduled.
pub fn sleep(n: u64) {
    let start = ticks();
    while ticks().wrapping_sub(start) < n {
        thread::yield_now();
    }
}

/// Supervisor half of a timer interrupt: count the tick and drive the
/// scheduler.
pub(super) fn handle_interrupt() {
    // the machine vector re-armed mtimecmp; drop the forwarded pending bit
    unsafe {
        asm!("csrc sip, {}", in(reg) 1_usize << 5);
    }

    *TICKS.lock() += 1;
    thread::scheduler::tick();
}
