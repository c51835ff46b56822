//! The machine-mode timer vector.
//!
//! Timer interrupts are the one thing still handled in machine mode. The
//! vector re-arms this hart's `mtimecmp` and forwards the event to
//! supervisor mode by raising `mip.STIP`; the supervisor handler takes it
//! from there.
//!
//! `mscratch` points at a five-slot per-hart area (see `timer.rs`):
//!   0: address of this hart's mtimecmp    8: timer interval
//!   16, 24, 32: save slots for the three working registers

use core::arch::global_asm;

global_asm!(r#"
    .section .text
    .align 4
    .globl m_timer_vec
m_timer_vec:
    # park t1..t3 in the scratch area; mscratch keeps the area's address
    csrrw t1, mscratch, t1
    sd t2, 16(t1)
    sd t3, 24(t1)
    csrr t2, mscratch
    sd t2, 32(t1)
    csrw mscratch, t1

    # next deadline: mtimecmp += interval
    ld t2, 0(t1)
    ld t3, 8(t1)
    ld t1, 0(t2)
    add t1, t1, t3
    sd t1, 0(t2)

    # raise a supervisor timer interrupt
    li t1, 32
    csrs mip, t1

    csrr t1, mscratch
    ld t2, 16(t1)
    ld t3, 24(t1)
    ld t1, 32(t1)
    mret
"#);

unsafe extern "C" {
    pub fn m_timer_vec();
}
