//! Supervisor trap dispatch.
//!
//! `s_trap_vec` saves a full [`TrapFrame`] on the kernel stack and calls
//! [`s_trap`] with it. Interrupts route to the timer or the PLIC;
//! exceptions mean a kernel bug and panic with a cause-specific message.

use riscv::{
    ExceptionNumber, InterruptNumber,
    interrupt::supervisor::{Exception, Interrupt},
    register::stvec::{self, Stvec, TrapMode},
};

use crate::{hart, info, interrupt};

use super::{kernel_vec, plic, timer};

/// CPU state pushed on the kernel stack on supervisor trap entry.
///
/// Matches the layout in `kernel_vec.rs`; a synthetic frame of this shape
/// also launches every new thread through `s_ret_trap`.
#[repr(C)]
pub struct TrapFrame {
    /// x0..x31; slot 2 holds the trapped stack pointer.
    pub regs: [usize; 32],
    /// f0..f31 bit patterns.
    pub fregs: [usize; 32],
    pub status: usize,
    pub epc: usize,
    pub tval: usize,
    pub cause: usize,
}

pub const REG_SP: usize = 2;
pub const REG_A0: usize = 10;
pub const REG_A1: usize = 11;

const _: () = {
    assert!(core::mem::size_of::<TrapFrame>() == 544);
    assert!(core::mem::size_of::<TrapFrame>() % 16 == 0);
};

pub const SSTATUS_SIE: usize = 1 << 1;
pub const SSTATUS_SPIE: usize = 1 << 5;
pub const SSTATUS_SPP: usize = 1 << 8;

const SCAUSE_INTERRUPT: usize = 1 << 63;

pub use super::kernel_vec::s_ret_trap;

/// Installs the supervisor trap vector on this hart.
pub fn init_hart() {
    let mut stvec = Stvec::from_bits(0);
    stvec.set_address(kernel_vec::s_trap_vec as usize);
    stvec.set_trap_mode(TrapMode::Direct);
    unsafe {
        stvec::write(stvec);
    }
}

/// Entered from `s_trap_vec` for every supervisor-mode trap.
pub(super) extern "C" fn s_trap(tf: &mut TrapFrame) {
    // traps from user mode would need their own path; there is none.
    assert!(tf.status & SSTATUS_SPP != 0, "trap from supervisor mode");
    assert!(!interrupt::is_enabled());

    if tf.cause & SCAUSE_INTERRUPT != 0 {
        handle_interrupt(tf);
    } else {
        handle_exception(tf);
    }
}

fn handle_interrupt(tf: &mut TrapFrame) {
    let code = tf.cause & !SCAUSE_INTERRUPT;
    match Interrupt::from_number(code) {
        Ok(Interrupt::SupervisorTimer) => timer::handle_interrupt(),
        Ok(Interrupt::SupervisorExternal) => plic::handle_interrupt(),
        _ => {
            dump_trap_frame(tf);
            panic!("unexpected interrupt: cause={code}");
        }
    }
}

fn handle_exception(tf: &mut TrapFrame) {
    let code = tf.cause;
    let hart = hart::id();
    let epc = tf.epc;
    let tval = tf.tval;

    match Exception::from_number(code) {
        Ok(
            Exception::InstructionMisaligned
            | Exception::LoadMisaligned
            | Exception::StoreMisaligned,
        ) => {
            panic!("address misaligned: hart={hart} epc={epc:#x} tval={tval:#x}");
        }
        Ok(
            Exception::InstructionPageFault
            | Exception::LoadPageFault
            | Exception::StorePageFault,
        ) => {
            panic!("page fault: hart={hart} epc={epc:#x} tval={tval:#x}");
        }
        Ok(Exception::InstructionFault | Exception::LoadFault | Exception::StoreFault) => {
            panic!("access fault: hart={hart} epc={epc:#x} tval={tval:#x}");
        }
        Ok(Exception::IllegalInstruction) => {
            panic!("illegal instruction: hart={hart} epc={epc:#x} tval={tval:#x}");
        }
        Ok(Exception::Breakpoint) => {
            panic!("breakpoint: hart={hart} epc={epc:#x} tval={tval:#x}");
        }
        Ok(Exception::UserEnvCall | Exception::SupervisorEnvCall) => {
            panic!("environment call: hart={hart} epc={epc:#x} tval={tval:#x}");
        }
        _ => {
            dump_trap_frame(tf);
            panic!("unknown exception: cause={code}");
        }
    }
}

fn dump_trap_frame(tf: &TrapFrame) {
    let is_interrupt = tf.cause & SCAUSE_INTERRUPT != 0;
    info!(
        "trap frame: hart={} status={:#x} epc={:#x} interrupt={} cause={} tval={:#x}",
        hart::id(),
        tf.status,
        tf.epc,
        is_interrupt,
        tf.cause & !SCAUSE_INTERRUPT,
        tf.tval,
    );
}
