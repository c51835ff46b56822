use core::arch::asm;

use riscv::register::{
    medeleg::{self, Medeleg},
    mepc, mhartid,
    mideleg::{self, Mideleg},
    mstatus, pmpaddr0, pmpcfg0,
    satp::{self, Satp},
    sie,
};

use crate::{hart, interrupt::timer, main};

/// Machine-mode bring-up; entry.rs jumps here on the boot stack.
pub extern "C" fn start() -> ! {
    // set M Previous Privilege mode to Supervisor, for mret.
    unsafe {
        mstatus::set_mpp(mstatus::MPP::Supervisor);
    }

    // set M Exception Program Counter to main, for mret.
    unsafe {
        mepc::write(main as usize);
    }

    // disable paging for now.
    unsafe {
        satp::write(Satp::from_bits(0));
    }

    // delegate all interrupts and exceptions to supervisor mode.
    unsafe {
        medeleg::write(Medeleg::from_bits(0xffff));
        mideleg::write(Mideleg::from_bits(0xffff));
        let mut sie = sie::read();
        sie.set_sext(true);
        sie.set_stimer(true);
        sie.set_ssoft(true);
        sie::write(sie);
    }

    // configure Physical Memory Protection to give supervisor mode
    // access to all of physical memory.
    unsafe {
        pmpaddr0::write(0x3f_ffff_ffff_ffff);
    }
    unsafe {
        pmpcfg0::write(0xf);
    }

    // the trap path saves the floating-point registers.
    unsafe {
        mstatus::set_fs(mstatus::FS::Initial);
    }

    // ask for clock interrupts.
    unsafe {
        timer::init_machine();
    }

    // keep each hart's id in its tp register, for `hart::id()`.
    let id = mhartid::read();
    unsafe {
        hart::set_id(id);
    }

    unsafe {
        asm!("mret", options(noreturn));
    }
}
