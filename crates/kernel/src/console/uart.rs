//! low-level driver routines for the 16550a UART.
//!
//! Transmit is polled; receive goes through the PLIC so input arrives as
//! external interrupts.

use core::{hint, ptr, sync::atomic::Ordering};

use crate::{console, memory::layout::UART0};

use super::print::PANICKED;

const unsafe fn reg(offset: usize) -> *mut u8 {
    unsafe { ptr::without_provenance_mut::<u8>(UART0).byte_add(offset) }
}

// the UART control registers.
// some have different meanings for read vs write.
// see http://byterunner.com/16550.html

/// receive holding register (for input bytes)
const RHR: usize = 0;
/// transmit holding register (for output bytes)
const THR: usize = 0;
/// interrupt enable register
const IER: usize = 1;
const IER_RX_ENABLE: u8 = 1 << 0;
/// FIFO control register
const FCR: usize = 2;
const FCR_FIFO_ENABLE: u8 = 1 << 0;
/// clear the content of the two FIFOs
const FCR_FIFO_CLEAR: u8 = 3 << 1;
/// line control register
const LCR: usize = 3;
const LCR_EIGHT_BITS: u8 = 3;
/// special mode to set baud rate
const LCR_BAUD_LATCH: u8 = 1 << 7;
/// line status register
const LSR: usize = 5;
/// input is waiting to be read from RHR
const LSR_RX_READY: u8 = 1 << 0;
/// THR can accept another character to send
const LSR_TX_IDLE: u8 = 1 << 5;

unsafe fn read_reg(offset: usize) -> u8 {
    unsafe { reg(offset).read_volatile() }
}

unsafe fn write_reg(offset: usize, data: u8) {
    unsafe { reg(offset).write_volatile(data) }
}

pub fn init() {
    unsafe {
        // disable interrupts
        write_reg(IER, 0x00);

        // special mode to set baud rate.
        write_reg(LCR, LCR_BAUD_LATCH);

        // LSB for baud rate of 38.4K.
        write_reg(0, 0x03);

        // MSB for baud rate of 38.4K.
        write_reg(1, 0x00);

        // leave set-baud mode, and set word length to 8 bits, no parity.
        write_reg(LCR, LCR_EIGHT_BITS);

        // reset and enable FIFOs.
        write_reg(FCR, FCR_FIFO_ENABLE | FCR_FIFO_CLEAR);

        // enable receive interrupts; transmit is polled.
        write_reg(IER, IER_RX_ENABLE);
    }
}

/// Sends a byte, spinning until the transmit holding register is free.
pub fn putc(c: u8) {
    if PANICKED.load(Ordering::Relaxed) {
        // freeze output from everything but the panicking path
        loop {
            hint::spin_loop();
        }
    }

    unsafe {
        while read_reg(LSR) & LSR_TX_IDLE == 0 {
            hint::spin_loop();
        }
        write_reg(THR, c);
    }
}

/// Reads a waiting input byte, if any.
pub fn getc() -> Option<u8> {
    unsafe {
        if read_reg(LSR) & LSR_RX_READY != 0 {
            Some(read_reg(RHR))
        } else {
            None
        }
    }
}

/// Drains the receive FIFO; called from the PLIC dispatch on the UART
/// irq.
pub fn handle_interrupt() {
    while let Some(c) = getc() {
        console::handle_input(c);
    }
}
