//! Console input and output over the UART.

pub mod print;
pub mod uart;

pub fn init() {
    uart::init();
}

pub fn put_char(c: char) {
    let mut buf = [0_u8; 4];
    for &b in c.encode_utf8(&mut buf).as_bytes() {
        uart::putc(b);
    }
}

/// Handles one received byte: echo, normalizing the carriage return qemu
/// sends for the enter key.
pub(crate) fn handle_input(c: u8) {
    match c {
        b'\r' => put_char('\n'),
        c if c.is_ascii_graphic() || c == b' ' => put_char(c as char),
        _ => {}
    }
}
