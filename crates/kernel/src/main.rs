//! The kernel binary: everything lives in the library crate; linking it in
//! provides `_entry` and the trap vectors.

#![cfg_attr(target_arch = "riscv64", no_std)]
#![cfg_attr(target_arch = "riscv64", no_main)]

use tiny_os_kernel as _;

#[cfg(not(target_arch = "riscv64"))]
fn main() {}
