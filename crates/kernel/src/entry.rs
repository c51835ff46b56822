//! Boot entry: qemu's ROM jumps to 0x8000_0000 in machine mode with the
//! hart id in `mhartid`. The entry stub zeroes the bss, gives each hart one
//! page of boot stack, and calls into Rust.

use core::arch::global_asm;

use crate::{param::STACK_SIZE, start::start};

global_asm!(r#"
    .section .text.entry
    .globl _entry
_entry:
    # zero the bss (section boundaries are 8-byte aligned)
    la t0, __BSS_START
    la t1, __BSS_END
1:
    bgeu t0, t1, 2f
    sd zero, 0(t0)
    addi t0, t0, 8
    j 1b
2:
    # sp = __STACK_START + (mhartid + 1) * STACK_SIZE; stacks grow down
    la sp, __STACK_START
    li t0, {stack_size}
    csrr t1, mhartid
    addi t1, t1, 1
    mul t0, t0, t1
    add sp, sp, t0
    call {start}
3:
    wfi
    j 3b
"#,
    stack_size = const STACK_SIZE,
    start = sym start,
);
