/// Maximum number of harts.
pub const NCPU: usize = 8;

/// Boot stack bytes per hart. One page: the boot flow is adopted as a
/// thread, whose header lives at the page base of its stack.
pub const STACK_SIZE: usize = 4096;

/// Timer ticks a thread may run before it is preempted.
pub const TIME_SLICE: u64 = 10_000;

/// CLINT clock increments between timer interrupts; a tenth of a
/// millisecond on qemu's 10 MHz clock.
pub const TIMER_INTERVAL: u64 = 1_000;
