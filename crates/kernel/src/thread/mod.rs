//! Kernel threads.
//!
//! A thread's metadata sits at the base of its single stack page; the
//! stack grows down toward it, and the `magic` field doubles as an
//! overflow canary checked on every [`current`]. Recovering the current
//! thread is therefore just rounding `sp` down to a page boundary — the
//! same trick the context switch uses to name the previous thread.
//!
//! All thread and queue state is protected by the interrupt save/restore
//! discipline of [`crate::interrupt`].

use core::{arch::asm, cell::Cell, mem, ptr::NonNull};

use arrayvec::ArrayString;
use intrusive_list::{List, ListNode};
use riscv::register::sstatus;

use crate::{
    error::KernelError,
    info,
    interrupt::{self, trap},
    memory::{PAGE_SIZE, page, page_rounddown, vm},
    sync::SpinLock,
};

use self::switch::Context;

pub mod scheduler;
mod switch;

const THREAD_MAGIC: u64 = 0xe87a_b59e_fc89_9600;

pub type Tid = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    New,
    Ready,
    Running,
    Blocked,
    Dead,
}

/// Thread metadata, at the base of the thread's stack page.
#[repr(C)]
pub struct Thread {
    /// Stack-overflow canary; a runaway stack clobbers this first.
    magic: u64,
    tid: Tid,
    name: ArrayString<32>,
    pub(crate) state: ThreadState,
    process: &'static Process,
    exit_code: i64,
    /// Links the thread into the ready queue or a wait queue.
    node: ListNode,
    /// Where the thread's suspended context is parked.
    pub(crate) context: *mut Context,
    /// Remaining quantum, in timer ticks.
    pub(crate) quantum: u64,
}

/// A group of threads sharing an address space. Only the kernel process
/// exists; a process whose last thread dies would be freed here.
pub struct Process {
    name: &'static str,
    page_table: Cell<usize>,
    thread_count: Cell<usize>,
}

unsafe impl Sync for Process {}

static KERNEL_PROC: Process = Process {
    name: "kernel",
    page_table: Cell::new(0),
    thread_count: Cell::new(0),
};

impl Process {
    fn register_thread(&self) {
        assert!(!interrupt::is_enabled());
        self.thread_count.set(self.thread_count.get() + 1);
    }

    fn deregister_thread(&self) {
        assert!(!interrupt::is_enabled());
        let remaining = self.thread_count.get() - 1;
        self.thread_count.set(remaining);
        // a process losing its last thread would release its page table
        // and record here; the kernel process never does
        assert!(remaining > 0);
    }
}

/// Threads alive in the kernel process.
pub fn thread_count() -> usize {
    interrupt::with_disabled(|| KERNEL_PROC.thread_count.get())
}

/// A FIFO queue of threads linked through their embedded nodes.
pub(crate) struct ThreadList {
    list: List,
}

impl ThreadList {
    pub(crate) const fn new() -> Self {
        Self { list: List::new() }
    }

    pub(crate) fn push_tail(&mut self, t: NonNull<Thread>) {
        unsafe {
            self.list.push_tail(node_of(t));
        }
    }

    pub(crate) fn pop_head(&mut self) -> Option<NonNull<Thread>> {
        let node = self.list.pop_head()?;
        Some(unsafe { intrusive_list::owner_of(node, mem::offset_of!(Thread, node)) })
    }
}

fn node_of(t: NonNull<Thread>) -> NonNull<ListNode> {
    unsafe { NonNull::new_unchecked(&raw mut (*t.as_ptr()).node) }
}

static NEXT_TID: SpinLock<Tid> = SpinLock::new(1);

fn allocate_tid() -> Tid {
    let mut next = NEXT_TID.lock();
    let tid = *next;
    *next += 1;
    tid
}

fn is_thread(t: NonNull<Thread>) -> bool {
    unsafe { (*t.as_ptr()).magic == THREAD_MAGIC }
}

/// The thread owning the stack we are running on, canary unchecked.
fn current_raw() -> NonNull<Thread> {
    let sp: usize;
    unsafe {
        asm!("mv {}, sp", out(reg) sp);
    }
    NonNull::new(core::ptr::with_exposed_provenance_mut(page_rounddown(sp))).unwrap()
}

/// The running thread.
///
/// Panics if the stack has overflowed into the thread header.
#[track_caller]
pub fn current() -> NonNull<Thread> {
    let t = current_raw();
    assert!(is_thread(t), "thread canary clobbered");
    assert_eq!(unsafe { (*t.as_ptr()).state }, ThreadState::Running);
    t
}

pub fn current_tid() -> Tid {
    unsafe { (*current().as_ptr()).tid }
}

/// Puts the current thread to sleep; it runs again only after
/// [`unblock`].
pub fn block() {
    let prev = interrupt::disable();

    let t = current();
    unsafe {
        (*t.as_ptr()).state = ThreadState::Blocked;
    }
    scheduler::schedule();

    interrupt::restore(prev);
}

/// Moves a blocked thread to the ready queue.
pub fn unblock(t: NonNull<Thread>) {
    assert!(is_thread(t));

    let prev = interrupt::disable();

    assert_eq!(unsafe { (*t.as_ptr()).state }, ThreadState::Blocked);
    scheduler::push_ready(t);

    interrupt::restore(prev);
}

/// Surrenders the rest of the quantum; the thread goes to the back of the
/// ready queue and may run again immediately if nothing else is ready.
pub fn yield_now() {
    let t = current();

    let prev = interrupt::disable();

    if scheduler::is_idle(t) {
        // the idle thread is never queued; the scheduler falls back to it
        unsafe {
            (*t.as_ptr()).state = ThreadState::Ready;
        }
    } else {
        scheduler::push_ready(t);
    }
    scheduler::schedule();

    interrupt::restore(prev);
}

/// Terminates the current thread. Its page cannot be freed while we are
/// still running on it, so the next schedule step reaps it.
pub fn exit(code: i64) -> ! {
    let t = current();

    interrupt::disable();
    unsafe {
        (*t.as_ptr()).state = ThreadState::Dead;
        (*t.as_ptr()).exit_code = code;
    }
    scheduler::schedule();
    unreachable!("dead thread resumed");
}

/// Reaps a dead thread: releases its process registration and its page.
/// Called from the schedule step following its exit.
pub(crate) fn free_thread(t: NonNull<Thread>) {
    assert!(is_thread(t));
    let (tid, name, exit_code) = unsafe {
        let t = t.as_ref();
        assert_eq!(t.state, ThreadState::Dead);
        t.process.deregister_thread();
        (t.tid, t.name, t.exit_code)
    };
    info!("thread {tid} ({name}) exited with code {exit_code}");

    unsafe {
        page::free_page(t.cast());
    }
}

fn truncated_name(name: &str) -> ArrayString<32> {
    let mut buf = ArrayString::new();
    for c in name.chars() {
        if buf.try_push(c).is_err() {
            break;
        }
    }
    buf
}

fn init_header(t: NonNull<Thread>, name: &str) {
    unsafe {
        t.write(Thread {
            magic: THREAD_MAGIC,
            tid: 0,
            name: truncated_name(name),
            state: ThreadState::New,
            process: &KERNEL_PROC,
            exit_code: -1,
            node: ListNode::new(),
            context: core::ptr::null_mut(),
            quantum: 0,
        });
    }
    KERNEL_PROC.register_thread();
}

/// Entered from `s_ret_trap` on a thread's first run, with the arguments
/// planted in the synthetic trap frame.
extern "C" fn kthread(f: fn(usize), arg: usize) -> ! {
    interrupt::enable();
    f(arg);
    exit(0);
}

/// Creates a kernel thread running `f(arg)` and makes it ready.
///
/// The thread starts through a synthetic trap frame: its first dispatch
/// runs the schedule tail, then `sret`s into [`kthread`] with interrupts
/// enabled.
pub fn spawn(name: &str, f: fn(usize), arg: usize) -> Result<Tid, KernelError> {
    let page = page::alloc_page()?;
    let t = page.cast::<Thread>();

    let prev = interrupt::disable();
    init_header(t, name);
    let tid = allocate_tid();
    unsafe {
        (*t.as_ptr()).tid = tid;
    }

    // synthetic trap frame at the top of the fresh (zeroed) stack
    let stack_top = page.addr().get() + PAGE_SIZE;
    let tf = unsafe {
        page.byte_add(PAGE_SIZE - mem::size_of::<trap::TrapFrame>())
            .cast::<trap::TrapFrame>()
    };
    unsafe {
        let tf = tf.as_ptr();
        (*tf).epc = kthread as usize;
        (*tf).regs[trap::REG_A0] = f as usize;
        (*tf).regs[trap::REG_A1] = arg;
        (*tf).regs[trap::REG_SP] = stack_top;
        // previous privilege supervisor, interrupts enabled after sret
        (*tf).status = (sstatus::read().bits() | trap::SSTATUS_SPP | trap::SSTATUS_SPIE)
            & !trap::SSTATUS_SIE;
    }

    // first-run context just below the frame
    let ctx = unsafe { tf.byte_sub(mem::size_of::<Context>()).cast::<Context>() };
    unsafe {
        ctx.write(Context::first_run(switch::schedule_tail_entry as usize));
        (*t.as_ptr()).context = ctx.as_ptr();
    }

    unsafe {
        (*t.as_ptr()).state = ThreadState::Blocked;
    }
    unblock(t);

    interrupt::restore(prev);
    Ok(tid)
}

/// Scheduler bring-up hook; the queues are const-initialized, so this only
/// publishes the kernel process's page table.
pub fn init() {
    assert!(!interrupt::is_enabled());
    KERNEL_PROC.page_table.set(vm::kernel_root());
    info!(
        "process {}: page table {:#x}",
        KERNEL_PROC.name,
        KERNEL_PROC.page_table.get()
    );
}

/// Adopts the boot flow of this hart as a thread of the kernel process.
/// Works because the boot stack is one page, page-aligned.
pub fn init_hart() {
    assert!(!interrupt::is_enabled());

    let t = current_raw();
    init_header(t, "kernel");
    scheduler::run(t);
    let tid = allocate_tid();
    unsafe {
        (*t.as_ptr()).tid = tid;
    }
}
