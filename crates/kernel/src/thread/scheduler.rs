//! Preemptive round-robin scheduling.
//!
//! Ready threads wait in a FIFO queue; the running thread is dethroned
//! when its quantum runs out, yields, blocks, or exits. When the queue is
//! empty the idle thread runs. Every entry to [`schedule`] happens with
//! interrupts disabled and the calling thread already moved out of the
//! `Running` state.

use core::{
    cell::UnsafeCell,
    ptr::{self, NonNull},
    sync::atomic::{AtomicPtr, Ordering},
};

use crate::{
    info,
    interrupt::{self, timer},
    memory::PAGE_SIZE,
    param::TIME_SLICE,
    sync::Semaphore,
};

use super::{Thread, ThreadList, ThreadState, switch};

struct ReadyQueue(UnsafeCell<ThreadList>);

unsafe impl Sync for ReadyQueue {}

static READY_QUEUE: ReadyQueue = ReadyQueue(UnsafeCell::new(ThreadList::new()));

static IDLE_THREAD: AtomicPtr<Thread> = AtomicPtr::new(ptr::null_mut());

/// # Safety
///
/// Interrupts must be disabled, and the reference must not be held across
/// anything that could re-enable them or switch threads.
unsafe fn ready_queue() -> &'static mut ThreadList {
    assert!(!interrupt::is_enabled());
    unsafe { &mut *READY_QUEUE.0.get() }
}

/// Marks `t` ready and queues it at the tail.
pub(crate) fn push_ready(t: NonNull<Thread>) {
    assert!(!interrupt::is_enabled());
    unsafe {
        (*t.as_ptr()).state = ThreadState::Ready;
        ready_queue().push_tail(t);
    }
}

/// Next thread to run: the head of the ready queue, or the idle thread.
fn pop_next() -> NonNull<Thread> {
    unsafe { ready_queue() }.pop_head().unwrap_or_else(|| {
        NonNull::new(IDLE_THREAD.load(Ordering::Acquire))
            .expect("nothing runnable and no idle thread")
    })
}

pub(crate) fn is_idle(t: NonNull<Thread>) -> bool {
    IDLE_THREAD.load(Ordering::Acquire) == t.as_ptr()
}

/// Marks `t` as the running thread with a fresh quantum.
pub(crate) fn run(t: NonNull<Thread>) {
    unsafe {
        (*t.as_ptr()).state = ThreadState::Running;
        (*t.as_ptr()).quantum = TIME_SLICE;
    }
}

/// Hands the hart to the next ready thread (or back to the caller, if
/// nothing else is ready and the caller is the fallback).
///
/// The caller must have interrupts disabled and must already have moved
/// itself out of `Running`.
pub(crate) fn schedule() {
    let cur = super::current_raw();

    assert!(!interrupt::is_enabled());
    assert!(super::is_thread(cur));
    assert_ne!(unsafe { (*cur.as_ptr()).state }, ThreadState::Running);

    let next = pop_next();
    assert!(super::is_thread(next));

    let mut prev: *mut switch::Context = ptr::null_mut();
    if cur != next {
        prev = unsafe {
            switch::switch_contexts(
                &raw mut (*cur.as_ptr()).context,
                &raw mut (*next.as_ptr()).context,
            )
        };
    }
    schedule_tail(prev.map_addr(|a| a & !(PAGE_SIZE - 1)).cast::<Thread>());
}

/// Completes a schedule step on the incoming thread's stack: crowns it,
/// and reaps the outgoing thread if it died. Also the first code a new
/// thread runs (via its first-run trampoline).
pub(crate) extern "C" fn schedule_tail(prev: *mut Thread) {
    assert!(!interrupt::is_enabled());

    let cur = super::current_raw();
    assert!(super::is_thread(cur));
    assert!(cur.as_ptr() != prev);

    run(cur);

    if let Some(prev) = NonNull::new(prev) {
        if unsafe { (*prev.as_ptr()).state } == ThreadState::Dead {
            super::free_thread(prev);
        }
    }
}

/// Timer-driven preemption: burn one tick of the running thread's quantum
/// and yield when it is spent. Called from the timer interrupt handler.
pub(crate) fn tick() {
    let t = super::current();

    let ticks = timer::ticks();
    if ticks % 100_000 == 0 {
        info!("{ticks} ticks");
    }

    let quantum = unsafe { &mut (*t.as_ptr()).quantum };
    *quantum -= 1;
    if *quantum == 0 {
        super::yield_now();
    }
}

fn idle_main(arg: usize) {
    let started = unsafe { &*ptr::with_exposed_provenance::<Semaphore>(arg) };

    IDLE_THREAD.store(super::current().as_ptr(), Ordering::Release);
    started.up();
    // `started` lives on the stack of scheduler::start and is dead beyond
    // this point.

    info!("idle thread parked");
    loop {
        super::block();
    }
}

/// Spawns the idle thread and starts preemptive scheduling.
///
/// Returns once the idle thread has announced itself, with interrupts
/// enabled.
pub fn start() {
    let idle_started = Semaphore::new(0);
    super::spawn("idle", idle_main, (&raw const idle_started).expose_provenance())
        .expect("no memory for the idle thread");

    // preemption begins here
    interrupt::enable();

    idle_started.down();
    info!("idle thread running");
}
