// Copyright 2026 the corio authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The per-thread scheduler and its event loop.
//!
//! One scheduler owns one OS thread. It keeps a FIFO queue of tasks that
//! are ready to be polled and a queue of pending timers; the loop drains
//! the ready queue, fires due timers, and parks until the nearest timer
//! deadline (or indefinitely) when there is nothing to do. It exits once
//! every task has completed.
//!
//! The reactor surface the rest of the crate relies on is small:
//!
//! - a run-loop step with a timeout ([`Park::park_timeout`]),
//! - a monotonic millisecond timer (`Scheduler::arm_timer` /
//!   `Scheduler::cancel_timer`),
//! - a cross-thread wake handle (`Shared::schedule`, which enqueues a task
//!   and unparks the loop; it is safe from any OS thread).
//!
//! Any [`Park`] implementation may be substituted through
//! [`run_with_park`], e.g. one that steps an I/O poller instead of a
//! condition variable.

use std::cell::{Cell, RefCell};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::rc::Rc;
use std::sync::Arc;
use std::task::Waker;
use std::time::Instant;

use crate::park::{Park, StdPark};
use crate::task::{self, PollOutcome, TaskRef};

thread_local! {
    static CURRENT: RefCell<Option<Rc<Scheduler>>> = const { RefCell::new(None) };
}

/// Runs `root` as the main task of a fresh scheduler on the calling
/// thread, returning once every task has completed.
///
/// # Panics
///
/// Panics if a runtime is already running on this thread.
pub fn run<F>(root: F)
where
    F: Future<Output = ()> + 'static,
{
    run_with_park(Arc::new(StdPark::new()), root);
}

/// Like [`run`], but blocking on the supplied [`Park`] implementation
/// instead of the default condition-variable parker.
///
/// # Panics
///
/// Panics if a runtime is already running on this thread.
pub fn run_with_park<F>(park: Arc<dyn Park>, root: F)
where
    F: Future<Output = ()> + 'static,
{
    let scheduler = Rc::new(Scheduler::new(park));

    CURRENT.with(|current| {
        let mut current = current.borrow_mut();
        assert!(
            current.is_none(),
            "a corio runtime is already running on this thread"
        );
        *current = Some(scheduler.clone());
    });
    let _reset = ClearCurrent;

    task::Builder::new().name("main").spawn(root).detach();
    scheduler.run_loop();
}

struct ClearCurrent;

impl Drop for ClearCurrent {
    fn drop(&mut self) {
        CURRENT.with(|current| current.borrow_mut().take());
    }
}

/// The scheduler driving the current thread.
///
/// # Panics
///
/// Panics when called outside [`run`].
pub(crate) fn current() -> Rc<Scheduler> {
    try_current().expect("no corio runtime on this thread; call corio::run first")
}

pub(crate) fn try_current() -> Option<Rc<Scheduler>> {
    CURRENT.with(|current| current.borrow().clone())
}

/// Identifier of an armed timer, used to cancel or refresh it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TimerId(u64);

/// The half of the scheduler that is reachable from other OS threads: the
/// ready queue plus the unpark handle. Task wakers hold an `Arc` to this.
pub(crate) struct Shared {
    run_queue: spin::Mutex<VecDeque<TaskRef>>,
    park: Arc<dyn Park>,
}

impl Shared {
    /// Enqueues a task for polling and wakes the loop. Safe from any
    /// OS thread.
    pub(crate) fn schedule(&self, task: TaskRef) {
        self.run_queue.lock().push_back(task);
        self.park.unpark();
    }
}

impl core::fmt::Debug for Shared {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Shared")
            .field("run_queue_len", &self.run_queue.lock().len())
            .finish_non_exhaustive()
    }
}

pub(crate) struct Scheduler {
    shared: Arc<Shared>,
    timers: RefCell<TimerQueue>,
    live: Cell<usize>,
}

impl Scheduler {
    fn new(park: Arc<dyn Park>) -> Self {
        Self {
            shared: Arc::new(Shared {
                run_queue: spin::Mutex::new(VecDeque::new()),
                park,
            }),
            timers: RefCell::new(TimerQueue::new()),
            live: Cell::new(0),
        }
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    /// Registers a freshly built task and enqueues its first poll.
    pub(crate) fn spawn(&self, task: TaskRef) {
        self.live.set(self.live.get() + 1);
        tracing::trace!(task.id = %task.id(), live = self.live.get(), "spawn");
        self.shared.schedule(task);
    }

    /// Arms a one-shot timer waking `waker` at `at`.
    pub(crate) fn arm_timer(&self, at: Instant, waker: Waker) -> TimerId {
        self.timers.borrow_mut().insert(at, waker)
    }

    /// Disarms a timer; a no-op if it already fired.
    pub(crate) fn cancel_timer(&self, id: TimerId) {
        self.timers.borrow_mut().remove(id);
    }

    /// Replaces the waker of a pending timer if it would wake a different
    /// task.
    pub(crate) fn refresh_timer(&self, id: TimerId, waker: &Waker) {
        self.timers.borrow_mut().refresh(id, waker);
    }

    fn run_loop(&self) {
        loop {
            // 1. drain the ready queue in FIFO order
            loop {
                let task = self.shared.run_queue.lock().pop_front();
                let Some(task) = task else { break };
                if task.run() == PollOutcome::Completed {
                    self.live.set(self.live.get() - 1);
                    tracing::trace!(task.id = %task.id(), live = self.live.get(), "completed");
                }
            }

            // 2. fire due timers; this only enqueues wakeups
            let next_deadline = self.timers.borrow_mut().fire_due(Instant::now());

            if self.live.get() == 0 {
                tracing::trace!("all tasks completed, shutting down");
                break;
            }
            if !self.shared.run_queue.lock().is_empty() {
                continue;
            }

            // 3. nothing runnable: block until the nearest timer or an
            //    external wakeup
            match next_deadline {
                Some(at) => {
                    let now = Instant::now();
                    if let Some(timeout) = at.checked_duration_since(now) {
                        if !timeout.is_zero() {
                            self.shared.park.park_timeout(timeout);
                        }
                    }
                }
                None => self.shared.park.park(),
            }
        }
    }
}

/// Pending timers: a min-heap of `(deadline, id)` plus an id-to-waker map.
///
/// Cancellation just removes the map entry; the heap slot is discarded
/// lazily when it reaches the top.
struct TimerQueue {
    heap: BinaryHeap<Reverse<(Instant, u64)>>,
    entries: HashMap<u64, Waker>,
    next_id: u64,
}

impl TimerQueue {
    fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            entries: HashMap::new(),
            next_id: 0,
        }
    }

    fn insert(&mut self, at: Instant, waker: Waker) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(id, waker);
        self.heap.push(Reverse((at, id)));
        TimerId(id)
    }

    fn remove(&mut self, id: TimerId) {
        self.entries.remove(&id.0);
    }

    fn refresh(&mut self, id: TimerId, waker: &Waker) {
        if let Some(current) = self.entries.get_mut(&id.0) {
            if !current.will_wake(waker) {
                *current = waker.clone();
            }
        }
    }

    /// Wakes every timer whose deadline is at or before `now`; returns the
    /// deadline of the nearest timer still pending.
    fn fire_due(&mut self, now: Instant) -> Option<Instant> {
        loop {
            let &Reverse((at, id)) = self.heap.peek()?;
            if !self.entries.contains_key(&id) {
                // cancelled entry, discard
                self.heap.pop();
                continue;
            }
            if at > now {
                return Some(at);
            }
            self.heap.pop();
            if let Some(waker) = self.entries.remove(&id) {
                tracing::trace!(timer = id, "timer fired");
                waker.wake();
            }
        }
    }
}
