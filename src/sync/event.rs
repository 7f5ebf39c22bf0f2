// Copyright 2026 the corio authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! One-shot, single-consumer notification, single-threaded flavor.
//!
//! An [`Event`] moves through `Init → Waiting → {Ok, Cancel, Timeout}`,
//! monotonically and with exactly one terminal state. [`notify`]
//! effects the `→ Ok` transition; an interruptible wait's deadline or stop
//! token effects `→ Timeout` / `→ Cancel`. Notification is a latch: a wait
//! that starts after `notify` completes immediately.
//!
//! This flavor is for notifier and waiter living on the same scheduler
//! thread; see [`ts::Event`](crate::sync::ts::Event) when `notify` may
//! come from another OS thread.
//!
//! [`notify`]: Event::notify

use std::cell::{Cell, RefCell};
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll, Waker};
use std::time::Instant;

use crate::deadline::Deadline;
use crate::error::{CANCEL, Result, TIMEOUT};
use crate::runtime::{self, Scheduler, TimerId};
use crate::stop::StopCallback;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Status {
    Init,
    Waiting,
    Ok,
    Cancel,
    Timeout,
}

/// An interruptible one-shot event for tasks sharing a scheduler.
#[derive(Debug, Default)]
pub struct Event {
    status: Cell<Status>,
    waker: RefCell<Option<Waker>>,
}

impl Default for Status {
    fn default() -> Self {
        Status::Init
    }
}

impl Event {
    /// Creates an event in the `Init` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifies the waiting side.
    ///
    /// Returns `true` iff this call effected the transition to `Ok`; every
    /// later call returns `false`. If a waiter is suspended, it is woken.
    pub fn notify(&self) -> bool {
        match self.status.get() {
            Status::Init => {
                self.status.set(Status::Ok);
                true
            }
            Status::Waiting => {
                self.status.set(Status::Ok);
                if let Some(waker) = self.waker.borrow_mut().take() {
                    waker.wake();
                }
                true
            }
            Status::Ok | Status::Cancel | Status::Timeout => false,
        }
    }

    /// Whether [`notify`](Self::notify) has succeeded. `false` while
    /// waiting and after an interruption.
    pub fn is_notified(&self) -> bool {
        self.status.get() == Status::Ok
    }

    /// Waits until the event is notified. Not interruptible.
    ///
    /// Completes immediately if [`notify`](Self::notify) was already
    /// called.
    ///
    /// # Panics
    ///
    /// The returned future panics when polled while another wait is
    /// suspended on this event, or if the event was previously
    /// interrupted.
    pub fn wait(&self) -> Wait<'_> {
        Wait {
            event: self,
            registered: false,
            done: false,
        }
    }

    /// Waits until the event is notified, the deadline elapses, or the
    /// stop token fires.
    ///
    /// Fast paths: a token that is already triggered yields
    /// `Err(CANCEL)` and a deadline that is already past yields
    /// `Err(TIMEOUT)`, both without suspending. Waiting on an event that
    /// already reached a terminal state yields that state's result
    /// immediately.
    ///
    /// # Panics
    ///
    /// The returned future panics when polled while another wait is
    /// suspended on this event, or (when a time limit is set) outside a
    /// runtime.
    pub fn wait_until(&self, deadline: impl Into<Deadline>) -> WaitUntil<'_> {
        WaitUntil {
            event: self,
            timed: TimedWait::new(deadline.into()),
            done: false,
        }
    }

    /// Undoes a suspended registration; called when a wait future is
    /// dropped mid-wait.
    pub(crate) fn reset_if_waiting(&self) {
        if self.status.get() == Status::Waiting {
            self.status.set(Status::Init);
            self.waker.borrow_mut().take();
        }
    }

    fn store_waker(&self, cx: &Context<'_>) {
        let mut slot = self.waker.borrow_mut();
        let replace = match &*slot {
            Some(current) => !current.will_wake(cx.waker()),
            None => true,
        };
        if replace {
            *slot = Some(cx.waker().clone());
        }
    }

    /// Poll step of the uninterruptible wait.
    pub(crate) fn poll_plain(&self, registered: &mut bool, cx: &mut Context<'_>) -> Poll<()> {
        match self.status.get() {
            Status::Ok => Poll::Ready(()),
            Status::Cancel | Status::Timeout => {
                panic!("uninterruptible wait on an event that was interrupted")
            }
            Status::Waiting if !*registered => panic!("event is already being awaited"),
            Status::Init => {
                debug_assert!(!*registered);
                *registered = true;
                self.store_waker(cx);
                self.status.set(Status::Waiting);
                Poll::Pending
            }
            Status::Waiting => {
                self.store_waker(cx);
                Poll::Pending
            }
        }
    }

    /// Poll step of the interruptible wait. `timed` carries the per-wait
    /// bookkeeping (armed timer, stop callback, resolved deadline).
    pub(crate) fn poll_timed(&self, timed: &mut TimedWait, cx: &mut Context<'_>) -> Poll<Result<()>> {
        match self.status.get() {
            Status::Ok => {
                timed.disarm();
                return Poll::Ready(Ok(()));
            }
            Status::Cancel => {
                timed.disarm();
                return Poll::Ready(Err(CANCEL.into()));
            }
            Status::Timeout => {
                timed.disarm();
                return Poll::Ready(Err(TIMEOUT.into()));
            }
            Status::Waiting if !timed.started => panic!("event is already being awaited"),
            Status::Init | Status::Waiting => {}
        }

        if !timed.started {
            timed.started = true;

            // fast path: token already triggered
            if let Some(token) = timed.deadline.token() {
                if token.stop_requested() {
                    self.status.set(Status::Cancel);
                    return Poll::Ready(Err(CANCEL.into()));
                }
            }
            // fast path: deadline already expired
            if let Some(ms) = timed.deadline.milliseconds() {
                if ms <= 0 {
                    self.status.set(Status::Timeout);
                    return Poll::Ready(Err(TIMEOUT.into()));
                }
            }

            self.store_waker(cx);
            self.status.set(Status::Waiting);
            timed.arm(cx);

            // the stop could have been requested while we registered; the
            // callback then ran inline and only set the flag
            if timed.cancel_requested() {
                self.status.set(Status::Cancel);
                self.waker.borrow_mut().take();
                timed.disarm();
                return Poll::Ready(Err(CANCEL.into()));
            }
            return Poll::Pending;
        }

        // re-polled while `Waiting`: apply interruptions, else keep waiting
        if timed.cancel_requested() {
            self.status.set(Status::Cancel);
            self.waker.borrow_mut().take();
            timed.disarm();
            return Poll::Ready(Err(CANCEL.into()));
        }
        if timed.deadline_passed() {
            self.status.set(Status::Timeout);
            self.waker.borrow_mut().take();
            timed.disarm();
            return Poll::Ready(Err(TIMEOUT.into()));
        }

        self.store_waker(cx);
        timed.refresh(cx);
        Poll::Pending
    }
}

/// Future returned by [`Event::wait`].
#[derive(Debug)]
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct Wait<'a> {
    event: &'a Event,
    registered: bool,
    done: bool,
}

impl Future for Wait<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let poll = this.event.poll_plain(&mut this.registered, cx);
        if poll.is_ready() {
            this.done = true;
        }
        poll
    }
}

impl Drop for Wait<'_> {
    fn drop(&mut self) {
        if self.registered && !self.done {
            self.event.reset_if_waiting();
        }
    }
}

/// Future returned by [`Event::wait_until`].
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct WaitUntil<'a> {
    event: &'a Event,
    timed: TimedWait,
    done: bool,
}

impl Future for WaitUntil<'_> {
    type Output = Result<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let poll = this.event.poll_timed(&mut this.timed, cx);
        if poll.is_ready() {
            this.done = true;
        }
        poll
    }
}

impl Drop for WaitUntil<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.timed.disarm();
            if self.timed.started {
                self.event.reset_if_waiting();
            }
        }
    }
}

/// Per-wait bookkeeping shared by every interruptible single-threaded
/// wait: the resolved deadline, the armed scheduler timer and the stop
/// callback, plus the flag the callback records into.
///
/// The callback itself only sets the flag and wakes the task; the status
/// transition happens at the next poll, on the scheduler thread, so a
/// racing `notify` is decided by whichever transition is applied first.
pub(crate) struct TimedWait {
    pub(crate) deadline: Deadline,
    pub(crate) started: bool,
    at: Option<Instant>,
    timer: Option<(Rc<Scheduler>, TimerId)>,
    cancelled: Option<Arc<AtomicBool>>,
    callback: Option<StopCallback>,
}

impl TimedWait {
    pub(crate) fn new(deadline: Deadline) -> Self {
        Self {
            deadline,
            started: false,
            at: None,
            timer: None,
            cancelled: None,
            callback: None,
        }
    }

    /// Arms the timer and the stop callback for this wait.
    pub(crate) fn arm(&mut self, cx: &Context<'_>) {
        self.at = self.deadline.resolve();
        if let Some(at) = self.at {
            let scheduler = runtime::current();
            let id = scheduler.arm_timer(at, cx.waker().clone());
            self.timer = Some((scheduler, id));
        }
        if let Some(token) = self.deadline.token() {
            let flag = Arc::new(AtomicBool::new(false));
            self.cancelled = Some(flag.clone());
            let waker = cx.waker().clone();
            self.callback = Some(token.on_stop(move || {
                flag.store(true, Ordering::Release);
                waker.wake();
            }));
        }
    }

    pub(crate) fn cancel_requested(&self) -> bool {
        match &self.cancelled {
            Some(flag) => flag.load(Ordering::Acquire),
            None => false,
        }
    }

    pub(crate) fn deadline_passed(&self) -> bool {
        matches!(self.at, Some(at) if Instant::now() >= at)
    }

    pub(crate) fn refresh(&mut self, cx: &Context<'_>) {
        if let Some((scheduler, id)) = &self.timer {
            scheduler.refresh_timer(*id, cx.waker());
        }
    }

    /// Stops the timer and drops the stop callback.
    pub(crate) fn disarm(&mut self) {
        if let Some((scheduler, id)) = self.timer.take() {
            scheduler.cancel_timer(id);
        }
        self.callback = None;
    }
}
