// Copyright 2026 the corio authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! FIFO queue of parked waiters, the building block under
//! [`Mutex`](crate::sync::Mutex), [`Condvar`](crate::sync::Condvar) and
//! [`Channel`](crate::sync::Channel).
//!
//! Each waiter owns a one-shot [`Event`]; the queue holds shared handles
//! to the waiters in arrival order. [`notify_one`](WaitQueue::notify_one)
//! wakes strictly in FIFO order, skipping waiters that were already
//! cancelled or timed out. A waiter that is interrupted unlinks itself
//! before its wait returns, and a wait future dropped after it was
//! notified but before the caller saw the result hands the notification to
//! the next waiter, so wakeups are never lost to cancellation.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use crate::deadline::Deadline;
use crate::error::Result;
use crate::sync::event::{Event, TimedWait};

struct Waiter {
    event: Event,
}

/// A FIFO queue of waiting tasks, single-threaded flavor.
#[derive(Default)]
pub struct WaitQueue {
    waiters: RefCell<VecDeque<Rc<Waiter>>>,
}

impl WaitQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks the calling task at the back of the queue until notified.
    /// Not interruptible.
    pub fn wait(&self) -> Wait<'_> {
        Wait {
            queue: self,
            waiter: self.push_waiter(),
            registered: false,
            done: false,
        }
    }

    /// Parks the calling task at the back of the queue until notified, the
    /// deadline elapses, or the stop token fires.
    ///
    /// An interrupted waiter removes itself from the queue before the
    /// future completes.
    pub fn wait_until(&self, deadline: impl Into<Deadline>) -> WaitUntil<'_> {
        WaitUntil {
            queue: self,
            waiter: self.push_waiter(),
            timed: TimedWait::new(deadline.into()),
            done: false,
        }
    }

    /// Wakes the first waiter that can still be notified.
    ///
    /// Waiters that already reached `Cancel`/`Timeout` are dropped
    /// silently. Returns `true` iff some waiter was woken.
    pub fn notify_one(&self) -> bool {
        loop {
            let waiter = self.waiters.borrow_mut().pop_front();
            match waiter {
                Some(waiter) => {
                    if waiter.event.notify() {
                        return true;
                    }
                }
                None => return false,
            }
        }
    }

    /// Wakes every waiter currently in the queue.
    pub fn notify_all(&self) {
        loop {
            let waiter = self.waiters.borrow_mut().pop_front();
            match waiter {
                Some(waiter) => {
                    waiter.event.notify();
                }
                None => return,
            }
        }
    }

    /// Whether no waiter is queued.
    pub fn is_empty(&self) -> bool {
        self.waiters.borrow().is_empty()
    }

    /// Number of queued waiters.
    pub fn len(&self) -> usize {
        self.waiters.borrow().len()
    }

    fn push_waiter(&self) -> Rc<Waiter> {
        let waiter = Rc::new(Waiter {
            event: Event::new(),
        });
        self.waiters.borrow_mut().push_back(waiter.clone());
        waiter
    }

    fn unlink(&self, waiter: &Rc<Waiter>) {
        self.waiters
            .borrow_mut()
            .retain(|queued| !Rc::ptr_eq(queued, waiter));
    }

    /// Cleanup shared by both wait futures when they end early: remove the
    /// waiter, and pass a notification it already consumed on to the next
    /// waiter in line.
    fn release(&self, waiter: &Rc<Waiter>) {
        self.unlink(waiter);
        if waiter.event.is_notified() {
            self.notify_one();
        }
    }
}

impl Drop for WaitQueue {
    fn drop(&mut self) {
        debug_assert!(
            self.waiters.borrow().is_empty(),
            "wait queue dropped with waiters still parked"
        );
    }
}

impl core::fmt::Debug for WaitQueue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WaitQueue")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

/// Future returned by [`WaitQueue::wait`].
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct Wait<'a> {
    queue: &'a WaitQueue,
    waiter: Rc<Waiter>,
    registered: bool,
    done: bool,
}

impl Future for Wait<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let poll = this.waiter.event.poll_plain(&mut this.registered, cx);
        if poll.is_ready() {
            this.done = true;
            this.queue.unlink(&this.waiter);
        }
        poll
    }
}

impl Drop for Wait<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.queue.release(&self.waiter);
        }
    }
}

/// Future returned by [`WaitQueue::wait_until`].
#[must_use = "futures do nothing unless `.await`ed or `poll`ed"]
pub struct WaitUntil<'a> {
    queue: &'a WaitQueue,
    waiter: Rc<Waiter>,
    timed: TimedWait,
    done: bool,
}

impl Future for WaitUntil<'_> {
    type Output = Result<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let poll = this.waiter.event.poll_timed(&mut this.timed, cx);
        if poll.is_ready() {
            this.done = true;
            this.queue.unlink(&this.waiter);
        }
        poll
    }
}

impl Drop for WaitUntil<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.timed.disarm();
            self.queue.release(&self.waiter);
        }
    }
}
