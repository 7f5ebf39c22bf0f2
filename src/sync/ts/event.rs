// Copyright 2026 the corio authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! One-shot, single-consumer notification, thread-safe flavor.
//!
//! Same state machine as [`sync::Event`](crate::sync::Event), but every
//! status transition is a compare-and-swap on an atomic, so
//! [`notify`](Event::notify) may be called from any OS thread. When notify
//! and an interruption race, the CAS decides and the loser is a no-op.
//!
//! The waker slot distinguishes two waiter kinds: a task suspended on this
//! scheduler (woken through its `Waker`, which enqueues the task and
//! unparks the loop), and a plain OS thread parked in
//! [`blocking_wait`](Event::blocking_wait) (woken through a
//! mutex/condvar pair). The blocking variants exist to bridge OS-thread
//! worker pools into the runtime.

use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::task::{Context, Poll, Waker};
use std::time::Duration;

use static_assertions::assert_impl_all;

use crate::deadline::Deadline;
use crate::error::{CANCEL, Result, TIMEOUT};
use crate::sync::event::TimedWait;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
enum Status {
    Init = 0,
    Waiting = 1,
    Ok = 2,
    Cancel = 3,
    Timeout = 4,
}

impl Status {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Status::Init,
            1 => Status::Waiting,
            2 => Status::Ok,
            3 => Status::Cancel,
            4 => Status::Timeout,
            _ => unreachable!("invalid event status {raw}"),
        }
    }
}

/// Who is waiting on the event.
enum Notify {
    Task(Waker),
    Thread(Arc<ThreadWaiter>),
}

/// Parking spot for an OS thread in `blocking_wait`.
#[derive(Default)]
struct ThreadWaiter {
    notified: Mutex<bool>,
    cvar: Condvar,
}

impl ThreadWaiter {
    fn wake(&self) {
        let mut notified = self
            .notified
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *notified = true;
        self.cvar.notify_one();
    }

    fn park(&self) {
        let mut notified = self
            .notified
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while !*notified {
            notified = self
                .cvar
                .wait(notified)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Parks for up to `timeout`; returns whether a notification arrived.
    fn park_timeout(&self, timeout: Duration) -> bool {
        let notified = self
            .notified
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (notified, _) = self
            .cvar
            .wait_timeout_while(notified, timeout, |notified| !*notified)
            .unwrap_or_else(PoisonError::into_inner);
        *notified
    }
}

/// An interruptible one-shot event whose notifier may live on another OS
/// thread.
#[derive(Default)]
pub struct Event {
    status: AtomicU8,
    waker: spin::Mutex<Option<Notify>>,
}

assert_impl_all!(Event: Send, Sync);

impl Event {
    /// Creates an event in the `Init` state.
    pub fn new() -> Self {
        Self::default()
    }

    fn load(&self) -> Status {
        Status::from_u8(self.status.load(Ordering::Acquire))
    }

    /// CAS-advance of the status; `true` iff this call performed it.
    fn advance(&self, from: Status, to: Status) -> bool {
        self.status
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn take_waiter(&self) -> Option<Notify> {
        self.waker.lock().take()
    }

    fn store_waker(&self, cx: &Context<'_>) {
        let mut slot = self.waker.lock();
        let replace = match &*slot {
            Some(Notify::Task(current)) => !current.will_wake(cx.waker()),
            _ => true,
        };
        if replace {
            *slot = Some(Notify::Task(cx.waker().clone()));
        }
    }

    /// Notifies the waiting side. May be called from any OS thread.
    ///
    /// Returns `true` iff this call effected the transition to `Ok`; every
    /// later call returns `false`. A suspended task waiter is enqueued on
    /// its scheduler, a parked OS thread is unblocked.
    pub fn notify(&self) -> bool {
        if self.advance(Status::Init, Status::Ok) {
            return true;
        }
        if self.advance(Status::Waiting, Status::Ok) {
            match self.take_waiter() {
                Some(Notify::Task(waker)) => waker.wake(),
                Some(Notify::Thread(thread)) => thread.wake(),
                None => {}
            }
            return true;
        }
        false
    }

    /// Whether [`notify`](Self::notify) has succeeded.
    pub fn is_notified(&self) -> bool {
        self.load() == Status::Ok
    }

    /// Waits until the event is notified. Not interruptible.
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
    /// stop token fires; see
    /// [`sync::Event::wait_until`](crate::sync::Event::wait_until) for the
    /// fast paths and result mapping.
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

    /// Parks the calling OS thread until the event is notified.
    ///
    /// Returns immediately if the event already reached a terminal state.
    ///
    /// # Panics
    ///
    /// Panics if another wait is already suspended on this event.
    pub fn blocking_wait(&self) {
        let status = self.load();
        assert!(
            status != Status::Waiting,
            "event is already being awaited"
        );
        if status != Status::Init {
            return;
        }

        let thread = Arc::new(ThreadWaiter::default());
        *self.waker.lock() = Some(Notify::Thread(thread.clone()));
        if self.advance(Status::Init, Status::Waiting) {
            thread.park();
        } else {
            // notified between the check and the transition
            self.take_waiter();
        }
        debug_assert!(self.load() != Status::Waiting);
    }

    /// Parks the calling OS thread until the event is notified or
    /// `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`TIMEOUT`](crate::TIMEOUT) when the timeout elapsed first,
    /// [`CANCEL`](crate::CANCEL) when the event was already cancelled.
    ///
    /// # Panics
    ///
    /// Panics if another wait is already suspended on this event.
    pub fn blocking_wait_timeout(&self, timeout: Duration) -> Result<()> {
        let status = self.load();
        assert!(
            status != Status::Waiting,
            "event is already being awaited"
        );

        if status == Status::Init {
            let thread = Arc::new(ThreadWaiter::default());
            *self.waker.lock() = Some(Notify::Thread(thread.clone()));
            if self.advance(Status::Init, Status::Waiting) {
                if !thread.park_timeout(timeout) {
                    // the CAS decides against a notify arriving right now
                    if self.advance(Status::Waiting, Status::Timeout) {
                        self.take_waiter();
                    }
                }
            } else {
                self.take_waiter();
            }
        }

        match self.load() {
            Status::Ok => Ok(()),
            Status::Cancel => Err(CANCEL.into()),
            Status::Timeout => Err(TIMEOUT.into()),
            Status::Init | Status::Waiting => {
                unreachable!("blocking wait resumed in a non-terminal state")
            }
        }
    }
}

impl core::fmt::Debug for Event {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Event")
            .field("status", &self.load())
            .finish_non_exhaustive()
    }
}

/// Future returned by [`Event::wait`].
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
        loop {
            match this.event.load() {
                Status::Ok => {
                    this.done = true;
                    return Poll::Ready(());
                }
                Status::Cancel | Status::Timeout => {
                    panic!("uninterruptible wait on an event that was interrupted")
                }
                Status::Waiting if !this.registered => panic!("event is already being awaited"),
                Status::Init => {
                    this.event.store_waker(cx);
                    if this.event.advance(Status::Init, Status::Waiting) {
                        this.registered = true;
                        return Poll::Pending;
                    }
                    // someone advanced the status first; retract and retry
                    this.event.take_waiter();
                }
                Status::Waiting => {
                    this.event.store_waker(cx);
                    return Poll::Pending;
                }
            }
        }
    }
}

impl Drop for Wait<'_> {
    fn drop(&mut self) {
        if self.registered && !self.done && self.event.advance(Status::Waiting, Status::Init) {
            self.event.take_waiter();
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
        let event = this.event;
        let timed = &mut this.timed;

        loop {
            match event.load() {
                Status::Ok => {
                    timed.disarm();
                    this.done = true;
                    return Poll::Ready(Ok(()));
                }
                Status::Cancel => {
                    timed.disarm();
                    this.done = true;
                    return Poll::Ready(Err(CANCEL.into()));
                }
                Status::Timeout => {
                    timed.disarm();
                    this.done = true;
                    return Poll::Ready(Err(TIMEOUT.into()));
                }
                Status::Waiting if !timed.started => panic!("event is already being awaited"),
                Status::Init => {
                    // fast path: token already triggered
                    if let Some(token) = timed.deadline.token() {
                        if token.stop_requested() {
                            if event.advance(Status::Init, Status::Cancel) {
                                this.done = true;
                                return Poll::Ready(Err(CANCEL.into()));
                            }
                            continue;
                        }
                    }
                    // fast path: deadline already expired
                    if let Some(ms) = timed.deadline.milliseconds() {
                        if ms <= 0 {
                            if event.advance(Status::Init, Status::Timeout) {
                                this.done = true;
                                return Poll::Ready(Err(TIMEOUT.into()));
                            }
                            continue;
                        }
                    }

                    event.store_waker(cx);
                    if !event.advance(Status::Init, Status::Waiting) {
                        event.take_waiter();
                        continue;
                    }
                    timed.started = true;
                    timed.arm(cx);
                    if timed.cancel_requested() {
                        // the stop callback ran inline during arming
                        continue;
                    }
                    return Poll::Pending;
                }
                Status::Waiting => {
                    if timed.cancel_requested() {
                        if event.advance(Status::Waiting, Status::Cancel) {
                            event.take_waiter();
                        }
                        continue;
                    }
                    if timed.deadline_passed() {
                        if event.advance(Status::Waiting, Status::Timeout) {
                            event.take_waiter();
                        }
                        continue;
                    }
                    event.store_waker(cx);
                    timed.refresh(cx);
                    return Poll::Pending;
                }
            }
        }
    }
}

impl Drop for WaitUntil<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.timed.disarm();
            if self.timed.started && self.event.advance(Status::Waiting, Status::Init) {
                self.event.take_waiter();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stop::StopSource;
    use std::time::Instant;
    use tokio_test::task;
    use tokio_test::{assert_pending, assert_ready, assert_ready_eq, assert_ready_err};

    #[test]
    fn notify_before_wait_completes_immediately() {
        let event = Event::new();
        assert!(event.notify());
        assert!(!event.notify());
        assert!(event.is_notified());

        let mut wait = task::spawn(event.wait());
        assert_ready!(wait.poll());
    }

    #[test]
    fn notify_wakes_registered_waiter() {
        let event = Event::new();
        let mut wait = task::spawn(event.wait());
        assert_pending!(wait.poll());

        assert!(event.notify());
        assert!(wait.is_woken());
        assert_ready!(wait.poll());
    }

    #[test]
    fn triggered_token_cancels_without_suspending() {
        let event = Event::new();
        let source = StopSource::new();
        source.request_stop();

        let mut wait = task::spawn(event.wait_until(source.token()));
        let err = assert_ready_err!(wait.poll());
        assert_eq!(err, CANCEL);
        assert!(!event.notify());
    }

    #[test]
    fn cancel_while_waiting() {
        let event = Event::new();
        let source = StopSource::new();

        let mut wait = task::spawn(event.wait_until(source.token()));
        assert_pending!(wait.poll());

        source.request_stop();
        assert!(wait.is_woken());
        let err = assert_ready_err!(wait.poll());
        assert_eq!(err, CANCEL);
    }

    #[test]
    fn notify_beats_cancel() {
        let event = Event::new();
        let source = StopSource::new();

        let mut wait = task::spawn(event.wait_until(source.token()));
        assert_pending!(wait.poll());

        event.notify();
        source.request_stop();
        assert_ready_eq!(wait.poll(), Ok(()));
    }

    #[test]
    fn blocking_wait_is_woken_from_another_thread() {
        let event = Arc::new(Event::new());
        let notifier = event.clone();

        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            assert!(notifier.notify());
        });

        let begin = Instant::now();
        event.blocking_wait();
        assert!(begin.elapsed() >= Duration::from_millis(20));
        assert!(event.is_notified());
        handle.join().unwrap();
    }

    #[test]
    fn blocking_wait_timeout_expires() {
        let event = Event::new();
        let begin = Instant::now();
        let err = event
            .blocking_wait_timeout(Duration::from_millis(30))
            .unwrap_err();
        assert_eq!(err, TIMEOUT);
        assert!(begin.elapsed() >= Duration::from_millis(30));
        // the terminal state stuck
        assert!(!event.notify());
    }

    #[test]
    fn blocking_wait_timeout_sees_notification() {
        let event = Arc::new(Event::new());
        let notifier = event.clone();

        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            notifier.notify();
        });

        event
            .blocking_wait_timeout(Duration::from_millis(500))
            .unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn blocking_wait_on_notified_event_returns_immediately() {
        let event = Event::new();
        event.notify();
        event.blocking_wait();
        event.blocking_wait_timeout(Duration::from_millis(1)).unwrap();
    }
}
