// Copyright 2026 the corio authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Bounded channel, thread-safe flavor.
//!
//! Same design as [`sync::Channel`](crate::sync::Channel) with one mutex
//! guarding the buffer, the closed flag and both waiter queues. On top of
//! the suspending operations it offers `blocking_*` variants that park the
//! calling OS thread, which is the supported way to feed a scheduler from
//! an OS-thread worker pool.
//!
//! Suspending operations register a waiter under the lock, release the
//! lock across the suspension, and re-acquire it before re-checking, so an
//! OS thread and a task never contend for the lock across an await point.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use static_assertions::assert_impl_all;

use super::wait_queue::{WaitQueue, Waiter};
use crate::deadline::Deadline;
use crate::error::{CLOSED, EMPTY, FULL, Result};

struct Inner<T> {
    queue: VecDeque<T>,
    capacity: usize,
    closed: bool,
    producers: WaitQueue,
    consumers: WaitQueue,
}

impl<T> Inner<T> {
    fn is_full(&self) -> bool {
        self.queue.len() == self.capacity
    }
}

struct State<T> {
    inner: spin::Mutex<Inner<T>>,
}

/// A bounded channel whose endpoints may live on different OS threads.
pub struct Channel<T> {
    state: Arc<State<T>>,
}

assert_impl_all!(Channel<i32>: Send, Sync);

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

#[derive(Clone, Copy)]
enum Side {
    Producer,
    Consumer,
}

/// Covers a parked waiter while its future may be dropped: on drop it
/// unlinks the waiter and, when the waiter had already consumed a
/// notification, forwards that wakeup to the next waiter in line.
struct WaitGuard<'a, T> {
    state: &'a State<T>,
    waiter: Arc<Waiter>,
    side: Side,
    disarmed: bool,
}

impl<T> Drop for WaitGuard<'_, T> {
    fn drop(&mut self) {
        if self.disarmed {
            return;
        }
        let mut inner = self.state.inner.lock();
        let queue = match self.side {
            Side::Producer => &mut inner.producers,
            Side::Consumer => &mut inner.consumers,
        };
        queue.unlink(&self.waiter);
        if self.waiter.event.is_notified() {
            queue.notify_one();
        }
    }
}

impl<T> Channel<T> {
    /// Creates a channel buffering at most `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; rendezvous channels are not
    /// supported.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "channel capacity must be at least 1");
        Self {
            state: Arc::new(State {
                inner: spin::Mutex::new(Inner {
                    queue: VecDeque::with_capacity(capacity),
                    capacity,
                    closed: false,
                    producers: WaitQueue::new(),
                    consumers: WaitQueue::new(),
                }),
            }),
        }
    }

    /// Pushes without suspending or blocking.
    ///
    /// # Errors
    ///
    /// Returns [`CLOSED`](crate::CLOSED) after [`close`](Self::close),
    /// [`FULL`](crate::FULL) when no space is available. The element is
    /// consumed either way.
    pub fn try_push(&self, value: T) -> Result<()> {
        let mut inner = self.state.inner.lock();
        if inner.closed {
            return Err(CLOSED.into());
        }
        if inner.is_full() {
            return Err(FULL.into());
        }
        inner.queue.push_back(value);
        inner.consumers.notify_one();
        Ok(())
    }

    /// Pushes, suspending the task while the channel is full.
    ///
    /// # Errors
    ///
    /// Returns [`CLOSED`](crate::CLOSED) if the channel closes before
    /// space appears, [`TIMEOUT`](crate::TIMEOUT) /
    /// [`CANCEL`](crate::CANCEL) when the deadline interrupts the wait.
    pub async fn push(&self, value: T, deadline: impl Into<Deadline>) -> Result<()> {
        let deadline = deadline.into();
        let mut value = Some(value);
        loop {
            let waiter = {
                let mut inner = self.state.inner.lock();
                if inner.closed {
                    return Err(CLOSED.into());
                }
                if !inner.is_full() {
                    if let Some(value) = value.take() {
                        inner.queue.push_back(value);
                    }
                    inner.consumers.notify_one();
                    return Ok(());
                }
                inner.producers.push_waiter()
            };

            let mut guard = WaitGuard {
                state: &self.state,
                waiter: waiter.clone(),
                side: Side::Producer,
                disarmed: false,
            };
            let result = waiter.event.wait_until(deadline.clone()).await;
            guard.disarmed = true;

            self.state.inner.lock().producers.unlink(&waiter);
            result?;
        }
    }

    /// Pushes, parking the calling OS thread while the channel is full.
    ///
    /// # Errors
    ///
    /// Returns [`CLOSED`](crate::CLOSED) if the channel closes before
    /// space appears.
    pub fn blocking_push(&self, value: T) -> Result<()> {
        self.blocking_push_inner(value, None)
    }

    /// Like [`blocking_push`](Self::blocking_push) with a bound on each
    /// internal wait.
    ///
    /// # Errors
    ///
    /// Additionally returns [`TIMEOUT`](crate::TIMEOUT) when a wait for
    /// space exceeds `timeout`.
    pub fn blocking_push_timeout(&self, value: T, timeout: Duration) -> Result<()> {
        self.blocking_push_inner(value, Some(timeout))
    }

    fn blocking_push_inner(&self, value: T, timeout: Option<Duration>) -> Result<()> {
        let mut value = Some(value);
        loop {
            let waiter = {
                let mut inner = self.state.inner.lock();
                if inner.closed {
                    return Err(CLOSED.into());
                }
                if !inner.is_full() {
                    if let Some(value) = value.take() {
                        inner.queue.push_back(value);
                    }
                    inner.consumers.notify_one();
                    return Ok(());
                }
                inner.producers.push_waiter()
            };

            let result = match timeout {
                Some(timeout) => waiter.event.blocking_wait_timeout(timeout),
                None => {
                    waiter.event.blocking_wait();
                    Ok(())
                }
            };
            self.state.inner.lock().producers.unlink(&waiter);
            result?;
        }
    }

    /// Pops without suspending or blocking.
    ///
    /// # Errors
    ///
    /// On an empty channel, returns [`CLOSED`](crate::CLOSED) after
    /// [`close`](Self::close) and [`EMPTY`](crate::EMPTY) otherwise.
    pub fn try_pop(&self) -> Result<T> {
        let mut inner = self.state.inner.lock();
        match inner.queue.pop_front() {
            Some(value) => {
                inner.producers.notify_one();
                Ok(value)
            }
            None if inner.closed => Err(CLOSED.into()),
            None => Err(EMPTY.into()),
        }
    }

    /// Pops, suspending the task while the channel is empty.
    ///
    /// # Errors
    ///
    /// Returns [`CLOSED`](crate::CLOSED) once the channel is closed and
    /// drained, [`TIMEOUT`](crate::TIMEOUT) / [`CANCEL`](crate::CANCEL)
    /// when the deadline interrupts the wait.
    pub async fn pop(&self, deadline: impl Into<Deadline>) -> Result<T> {
        let deadline = deadline.into();
        loop {
            let waiter = {
                let mut inner = self.state.inner.lock();
                if let Some(value) = inner.queue.pop_front() {
                    inner.producers.notify_one();
                    return Ok(value);
                }
                if inner.closed {
                    return Err(CLOSED.into());
                }
                inner.consumers.push_waiter()
            };

            let mut guard = WaitGuard {
                state: &self.state,
                waiter: waiter.clone(),
                side: Side::Consumer,
                disarmed: false,
            };
            let result = waiter.event.wait_until(deadline.clone()).await;
            guard.disarmed = true;

            let mut inner = self.state.inner.lock();
            inner.consumers.unlink(&waiter);
            if let Err(err) = result {
                // wake another consumer so an element delivered to us while
                // we were being interrupted is not stranded
                inner.consumers.notify_one();
                return Err(err);
            }
        }
    }

    /// Pops, parking the calling OS thread while the channel is empty.
    ///
    /// # Errors
    ///
    /// Returns [`CLOSED`](crate::CLOSED) once the channel is closed and
    /// drained.
    pub fn blocking_pop(&self) -> Result<T> {
        self.blocking_pop_inner(None)
    }

    /// Like [`blocking_pop`](Self::blocking_pop) with a bound on each
    /// internal wait.
    ///
    /// # Errors
    ///
    /// Additionally returns [`TIMEOUT`](crate::TIMEOUT) when a wait for an
    /// element exceeds `timeout`.
    pub fn blocking_pop_timeout(&self, timeout: Duration) -> Result<T> {
        self.blocking_pop_inner(Some(timeout))
    }

    fn blocking_pop_inner(&self, timeout: Option<Duration>) -> Result<T> {
        loop {
            let waiter = {
                let mut inner = self.state.inner.lock();
                if let Some(value) = inner.queue.pop_front() {
                    inner.producers.notify_one();
                    return Ok(value);
                }
                if inner.closed {
                    return Err(CLOSED.into());
                }
                inner.consumers.push_waiter()
            };

            let result = match timeout {
                Some(timeout) => waiter.event.blocking_wait_timeout(timeout),
                None => {
                    waiter.event.blocking_wait();
                    Ok(())
                }
            };

            let mut inner = self.state.inner.lock();
            inner.consumers.unlink(&waiter);
            if let Err(err) = result {
                inner.consumers.notify_one();
                return Err(err);
            }
        }
    }

    /// Closes the channel and wakes every waiting producer and consumer.
    /// Idempotent.
    pub fn close(&self) {
        let mut inner = self.state.inner.lock();
        inner.closed = true;
        inner.producers.notify_all();
        inner.consumers.notify_all();
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.state.inner.lock().closed
    }
}

impl<T> core::fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let inner = self.state.inner.lock();
        f.debug_struct("Channel")
            .field("len", &inner.queue.len())
            .field("capacity", &inner.capacity)
            .field("closed", &inner.closed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_ops_from_plain_threads() {
        let ch = Channel::new(1);
        ch.try_push(7).unwrap();
        assert_eq!(ch.try_push(8).unwrap_err(), FULL);

        let consumer = {
            let ch = ch.clone();
            std::thread::spawn(move || ch.try_pop().unwrap())
        };
        assert_eq!(consumer.join().unwrap(), 7);
    }

    #[test]
    fn blocking_pop_sees_value_from_other_thread() {
        let ch = Channel::new(1);
        let producer = {
            let ch = ch.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(10));
                ch.blocking_push(42).unwrap();
            })
        };

        assert_eq!(ch.blocking_pop().unwrap(), 42);
        producer.join().unwrap();
    }

    #[test]
    fn blocking_pop_timeout_expires() {
        let ch = Channel::<i32>::new(1);
        let err = ch.blocking_pop_timeout(Duration::from_millis(20)).unwrap_err();
        assert_eq!(err, crate::error::TIMEOUT);
    }

    #[test]
    fn blocking_push_unblocks_when_space_appears() {
        let ch = Channel::new(1);
        ch.blocking_push(1).unwrap();

        let producer = {
            let ch = ch.clone();
            std::thread::spawn(move || ch.blocking_push(2))
        };

        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(ch.blocking_pop().unwrap(), 1);
        producer.join().unwrap().unwrap();
        assert_eq!(ch.blocking_pop().unwrap(), 2);
    }

    #[test]
    fn close_unblocks_parked_threads() {
        let ch = Channel::<i32>::new(1);
        let consumer = {
            let ch = ch.clone();
            std::thread::spawn(move || ch.blocking_pop())
        };

        std::thread::sleep(Duration::from_millis(10));
        ch.close();
        assert_eq!(consumer.join().unwrap().unwrap_err(), CLOSED);
    }
}
