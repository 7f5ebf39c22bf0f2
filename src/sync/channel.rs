// Copyright 2026 the corio authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Bounded channel, single-threaded flavor.
//!
//! A fixed-capacity ring of `T` shared between any number of producer and
//! consumer tasks on one scheduler. The channel value is a cheap handle:
//! cloning shares the underlying state.
//!
//! Once [`close`](Channel::close) is called no push succeeds, and
//! consumers drain the buffered elements before observing
//! [`CLOSED`](crate::CLOSED).

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::deadline::Deadline;
use crate::error::{CLOSED, EMPTY, FULL, Result};
use crate::sync::WaitQueue;

struct Buffer<T> {
    queue: VecDeque<T>,
    capacity: usize,
    closed: bool,
}

impl<T> Buffer<T> {
    fn is_full(&self) -> bool {
        self.queue.len() == self.capacity
    }
}

struct State<T> {
    buffer: RefCell<Buffer<T>>,
    producers: WaitQueue,
    consumers: WaitQueue,
}

/// A bounded channel for tasks sharing a scheduler.
///
/// ```no_run
/// corio::run(async {
///     let ch = corio::sync::Channel::new(2);
///
///     let producer = {
///         let ch = ch.clone();
///         corio::task::spawn(async move {
///             for i in 0..10 {
///                 ch.push(i, corio::Deadline::none()).await.unwrap();
///             }
///             ch.close();
///         })
///     };
///
///     while let Ok(value) = ch.pop(corio::Deadline::none()).await {
///         println!("got {value}");
///     }
///     producer.join().await;
/// });
/// ```
pub struct Channel<T> {
    state: Rc<State<T>>,
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
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
            state: Rc::new(State {
                buffer: RefCell::new(Buffer {
                    queue: VecDeque::with_capacity(capacity),
                    capacity,
                    closed: false,
                }),
                producers: WaitQueue::new(),
                consumers: WaitQueue::new(),
            }),
        }
    }

    /// Pushes without suspending.
    ///
    /// # Errors
    ///
    /// Returns [`CLOSED`](crate::CLOSED) after [`close`](Self::close),
    /// [`FULL`](crate::FULL) when no space is available. The element is
    /// consumed either way.
    pub fn try_push(&self, value: T) -> Result<()> {
        {
            let mut buffer = self.state.buffer.borrow_mut();
            if buffer.closed {
                return Err(CLOSED.into());
            }
            if buffer.is_full() {
                return Err(FULL.into());
            }
            buffer.queue.push_back(value);
        }
        self.state.consumers.notify_one();
        Ok(())
    }

    /// Pushes, suspending while the channel is full.
    ///
    /// # Errors
    ///
    /// Returns [`CLOSED`](crate::CLOSED) if the channel closes before
    /// space appears, [`TIMEOUT`](crate::TIMEOUT) /
    /// [`CANCEL`](crate::CANCEL) when the deadline interrupts the wait.
    pub async fn push(&self, value: T, deadline: impl Into<Deadline>) -> Result<()> {
        let deadline = deadline.into();
        loop {
            {
                let buffer = self.state.buffer.borrow();
                if buffer.closed {
                    return Err(CLOSED.into());
                }
                if !buffer.is_full() {
                    break;
                }
            }
            self.state.producers.wait_until(deadline.clone()).await?;
        }

        // no suspension point between the check above and this insert
        let mut buffer = self.state.buffer.borrow_mut();
        debug_assert!(!buffer.is_full());
        buffer.queue.push_back(value);
        drop(buffer);
        self.state.consumers.notify_one();
        Ok(())
    }

    /// Pops without suspending.
    ///
    /// # Errors
    ///
    /// On an empty channel, returns [`CLOSED`](crate::CLOSED) after
    /// [`close`](Self::close) and [`EMPTY`](crate::EMPTY) otherwise.
    pub fn try_pop(&self) -> Result<T> {
        let mut buffer = self.state.buffer.borrow_mut();
        match buffer.queue.pop_front() {
            Some(value) => {
                drop(buffer);
                self.state.producers.notify_one();
                Ok(value)
            }
            None => {
                if buffer.closed {
                    Err(CLOSED.into())
                } else {
                    Err(EMPTY.into())
                }
            }
        }
    }

    /// Pops, suspending while the channel is empty.
    ///
    /// # Errors
    ///
    /// Returns [`CLOSED`](crate::CLOSED) once the channel is closed and
    /// drained, [`TIMEOUT`](crate::TIMEOUT) / [`CANCEL`](crate::CANCEL)
    /// when the deadline interrupts the wait.
    pub async fn pop(&self, deadline: impl Into<Deadline>) -> Result<T> {
        let deadline = deadline.into();
        loop {
            {
                let mut buffer = self.state.buffer.borrow_mut();
                if let Some(value) = buffer.queue.pop_front() {
                    drop(buffer);
                    self.state.producers.notify_one();
                    return Ok(value);
                }
                if buffer.closed {
                    return Err(CLOSED.into());
                }
            }
            if let Err(err) = self.state.consumers.wait_until(deadline.clone()).await {
                // wake another consumer so an element delivered to us while
                // we were being interrupted is not stranded
                self.state.consumers.notify_one();
                return Err(err);
            }
        }
    }

    /// Closes the channel and wakes every waiting producer and consumer.
    /// Idempotent.
    pub fn close(&self) {
        self.state.buffer.borrow_mut().closed = true;
        self.state.producers.notify_all();
        self.state.consumers.notify_all();
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.state.buffer.borrow().closed
    }
}

impl<T> core::fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let buffer = self.state.buffer.borrow();
        f.debug_struct("Channel")
            .field("len", &buffer.queue.len())
            .field("capacity", &buffer.capacity)
            .field("closed", &buffer.closed)
            .finish_non_exhaustive()
    }
}
