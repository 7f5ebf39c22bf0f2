// Copyright 2026 the corio authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Promise/future: one producer, any number of observers.
//!
//! A [`Promise`] owns the right to set a value (or error) exactly once;
//! every [`Future`] handle obtained from it observes the outcome. Dropping
//! the promise without setting anything stores
//! [`BROKEN`](crate::BROKEN) and wakes all waiters.

use std::cell::RefCell;
use std::rc::Rc;

use crate::deadline::Deadline;
use crate::error::{BROKEN, Error, OTHER, Result};
use crate::sync::Condvar;

enum CellState<T> {
    Empty,
    Value(T),
    Taken,
    Failed(Error),
}

impl<T> CellState<T> {
    fn is_set(&self) -> bool {
        !matches!(self, CellState::Empty)
    }
}

struct Shared<T> {
    cell: RefCell<CellState<T>>,
    cv: Condvar,
}

impl<T> Shared<T> {
    fn is_set(&self) -> bool {
        self.cell.borrow().is_set()
    }

    fn set(&self, state: CellState<T>) -> Result<()> {
        {
            let mut cell = self.cell.borrow_mut();
            if cell.is_set() {
                return Err(Error::with_detail(OTHER, "promise already set"));
            }
            *cell = state;
        }
        self.cv.notify_all();
        Ok(())
    }

    fn take_value(&self) -> Result<T> {
        let mut cell = self.cell.borrow_mut();
        match core::mem::replace(&mut *cell, CellState::Taken) {
            CellState::Value(value) => Ok(value),
            CellState::Failed(err) => {
                // errors stay observable by every handle
                *cell = CellState::Failed(err);
                Err(err)
            }
            CellState::Taken => Err(Error::with_detail(OTHER, "value already taken")),
            CellState::Empty => {
                *cell = CellState::Empty;
                Err(Error::with_detail(OTHER, "value not set"))
            }
        }
    }
}

/// The producing side: sets the shared outcome at most once.
///
/// Move-only; dropping it without setting breaks every outstanding
/// [`Future`].
pub struct Promise<T> {
    shared: Rc<Shared<T>>,
}

impl<T> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Promise<T> {
    /// Creates a promise with a fresh shared state.
    pub fn new() -> Self {
        Self {
            shared: Rc::new(Shared {
                cell: RefCell::new(CellState::Empty),
                cv: Condvar::new(),
            }),
        }
    }

    /// Returns a new observer handle onto this promise's shared state.
    ///
    /// May be called any number of times; every handle sees the same
    /// outcome.
    pub fn future(&self) -> Future<T> {
        Future {
            shared: self.shared.clone(),
        }
    }

    /// Fulfills the promise, waking every waiter.
    ///
    /// # Errors
    ///
    /// Returns [`OTHER`](crate::OTHER) if the promise was already set.
    pub fn set_value(&self, value: T) -> Result<()> {
        self.shared.set(CellState::Value(value))
    }

    /// Fails the promise, waking every waiter.
    ///
    /// # Errors
    ///
    /// Returns [`OTHER`](crate::OTHER) if the promise was already set.
    pub fn set_error(&self, error: Error) -> Result<()> {
        self.shared.set(CellState::Failed(error))
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        // abandoned without a result: break every observer
        let _ = self
            .shared
            .set(CellState::Failed(Error::with_detail(BROKEN, "promise dropped without a result")));
    }
}

impl<T> core::fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Promise")
            .field("set", &self.shared.is_set())
            .finish_non_exhaustive()
    }
}

/// The observing side of a [`Promise`].
pub struct Future<T> {
    shared: Rc<Shared<T>>,
}

impl<T> Future<T> {
    /// Waits for the outcome and takes it.
    ///
    /// The value is moved out once: the first `get` wins, later handles
    /// observe [`OTHER`](crate::OTHER). A stored error (including
    /// [`BROKEN`](crate::BROKEN)) is observed by every handle.
    ///
    /// # Errors
    ///
    /// Returns the error stored by the producer, [`BROKEN`](crate::BROKEN)
    /// if the promise was dropped unset, or [`OTHER`](crate::OTHER) if the
    /// value was already taken.
    pub async fn get(self) -> Result<T> {
        self.shared.cv.wait_for(|| self.shared.is_set()).await;
        self.shared.take_value()
    }

    /// Like [`get`](Self::get), interruptible by a deadline.
    ///
    /// # Errors
    ///
    /// Additionally returns [`TIMEOUT`](crate::TIMEOUT) /
    /// [`CANCEL`](crate::CANCEL) when interrupted before the outcome was
    /// available.
    pub async fn get_until(self, deadline: impl Into<Deadline>) -> Result<T> {
        self.shared
            .cv
            .wait_for_until(|| self.shared.is_set(), deadline)
            .await?;
        self.shared.take_value()
    }

    /// Whether the outcome is already available.
    pub fn is_ready(&self) -> bool {
        self.shared.is_set()
    }
}

impl<T> core::fmt::Debug for Future<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Future")
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_twice_is_other() {
        let promise = Promise::new();
        promise.set_value(1).unwrap();
        assert_eq!(promise.set_value(2).unwrap_err(), OTHER);
        assert_eq!(promise.set_error(Error::new(OTHER)).unwrap_err(), OTHER);
    }

    #[test]
    fn dropping_set_promise_keeps_value() {
        let promise = Promise::new();
        let future = promise.future();
        promise.set_value(5).unwrap();
        drop(promise);
        assert!(future.is_ready());
    }

    #[test]
    fn dropping_unset_promise_breaks_future() {
        let promise: Promise<i32> = Promise::new();
        let future = promise.future();
        drop(promise);
        assert!(future.is_ready());
    }
}
