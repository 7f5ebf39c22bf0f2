// Copyright 2026 the corio authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A condition variable for tasks.
//!
//! Thin wrapper over a [`WaitQueue`]: waiters park until notified, and the
//! predicate variants re-check a caller-supplied condition after every
//! wake. There is no associated lock; on a single-threaded scheduler the
//! state a predicate reads cannot change between the check and the
//! suspension.

use crate::deadline::Deadline;
use crate::error::{Result, TIMEOUT};
use crate::sync::WaitQueue;

/// A coroutine-aware condition variable.
///
/// ```no_run
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// corio::run(async {
///     let cv = Rc::new(corio::sync::Condvar::new());
///     let ready = Rc::new(Cell::new(false));
///
///     let producer = {
///         let (cv, ready) = (cv.clone(), ready.clone());
///         corio::task::spawn(async move {
///             ready.set(true);
///             cv.notify_all();
///         })
///     };
///
///     cv.wait_for(|| ready.get()).await;
///     producer.join().await;
/// });
/// ```
#[derive(Debug, Default)]
pub struct Condvar {
    waiters: WaitQueue,
}

impl Condvar {
    /// Creates a condition variable with no waiters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks until notified. The notification must come after the wait
    /// started.
    pub async fn wait(&self) {
        self.waiters.wait().await;
    }

    /// Parks until notified, the deadline elapses, or the stop token
    /// fires.
    ///
    /// # Errors
    ///
    /// Returns [`TIMEOUT`](crate::TIMEOUT) or [`CANCEL`](crate::CANCEL)
    /// when interrupted before a notification arrived.
    pub async fn wait_until(&self, deadline: impl Into<Deadline>) -> Result<()> {
        self.waiters.wait_until(deadline).await
    }

    /// Parks until `predicate` is satisfied, re-checking after every
    /// notification. Returns immediately if it already holds.
    pub async fn wait_for(&self, mut predicate: impl FnMut() -> bool) {
        while !predicate() {
            self.wait().await;
        }
    }

    /// Parks until `predicate` is satisfied or the deadline interrupts the
    /// wait.
    ///
    /// A wait that times out with the predicate now satisfied counts as
    /// success.
    ///
    /// # Errors
    ///
    /// Returns [`TIMEOUT`](crate::TIMEOUT) or [`CANCEL`](crate::CANCEL)
    /// when interrupted with the predicate still unsatisfied.
    pub async fn wait_for_until(
        &self,
        mut predicate: impl FnMut() -> bool,
        deadline: impl Into<Deadline>,
    ) -> Result<()> {
        let deadline = deadline.into();
        while !predicate() {
            match self.waiters.wait_until(deadline.clone()).await {
                Ok(()) => {}
                Err(err) if err == TIMEOUT && predicate() => return Ok(()),
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Wakes one waiter to re-check its predicate.
    pub fn notify_one(&self) {
        self.waiters.notify_one();
    }

    /// Wakes all waiters to re-check their predicates.
    pub fn notify_all(&self) {
        self.waiters.notify_all();
    }
}
