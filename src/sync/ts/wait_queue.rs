// Copyright 2026 the corio authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! FIFO waiter queue, thread-safe flavor.
//!
//! Unlike [`sync::WaitQueue`](crate::sync::WaitQueue) this queue has no
//! lock of its own: every method takes `&mut self` and must be called
//! under the mutex of the owning primitive. Waiters park on a
//! [`ts::Event`](super::Event), which is notified under that same lock and
//! wakes either a suspended task or a parked OS thread.

use std::collections::VecDeque;
use std::sync::Arc;

use super::Event;

pub(crate) struct Waiter {
    pub(crate) event: Event,
}

#[derive(Default)]
pub(crate) struct WaitQueue {
    waiters: VecDeque<Arc<Waiter>>,
}

impl WaitQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends a fresh waiter and returns the shared handle the caller
    /// parks on after releasing the lock.
    pub(crate) fn push_waiter(&mut self) -> Arc<Waiter> {
        let waiter = Arc::new(Waiter {
            event: Event::new(),
        });
        self.waiters.push_back(waiter.clone());
        waiter
    }

    pub(crate) fn unlink(&mut self, waiter: &Arc<Waiter>) {
        self.waiters.retain(|queued| !Arc::ptr_eq(queued, waiter));
    }

    /// Wakes the first waiter that can still be notified; `true` iff one
    /// was woken.
    pub(crate) fn notify_one(&mut self) -> bool {
        while let Some(waiter) = self.waiters.pop_front() {
            if waiter.event.notify() {
                return true;
            }
        }
        false
    }

    pub(crate) fn notify_all(&mut self) {
        while let Some(waiter) = self.waiters.pop_front() {
            waiter.event.notify();
        }
    }
}

impl Drop for WaitQueue {
    fn drop(&mut self) {
        debug_assert!(
            self.waiters.is_empty(),
            "wait queue dropped with waiters still parked"
        );
    }
}
