// Copyright 2026 the corio authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A mutual-exclusion primitive for tasks.
//!
//! Unlike an OS mutex, a contended [`lock`](Mutex::lock) suspends the task
//! instead of blocking the thread. Unlock hands the lock directly to the
//! next waiter: the `locked` flag stays set and the woken task resumes as
//! the owner, so no other task can slip in between release and
//! re-acquisition.

use crate::deadline::Deadline;
use crate::error::Result;
use crate::sync::WaitQueue;
use std::cell::Cell;

/// A coroutine-aware mutex.
///
/// There is no guard type: the holder releases explicitly with
/// [`unlock`](Mutex::unlock).
///
/// ```no_run
/// corio::run(async {
///     let mutex = corio::sync::Mutex::new();
///     mutex.lock().await;
///     // ... critical section ...
///     mutex.unlock();
/// });
/// ```
#[derive(Debug, Default)]
pub struct Mutex {
    locked: Cell<bool>,
    waiters: WaitQueue,
}

impl Mutex {
    /// Creates an unlocked mutex.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock, suspending while it is held elsewhere.
    pub async fn lock(&self) {
        if self.try_lock() {
            return;
        }
        // being notified by `unlock` transfers ownership to us
        self.waiters.wait().await;
    }

    /// Acquires the lock, giving up when the deadline elapses or the stop
    /// token fires.
    ///
    /// # Errors
    ///
    /// Returns [`TIMEOUT`](crate::TIMEOUT) or [`CANCEL`](crate::CANCEL)
    /// when interrupted; the lock is not acquired in that case.
    pub async fn lock_until(&self, deadline: impl Into<Deadline>) -> Result<()> {
        if self.try_lock() {
            return Ok(());
        }
        self.waiters.wait_until(deadline).await
    }

    /// Acquires the lock if it is free, without suspending.
    pub fn try_lock(&self) -> bool {
        if self.locked.get() {
            return false;
        }
        self.locked.set(true);
        true
    }

    /// Whether the lock is currently held.
    pub fn is_locked(&self) -> bool {
        self.locked.get()
    }

    /// Releases the lock, handing it to the next waiter if there is one.
    ///
    /// Unlocking a mutex that is not held is a contract violation; it is
    /// diagnosed with a `debug_assert` and otherwise ignored.
    pub fn unlock(&self) {
        debug_assert!(self.locked.get(), "unlock of an unlocked mutex");
        if !self.locked.get() {
            return;
        }

        // hand-off: the flag stays set for the woken waiter
        if !self.waiters.notify_one() {
            self.locked.set(false);
        }
    }
}

impl Drop for Mutex {
    fn drop(&mut self) {
        debug_assert!(!self.locked.get(), "mutex dropped while locked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::task;
    use tokio_test::{assert_pending, assert_ready};

    #[test]
    fn lock_unlock_try_lock_roundtrip() {
        let mutex = Mutex::new();
        assert!(mutex.try_lock());
        assert!(mutex.is_locked());
        assert!(!mutex.try_lock());
        mutex.unlock();
        assert!(!mutex.is_locked());
        assert!(mutex.try_lock());
        mutex.unlock();
    }

    #[test]
    fn unlock_hands_off_to_waiter() {
        let mutex = Mutex::new();
        assert!(mutex.try_lock());

        let mut waiting = task::spawn(mutex.lock());
        assert_pending!(waiting.poll());

        mutex.unlock();
        // the lock never became observably free
        assert!(mutex.is_locked());
        assert!(waiting.is_woken());
        assert_ready!(waiting.poll());
        assert!(mutex.is_locked());

        mutex.unlock();
        assert!(!mutex.is_locked());
    }

    #[test]
    fn handoff_is_fifo() {
        let mutex = Mutex::new();
        assert!(mutex.try_lock());

        let mut first = task::spawn(mutex.lock());
        let mut second = task::spawn(mutex.lock());
        assert_pending!(first.poll());
        assert_pending!(second.poll());

        mutex.unlock();
        assert!(first.is_woken());
        assert!(!second.is_woken());
        assert_ready!(first.poll());

        mutex.unlock();
        assert_ready!(second.poll());
        mutex.unlock();
    }
}
