// Copyright 2026 the corio authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Parking: how the scheduler blocks when it runs out of work.
//!
//! [`Park`] is the seam between the scheduler and the platform. The
//! scheduler calls [`park`](Park::park) (or
//! [`park_timeout`](Park::park_timeout) when a timer is pending) once its
//! ready queue is drained, and anything that makes a task runnable from
//! another OS thread calls [`unpark`](Park::unpark). An implementation
//! that polls an I/O source instead of a condition variable turns the
//! runtime into an I/O event loop; [`StdPark`] is the dependency-free
//! reference used by [`run`](crate::run).

use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// A pluggable blocking primitive for the scheduler thread.
///
/// `unpark` may be called from any OS thread and must wake a concurrent or
/// subsequent `park`. Spurious wakeups are permitted; the scheduler always
/// re-checks its queues after waking.
pub trait Park: Send + Sync + 'static {
    /// Blocks the calling thread until [`unpark`](Self::unpark) is called.
    fn park(&self);

    /// Blocks the calling thread until [`unpark`](Self::unpark) is called
    /// or `timeout` elapses.
    fn park_timeout(&self, timeout: Duration);

    /// Wakes the thread blocked in [`park`](Self::park), or makes the next
    /// `park` return immediately.
    fn unpark(&self);
}

/// [`Park`] implementation over a standard mutex and condition variable.
///
/// A latched token absorbs unparks that arrive while the scheduler is not
/// parked, so wakeups are never lost.
#[derive(Debug, Default)]
pub struct StdPark {
    notified: Mutex<bool>,
    cvar: Condvar,
}

impl StdPark {
    /// Creates a new, un-notified parker.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, bool> {
        self.notified
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Park for StdPark {
    fn park(&self) {
        let mut notified = self.lock();
        while !*notified {
            notified = self
                .cvar
                .wait(notified)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
        *notified = false;
    }

    fn park_timeout(&self, timeout: Duration) {
        let mut notified = self.lock();
        if !*notified {
            let (guard, _) = self
                .cvar
                .wait_timeout(notified, timeout)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            notified = guard;
        }
        *notified = false;
    }

    fn unpark(&self) {
        *self.lock() = true;
        self.cvar.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn unpark_before_park_is_not_lost() {
        let park = StdPark::new();
        park.unpark();
        // must return immediately
        park.park();
    }

    #[test]
    fn park_timeout_returns() {
        let park = StdPark::new();
        let begin = Instant::now();
        park.park_timeout(Duration::from_millis(20));
        assert!(begin.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn unpark_wakes_parked_thread() {
        let park = Arc::new(StdPark::new());
        let unparker = park.clone();

        let handle = std::thread::spawn(move || {
            park.park();
        });
        std::thread::sleep(Duration::from_millis(10));
        unparker.unpark();
        handle.join().unwrap();
    }
}
