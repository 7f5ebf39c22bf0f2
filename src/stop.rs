// Copyright 2026 the corio authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Cooperative cancellation: [`StopSource`], [`StopToken`] and
//! [`StopCallback`].
//!
//! A [`StopSource`] owns a shared stop state. [`StopToken`]s observe it and
//! may register callbacks that fire exactly once when
//! [`request_stop`](StopSource::request_stop) latches the flag. Requesting
//! a stop and registering callbacks are safe from any OS thread; a callback
//! registered after the stop was requested runs inline before registration
//! returns.

use std::sync::Arc;

use spin::Mutex;

type Callback = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct StopState {
    inner: Mutex<StopInner>,
}

#[derive(Default)]
struct StopInner {
    requested: bool,
    next_id: u64,
    callbacks: Vec<(u64, Callback)>,
}

impl StopState {
    fn request_stop(&self) -> bool {
        let callbacks = {
            let mut inner = self.inner.lock();
            if inner.requested {
                return false;
            }
            inner.requested = true;
            core::mem::take(&mut inner.callbacks)
        };

        // Run outside the lock so a callback may touch the stop state.
        for (_, callback) in callbacks {
            callback();
        }
        true
    }

    fn stop_requested(&self) -> bool {
        self.inner.lock().requested
    }
}

/// Owner side of a shared cancellation flag.
#[derive(Clone, Default)]
pub struct StopSource {
    state: Arc<StopState>,
}

impl StopSource {
    /// Creates a new, un-triggered stop state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an observer handle onto this stop state.
    pub fn token(&self) -> StopToken {
        StopToken {
            state: self.state.clone(),
        }
    }

    /// Latches the stop flag and invokes every registered callback.
    ///
    /// Returns `true` iff this call performed the transition; later calls
    /// are no-ops and return `false`. May be called from any OS thread.
    pub fn request_stop(&self) -> bool {
        self.state.request_stop()
    }

    /// Whether the stop flag has been latched.
    pub fn stop_requested(&self) -> bool {
        self.state.stop_requested()
    }
}

impl core::fmt::Debug for StopSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StopSource")
            .field("stop_requested", &self.stop_requested())
            .finish()
    }
}

/// Observer side of a shared cancellation flag.
#[derive(Clone)]
pub struct StopToken {
    state: Arc<StopState>,
}

impl StopToken {
    /// Whether the stop flag has been latched.
    pub fn stop_requested(&self) -> bool {
        self.state.stop_requested()
    }

    /// Registers `callback` to run when the stop flag is latched.
    ///
    /// If the stop was already requested, `callback` runs inline before
    /// this method returns. Otherwise it runs exactly once inside the
    /// triggering [`request_stop`](StopSource::request_stop) call, unless
    /// the returned [`StopCallback`] guard is dropped first.
    pub fn on_stop(&self, callback: impl FnOnce() + Send + 'static) -> StopCallback {
        let mut inner = self.state.inner.lock();
        if inner.requested {
            drop(inner);
            callback();
            return StopCallback {
                state: self.state.clone(),
                id: None,
            };
        }

        let id = inner.next_id;
        inner.next_id += 1;
        inner.callbacks.push((id, Box::new(callback)));
        drop(inner);

        StopCallback {
            state: self.state.clone(),
            id: Some(id),
        }
    }
}

impl core::fmt::Debug for StopToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StopToken")
            .field("stop_requested", &self.stop_requested())
            .finish()
    }
}

/// Guard for a callback registered with [`StopToken::on_stop`].
///
/// Dropping the guard deregisters the callback if it has not fired yet.
pub struct StopCallback {
    state: Arc<StopState>,
    id: Option<u64>,
}

impl Drop for StopCallback {
    fn drop(&mut self) {
        if let Some(id) = self.id {
            self.state
                .inner
                .lock()
                .callbacks
                .retain(|(cb_id, _)| *cb_id != id);
        }
    }
}

impl core::fmt::Debug for StopCallback {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StopCallback")
            .field("registered", &self.id.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn request_stop_latches_once() {
        let source = StopSource::new();
        let token = source.token();
        assert!(!token.stop_requested());

        assert!(source.request_stop());
        assert!(token.stop_requested());
        assert!(!source.request_stop());
    }

    #[test]
    fn callbacks_fire_in_registration_order() {
        let source = StopSource::new();
        let token = source.token();
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = {
            let order = order.clone();
            token.on_stop(move || order.lock().push(1))
        };
        let second = {
            let order = order.clone();
            token.on_stop(move || order.lock().push(2))
        };

        source.request_stop();
        assert_eq!(*order.lock(), [1, 2]);
        drop((first, second));
    }

    #[test]
    fn late_registration_runs_inline() {
        let source = StopSource::new();
        source.request_stop();

        let fired = Arc::new(AtomicUsize::new(0));
        let guard = {
            let fired = fired.clone();
            source.token().on_stop(move || {
                fired.fetch_add(1, Ordering::SeqCst);
            })
        };
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        drop(guard);
    }

    #[test]
    fn dropped_guard_deregisters() {
        let source = StopSource::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let guard = {
            let fired = fired.clone();
            source.token().on_stop(move || {
                fired.fetch_add(1, Ordering::SeqCst);
            })
        };
        drop(guard);

        source.request_stop();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn request_stop_from_another_thread() {
        let source = StopSource::new();
        let token = source.token();

        let handle = std::thread::spawn(move || {
            source.request_stop();
        });
        handle.join().unwrap();
        assert!(token.stop_requested());
    }
}
