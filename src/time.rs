// Copyright 2026 the corio authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Sleeping.
//!
//! All three functions are thin adapters over an ephemeral event whose
//! interruptible wait is driven purely by its deadline: the timer firing
//! is the success case.

use std::time::{Duration, Instant};

use crate::deadline::Deadline;
use crate::error::{Result, TIMEOUT};
use crate::sync::Event;

/// Suspends the current task for `duration`.
///
/// # Panics
///
/// Panics when called outside a runtime.
pub async fn sleep_for(duration: Duration) {
    let result = Event::new().wait_until(duration).await;
    debug_assert_eq!(result.unwrap_err(), TIMEOUT);
}

/// Suspends the current task until `deadline`.
///
/// # Panics
///
/// Panics when called outside a runtime.
pub async fn sleep_until(deadline: Instant) {
    let result = Event::new().wait_until(deadline).await;
    debug_assert_eq!(result.unwrap_err(), TIMEOUT);
}

/// Suspends the current task until the deadline's time limit elapses,
/// unless its stop token fires first.
///
/// The elapsed time limit is the success case here: `Ok(())` means the
/// sleep ran to completion.
///
/// # Errors
///
/// Returns [`CANCEL`](crate::CANCEL) when the stop token fired before the
/// time limit.
pub async fn sleep(deadline: impl Into<Deadline>) -> Result<()> {
    match Event::new().wait_until(deadline).await {
        Err(err) if err == TIMEOUT => Ok(()),
        Err(err) => Err(err),
        Ok(()) => unreachable!("sleep event is never notified"),
    }
}
