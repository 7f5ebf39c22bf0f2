// Copyright 2026 the corio authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! [`Deadline`]: the carrier that fuses timeouts and cancellation.
//!
//! A deadline is an immutable value holding zero-or-one time limit (an
//! absolute [`Instant`] or a relative [`Duration`]) and zero-or-one
//! [`StopToken`]. Every blocking operation in this crate accepts an
//! `impl Into<Deadline>`, so a bare duration, instant or token works as a
//! short form:
//!
//! ```no_run
//! use std::time::Duration;
//! use corio::{Deadline, StopSource, sync::Event};
//!
//! corio::run(async {
//!     let stop = StopSource::new();
//!     let event = Event::new();
//!
//!     // short form: just a timeout
//!     let _ = event.wait_until(Duration::from_millis(100)).await;
//!     // combined timeout and stop token
//!     let _ = event
//!         .wait_until(Deadline::after(Duration::from_millis(100)).with_token(stop.token()))
//!         .await;
//! });
//! ```

use std::time::{Duration, Instant};

use crate::stop::StopToken;

#[derive(Clone, Copy, Debug, Default)]
enum Limit {
    #[default]
    Unbounded,
    At(Instant),
    After(Duration),
}

/// Interruption conditions for a blocking operation: an optional time
/// limit plus an optional stop token.
#[derive(Clone, Debug, Default)]
pub struct Deadline {
    limit: Limit,
    token: Option<StopToken>,
}

impl Deadline {
    /// No time limit, no stop token: wait indefinitely.
    pub const fn none() -> Self {
        Self {
            limit: Limit::Unbounded,
            token: None,
        }
    }

    /// Expire at an absolute point in time.
    pub const fn at(deadline: Instant) -> Self {
        Self {
            limit: Limit::At(deadline),
            token: None,
        }
    }

    /// Expire after a relative duration, measured from the moment the
    /// operation starts waiting.
    pub const fn after(timeout: Duration) -> Self {
        Self {
            limit: Limit::After(timeout),
            token: None,
        }
    }

    /// No time limit; interruptible by `token` only.
    pub const fn cancel(token: StopToken) -> Self {
        Self {
            limit: Limit::Unbounded,
            token: Some(token),
        }
    }

    /// Attaches a stop token to this deadline.
    #[must_use]
    pub fn with_token(mut self, token: StopToken) -> Self {
        self.token = Some(token);
        self
    }

    /// The stop token, if one is attached.
    pub fn token(&self) -> Option<&StopToken> {
        self.token.as_ref()
    }

    /// Remaining milliseconds until the time limit, measured against the
    /// monotonic clock at call time.
    ///
    /// Returns `None` when no time limit is set. Zero or negative values
    /// mean the deadline has already expired and the operation must not
    /// suspend.
    pub fn milliseconds(&self) -> Option<i64> {
        match self.limit {
            Limit::Unbounded => None,
            Limit::At(at) => {
                let now = Instant::now();
                match at.checked_duration_since(now) {
                    Some(remaining) => Some(clamp_millis(remaining)),
                    None => Some(clamp_millis(now.duration_since(at)).saturating_neg()),
                }
            }
            Limit::After(timeout) => Some(clamp_millis(timeout)),
        }
    }

    /// Whether the time limit has already passed.
    pub fn expired(&self) -> bool {
        matches!(self.milliseconds(), Some(ms) if ms <= 0)
    }

    /// Resolves the time limit to an absolute instant, if one is set.
    ///
    /// Relative limits are anchored at the current instant, so this is
    /// called once when an operation starts waiting.
    pub(crate) fn resolve(&self) -> Option<Instant> {
        match self.limit {
            Limit::Unbounded => None,
            Limit::At(at) => Some(at),
            // a duration too large to represent is as good as unbounded
            Limit::After(timeout) => Instant::now().checked_add(timeout),
        }
    }
}

fn clamp_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

impl From<Duration> for Deadline {
    fn from(timeout: Duration) -> Self {
        Self::after(timeout)
    }
}

impl From<Instant> for Deadline {
    fn from(deadline: Instant) -> Self {
        Self::at(deadline)
    }
}

impl From<StopToken> for Deadline {
    fn from(token: StopToken) -> Self {
        Self::cancel(token)
    }
}
