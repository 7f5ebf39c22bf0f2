// Copyright 2026 the corio authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Awaitable synchronization primitives.
//!
//! The types at this level are single-threaded: they coordinate tasks that
//! share one scheduler and are deliberately not [`Sync`]. The [`ts`]
//! submodule holds the thread-safe variants for coordinating with other OS
//! threads.
//!
//! Every blocking operation takes an `impl Into<`[`Deadline`]`>` and
//! reports interruption as [`CANCEL`](crate::CANCEL) or
//! [`TIMEOUT`](crate::TIMEOUT).
//!
//! [`Deadline`]: crate::Deadline

mod channel;
mod condvar;
pub(crate) mod event;
mod future;
mod mutex;
pub mod ts;
mod wait_queue;

pub use channel::Channel;
pub use condvar::Condvar;
pub use event::{Event, Wait, WaitUntil};
pub use future::{Future, Promise};
pub use mutex::Mutex;
pub use wait_queue::WaitQueue;

use static_assertions::assert_not_impl_any;

// The single-threaded primitives must never be shared across OS threads.
assert_not_impl_any!(Event: Sync);
assert_not_impl_any!(WaitQueue: Send, Sync);
assert_not_impl_any!(Mutex: Send, Sync);
assert_not_impl_any!(Condvar: Send, Sync);
assert_not_impl_any!(Channel<i32>: Send, Sync);
assert_not_impl_any!(Promise<i32>: Send, Sync);
