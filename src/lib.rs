// Copyright 2026 the corio authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A single-threaded cooperative async runtime with interruptible
//! synchronization primitives.
//!
//! A scheduler owns one OS thread and runs tasks — plain Rust futures —
//! cooperatively on it. Every blocking operation (events, channels,
//! mutexes, condition variables, promise/future, sleeping, joining)
//! accepts a [`Deadline`] fusing an optional time limit with an optional
//! [`StopToken`], and reports interruption through one shared
//! status-code discipline ([`CANCEL`], [`TIMEOUT`], ...).
//!
//! ```no_run
//! use std::time::Duration;
//!
//! corio::run(async {
//!     let ch = corio::sync::Channel::new(3);
//!
//!     let producer = {
//!         let ch = ch.clone();
//!         corio::task::Builder::new().name("producer").spawn(async move {
//!             for i in 0..10 {
//!                 ch.push(i, corio::Deadline::none()).await.unwrap();
//!             }
//!             ch.close();
//!         })
//!     };
//!
//!     while let Ok(value) = ch.pop(Duration::from_millis(100)).await {
//!         println!("received {value}");
//!     }
//!     producer.join().await;
//! });
//! ```

mod deadline;
mod error;
mod park;
mod runtime;
mod stop;

pub mod sync;
pub mod task;
pub mod this_task;
pub mod time;

pub use deadline::Deadline;
pub use error::{
    BROKEN, CANCEL, CLOSED, CORE, Category, EMPTY, Error, FULL, NET, OTHER, Result, StatusCode,
    TIMEOUT, net,
};
pub use park::{Park, StdPark};
pub use runtime::{run, run_with_park};
pub use stop::{StopCallback, StopSource, StopToken};
pub use time::{sleep, sleep_for, sleep_until};
