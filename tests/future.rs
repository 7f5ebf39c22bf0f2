// Copyright 2026 the corio authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! End-to-end promise/future behavior.

use std::time::{Duration, Instant};

use corio::sync::Promise;
use corio::{BROKEN, Deadline, OTHER, TIMEOUT};

#[test]
fn set_value_then_get() {
    corio::run(async {
        let promise = Promise::new();
        let future = promise.future();
        promise.set_value(42).unwrap();
        assert_eq!(future.get().await.unwrap(), 42);
    });
}

#[test]
fn get_waits_for_producer() {
    corio::run(async {
        let promise = Promise::new();
        let future = promise.future();

        let producer = corio::task::spawn(async move {
            corio::sleep_for(Duration::from_millis(20)).await;
            promise.set_value("done").unwrap();
        });

        let begin = Instant::now();
        assert_eq!(future.get().await.unwrap(), "done");
        assert!(begin.elapsed() >= Duration::from_millis(20));
        producer.join().await;
    });
}

#[test]
fn dropped_promise_breaks_waiters() {
    corio::run(async {
        let promise: Promise<i32> = Promise::new();
        let future = promise.future();
        drop(promise);

        let err = future.get().await.unwrap_err();
        assert_eq!(err, BROKEN);
    });
}

#[test]
fn drop_while_waiting_breaks_waiters() {
    corio::run(async {
        let promise: Promise<i32> = Promise::new();
        let future = promise.future();

        let dropper = corio::task::spawn(async move {
            corio::sleep_for(Duration::from_millis(15)).await;
            drop(promise);
        });

        let err = future.get().await.unwrap_err();
        assert_eq!(err, BROKEN);
        dropper.join().await;
    });
}

#[test]
fn get_until_times_out() {
    corio::run(async {
        let promise: Promise<i32> = Promise::new();
        let future = promise.future();

        let begin = Instant::now();
        let err = future
            .get_until(Duration::from_millis(30))
            .await
            .unwrap_err();
        assert_eq!(err, TIMEOUT);
        assert!(begin.elapsed() >= Duration::from_millis(30));

        // setting still works afterwards; a fresh handle observes it
        promise.set_value(7).unwrap();
        assert_eq!(promise.future().get().await.unwrap(), 7);
    });
}

#[test]
fn value_is_taken_once_but_errors_are_shared() {
    corio::run(async {
        let promise = Promise::new();
        let first = promise.future();
        let second = promise.future();
        promise.set_value(1).unwrap();

        assert_eq!(first.get().await.unwrap(), 1);
        assert_eq!(second.get().await.unwrap_err(), OTHER);

        let promise: Promise<i32> = Promise::new();
        let first = promise.future();
        let second = promise.future();
        drop(promise);

        assert_eq!(first.get().await.unwrap_err(), BROKEN);
        assert_eq!(second.get().await.unwrap_err(), BROKEN);
    });
}

#[test]
fn get_with_unbounded_deadline_behaves_like_get() {
    corio::run(async {
        let promise = Promise::new();
        let future = promise.future();
        promise.set_value(5).unwrap();
        assert_eq!(future.get_until(Deadline::none()).await.unwrap(), 5);
    });
}
