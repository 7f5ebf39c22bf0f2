// Copyright 2026 the corio authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Task lifecycle: spawn, join, detach, cancellation, panics, and the
//! this-task accessors.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use corio::{CANCEL, Deadline, TIMEOUT, this_task};

#[test]
fn join_observes_completion() {
    corio::run(async {
        let done = Rc::new(Cell::new(false));
        let task = {
            let done = done.clone();
            corio::task::spawn(async move {
                corio::sleep_for(Duration::from_millis(10)).await;
                done.set(true);
            })
        };

        assert!(!task.is_joined());
        task.join().await;
        assert!(task.is_joined());
        assert!(done.get());
    });
}

#[test]
fn join_until_times_out_on_a_slow_task() {
    corio::run(async {
        let task = corio::task::spawn(async {
            corio::sleep_for(Duration::from_millis(60)).await;
        });

        let begin = Instant::now();
        let err = task
            .join_until(Duration::from_millis(10))
            .await
            .unwrap_err();
        assert_eq!(err, TIMEOUT);
        assert!(begin.elapsed() >= Duration::from_millis(10));
        assert!(!task.is_joined());

        task.join().await;
        assert!(task.is_joined());
    });
}

#[test]
fn join_until_cancelled_by_token() {
    corio::run(async {
        let task = corio::task::spawn(async {
            corio::sleep_for(Duration::from_millis(60)).await;
        });

        let source = corio::StopSource::new();
        let canceller = {
            let source = source.clone();
            corio::task::spawn(async move {
                corio::sleep_for(Duration::from_millis(10)).await;
                source.request_stop();
            })
        };

        let err = task
            .join_until(Deadline::after(Duration::from_millis(500)).with_token(source.token()))
            .await
            .unwrap_err();
        assert_eq!(err, CANCEL);

        task.join().await;
        canceller.join().await;
    });
}

#[test]
fn multiple_joiners_all_wake() {
    corio::run(async {
        let task = Rc::new(corio::task::spawn(async {
            corio::sleep_for(Duration::from_millis(20)).await;
        }));
        let joined = Rc::new(Cell::new(0));

        let joiner = |task: Rc<corio::task::Task>, joined: Rc<Cell<i32>>| {
            corio::task::spawn(async move {
                task.join().await;
                joined.set(joined.get() + 1);
            })
        };

        let a = joiner(task.clone(), joined.clone());
        let b = joiner(task.clone(), joined.clone());
        futures::join!(task.join(), a.join(), b.join());
        assert_eq!(joined.get(), 2);
    });
}

#[test]
fn detached_task_still_runs() {
    corio::run(async {
        let done = Rc::new(Cell::new(false));
        {
            let done = done.clone();
            corio::task::spawn(async move {
                corio::sleep_for(Duration::from_millis(10)).await;
                done.set(true);
            })
            .detach();
        }

        corio::sleep_for(Duration::from_millis(50)).await;
        assert!(done.get());
    });
}

#[test]
fn stop_token_interrupts_a_sleep() {
    corio::run(async {
        let task = corio::task::spawn(async {
            let begin = Instant::now();
            let err = corio::sleep(
                Deadline::after(Duration::from_millis(500)).with_token(this_task::stop_token()),
            )
            .await
            .unwrap_err();
            assert_eq!(err, CANCEL);
            assert!(begin.elapsed() < Duration::from_millis(500));
        });

        corio::sleep_for(Duration::from_millis(10)).await;
        assert!(task.request_stop());
        task.join().await;
    });
}

#[test]
fn this_task_accessors_reflect_the_builder() {
    corio::run(async {
        let task = corio::task::Builder::new().name("accessors").spawn(async {
            assert_eq!(this_task::name(), "accessors");
            assert!(this_task::id().as_u64() > 0);
            assert!(!this_task::stop_requested());
        });

        assert_eq!(task.name(), "accessors");
        task.join().await;
    });
}

#[test]
fn default_task_names_use_the_id() {
    corio::run(async {
        let task = corio::task::spawn(async {});
        assert_eq!(task.name(), format!("task-{}", task.id()));
        task.join().await;
    });
}

#[test]
fn panicking_task_completes_and_joiners_wake() {
    corio::run(async {
        let task = corio::task::spawn(async {
            corio::sleep_for(Duration::from_millis(5)).await;
            panic!("intentional test panic");
        });

        // the panic is caught at the task boundary; the runtime keeps going
        task.join().await;

        let alive = corio::task::spawn(async {});
        alive.join().await;
    });
}

#[test]
fn nested_run_panics() {
    corio::run(async {
        let result = std::panic::catch_unwind(|| corio::run(async {}));
        assert!(result.is_err());
    });
}

#[test]
#[should_panic(expected = "inside a running task")]
fn this_task_outside_a_task_panics() {
    let _ = this_task::id();
}

#[test]
fn sleep_until_waits_for_the_instant() {
    corio::run(async {
        let at = Instant::now() + Duration::from_millis(30);
        corio::sleep_until(at).await;
        assert!(Instant::now() >= at);
    });
}
