// Copyright 2026 the corio authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! End-to-end channel behavior on a single scheduler.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use corio::sync::Channel;
use corio::{CANCEL, CLOSED, Deadline, StopSource, TIMEOUT};

#[test]
fn push_pop_roundtrip() {
    corio::run(async {
        let ch = Channel::new(1);
        ch.push(41, Deadline::none()).await.unwrap();
        assert_eq!(ch.pop(Deadline::none()).await.unwrap(), 41);
    });
}

#[test]
fn producer_and_racing_consumers_drain_everything() {
    corio::run(async {
        let ch = Channel::new(3);
        let received = Rc::new(RefCell::new(Vec::new()));

        let producer = {
            let ch = ch.clone();
            corio::task::Builder::new().name("producer").spawn(async move {
                for i in 0..10 {
                    ch.push(i, Deadline::none()).await.unwrap();
                }
                ch.close();
            })
        };

        let consumer = |name: &str, delay: Duration| {
            let ch = ch.clone();
            let received = received.clone();
            corio::task::Builder::new().name(name).spawn(async move {
                loop {
                    match ch.pop(Deadline::none()).await {
                        Ok(value) => {
                            received.borrow_mut().push(value);
                            corio::sleep_for(delay).await;
                        }
                        Err(err) => {
                            assert_eq!(err, CLOSED);
                            break;
                        }
                    }
                }
            })
        };

        let begin = Instant::now();
        let slow = consumer("slow", Duration::from_millis(10));
        let fast = consumer("fast", Duration::from_millis(5));
        futures::join!(slow.join(), fast.join(), producer.join());
        let elapsed = begin.elapsed();

        let mut got = received.borrow().clone();
        got.sort_unstable();
        assert_eq!(got, (0..10).collect::<Vec<_>>());
        assert!(elapsed > Duration::from_millis(20), "elapsed {elapsed:?}");
    });
}

#[test]
fn pops_preserve_push_order() {
    corio::run(async {
        let ch = Channel::new(2);
        let producer = {
            let ch = ch.clone();
            corio::task::spawn(async move {
                for i in 0..50 {
                    ch.push(i, Deadline::none()).await.unwrap();
                }
                ch.close();
            })
        };

        let mut expected = 0;
        while let Ok(value) = ch.pop(Deadline::none()).await {
            assert_eq!(value, expected);
            expected += 1;
        }
        assert_eq!(expected, 50);
        producer.join().await;
    });
}

#[test]
fn push_suspends_until_space_appears() {
    corio::run(async {
        let ch = Channel::new(1);
        ch.push(1, Deadline::none()).await.unwrap();

        let consumer = {
            let ch = ch.clone();
            corio::task::spawn(async move {
                corio::sleep_for(Duration::from_millis(30)).await;
                assert_eq!(ch.pop(Deadline::none()).await.unwrap(), 1);
            })
        };

        let begin = Instant::now();
        ch.push(2, Deadline::none()).await.unwrap();
        assert!(begin.elapsed() >= Duration::from_millis(30));
        assert_eq!(ch.pop(Deadline::none()).await.unwrap(), 2);
        consumer.join().await;
    });
}

#[test]
fn close_wakes_pending_pop() {
    corio::run(async {
        let ch = Channel::<i32>::new(1);

        let pending_pop = {
            let ch = ch.clone();
            corio::task::spawn(async move {
                let err = ch.pop(Deadline::none()).await.unwrap_err();
                assert_eq!(err, CLOSED);
            })
        };

        corio::sleep_for(Duration::from_millis(10)).await;
        ch.close();
        pending_pop.join().await;
    });
}

#[test]
fn close_wakes_pending_push_and_buffered_elements_drain() {
    corio::run(async {
        let ch = Channel::new(1);
        ch.push(9, Deadline::none()).await.unwrap();

        let pending_push = {
            let ch = ch.clone();
            corio::task::spawn(async move {
                let err = ch.push(10, Deadline::none()).await.unwrap_err();
                assert_eq!(err, CLOSED);
            })
        };

        corio::sleep_for(Duration::from_millis(10)).await;
        ch.close();
        pending_push.join().await;

        // the buffered element survives the close, then the channel reports it
        assert_eq!(ch.pop(Deadline::none()).await.unwrap(), 9);
        assert_eq!(ch.pop(Deadline::none()).await.unwrap_err(), CLOSED);
        assert!(ch.is_closed());
    });
}

#[test]
fn pop_times_out_on_empty_channel() {
    corio::run(async {
        let ch = Channel::<i32>::new(1);

        let begin = Instant::now();
        let err = ch.pop(Duration::from_millis(40)).await.unwrap_err();
        assert_eq!(err, TIMEOUT);
        assert!(begin.elapsed() >= Duration::from_millis(40));
    });
}

#[test]
fn push_times_out_on_full_channel() {
    corio::run(async {
        let ch = Channel::new(1);
        ch.push(1, Deadline::none()).await.unwrap();

        let err = ch.push(2, Duration::from_millis(30)).await.unwrap_err();
        assert_eq!(err, TIMEOUT);

        // the channel is still consistent
        assert_eq!(ch.pop(Deadline::none()).await.unwrap(), 1);
    });
}

#[test]
fn cancelled_consumer_does_not_strand_elements() {
    corio::run(async {
        let ch = Channel::new(1);
        let source = StopSource::new();

        let cancelled = {
            let ch = ch.clone();
            let token = source.token();
            corio::task::spawn(async move {
                let err = ch.pop(Deadline::cancel(token)).await.unwrap_err();
                assert_eq!(err, CANCEL);
            })
        };

        // let the consumer park, then cancel it
        corio::sleep_for(Duration::from_millis(5)).await;
        source.request_stop();
        cancelled.join().await;

        // an element arriving now must reach a later consumer
        ch.push(77, Deadline::none()).await.unwrap();
        assert_eq!(ch.pop(Duration::from_millis(100)).await.unwrap(), 77);
    });
}
