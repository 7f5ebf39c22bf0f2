// Copyright 2026 the corio authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Bridging the runtime with other OS threads: thread-safe events and
//! channels.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use corio::sync::ts;
use corio::{CLOSED, Deadline};

#[test]
fn many_cross_thread_notifications() {
    const EVENTS: usize = 100;

    corio::run(async {
        let events: Arc<Vec<ts::Event>> =
            Arc::new((0..EVENTS).map(|_| ts::Event::new()).collect());

        let notifiers: Vec<_> = (0..EVENTS)
            .map(|i| {
                let events = events.clone();
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(2));
                    assert!(events[i].notify());
                })
            })
            .collect();

        for event in events.iter() {
            let res = event.wait_until(Duration::from_millis(2000)).await;
            assert!(res.is_ok());
        }
        for event in events.iter() {
            assert!(event.is_notified());
        }

        for handle in notifiers {
            handle.join().unwrap();
        }
    });
}

#[test]
fn os_thread_feeds_a_task_through_the_channel() {
    corio::run(async {
        let ch = ts::Channel::new(4);

        let producer = {
            let ch = ch.clone();
            thread::spawn(move || {
                for i in 0..20 {
                    ch.blocking_push(i).unwrap();
                }
                ch.close();
            })
        };

        let mut received = Vec::new();
        loop {
            match ch.pop(Duration::from_millis(2000)).await {
                Ok(value) => received.push(value),
                Err(err) => {
                    assert_eq!(err, CLOSED);
                    break;
                }
            }
        }
        // a single producer is observed in FIFO order
        assert_eq!(received, (0..20).collect::<Vec<_>>());
        producer.join().unwrap();
    });
}

#[test]
fn task_feeds_an_os_thread_through_the_channel() {
    corio::run(async {
        let ch = ts::Channel::new(2);

        let consumer = {
            let ch: ts::Channel<i32> = ch.clone();
            thread::spawn(move || {
                let mut received = Vec::new();
                loop {
                    match ch.blocking_pop() {
                        Ok(value) => received.push(value),
                        Err(err) => {
                            assert_eq!(err, CLOSED);
                            break;
                        }
                    }
                }
                received
            })
        };

        for i in 0..10 {
            ch.push(i, Deadline::none()).await.unwrap();
        }
        ch.close();

        let received = consumer.join().unwrap();
        assert_eq!(received, (0..10).collect::<Vec<_>>());
    });
}

#[test]
fn cross_thread_event_latency_is_bounded() {
    corio::run(async {
        let event = Arc::new(ts::Event::new());
        let notifier = {
            let event = event.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                event.notify();
            })
        };

        let begin = Instant::now();
        let res = event.wait_until(Duration::from_millis(2000)).await;
        let elapsed = begin.elapsed();

        assert!(res.is_ok());
        assert!(elapsed >= Duration::from_millis(20), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(2000), "elapsed {elapsed:?}");
        notifier.join().unwrap();
    });
}

#[test]
fn blocking_event_bridge_from_task_to_thread() {
    corio::run(async {
        let event = Arc::new(ts::Event::new());
        let waiter = {
            let event = event.clone();
            thread::spawn(move || {
                let begin = Instant::now();
                event.blocking_wait();
                begin.elapsed()
            })
        };

        corio::sleep_for(Duration::from_millis(15)).await;
        assert!(event.notify());

        let waited = waiter.join().unwrap();
        assert!(waited >= Duration::from_millis(10), "waited {waited:?}");
    });
}
