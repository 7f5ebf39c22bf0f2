// Copyright 2026 the corio authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Tasks: independently scheduled units of execution.
//!
//! A task wraps a `Future<Output = ()>` together with an identity, a
//! [`StopSource`] for cooperative cancellation, and a join state that any
//! number of peers may await. Tasks are spawned with [`spawn`] or, when a
//! name is wanted, through [`Builder`]:
//!
//! ```no_run
//! use std::time::Duration;
//!
//! corio::run(async {
//!     let worker = corio::task::Builder::new().name("worker").spawn(async {
//!         corio::sleep_for(Duration::from_millis(10)).await;
//!     });
//!     worker.join().await;
//! });
//! ```
//!
//! A task handle must be either joined or detached before it is dropped;
//! dropping a live handle without doing so logs an error-level diagnostic.

mod id;

use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::task::{Context, Poll, Wake, Waker};

use bitflags::bitflags;

use crate::deadline::Deadline;
use crate::error::{Result, TIMEOUT};
use crate::runtime;
use crate::stop::{StopSource, StopToken};
use crate::sync::WaitQueue;
use crate::this_task;

pub use id::Id;

/// Spawns `future` as a new task on the current scheduler.
///
/// The task is enqueued immediately and starts running on the next
/// scheduler pass.
///
/// # Panics
///
/// Panics when called outside [`run`](crate::run).
pub fn spawn<F>(future: F) -> Task
where
    F: Future<Output = ()> + 'static,
{
    Builder::new().spawn(future)
}

/// Configures a task before spawning it.
#[derive(Debug, Default)]
pub struct Builder<'a> {
    name: Option<&'a str>,
}

impl<'a> Builder<'a> {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the task name.
    ///
    /// By default tasks are named `task-{id}`.
    #[must_use]
    pub fn name(mut self, name: &'a str) -> Self {
        self.name = Some(name);
        self
    }

    /// Spawns `future` with this configuration.
    ///
    /// # Panics
    ///
    /// Panics when called outside [`run`](crate::run).
    pub fn spawn<F>(self, future: F) -> Task
    where
        F: Future<Output = ()> + 'static,
    {
        let scheduler = runtime::current();
        let id = Id::next();
        let name = match self.name {
            Some(name) => name.to_owned(),
            None => format!("task-{id}"),
        };

        let join = Rc::new(JoinState {
            done: Cell::new(false),
            waiters: WaitQueue::new(),
        });
        let future: TaskFuture = Box::pin(future);
        let core = Arc::new(TaskCore {
            id,
            name,
            state: StateCell::new(),
            shared: scheduler.shared().clone(),
            stop: StopSource::new(),
            future: spin::Mutex::new(Some(future)),
            join: spin::Mutex::new(Some(join.clone())),
        });
        tracing::trace!(task.id = %id, task.name = %core.name, "spawning task");

        let enqueue = core.state.transition_to_scheduled();
        debug_assert!(enqueue);
        scheduler.spawn(TaskRef(core.clone()));

        Task {
            core,
            join,
            joined: Cell::new(false),
            detached: Cell::new(false),
        }
    }
}

/// Handle to a spawned task.
///
/// The handle is the join obligation: before dropping it, either
/// [`join`](Self::join) the task or [`detach`](Self::detach) it.
pub struct Task {
    core: Arc<TaskCore>,
    join: Rc<JoinState>,
    joined: Cell<bool>,
    detached: Cell<bool>,
}

impl Task {
    /// The task's unique ID.
    pub fn id(&self) -> Id {
        self.core.id
    }

    /// The task's name.
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Waits until the task body has returned.
    ///
    /// Joining is idempotent: any number of awaiters may wait, and all of
    /// them wake when the task completes.
    pub async fn join(&self) {
        while !self.join.done.get() {
            self.join.waiters.wait().await;
        }
        self.joined.set(true);
    }

    /// Waits until the task body has returned, or the deadline interrupts
    /// the wait.
    ///
    /// # Errors
    ///
    /// Returns [`TIMEOUT`](crate::TIMEOUT) or [`CANCEL`](crate::CANCEL)
    /// when interrupted before the task finished.
    pub async fn join_until(&self, deadline: impl Into<Deadline>) -> Result<()> {
        let deadline = deadline.into();
        while !self.join.done.get() {
            match self.join.waiters.wait_until(deadline.clone()).await {
                Ok(()) => {}
                Err(err) if err == TIMEOUT && self.join.done.get() => break,
                Err(err) => return Err(err),
            }
        }
        self.joined.set(true);
        Ok(())
    }

    /// Whether a join on this handle has completed.
    pub fn is_joined(&self) -> bool {
        self.joined.get()
    }

    /// Relinquishes the join obligation; the task keeps running on its
    /// own.
    pub fn detach(self) {
        self.detached.set(true);
    }

    /// Requests a cooperative stop. Returns `true` iff this call latched
    /// the stop flag.
    pub fn request_stop(&self) -> bool {
        self.core.stop.request_stop()
    }

    /// The task's stop source.
    pub fn stop_source(&self) -> StopSource {
        self.core.stop.clone()
    }

    /// A stop token observing the task's stop source.
    pub fn stop_token(&self) -> StopToken {
        self.core.stop.token()
    }
}

impl Drop for Task {
    fn drop(&mut self) {
        if !self.detached.get() && !self.joined.get() {
            tracing::error!(
                task.id = %self.core.id,
                task.name = %self.core.name,
                "task handle dropped without join or detach"
            );
        }
    }
}

impl core::fmt::Debug for Task {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.core.id)
            .field("name", &self.core.name)
            .field("joined", &self.joined.get())
            .finish_non_exhaustive()
    }
}

// === internals ===

type TaskFuture = Pin<Box<dyn Future<Output = ()> + 'static>>;

/// Outcome of one scheduler pass over a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PollOutcome {
    /// The task body returned (or panicked); the scheduler drops its
    /// reference and decrements the live count.
    Completed,
    /// The task suspended; whoever holds its waker will re-enqueue it.
    Pending,
}

/// Reference-counted pointer to a spawned task, as stored in the ready
/// queue.
#[derive(Clone)]
pub(crate) struct TaskRef(Arc<TaskCore>);

impl TaskRef {
    pub(crate) fn id(&self) -> Id {
        self.0.id
    }

    pub(crate) fn run(&self) -> PollOutcome {
        TaskCore::run(&self.0)
    }
}

impl core::fmt::Debug for TaskRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TaskRef").field("id", &self.0.id).finish()
    }
}

/// Join shared-state: a done flag plus the queue of joiners.
pub(crate) struct JoinState {
    done: Cell<bool>,
    waiters: WaitQueue,
}

/// The task storage proper.
///
/// The atomic `state` and the `shared` back-handle are what wakers touch,
/// possibly from other OS threads. The `future` and `join` slots hold
/// thread-bound values (`Rc`, non-`Send` futures); they are only ever
/// accessed on the scheduler thread, and both are cleared there when the
/// task completes, before completion is published.
pub(crate) struct TaskCore {
    id: Id,
    name: String,
    state: StateCell,
    shared: Arc<runtime::Shared>,
    stop: StopSource,
    future: spin::Mutex<Option<TaskFuture>>,
    join: spin::Mutex<Option<Rc<JoinState>>>,
}

// Safety: the `future` and `join` slots are only accessed (and, at
// completion, emptied) on the scheduler thread; every other field is
// inherently Send + Sync. A foreign thread holding the last reference can
// only ever drop the emptied slots.
unsafe impl Send for TaskCore {}
// Safety: see the Send impl; shared access from other threads goes through
// the atomic state and the run queue only.
unsafe impl Sync for TaskCore {}

impl TaskCore {
    pub(crate) fn id(&self) -> Id {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn stop_token(&self) -> StopToken {
        self.stop.token()
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop.stop_requested()
    }

    fn run(this: &Arc<Self>) -> PollOutcome {
        this.state.transition_to_running();
        let waker = Waker::from(this.clone());
        let mut cx = Context::from_waker(&waker);
        let _ctx = this_task::enter(this.clone());

        let poll = {
            let mut slot = this.future.lock();
            let Some(future) = slot.as_mut() else {
                debug_assert!(false, "polled a task without a body");
                return PollOutcome::Pending;
            };
            panic::catch_unwind(AssertUnwindSafe(|| future.as_mut().poll(&mut cx)))
        };

        match poll {
            Ok(Poll::Pending) => {
                if !this.state.transition_to_idle() {
                    // woken during its own poll: run again on the next pass
                    this.shared.schedule(TaskRef(this.clone()));
                }
                PollOutcome::Pending
            }
            Ok(Poll::Ready(())) => {
                this.complete();
                PollOutcome::Completed
            }
            Err(payload) => {
                tracing::error!(
                    task.id = %this.id,
                    task.name = %this.name,
                    "task panicked: {}",
                    panic_message(payload.as_ref()),
                );
                this.complete();
                PollOutcome::Completed
            }
        }
    }

    /// Tears the task down on the scheduler thread: the body and join slot
    /// are released here, before joiners can observe completion.
    fn complete(&self) {
        *self.future.lock() = None;
        self.state.complete();
        let join = self.join.lock().take();
        if let Some(join) = join {
            join.done.set(true);
            join.waiters.notify_all();
        }
    }
}

impl Wake for TaskCore {
    fn wake(self: Arc<Self>) {
        Self::wake_by_ref(&self);
    }

    fn wake_by_ref(self: &Arc<Self>) {
        if self.state.transition_to_scheduled() {
            tracing::trace!(task.id = %self.id, "waking task");
            self.shared.schedule(TaskRef(self.clone()));
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    struct State: u8 {
        /// Sitting in the ready queue.
        const SCHEDULED = 1 << 0;
        /// Currently being polled.
        const RUNNING   = 1 << 1;
        /// Woken while `RUNNING`; re-enqueue after the poll.
        const NOTIFIED  = 1 << 2;
        /// The body has returned.
        const COMPLETE  = 1 << 3;
    }
}

/// The task lifecycle state.
///
/// The protocol guarantees a task is enqueued at most once between polls:
/// wakeups while `SCHEDULED` are no-ops, wakeups while `RUNNING` coalesce
/// into a single `NOTIFIED` bit that the scheduler converts back into one
/// enqueue after the poll.
struct StateCell(AtomicU8);

impl StateCell {
    fn new() -> Self {
        Self(AtomicU8::new(State::empty().bits()))
    }

    fn load(&self) -> State {
        State::from_bits_retain(self.0.load(Ordering::Acquire))
    }

    fn compare_exchange(&self, current: State, new: State) -> core::result::Result<State, State> {
        self.0
            .compare_exchange(current.bits(), new.bits(), Ordering::AcqRel, Ordering::Acquire)
            .map(State::from_bits_retain)
            .map_err(State::from_bits_retain)
    }

    /// Records a wakeup. Returns `true` iff the caller must enqueue the
    /// task.
    fn transition_to_scheduled(&self) -> bool {
        let mut current = self.load();
        loop {
            if current.intersects(State::COMPLETE | State::SCHEDULED | State::NOTIFIED) {
                return false;
            }
            let next = if current.contains(State::RUNNING) {
                current | State::NOTIFIED
            } else {
                current | State::SCHEDULED
            };
            match self.compare_exchange(current, next) {
                Ok(_) => return !current.contains(State::RUNNING),
                Err(actual) => current = actual,
            }
        }
    }

    fn transition_to_running(&self) {
        self.0.store(State::RUNNING.bits(), Ordering::Release);
    }

    /// Parks the task after a pending poll. Returns `false` when a wakeup
    /// arrived during the poll, in which case the caller re-enqueues.
    fn transition_to_idle(&self) -> bool {
        let mut current = self.load();
        loop {
            debug_assert!(current.contains(State::RUNNING));
            let (next, parked) = if current.contains(State::NOTIFIED) {
                (State::SCHEDULED, false)
            } else {
                (State::empty(), true)
            };
            match self.compare_exchange(current, next) {
                Ok(_) => return parked,
                Err(actual) => current = actual,
            }
        }
    }

    fn complete(&self) {
        self.0.store(State::COMPLETE.bits(), Ordering::Release);
    }
}
