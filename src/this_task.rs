// Copyright 2026 the corio authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Accessors for the currently running task.
//!
//! The scheduler installs a per-thread pointer to the task storage for the
//! duration of each poll and clears it afterwards, so these accessors are
//! usable from anywhere inside a task body without passing a handle
//! around. The pointer never survives a suspension point: it is scoped to
//! the poll call itself.

use std::cell::RefCell;
use std::sync::Arc;

use crate::stop::StopToken;
use crate::task::{Id, TaskCore};

thread_local! {
    static CURRENT_TASK: RefCell<Option<Arc<TaskCore>>> = const { RefCell::new(None) };
}

/// Name of the current task.
///
/// # Panics
///
/// Panics when called outside a running task.
pub fn name() -> String {
    with_current(|task| task.name().to_owned())
}

/// ID of the current task.
///
/// # Panics
///
/// Panics when called outside a running task.
pub fn id() -> Id {
    with_current(TaskCore::id)
}

/// Stop token of the current task.
///
/// # Panics
///
/// Panics when called outside a running task.
pub fn stop_token() -> StopToken {
    with_current(TaskCore::stop_token)
}

/// Whether the current task has been asked to stop.
///
/// # Panics
///
/// Panics when called outside a running task.
pub fn stop_requested() -> bool {
    with_current(TaskCore::stop_requested)
}

fn with_current<T>(f: impl FnOnce(&TaskCore) -> T) -> T {
    CURRENT_TASK.with(|current| {
        let current = current.borrow();
        let task = current
            .as_ref()
            .expect("this_task accessors are only available inside a running task");
        f(task)
    })
}

/// Installs `task` as the current task for the duration of the returned
/// guard (one poll).
pub(crate) fn enter(task: Arc<TaskCore>) -> ContextGuard {
    let previous = CURRENT_TASK.with(|current| current.borrow_mut().replace(task));
    ContextGuard { previous }
}

pub(crate) struct ContextGuard {
    previous: Option<Arc<TaskCore>>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_TASK.with(|current| {
            *current.borrow_mut() = previous;
        });
    }
}
