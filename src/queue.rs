//! FIFO dispatch queue of task IDs.
//!
//! Workers block in [`DispatchQueue::pop`] until an ID arrives or the queue
//! is closed. Every popped ID must be acknowledged with
//! [`DispatchQueue::task_done`] so [`DispatchQueue::wait_idle`] can resolve.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use opentelemetry::KeyValue;
use tokio::sync::Notify;

use crate::error::{Error, Result};
use crate::model::TaskId;
use crate::telemetry::metrics;

#[derive(Debug, Default)]
struct State {
    items: VecDeque<TaskId>,
    /// Pushed but not yet acknowledged.
    unfinished: usize,
    closed: bool,
}

#[derive(Debug, Default)]
pub struct DispatchQueue {
    state: Mutex<State>,
    available: Notify,
    idle: Notify,
}

impl DispatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an ID. Fails once the queue is closed.
    pub fn push(&self, id: TaskId) -> Result<()> {
        self.push_with(id, || Ok(()))
    }

    /// Run `register` and append `id` as one step with respect to [`close`].
    ///
    /// `register` is not called once the queue is closed, and nothing is
    /// appended if it fails.
    ///
    /// [`close`]: DispatchQueue::close
    pub fn push_with<F>(&self, id: TaskId, register: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        {
            let mut state = self.lock();
            if state.closed {
                return Err(Error::QueueClosed);
            }
            register()?;
            state.items.push_back(id);
            state.unfinished += 1;
        }
        self.available.notify_one();
        metrics::queue_operations().add(1, &[KeyValue::new("operation", "push")]);
        Ok(())
    }

    /// Take the oldest ID, waiting if the queue is empty.
    ///
    /// Returns `None` once the queue is closed, even if IDs remain.
    pub async fn pop(&self) -> Option<TaskId> {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if state.closed {
                    return None;
                }
                if let Some(id) = state.items.pop_front() {
                    drop(state);
                    metrics::queue_operations().add(1, &[KeyValue::new("operation", "pop")]);
                    return Some(id);
                }
            }

            notified.await;
        }
    }

    /// Acknowledge one popped ID, whatever its outcome.
    pub fn task_done(&self) {
        let mut state = self.lock();
        state.unfinished = state.unfinished.saturating_sub(1);
        if state.unfinished == 0 {
            drop(state);
            self.idle.notify_waiters();
        }
    }

    /// Resolve once every pushed ID has been acknowledged or abandoned.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.lock().unfinished == 0 {
                return;
            }

            notified.await;
        }
    }

    /// Close the queue. Blocked and future pops return `None`.
    ///
    /// Returns the IDs that were still waiting; they are never dispatched.
    pub fn close(&self) -> Vec<TaskId> {
        let abandoned: Vec<TaskId> = {
            let mut state = self.lock();
            state.closed = true;
            let abandoned: Vec<TaskId> = state.items.drain(..).collect();
            state.unfinished = state.unfinished.saturating_sub(abandoned.len());
            abandoned
        };
        self.available.notify_waiters();
        if self.lock().unfinished == 0 {
            self.idle.notify_waiters();
        }
        metrics::queue_operations().add(1, &[KeyValue::new("operation", "close")]);
        abandoned
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// IDs waiting for a worker.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
