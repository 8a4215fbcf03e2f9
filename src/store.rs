//! In-memory task store.
//!
//! Single source of truth for task state. Every mutation runs under the
//! write lock against a copy of the task and is committed whole, so a reader
//! sees either the state before a transition or the state after it.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tracing::warn;

use crate::error::{Error, Result};
use crate::model::{Task, TaskId};

#[derive(Debug, Default)]
struct Inner {
    tasks: HashMap<TaskId, Task>,
    /// Insertion order, for listing.
    order: Vec<TaskId>,
    warned: bool,
}

/// Concurrency-safe map from task ID to task.
///
/// Tasks are never evicted. `retention_warn_at` only controls when the
/// growth is reported.
#[derive(Debug, Default)]
pub struct TaskStore {
    inner: RwLock<Inner>,
    retention_warn_at: Option<usize>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that logs once when it holds `threshold` tasks.
    pub fn with_retention_warning(threshold: usize) -> Self {
        Self {
            inner: RwLock::default(),
            retention_warn_at: Some(threshold),
        }
    }

    /// Insert a new task. Fails if the ID is already present.
    pub fn put(&self, task: Task) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.tasks.contains_key(&task.task_id) {
            return Err(Error::DuplicateTask(task.task_id));
        }
        inner.order.push(task.task_id);
        inner.tasks.insert(task.task_id, task);

        if let Some(threshold) = self.retention_warn_at
            && !inner.warned
            && inner.tasks.len() >= threshold
        {
            inner.warned = true;
            warn!(
                tasks = inner.tasks.len(),
                threshold, "task store reached retention threshold; tasks are never evicted"
            );
        }
        Ok(())
    }

    /// Snapshot of one task.
    pub fn get(&self, id: TaskId) -> Result<Task> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .tasks
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("task {id}")))
    }

    /// Apply `mutator` atomically. Changes are discarded if it returns an error.
    pub fn update<F, T>(&self, id: TaskId, mutator: F) -> Result<T>
    where
        F: FnOnce(&mut Task) -> Result<T>,
    {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let slot = inner
            .tasks
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("task {id}")))?;
        let mut draft = slot.clone();
        let out = mutator(&mut draft)?;
        *slot = draft;
        Ok(out)
    }

    /// Snapshots of every task in submission order.
    pub fn list_all(&self) -> Vec<Task> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .order
            .iter()
            .filter_map(|id| inner.tasks.get(id).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .tasks
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
