//! Fixed-size pool of dispatch workers bound to the process lifecycle.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::worker::Worker;
use crate::backend::Backend;
use crate::queue::DispatchQueue;
use crate::store::TaskStore;

/// Running workers. Dropping the pool leaves them running; call
/// [`WorkerPool::shutdown`] to stop them.
pub struct WorkerPool {
    queue: Arc<DispatchQueue>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `size` workers (at least one) draining `queue`.
    pub fn spawn<B: Backend>(
        size: usize,
        store: Arc<TaskStore>,
        queue: Arc<DispatchQueue>,
        backend: B,
    ) -> Self {
        let size = size.max(1);
        let handles = (0..size)
            .map(|index| {
                let worker = Worker::new(
                    index,
                    Arc::clone(&store),
                    Arc::clone(&queue),
                    backend.clone(),
                );
                tokio::spawn(worker.run())
            })
            .collect();
        info!(workers = size, "worker pool started");
        Self { queue, handles }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Close the queue, let in-flight tasks finish, and join every worker.
    pub async fn shutdown(self) {
        let abandoned = self.queue.close();
        if !abandoned.is_empty() {
            warn!(
                count = abandoned.len(),
                "queue closed with tasks still waiting; they stay queued"
            );
        }
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("worker terminated abnormally: {e}");
            }
        }
        info!("worker pool stopped");
    }
}
