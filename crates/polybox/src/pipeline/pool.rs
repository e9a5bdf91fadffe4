//! Fixed-size worker pool.
//!
//! [`WorkerPool::spawn`] starts `num_workers` Tokio tasks that share one
//! [`IndexQueue`] and one outcome channel. The pool keeps no sender of its
//! own: each worker owns a clone, so the outcome channel closes only after the
//! last worker has exited. The aggregator can therefore never observe a
//! closed channel while an outcome is still in flight.

use super::{dispatcher::IndexQueue, outcome::PolygonOutcome, worker::worker_loop};
use crate::source::PolygonSource;
use polybox_core::{Error, PolygonReducer};
use std::sync::Arc;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

pub struct WorkerPool {
    workers: Vec<JoinHandle<usize>>,
}

impl WorkerPool {
    /// Spawns the workers. `outcomes` is consumed so that its only remaining
    /// clones belong to the workers.
    ///
    /// # Arguments
    /// - `num_workers`: Number of worker tasks to spawn.
    /// - `queue`: Index queue shared by every worker.
    /// - `source`: Polygon source shared by every worker.
    /// - `reducer`: Reducer copied into each worker.
    /// - `outcomes`: Outcome sender; each worker gets its own clone.
    /// - `cancelled`: The run deadline token.
    pub fn spawn<S: PolygonSource>(
        num_workers: usize,
        queue: IndexQueue,
        source: Arc<S>,
        reducer: PolygonReducer,
        outcomes: mpsc::Sender<PolygonOutcome>,
        cancelled: CancellationToken,
    ) -> Self {
        let workers = (0..num_workers)
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    worker_id,
                    queue.clone(),
                    Arc::clone(&source),
                    reducer,
                    outcomes.clone(),
                    cancelled.clone(),
                ))
            })
            .collect();

        Self { workers }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Waits for every worker to exit.
    ///
    /// Returns the total number of outcomes the workers delivered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TaskError`] if a worker panicked or was aborted.
    pub async fn join(self) -> Result<usize, Error> {
        let results = futures::future::join_all(self.workers).await;

        let mut delivered = 0;
        for (worker_id, res) in results.into_iter().enumerate() {
            match res {
                Ok(n) => delivered += n,
                Err(e) => {
                    tracing::error!("Worker {worker_id} failed: {e}");
                    return Err(Error::TaskError {
                        context: format!("worker {worker_id}: {e}"),
                    });
                }
            }
        }

        Ok(delivered)
    }
}
