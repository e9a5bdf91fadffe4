//! Index dispatch.
//!
//! [`dispatch`] feeds polygon indices `0..total` into a bounded channel and
//! closes it when done or when the deadline fires. Workers pull from the
//! shared [`IndexQueue`]; the receiver sits behind an async mutex so each
//! index is handed to exactly one worker.

use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore, mpsc};
use tokio_util::sync::CancellationToken;

/// Creates the bounded index channel. Capacity is `total` so the dispatcher
/// never waits on slow workers; indices are plain integers.
///
/// Capacity is clamped to what a Tokio channel can hold.
pub fn index_channel(total: usize) -> (mpsc::Sender<usize>, IndexQueue) {
    let (tx, rx) = mpsc::channel(total.clamp(1, Semaphore::MAX_PERMITS));
    (tx, IndexQueue::new(rx))
}

/// Enqueues `0..total`, stopping early on cancellation.
///
/// Returns the number of indices enqueued. The sender is dropped on return,
/// which closes the queue so idle workers observe end-of-input.
pub async fn dispatch(total: usize, tx: mpsc::Sender<usize>, cancelled: CancellationToken) -> usize {
    let mut sent = 0;

    for index in 0..total {
        tokio::select! {
            biased;

            () = cancelled.cancelled() => {
                tracing::debug!("Dispatcher cancelled after {sent} of {total} indices");
                break;
            }
            res = tx.send(index) => {
                if res.is_err() {
                    tracing::debug!("Index queue closed after {sent} of {total} indices");
                    break;
                }
                sent += 1;
            }
        }
    }

    tracing::trace!("Dispatcher finished ({sent} indices)");
    sent
}

/// Multi-consumer view of the index channel.
#[derive(Clone)]
pub struct IndexQueue {
    rx: Arc<Mutex<mpsc::Receiver<usize>>>,
}

impl IndexQueue {
    pub fn new(rx: mpsc::Receiver<usize>) -> Self {
        Self {
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    /// Next undispatched index, or `None` once the queue is closed and empty.
    ///
    /// Cancel-safe: if the returned future is dropped before completion no
    /// index is lost.
    pub async fn next(&self) -> Option<usize> {
        self.rx.lock().await.recv().await
    }
}
