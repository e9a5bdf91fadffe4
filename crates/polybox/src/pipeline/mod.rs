//! The fetch-reduce-aggregate pipeline.
//!
//! ```text
//!  dispatch ──► index queue ──► WorkerPool (W workers) ──► outcomes ──► aggregate ──► Report
//!      ▲                              ▲                                    ▲
//!      └──────────── Deadline (CancellationToken, fires once) ─────────────┘
//! ```
//!
//! [`run`] wires the stages together for one run and races the aggregator
//! against the deadline. The run ends in exactly one of three states:
//! completed (`Ok(Report)`), timed out ([`Error::DeadlineExceeded`]) or
//! failed (any other [`Error`]).

pub mod aggregator;
pub mod deadline;
pub mod dispatcher;
pub mod outcome;
pub mod pool;
mod worker;

use crate::source::PolygonSource;
use aggregator::aggregate;
use core::{num::NonZeroUsize, time::Duration};
use deadline::Deadline;
use dispatcher::{dispatch, index_channel};
use outcome::PolygonOutcome;
use polybox_core::{DEFAULT_POLL_INTERVAL, Error, PolygonReducer, Report, Result};
use pool::WorkerPool;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};

/// Settings for a single pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Number of polygons; indices `0..polygons` are fetched.
    pub polygons: usize,
    /// Number of concurrent workers.
    pub workers: usize,
    /// Hard limit on the whole run.
    pub timeout: Duration,
    /// Capacity of the worker -> aggregator channel.
    pub outcome_buffer: usize,
    /// Reducer cancellation polling interval, in points.
    pub poll_interval: NonZeroUsize,
}

impl PipelineConfig {
    pub fn new(polygons: usize, workers: usize, timeout: Duration) -> Self {
        Self {
            polygons,
            workers,
            timeout,
            outcome_buffer: 100,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Runs the pipeline once against `source`.
///
/// Settles as soon as the aggregator does or the deadline fires, whichever
/// comes first, then waits for the dispatcher and workers to exit. On timeout
/// in-flight fetches are abandoned: their futures observe the cancelled token
/// and the workers exit without finishing them. Dropping the returned future
/// cancels the run the same way.
///
/// # Errors
///
/// - [`Error::DeadlineExceeded`] if the timeout elapsed first.
/// - [`Error::Polygon`] if any polygon failed.
/// - [`Error::TaskError`] if a worker or the dispatcher panicked.
/// - [`Error::Incomplete`] if outcomes stopped arriving for no visible reason.
pub async fn run<S: PolygonSource>(config: &PipelineConfig, source: Arc<S>) -> Result<Report> {
    let deadline = Deadline::start(config.timeout);

    tracing::info!(
        "Processing {} polygons with {} workers (timeout {:?})",
        config.polygons,
        config.workers,
        config.timeout
    );

    let (index_tx, queue) = index_channel(config.polygons);
    let (outcome_tx, outcome_rx) =
        mpsc::channel::<PolygonOutcome>(config.outcome_buffer.clamp(1, Semaphore::MAX_PERMITS));

    let dispatcher = tokio::spawn(dispatch(config.polygons, index_tx, deadline.token()));

    let pool = WorkerPool::spawn(
        config.workers.max(1),
        queue,
        source,
        PolygonReducer::new(config.poll_interval),
        outcome_tx,
        deadline.token(),
    );

    let res = tokio::select! {
        biased;

        () = deadline.expired() => Err(Error::DeadlineExceeded { timeout: deadline.timeout() }),
        res = aggregate(outcome_rx, config.polygons, &deadline) => res,
    };

    // Every exit path above leaves the workers with nothing left to wait on:
    // the queue is drained and closed, the outcome receiver is gone, or the
    // token has fired.
    let joined = match dispatcher.await {
        Ok(dispatched) => {
            tracing::debug!("Dispatched {dispatched} of {} indices", config.polygons);
            pool.join().await
        }
        Err(e) => {
            tracing::error!("Dispatcher failed: {e}");
            pool.join().await.and(Err(Error::TaskError {
                context: format!("dispatcher: {e}"),
            }))
        }
    };

    // A lost task explains an otherwise incomplete run; a polygon failure or
    // the deadline still take precedence.
    let res = match (res, joined) {
        (Err(Error::Incomplete { .. }), Err(task_error)) => Err(task_error),
        (res, _) => res,
    };

    match &res {
        Ok(report) => tracing::info!(
            "Completed {} polygons: max weight {}, {} heavy",
            config.polygons,
            report.max_weight,
            report.heavy_polygons.len()
        ),
        Err(e) if e.is_timeout() => tracing::error!("Run timed out: {e}"),
        Err(e) => tracing::error!("Run failed: {e}"),
    }

    res
}
