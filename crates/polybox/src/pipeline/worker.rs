//! Worker task logic.
//!
//! Each worker pulls indices from the shared [`IndexQueue`], fetches the
//! polygon from a [`PolygonSource`], reduces it and reports one
//! [`PolygonOutcome`]. Every wait is raced against the run deadline.

use super::{dispatcher::IndexQueue, outcome::PolygonOutcome};
use crate::source::PolygonSource;
use polybox_core::{Polygon, PolygonError, PolygonReducer, PolygonSummary};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Asynchronous task representing a single worker's lifecycle.
///
/// Each worker repeatedly takes the next index from the shared queue, fetches
/// and reduces that polygon, and sends exactly one [`PolygonOutcome`] to the
/// aggregator. It exits cleanly when either:
/// - The index queue is closed and drained,
/// - The outcome channel is closed,
/// - The deadline token is cancelled (checked before every wait).
///
/// Returns the number of outcomes this worker delivered.
///
/// # Arguments
/// - `worker_id`: Identifier used for logging.
/// - `queue`: Shared index queue; each index is taken by exactly one worker.
/// - `source`: Where polygons are fetched from.
/// - `reducer`: Reducer carrying the cancellation polling interval.
/// - `outcomes`: This worker's clone of the outcome sender.
/// - `cancelled`: The run deadline token.
pub(crate) async fn worker_loop<S: PolygonSource>(
    worker_id: usize,
    queue: IndexQueue,
    source: Arc<S>,
    reducer: PolygonReducer,
    outcomes: mpsc::Sender<PolygonOutcome>,
    cancelled: CancellationToken,
) -> usize {
    tracing::debug!("Worker {worker_id} started");
    let mut delivered = 0;

    loop {
        let index = tokio::select! {
            biased;

            () = cancelled.cancelled() => {
                tracing::debug!("Worker {worker_id} shutdown via deadline");
                break;
            }
            next = queue.next() => match next {
                Some(index) => index,
                None => {
                    tracing::debug!("Worker {worker_id} index queue closed");
                    break;
                }
            },
        };

        let outcome = process_polygon(index, source.as_ref(), reducer, &cancelled).await;

        tokio::select! {
            biased;

            () = cancelled.cancelled() => {
                tracing::debug!("Worker {worker_id} abandoning outcome for polygon {index}");
                break;
            }
            res = outcomes.send(outcome) => {
                if let Err(_e) = res {
                    tracing::debug!("Worker {worker_id} outcome channel closed");
                    break;
                }
                delivered += 1;
            }
        }
    }

    tracing::debug!("Worker {worker_id} stopped after {delivered} polygons");
    delivered
}

/// Fetches and reduces one polygon.
///
/// The fetch is raced against the deadline so a slow endpoint cannot outlive
/// the run. Polygons larger than one poll interval are reduced on the blocking
/// pool; smaller ones are folded inline.
///
/// # Arguments
/// - `index`: Polygon index to fetch.
/// - `source`: Where the polygon is fetched from.
/// - `reducer`: Reducer to fold the points with.
/// - `cancelled`: The run deadline token, polled during reduction.
pub(crate) async fn process_polygon<S: PolygonSource>(
    index: usize,
    source: &S,
    reducer: PolygonReducer,
    cancelled: &CancellationToken,
) -> PolygonOutcome {
    let fetched = tokio::select! {
        biased;

        () = cancelled.cancelled() => Err(PolygonError::Cancelled),
        res = source.fetch(index) => res,
    };

    let polygon = match fetched {
        Ok(polygon) => polygon,
        Err(error) => return PolygonOutcome::Failed { index, error },
    };

    let (polygon, reduced) = if polygon.len() <= reducer.poll_interval().get() {
        let reduced = reducer.reduce(&polygon.points, || cancelled.is_cancelled());
        (polygon, reduced)
    } else {
        match reduce_blocking(polygon, reducer, cancelled.clone()).await {
            Some(res) => res,
            None => {
                return PolygonOutcome::Failed {
                    index,
                    error: PolygonError::Cancelled,
                };
            }
        }
    };

    match reduced {
        Ok(summary) => PolygonOutcome::reduced(index, summary, polygon),
        Err(error) => PolygonOutcome::Failed { index, error },
    }
}

type Reduced = (Polygon, Result<PolygonSummary, PolygonError>);

/// Runs the reduction on Tokio's blocking pool, handing ownership of the
/// polygon there and back. Returns `None` if the runtime is shutting down.
async fn reduce_blocking(
    polygon: Polygon,
    reducer: PolygonReducer,
    cancelled: CancellationToken,
) -> Option<Reduced> {
    let res = tokio::task::spawn_blocking(move || {
        let reduced = reducer.reduce(&polygon.points, || cancelled.is_cancelled());
        (polygon, reduced)
    })
    .await;

    match res {
        Ok(reduced) => Some(reduced),
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(_) => None,
    }
}
