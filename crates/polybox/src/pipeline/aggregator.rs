//! Single-consumer aggregation of polygon outcomes.
//!
//! [`Aggregator`] folds [`PolygonOutcome`]s into the running [`Report`]. Only
//! one task ever owns it, so no locking is involved. [`aggregate`] drives it
//! from the outcome channel until every expected outcome has arrived or the
//! channel closes.

use super::{deadline::Deadline, outcome::PolygonOutcome};
use core::time::Duration;
use polybox_core::{BoundingBox, Error, Polygon, PolygonError, Report, Result};
use tokio::sync::mpsc;

#[derive(Debug)]
pub struct Aggregator {
    expected: usize,
    bbox: Option<BoundingBox>,
    max_weight: Option<f64>,
    heavy_polygons: Vec<Polygon>,
    reduced: usize,
    received: usize,
    first_error: Option<(usize, PolygonError)>,
}

impl Aggregator {
    pub const fn new(expected: usize) -> Self {
        Self {
            expected,
            bbox: None,
            max_weight: None,
            heavy_polygons: Vec::new(),
            reduced: 0,
            received: 0,
            first_error: None,
        }
    }

    /// Folds one outcome into the running result.
    pub fn record(&mut self, outcome: PolygonOutcome) {
        self.received += 1;

        match outcome {
            PolygonOutcome::Reduced {
                index,
                summary,
                polygon,
            } => {
                self.bbox = BoundingBox::merge(self.bbox, summary.bbox);
                self.max_weight = Some(match self.max_weight {
                    Some(max) => max.max(summary.weight),
                    None => summary.weight,
                });
                if summary.heavy {
                    match polygon {
                        Some(polygon) => self.heavy_polygons.push(polygon),
                        None => tracing::error!("Heavy polygon {index} arrived without points"),
                    }
                }
                self.reduced += 1;
            }
            PolygonOutcome::Failed { index, error } => {
                if error.is_cancelled() {
                    tracing::debug!("Polygon {index} cancelled");
                } else {
                    tracing::warn!("Polygon {index} failed: {error}");
                }
                // Cancellations are a symptom of the deadline, not a cause.
                let replace = match &self.first_error {
                    None => true,
                    Some((_, first)) => first.is_cancelled() && !error.is_cancelled(),
                };
                if replace {
                    self.first_error = Some((index, error));
                }
            }
        }
    }

    /// True once every expected outcome has been received.
    pub const fn is_settled(&self) -> bool {
        self.received >= self.expected
    }

    pub const fn received(&self) -> usize {
        self.received
    }

    /// Finalizes the run.
    ///
    /// `timed_out` carries the run timeout if the deadline fired.
    ///
    /// # Errors
    ///
    /// When fewer than `expected` polygons were reduced, in priority order:
    /// - [`Error::Polygon`] with the first outright polygon failure,
    /// - [`Error::DeadlineExceeded`] if the deadline fired,
    /// - [`Error::Polygon`] with a cancellation seen without the deadline,
    /// - [`Error::Incomplete`] otherwise.
    pub fn finish(self, timed_out: Option<Duration>) -> Result<Report> {
        if self.reduced >= self.expected {
            return Ok(Report {
                bbox: self.bbox,
                max_weight: self.max_weight.unwrap_or(0.0),
                heavy_polygons: self.heavy_polygons,
            });
        }

        match (self.first_error, timed_out) {
            (Some((index, source)), _) if !source.is_cancelled() => {
                Err(Error::Polygon { index, source })
            }
            (_, Some(timeout)) => Err(Error::DeadlineExceeded { timeout }),
            (Some((index, source)), None) => Err(Error::Polygon { index, source }),
            (None, None) => Err(Error::Incomplete {
                processed: self.reduced,
                total: self.expected,
            }),
        }
    }
}

/// Drains `outcomes` into an [`Aggregator`].
///
/// Returns as soon as `expected` outcomes have been received, without waiting
/// for the channel to close. Otherwise keeps draining after failures so no
/// worker blocks on a full channel, and settles when the last worker drops its
/// sender.
pub async fn aggregate(
    mut outcomes: mpsc::Receiver<PolygonOutcome>,
    expected: usize,
    deadline: &Deadline,
) -> Result<Report> {
    let mut aggregator = Aggregator::new(expected);

    while !aggregator.is_settled() {
        match outcomes.recv().await {
            Some(outcome) => aggregator.record(outcome),
            None => {
                tracing::debug!(
                    "Outcome channel closed after {} of {expected} outcomes",
                    aggregator.received()
                );
                break;
            }
        }
    }

    let timed_out = deadline.is_expired().then(|| deadline.timeout());
    aggregator.finish(timed_out)
}
