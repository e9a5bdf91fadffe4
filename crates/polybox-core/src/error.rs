//! Error types for the polygon pipeline.
//!
//! Errors come in two layers:
//!
//! - [`PolygonError`]: why a single polygon could not be fetched or reduced.
//!   These are local to one outcome and never stop other workers.
//! - [`Error`]: why a whole run did not complete. A run fails if any polygon
//!   failed, if the deadline fired, or if fewer outcomes than expected
//!   arrived.
//!
//! ## Error Cases
//! - `Transport`: connection, read or sub-timeout failure talking to the
//!   endpoint.
//! - `Status`: the endpoint answered with a non-200 status.
//! - `Decode`: the body was not a valid polygon document.
//! - `Cancelled`: the run deadline fired mid-fetch or mid-reduction.

use core::time::Duration;

pub type Result<T> = core::result::Result<T, Error>;

/// Failure of a single polygon.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum PolygonError {
    /// Connection, request or body-read failure.
    #[error("transport error: {reason}")]
    Transport { reason: String },

    /// The endpoint did not answer `200 OK`.
    #[error("unexpected response status: {status}")]
    Status { status: u16 },

    /// The body could not be parsed as a polygon.
    #[error("malformed polygon body: {reason}")]
    Decode { reason: String },

    /// The shared deadline fired before the polygon was fully processed.
    #[error("cancelled before completion")]
    Cancelled,
}

impl PolygonError {
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Failure of a whole run.
#[derive(Clone, thiserror::Error, Debug)]
pub enum Error {
    /// At least one polygon failed outright; carries the first one seen.
    #[error("polygon {index} failed: {source}")]
    Polygon {
        index: usize,
        #[source]
        source: PolygonError,
    },

    /// The run deadline fired before every polygon was processed.
    #[error("deadline of {timeout:?} exceeded")]
    DeadlineExceeded { timeout: Duration },

    /// The outcome channel closed early with no failure or timeout to blame.
    #[error("incomplete processing: only {processed} of {total} polygons processed")]
    Incomplete { processed: usize, total: usize },

    /// A pipeline task panicked or was aborted.
    #[error("task error: {context}")]
    TaskError { context: String },

    /// The run was interrupted by the operator.
    #[error("interrupted")]
    Interrupted,
}

impl Error {
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::DeadlineExceeded { .. })
    }
}
