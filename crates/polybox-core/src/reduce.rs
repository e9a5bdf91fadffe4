//! Single-pass polygon reduction.
//!
//! [`PolygonReducer`] folds a polygon's points into a [`PolygonSummary`]:
//! local bounding box, total weight and the heavy flag. A polygon may carry a
//! million points, so the fold polls a caller-supplied cancellation check
//! every `poll_interval` elements and bails out with
//! [`PolygonError::Cancelled`] instead of returning a partial summary.

use crate::{BoundingBox, HEAVY_WEIGHT_THRESHOLD, PolygonError, PolygonSummary, WeightedPoint};
use core::num::NonZeroUsize;


/// Default number of points folded between two cancellation checks.
pub const DEFAULT_POLL_INTERVAL: NonZeroUsize = NonZeroUsize::new(1024).unwrap();

/// Reduces point sequences to a [`PolygonSummary`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PolygonReducer {
    poll_interval: NonZeroUsize,
}

impl Default for PolygonReducer {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl PolygonReducer {
    pub const fn new(poll_interval: NonZeroUsize) -> Self {
        Self { poll_interval }
    }

    pub const fn poll_interval(&self) -> NonZeroUsize {
        self.poll_interval
    }

    /// Folds `points` left to right.
    ///
    /// `is_cancelled` is consulted before the first point and then once every
    /// `poll_interval` points. Weight is a plain running sum, so the result is
    /// deterministic for a given point order.
    ///
    /// # Errors
    ///
    /// Returns [`PolygonError::Cancelled`] as soon as `is_cancelled` reports
    /// true. No partial bounding box or weight is ever returned.
    pub fn reduce<C>(
        &self,
        points: &[WeightedPoint],
        is_cancelled: C,
    ) -> Result<PolygonSummary, PolygonError>
    where
        C: Fn() -> bool,
    {
        let Some(first) = points.first() else {
            return Ok(PolygonSummary::EMPTY);
        };

        let mut bbox = BoundingBox::from_point(first.point());
        let mut weight = 0.0_f64;

        for chunk in points.chunks(self.poll_interval.get()) {
            if is_cancelled() {
                return Err(PolygonError::Cancelled);
            }
            for p in chunk {
                weight += p.weight;
                bbox.extend(p.point());
            }
        }

        Ok(PolygonSummary {
            bbox: Some(bbox),
            weight,
            heavy: weight >= HEAVY_WEIGHT_THRESHOLD,
        })
    }
}
