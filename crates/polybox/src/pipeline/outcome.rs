//! Per-polygon messages sent from workers to the aggregator.

use polybox_core::{Polygon, PolygonError, PolygonSummary};

/// The result of fetching and reducing one polygon.
///
/// Exactly one outcome is emitted per dispatched index, unless the deadline
/// fires first.
#[derive(Debug)]
pub enum PolygonOutcome {
    /// The polygon was fetched and reduced.
    ///
    /// `polygon` is only retained for heavy polygons; other point lists are
    /// dropped by the worker right after reduction.
    Reduced {
        index: usize,
        summary: PolygonSummary,
        polygon: Option<Polygon>,
    },

    /// Fetching or reducing the polygon failed.
    Failed { index: usize, error: PolygonError },
}

impl PolygonOutcome {
    /// Builds a success outcome, keeping the point list only when heavy.
    pub fn reduced(index: usize, summary: PolygonSummary, polygon: Polygon) -> Self {
        Self::Reduced {
            index,
            summary,
            polygon: summary.heavy.then_some(polygon),
        }
    }
}
