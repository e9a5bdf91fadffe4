#![allow(dead_code)]

use core::time::Duration;
use polybox::source::PolygonSource;
use polybox_core::{Polygon, PolygonError, WeightedPoint};
use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

/// In-memory polygon source with an optional per-fetch delay.
pub struct MemorySource {
    polygons: Vec<Result<Polygon, PolygonError>>,
    delay: Duration,
    fetched: Mutex<Vec<usize>>,
    completed: AtomicUsize,
}

impl MemorySource {
    pub fn new(polygons: Vec<Polygon>) -> Self {
        Self::with_results(polygons.into_iter().map(Ok).collect())
    }

    pub fn with_results(polygons: Vec<Result<Polygon, PolygonError>>) -> Self {
        Self {
            polygons,
            delay: Duration::ZERO,
            fetched: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn fetched(&self) -> Vec<usize> {
        let mut fetched = self.fetched.lock().unwrap().clone();
        fetched.sort_unstable();
        fetched
    }

    /// Number of fetches that ran to completion, delay included.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

impl PolygonSource for MemorySource {
    async fn fetch(&self, index: usize) -> Result<Polygon, PolygonError> {
        self.fetched.lock().unwrap().push(index);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        self.polygons[index].clone()
    }
}

/// Panics when asked for `index`, serves squares otherwise.
pub struct PanickingSource {
    pub index: usize,
}

impl PolygonSource for PanickingSource {
    async fn fetch(&self, index: usize) -> Result<Polygon, PolygonError> {
        assert_ne!(index, self.index, "polygon {index} is poisoned");
        Ok(square())
    }
}

pub fn polygon(points: &[(i64, i64, f64)]) -> Polygon {
    Polygon::new(
        points
            .iter()
            .map(|&(x, y, weight)| WeightedPoint::new(x, y, weight))
            .collect(),
    )
}

/// The square from the problem statement: weight 109, bbox (0,0)-(10,10).
pub fn square() -> Polygon {
    polygon(&[(0, 10, 100.0), (10, 10, 2.0), (10, 0, 3.0), (0, 0, 4.0)])
}

/// Deterministic pseudo-random polygons (xorshift), so tests need no `rand`.
pub fn generate(count: usize, max_points: usize, seed: u64) -> Vec<Polygon> {
    let mut state = seed.max(1);
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };

    (0..count)
        .map(|_| {
            let len = (next() % (max_points as u64 + 1)) as usize;
            let points = (0..len)
                .map(|_| {
                    let x = (next() % 20_001) as i64 - 10_000;
                    let y = (next() % 20_001) as i64 - 10_000;
                    // Quarter steps keep sums exact regardless of order.
                    let weight = (next() % 40) as f64 * 0.25;
                    WeightedPoint::new(x, y, weight)
                })
                .collect();
            Polygon::new(points)
        })
        .collect()
}
