//! Fixed-capacity FIFO of numeric samples.

use std::collections::VecDeque;

/// A bounded history window. Enqueueing past capacity evicts the oldest
/// sample.
#[derive(Debug, Clone)]
pub struct BoundedWindow {
    data: VecDeque<f64>,
    capacity: usize,
}

impl BoundedWindow {
    /// Create an empty window.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "window capacity must be at least 1");
        Self {
            data: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn enqueue(&mut self, value: f64) {
        self.data.push_back(value);
        if self.data.len() > self.capacity {
            self.data.pop_front();
        }
    }

    /// Snapshot of the samples, oldest first.
    pub fn values(&self) -> Vec<f64> {
        self.data.iter().copied().collect()
    }

    pub fn is_full(&self) -> bool {
        self.data.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}

/// Mean absolute error between two windows, aligned by position and
/// divided by the length of `observed`.
///
/// Returns `None` when `observed` is empty.
pub fn mean_absolute_error(observed: &BoundedWindow, predicted: &BoundedWindow) -> Option<f64> {
    if observed.is_empty() {
        return None;
    }
    let sum: f64 = observed
        .data
        .iter()
        .zip(predicted.data.iter())
        .map(|(o, p)| (o - p).abs())
        .sum();
    Some(sum / observed.len() as f64)
}
