use std::collections::VecDeque;

/// Samples kept for sparklines: two minutes at the default 2s interval.
pub const DEFAULT_HISTORY_SIZE: usize = 60;

/// Circular buffer for storing metric history (for sparklines)
#[derive(Debug, Clone)]
pub struct History<T> {
    capacity: usize,
    values: VecDeque<T>,
}

impl<T: Copy> History<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            values: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, value: T) {
        if self.values.len() >= self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.values.iter().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.values.iter()
    }
}

impl History<f64> {
    pub fn peak(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }
}

impl<T: Copy> Default for History<T> {
    fn default() -> Self {
        Self::new()
    }
}
