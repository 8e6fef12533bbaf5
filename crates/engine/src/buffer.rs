use std::collections::VecDeque;

/// Fixed-capacity window of speed samples.
///
/// Oldest samples are evicted once the window is full.
#[derive(Debug, Clone)]
pub(crate) struct SampleWindow {
    samples: VecDeque<u64>,
    capacity: usize,
}

impl SampleWindow {
    /// A zero capacity is clamped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: u64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Arithmetic mean of the retained samples.
    pub fn mean(&self) -> Option<u64> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: u128 = self.samples.iter().map(|&s| u128::from(s)).sum();
        Some((sum / self.samples.len() as u128) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest() {
        let mut window = SampleWindow::new(3);
        for s in [10, 20, 30, 40] {
            window.push(s);
        }
        assert_eq!(window.mean(), Some(30));
    }

    #[test]
    fn empty_has_no_mean() {
        let window = SampleWindow::new(4);
        assert_eq!(window.mean(), None);
    }

    #[test]
    fn zero_capacity_holds_one() {
        let mut window = SampleWindow::new(0);
        window.push(1);
        window.push(2);
        assert_eq!(window.mean(), Some(2));
    }

    #[test]
    fn mean_does_not_overflow() {
        let mut window = SampleWindow::new(2);
        window.push(u64::MAX);
        window.push(u64::MAX);
        assert_eq!(window.mean(), Some(u64::MAX));
    }
}
