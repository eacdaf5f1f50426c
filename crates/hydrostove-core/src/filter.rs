//! Sliding median filter for noisy ADC channels

use heapless::{Deque, Vec};

/// Window length used for both thermistor channels.
pub const DEFAULT_MEDIAN_WINDOW: usize = 3;

/// Median over the last `N` raw readings.
///
/// Until the window fills up the median is taken over the readings seen so
/// far, so the first output equals the first input.
#[derive(Debug, Clone)]
pub struct MedianFilter<const N: usize> {
    window: Deque<u16, N>,
}

impl<const N: usize> Default for MedianFilter<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> MedianFilter<N> {
    pub const fn new() -> Self {
        Self {
            window: Deque::new(),
        }
    }

    /// Push a reading and return the median of the current window.
    pub fn run(&mut self, sample: u16) -> u16 {
        if self.window.is_full() {
            self.window.pop_front();
        }
        // Cannot fail: a slot was freed above
        let _ = self.window.push_back(sample);

        let mut sorted: Vec<u16, N> = self.window.iter().copied().collect();
        sorted.sort_unstable();
        sorted[sorted.len() / 2]
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_output_is_first_input() {
        let mut filter = MedianFilter::<3>::new();
        assert_eq!(filter.run(512), 512);
    }

    #[test]
    fn test_rejects_single_spike() {
        let mut filter = MedianFilter::<3>::new();
        filter.run(500);
        filter.run(502);
        assert_eq!(filter.run(1023), 502);
        assert_eq!(filter.run(501), 502);
    }

    #[test]
    fn test_window_slides() {
        let mut filter = MedianFilter::<3>::new();
        for v in [10, 20, 30, 40, 50] {
            filter.run(v);
        }
        assert_eq!(filter.len(), 3);
        assert_eq!(filter.run(60), 50);
    }

    #[test]
    fn test_reset_empties_window() {
        let mut filter = MedianFilter::<5>::new();
        filter.run(1);
        filter.run(2);
        filter.reset();
        assert!(filter.is_empty());
        assert_eq!(filter.run(7), 7);
    }
}
