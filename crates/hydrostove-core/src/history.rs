//! Compressing history of thermal power for the graph
//!
//! The graph has one column per stored sample. Once every column is used the
//! history is compressed in place: adjacent pairs are averaged, halving the
//! number of samples and making each stored sample cover more real time.
//! The caller stretches its sampling period by the returned scale so the time
//! axis stays consistent.
//!
//! ```text
//! full:        [a b c d e f g h]        scale 1
//! compressed:  [ab cd ef gh]            scale 2
//! appended:    [ab cd ef gh i]
//! ```

use heapless::Vec;
use log::{error, info};

use crate::reading::Reading;

/// Fixed-capacity power history with halving compression.
///
/// `N` is the number of graph columns and must be at least 2.
#[derive(Debug, Clone)]
pub struct PowerHistory<const N: usize> {
    /// Power samples in watts, oldest first
    samples: Vec<i32, N>,
    /// Real time per stored sample, in base sampling periods
    scale: u32,
    /// Highest power ever added, never lowered by compression
    max_value: i32,
    /// Most recently added reading
    current: Option<Reading>,
}

impl<const N: usize> Default for PowerHistory<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> PowerHistory<N> {
    pub const fn new() -> Self {
        const { assert!(N >= 2, "history needs at least two columns to compress") };
        Self {
            samples: Vec::new(),
            scale: 1,
            max_value: 0,
            current: None,
        }
    }

    /// Record a reading and append its power to the history.
    ///
    /// Returns the scale in effect after the append. To keep the graph's time
    /// axis calibrated the next sample should be taken after
    /// `base_period * scale`.
    pub fn add(&mut self, reading: Reading) -> u32 {
        let scale = self.push_power(reading.power_watts());
        self.current = Some(reading);
        scale
    }

    /// Append a power sample in watts, compressing first if full.
    pub fn push_power(&mut self, watts: i32) -> u32 {
        if self.samples.is_full() {
            self.compress();
        }

        if self.samples.push(watts).is_err() {
            error!("Power history rejected sample {} W after compression", watts);
        }

        self.max_value = self.max_value.max(watts);
        self.scale
    }

    /// Halve the stored samples by averaging adjacent pairs.
    ///
    /// An unpaired trailing sample (odd count) is carried over unchanged.
    fn compress(&mut self) {
        let count = self.samples.len();
        let pairs = count / 2;

        for i in 0..pairs {
            let sum = i64::from(self.samples[2 * i]) + i64::from(self.samples[2 * i + 1]);
            // Mean of two i32 always fits back into i32
            self.samples[i] = sum.div_euclid(2) as i32;
        }

        let mut kept = pairs;
        if count % 2 == 1 {
            self.samples[pairs] = self.samples[count - 1];
            kept += 1;
        }
        self.samples.truncate(kept);

        self.scale += 1;
        info!(
            "Compressed power history {} -> {} samples, scale now {}",
            count, kept, self.scale
        );
    }

    /// Stored samples, oldest first.
    pub fn samples(&self) -> &[i32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.is_full()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Number of compression passes so far.
    pub fn compressions(&self) -> u32 {
        self.scale - 1
    }

    /// High-water mark of every power sample ever added (at least 0).
    pub fn max_value(&self) -> i32 {
        self.max_value
    }

    /// Most recent power sample.
    pub fn latest(&self) -> Option<i32> {
        self.samples.last().copied()
    }

    /// Most recent reading passed to [`add`](Self::add).
    pub fn current(&self) -> Option<&Reading> {
        self.current.as_ref()
    }

    /// Sampling period that keeps the time axis calibrated at the current scale.
    pub fn sample_period_ms(&self, base_period_ms: u64) -> u64 {
        base_period_ms.saturating_mul(u64::from(self.scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_empty() {
        let history = PowerHistory::<8>::new();
        assert!(history.is_empty());
        assert_eq!(history.scale(), 1);
        assert_eq!(history.max_value(), 0);
        assert_eq!(history.latest(), None);
        assert!(history.current().is_none());
    }

    #[test]
    fn test_add_records_reading_and_power() {
        let mut history = PowerHistory::<8>::new();
        let reading = Reading::valid(20.0, 21.0, 1.0);
        assert_eq!(history.add(reading), 1);
        assert_eq!(history.latest(), Some(4186));
        assert_eq!(history.max_value(), 4186);
        assert_eq!(history.current(), Some(&reading));
    }

    #[test]
    fn test_length_never_exceeds_capacity() {
        let mut history = PowerHistory::<16>::new();
        for i in 0..1000 {
            history.push_power(i % 97);
            assert!(history.len() <= history.capacity());
        }
    }

    #[test]
    fn test_max_value_is_monotonic() {
        let mut history = PowerHistory::<4>::new();
        let mut previous = history.max_value();
        for watts in [100, 50, 3000, -200, 10, 2999, 0, 1, 2, 3, 4] {
            history.push_power(watts);
            assert!(history.max_value() >= previous);
            previous = history.max_value();
        }
        assert_eq!(history.max_value(), 3000);
    }

    #[test]
    fn test_max_value_survives_compression() {
        let mut history = PowerHistory::<4>::new();
        for watts in [0, 1000, 0, 0, 0] {
            history.push_power(watts);
        }
        // 1000 was averaged down to 500 but the high-water mark stays
        assert_eq!(history.samples(), &[500, 0, 0]);
        assert_eq!(history.max_value(), 1000);
    }

    #[test]
    fn test_max_value_ignores_negative_power() {
        let mut history = PowerHistory::<4>::new();
        history.push_power(-500);
        assert_eq!(history.max_value(), 0);
    }

    #[test]
    fn test_capacity_plus_one_compresses_once() {
        let mut history = PowerHistory::<8>::new();
        for watts in 1..=8 {
            assert_eq!(history.push_power(watts * 10), 1);
        }
        assert!(history.is_full());

        assert_eq!(history.push_power(90), 2);
        assert_eq!(history.compressions(), 1);
        // floor((10+20)/2), floor((30+40)/2), ... then the new sample
        assert_eq!(history.samples(), &[15, 35, 55, 75, 90]);
    }

    #[test]
    fn test_compression_schedule() {
        // First pass at N+1, then every N/2 adds as the freed half refills
        let mut history = PowerHistory::<8>::new();
        let mut passes = [0usize; 3];
        let mut found = 0;
        for add in 1..=17 {
            let before = history.scale();
            history.push_power(1);
            if history.scale() != before {
                assert_eq!(history.scale(), before + 1);
                passes[found] = add;
                found += 1;
            }
        }
        assert_eq!(passes, [9, 13, 17]);
    }

    #[test]
    fn test_odd_capacity_carries_unpaired_sample() {
        let mut history = PowerHistory::<5>::new();
        for watts in [10, 20, 30, 40, 55] {
            history.push_power(watts);
        }
        history.push_power(7);
        assert_eq!(history.samples(), &[15, 35, 55, 7]);
        assert_eq!(history.scale(), 2);
    }

    #[test]
    fn test_pair_mean_rounds_down() {
        let mut history = PowerHistory::<2>::new();
        history.push_power(-3);
        history.push_power(0);
        history.push_power(9);
        // floor(-1.5) = -2
        assert_eq!(history.samples(), &[-2, 9]);
    }

    #[test]
    fn test_pair_mean_does_not_overflow() {
        let mut history = PowerHistory::<2>::new();
        history.push_power(i32::MAX);
        history.push_power(i32::MAX);
        history.push_power(0);
        assert_eq!(history.samples(), &[i32::MAX, 0]);
    }

    #[test]
    fn test_sample_period_follows_scale() {
        let mut history = PowerHistory::<2>::new();
        assert_eq!(history.sample_period_ms(5000), 5000);
        for _ in 0..3 {
            history.push_power(1);
        }
        assert_eq!(history.sample_period_ms(5000), 10_000);
    }
}
