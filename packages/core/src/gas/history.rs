//! Rolling per-network fee history.

use std::collections::VecDeque;

use serde::Serialize;

use super::model::FeeReading;

/// Number of readings kept per network unless configured otherwise.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// Capacity-bounded FIFO of readings, oldest first.
///
/// Appending past capacity silently drops the oldest entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySeries {
    capacity: usize,
    readings: VecDeque<FeeReading>,
}

impl HistorySeries {
    /// A capacity of zero is clamped to one so `latest` stays meaningful.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            readings: VecDeque::with_capacity(capacity),
        }
    }

    /// Fold `readings` into a fresh series, keeping only the newest `capacity`.
    pub fn from_readings(capacity: usize, readings: impl IntoIterator<Item = FeeReading>) -> Self {
        let mut series = Self::new(capacity);
        for reading in readings {
            series.append(reading);
        }
        series
    }

    pub fn append(&mut self, reading: FeeReading) {
        if self.readings.len() == self.capacity {
            self.readings.pop_front();
        }
        self.readings.push_back(reading);
    }

    pub fn latest(&self) -> Option<&FeeReading> {
        self.readings.back()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeeReading> {
        self.readings.iter()
    }
}

impl Default for HistorySeries {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gas::model::generate_series;
    use crate::gas::networks::{NetworkId, ProfileTable};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn reading(block: u64) -> FeeReading {
        let ts: DateTime<Utc> = Utc.timestamp_opt(block as i64, 0).unwrap();
        FeeReading::new(NetworkId::Ethereum, 20.0, 2.0, ts, block)
    }

    #[test]
    fn empty_series_has_no_latest() {
        let series = HistorySeries::default();
        assert!(series.is_empty());
        assert!(series.latest().is_none());
        assert_eq!(series.capacity(), DEFAULT_HISTORY_CAPACITY);
    }

    #[test]
    fn append_to_empty_series_succeeds() {
        let mut series = HistorySeries::new(3);
        series.append(reading(1));
        assert_eq!(series.len(), 1);
        assert_eq!(series.latest().unwrap().block_number(), 1);
    }

    #[test]
    fn oldest_entry_is_evicted_first() {
        let mut series = HistorySeries::new(3);
        for block in 1..=5 {
            series.append(reading(block));
        }
        let blocks: Vec<u64> = series.iter().map(|r| r.block_number()).collect();
        assert_eq!(blocks, vec![3, 4, 5]);
        assert_eq!(series.latest().unwrap().block_number(), 5);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut series = HistorySeries::new(0);
        series.append(reading(1));
        series.append(reading(2));
        assert_eq!(series.capacity(), 1);
        assert_eq!(series.latest().unwrap().block_number(), 2);
    }

    #[test]
    fn seeded_series_round_trips_through_append() {
        let table = ProfileTable::default();
        let mut rng = StdRng::seed_from_u64(21);
        let end = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let points = generate_series(
            &table,
            NetworkId::Arbitrum,
            20,
            Duration::milliseconds(6000),
            end,
            &mut rng,
        );

        let series = HistorySeries::from_readings(DEFAULT_HISTORY_CAPACITY, points);
        assert_eq!(series.len(), 20);
        assert_eq!(series.latest().unwrap().timestamp(), end);
    }

    #[test]
    fn serialises_capacity_and_readings() {
        let series = HistorySeries::from_readings(2, [reading(1)]);
        let json = serde_json::to_value(&series).unwrap();
        assert_eq!(json["capacity"], 2);
        assert_eq!(json["readings"].as_array().unwrap().len(), 1);
        assert_eq!(json["readings"][0]["network"], "ethereum");
    }

    proptest! {
        #[test]
        fn keeps_most_recent_capacity_items(capacity in 1usize..40, extra in 0usize..60) {
            let mut series = HistorySeries::new(capacity);
            let total = capacity + extra;
            for block in 0..total as u64 {
                series.append(reading(block));
                prop_assert!(series.len() <= capacity);
            }
            let blocks: Vec<u64> = series.iter().map(|r| r.block_number()).collect();
            let expected: Vec<u64> = (extra as u64..total as u64).collect();
            prop_assert_eq!(blocks, expected);
        }
    }
}
