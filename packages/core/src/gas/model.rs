//! Synthetic fee model.
//!
//! Readings are intentionally random. Callers supply the RNG so tests can seed
//! it, but nothing downstream relies on exact values.

use chrono::{DateTime, Duration, Local, Timelike, Utc};
use rand::Rng;
use serde::Serialize;

use super::networks::{NetworkId, ProfileTable};

/// Floor for the base component.
pub const MIN_BASE_FEE: f64 = 1.0;
/// Floor for the priority component.
pub const MIN_PRIORITY_FEE: f64 = 0.1;
/// Peak-hour multiplier applied to the baseline.
pub const PEAK_TRAFFIC_MULTIPLIER: f64 = 1.5;
/// Half-width of the uniform perturbation, in gwei.
pub const PERTURBATION_RANGE: f64 = 5.0;

const PEAK_HOURS: std::ops::RangeInclusive<u32> = 8..=22;
pub const REFERENCE_RATE_BASE: f64 = 2400.0;
const MS_PER_DAY: f64 = 86_400_000.0;

/// Round to two decimal places. The only rounding rule applied to stored values.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Two-decimal display form of a fee. Never fed back into a reading.
pub fn format_fee(value: f64) -> String {
    format!("{:.2}", value)
}

/// Six-decimal display form of an amount in native currency.
pub fn format_native(value: f64) -> String {
    format!("{:.6}", value)
}

/// One synthetic fee observation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeeReading {
    network: NetworkId,
    base: f64,
    priority: f64,
    total: f64,
    timestamp: DateTime<Utc>,
    block_number: u64,
}

impl FeeReading {
    /// Build a reading; `total` is always derived from the rounded components.
    pub fn new(
        network: NetworkId,
        base: f64,
        priority: f64,
        timestamp: DateTime<Utc>,
        block_number: u64,
    ) -> Self {
        let base = round2(base);
        let priority = round2(priority);
        Self {
            network,
            base,
            priority,
            total: round2(base + priority),
            timestamp,
            block_number,
        }
    }

    pub fn network(&self) -> NetworkId {
        self.network
    }

    pub fn base(&self) -> f64 {
        self.base
    }

    pub fn priority(&self) -> f64 {
        self.priority
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn block_number(&self) -> u64 {
        self.block_number
    }
}

/// Diurnal load factor for a local hour of day.
pub fn traffic_multiplier(hour: u32) -> f64 {
    if PEAK_HOURS.contains(&hour) {
        PEAK_TRAFFIC_MULTIPLIER
    } else {
        1.0
    }
}

fn local_hour(timestamp: DateTime<Utc>) -> u32 {
    timestamp.with_timezone(&Local).hour()
}

/// Block height implied by wall-clock time and the network's block interval.
fn block_number_at(profiles: &ProfileTable, network: NetworkId, timestamp: DateTime<Utc>) -> u64 {
    let secs = timestamp.timestamp().max(0) as u64;
    secs / profiles.block_time_secs(network).max(1)
}

/// Produce one reading for `network` at `timestamp`.
pub fn generate_reading<R: Rng>(
    profiles: &ProfileTable,
    network: NetworkId,
    timestamp: DateTime<Utc>,
    rng: &mut R,
) -> FeeReading {
    let baseline = profiles.baseline_fee(network);
    let multiplier = traffic_multiplier(local_hour(timestamp));
    let perturbation =
        rng.gen_range(-PERTURBATION_RANGE..=PERTURBATION_RANGE) * profiles.volatility(network);

    let base = round2((baseline * multiplier + perturbation).max(MIN_BASE_FEE));
    let priority = (base * 0.1 + rng.gen_range(0.0..2.0)).max(MIN_PRIORITY_FEE);

    FeeReading::new(
        network,
        base,
        priority,
        timestamp,
        block_number_at(profiles, network, timestamp),
    )
}

/// Up to `count` instants spaced `interval` apart, oldest first, the last at `end`.
///
/// Stops early rather than step past the representable date range.
pub fn series_timestamps(
    end: DateTime<Utc>,
    interval: Duration,
    count: usize,
) -> Vec<DateTime<Utc>> {
    let mut timestamps: Vec<_> =
        std::iter::successors(Some(end), |ts| ts.checked_sub_signed(interval))
            .take(count)
            .collect();
    timestamps.reverse();
    timestamps
}

/// Produce `count` readings spaced `interval` apart, oldest first, the last at `end`.
pub fn generate_series<R: Rng>(
    profiles: &ProfileTable,
    network: NetworkId,
    count: usize,
    interval: Duration,
    end: DateTime<Utc>,
    rng: &mut R,
) -> Vec<FeeReading> {
    series_timestamps(end, interval, count)
        .into_iter()
        .map(|timestamp| generate_reading(profiles, network, timestamp, rng))
        .collect()
}

/// Mock reference exchange rate (native ETH priced in USD) with a daily cycle and noise.
pub fn reference_rate<R: Rng>(timestamp: DateTime<Utc>, rng: &mut R) -> f64 {
    let daily = (timestamp.timestamp_millis() as f64 / MS_PER_DAY).sin() * 50.0;
    let noise = (rng.gen::<f64>() - 0.5) * 100.0;
    round2(REFERENCE_RATE_BASE + daily + noise)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn traffic_multiplier_covers_peak_window_inclusively() {
        assert_eq!(traffic_multiplier(7), 1.0);
        assert_eq!(traffic_multiplier(8), 1.5);
        assert_eq!(traffic_multiplier(22), 1.5);
        assert_eq!(traffic_multiplier(23), 1.0);
        assert_eq!(traffic_multiplier(0), 1.0);
    }

    #[test]
    fn reading_total_is_derived_from_rounded_parts() {
        let reading = FeeReading::new(NetworkId::Polygon, 10.004, 0.333, at(0), 0);
        assert_eq!(reading.base(), 10.0);
        assert_eq!(reading.priority(), 0.33);
        assert_eq!(reading.total(), 10.33);
    }

    #[test]
    fn unknown_network_still_produces_a_reading() {
        let table = ProfileTable::new([]);
        let mut rng = StdRng::seed_from_u64(7);
        let reading = generate_reading(&table, NetworkId::Optimism, at(1_700_000_000), &mut rng);
        // Baseline 10 at most 1.5x plus 5 of noise.
        assert!(reading.base() <= 20.0);
        assert!(reading.base() >= MIN_BASE_FEE);
    }

    #[test]
    fn low_baseline_is_floored_at_one() {
        let table = ProfileTable::default();
        let mut rng = StdRng::seed_from_u64(42);
        for i in 0..200 {
            let r = generate_reading(&table, NetworkId::Arbitrum, at(1_700_000_000 + i), &mut rng);
            assert!(r.base() >= 1.0);
            assert!(r.priority() >= 0.1);
        }
    }

    #[test]
    fn ethereum_spread_exceeds_polygon_spread() {
        let table = ProfileTable::default();
        let mut rng = StdRng::seed_from_u64(3);
        let ts = at(1_700_000_000);
        let spread = |network: NetworkId, rng: &mut StdRng| {
            let bases: Vec<f64> = (0..500)
                .map(|_| generate_reading(&table, network, ts, rng).base())
                .collect();
            let max = bases.iter().cloned().fold(f64::MIN, f64::max);
            let min = bases.iter().cloned().fold(f64::MAX, f64::min);
            max - min
        };
        let eth = spread(NetworkId::Ethereum, &mut rng);
        let poly = spread(NetworkId::Polygon, &mut rng);
        assert!(eth > poly, "ethereum spread {} <= polygon spread {}", eth, poly);
        assert!(eth <= 20.0 + 0.01);
    }

    #[test]
    fn block_number_never_decreases() {
        let table = ProfileTable::default();
        let mut rng = StdRng::seed_from_u64(11);
        let series = generate_series(
            &table,
            NetworkId::Ethereum,
            50,
            Duration::milliseconds(6000),
            at(1_700_000_000),
            &mut rng,
        );
        assert!(series.windows(2).all(|w| w[0].block_number() <= w[1].block_number()));
    }

    #[test]
    fn series_is_evenly_spaced_and_ends_at_end() {
        let table = ProfileTable::default();
        let mut rng = StdRng::seed_from_u64(5);
        let end = at(1_700_000_000);
        let series = generate_series(
            &table,
            NetworkId::Polygon,
            20,
            Duration::milliseconds(6000),
            end,
            &mut rng,
        );
        assert_eq!(series.len(), 20);
        assert_eq!(series.last().unwrap().timestamp(), end);
        assert_eq!(series[0].timestamp(), end - Duration::milliseconds(6000 * 19));
        assert!(series
            .windows(2)
            .all(|w| w[1].timestamp() - w[0].timestamp() == Duration::milliseconds(6000)));
    }

    #[test]
    fn empty_series_for_zero_count() {
        let mut rng = StdRng::seed_from_u64(1);
        let series = generate_series(
            &ProfileTable::default(),
            NetworkId::Bsc,
            0,
            Duration::seconds(6),
            at(0),
            &mut rng,
        );
        assert!(series.is_empty());
    }

    #[test]
    fn series_stops_at_the_representable_date_range() {
        let end = at(1_700_000_000);
        // Roughly 200,000 years per step; a third step leaves chrono's range.
        let interval = Duration::days(73_000_000);

        let timestamps = series_timestamps(end, interval, usize::MAX);
        assert_eq!(timestamps.len(), 2);
        assert_eq!(timestamps[1], end);

        let mut rng = StdRng::seed_from_u64(2);
        let series = generate_series(
            &ProfileTable::default(),
            NetworkId::Optimism,
            5,
            interval,
            end,
            &mut rng,
        );
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].timestamp(), end - interval);
    }

    #[test]
    fn reference_rate_stays_near_base() {
        let mut rng = StdRng::seed_from_u64(9);
        for i in 0..100 {
            let rate = reference_rate(at(1_700_000_000 + i * 3600), &mut rng);
            assert!((2300.0..=2500.0).contains(&rate), "rate {}", rate);
            assert_eq!(rate, round2(rate));
        }
    }

    #[test]
    fn display_formatting_is_separate_from_values() {
        assert_eq!(format_fee(1.5), "1.50");
        assert_eq!(format_native(0.000525), "0.000525");
    }

    proptest! {
        #[test]
        fn reading_respects_floors_and_sum(
            idx in 0usize..NetworkId::ALL.len(),
            secs in 0i64..4_000_000_000,
            seed in any::<u64>(),
        ) {
            let table = ProfileTable::default();
            let mut rng = StdRng::seed_from_u64(seed);
            let r = generate_reading(&table, NetworkId::ALL[idx], at(secs), &mut rng);
            prop_assert!(r.base() >= MIN_BASE_FEE);
            prop_assert!(r.priority() >= MIN_PRIORITY_FEE);
            prop_assert_eq!(r.total(), round2(r.base() + r.priority()));
            prop_assert_eq!(r.base(), round2(r.base()));
            prop_assert_eq!(r.priority(), round2(r.priority()));
        }
    }
}
