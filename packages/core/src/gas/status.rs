//! Congestion classification.

use serde::Serialize;

use super::model::FeeReading;
use super::networks::{NetworkId, ProfileTable};

pub const HIGH_CONGESTION_RATIO: f64 = 2.0;
pub const MEDIUM_CONGESTION_RATIO: f64 = 1.5;

pub const ADVISORY_WAIT: &str = "Wait for lower fees";
pub const ADVISORY_GO: &str = "Good time to transact";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CongestionLevel {
    Low,
    Medium,
    High,
}

impl CongestionLevel {
    /// Thresholds are strict: a ratio sitting exactly on a boundary takes the lower level.
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio > HIGH_CONGESTION_RATIO {
            CongestionLevel::High
        } else if ratio > MEDIUM_CONGESTION_RATIO {
            CongestionLevel::Medium
        } else {
            CongestionLevel::Low
        }
    }

    pub fn advisory(&self) -> &'static str {
        match self {
            CongestionLevel::High => ADVISORY_WAIT,
            CongestionLevel::Medium | CongestionLevel::Low => ADVISORY_GO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CongestionStatus {
    pub level: CongestionLevel,
    /// `None` when the network's baseline is not positive.
    pub ratio: Option<f64>,
    pub advisory: &'static str,
    pub block_time_secs: u64,
}

/// Classify `reading` against the baseline of `network`.
///
/// A non-positive baseline has no meaningful ratio; such networks report
/// `ratio: None` and [`CongestionLevel::Low`].
pub fn classify(profiles: &ProfileTable, network: NetworkId, reading: &FeeReading) -> CongestionStatus {
    let baseline = profiles.baseline_fee(network);
    let ratio = (baseline > 0.0).then(|| reading.total() / baseline);
    let level = ratio.map(CongestionLevel::from_ratio).unwrap_or(CongestionLevel::Low);

    CongestionStatus {
        level,
        ratio,
        advisory: level.advisory(),
        block_time_secs: profiles.block_time_secs(network),
    }
}
