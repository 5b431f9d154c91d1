//! Network identifiers and the static profile table.
//!
//! Profiles are built once at startup and shared read-only. A network that is
//! missing from a [`ProfileTable`] is treated as unknown: the price model and
//! classifier fall back to [`DEFAULT_BASELINE_FEE`], the cost estimator skips it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Baseline fee (gwei) assumed for networks without a profile.
pub const DEFAULT_BASELINE_FEE: f64 = 10.0;

/// Gas consumed by a plain value transfer.
pub const STANDARD_TRANSFER_GAS: u64 = 21_000;

/// Supported networks, in display order.
///
/// The derived `Ord` follows declaration order and is used to break ties when
/// ranking networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    Ethereum,
    Polygon,
    Arbitrum,
    Optimism,
    Bsc,
}

impl NetworkId {
    pub const ALL: [NetworkId; 5] = [
        NetworkId::Ethereum,
        NetworkId::Polygon,
        NetworkId::Arbitrum,
        NetworkId::Optimism,
        NetworkId::Bsc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkId::Ethereum => "ethereum",
            NetworkId::Polygon => "polygon",
            NetworkId::Arbitrum => "arbitrum",
            NetworkId::Optimism => "optimism",
            NetworkId::Bsc => "bsc",
        }
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        NetworkId::ALL
            .into_iter()
            .find(|id| id.as_str() == wanted)
            .ok_or_else(|| format!("unknown network '{}'", s.trim()))
    }
}

/// Static description of a network.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkProfile {
    pub display_name: &'static str,
    /// Typical total fee in gwei under normal load.
    pub baseline_fee: f64,
    pub color: &'static str,
    pub gas_units: u64,
    pub currency: &'static str,
    /// Scales the random perturbation applied by the price model.
    pub volatility: f64,
    pub block_time_secs: u64,
}

/// Immutable lookup of network profiles.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileTable {
    profiles: BTreeMap<NetworkId, NetworkProfile>,
}

impl ProfileTable {
    /// Build a table from explicit entries. Later duplicates replace earlier ones.
    pub fn new(entries: impl IntoIterator<Item = (NetworkId, NetworkProfile)>) -> Self {
        Self {
            profiles: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, network: NetworkId) -> Option<&NetworkProfile> {
        self.profiles.get(&network)
    }

    pub fn contains(&self, network: NetworkId) -> bool {
        self.profiles.contains_key(&network)
    }

    /// Baseline fee for `network`, or [`DEFAULT_BASELINE_FEE`] when unknown.
    pub fn baseline_fee(&self, network: NetworkId) -> f64 {
        self.get(network)
            .map(|p| p.baseline_fee)
            .unwrap_or(DEFAULT_BASELINE_FEE)
    }

    /// Volatility multiplier for `network`; unknown networks are not amplified.
    pub fn volatility(&self, network: NetworkId) -> f64 {
        self.get(network).map(|p| p.volatility).unwrap_or(1.0)
    }

    pub fn block_time_secs(&self, network: NetworkId) -> u64 {
        self.get(network).map(|p| p.block_time_secs).unwrap_or(1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NetworkId, &NetworkProfile)> {
        self.profiles.iter().map(|(id, p)| (*id, p))
    }
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self::new([
            (
                NetworkId::Ethereum,
                NetworkProfile {
                    display_name: "Ethereum",
                    baseline_fee: 25.0,
                    color: "#627eea",
                    gas_units: STANDARD_TRANSFER_GAS,
                    currency: "ETH",
                    volatility: 2.0,
                    block_time_secs: 12,
                },
            ),
            (
                NetworkId::Polygon,
                NetworkProfile {
                    display_name: "Polygon",
                    baseline_fee: 35.0,
                    color: "#8247e5",
                    gas_units: STANDARD_TRANSFER_GAS,
                    currency: "MATIC",
                    volatility: 1.0,
                    block_time_secs: 2,
                },
            ),
            (
                NetworkId::Arbitrum,
                NetworkProfile {
                    display_name: "Arbitrum",
                    baseline_fee: 0.8,
                    color: "#28a0f0",
                    gas_units: STANDARD_TRANSFER_GAS,
                    currency: "ETH",
                    volatility: 1.0,
                    block_time_secs: 1,
                },
            ),
            (
                NetworkId::Optimism,
                NetworkProfile {
                    display_name: "Optimism",
                    baseline_fee: 0.5,
                    color: "#ff0420",
                    gas_units: STANDARD_TRANSFER_GAS,
                    currency: "ETH",
                    volatility: 1.0,
                    block_time_secs: 2,
                },
            ),
            (
                NetworkId::Bsc,
                NetworkProfile {
                    display_name: "BNB Smart Chain",
                    baseline_fee: 5.0,
                    color: "#f3ba2f",
                    gas_units: STANDARD_TRANSFER_GAS,
                    currency: "BNB",
                    volatility: 1.0,
                    block_time_secs: 3,
                },
            ),
        ])
    }
}
