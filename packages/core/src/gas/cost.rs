//! Cross-network transaction cost comparison.

use std::collections::BTreeMap;

use serde::Serialize;

use super::model::FeeReading;
use super::networks::{NetworkId, ProfileTable};

const GWEI_PER_NATIVE: f64 = 1e9;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostEstimate {
    pub network: NetworkId,
    pub gas_native: f64,
    pub gas_reference: f64,
    pub principal_reference: f64,
    pub total_reference: f64,
    /// Principal per unit of gas spent. NaN (serialised as `null`) when gas is free.
    pub efficiency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostComparison {
    pub estimates: BTreeMap<NetworkId, CostEstimate>,
    /// Networks ordered from cheapest to most expensive total.
    pub ranking: Vec<NetworkId>,
    pub cheapest: Option<NetworkId>,
}

/// Cost of moving `principal` (native units) on every network in `readings`.
///
/// Networks without a profile are skipped.
pub fn estimate(
    profiles: &ProfileTable,
    readings: &BTreeMap<NetworkId, FeeReading>,
    reference_rate: f64,
    principal: f64,
) -> CostComparison {
    let estimates: BTreeMap<NetworkId, CostEstimate> = readings
        .iter()
        .filter_map(|(network, reading)| {
            let profile = profiles.get(*network)?;
            let gas_native = reading.total() * profile.gas_units as f64 / GWEI_PER_NATIVE;
            let gas_reference = gas_native * reference_rate;
            let principal_reference = principal * reference_rate;
            let efficiency = if gas_native == 0.0 {
                f64::NAN
            } else {
                principal / gas_native
            };

            Some((
                *network,
                CostEstimate {
                    network: *network,
                    gas_native,
                    gas_reference,
                    principal_reference,
                    total_reference: principal_reference + gas_reference,
                    efficiency,
                },
            ))
        })
        .collect();

    let ranking = rank(&estimates);
    CostComparison {
        cheapest: ranking.first().copied(),
        ranking,
        estimates,
    }
}

/// Ascending by total; ties keep declared network order (the map's order, stable sort).
pub fn rank(estimates: &BTreeMap<NetworkId, CostEstimate>) -> Vec<NetworkId> {
    let mut ordered: Vec<&CostEstimate> = estimates.values().collect();
    ordered.sort_by(|a, b| a.total_reference.total_cmp(&b.total_reference));
    ordered.into_iter().map(|e| e.network).collect()
}
