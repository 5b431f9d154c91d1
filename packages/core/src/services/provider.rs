//! Fee data sources.
//!
//! The dashboard only talks to [`GasPriceProvider`]. Production uses
//! [`SyntheticGasProvider`]; tests swap in the configurable mock.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use crate::gas::{
    generate_reading, generate_series, reference_rate, FeeReading, NetworkId, ProfileTable,
};
use crate::gas::model::series_timestamps;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("{provider} does not serve network {network}")]
    UnsupportedNetwork { provider: String, network: NetworkId },

    #[error("Provider unavailable: {message}")]
    Unavailable { message: String },
}

#[async_trait]
pub trait GasPriceProvider: Send + Sync {
    /// Current fee reading for `network` as of `at`.
    async fn fetch_reading(
        &self,
        network: NetworkId,
        at: DateTime<Utc>,
    ) -> Result<FeeReading, ProviderError>;

    /// `count` readings spaced `interval` apart, oldest first, the last at `end`.
    async fn fetch_series(
        &self,
        network: NetworkId,
        count: usize,
        interval: Duration,
        end: DateTime<Utc>,
    ) -> Result<Vec<FeeReading>, ProviderError> {
        let timestamps = series_timestamps(end, interval, count);
        let mut series = Vec::with_capacity(timestamps.len());
        for at in timestamps {
            series.push(self.fetch_reading(network, at).await?);
        }
        Ok(series)
    }

    /// Reference exchange rate used to price native amounts.
    async fn fetch_reference_rate(&self, at: DateTime<Utc>) -> Result<f64, ProviderError>;

    fn provider_name(&self) -> &str;
}

/// Provider backed by the synthetic fee model.
pub struct SyntheticGasProvider {
    profiles: Arc<ProfileTable>,
    rng: Mutex<StdRng>,
}

impl SyntheticGasProvider {
    pub fn new(profiles: Arc<ProfileTable>) -> Self {
        Self {
            profiles,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible stream of readings, mostly useful in tests.
    pub fn with_seed(profiles: Arc<ProfileTable>, seed: u64) -> Self {
        Self {
            profiles,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *rng)
    }
}

#[async_trait]
impl GasPriceProvider for SyntheticGasProvider {
    async fn fetch_reading(
        &self,
        network: NetworkId,
        at: DateTime<Utc>,
    ) -> Result<FeeReading, ProviderError> {
        Ok(self.with_rng(|rng| generate_reading(&self.profiles, network, at, rng)))
    }

    async fn fetch_series(
        &self,
        network: NetworkId,
        count: usize,
        interval: Duration,
        end: DateTime<Utc>,
    ) -> Result<Vec<FeeReading>, ProviderError> {
        Ok(self.with_rng(|rng| generate_series(&self.profiles, network, count, interval, end, rng)))
    }

    async fn fetch_reference_rate(&self, at: DateTime<Utc>) -> Result<f64, ProviderError> {
        Ok(self.with_rng(|rng| reference_rate(at, rng)))
    }

    fn provider_name(&self) -> &str {
        "Synthetic"
    }
}
