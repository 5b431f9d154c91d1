//! Mock gas price provider for testing
//!
//! Implements `GasPriceProvider` with configurable responses so tests can
//! exercise the dashboard ticker and API handlers with known fees.
//!
//! Gated behind `#[cfg(test)]`, never compiled into production builds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::gas::{FeeReading, NetworkId};
use crate::services::provider::{GasPriceProvider, ProviderError};

/// A configurable mock implementation of `GasPriceProvider`.
///
/// # Example
/// ```rust
/// let mock = MockGasProvider::new()
///     .with_fee(NetworkId::Ethereum, 24.0, 1.0)
///     .with_reference_rate(2400.0);
/// ```
pub struct MockGasProvider {
    /// Fixed (base, priority) per network. Unlisted networks are unsupported.
    fees: BTreeMap<NetworkId, (f64, f64)>,
    reference_rate: f64,
    /// When `Some`, every fetch returns this error instead.
    error: Option<ProviderError>,
    /// Tracks total number of `fetch_reading` calls.
    pub call_count: Arc<AtomicUsize>,
}

impl MockGasProvider {
    /// Create a new mock serving no networks, priced at 2400.
    pub fn new() -> Self {
        Self {
            fees: BTreeMap::new(),
            reference_rate: 2400.0,
            error: None,
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_fee(mut self, network: NetworkId, base: f64, priority: f64) -> Self {
        self.fees.insert(network, (base, priority));
        self
    }

    pub fn with_reference_rate(mut self, rate: f64) -> Self {
        self.reference_rate = rate;
        self
    }

    /// Set the error returned by every fetch (overrides `with_fee`).
    pub fn with_error(mut self, error: ProviderError) -> Self {
        self.error = Some(error);
        self
    }

    /// Returns the current call count without consuming the mock.
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl Default for MockGasProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GasPriceProvider for MockGasProvider {
    async fn fetch_reading(
        &self,
        network: NetworkId,
        at: DateTime<Utc>,
    ) -> Result<FeeReading, ProviderError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        if let Some(ref err) = self.error {
            return Err(err.clone());
        }

        let (base, priority) = self.fees.get(&network).copied().ok_or_else(|| {
            ProviderError::UnsupportedNetwork {
                provider: self.provider_name().to_string(),
                network,
            }
        })?;
        let block = at.timestamp().max(0) as u64;
        Ok(FeeReading::new(network, base, priority, at, block))
    }

    async fn fetch_reference_rate(&self, _at: DateTime<Utc>) -> Result<f64, ProviderError> {
        match self.error {
            Some(ref err) => Err(err.clone()),
            None => Ok(self.reference_rate),
        }
    }

    fn provider_name(&self) -> &str {
        "MockGas"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn returns_configured_fee() {
        let mock = MockGasProvider::new().with_fee(NetworkId::Ethereum, 24.0, 1.0);

        let reading = mock.fetch_reading(NetworkId::Ethereum, Utc::now()).await.unwrap();
        assert_eq!(reading.base(), 24.0);
        assert_eq!(reading.total(), 25.0);
    }

    #[tokio::test]
    async fn unlisted_network_is_unsupported() {
        let mock = MockGasProvider::new();
        let result = mock.fetch_reading(NetworkId::Polygon, Utc::now()).await;
        assert!(matches!(
            result.unwrap_err(),
            ProviderError::UnsupportedNetwork { network: NetworkId::Polygon, .. }
        ));
    }

    #[tokio::test]
    async fn returns_configured_error() {
        let mock = MockGasProvider::new()
            .with_fee(NetworkId::Ethereum, 24.0, 1.0)
            .with_error(ProviderError::Unavailable {
                message: "simulated outage".into(),
            });

        assert!(mock.fetch_reading(NetworkId::Ethereum, Utc::now()).await.is_err());
        assert!(mock.fetch_reference_rate(Utc::now()).await.is_err());
    }

    #[tokio::test]
    async fn default_series_goes_through_fetch_reading() {
        let mock = MockGasProvider::new().with_fee(NetworkId::Arbitrum, 0.7, 0.1);
        let end = Utc::now();

        let series = mock
            .fetch_series(NetworkId::Arbitrum, 4, Duration::seconds(6), end)
            .await
            .unwrap();
        assert_eq!(series.len(), 4);
        assert_eq!(series[3].timestamp(), end);
        assert_eq!(series[0].timestamp(), end - Duration::seconds(18));
        assert_eq!(mock.calls(), 4);
    }

    #[tokio::test]
    async fn default_series_stops_at_the_representable_date_range() {
        let mock = MockGasProvider::new().with_fee(NetworkId::Ethereum, 20.0, 2.0);
        let end = Utc::now();

        let series = mock
            .fetch_series(NetworkId::Ethereum, usize::MAX, Duration::days(73_000_000), end)
            .await
            .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[1].timestamp(), end);
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn call_counter_increments_even_on_error() {
        let mock = MockGasProvider::new().with_error(ProviderError::Unavailable {
            message: "down".into(),
        });

        let _ = mock.fetch_reading(NetworkId::Ethereum, Utc::now()).await;
        assert_eq!(mock.calls(), 1);
    }

    #[test]
    fn provider_name_is_mock_gas() {
        assert_eq!(MockGasProvider::new().provider_name(), "MockGas");
    }
}
