//! Feed-side services: where readings come from and the simulated
//! real-time connection each network reports through.

pub mod connection;
pub mod provider;

#[cfg(test)]
pub mod mock_provider;

pub use connection::{ConnectionSimulator, ConnectionState};
pub use provider::{GasPriceProvider, ProviderError, SyntheticGasProvider};
