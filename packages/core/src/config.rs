//! Runtime configuration.
//!
//! Values come from CLI flags, falling back to environment variables
//! (`.env` is loaded by `main` before parsing), then to defaults.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

use crate::error::AppError;
use crate::gas::{NetworkId, DEFAULT_HISTORY_CAPACITY};
use crate::services::connection::DEFAULT_MAX_RECONNECT_ATTEMPTS;

/// Longest accepted refresh interval (one day).
pub const MAX_TICK_INTERVAL_SECS: u64 = 86_400;
/// Largest accepted per-network history.
pub const MAX_HISTORY_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, Parser)]
#[command(name = "gas-tracker", about = "Simulated cross-chain gas price tracker")]
pub struct Config {
    /// Port the HTTP API listens on.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Seconds between price refreshes.
    #[arg(long, env = "TICK_INTERVAL_SECS", default_value_t = 6)]
    pub tick_interval_secs: u64,

    /// Readings kept per network.
    #[arg(long, env = "HISTORY_CAPACITY", default_value_t = DEFAULT_HISTORY_CAPACITY)]
    pub history_capacity: usize,

    /// Automatic reconnects allowed before a feed connection gives up.
    #[arg(long, env = "MAX_RECONNECT_ATTEMPTS", default_value_t = DEFAULT_MAX_RECONNECT_ATTEMPTS)]
    pub max_reconnect_attempts: u32,

    /// Comma-separated networks to monitor.
    #[arg(
        long,
        env = "NETWORKS",
        value_delimiter = ',',
        default_values_t = [NetworkId::Ethereum, NetworkId::Polygon, NetworkId::Arbitrum]
    )]
    pub networks: Vec<NetworkId>,

    /// Per-tick probability of dropping each connected feed.
    #[arg(long, env = "FAULT_RATE", default_value_t = 0.0)]
    pub fault_rate: f64,
}

impl Config {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    /// Spacing between seeded history points, matching the tick interval.
    pub fn history_spacing(&self) -> Result<chrono::Duration, AppError> {
        i64::try_from(self.tick_interval_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| {
                AppError::Config(format!(
                    "tick interval of {} seconds is out of range",
                    self.tick_interval_secs
                ))
            })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    /// Monitored networks, deduplicated, in declared order.
    pub fn monitored_networks(&self) -> Vec<NetworkId> {
        let mut networks = self.networks.clone();
        networks.sort();
        networks.dedup();
        networks
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.tick_interval_secs == 0 {
            return Err(AppError::Config("tick interval must be at least 1 second".into()));
        }
        if self.tick_interval_secs > MAX_TICK_INTERVAL_SECS {
            return Err(AppError::Config(format!(
                "tick interval {}s exceeds the {}s maximum",
                self.tick_interval_secs, MAX_TICK_INTERVAL_SECS
            )));
        }
        if self.history_capacity == 0 {
            return Err(AppError::Config("history capacity must be positive".into()));
        }
        if self.history_capacity > MAX_HISTORY_CAPACITY {
            return Err(AppError::Config(format!(
                "history capacity {} exceeds the {} maximum",
                self.history_capacity, MAX_HISTORY_CAPACITY
            )));
        }
        if !(0.0..=1.0).contains(&self.fault_rate) {
            return Err(AppError::Config(format!(
                "fault rate {} is outside [0, 1]",
                self.fault_rate
            )));
        }
        if self.networks.is_empty() {
            return Err(AppError::Config("no networks to monitor".into()));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            tick_interval_secs: 6,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            networks: vec![NetworkId::Ethereum, NetworkId::Polygon, NetworkId::Arbitrum],
            fault_rate: 0.0,
        }
    }
}
