//! Dashboard orchestration.
//!
//! A single ticker task owns [`DashboardState`]. Every tick it pulls one
//! reading per monitored network, folds it into that network's history and
//! publishes an immutable [`DashboardSnapshot`] on a `watch` channel. Readers
//! (the HTTP layer) only ever see snapshots.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::gas::model::{format_fee, format_native, REFERENCE_RATE_BASE};
use crate::gas::{
    classify, estimate, CongestionStatus, CostComparison, FeeReading, HistorySeries, NetworkId,
    NetworkProfile, ProfileTable,
};
use crate::services::{ConnectionSimulator, ConnectionState, GasPriceProvider};

/// Feed connections keyed by network. Shared read-only; simulators are cloneable handles.
pub type ConnectionSet = Arc<BTreeMap<NetworkId, ConnectionSimulator>>;

#[derive(Debug, Clone, Serialize)]
pub struct NetworkSnapshot {
    pub network: NetworkId,
    pub profile: Option<NetworkProfile>,
    pub latest: Option<FeeReading>,
    pub status: Option<CongestionStatus>,
    pub history: HistorySeries,
    /// Filled in by readers from the live connection set.
    pub connection: Option<FeedStatus>,
}

/// Point-in-time view of one feed connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedStatus {
    pub target: String,
    pub state: ConnectionState,
    pub reconnect_attempts: u32,
    pub max_reconnect_attempts: u32,
}

impl From<&ConnectionSimulator> for FeedStatus {
    fn from(connection: &ConnectionSimulator) -> Self {
        Self {
            target: connection.target().to_string(),
            state: connection.state(),
            reconnect_attempts: connection.reconnect_attempts(),
            max_reconnect_attempts: connection.max_reconnect_attempts(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub networks: BTreeMap<NetworkId, NetworkSnapshot>,
    pub reference_rate: f64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl DashboardSnapshot {
    pub fn latest_readings(&self) -> BTreeMap<NetworkId, FeeReading> {
        self.networks
            .iter()
            .filter_map(|(id, net)| net.latest.clone().map(|r| (*id, r)))
            .collect()
    }

    /// Cost of moving `principal` on every network, priced at this snapshot's rate.
    pub fn costs(&self, profiles: &ProfileTable, principal: f64) -> CostComparison {
        let comparison = estimate(
            profiles,
            &self.latest_readings(),
            self.reference_rate,
            principal,
        );
        for (network, cost) in &comparison.estimates {
            debug!(
                network = %network,
                gas = %format_native(cost.gas_native),
                total_reference = %format_fee(cost.total_reference),
                "Estimated transfer cost"
            );
        }
        comparison
    }
}

/// Mutable dashboard state. Owned by exactly one task at a time.
pub struct DashboardState {
    profiles: Arc<ProfileTable>,
    histories: BTreeMap<NetworkId, HistorySeries>,
    reference_rate: f64,
    updated_at: Option<DateTime<Utc>>,
}

impl DashboardState {
    pub fn new(profiles: Arc<ProfileTable>, networks: &[NetworkId], capacity: usize) -> Self {
        Self {
            profiles,
            histories: networks
                .iter()
                .map(|id| (*id, HistorySeries::new(capacity)))
                .collect(),
            reference_rate: REFERENCE_RATE_BASE,
            updated_at: None,
        }
    }

    /// Backfill every history so charts have data before the first tick.
    pub async fn seed(
        &mut self,
        provider: &dyn GasPriceProvider,
        interval: chrono::Duration,
        now: DateTime<Utc>,
    ) {
        for (network, history) in self.histories.iter_mut() {
            match provider
                .fetch_series(*network, history.capacity(), interval, now)
                .await
            {
                Ok(series) => {
                    *history = HistorySeries::from_readings(history.capacity(), series);
                    debug!(network = %network, points = history.len(), "Seeded history");
                }
                Err(e) => warn!(network = %network, error = %e, "Failed to seed history"),
            }
        }
        self.refresh_reference_rate(provider, now).await;
        self.updated_at = Some(now);
    }

    /// One tick: a fresh reading per network plus a new reference rate.
    ///
    /// A network whose fetch fails keeps its previous readings.
    pub async fn refresh(&mut self, provider: &dyn GasPriceProvider, now: DateTime<Utc>) {
        for (network, history) in self.histories.iter_mut() {
            match provider.fetch_reading(*network, now).await {
                Ok(reading) => {
                    debug!(
                        network = %network,
                        total = %format_fee(reading.total()),
                        block = reading.block_number(),
                        "New fee reading"
                    );
                    history.append(reading);
                }
                Err(e) => warn!(
                    network = %network,
                    provider = provider.provider_name(),
                    error = %e,
                    "Failed to refresh fee reading, keeping previous"
                ),
            }
        }
        self.refresh_reference_rate(provider, now).await;
        self.updated_at = Some(now);
    }

    async fn refresh_reference_rate(&mut self, provider: &dyn GasPriceProvider, now: DateTime<Utc>) {
        match provider.fetch_reference_rate(now).await {
            Ok(rate) => self.reference_rate = rate,
            Err(e) => warn!(error = %e, "Failed to refresh reference rate, keeping previous"),
        }
    }

    pub fn history(&self, network: NetworkId) -> Option<&HistorySeries> {
        self.histories.get(&network)
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        let networks = self
            .histories
            .iter()
            .map(|(id, history)| {
                let latest = history.latest().cloned();
                let status = latest
                    .as_ref()
                    .map(|reading| classify(&self.profiles, *id, reading));
                let snapshot = NetworkSnapshot {
                    network: *id,
                    profile: self.profiles.get(*id).cloned(),
                    latest,
                    status,
                    history: history.clone(),
                    connection: None,
                };
                (*id, snapshot)
            })
            .collect();

        DashboardSnapshot {
            networks,
            reference_rate: self.reference_rate,
            updated_at: self.updated_at,
        }
    }
}

fn feed_url(network: NetworkId) -> String {
    let host = match network {
        NetworkId::Ethereum => "eth",
        other => other.as_str(),
    };
    format!("wss://{}-mainnet.ws", host)
}

/// Drop each connected feed with probability `rate`.
fn inject_faults(connections: &ConnectionSet, rate: f64) {
    if rate <= 0.0 {
        return;
    }
    let mut rng = rand::thread_rng();
    for (network, connection) in connections.iter() {
        if connection.is_connected() && rng.gen_bool(rate) {
            debug!(network = %network, "Injecting feed fault");
            connection.simulate_disconnection();
        }
    }
}

async fn run_ticker(
    mut state: DashboardState,
    provider: Arc<dyn GasPriceProvider>,
    connections: ConnectionSet,
    tick: Duration,
    fault_rate: f64,
    snapshots: watch::Sender<DashboardSnapshot>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; state was seeded already.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                state.refresh(provider.as_ref(), Utc::now()).await;
                inject_faults(&connections, fault_rate);
                snapshots.send_replace(state.snapshot());
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    info!("Price ticker stopped");
}

/// Running dashboard: the ticker task plus one feed connection per network.
pub struct DashboardService {
    snapshots: watch::Receiver<DashboardSnapshot>,
    connections: ConnectionSet,
    shutdown: watch::Sender<bool>,
    /// Taken by `shutdown`; still present on drop means no clean stop happened.
    ticker: Option<JoinHandle<()>>,
}

impl DashboardService {
    /// Seed state, connect the feeds and start ticking.
    pub async fn start(
        config: &Config,
        profiles: Arc<ProfileTable>,
        provider: Arc<dyn GasPriceProvider>,
    ) -> Result<Self, AppError> {
        let spacing = config.history_spacing()?;
        let networks = config.monitored_networks();
        for id in networks.iter().filter(|id| !profiles.contains(**id)) {
            warn!(network = %id, "No profile for network, using default baseline");
        }
        let mut state = DashboardState::new(profiles, &networks, config.history_capacity);
        state
            .seed(provider.as_ref(), spacing, Utc::now())
            .await;

        let connections: ConnectionSet = Arc::new(
            networks
                .iter()
                .map(|id| {
                    let connection =
                        ConnectionSimulator::new(feed_url(*id), config.max_reconnect_attempts);
                    connection.connect();
                    (*id, connection)
                })
                .collect(),
        );

        let (snapshot_tx, snapshot_rx) = watch::channel(state.snapshot());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(
            networks = ?networks,
            tick_secs = config.tick_interval_secs,
            provider = provider.provider_name(),
            "Dashboard started"
        );

        let ticker = tokio::spawn(run_ticker(
            state,
            provider,
            Arc::clone(&connections),
            config.tick_interval(),
            config.fault_rate,
            snapshot_tx,
            shutdown_rx,
        ));

        Ok(Self {
            snapshots: snapshot_rx,
            connections,
            shutdown: shutdown_tx,
            ticker: Some(ticker),
        })
    }

    pub fn snapshots(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshots.clone()
    }

    pub fn connections(&self) -> ConnectionSet {
        Arc::clone(&self.connections)
    }

    /// Stop the ticker and close every feed, cancelling their timers.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(ticker) = self.ticker.take() {
            if let Err(e) = ticker.await {
                warn!(error = %e, "Price ticker ended abnormally");
            }
        }
        self.disconnect_all();
        info!("Dashboard stopped");
    }

    fn disconnect_all(&self) {
        for connection in self.connections.values() {
            connection.disconnect();
        }
    }
}

impl Drop for DashboardService {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            warn!("Dashboard dropped without shutdown, aborting ticker");
            ticker.abort();
            self.disconnect_all();
        }
    }
}
