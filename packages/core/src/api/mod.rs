//! HTTP API.
//!
//! Handlers never touch mutable dashboard state. They read the latest
//! published snapshot and overlay live connection states.

pub mod stations;

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::dashboard::{ConnectionSet, DashboardSnapshot, FeedStatus, NetworkSnapshot};
use crate::error::AppError;
use crate::gas::{CostComparison, NetworkId, ProfileTable};
use stations::{station_feed, STATIONS};

/// Transfer amount used when `/api/costs` is called without `amount`.
pub const DEFAULT_TRANSFER_AMOUNT: f64 = 0.5;

#[derive(Clone)]
pub struct AppState {
    snapshots: watch::Receiver<DashboardSnapshot>,
    connections: ConnectionSet,
    profiles: Arc<ProfileTable>,
}

impl AppState {
    pub fn new(
        snapshots: watch::Receiver<DashboardSnapshot>,
        connections: ConnectionSet,
        profiles: Arc<ProfileTable>,
    ) -> Self {
        Self {
            snapshots,
            connections,
            profiles,
        }
    }

    /// Latest snapshot with each network's live feed status filled in.
    fn current_snapshot(&self) -> DashboardSnapshot {
        let mut snapshot = self.snapshots.borrow().clone();
        for (id, network) in snapshot.networks.iter_mut() {
            network.connection = self.connections.get(id).map(FeedStatus::from);
        }
        snapshot
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/gas-prices", any(gas_prices))
        .route("/api/networks", get(list_networks))
        .route("/api/networks/:id", get(get_network))
        .route("/api/costs", get(costs))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn gas_prices(method: Method) -> Result<Response, AppError> {
    if method == Method::OPTIONS {
        return Ok(StatusCode::OK.into_response());
    }
    if method != Method::GET {
        return Err(AppError::MethodNotAllowed);
    }

    let feed = current_station_feed().map_err(|e| {
        error!(error = %e, "Station feed failed");
        e
    })?;
    Ok(Json(feed).into_response())
}

fn current_station_feed() -> Result<stations::StationFeed, AppError> {
    let mut rng = rand::thread_rng();
    station_feed(&STATIONS, chrono::Utc::now(), &mut rng)
}

async fn list_networks(State(state): State<AppState>) -> Json<DashboardSnapshot> {
    Json(state.current_snapshot())
}

async fn get_network(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<NetworkSnapshot>, AppError> {
    let network: NetworkId = id.parse().map_err(AppError::NotFound)?;
    state
        .current_snapshot()
        .networks
        .remove(&network)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("network '{}' is not monitored", network)))
}

#[derive(Debug, Deserialize)]
struct CostQuery {
    amount: Option<String>,
}

#[derive(Debug, Serialize)]
struct CostResponse {
    principal: f64,
    reference_rate: f64,
    #[serde(flatten)]
    comparison: CostComparison,
}

fn parse_amount(raw: Option<&str>) -> Result<f64, AppError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_TRANSFER_AMOUNT);
    };
    let amount: f64 = raw
        .trim()
        .parse()
        .map_err(|_| AppError::InvalidInput(format!("amount '{}' is not a number", raw)))?;
    if !amount.is_finite() || amount <= 0.0 {
        return Err(AppError::InvalidInput(format!(
            "amount must be positive, got {}",
            raw
        )));
    }
    Ok(amount)
}

async fn costs(
    State(state): State<AppState>,
    Query(query): Query<CostQuery>,
) -> Result<Json<CostResponse>, AppError> {
    let principal = parse_amount(query.amount.as_deref())?;
    let snapshot = state.snapshots.borrow().clone();

    Ok(Json(CostResponse {
        principal,
        reference_rate: snapshot.reference_rate,
        comparison: snapshot.costs(&state.profiles, principal),
    }))
}
