//! Mock retail fuel station feed served at `/api/gas-prices`.
//!
//! Unrelated to the chain fee model; it shares only the live-refresh shape.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

use crate::error::AppError;

pub const FEED_ERROR: &str = "Failed to fetch gas prices";

/// Price jitter half-width applied on every fetch.
const PRICE_JITTER: f64 = 0.05;

pub struct StationSeed {
    pub name: &'static str,
    pub price: &'static str,
    pub address: &'static str,
}

pub const STATIONS: [StationSeed; 4] = [
    StationSeed {
        name: "Shell Station",
        price: "3.45",
        address: "123 Main St, City, State",
    },
    StationSeed {
        name: "BP Station",
        price: "3.42",
        address: "456 Oak Ave, City, State",
    },
    StationSeed {
        name: "Exxon Mobil",
        price: "3.48",
        address: "789 Pine Rd, City, State",
    },
    StationSeed {
        name: "Chevron",
        price: "3.41",
        address: "321 Elm St, City, State",
    },
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub name: String,
    pub price: String,
    pub address: String,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationFeed {
    pub stations: Vec<Station>,
    pub last_fetch: DateTime<Utc>,
}

/// Build a feed from `seeds`, jittering every listed price.
pub fn station_feed<R: Rng>(
    seeds: &[StationSeed],
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<StationFeed, AppError> {
    let stations = seeds
        .iter()
        .map(|seed| -> Result<Station, AppError> {
            let listed = seed.price.parse::<f64>().map_err(|e| {
                AppError::internal(FEED_ERROR, format!("invalid price for {}: {}", seed.name, e))
            })?;
            let jitter = rng.gen_range(-PRICE_JITTER..PRICE_JITTER);
            Ok(Station {
                name: seed.name.to_string(),
                price: format!("{:.2}", listed + jitter),
                address: seed.address.to_string(),
                last_updated: now,
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    Ok(StationFeed {
        stations,
        last_fetch: now,
    })
}
