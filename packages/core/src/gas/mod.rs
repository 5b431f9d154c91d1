//! Gas Price Core
//!
//! Synthetic fee generation and the metrics derived from it: rolling
//! history, congestion classification, and cross-network cost comparison.

pub mod cost;
pub mod history;
pub mod model;
pub mod networks;
pub mod status;

pub use cost::{estimate, CostComparison};
pub use history::{HistorySeries, DEFAULT_HISTORY_CAPACITY};
pub use model::{generate_reading, generate_series, reference_rate, FeeReading};
pub use networks::{NetworkId, NetworkProfile, ProfileTable};
pub use status::{classify, CongestionStatus};
