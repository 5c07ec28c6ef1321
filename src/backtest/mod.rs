//! Constituent momentum backtest.
//!
//! ```text
//! CSV inputs ──► MarketData ──► Universe (membership replay from the anchor snapshot)
//!                     │               │
//!                     ▼               ▼
//!                 PriceTable ──► momentum rank ──► top-K equal weight ──► NAV
//! ```
//!
//! The latest recorded snapshot anchors the replay: later dates apply
//! membership events forward, earlier dates undo them in reverse. Every
//! other recorded snapshot can be compared with its reconstruction
//! ([`Universe::verify`]).

mod data;
mod error;
pub mod export;
mod metrics;
mod momentum;
mod portfolio;
mod schedule;
mod universe;

pub use data::{Action, MarketData, MembershipEvent, PriceTable, Snapshots};
pub use error::{BacktestError, DataError};
pub use metrics::{Metrics, Summary};
pub use momentum::{rank, ratio, top_k};
pub use portfolio::{DayRecord, RebalanceRecord, Simulation, Strategy, simulate};
pub use schedule::Rebalance;
pub use universe::{Anomaly, AnomalyKind, SnapshotCheck, Universe};
