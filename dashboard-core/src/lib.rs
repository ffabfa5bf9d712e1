//! Core library for the weather dashboard.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The live weather provider and its error classification
//! - A deterministic mock generator used when live data is unavailable
//! - Tracked-city state and refresh orchestration
//!
//! It is used by `dashboard-cli`, but can also be reused by other front ends.

pub mod config;
pub mod dashboard;
pub mod error;
pub mod fetcher;
pub mod mock;
pub mod model;
pub mod provider;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{CityConfig, Config};
pub use dashboard::{AddOutcome, AutoRefresh, Dashboard, RefreshOutcome, Snapshot};
pub use error::WeatherError;
pub use fetcher::{FetchOutcome, Fetcher};
pub use mock::mock_weather;
pub use model::{CityId, CityQuery, Reading, ReadingSource, TrackedCity, WeatherRecord};
pub use provider::{WeatherProvider, provider_from_config};
