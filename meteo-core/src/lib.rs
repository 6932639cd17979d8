//! Core library for the `meteo` city weather app.
//!
//! This crate defines:
//! - Configuration handling
//! - Open-Meteo geocoding and forecast clients
//! - The persistent favorites store
//! - The debounced city search and the city detail flow
//!
//! It is used by `meteo-cli`, but can also back other front ends.

pub mod config;
pub mod detail;
pub mod error;
pub mod favorites;
pub mod model;
pub mod provider;
pub mod search;
pub mod storage;

pub use config::{Config, Screen};
pub use detail::{CityDetail, CityDetailFlow, ForecastState};
pub use error::{FailureKind, ForecastError, GeocodingError, StorageError};
pub use favorites::{FAVORITES_KEY, FavoritesStore};
pub use model::{
    DailyForecast, DaySummary, FavoriteCity, GeocodingResult, HourlyForecast, WeatherCondition,
    WeatherData,
};
pub use provider::{ForecastProvider, GeocodingProvider, OpenMeteoForecast, OpenMeteoGeocoder};
pub use search::{CityRoute, SearchConfig, SearchPhase, SearchSession, SearchState};
pub use storage::{FileStore, KeyValueStore, MemoryStore};

use std::sync::Arc;

/// Build the detail flow wired to Open-Meteo and the on-disk favorites.
pub fn detail_flow_from_config(config: &Config) -> anyhow::Result<CityDetailFlow<FileStore>> {
    let geocoder = Arc::new(OpenMeteoGeocoder::new(&config.geocoding_url, &config.language));
    let forecaster = Arc::new(OpenMeteoForecast::new(&config.forecast_url));
    let favorites = FavoritesStore::new(FileStore::new(config.favorites_dir()?));

    Ok(CityDetailFlow::new(geocoder, forecaster, favorites))
}
