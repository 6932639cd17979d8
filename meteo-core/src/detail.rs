//! One city's screen: resolve the name, fetch its forecast, check favorites.

use chrono::NaiveDateTime;
use std::sync::Arc;

use crate::{
    error::FailureKind,
    favorites::FavoritesStore,
    model::{DaySummary, FavoriteCity, GeocodingResult, WeatherData},
    provider::{ForecastProvider, GeocodingProvider, report_forecast_failure},
    storage::KeyValueStore,
};

/// Outcome of the forecast step, kept apart from "city not found" so the
/// screen can tell the user what went wrong.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastState {
    Loaded(WeatherData),
    NoData,
    Unavailable(FailureKind),
}

impl ForecastState {
    pub fn data(&self) -> Option<&WeatherData> {
        match self {
            Self::Loaded(data) => Some(data),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CityDetail {
    pub city: GeocodingResult,
    pub forecast: ForecastState,
    pub is_favorite: bool,
}

impl CityDetail {
    /// Rounded temperature of the hourly slot nearest to `now`.
    pub fn current_temperature(&self, now: NaiveDateTime) -> Option<i64> {
        self.forecast
            .data()?
            .temperature_at(now)
            .map(|t| t.round() as i64)
    }

    pub fn upcoming_days(&self) -> Vec<DaySummary> {
        self.forecast.data().map(WeatherData::upcoming_days).unwrap_or_default()
    }
}

#[derive(Debug)]
pub struct CityDetailFlow<S> {
    geocoder: Arc<dyn GeocodingProvider>,
    forecaster: Arc<dyn ForecastProvider>,
    favorites: FavoritesStore<S>,
}

impl<S: KeyValueStore> CityDetailFlow<S> {
    pub fn new(
        geocoder: Arc<dyn GeocodingProvider>,
        forecaster: Arc<dyn ForecastProvider>,
        favorites: FavoritesStore<S>,
    ) -> Self {
        Self { geocoder, forecaster, favorites }
    }

    pub fn geocoder(&self) -> Arc<dyn GeocodingProvider> {
        Arc::clone(&self.geocoder)
    }

    pub fn favorites(&self) -> &FavoritesStore<S> {
        &self.favorites
    }

    /// Geocode, then fetch the forecast, then check membership, strictly in
    /// that order. `None` when the city could not be resolved.
    pub async fn load(&self, city: &str) -> Option<CityDetail> {
        let city = self.geocoder.resolve_city(city).await?;

        let forecast = match self.forecaster.try_forecast(city.latitude, city.longitude).await {
            Ok(data) => ForecastState::Loaded(data),
            Err(e) => match report_forecast_failure(&e) {
                FailureKind::NoData => ForecastState::NoData,
                kind => ForecastState::Unavailable(kind),
            },
        };

        let is_favorite = self.favorites.is_favorite(&city.name).await;

        Some(CityDetail { city, forecast, is_favorite })
    }

    /// Flip the city's favorite status and return the new status.
    pub async fn toggle_favorite(&self, detail: &mut CityDetail) -> bool {
        if detail.is_favorite {
            self.favorites.remove(&detail.city.name).await;
            detail.is_favorite = false;
        } else {
            self.favorites.add(FavoriteCity::from(&detail.city)).await;
            detail.is_favorite = true;
        }
        detail.is_favorite
    }
}
