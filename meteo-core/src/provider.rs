use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::{FailureKind, ForecastError, GeocodingError},
    model::{GeocodingResult, WeatherData},
};

pub mod forecast;
pub mod geocoding;

pub use forecast::{OpenMeteoForecast, TimeAxis};
pub use geocoding::OpenMeteoGeocoder;

/// Turns free-text city names into coordinates.
///
/// Implementors only provide `try_search`; the soft-failing operations are
/// derived from it and never return an error.
#[async_trait]
pub trait GeocodingProvider: Send + Sync + Debug {
    async fn try_search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<GeocodingResult>, GeocodingError>;

    /// Best match for `name`, or `None` when nothing matched or the call failed.
    async fn resolve_city(&self, name: &str) -> Option<GeocodingResult> {
        match self.try_search(name, 1).await {
            Ok(results) => {
                let first = results.into_iter().next();
                if first.is_none() {
                    tracing::info!("No geocoding result for {:?}", name);
                }
                first
            }
            Err(e) => {
                tracing::warn!("Geocoding {:?} failed: {}", name, e);
                None
            }
        }
    }

    /// Up to `limit` ranked candidates; empty on no match or failure.
    async fn search_cities(&self, query: &str, limit: usize) -> Vec<GeocodingResult> {
        match self.try_search(query, limit).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!("City search for {:?} failed: {}", query, e);
                Vec::new()
            }
        }
    }
}

/// Fetches forecasts for a pair of coordinates.
#[async_trait]
pub trait ForecastProvider: Send + Sync + Debug {
    async fn try_forecast(&self, latitude: f64, longitude: f64)
    -> Result<WeatherData, ForecastError>;

    /// Never fails: every error is classified, logged, and reported as `None`.
    /// Gateway timeouts are not retried.
    async fn fetch_forecast(&self, latitude: f64, longitude: f64) -> Option<WeatherData> {
        match self.try_forecast(latitude, longitude).await {
            Ok(data) => Some(data),
            Err(e) => {
                report_forecast_failure(&e);
                None
            }
        }
    }
}

/// Log a forecast failure at the severity its kind calls for.
pub fn report_forecast_failure(err: &ForecastError) -> FailureKind {
    let kind = err.kind();
    match kind {
        FailureKind::NoData => tracing::info!("{}", err),
        FailureKind::Malformed => tracing::warn!(
            "Forecast API returned an error page instead of JSON, server may be overloaded or down: {}",
            err
        ),
        FailureKind::Timeout => {
            tracing::warn!("Forecast API gateway timeout, not retrying: {}", err)
        }
        FailureKind::Network => tracing::warn!("Network error fetching forecast: {}", err),
        // forecast errors are never classified as storage failures
        FailureKind::Storage => tracing::error!("Unexpected forecast failure kind: {}", err),
        FailureKind::Unclassified => tracing::error!("Error fetching forecast: {}", err),
    }
    kind
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}
