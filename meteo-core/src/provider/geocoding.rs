use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{error::GeocodingError, model::GeocodingResult, provider::truncate_body};

use super::GeocodingProvider;

/// Open-Meteo geocoding API client.
#[derive(Debug, Clone)]
pub struct OpenMeteoGeocoder {
    base_url: String,
    language: String,
    http: Client,
}

impl OpenMeteoGeocoder {
    pub fn new(base_url: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            language: language.into(),
            http: Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OmSearchResponse {
    #[serde(default)]
    results: Option<Vec<OmPlace>>,
}

#[derive(Debug, Deserialize)]
struct OmPlace {
    id: i64,
    name: String,
    latitude: f64,
    longitude: f64,
    // Some places (oceans, disputed areas) come without a country.
    #[serde(default)]
    country: String,
}

impl From<OmPlace> for GeocodingResult {
    fn from(p: OmPlace) -> Self {
        Self {
            id: p.id,
            name: p.name,
            latitude: p.latitude,
            longitude: p.longitude,
            country: p.country,
        }
    }
}

#[async_trait]
impl GeocodingProvider for OpenMeteoGeocoder {
    async fn try_search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<GeocodingResult>, GeocodingError> {
        let url = format!("{}/v1/search", self.base_url);
        let count = limit.to_string();

        tracing::debug!("Geocoding {:?} (count={})", query, count);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("name", query),
                ("count", count.as_str()),
                ("language", self.language.as_str()),
                ("format", "json"),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(GeocodingError::Status { status, body: truncate_body(&body) });
        }

        let parsed: OmSearchResponse = serde_json::from_str(&body)?;

        Ok(parsed
            .results
            .unwrap_or_default()
            .into_iter()
            .map(GeocodingResult::from)
            .collect())
    }
}
