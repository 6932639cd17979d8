use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::ForecastError,
    model::{DailyForecast, HourlyForecast, WeatherData},
    provider::truncate_body,
};

use super::ForecastProvider;

const HOURLY_VARIABLES: &str = "temperature_2m,apparent_temperature,weather_code";
const DAILY_VARIABLES: &str = "weather_code,temperature_2m_max,temperature_2m_min";

const HOUR: i64 = 3600;
const DAY: i64 = 86_400;

/// Open-Meteo forecast API client.
#[derive(Debug, Clone)]
pub struct OpenMeteoForecast {
    base_url: String,
    http: Client,
}

impl OpenMeteoForecast {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }
}

/// Compact time axis: the `i`-th stamp is `start + i * interval`, for
/// `i` in `0..(end - start) / interval`. Values are UTC unix seconds.
///
/// Only built through [`TimeAxis::from_stamps`], so `interval` is always positive
/// and every stamp up to `end` fits in an `i64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeAxis {
    start: i64,
    end: i64,
    interval: i64,
}

fn nth_stamp(start: i64, interval: i64, i: usize) -> Option<i64> {
    i64::try_from(i)
        .ok()
        .and_then(|i| i.checked_mul(interval))
        .and_then(|delta| start.checked_add(delta))
}

impl TimeAxis {
    /// Compress an explicit list of stamps, which must be evenly spaced.
    ///
    /// A single stamp has no spacing of its own and takes `default_interval`.
    pub fn from_stamps(stamps: &[i64], default_interval: i64) -> Result<Self, ForecastError> {
        let interval = match stamps {
            [first, second, ..] => second.checked_sub(*first).ok_or_else(|| {
                ForecastError::Inconsistent("time axis spacing overflows".to_string())
            })?,
            _ => default_interval,
        };

        if interval <= 0 {
            return Err(ForecastError::Inconsistent(format!(
                "non-increasing time axis (interval {interval})"
            )));
        }

        let Some(&start) = stamps.first() else {
            return Ok(Self { start: 0, end: 0, interval });
        };

        if let Some(i) = stamps
            .iter()
            .enumerate()
            .position(|(i, &t)| nth_stamp(start, interval, i) != Some(t))
        {
            return Err(ForecastError::Inconsistent(format!(
                "time axis is not evenly spaced at index {i}"
            )));
        }

        let end = nth_stamp(start, interval, stamps.len())
            .ok_or_else(|| ForecastError::Inconsistent("time axis end overflows".to_string()))?;

        Ok(Self { start, end, interval })
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn interval(&self) -> i64 {
        self.interval
    }

    pub fn len(&self) -> usize {
        self.end
            .checked_sub(self.start)
            .and_then(|span| span.checked_div(self.interval))
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expand into local wall-clock times, shifting each stamp by `utc_offset_seconds`.
    pub fn expand(&self, utc_offset_seconds: i64) -> Result<Vec<NaiveDateTime>, ForecastError> {
        (0..self.len())
            .map(|i| {
                nth_stamp(self.start, self.interval, i)
                    .and_then(|ts| ts.checked_add(utc_offset_seconds))
                    .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
                    .map(|dt| dt.naive_utc())
                    .ok_or_else(|| {
                        ForecastError::Inconsistent(format!("time step {i} out of range"))
                    })
            })
            .collect()
    }
}

/// Calendar dates of daily stamps taken at local midnight.
///
/// Across a DST change local midnights are 23 or 25 hours apart in UTC, and
/// `utc_offset_seconds` is only the offset at request time. Each stamp is
/// therefore shifted on its own and rounded to the nearest midnight.
fn local_dates(stamps: &[i64], utc_offset_seconds: i64) -> Result<Vec<NaiveDate>, ForecastError> {
    if let Some(i) = stamps.windows(2).position(|pair| pair[1] <= pair[0]) {
        return Err(ForecastError::Inconsistent(format!(
            "daily time axis is not increasing at index {}",
            i + 1
        )));
    }

    stamps
        .iter()
        .map(|&t| {
            t.checked_add(utc_offset_seconds)
                .and_then(|ts| ts.checked_add(DAY / 2))
                .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
                .map(|dt| dt.date_naive())
                .ok_or_else(|| ForecastError::Inconsistent(format!("daily stamp {t} out of range")))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct OmForecastResponse {
    #[serde(default)]
    utc_offset_seconds: i64,
    hourly: Option<OmHourly>,
    daily: Option<OmDaily>,
}

#[derive(Debug, Deserialize)]
struct OmHourly {
    time: Vec<i64>,
    temperature_2m: Option<Vec<Option<f64>>>,
    apparent_temperature: Option<Vec<Option<f64>>>,
    weather_code: Option<Vec<Option<u8>>>,
}

#[derive(Debug, Deserialize)]
struct OmDaily {
    time: Vec<i64>,
    weather_code: Option<Vec<Option<u8>>>,
    temperature_2m_max: Option<Vec<Option<f64>>>,
    temperature_2m_min: Option<Vec<Option<f64>>>,
}

/// A variable the provider left out is treated as all-missing; a variable
/// of the wrong length breaks index alignment and is rejected.
fn align<T: Clone>(
    name: &str,
    values: Option<Vec<Option<T>>>,
    len: usize,
) -> Result<Vec<Option<T>>, ForecastError> {
    match values {
        None => Ok(vec![None; len]),
        Some(v) if v.len() == len => Ok(v),
        Some(v) => Err(ForecastError::Inconsistent(format!(
            "{name} has {} values for {len} time steps",
            v.len()
        ))),
    }
}

fn decode_hourly(raw: OmHourly, offset: i64) -> Result<HourlyForecast, ForecastError> {
    let axis = TimeAxis::from_stamps(&raw.time, HOUR)?;
    let len = axis.len();

    Ok(HourlyForecast {
        time: axis.expand(offset)?,
        temperature: align("temperature_2m", raw.temperature_2m, len)?,
        apparent_temperature: align("apparent_temperature", raw.apparent_temperature, len)?,
        weather_code: align("hourly weather_code", raw.weather_code, len)?,
    })
}

fn decode_daily(raw: OmDaily, offset: i64) -> Result<DailyForecast, ForecastError> {
    let time = local_dates(&raw.time, offset)?;
    let len = time.len();

    Ok(DailyForecast {
        time,
        weather_code: align("daily weather_code", raw.weather_code, len)?,
        temperature_max: align("temperature_2m_max", raw.temperature_2m_max, len)?,
        temperature_min: align("temperature_2m_min", raw.temperature_2m_min, len)?,
    })
}

/// Decode a forecast response body.
pub(crate) fn decode_forecast(body: &str) -> Result<WeatherData, ForecastError> {
    if body.trim().is_empty() {
        return Err(ForecastError::NoData("empty response"));
    }

    let parsed: OmForecastResponse =
        serde_json::from_str(body).map_err(|source| ForecastError::Parse {
            source,
            snippet: truncate_body(body),
        })?;

    let offset = parsed.utc_offset_seconds;
    let hourly = parsed
        .hourly
        .ok_or(ForecastError::NoData("hourly section absent"))?;

    Ok(WeatherData {
        hourly: decode_hourly(hourly, offset)?,
        daily: parsed.daily.map(|d| decode_daily(d, offset)).transpose()?,
    })
}

#[async_trait]
impl ForecastProvider for OpenMeteoForecast {
    async fn try_forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherData, ForecastError> {
        let url = format!("{}/v1/forecast", self.base_url);
        let latitude = latitude.to_string();
        let longitude = longitude.to_string();

        tracing::debug!("Fetching forecast for ({}, {})", latitude, longitude);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
                ("hourly", HOURLY_VARIABLES),
                ("daily", DAILY_VARIABLES),
                ("timeformat", "unixtime"),
                ("timezone", "auto"),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(ForecastError::Status { status, body: truncate_body(&body) });
        }

        let data = decode_forecast(&body)?;
        tracing::debug!(
            "Forecast decoded: {} hourly steps, {} days",
            data.hourly.time.len(),
            data.daily.as_ref().map_or(0, |d| d.time.len())
        );

        Ok(data)
    }
}
