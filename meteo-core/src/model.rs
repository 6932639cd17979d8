use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A place returned by the geocoding provider.
///
/// `id` is assigned upstream and is not retained once a city becomes a favorite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodingResult {
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country: String,
}

/// A bookmarked city, persisted across sessions.
///
/// Two favorites are the same city when their `(name, country)` pair matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteCity {
    pub name: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl FavoriteCity {
    pub fn same_city(&self, other: &FavoriteCity) -> bool {
        self.name == other.name && self.country == other.country
    }
}

impl From<&GeocodingResult> for FavoriteCity {
    fn from(result: &GeocodingResult) -> Self {
        Self {
            name: result.name.clone(),
            country: result.country.clone(),
            latitude: result.latitude,
            longitude: result.longitude,
        }
    }
}

/// Hourly series, index-aligned with `time`.
///
/// Times are local wall-clock times of the forecast location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyForecast {
    pub time: Vec<NaiveDateTime>,
    pub temperature: Vec<Option<f64>>,
    pub apparent_temperature: Vec<Option<f64>>,
    pub weather_code: Vec<Option<u8>>,
}

/// Daily series, index-aligned with `time`. Index 0 is today.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub time: Vec<NaiveDate>,
    pub weather_code: Vec<Option<u8>>,
    pub temperature_max: Vec<Option<f64>>,
    pub temperature_min: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherData {
    pub hourly: HourlyForecast,
    pub daily: Option<DailyForecast>,
}

/// One row of the "next days" table.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub low: Option<f64>,
    pub high: Option<f64>,
    pub condition: WeatherCondition,
}

impl WeatherData {
    /// Hourly temperature of the slot closest to `now`.
    pub fn temperature_at(&self, now: NaiveDateTime) -> Option<f64> {
        let idx = self
            .hourly
            .time
            .iter()
            .enumerate()
            .min_by_key(|(_, t)| (**t - now).num_seconds().abs())
            .map(|(i, _)| i)?;

        self.hourly.temperature.get(idx).copied().flatten()
    }

    /// Days after today, at most six.
    pub fn upcoming_days(&self) -> Vec<DaySummary> {
        let Some(daily) = &self.daily else {
            return Vec::new();
        };

        daily
            .time
            .iter()
            .enumerate()
            .skip(1)
            .take(6)
            .map(|(i, date)| DaySummary {
                date: *date,
                low: daily.temperature_min.get(i).copied().flatten(),
                high: daily.temperature_max.get(i).copied().flatten(),
                condition: daily
                    .weather_code
                    .get(i)
                    .copied()
                    .flatten()
                    .map(WeatherCondition::from_wmo_code)
                    .unwrap_or_default(),
            })
            .collect()
    }
}

/// Weather condition categories mapped from WMO codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    ClearSky,
    MainlyClear,
    PartlyCloudy,
    Overcast,
    Fog,
    Drizzle,
    FreezingDrizzle,
    Rain,
    FreezingRain,
    Snowfall,
    SnowGrains,
    RainShowers,
    SnowShowers,
    Thunderstorm,
    ThunderstormWithHail,
    #[default]
    Unknown,
}

impl WeatherCondition {
    /// See: https://open-meteo.com/en/docs#weathervariables
    pub fn from_wmo_code(code: u8) -> Self {
        match code {
            0 => Self::ClearSky,
            1 => Self::MainlyClear,
            2 => Self::PartlyCloudy,
            3 => Self::Overcast,
            45 | 48 => Self::Fog,
            51..=55 => Self::Drizzle,
            56 | 57 => Self::FreezingDrizzle,
            61..=65 => Self::Rain,
            66 | 67 => Self::FreezingRain,
            71..=75 => Self::Snowfall,
            77 => Self::SnowGrains,
            80..=82 => Self::RainShowers,
            85 | 86 => Self::SnowShowers,
            95 => Self::Thunderstorm,
            96 | 99 => Self::ThunderstormWithHail,
            _ => Self::Unknown,
        }
    }

    /// French label shown next to a forecast row.
    pub fn description(&self) -> &'static str {
        match self {
            Self::ClearSky => "Ciel dégagé",
            Self::MainlyClear => "Principalement dégagé",
            Self::PartlyCloudy => "Partiellement nuageux",
            Self::Overcast => "Couvert",
            Self::Fog => "Brouillard",
            Self::Drizzle => "Bruine",
            Self::FreezingDrizzle => "Bruine verglaçante",
            Self::Rain => "Pluie",
            Self::FreezingRain => "Pluie verglaçante",
            Self::Snowfall => "Chute de neige",
            Self::SnowGrains => "Grains de neige",
            Self::RainShowers => "Averses de pluie",
            Self::SnowShowers => "Averses de neige",
            Self::Thunderstorm => "Orage",
            Self::ThunderstormWithHail => "Orage avec grêle",
            Self::Unknown => "Inconnu",
        }
    }
}
