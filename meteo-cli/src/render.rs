use chrono::Local;
use meteo_core::{CityDetail, FailureKind, FavoriteCity, ForecastState, GeocodingResult};

pub fn suggestion_line(result: &GeocodingResult) -> String {
    if result.country.is_empty() {
        result.name.clone()
    } else {
        format!("{} ({})", result.name, result.country)
    }
}

pub fn favorite_line(fav: &FavoriteCity) -> String {
    format!(
        "{:<24} {:<20} {:>8.4}° {:>9.4}°",
        fav.name, fav.country, fav.latitude, fav.longitude
    )
}

fn degrees(value: Option<f64>) -> String {
    value.map_or_else(|| "--".to_string(), |v| format!("{}°", v.round() as i64))
}

pub fn detail(detail: &CityDetail) -> String {
    let star = if detail.is_favorite { '★' } else { '☆' };
    let mut out = format!("{} {}  {}\n", detail.city.name, star, detail.city.country);

    match &detail.forecast {
        ForecastState::Loaded(_) => {
            let now = Local::now().naive_local();
            if let Some(t) = detail.current_temperature(now) {
                out.push_str(&format!("\n  {t}°C\n"));
            }

            let days = detail.upcoming_days();
            if !days.is_empty() {
                out.push_str(&format!("\n  {:<8} {:<12} {}\n", "Date", "Température", "Météo"));
                for day in days {
                    out.push_str(&format!(
                        "  {:<8} {:<12} {}\n",
                        day.date.format("%d/%m"),
                        format!("{} / {}", degrees(day.low), degrees(day.high)),
                        day.condition.description(),
                    ));
                }
            }
        }
        ForecastState::NoData => out.push_str("\n  Aucune donnée météo.\n"),
        ForecastState::Unavailable(kind) => {
            let reason = match kind {
                FailureKind::Timeout => "le service météo est surchargé",
                FailureKind::Network => "pas de connexion",
                _ => "réponse invalide du service météo",
            };
            out.push_str(&format!("\n  Météo indisponible ({reason}).\n"));
        }
    }

    out
}
