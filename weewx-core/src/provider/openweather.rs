use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::ParseError,
    forecast::ForecastParser,
    model::{ForecastDay, ParsedForecast},
};

const NAME: &str = "openweathermap.org";

/// Adapter for the OpenWeatherMap daily forecast (`/data/2.5/forecast/daily`).
///
/// Units are already chosen by the `&units=` suffix added to the URL, so the
/// temperatures are taken as they come.
#[derive(Debug, Clone, Default)]
pub struct OpenWeatherParser;

pub(crate) fn parser() -> Arc<dyn ForecastParser> {
    Arc::new(OpenWeatherParser)
}

#[derive(Debug, Deserialize)]
struct OwTemp {
    min: f64,
    max: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    name: String,
    country: String,
}

#[derive(Debug, Deserialize)]
struct OwDailyEntry {
    dt: i64,
    temp: OwTemp,
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwDailyResponse {
    city: OwCity,
    list: Vec<OwDailyEntry>,
}

impl ForecastParser for OpenWeatherParser {
    fn parse(&self, raw: &str, _metric: bool) -> Result<ParsedForecast, ParseError> {
        let parsed: OwDailyResponse = serde_json::from_str(raw)
            .map_err(|e| ParseError::malformed(NAME, format!("{e} in {}", truncate_body(raw))))?;

        if parsed.list.is_empty() {
            return Err(ParseError::Empty(NAME));
        }

        let days = parsed
            .list
            .iter()
            .map(|entry| {
                let (summary, icon) = entry
                    .weather
                    .first()
                    .map(|w| (w.description.clone(), format!("owm_{}", w.icon)))
                    .unwrap_or_else(|| ("Unknown".to_string(), String::new()));

                ForecastDay {
                    day: unix_to_utc(entry.dt)
                        .map(|d| d.format("%A").to_string())
                        .unwrap_or_default(),
                    icon,
                    min_temp: Some(entry.temp.min),
                    max_temp: Some(entry.temp.max),
                    summary,
                }
            })
            .collect();

        Ok(ParsedForecast {
            days,
            summary: format!("{}, {}", parsed.city.name, parsed.city.country),
        })
    }
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
