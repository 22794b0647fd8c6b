use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::ParseError,
    forecast::ForecastParser,
    model::{ForecastDay, ParsedForecast},
};

const NAME: &str = "apixu.com";

/// Adapter for the apixu-style `forecast.json` document (also served by
/// weatherapi.com). The payload carries both unit systems.
#[derive(Debug, Clone, Default)]
pub struct ApixuParser;

pub(crate) fn parser() -> Arc<dyn ForecastParser> {
    Arc::new(ApixuParser)
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
    country: String,
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct WaDay {
    maxtemp_c: f64,
    maxtemp_f: f64,
    mintemp_c: f64,
    mintemp_f: f64,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaForecastDay {
    date: String,
    day: WaDay,
}

#[derive(Debug, Deserialize)]
struct WaForecast {
    forecastday: Vec<WaForecastDay>,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    location: WaLocation,
    forecast: WaForecast,
}

impl ForecastParser for ApixuParser {
    fn parse(&self, raw: &str, metric: bool) -> Result<ParsedForecast, ParseError> {
        let parsed: WaResponse =
            serde_json::from_str(raw).map_err(|e| ParseError::malformed(NAME, e))?;

        if parsed.forecast.forecastday.is_empty() {
            return Err(ParseError::Empty(NAME));
        }

        let days = parsed
            .forecast
            .forecastday
            .into_iter()
            .map(|fd| {
                let (min, max) = if metric {
                    (fd.day.mintemp_c, fd.day.maxtemp_c)
                } else {
                    (fd.day.mintemp_f, fd.day.maxtemp_f)
                };

                ForecastDay {
                    day: day_label(&fd.date),
                    icon: icon_key(&fd.day.condition.icon),
                    min_temp: Some(min),
                    max_temp: Some(max),
                    summary: fd.day.condition.text,
                }
            })
            .collect();

        Ok(ParsedForecast {
            days,
            summary: format!("{}, {}", parsed.location.name, parsed.location.country),
        })
    }
}

/// `2024-06-01` as `Saturday`, or the raw date if it does not parse.
fn day_label(date: &str) -> String {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%A").to_string())
        .unwrap_or_else(|_| date.to_string())
}

/// `//cdn.weatherapi.com/weather/64x64/day/113.png` as `apixu_113.png`.
fn icon_key(icon_url: &str) -> String {
    let file = icon_url.rsplit('/').next().unwrap_or(icon_url);
    format!("apixu_{file}")
}
