use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::ParseError,
    forecast::ForecastParser,
    model::{ForecastDay, ParsedForecast},
};

const NAME: &str = "weather.gov";

/// Adapter for the weather.gov `MapClick.php?...&FcstType=json` document.
///
/// Periods alternate between day and night; `tempLabel` says whether a
/// period's temperature is the high or the low.
#[derive(Debug, Clone, Default)]
pub struct WeatherGovParser;

pub(crate) fn parser() -> Arc<dyn ForecastParser> {
    Arc::new(WeatherGovParser)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WgLocation {
    area_description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WgTime {
    start_period_name: Vec<String>,
    temp_label: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WgData {
    temperature: Vec<Option<String>>,
    icon_link: Vec<String>,
    weather: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WgResponse {
    location: WgLocation,
    time: WgTime,
    data: WgData,
}

impl ForecastParser for WeatherGovParser {
    fn parse(&self, raw: &str, _metric: bool) -> Result<ParsedForecast, ParseError> {
        let parsed: WgResponse =
            serde_json::from_str(raw).map_err(|e| ParseError::malformed(NAME, e))?;

        let periods = parsed.time.start_period_name.len();
        if periods == 0 {
            return Err(ParseError::Empty(NAME));
        }

        let data = &parsed.data;
        let days = (0..periods)
            .map(|i| {
                let temp = data
                    .temperature
                    .get(i)
                    .and_then(|t| t.as_deref())
                    .and_then(|t| t.trim().parse::<f64>().ok());
                let is_low = parsed
                    .time
                    .temp_label
                    .get(i)
                    .is_some_and(|l| l.eq_ignore_ascii_case("low"));

                ForecastDay {
                    day: parsed.time.start_period_name[i].clone(),
                    icon: data.icon_link.get(i).map(|l| icon_key(l)).unwrap_or_default(),
                    min_temp: if is_low { temp } else { None },
                    max_temp: if is_low { None } else { temp },
                    summary: data.weather.get(i).cloned().unwrap_or_default(),
                }
            })
            .collect();

        Ok(ParsedForecast {
            days,
            summary: parsed.location.area_description,
        })
    }
}

/// `https://forecast.weather.gov/newimages/medium/bkn.png` as `wgovbkn.jpg`.
fn icon_key(link: &str) -> String {
    let file = link.rsplit('/').next().unwrap_or(link);
    let stem = file.split('.').next().unwrap_or(file);
    format!("wgov{stem}.jpg")
}
