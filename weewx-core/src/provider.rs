//! Weather provider registry.
//!
//! Every supported provider is one [`ProviderSpec`] entry: how to turn the
//! manifest's `forecast` value into a fetchable URL, whether it needs the
//! icon bundle, which banner asset it shows, and the parser adapter shipped
//! with this crate (if any). Adding a provider is adding an entry.

use serde::Deserialize;
use std::{convert::TryFrom, sync::Arc};

use crate::{
    error::{ConfigError, ValidationError},
    forecast::ForecastParser,
};

pub mod openweather;
pub mod weatherapi;
pub mod wgov;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    Yahoo,
    WeatherZone,
    YrNo,
    Bom,
    Wmo,
    WeatherGov,
    WeatherGc,
    WeatherGcFr,
    MetOffice,
    Bom2,
    Aemet,
    Dwd,
    MetService,
    MeteoFrance,
    DarkSky,
    OpenWeatherMap,
    Apixu,
    WeatherCom,
    MetIe,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        self.spec().name
    }

    pub const fn all() -> &'static [ProviderId] {
        &[
            ProviderId::Yahoo,
            ProviderId::WeatherZone,
            ProviderId::YrNo,
            ProviderId::Bom,
            ProviderId::Wmo,
            ProviderId::WeatherGov,
            ProviderId::WeatherGc,
            ProviderId::WeatherGcFr,
            ProviderId::MetOffice,
            ProviderId::Bom2,
            ProviderId::Aemet,
            ProviderId::Dwd,
            ProviderId::MetService,
            ProviderId::MeteoFrance,
            ProviderId::DarkSky,
            ProviderId::OpenWeatherMap,
            ProviderId::Apixu,
            ProviderId::WeatherCom,
            ProviderId::MetIe,
        ]
    }

    pub fn spec(&self) -> &'static ProviderSpec {
        // REGISTRY is declared in the same order as the enum
        &REGISTRY[*self as usize]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = ConfigError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.trim().to_lowercase();

        REGISTRY
            .iter()
            .find(|spec| spec.name == lower)
            .map(|spec| spec.id)
            .ok_or_else(|| ConfigError::UnknownProvider(value.to_string()))
    }
}

/// Builds the parser adapter bundled for a provider.
pub type ParserFactory = fn() -> Arc<dyn ForecastParser>;

#[derive(Debug)]
pub struct ProviderSpec {
    pub id: ProviderId,
    pub name: &'static str,
    pub rule: UrlRule,
    pub requires_icons: bool,
    /// Asset file shown above the forecast.
    pub banner: &'static str,
    pub bundled_parser: Option<ParserFactory>,
}

/// How a manifest `forecast` value becomes the URL that is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlRule {
    /// Used as given.
    Passthrough,
    /// Must already be an http(s) URL.
    RequireHttp,
    /// `value + always + (metric | imperial)`.
    Append {
        always: &'static str,
        metric: &'static str,
        imperial: &'static str,
    },
    /// `prefix + value + suffix + (metric | imperial)`; with `unless_url`, a
    /// value that is already a URL is left alone.
    Wrap {
        prefix: &'static str,
        suffix: &'static str,
        metric: &'static str,
        imperial: &'static str,
        unless_url: bool,
    },
    /// `PRODUCT,Town` to the bom.gov.au anonymous FTP product.
    BomFtp,
    /// `lat,lon` or a `?lat=..&lon=..` query to weather.gov MapClick JSON.
    Coordinates,
    /// `lat,lon` to met.ie daily forecast, with a reverse geocode lookup.
    MetIe,
}

/// Result of applying a [`UrlRule`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Derivation {
    pub forecast_url: String,
    /// Town persisted for bom.gov.au forecasts.
    pub bom_town: Option<String>,
    /// Document to fetch to resolve a human-readable place name.
    pub reverse_geocode_url: Option<String>,
}

impl ProviderSpec {
    pub fn derive(&self, raw: &str, metric: bool) -> Result<Derivation, ValidationError> {
        let raw = raw.trim();
        let units = |m: &str, i: &str| if metric { m.to_string() } else { i.to_string() };

        let derivation = match self.rule {
            UrlRule::Passthrough => Derivation::url(raw),
            UrlRule::RequireHttp => {
                if !raw.starts_with("http") {
                    return Err(self.invalid(
                        "Yahoo API recently changed, you need to update your settings.",
                    ));
                }
                Derivation::url(raw)
            }
            UrlRule::Append {
                always,
                metric: m,
                imperial: i,
            } => Derivation::url(format!("{raw}{always}{}", units(m, i))),
            UrlRule::Wrap {
                prefix,
                suffix,
                metric: m,
                imperial: i,
                unless_url,
            } => {
                if unless_url && raw.starts_with("http") {
                    Derivation::url(raw)
                } else {
                    Derivation::url(format!("{prefix}{raw}{suffix}{}", units(m, i)))
                }
            }
            UrlRule::BomFtp => {
                let (product, town) = raw
                    .split_once(',')
                    .ok_or_else(|| self.invalid("expected PRODUCT,Town"))?;
                Derivation {
                    forecast_url: format!(
                        "ftp://ftp.bom.gov.au/anon/gen/fwo/{}.xml",
                        product.trim()
                    ),
                    bom_town: Some(town.trim().to_string()),
                    reverse_geocode_url: None,
                }
            }
            UrlRule::Coordinates => {
                let (lat, lon) = self.coordinates(raw)?;
                Derivation::url(format!(
                    "https://forecast.weather.gov/MapClick.php?lat={lat}&lon={lon}\
                     &unit=0&lg=english&FcstType=json"
                ))
            }
            UrlRule::MetIe => {
                let (lat, lon) = self.coordinates(raw)?;
                Derivation {
                    forecast_url: format!(
                        "https://prodapi.metweb.ie/weather/daily/{lat}/{lon}/10"
                    ),
                    bom_town: None,
                    reverse_geocode_url: Some(format!(
                        "https://prodapi.metweb.ie/location/reverse/{lat}/{lon}"
                    )),
                }
            }
        };

        Ok(derivation)
    }

    /// Latitude and longitude as given, after checking they are real numbers
    /// and not both zero.
    fn coordinates<'a>(&self, raw: &'a str) -> Result<(&'a str, &'a str), ValidationError> {
        let missing = || ValidationError::CoordinatesMissing(self.name.to_string());

        let (lat, lon) = match raw.split_once('?') {
            Some((_, query)) => {
                if !query.contains("lat") || !query.contains("lon") {
                    return Err(missing());
                }
                let mut lat = "0.0";
                let mut lon = "0.0";
                for bit in query.split('&') {
                    if let Some(v) = bit.strip_prefix("lat=") {
                        lat = v.trim();
                    }
                    if let Some(v) = bit.strip_prefix("lon=") {
                        lon = v.trim();
                    }
                }
                (lat, lon)
            }
            None => {
                let (lat, lon) = raw.split_once(',').ok_or_else(missing)?;
                (lat.trim(), lon.trim())
            }
        };

        let lat_value: f64 = lat.parse().map_err(|_| missing())?;
        let lon_value: f64 = lon.parse().map_err(|_| missing())?;
        if lat_value == 0.0 && lon_value == 0.0 {
            return Err(missing());
        }

        Ok((lat, lon))
    }

    fn invalid(&self, reason: &str) -> ValidationError {
        ValidationError::InvalidForecastLocation {
            provider: self.name.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl Derivation {
    fn url(url: impl Into<String>) -> Self {
        Self {
            forecast_url: url.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReverseGeocode {
    city: String,
}

/// Place name from a met.ie reverse geocode document.
pub fn met_ie_place(body: &[u8]) -> Result<String, serde_json::Error> {
    let parsed: ReverseGeocode = serde_json::from_slice(body)?;
    Ok(format!("{}, Ireland", parsed.city.trim()))
}

const fn plain(id: ProviderId, name: &'static str, banner: &'static str) -> ProviderSpec {
    ProviderSpec {
        id,
        name,
        rule: UrlRule::Passthrough,
        requires_icons: false,
        banner,
        bundled_parser: None,
    }
}

static REGISTRY: [ProviderSpec; 19] = [
    ProviderSpec {
        rule: UrlRule::RequireHttp,
        requires_icons: true,
        ..plain(ProviderId::Yahoo, "yahoo", "purple.png")
    },
    ProviderSpec {
        rule: UrlRule::Wrap {
            prefix: "https://rss.weatherzone.com.au/?u=12994-1285&lt=aploc&lc=",
            suffix: "&obs=0&fc=1&warn=0",
            metric: "",
            imperial: "",
            unless_url: false,
        },
        ..plain(ProviderId::WeatherZone, "weatherzone", "wz.png")
    },
    plain(ProviderId::YrNo, "yr.no", "yrno.png"),
    ProviderSpec {
        rule: UrlRule::BomFtp,
        ..plain(ProviderId::Bom, "bom.gov.au", "bom.png")
    },
    ProviderSpec {
        rule: UrlRule::Wrap {
            prefix: "https://worldweather.wmo.int/en/json/",
            suffix: "_en.xml",
            metric: "",
            imperial: "",
            unless_url: true,
        },
        ..plain(ProviderId::Wmo, "wmo.int", "wmo.png")
    },
    ProviderSpec {
        rule: UrlRule::Coordinates,
        requires_icons: true,
        bundled_parser: Some(wgov::parser),
        ..plain(ProviderId::WeatherGov, "weather.gov", "wgov.png")
    },
    plain(ProviderId::WeatherGc, "weather.gc.ca", "wca.png"),
    plain(ProviderId::WeatherGcFr, "weather.gc.ca-fr", "wca.png"),
    plain(ProviderId::MetOffice, "metoffice.gov.uk", "met.png"),
    plain(ProviderId::Bom2, "bom2", "bom.png"),
    plain(ProviderId::Aemet, "aemet.es", "aemet.jpg"),
    plain(ProviderId::Dwd, "dwd.de", "dwd.jpg"),
    ProviderSpec {
        rule: UrlRule::Wrap {
            prefix: "https://www.metservice.com/publicData/localForecast",
            suffix: "",
            metric: "",
            imperial: "",
            unless_url: false,
        },
        ..plain(ProviderId::MetService, "metservice.com", "metservice.png")
    },
    plain(ProviderId::MeteoFrance, "meteofrance.com", "mf.png"),
    ProviderSpec {
        rule: UrlRule::Append {
            always: "?exclude=currently,minutely,hourly,alerts,flags&lang=en",
            metric: "&units=ca",
            imperial: "",
        },
        ..plain(ProviderId::DarkSky, "darksky.net", "darksky.png")
    },
    ProviderSpec {
        rule: UrlRule::Append {
            always: "",
            metric: "&units=metric",
            imperial: "&units=imperial",
        },
        bundled_parser: Some(openweather::parser),
        ..plain(ProviderId::OpenWeatherMap, "openweathermap.org", "owm.png")
    },
    ProviderSpec {
        rule: UrlRule::Append {
            always: "&days=10",
            metric: "",
            imperial: "",
        },
        bundled_parser: Some(weatherapi::parser),
        ..plain(ProviderId::Apixu, "apixu.com", "apixu.png")
    },
    ProviderSpec {
        rule: UrlRule::Wrap {
            prefix: "https://api.weather.com/v2/turbo/vt1dailyForecast?\
                     apiKey=d522aa97197fd864d36b418f39ebb323&format=json&geocode=",
            suffix: "&language=en-US",
            metric: "&units=m",
            imperial: "&units=e",
            unless_url: false,
        },
        ..plain(ProviderId::WeatherCom, "weather.com", "weather_com.png")
    },
    ProviderSpec {
        rule: UrlRule::MetIe,
        ..plain(ProviderId::MetIe, "met.ie", "met_ie.png")
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    fn derive(id: ProviderId, raw: &str, metric: bool) -> Result<Derivation, ValidationError> {
        id.spec().derive(raw, metric)
    }

    #[test]
    fn provider_id_as_str_roundtrip() {
        for id in ProviderId::all() {
            let s = id.as_str();
            let parsed = ProviderId::try_from(s).expect("roundtrip should succeed");
            assert_eq!(*id, parsed);
        }
    }

    #[test]
    fn registry_is_indexed_by_id() {
        assert_eq!(ProviderId::all().len(), REGISTRY.len());
        for id in ProviderId::all() {
            assert_eq!(id.spec().id, *id);
        }
    }

    #[test]
    fn unknown_provider_error() {
        let err = ProviderId::try_from("doesnotexist").unwrap_err();
        assert!(err.to_string().contains("invalid or not coded yet"));
    }

    #[test]
    fn only_yahoo_and_weather_gov_need_icons() {
        let needing: Vec<_> = ProviderId::all()
            .iter()
            .filter(|id| id.spec().requires_icons)
            .copied()
            .collect();

        assert_eq!(needing, vec![ProviderId::Yahoo, ProviderId::WeatherGov]);
    }

    #[test]
    fn weather_gov_bare_pair() {
        let d = derive(ProviderId::WeatherGov, "40.0,-80.0", true).unwrap();

        assert!(d.forecast_url.contains("lat=40.0&lon=-80.0"));
        assert!(d.forecast_url.starts_with("https://forecast.weather.gov/MapClick.php?"));
        assert!(d.forecast_url.ends_with("&unit=0&lg=english&FcstType=json"));
    }

    #[test]
    fn weather_gov_query_form() {
        let d = derive(
            ProviderId::WeatherGov,
            "https://forecast.weather.gov/MapClick.php?lat=38.89&lon=-77.03",
            false,
        )
        .unwrap();

        assert!(d.forecast_url.contains("lat=38.89&lon=-77.03"));
    }

    #[test]
    fn weather_gov_rejects_missing_or_zero_coordinates() {
        let missing = ValidationError::CoordinatesMissing("weather.gov".into());

        assert_eq!(derive(ProviderId::WeatherGov, "0.0,0.0", true).unwrap_err(), missing);
        assert_eq!(derive(ProviderId::WeatherGov, "0,0", true).unwrap_err(), missing);
        assert_eq!(derive(ProviderId::WeatherGov, "Washington", true).unwrap_err(), missing);
        assert_eq!(
            derive(ProviderId::WeatherGov, "https://x/MapClick.php?zone=5", true).unwrap_err(),
            missing
        );
        assert_eq!(
            derive(ProviderId::WeatherGov, "https://x/MapClick.php?lat=0.0&lon=0.0", true)
                .unwrap_err(),
            missing
        );
    }

    #[test]
    fn weatherzone_wraps_location_code() {
        let d = derive(ProviderId::WeatherZone, "12495", true).unwrap();
        assert_eq!(
            d.forecast_url,
            "https://rss.weatherzone.com.au/?u=12994-1285&lt=aploc&lc=12495&obs=0&fc=1&warn=0"
        );
    }

    #[test]
    fn bom_builds_ftp_url_and_keeps_town() {
        let d = derive(ProviderId::Bom, "IDV10450, Melbourne", true).unwrap();

        assert_eq!(d.forecast_url, "ftp://ftp.bom.gov.au/anon/gen/fwo/IDV10450.xml");
        assert_eq!(d.bom_town.as_deref(), Some("Melbourne"));
        assert!(derive(ProviderId::Bom, "IDV10450", true).is_err());
    }

    #[test]
    fn wmo_wraps_bare_ids_only() {
        assert_eq!(
            derive(ProviderId::Wmo, "1248", true).unwrap().forecast_url,
            "https://worldweather.wmo.int/en/json/1248_en.xml"
        );
        assert_eq!(
            derive(ProviderId::Wmo, "https://example.org/x.json", true)
                .unwrap()
                .forecast_url,
            "https://example.org/x.json"
        );
    }

    #[test]
    fn unit_suffixes_follow_metric_flag() {
        let owm = "https://api.openweathermap.org/data/2.5/forecast/daily?id=1&appid=k";
        assert!(
            derive(ProviderId::OpenWeatherMap, owm, true)
                .unwrap()
                .forecast_url
                .ends_with("&units=metric")
        );
        assert!(
            derive(ProviderId::OpenWeatherMap, owm, false)
                .unwrap()
                .forecast_url
                .ends_with("&units=imperial")
        );

        let dark = derive(ProviderId::DarkSky, "https://api.darksky.net/forecast/k/1,2", true)
            .unwrap()
            .forecast_url;
        assert!(dark.ends_with("?exclude=currently,minutely,hourly,alerts,flags&lang=en&units=ca"));
        let dark = derive(ProviderId::DarkSky, "https://api.darksky.net/forecast/k/1,2", false)
            .unwrap()
            .forecast_url;
        assert!(dark.ends_with("&lang=en"));

        let wcom = derive(ProviderId::WeatherCom, "40.7,-74.0", false)
            .unwrap()
            .forecast_url;
        assert!(wcom.contains("geocode=40.7,-74.0&language=en-US&units=e"));
    }

    #[test]
    fn apixu_appends_day_count() {
        let d = derive(ProviderId::Apixu, "https://api.weatherapi.com/v1/forecast.json?key=k&q=Paris", true)
            .unwrap();
        assert!(d.forecast_url.ends_with("&q=Paris&days=10"));
    }

    #[test]
    fn yahoo_requires_a_url() {
        assert!(matches!(
            derive(ProviderId::Yahoo, "2459115", true),
            Err(ValidationError::InvalidForecastLocation { .. })
        ));
        assert!(derive(ProviderId::Yahoo, "https://yahoo.example/fc?w=1", true).is_ok());
    }

    #[test]
    fn met_ie_needs_reverse_geocode() {
        let d = derive(ProviderId::MetIe, "53.35,-6.26", true).unwrap();

        assert_eq!(d.forecast_url, "https://prodapi.metweb.ie/weather/daily/53.35/-6.26/10");
        assert_eq!(
            d.reverse_geocode_url.as_deref(),
            Some("https://prodapi.metweb.ie/location/reverse/53.35/-6.26")
        );
    }

    #[test]
    fn met_ie_place_from_geocode_document() {
        let place = met_ie_place(br#"{"city":"Dublin","county":"Dublin"}"#).unwrap();
        assert_eq!(place, "Dublin, Ireland");
        assert!(met_ie_place(b"not json").is_err());
    }
}
