//! Routing of cached forecast payloads to provider parser adapters.

use std::{collections::HashMap, fmt::Debug, sync::Arc};
use tracing::debug;

use crate::{
    error::{ConfigError, ForecastError, ParseError},
    model::ParsedForecast,
    provider::ProviderId,
};

/// Converts one provider's payload into canonical forecast days.
///
/// Implementations must return days in the provider's own order; the
/// dispatcher never re-sorts them.
pub trait ForecastParser: Send + Sync + Debug {
    fn parse(&self, raw: &str, metric: bool) -> Result<ParsedForecast, ParseError>;
}

#[derive(Debug, Default, Clone)]
pub struct ForecastDispatcher {
    adapters: HashMap<ProviderId, Arc<dyn ForecastParser>>,
}

impl ForecastDispatcher {
    /// A dispatcher with no adapters at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A dispatcher holding every adapter shipped with this crate.
    pub fn with_bundled() -> Self {
        let mut dispatcher = Self::empty();
        for id in ProviderId::all() {
            if let Some(factory) = id.spec().bundled_parser {
                dispatcher.register(*id, factory());
            }
        }
        dispatcher
    }

    /// Install or replace the adapter for `id`.
    pub fn register(&mut self, id: ProviderId, adapter: Arc<dyn ForecastParser>) {
        self.adapters.insert(id, adapter);
    }

    pub fn supports(&self, id: ProviderId) -> bool {
        self.adapters.contains_key(&id)
    }

    pub fn normalize(
        &self,
        provider: &str,
        raw: &str,
        metric: bool,
    ) -> Result<ParsedForecast, ForecastError> {
        let id = ProviderId::try_from(provider)?;
        let adapter = self
            .adapters
            .get(&id)
            .ok_or_else(|| ConfigError::UnknownProvider(provider.to_string()))?;

        let parsed = adapter.parse(raw, metric)?;
        debug!(%id, days = parsed.days.len(), "forecast normalized");

        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ForecastDay;

    #[derive(Debug)]
    struct Fixed;

    impl ForecastParser for Fixed {
        fn parse(&self, raw: &str, _metric: bool) -> Result<ParsedForecast, ParseError> {
            // deliberately out of calendar order
            let days = ["Wed", "Mon", "Tue"]
                .iter()
                .map(|d| ForecastDay {
                    day: d.to_string(),
                    icon: String::new(),
                    min_temp: None,
                    max_temp: None,
                    summary: raw.to_string(),
                })
                .collect();
            Ok(ParsedForecast {
                days,
                summary: "fixed".into(),
            })
        }
    }

    #[test]
    fn unknown_provider_is_a_config_error() {
        let dispatcher = ForecastDispatcher::with_bundled();
        let err = dispatcher.normalize("nowhere.example", "{}", true).unwrap_err();

        assert!(matches!(
            err,
            ForecastError::Config(ConfigError::UnknownProvider(ref p)) if p == "nowhere.example"
        ));
    }

    #[test]
    fn known_but_unregistered_provider_is_a_config_error() {
        let dispatcher = ForecastDispatcher::empty();
        let err = dispatcher.normalize("yr.no", "<xml/>", true).unwrap_err();

        assert!(matches!(err, ForecastError::Config(ConfigError::UnknownProvider(_))));
    }

    #[test]
    fn adapter_order_is_kept() {
        let mut dispatcher = ForecastDispatcher::empty();
        dispatcher.register(ProviderId::YrNo, Arc::new(Fixed));

        let parsed = dispatcher.normalize("yr.no", "payload", true).unwrap();
        let order: Vec<_> = parsed.days.iter().map(|d| d.day.as_str()).collect();

        assert_eq!(order, vec!["Wed", "Mon", "Tue"]);
        assert_eq!(parsed.days[0].summary, "payload");
    }

    #[test]
    fn bundled_adapters_are_registered() {
        let dispatcher = ForecastDispatcher::with_bundled();

        assert!(dispatcher.supports(ProviderId::OpenWeatherMap));
        assert!(dispatcher.supports(ProviderId::Apixu));
        assert!(dispatcher.supports(ProviderId::WeatherGov));
        assert!(!dispatcher.supports(ProviderId::Yahoo));
    }

    #[test]
    fn adapter_failures_surface_as_parse_errors() {
        let dispatcher = ForecastDispatcher::with_bundled();
        let err = dispatcher
            .normalize("openweathermap.org", "<html>busy</html>", true)
            .unwrap_err();

        assert!(matches!(err, ForecastError::Parse(_)));
    }
}
