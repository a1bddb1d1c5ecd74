use std::sync::Arc;

use crate::{
    Config,
    error::{LookupError, LookupResult},
    model::{Coordinates, SearchResult, WeatherRecord},
    provider::{Forecaster, Geocoder, provider_from_config},
};

/// Chains geocoding and forecast lookups into one weather record.
#[derive(Debug, Clone)]
pub struct WeatherService {
    geocoder: Arc<dyn Geocoder>,
    forecaster: Arc<dyn Forecaster>,
    suggestion_count: u8,
    min_query_len: usize,
}

impl WeatherService {
    pub fn new(geocoder: Arc<dyn Geocoder>, forecaster: Arc<dyn Forecaster>) -> Self {
        let defaults = Config::default();
        Self {
            geocoder,
            forecaster,
            suggestion_count: defaults.suggestion_count,
            min_query_len: defaults.min_query_len,
        }
    }

    /// Service backed by Open-Meteo, tuned by `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let provider = Arc::new(provider_from_config(config)?);
        Ok(Self::new(provider.clone(), provider).with_limits(config))
    }

    pub fn with_limits(mut self, config: &Config) -> Self {
        self.suggestion_count = config.suggestion_count;
        self.min_query_len = config.min_query_len;
        self
    }

    pub fn min_query_len(&self) -> usize {
        self.min_query_len
    }

    /// Resolve `city_name` to its best geocoding match and fetch current weather there.
    pub async fn get_weather(&self, city_name: &str) -> LookupResult<WeatherRecord> {
        let place = self
            .coordinates_for(city_name)
            .await
            .ok_or(LookupError::CityNotFound)?;

        tracing::info!(city = %place.name, coordinates = %place.coordinates(), "resolved place");

        let record = self.forecaster.current(place.coordinates()).await?;
        Ok(record.with_city(place.name))
    }

    /// Autocomplete candidates for `query`. Never fails: short queries and lookup
    /// errors both produce an empty list.
    pub async fn search_cities(&self, query: &str) -> Vec<SearchResult> {
        if query.chars().count() < self.min_query_len {
            return Vec::new();
        }

        match self.geocoder.search(query, self.suggestion_count).await {
            Ok(results) => results,
            Err(err) => {
                tracing::warn!(query, error = %err, "city search failed");
                Vec::new()
            }
        }
    }

    pub async fn get_weather_by_coordinates(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> LookupResult<WeatherRecord> {
        self.forecaster
            .current(Coordinates::new(latitude, longitude))
            .await
    }

    // A failing geocoding call is treated the same as "no match".
    async fn coordinates_for(&self, city_name: &str) -> Option<SearchResult> {
        match self.geocoder.search(city_name, 1).await {
            Ok(results) => results.into_iter().next(),
            Err(err) => {
                tracing::warn!(city = city_name, error = %err, "geocoding failed");
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    //! In-memory providers for exercising orchestration without HTTP.

    use super::*;
    use crate::config::{TemperatureUnit, WindSpeedUnit};
    use crate::model::WeatherCode;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::{sync::Mutex, time::Duration};

    #[derive(Debug, Default)]
    pub struct FakeGeocoder {
        pub places: Vec<SearchResult>,
        pub fail: bool,
        pub latency: Duration,
        pub calls: Mutex<Vec<(String, u8)>>,
    }

    impl FakeGeocoder {
        pub fn with_places(places: Vec<SearchResult>) -> Self {
            Self { places, ..Self::default() }
        }

        pub fn delayed(self, latency: Duration) -> Self {
            Self { latency, ..self }
        }

        pub fn failing() -> Self {
            Self { fail: true, ..Self::default() }
        }

        pub fn calls(&self) -> Vec<(String, u8)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Geocoder for FakeGeocoder {
        async fn search(&self, query: &str, count: u8) -> LookupResult<Vec<SearchResult>> {
            self.calls.lock().unwrap().push((query.to_string(), count));
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            if self.fail {
                return Err(unavailable("fake geocoding"));
            }
            let needle = query.to_lowercase();
            Ok(self
                .places
                .iter()
                .filter(|p| p.name.to_lowercase().starts_with(&needle))
                .take(count as usize)
                .cloned()
                .collect())
        }
    }

    /// Answers with a fixed reading after `latency`; latitudes above 90 fail.
    #[derive(Debug, Default)]
    pub struct FakeForecaster {
        pub latency: Duration,
        pub calls: Mutex<Vec<Coordinates>>,
    }

    impl FakeForecaster {
        pub fn with_latency(latency: Duration) -> Self {
            Self { latency, ..Self::default() }
        }

        pub fn calls(&self) -> Vec<Coordinates> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Forecaster for FakeForecaster {
        async fn current(&self, coordinates: Coordinates) -> LookupResult<WeatherRecord> {
            self.calls.lock().unwrap().push(coordinates);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            if coordinates.latitude > 90.0 {
                return Err(unavailable("fake forecast"));
            }
            Ok(reading(coordinates))
        }
    }

    fn unavailable(service: &'static str) -> LookupError {
        LookupError::Status {
            service,
            status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            body: "down".to_string(),
        }
    }

    pub fn reading(coordinates: Coordinates) -> WeatherRecord {
        WeatherRecord {
            temperature: 21.5,
            temperature_unit: TemperatureUnit::Celsius,
            wind_speed: 7.0,
            wind_speed_unit: WindSpeedUnit::Kmh,
            weather_code: WeatherCode::MainlyClear,
            is_day: true,
            time: NaiveDate::from_ymd_opt(2024, 5, 1)
                .and_then(|d| d.and_hms_opt(12, 0, 0))
                .unwrap(),
            city: None,
            coordinates: Some(coordinates),
        }
    }

    pub fn place(name: &str, region: Option<&str>, country: &str, lat: f64, lon: f64) -> SearchResult {
        SearchResult {
            name: name.to_string(),
            region: region.map(str::to_string),
            country: Some(country.to_string()),
            latitude: lat,
            longitude: lon,
        }
    }

    pub fn sample_places() -> Vec<SearchResult> {
        vec![
            place("Mysuru", Some("Karnataka"), "India", 12.29791, 76.63925),
            place("Mumbai", Some("Maharashtra"), "India", 19.07283, 72.88261),
            place("Munich", Some("Bavaria"), "Germany", 48.13743, 11.57549),
            place("Murcia", Some("Murcia"), "Spain", 37.98704, -1.13004),
            place("Mulhouse", Some("Grand Est"), "France", 47.75, 7.33333),
            place("Multan", Some("Punjab"), "Pakistan", 30.19679, 71.47824),
            place("Karnataka", None, "India", 13.5, 76.0),
            place("Springfield", Some("Illinois"), "United States", 39.80172, -89.64371),
            place("Springfield", Some("Missouri"), "United States", 37.21533, -93.29824),
        ]
    }
}
