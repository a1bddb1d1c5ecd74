use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    Config,
    config::{TemperatureUnit, WindSpeedUnit},
    error::{LookupError, LookupResult},
    model::{Coordinates, SearchResult, WeatherCode, WeatherRecord},
};

use super::{Forecaster, Geocoder};

const USER_AGENT: &str = concat!("meteo/", env!("CARGO_PKG_VERSION"));
const CURRENT_FIELDS: &str = "temperature_2m,is_day,weather_code,wind_speed_10m";
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

const GEOCODING: &str = "Open-Meteo geocoding";
const FORECAST: &str = "Open-Meteo forecast";

/// Client for the free Open-Meteo geocoding and forecast endpoints. No API key needed.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    http: Client,
    geocoding_url: String,
    forecast_url: String,
    language: String,
    temperature_unit: TemperatureUnit,
    wind_speed_unit: WindSpeedUnit,
}

impl OpenMeteoProvider {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            geocoding_url: config.geocoding_url.clone(),
            forecast_url: config.forecast_url.clone(),
            language: config.language.clone(),
            temperature_unit: config.temperature_unit,
            wind_speed_unit: config.wind_speed_unit,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        service: &'static str,
        url: &str,
        query: &[(&str, String)],
    ) -> LookupResult<T> {
        let res = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|source| LookupError::Network { service, source })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|source| LookupError::Network { service, source })?;

        if !status.is_success() {
            return Err(status_error(service, status, &body));
        }

        serde_json::from_str(&body).map_err(|source| LookupError::Parse { service, source })
    }
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    // Absent when nothing matched.
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    time: String,
    temperature_2m: f64,
    is_day: u8,
    weather_code: i32,
    wind_speed_10m: f64,
}

#[derive(Debug, Deserialize)]
struct OmForecastResponse {
    current: OmCurrent,
}

#[async_trait]
impl Geocoder for OpenMeteoProvider {
    async fn search(&self, query: &str, count: u8) -> LookupResult<Vec<SearchResult>> {
        tracing::debug!(query, count, "geocoding search");

        let parsed: GeoResponse = self
            .get_json(
                GEOCODING,
                &self.geocoding_url,
                &[
                    ("name", query.to_string()),
                    ("count", count.to_string()),
                    ("language", self.language.clone()),
                    ("format", "json".to_string()),
                ],
            )
            .await?;

        Ok(parsed.results)
    }
}

#[async_trait]
impl Forecaster for OpenMeteoProvider {
    async fn current(&self, coordinates: Coordinates) -> LookupResult<WeatherRecord> {
        tracing::debug!(%coordinates, "fetching current weather");

        let parsed: OmForecastResponse = self
            .get_json(
                FORECAST,
                &self.forecast_url,
                &[
                    ("latitude", coordinates.latitude.to_string()),
                    ("longitude", coordinates.longitude.to_string()),
                    ("current", CURRENT_FIELDS.to_string()),
                    ("timezone", "auto".to_string()),
                    ("temperature_unit", self.temperature_unit.as_str().to_string()),
                    ("wind_speed_unit", self.wind_speed_unit.as_str().to_string()),
                ],
            )
            .await?;

        let current = parsed.current;
        let time = NaiveDateTime::parse_from_str(&current.time, TIME_FORMAT)
            .map_err(|_| LookupError::Timestamp(current.time.clone()))?;

        Ok(WeatherRecord {
            temperature: current.temperature_2m,
            temperature_unit: self.temperature_unit,
            wind_speed: current.wind_speed_10m,
            wind_speed_unit: self.wind_speed_unit,
            weather_code: WeatherCode::from(current.weather_code),
            is_day: current.is_day == 1,
            time,
            city: None,
            coordinates: Some(coordinates),
        })
    }
}

fn status_error(service: &'static str, status: StatusCode, body: &str) -> LookupError {
    LookupError::Status { service, status, body: truncate_body(body) }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    fn provider_for(server: &MockServer) -> OpenMeteoProvider {
        let cfg = Config {
            geocoding_url: format!("{}/v1/search", server.uri()),
            forecast_url: format!("{}/v1/forecast", server.uri()),
            ..Config::default()
        };
        OpenMeteoProvider::from_config(&cfg).unwrap()
    }

    #[tokio::test]
    async fn search_sends_expected_params_and_maps_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .and(query_param("name", "Berlin"))
            .and(query_param("count", "5"))
            .and(query_param("language", "en"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {
                        "id": 2950159,
                        "name": "Berlin",
                        "latitude": 52.52437,
                        "longitude": 13.41053,
                        "country": "Germany",
                        "admin1": "Land Berlin"
                    },
                    {
                        "id": 5083330,
                        "name": "Berlin",
                        "latitude": 44.46867,
                        "longitude": -71.18508,
                        "country": "United States"
                    }
                ],
                "generationtime_ms": 0.9
            })))
            .expect(1)
            .mount(&server)
            .await;

        let results = provider_for(&server).search("Berlin", 5).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].region.as_deref(), Some("Land Berlin"));
        assert_eq!(results[1].region, None);
        assert_eq!(results[1].country.as_deref(), Some("United States"));
    }

    #[tokio::test]
    async fn search_without_results_key_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "generationtime_ms": 0.4 })),
            )
            .mount(&server)
            .await;

        let results = provider_for(&server).search("Xyzzyq", 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn current_maps_forecast_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("latitude", "52.52"))
            .and(query_param("longitude", "13.41"))
            .and(query_param("current", CURRENT_FIELDS))
            .and(query_param("timezone", "auto"))
            .and(query_param("temperature_unit", "celsius"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "latitude": 52.52,
                "longitude": 13.419998,
                "timezone": "Europe/Berlin",
                "current": {
                    "time": "2024-05-01T14:15",
                    "interval": 900,
                    "temperature_2m": 18.4,
                    "is_day": 1,
                    "weather_code": 3,
                    "wind_speed_10m": 11.2
                }
            })))
            .mount(&server)
            .await;

        let record = provider_for(&server)
            .current(Coordinates::new(52.52, 13.41))
            .await
            .unwrap();

        assert_eq!(record.temperature, 18.4);
        assert_eq!(record.wind_speed, 11.2);
        assert_eq!(record.weather_code, WeatherCode::Overcast);
        assert!(record.is_day);
        assert_eq!(record.time.day(), 1);
        assert_eq!(record.time.hour(), 14);
        assert_eq!(record.city, None);
        assert_eq!(record.coordinates, Some(Coordinates::new(52.52, 13.41)));
    }

    #[tokio::test]
    async fn non_success_status_is_reported_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(400).set_body_string(
                r#"{"error":true,"reason":"Latitude must be in range of -90 to 90°."}"#,
            ))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .current(Coordinates::new(123.0, 0.0))
            .await
            .unwrap_err();

        match err {
            LookupError::Status { status, body, .. } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert!(body.contains("Latitude must be in range"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_time_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "current": {
                    "time": "yesterday",
                    "temperature_2m": 1.0,
                    "is_day": 0,
                    "weather_code": 0,
                    "wind_speed_10m": 0.0
                }
            })))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .current(Coordinates::new(0.0, 0.0))
            .await
            .unwrap_err();

        assert!(matches!(err, LookupError::Timestamp(t) if t == "yesterday"));
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let body = "é".repeat(150);
        let truncated = truncate_body(&body);
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= 203);
    }
}
