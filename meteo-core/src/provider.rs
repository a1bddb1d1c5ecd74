use crate::{
    Config,
    error::LookupResult,
    model::{Coordinates, SearchResult, WeatherRecord},
    provider::open_meteo::OpenMeteoProvider,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod open_meteo;

/// Resolves free-text place names to candidate locations.
#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    async fn search(&self, query: &str, count: u8) -> LookupResult<Vec<SearchResult>>;
}

/// Fetches current conditions for a pair of coordinates.
#[async_trait]
pub trait Forecaster: Send + Sync + Debug {
    async fn current(&self, coordinates: Coordinates) -> LookupResult<WeatherRecord>;
}

/// Construct the Open-Meteo provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<OpenMeteoProvider> {
    OpenMeteoProvider::from_config(config)
}
