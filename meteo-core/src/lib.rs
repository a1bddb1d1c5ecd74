//! Core library for the `meteo` CLI.
//!
//! This crate defines:
//! - Configuration handling
//! - Open-Meteo geocoding and forecast providers behind small traits
//! - Orchestration of the two chained lookups into one weather record
//! - Search-as-you-type input handling (sanitizing, debouncing, filtering)
//! - A UI-agnostic dashboard holding the widget state
//!
//! It is used by `meteo-cli`, but can also be reused by other front-ends.

pub mod config;
pub mod dashboard;
pub mod debounce;
pub mod error;
pub mod input;
pub mod model;
pub mod provider;
pub mod service;

pub use config::{Config, TemperatureUnit, WindSpeedUnit};
pub use dashboard::{COUNTRIES, Dashboard, DashboardState, map_url};
pub use debounce::SearchPipeline;
pub use error::{LookupError, LookupResult};
pub use model::{Coordinates, SearchResult, WeatherCode, WeatherRecord};
pub use provider::{Forecaster, Geocoder};
pub use service::WeatherService;
