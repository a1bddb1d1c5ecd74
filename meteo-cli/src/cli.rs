use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use meteo_core::{Config, WeatherService, input};

use crate::{configure, interactive, render};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "meteo", version, about = "Current weather for any place name")]
pub struct Cli {
    /// Read and write this config file instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show current weather for a place name.
    Show {
        /// Place name, e.g. "Mysuru" or "Springfield".
        place: String,

        /// Print JSON instead of a card.
        #[arg(long)]
        json: bool,
    },

    /// Show current weather for coordinates.
    #[command(allow_negative_numbers = true)]
    At {
        latitude: f64,
        longitude: f64,

        /// Label to show for the location.
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// List places matching a query, as the autocomplete would.
    Search {
        query: String,

        /// Only keep places in this country (defaults to the configured one).
        #[arg(long)]
        country: Option<String>,

        /// Only keep places whose region loosely matches this text.
        #[arg(long)]
        state: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Search-as-you-type lookup with prompts for country, region and place.
    Interactive,

    /// Edit preferences interactively.
    Configure,

    /// Print the location of the config file.
    ConfigPath,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config_path = match self.config {
            Some(path) => path,
            None => Config::config_file_path()?,
        };
        let config = Config::load_from(&config_path)?;
        tracing::debug!(path = %config_path.display(), "loaded configuration");

        match self.command {
            Command::Show { place, json } => {
                let service = WeatherService::from_config(&config)?;
                let query = input::sanitize_input(&place);
                let record = service
                    .get_weather(&query)
                    .await
                    .with_context(|| format!("Could not fetch weather for '{place}'"))?;

                println!("{}", render::record_output(&record, config.map_zoom, json)?);
            }
            Command::At { latitude, longitude, name, json } => {
                let service = WeatherService::from_config(&config)?;
                let mut record = service
                    .get_weather_by_coordinates(latitude, longitude)
                    .await
                    .with_context(|| {
                        format!("Could not fetch weather for {latitude}, {longitude}")
                    })?;
                if let Some(name) = name {
                    record = record.with_city(name);
                }

                println!("{}", render::record_output(&record, config.map_zoom, json)?);
            }
            Command::Search { query, country, state, json } => {
                let service = WeatherService::from_config(&config)?;
                let query = input::sanitize_input(&query);
                let country = country.or_else(|| config.default_country.clone());

                let results = input::filter_results(
                    service.search_cities(&query).await,
                    country.as_deref(),
                    state.as_deref(),
                );

                if json {
                    println!("{}", serde_json::to_string_pretty(&results)?);
                } else if results.is_empty() {
                    println!("No places found for '{query}'.");
                } else {
                    println!("{}", render::suggestion_table(&results));
                }
            }
            Command::Interactive => interactive::run(&config).await?,
            Command::Configure => configure::run(config, &config_path).await?,
            Command::ConfigPath => println!("{}", config_path.display()),
        }

        Ok(())
    }
}
