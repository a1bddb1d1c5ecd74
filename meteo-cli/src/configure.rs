use std::path::Path;

use anyhow::Context;
use inquire::{CustomType, InquireError, Select, Text};
use meteo_core::{Config, TemperatureUnit, WindSpeedUnit};

/// Walk through the user-facing preferences and save them to `path`.
pub async fn run(config: Config, path: &Path) -> anyhow::Result<()> {
    let path_display = path.display().to_string();

    let updated = tokio::task::spawn_blocking(move || ask(config))
        .await
        .context("Prompt task failed")?;

    let updated = match updated {
        Ok(cfg) => cfg,
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
            println!("Configuration unchanged.");
            return Ok(());
        }
        Err(err) => return Err(err).context("Failed to read input"),
    };

    updated.save_to(path)?;
    tracing::debug!(path = %path_display, "configuration saved");
    println!("Configuration saved to {path_display}");

    Ok(())
}

fn ask(mut config: Config) -> Result<Config, InquireError> {
    let country = Text::new("Default country (blank for any):")
        .with_initial_value(config.default_country.as_deref().unwrap_or_default())
        .prompt()?;
    config.set_default_country(Some(country));

    config.temperature_unit = Select::new("Temperature unit:", TemperatureUnit::all().to_vec())
        .with_starting_cursor(position(TemperatureUnit::all(), &config.temperature_unit))
        .prompt()?;

    config.wind_speed_unit = Select::new("Wind speed unit:", WindSpeedUnit::all().to_vec())
        .with_starting_cursor(position(WindSpeedUnit::all(), &config.wind_speed_unit))
        .prompt()?;

    let language = Text::new("Language for place names:")
        .with_initial_value(&config.language)
        .prompt()?;
    if !language.trim().is_empty() {
        config.language = language.trim().to_string();
    }

    config.suggestion_count = CustomType::<u8>::new("Suggestions per search:")
        .with_default(config.suggestion_count)
        .with_error_message("Please enter a number between 1 and 255")
        .prompt()?
        .max(1);

    config.debounce_ms = CustomType::<u64>::new("Typing pause before searching (ms):")
        .with_default(config.debounce_ms)
        .with_error_message("Please enter a whole number of milliseconds")
        .prompt()?;

    Ok(config)
}

fn position<T: PartialEq>(all: &[T], current: &T) -> usize {
    all.iter().position(|v| v == current).unwrap_or(0)
}
