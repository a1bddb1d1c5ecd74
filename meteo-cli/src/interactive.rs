//! Prompt-driven front-end for [`Dashboard`].
//!
//! Prompts block on the terminal, so each one runs on the blocking pool while the
//! dashboard's suggestion pipelines keep running on the runtime.

use std::{fmt, time::Duration};

use anyhow::Context;
use inquire::{Confirm, InquireError, Select, Text};
use meteo_core::{COUNTRIES, Config, Dashboard, DashboardState, SearchResult, WeatherService};
use tokio::time::timeout;

use crate::render;

const ANY_COUNTRY: &str = "Any country";

enum PlaceChoice {
    Suggestion(SearchResult),
    Typed(String),
}

impl fmt::Display for PlaceChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaceChoice::Suggestion(result) => f.write_str(&result.display_name()),
            PlaceChoice::Typed(text) => write!(f, "Search for \"{text}\""),
        }
    }
}

enum RegionChoice {
    Suggestion(SearchResult),
    Keep(String),
}

impl fmt::Display for RegionChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionChoice::Suggestion(result) => f.write_str(&result.display_name()),
            RegionChoice::Keep(text) => write!(f, "Keep \"{text}\""),
        }
    }
}

pub async fn run(config: &Config) -> anyhow::Result<()> {
    let service = WeatherService::from_config(config)?;
    let dashboard = Dashboard::new(service, config);

    let Some(country) = choose_country(config.default_country.as_deref()).await? else {
        return Ok(());
    };
    dashboard.set_country(country);

    let wait = config.debounce() + config.request_timeout();
    if !choose_region(&dashboard, wait).await? {
        return Ok(());
    }

    loop {
        let Some(text) = prompt(|| Text::new("Place:").prompt()).await? else {
            return Ok(());
        };

        dashboard.clear_search();
        let state = suggestions_for(&dashboard, &text, wait).await;
        let choice = if state.show_dropdown {
            let mut options: Vec<PlaceChoice> = state
                .suggestions
                .into_iter()
                .map(PlaceChoice::Suggestion)
                .collect();
            options.push(PlaceChoice::Typed(state.place));

            match prompt(move || Select::new("Did you mean:", options).prompt()).await? {
                Some(choice) => choice,
                None => return Ok(()),
            }
        } else {
            PlaceChoice::Typed(state.place)
        };

        match &choice {
            PlaceChoice::Suggestion(city) => dashboard.select_city(city).await,
            PlaceChoice::Typed(_) => dashboard.search_weather().await,
        }

        show(&dashboard.state(), config.map_zoom)?;

        let again = prompt(|| {
            Confirm::new("Look up another place?")
                .with_default(false)
                .prompt()
        })
        .await?;
        if again != Some(true) {
            return Ok(());
        }
    }
}

async fn choose_country(default: Option<&str>) -> anyhow::Result<Option<Option<String>>> {
    let mut options = vec![ANY_COUNTRY.to_string()];
    options.extend(COUNTRIES.iter().map(|c| c.to_string()));
    if let Some(default) = default
        && !options.iter().any(|o| o == default)
    {
        options.push(default.to_string());
    }

    let cursor = default
        .and_then(|d| options.iter().position(|o| o == d))
        .unwrap_or(0);

    let picked = prompt(move || {
        Select::new("Country:", options)
            .with_starting_cursor(cursor)
            .prompt()
    })
    .await?;

    Ok(picked.map(|c| (c != ANY_COUNTRY).then_some(c)))
}

/// Optional region step. Returns `false` if the user cancelled.
async fn choose_region(dashboard: &Dashboard, wait: Duration) -> anyhow::Result<bool> {
    let Some(text) = prompt(|| Text::new("State / region (optional):").prompt()).await? else {
        return Ok(false);
    };
    if text.trim().is_empty() {
        return Ok(true);
    }

    let revision = dashboard.state().region_suggestions_revision;
    if !dashboard.on_region_input(&text) {
        return Ok(true);
    }

    let state = timeout(wait, dashboard.wait_for_region_suggestions(revision))
        .await
        .unwrap_or_else(|_| dashboard.state());
    if !state.show_region_dropdown {
        return Ok(true);
    }

    let mut options: Vec<RegionChoice> = state
        .region_suggestions
        .into_iter()
        .map(RegionChoice::Suggestion)
        .collect();
    options.push(RegionChoice::Keep(state.region));

    match prompt(move || Select::new("Region:", options).prompt()).await? {
        Some(RegionChoice::Suggestion(result)) => dashboard.select_region(&result),
        Some(RegionChoice::Keep(_)) => {}
        None => return Ok(false),
    }
    Ok(true)
}

async fn suggestions_for(dashboard: &Dashboard, text: &str, wait: Duration) -> DashboardState {
    let revision = dashboard.state().suggestions_revision;
    if dashboard.on_search_input(text) {
        timeout(wait, dashboard.wait_for_suggestions(revision))
            .await
            .unwrap_or_else(|_| dashboard.state())
    } else {
        dashboard.state()
    }
}

fn show(state: &DashboardState, zoom: u8) -> anyhow::Result<()> {
    match (&state.weather, &state.error) {
        (Some(record), _) => println!("\n{}\n", render::record_output(record, zoom, false)?),
        (None, Some(error)) => eprintln!("\n{error}\n"),
        (None, None) => {}
    }
    Ok(())
}

/// Run a blocking prompt off the runtime. Escape and Ctrl-C both yield `None`.
async fn prompt<T, F>(ask: F) -> anyhow::Result<Option<T>>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, InquireError> + Send + 'static,
{
    let answer = tokio::task::spawn_blocking(ask)
        .await
        .context("Prompt task failed")?;

    match answer {
        Ok(value) => Ok(Some(value)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(err) => Err(err).context("Failed to read input"),
    }
}
