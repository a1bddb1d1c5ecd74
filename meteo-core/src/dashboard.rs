//! UI-agnostic weather widget.
//!
//! [`Dashboard`] owns what a front-end displays: the country/region/place
//! selection, autocomplete dropdowns, the current reading and its map preview.
//! Front-ends feed it keystrokes and selections and render [`DashboardState`]
//! snapshots, either by polling [`Dashboard::state`] or by awaiting changes on
//! [`Dashboard::subscribe`].

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::sync::watch;

use crate::{
    Config,
    debounce::{SearchInput, SearchOutput, SearchPipeline},
    error::LookupResult,
    input::{filter_by_country, filter_results, sanitize_input},
    model::{SearchResult, WeatherRecord},
    service::WeatherService,
};

/// Countries offered by the country picker.
pub const COUNTRIES: &[&str] = &[
    "India",
    "USA",
    "UK",
    "Australia",
    "Canada",
    "Germany",
    "France",
    "Japan",
    "China",
    "Brazil",
];

const FAILED_FOR_LOCATION: &str = "Could not fetch weather. Please try again.";
const FAILED_FOR_NAME: &str = "Could not fetch weather. Please try another location.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    pub selected_country: Option<String>,
    /// Region (state, province) typed or picked by the user.
    pub region: String,
    /// Place name in the main search box.
    pub place: String,

    pub weather: Option<WeatherRecord>,
    pub loading: bool,
    pub error: Option<String>,
    pub map_url: Option<String>,

    pub suggestions: Vec<SearchResult>,
    pub show_dropdown: bool,
    /// Bumped every time a batch of place suggestions arrives.
    pub suggestions_revision: u64,

    pub region_suggestions: Vec<SearchResult>,
    pub show_region_dropdown: bool,
    pub region_suggestions_revision: u64,
}

/// Embeddable map preview centred on the given point.
pub fn map_url(latitude: f64, longitude: f64, zoom: u8) -> String {
    format!(
        "https://maps.google.com/maps?q={latitude},{longitude}&t=&z={zoom}&ie=UTF8&iwloc=&output=embed"
    )
}

/// A batch of suggestions and the box text it was searched for.
#[derive(Debug)]
struct Suggestions {
    query: String,
    results: Vec<SearchResult>,
}

#[derive(Debug)]
pub struct Dashboard {
    service: WeatherService,
    state: Arc<watch::Sender<DashboardState>>,
    places: SearchInput,
    regions: SearchInput,
    latest_fetch: AtomicU64,
    map_zoom: u8,
}

impl Dashboard {
    /// Build the widget and start its two suggestion pipelines.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(service: WeatherService, config: &Config) -> Self {
        let initial = DashboardState {
            selected_country: config.default_country.clone(),
            ..DashboardState::default()
        };
        let state = Arc::new(watch::Sender::new(initial));

        let places = {
            let service = service.clone();
            let state = Arc::clone(&state);
            SearchPipeline::spawn(config.debounce(), move |query: String| {
                let service = service.clone();
                let state = Arc::clone(&state);
                async move {
                    let results = service.search_cities(&query).await;
                    // Filter against the selection as it is when results arrive.
                    let (country, region) = {
                        let current = state.borrow();
                        (current.selected_country.clone(), current.region.clone())
                    };
                    let results =
                        filter_results(results, country.as_deref(), Some(region.as_str()));
                    Suggestions { query, results }
                }
            })
        };

        let regions = {
            let service = service.clone();
            let state = Arc::clone(&state);
            SearchPipeline::spawn(config.debounce(), move |query: String| {
                let service = service.clone();
                let state = Arc::clone(&state);
                async move {
                    let results = service.search_cities(&query).await;
                    let country = state.borrow().selected_country.clone();
                    let results = filter_by_country(results, country.as_deref());
                    Suggestions { query, results }
                }
            })
        };

        let (places, place_results) = places.split();
        let (regions, region_results) = regions.split();

        tokio::spawn(apply_place_suggestions(place_results, Arc::clone(&state)));
        tokio::spawn(apply_region_suggestions(region_results, Arc::clone(&state)));

        Self {
            service,
            state,
            places,
            regions,
            latest_fetch: AtomicU64::new(0),
            map_zoom: config.map_zoom,
        }
    }

    pub fn state(&self) -> DashboardState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.state.subscribe()
    }

    pub fn set_country(&self, country: Option<String>) {
        self.state.send_modify(|s| s.selected_country = country);
    }

    /// Handle a keystroke in the place box. Returns whether a suggestion search
    /// was queued; short input clears the dropdown instead.
    pub fn on_search_input(&self, raw: &str) -> bool {
        let place = sanitize_input(raw);
        let long_enough = place.chars().count() >= self.service.min_query_len();

        self.state.send_modify(|s| {
            s.place = place.clone();
            if !long_enough {
                s.suggestions.clear();
                s.show_dropdown = false;
            }
        });

        if long_enough {
            self.places.push(place);
        } else {
            self.places.reset();
        }
        long_enough
    }

    /// Empty the place box and drop any suggestion search in progress.
    pub fn clear_search(&self) {
        self.places.reset();
        self.state.send_modify(|s| {
            s.place.clear();
            s.suggestions.clear();
            s.show_dropdown = false;
        });
    }

    /// Handle a keystroke in the region box. Same contract as [`Self::on_search_input`].
    pub fn on_region_input(&self, raw: &str) -> bool {
        let region = sanitize_input(raw);
        let long_enough = region.chars().count() >= self.service.min_query_len();

        self.state.send_modify(|s| {
            s.region = region.clone();
            if !long_enough {
                s.region_suggestions.clear();
                s.show_region_dropdown = false;
            }
        });

        if long_enough {
            self.regions.push(region);
        } else {
            self.regions.reset();
        }
        long_enough
    }

    /// Pick a region suggestion. Its country, when known, becomes the selected country.
    pub fn select_region(&self, result: &SearchResult) {
        self.state.send_modify(|s| {
            s.region = result.name.clone();
            if let Some(country) = &result.country {
                s.selected_country = Some(country.clone());
            }
            s.show_region_dropdown = false;
            s.region_suggestions.clear();
        });
    }

    /// Pick a place suggestion and show its weather.
    pub async fn select_city(&self, city: &SearchResult) {
        self.state.send_modify(|s| {
            s.place = city.name.clone();
            if let Some(country) = &city.country {
                s.selected_country = Some(country.clone());
            }
            if let Some(region) = &city.region {
                s.region = region.clone();
            }
            s.show_dropdown = false;
        });

        self.weather_for_location(city.latitude, city.longitude, &city.name)
            .await;
    }

    /// Look up whatever is typed in the place box.
    pub async fn search_weather(&self) {
        let place = self.state.borrow().place.clone();
        if place.trim().is_empty() {
            return;
        }
        self.state.send_modify(|s| s.show_dropdown = false);

        self.weather_by_name(&sanitize_input(&place)).await;
    }

    /// Wait until place suggestions newer than `revision` have been applied.
    pub async fn wait_for_suggestions(&self, revision: u64) -> DashboardState {
        self.wait_for(|s| s.suggestions_revision > revision).await
    }

    /// Wait until region suggestions newer than `revision` have been applied.
    pub async fn wait_for_region_suggestions(&self, revision: u64) -> DashboardState {
        self.wait_for(|s| s.region_suggestions_revision > revision)
            .await
    }

    async fn wait_for(&self, ready: impl FnMut(&DashboardState) -> bool) -> DashboardState {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        match rx.wait_for(ready).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    async fn weather_for_location(&self, latitude: f64, longitude: f64, name: &str) {
        let ticket = self.begin_fetch();
        let result = self
            .service
            .get_weather_by_coordinates(latitude, longitude)
            .await
            .map(|record| record.with_city(name));
        self.finish_fetch(ticket, result, FAILED_FOR_LOCATION);
    }

    async fn weather_by_name(&self, name: &str) {
        let ticket = self.begin_fetch();
        let result = self.service.get_weather(name).await;
        self.finish_fetch(ticket, result, FAILED_FOR_NAME);
    }

    fn begin_fetch(&self) -> u64 {
        let ticket = self.latest_fetch.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
            s.weather = None;
            s.map_url = None;
        });
        ticket
    }

    fn finish_fetch(&self, ticket: u64, result: LookupResult<WeatherRecord>, failure: &str) {
        if self.latest_fetch.load(Ordering::SeqCst) != ticket {
            tracing::debug!(ticket, "discarding superseded weather result");
            return;
        }

        let zoom = self.map_zoom;
        self.state.send_modify(|s| {
            s.loading = false;
            match result {
                Ok(record) => {
                    s.map_url = record
                        .coordinates
                        .map(|c| map_url(c.latitude, c.longitude, zoom));
                    s.weather = Some(record);
                }
                Err(err) => {
                    tracing::warn!(error = %err, "weather lookup failed");
                    s.error = Some(failure.to_string());
                }
            }
        });
    }
}

// A batch is only applied while the box still holds the text it was searched
// for. Results for text that has since been shortened, cleared or replaced by
// a selection may still be queued after the pipeline was reset.
async fn apply_place_suggestions(
    mut batches: SearchOutput<Suggestions>,
    state: Arc<watch::Sender<DashboardState>>,
) {
    while let Some(batch) = batches.next().await {
        state.send_if_modified(|s| {
            if s.place != batch.query {
                tracing::debug!(query = %batch.query, "dropping stale place suggestions");
                return false;
            }
            s.show_dropdown = !batch.results.is_empty();
            s.suggestions = batch.results;
            s.suggestions_revision += 1;
            true
        });
    }
}

async fn apply_region_suggestions(
    mut batches: SearchOutput<Suggestions>,
    state: Arc<watch::Sender<DashboardState>>,
) {
    while let Some(batch) = batches.next().await {
        state.send_if_modified(|s| {
            if s.region != batch.query {
                tracing::debug!(query = %batch.query, "dropping stale region suggestions");
                return false;
            }
            s.show_region_dropdown = !batch.results.is_empty();
            s.region_suggestions = batch.results;
            s.region_suggestions_revision += 1;
            true
        });
    }
}
