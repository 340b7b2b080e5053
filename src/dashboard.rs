//! Dashboard composition root.
//!
//! Owns every component and wires the shared handles (theme, prediction
//! store, map viewport) into the ones that need them.

use std::sync::{Arc, Mutex, PoisonError};

use crate::client::{DashboardApi, VisitorService};
use crate::errors::DashboardError;
use crate::loader::{EarthquakeLoader, NewsFeed, VisitorCounter};
use crate::map::{MapScene, build_scene};
use crate::models::{CountryPrediction, Feature, RegionPrediction};
use crate::prediction::{CountryForecast, FormState, RegionForecast};
use crate::search::Search;
use crate::store::{LocalStore, PredictionStore, Theme, ThemeStore};
use crate::viewport::MapHandle;

/// Everything one dashboard session shows.
pub struct Dashboard<A, V> {
    api: A,
    counter: V,
    pub themes: ThemeStore,
    pub predictions: PredictionStore,
    pub map: MapHandle,
    pub quakes: EarthquakeLoader,
    pub news: NewsFeed,
    pub visitors: VisitorCounter,
    pub region: RegionForecast,
    pub country: CountryForecast,
    search: Mutex<Search>,
}

impl<A: DashboardApi, V: VisitorService> Dashboard<A, V> {
    #[must_use]
    pub fn new(api: A, counter: V, storage: Arc<LocalStore>) -> Self {
        let map = MapHandle::new();
        let predictions = PredictionStore::new();
        Self {
            api,
            counter,
            themes: ThemeStore::load(Arc::clone(&storage)),
            country: CountryForecast::new(predictions.clone(), map.clone()),
            search: Mutex::new(Search::new(map.clone())),
            predictions,
            map,
            quakes: EarthquakeLoader::new(),
            news: NewsFeed::new(),
            visitors: VisitorCounter::new(storage),
            region: RegionForecast::new(),
        }
    }

    /// Run the one-shot loaders. They are independent and run concurrently.
    pub async fn mount(&self) {
        tokio::join!(self.load_quakes(), self.load_news(), self.register_visit());
    }

    pub async fn load_quakes(&self) {
        self.quakes.load(&self.api).await;
    }

    pub async fn load_news(&self) {
        self.news.load(&self.api).await;
    }

    /// Count this visit, falling back to the local count.
    pub async fn register_visit(&self) -> u64 {
        self.visitors.load(&self.counter).await
    }

    /// Current map scene.
    #[must_use]
    pub fn scene(&self) -> MapScene {
        let events = self.quakes.events();
        let selected = self.with_search(|s| s.selection().map(|e| e.id.clone()));
        let prediction = self.predictions.get();
        build_scene(
            &events,
            selected.as_deref(),
            self.themes.current(),
            prediction.as_ref(),
        )
    }

    /// Update the search query and return the suggestions to show.
    pub fn search(&self, query: &str) -> Vec<Feature> {
        let events = self.quakes.events();
        self.with_search(|s| {
            s.set_query(query);
            s.visible_suggestions(&events).into_iter().cloned().collect()
        })
    }

    /// Select a loaded event by id.
    pub fn select(&self, id: &str) -> Option<Feature> {
        let events = self.quakes.events();
        self.with_search(|s| s.select_by_id(&events, id).cloned())
    }

    pub fn clear_search(&self) {
        self.with_search(Search::clear);
    }

    /// Current query text.
    #[must_use]
    pub fn query(&self) -> String {
        self.with_search(|s| s.query().to_string())
    }

    pub async fn predict_region(&self) -> FormState<RegionPrediction> {
        self.region.request(&self.api).await
    }

    pub async fn predict_country(&self, input: &str) -> FormState<CountryPrediction> {
        self.country.request(&self.api, input).await
    }

    /// Flip the theme.
    ///
    /// # Errors
    ///
    /// Returns an error if the new theme cannot be persisted.
    pub fn toggle_theme(&self) -> Result<Theme, DashboardError> {
        self.themes.toggle()
    }

    fn with_search<R>(&self, f: impl FnOnce(&mut Search) -> R) -> R {
        let mut search = self.search.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut search)
    }
}
