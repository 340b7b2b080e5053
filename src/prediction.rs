//! On-demand forecast requests.
//!
//! Each form owns a `RequestSlot` holding its loading/error/result state.
//! Every request takes a generation number when it starts; a response is
//! applied only if no newer request has started since, so the most recently
//! issued request always determines what is shown.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::client::DashboardApi;
use crate::errors::DashboardError;
use crate::models::{CountryPrediction, CountryResponse, RegionPrediction, RegionResponse};
use crate::store::PredictionStore;
use crate::viewport::{COUNTRY_ZOOM, MapHandle};

/// Shown when the backend cannot be reached or answers garbage.
pub const REQUEST_FAILED: &str = "পূর্বাভাস আনতে সমস্যা হয়েছে। ব্যাকএন্ড চলছে কিনা দেখুন।";

/// Shown when the country field is blank.
pub const COUNTRY_REQUIRED: &str = "দেশের নাম লিখুন";

/// Text a form shows for `err`: the generic message for transport failures,
/// the error's own text otherwise.
fn form_message(err: &DashboardError) -> String {
    if err.is_transport() {
        REQUEST_FAILED.to_string()
    } else {
        err.to_string()
    }
}

/// What a form currently displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormState<T> {
    pub loading: bool,
    pub error: Option<String>,
    pub result: Option<T>,
}

impl<T> Default for FormState<T> {
    fn default() -> Self {
        Self {
            loading: false,
            error: None,
            result: None,
        }
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u64,
    state: FormState<T>,
}

/// Form state guarded by request generation.
#[derive(Debug)]
pub struct RequestSlot<T> {
    inner: Mutex<Slot<T>>,
}

impl<T: Clone> RequestSlot<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Slot {
                generation: 0,
                state: FormState::default(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slot<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a request: clears error and result, sets loading.
    pub fn begin(&self) -> u64 {
        let mut slot = self.lock();
        slot.generation += 1;
        slot.state = FormState {
            loading: true,
            error: None,
            result: None,
        };
        slot.generation
    }

    /// Apply the outcome of request `generation`. Returns `false` (and changes
    /// nothing) when a newer request has started.
    pub fn finish(&self, generation: u64, outcome: Result<T, String>) -> bool {
        let mut slot = self.lock();
        if slot.generation != generation {
            debug!(
                stale = generation,
                current = slot.generation,
                "discarding superseded response"
            );
            return false;
        }
        slot.state.loading = false;
        match outcome {
            Ok(value) => slot.state.result = Some(value),
            Err(message) => slot.state.error = Some(message),
        }
        true
    }

    /// Show `message` without issuing a request.
    pub fn reject(&self, message: &str) {
        self.lock().state.error = Some(message.to_string());
    }

    #[must_use]
    pub fn snapshot(&self) -> FormState<T> {
        self.lock().state.clone()
    }
}

impl<T: Clone> Default for RequestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Whole-region forecast form.
#[derive(Debug, Default)]
pub struct RegionForecast {
    slot: RequestSlot<RegionPrediction>,
}

impl RegionForecast {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a fresh forecast and return the resulting form state.
    pub async fn request<A: DashboardApi>(&self, api: &A) -> FormState<RegionPrediction> {
        let generation = self.slot.begin();

        let outcome = match api.predict_region().await {
            Ok(RegionResponse::Prediction(p)) => Ok(p),
            Ok(RegionResponse::Error(e)) => Err(DashboardError::Backend(e.error)),
            Err(e) => {
                warn!("region forecast failed: {}", e);
                Err(e)
            }
        };
        self.slot
            .finish(generation, outcome.map_err(|e| form_message(&e)));
        self.slot.snapshot()
    }
}

/// Per-country forecast form. On success it publishes the forecast to the
/// shared store and flies the map to the forecast center.
#[derive(Debug)]
pub struct CountryForecast {
    slot: RequestSlot<CountryPrediction>,
    store: PredictionStore,
    map: MapHandle,
}

impl CountryForecast {
    #[must_use]
    pub fn new(store: PredictionStore, map: MapHandle) -> Self {
        Self {
            slot: RequestSlot::new(),
            store,
            map,
        }
    }

    /// Request a forecast for `input`. Blank input is rejected locally.
    pub async fn request<A: DashboardApi>(
        &self,
        api: &A,
        input: &str,
    ) -> FormState<CountryPrediction> {
        let country = input.trim();
        if country.is_empty() {
            let err = DashboardError::Validation(COUNTRY_REQUIRED.to_string());
            self.slot.reject(&form_message(&err));
            return self.slot.snapshot();
        }

        let generation = self.slot.begin();

        let outcome = match api.predict_country(country).await {
            Ok(CountryResponse::Prediction(p)) => Ok(p),
            Ok(CountryResponse::Error(e)) => {
                info!(country, "country forecast refused: {}", e.error);
                Err(DashboardError::Backend(e.error))
            }
            Err(e) => {
                warn!(country, "country forecast failed: {}", e);
                Err(e)
            }
        };

        let published = outcome.as_ref().ok().cloned();
        if self
            .slot
            .finish(generation, outcome.map_err(|e| form_message(&e)))
        {
            if let Some(prediction) = published {
                self.publish(prediction);
            }
        }
        self.slot.snapshot()
    }

    fn publish(&self, prediction: CountryPrediction) {
        if prediction.has_valid_center() {
            self.map
                .fly_to(prediction.center_lat, prediction.center_lon, COUNTRY_ZOOM);
        }
        info!(
            country = %prediction.country,
            risk = prediction.risk_color.as_str(),
            "country forecast published"
        );
        self.store.set(Some(prediction));
    }
}
