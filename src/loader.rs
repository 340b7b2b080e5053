//! One-shot loaders: recent earthquakes, news headlines, visitor count.
//!
//! Each loader starts in the loading state, issues a single request when
//! `load` is called and keeps whatever it got. Failures are logged and leave
//! the loader empty; nothing is retried.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use crate::client::{DashboardApi, VisitorService};
use crate::models::{Feature, NewsItem};
use crate::store::LocalStore;

/// Local-store key of the fallback visitor count.
pub const VISITOR_COUNT_KEY: &str = "visitorCount";

#[derive(Debug)]
struct Loaded<T> {
    items: Arc<Vec<T>>,
    loading: bool,
}

impl<T> Default for Loaded<T> {
    fn default() -> Self {
        Self {
            items: Arc::new(Vec::new()),
            loading: true,
        }
    }
}

/// Shared list-plus-loading-flag cell.
#[derive(Debug)]
struct ListCell<T> {
    inner: Mutex<Loaded<T>>,
}

impl<T> ListCell<T> {
    fn new() -> Self {
        Self {
            inner: Mutex::new(Loaded::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Loaded<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start(&self) {
        self.lock().loading = true;
    }

    fn finish(&self, items: Option<Vec<T>>) {
        let mut state = self.lock();
        if let Some(items) = items {
            state.items = Arc::new(items);
        }
        state.loading = false;
    }

    fn items(&self) -> Arc<Vec<T>> {
        Arc::clone(&self.lock().items)
    }

    fn is_loading(&self) -> bool {
        self.lock().loading
    }
}

/// Recent earthquake events.
#[derive(Debug)]
pub struct EarthquakeLoader {
    cell: ListCell<Feature>,
}

impl EarthquakeLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cell: ListCell::new(),
        }
    }

    /// Fetch the feed once, replacing the stored list on success.
    pub async fn load<A: DashboardApi>(&self, api: &A) {
        self.cell.start();
        match api.recent_earthquakes().await {
            Ok(feed) => {
                info!("loaded {} earthquakes", feed.features.len());
                self.cell.finish(Some(feed.features));
            }
            Err(e) => {
                warn!("failed to fetch earthquake data: {}", e);
                self.cell.finish(None);
            }
        }
    }

    /// Snapshot of the loaded events, in feed order.
    #[must_use]
    pub fn events(&self) -> Arc<Vec<Feature>> {
        self.cell.items()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.cell.is_loading()
    }
}

impl Default for EarthquakeLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Latest news headlines.
#[derive(Debug)]
pub struct NewsFeed {
    cell: ListCell<NewsItem>,
}

impl NewsFeed {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cell: ListCell::new(),
        }
    }

    pub async fn load<A: DashboardApi>(&self, api: &A) {
        self.cell.start();
        match api.news().await {
            Ok(response) => {
                if let Some(error) = &response.error {
                    warn!("news backend reported: {}", error);
                }
                self.cell.finish(Some(response.news));
            }
            Err(e) => {
                warn!("failed to fetch news: {}", e);
                self.cell.finish(None);
            }
        }
    }

    #[must_use]
    pub fn items(&self) -> Arc<Vec<NewsItem>> {
        self.cell.items()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.cell.is_loading()
    }
}

impl Default for NewsFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// Visit counter with a local fallback.
#[derive(Debug)]
pub struct VisitorCounter {
    count: Mutex<Option<u64>>,
    storage: Arc<LocalStore>,
}

impl VisitorCounter {
    #[must_use]
    pub fn new(storage: Arc<LocalStore>) -> Self {
        Self {
            count: Mutex::new(None),
            storage,
        }
    }

    /// Register this visit. If the remote counter fails, bump the locally
    /// persisted count instead.
    pub async fn load<V: VisitorService>(&self, service: &V) -> u64 {
        let count = match service.hit().await {
            Ok(value) => value,
            Err(e) => {
                warn!("visitor counter unavailable, using local count: {}", e);
                let next = self
                    .storage
                    .get::<u64>(VISITOR_COUNT_KEY)
                    .map_or(1, |previous| previous.saturating_add(1));
                if let Err(e) = self.storage.set(VISITOR_COUNT_KEY, &next) {
                    warn!("failed to persist visitor count: {}", e);
                }
                next
            }
        };
        *self.count.lock().unwrap_or_else(PoisonError::into_inner) = Some(count);
        count
    }

    /// Displayed count; `None` until loaded.
    #[must_use]
    pub fn count(&self) -> Option<u64> {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
