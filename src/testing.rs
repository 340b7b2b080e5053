//! Scripted in-memory backend for component tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::oneshot;

use crate::client::{DashboardApi, VisitorService};
use crate::errors::DashboardError;
use crate::models::{CountryResponse, FeatureCollection, NewsResponse, RegionResponse};

/// One scripted answer.
pub enum Reply<T> {
    Ok(T),
    /// Transport-level failure
    Fail,
    /// Resolves when the test sends a value
    Gated(oneshot::Receiver<T>),
}

impl<T> Reply<T> {
    async fn resolve(self) -> Result<T, DashboardError> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::Fail => Err(unavailable()),
            Self::Gated(rx) => rx.await.map_err(|_| unavailable()),
        }
    }
}

fn unavailable() -> DashboardError {
    DashboardError::Api {
        status: 503,
        message: "backend unavailable".into(),
    }
}

fn next<T>(queue: &Mutex<VecDeque<Reply<T>>>) -> Reply<T> {
    queue
        .lock()
        .map(|mut q| q.pop_front())
        .ok()
        .flatten()
        .unwrap_or(Reply::Fail)
}

/// Backend whose answers are queued up front. An empty queue fails.
#[derive(Default)]
pub struct ScriptedApi {
    feed: Mutex<VecDeque<Reply<FeatureCollection>>>,
    region: Mutex<VecDeque<Reply<RegionResponse>>>,
    country: Mutex<VecDeque<Reply<CountryResponse>>>,
    news: Mutex<VecDeque<Reply<NewsResponse>>>,
    pub country_calls: AtomicUsize,
    pub region_calls: AtomicUsize,
    pub countries: Mutex<Vec<String>>,
}

impl ScriptedApi {
    pub fn push_feed(&self, reply: Reply<FeatureCollection>) -> &Self {
        self.feed.lock().expect("lock").push_back(reply);
        self
    }

    pub fn push_region(&self, reply: Reply<RegionResponse>) -> &Self {
        self.region.lock().expect("lock").push_back(reply);
        self
    }

    pub fn push_country(&self, reply: Reply<CountryResponse>) -> &Self {
        self.country.lock().expect("lock").push_back(reply);
        self
    }

    pub fn push_news(&self, reply: Reply<NewsResponse>) -> &Self {
        self.news.lock().expect("lock").push_back(reply);
        self
    }

    pub fn country_calls(&self) -> usize {
        self.country_calls.load(Ordering::SeqCst)
    }

    pub fn region_calls(&self) -> usize {
        self.region_calls.load(Ordering::SeqCst)
    }
}

impl DashboardApi for ScriptedApi {
    async fn recent_earthquakes(&self) -> Result<FeatureCollection, DashboardError> {
        next(&self.feed).resolve().await
    }

    async fn predict_region(&self) -> Result<RegionResponse, DashboardError> {
        self.region_calls.fetch_add(1, Ordering::SeqCst);
        next(&self.region).resolve().await
    }

    async fn predict_country(&self, country: &str) -> Result<CountryResponse, DashboardError> {
        self.country_calls.fetch_add(1, Ordering::SeqCst);
        self.countries
            .lock()
            .expect("lock")
            .push(country.to_string());
        next(&self.country).resolve().await
    }

    async fn news(&self) -> Result<NewsResponse, DashboardError> {
        next(&self.news).resolve().await
    }
}

/// Hit counter that either answers a fixed total or fails.
pub struct FixedCounter(pub Option<u64>);

impl VisitorService for FixedCounter {
    async fn hit(&self) -> Result<u64, DashboardError> {
        self.0.ok_or_else(unavailable)
    }
}
