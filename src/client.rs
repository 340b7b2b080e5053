//! Dashboard backend API client.
//!
//! Provides async HTTP access to the earthquake, prediction and news
//! endpoints, plus the third-party visitor counter.
//! Uses reqwest with rustls for TLS.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::errors::DashboardError;
use crate::models::{
    CounterHit, CountryResponse, FeatureCollection, NewsResponse, RegionResponse,
};

/// Default request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// User agent string for API requests.
const USER_AGENT: &str = concat!("quakedash/", env!("CARGO_PKG_VERSION"));

/// Default backend base URL.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// Default visitor-counter service base URL.
pub const DEFAULT_COUNTER_URL: &str = "https://api.countapi.xyz";

/// Counter namespace and key for this dashboard.
const COUNTER_NAMESPACE: &str = "vumikompokobe";
const COUNTER_KEY: &str = "visitors";

/// Backend operations the dashboard consumes.
pub trait DashboardApi: Send + Sync {
    /// `GET /api/earthquakes/recent`
    fn recent_earthquakes(
        &self,
    ) -> impl Future<Output = Result<FeatureCollection, DashboardError>> + Send;

    /// `GET /api/predict`
    fn predict_region(&self) -> impl Future<Output = Result<RegionResponse, DashboardError>> + Send;

    /// `GET /api/predict/country?country=<name>`
    fn predict_country(
        &self,
        country: &str,
    ) -> impl Future<Output = Result<CountryResponse, DashboardError>> + Send;

    /// `GET /api/news`
    fn news(&self) -> impl Future<Output = Result<NewsResponse, DashboardError>> + Send;
}

/// Remote visitor-hit counter.
pub trait VisitorService: Send + Sync {
    /// Register one visit and return the new total.
    fn hit(&self) -> impl Future<Output = Result<u64, DashboardError>> + Send;
}

fn http_client() -> Result<Client, DashboardError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()?)
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// GET `url` and decode a JSON body, mapping non-2xx to `Api`.
async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    query: &[(&str, &str)],
) -> Result<T, DashboardError> {
    debug!("fetching {}", url);

    let response = client.get(url).query(query).send().await?;

    // Check status before parsing
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(DashboardError::Api {
            status: status.as_u16(),
            message: body,
        });
    }

    let body = response.text().await?;
    if body.trim().is_empty() {
        return Err(DashboardError::InvalidResponse(format!("empty body from {url}")));
    }
    Ok(serde_json::from_str(&body)?)
}

/// Client for the dashboard backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the backend at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(base_url: &str) -> Result<Self, DashboardError> {
        Ok(Self {
            client: http_client()?,
            base_url: trim_base(base_url),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl DashboardApi for ApiClient {
    #[instrument(skip(self))]
    async fn recent_earthquakes(&self) -> Result<FeatureCollection, DashboardError> {
        let feed: FeatureCollection =
            get_json(&self.client, &self.endpoint("/api/earthquakes/recent"), &[]).await?;
        debug!("fetched {} events", feed.features.len());
        Ok(feed)
    }

    #[instrument(skip(self))]
    async fn predict_region(&self) -> Result<RegionResponse, DashboardError> {
        get_json(&self.client, &self.endpoint("/api/predict"), &[]).await
    }

    #[instrument(skip(self))]
    async fn predict_country(&self, country: &str) -> Result<CountryResponse, DashboardError> {
        get_json(
            &self.client,
            &self.endpoint("/api/predict/country"),
            &[("country", country)],
        )
        .await
    }

    #[instrument(skip(self))]
    async fn news(&self) -> Result<NewsResponse, DashboardError> {
        get_json(&self.client, &self.endpoint("/api/news"), &[]).await
    }
}

/// Client for the hosted hit counter.
#[derive(Debug, Clone)]
pub struct CounterClient {
    client: Client,
    base_url: String,
}

impl CounterClient {
    /// Create a counter client for the service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(base_url: &str) -> Result<Self, DashboardError> {
        Ok(Self {
            client: http_client()?,
            base_url: trim_base(base_url),
        })
    }

    fn hit_url(&self) -> String {
        format!("{}/hit/{COUNTER_NAMESPACE}/{COUNTER_KEY}", self.base_url)
    }
}

impl VisitorService for CounterClient {
    #[instrument(skip(self))]
    async fn hit(&self) -> Result<u64, DashboardError> {
        let hit: CounterHit = get_json(&self.client, &self.hit_url(), &[]).await?;
        Ok(hit.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ApiClient::new("http://localhost:8000/").expect("client");
        assert_eq!(
            client.endpoint("/api/news"),
            "http://localhost:8000/api/news"
        );
    }

    #[test]
    fn test_counter_hit_url() {
        let client = CounterClient::new(DEFAULT_COUNTER_URL).expect("client");
        assert_eq!(
            client.hit_url(),
            "https://api.countapi.xyz/hit/vumikompokobe/visitors"
        );
    }

    #[tokio::test]
    async fn test_empty_body_is_invalid_response() {
        let app = axum::Router::new().route("/api/news", axum::routing::get(|| async { "" }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        let client = ApiClient::new(&format!("http://{addr}")).expect("client");
        let err = client.news().await.expect_err("empty body should fail");
        assert!(matches!(err, DashboardError::InvalidResponse(_)));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        // Port 9 (discard) on localhost is not expected to serve HTTP.
        let client = ApiClient::new("http://127.0.0.1:9").expect("client");
        let err = client.news().await.expect_err("request should fail");
        assert!(err.is_transport());
    }
}
