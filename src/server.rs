//! Web server for the quakedash UI.
//!
//! Provides the dashboard page using:
//! - Axum for HTTP server
//! - SSE (Server-Sent Events) for viewport commands and scene refreshes
//! - HTMX for the sidebar forms without heavy JavaScript
//! - Leaflet drawing the server-built map scene

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    response::{
        Html, IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::{BroadcastStream, WatchStream};

use crate::client::{DashboardApi, VisitorService};
use crate::dashboard::Dashboard;
use crate::map::{MapScene, escape_html};
use crate::models::{CountryPrediction, Feature, NewsItem, RegionPrediction};
use crate::prediction::FormState;
use crate::store::Theme;

/// Header HTMX turns into a client-side event; the page reloads the scene on it.
const SCENE_TRIGGER: (&str, &str) = ("HX-Trigger", "scene-changed");

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
        }
    }
}

/// Shared application state.
pub struct AppState<A, V> {
    dashboard: Arc<Dashboard<A, V>>,
    /// Fired when background loading changes what the map shows
    scene_tx: broadcast::Sender<()>,
}

impl<A, V> Clone for AppState<A, V> {
    fn clone(&self) -> Self {
        Self {
            dashboard: Arc::clone(&self.dashboard),
            scene_tx: self.scene_tx.clone(),
        }
    }
}

impl<A, V> AppState<A, V> {
    #[must_use]
    pub fn new(dashboard: Arc<Dashboard<A, V>>) -> Self {
        let (scene_tx, _rx) = broadcast::channel(16);
        Self {
            dashboard,
            scene_tx,
        }
    }
}

/// Create the Axum router with all routes.
pub fn create_router<A, V>(state: AppState<A, V>) -> Router
where
    A: DashboardApi + 'static,
    V: VisitorService + 'static,
{
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/scene", get(scene_handler::<A, V>))
        .route("/stream", get(sse_handler::<A, V>))
        .route("/search", get(search_handler::<A, V>))
        .route("/search/select/{id}", post(select_handler::<A, V>))
        .route("/search/clear", post(clear_handler::<A, V>))
        .route("/predict", post(region_handler::<A, V>))
        .route("/predict/country", post(country_handler::<A, V>))
        .route("/news", get(news_handler::<A, V>))
        .route("/visitors", get(visitors_handler::<A, V>))
        .route("/theme/toggle", post(theme_handler::<A, V>))
        .with_state(state)
}

/// Start the web server. The dashboard loads its feeds in the background.
pub async fn run_server<A, V>(config: ServerConfig, dashboard: Arc<Dashboard<A, V>>) -> anyhow::Result<()>
where
    A: DashboardApi + 'static,
    V: VisitorService + 'static,
{
    let state = AppState::new(dashboard);

    let mount_state = state.clone();
    tokio::spawn(async move {
        mount_state.dashboard.mount().await;
        if mount_state.scene_tx.send(()).is_err() {
            tracing::debug!("dashboard loaded with no stream subscribers");
        }
    });

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("🌍 quakedash UI starting at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Fragments
// ============================================================================

/// Text color for a magnitude in the suggestion list.
fn magnitude_text_color(mag: f64) -> &'static str {
    match mag {
        m if m > 6.0 => "#ef4444",
        m if m > 5.0 => "#f97316",
        _ => "#eab308",
    }
}

fn error_html(message: &str) -> String {
    format!(
        r#"<div class="form-error">⚠ {}</div>"#,
        escape_html(message)
    )
}

fn suggestions_html(events: &[Feature]) -> String {
    if events.is_empty() {
        return r#"<div id="suggestions"></div>"#.to_string();
    }
    let items: String = events
        .iter()
        .map(|e| {
            let date = e
                .time()
                .map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            let mag = e
                .properties
                .mag
                .map(|m| format!("{m:.1}"))
                .unwrap_or_else(|| "?".into());
            format!(
                r##"<button class="suggestion" hx-post="/search/select/{id}" hx-target="#search-box" hx-swap="outerHTML">
  <span class="suggestion-place">{place}</span>
  <span class="suggestion-meta"><b style="color:{color}">মাত্রা: {mag}</b> {date}</span>
</button>"##,
                id = escape_html(&e.id),
                place = escape_html(e.place()),
                color = magnitude_text_color(e.magnitude()),
            )
        })
        .collect();
    format!(r#"<div id="suggestions" class="suggestions">{items}</div>"#)
}

fn search_box_html(query: &str) -> String {
    let clear = if query.is_empty() {
        ""
    } else {
        r##"<button class="search-clear" hx-post="/search/clear" hx-target="#search-box" hx-swap="outerHTML">✕</button>"##
    };
    format!(
        r##"<div id="search-box" class="search-box">
  <div class="search-row">
    <input type="text" name="q" value="{value}" placeholder="অবস্থান খুঁজুন..." autocomplete="off"
      hx-get="/search" hx-trigger="input changed, focus" hx-target="#suggestions" hx-swap="outerHTML">
    {clear}
  </div>
  <div id="suggestions"></div>
</div>"##,
        value = escape_html(query),
    )
}

fn region_html(state: &FormState<RegionPrediction>) -> String {
    if let Some(error) = &state.error {
        return error_html(error);
    }
    let Some(p) = &state.result else {
        return String::new();
    };

    let area = p
        .predicted_area
        .as_deref()
        .map(|area| {
            format!(
                r#"<div class="area-card"><p>📍 সম্ভাব্য অঞ্চল: {}</p><small>{}</small></div>"#,
                escape_html(area),
                escape_html(p.area_activity.as_deref().unwrap_or_default()),
            )
        })
        .unwrap_or_default();
    let points = p
        .data_points_used
        .map(|n| format!("<small>সর্বশেষ {n} টি রেকর্ড করা কম্পনের উপর ভিত্তি করে।</small>"))
        .unwrap_or_default();
    let disclaimer = p
        .disclaimer
        .as_deref()
        .map(|d| format!(r#"<div class="disclaimer">⚠ {}</div>"#, escape_html(d)))
        .unwrap_or_default();

    format!(
        r#"<div class="result-card"><p class="headline">{}</p>{area}{points}{disclaimer}</div>"#,
        escape_html(&p.prediction)
    )
}

fn country_html(state: &FormState<CountryPrediction>) -> String {
    if let Some(error) = &state.error {
        return error_html(error);
    }
    let Some(p) = &state.result else {
        return String::new();
    };

    format!(
        r#"<div class="result-card">
  <div class="risk-badge risk-{level}" style="border-color:{color}">
    <p class="headline">🎯 {country}: {risk_level}</p>
    <p>{prediction}</p>
  </div>
  <div class="area-card"><p>📍 সম্ভাব্য অঞ্চল: {area}</p><small>{activity}</small></div>
  <div class="stats">
    <div><small>গড় মাত্রা</small><b>{avg:.1}</b></div>
    <div><small>সর্বোচ্চ মাত্রা</small><b>{max:.1}</b></div>
  </div>
  <div class="disclaimer">⚠ {disclaimer}</div>
</div>"#,
        level = p.risk().color_name(),
        color = p.risk().hex(),
        country = escape_html(&p.country),
        risk_level = escape_html(&p.risk_level),
        prediction = escape_html(&p.prediction),
        area = escape_html(&p.predicted_area),
        activity = escape_html(&p.recent_activity),
        avg = p.avg_magnitude,
        max = p.max_magnitude,
        disclaimer = escape_html(&p.disclaimer),
    )
}

fn news_html(items: &[NewsItem]) -> String {
    if items.is_empty() {
        return r#"<p class="empty-state">কোন সংবাদ পাওয়া যায়নি।</p>"#.to_string();
    }
    items
        .iter()
        .map(|item| {
            format!(
                r#"<a class="news-item" href="{link}" target="_blank" rel="noopener noreferrer">
  <p>{title}</p><span class="news-date">{date}</span>
</a>"#,
                link = escape_html(&item.link),
                title = escape_html(&item.title),
                date = escape_html(&item.published_label()),
            )
        })
        .collect()
}

fn theme_button_html(theme: Theme) -> String {
    let icon = match theme {
        Theme::Light => "🌙",
        Theme::Dark => "☀️",
    };
    format!(
        r##"<button id="theme-toggle" class="theme-toggle" data-theme="{}" hx-post="/theme/toggle" hx-swap="outerHTML">{icon}</button>"##,
        theme.as_str()
    )
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Main page handler - serves the HTML UI.
async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Health check endpoint.
async fn health_handler() -> &'static str {
    "OK"
}

/// Map scene plus whether events are still loading.
#[derive(Serialize)]
struct SceneResponse {
    loading: bool,
    #[serde(flatten)]
    scene: MapScene,
}

async fn scene_handler<A, V>(State(state): State<AppState<A, V>>) -> Json<SceneResponse>
where
    A: DashboardApi + 'static,
    V: VisitorService + 'static,
{
    Json(SceneResponse {
        loading: state.dashboard.quakes.is_loading(),
        scene: state.dashboard.scene(),
    })
}

fn scene_event() -> Event {
    Event::default().event("scene").data("changed")
}

/// SSE stream: viewport commands and scene-change notices.
async fn sse_handler<A, V>(
    State(state): State<AppState<A, V>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>
where
    A: DashboardApi + 'static,
    V: VisitorService + 'static,
{
    let dashboard = &state.dashboard;

    let viewport = BroadcastStream::new(dashboard.map.subscribe()).filter_map(|result| {
        result
            .ok()
            .and_then(|command| Event::default().event("viewport").json_data(command).ok())
    });
    let loaded = BroadcastStream::new(state.scene_tx.subscribe())
        .filter_map(|result| result.ok().map(|()| scene_event()));
    let predictions =
        WatchStream::from_changes(dashboard.predictions.subscribe()).map(|_| scene_event());
    let themes = WatchStream::from_changes(dashboard.themes.subscribe()).map(|_| scene_event());

    let stream = viewport
        .merge(loaded)
        .merge(predictions)
        .merge(themes)
        .map(Ok);

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

async fn search_handler<A, V>(
    State(state): State<AppState<A, V>>,
    Query(query): Query<SearchQuery>,
) -> Response
where
    A: DashboardApi + 'static,
    V: VisitorService + 'static,
{
    let suggestions = Html(suggestions_html(&state.dashboard.search(&query.q)));
    // Emptying the box clears the selection.
    if query.q.is_empty() {
        ([SCENE_TRIGGER], suggestions).into_response()
    } else {
        suggestions.into_response()
    }
}

async fn select_handler<A, V>(
    State(state): State<AppState<A, V>>,
    Path(id): Path<String>,
) -> impl IntoResponse
where
    A: DashboardApi + 'static,
    V: VisitorService + 'static,
{
    if state.dashboard.select(&id).is_none() {
        tracing::debug!(%id, "selection of unknown event ignored");
    }
    ([SCENE_TRIGGER], Html(search_box_html(&state.dashboard.query())))
}

async fn clear_handler<A, V>(State(state): State<AppState<A, V>>) -> impl IntoResponse
where
    A: DashboardApi + 'static,
    V: VisitorService + 'static,
{
    state.dashboard.clear_search();
    ([SCENE_TRIGGER], Html(search_box_html("")))
}

async fn region_handler<A, V>(State(state): State<AppState<A, V>>) -> Html<String>
where
    A: DashboardApi + 'static,
    V: VisitorService + 'static,
{
    let form = state.dashboard.predict_region().await;
    Html(region_html(&form))
}

#[derive(Debug, Deserialize)]
struct CountryForm {
    #[serde(default)]
    country: String,
}

async fn country_handler<A, V>(
    State(state): State<AppState<A, V>>,
    Form(form): Form<CountryForm>,
) -> Html<String>
where
    A: DashboardApi + 'static,
    V: VisitorService + 'static,
{
    let result = state.dashboard.predict_country(&form.country).await;
    Html(country_html(&result))
}

async fn news_handler<A, V>(State(state): State<AppState<A, V>>) -> Html<String>
where
    A: DashboardApi + 'static,
    V: VisitorService + 'static,
{
    if state.dashboard.news.is_loading() {
        return Html(r#"<div class="spinner" hx-get="/news" hx-trigger="load delay:1s" hx-swap="outerHTML"></div>"#.to_string());
    }
    Html(news_html(&state.dashboard.news.items()))
}

async fn visitors_handler<A, V>(State(state): State<AppState<A, V>>) -> Html<String>
where
    A: DashboardApi + 'static,
    V: VisitorService + 'static,
{
    match state.dashboard.visitors.count() {
        Some(count) => Html(format!(r#"<span class="visitors">👥 {count} জন ভিজিটর</span>"#)),
        None => Html(String::new()),
    }
}

async fn theme_handler<A, V>(State(state): State<AppState<A, V>>) -> impl IntoResponse
where
    A: DashboardApi + 'static,
    V: VisitorService + 'static,
{
    let theme = match state.dashboard.toggle_theme() {
        Ok(theme) => theme,
        Err(e) => {
            tracing::warn!("theme not persisted: {}", e);
            state.dashboard.themes.current()
        }
    };
    ([SCENE_TRIGGER], Html(theme_button_html(theme)))
}

// ============================================================================
// HTML Template (embedded for single-binary deployment)
// ============================================================================

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="bn">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>ভূমিকম্প কবে?</title>
  <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
  <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
  <script src="https://unpkg.com/htmx.org@2.0.3"></script>
  <style>
    :root { --bg: #f8fafc; --fg: #0f172a; --card: rgba(255,255,255,0.7); --muted: #64748b; --border: #e2e8f0; }
    body.dark { --bg: #0f172a; --fg: #f1f5f9; --card: rgba(30,41,59,0.7); --muted: #94a3b8; --border: #334155; }
    * { box-sizing: border-box; }
    body { margin: 0; height: 100vh; display: flex; font-family: system-ui, sans-serif; background: var(--bg); color: var(--fg); }
    aside { width: 420px; flex-shrink: 0; overflow-y: auto; padding: 24px; border-right: 1px solid var(--border); display: flex; flex-direction: column; gap: 20px; }
    main { flex: 1; position: relative; }
    #map { position: absolute; inset: 0; }
    h1 { margin: 0; font-size: 2.4rem; background: linear-gradient(90deg,#f97316,#e11d48); -webkit-background-clip: text; color: transparent; }
    h2 { font-size: 1.2rem; margin: 0 0 12px; }
    .card { background: var(--card); border: 1px solid var(--border); border-radius: 12px; padding: 18px; }
    .row { display: flex; gap: 8px; }
    input[type=text] { flex: 1; padding: 10px 12px; border-radius: 10px; border: 1px solid var(--border); background: var(--bg); color: var(--fg); }
    button { cursor: pointer; border: 0; border-radius: 10px; padding: 10px 14px; font-weight: 700; }
    .primary { background: linear-gradient(90deg,#3b82f6,#9333ea); color: white; }
    .accent { width: 100%; background: linear-gradient(90deg,#f97316,#e11d48); color: white; }
    .htmx-request .label { opacity: 0.5; }
    .form-error { margin-top: 12px; padding: 10px; border-radius: 8px; background: rgba(239,68,68,0.15); color: #dc2626; }
    .result-card { margin-top: 12px; display: flex; flex-direction: column; gap: 10px; }
    .headline { font-weight: 700; margin: 0; }
    .risk-badge { border: 1px solid; border-radius: 8px; padding: 10px; }
    .risk-red { background: rgba(220,38,38,0.12); } .risk-orange { background: rgba(249,115,22,0.12); } .risk-yellow { background: rgba(234,179,8,0.12); }
    .area-card { border-radius: 8px; padding: 10px; background: rgba(59,130,246,0.1); }
    .area-card p { margin: 0 0 4px; font-weight: 600; }
    .stats { display: grid; grid-template-columns: 1fr 1fr; gap: 8px; text-align: center; }
    .stats div { background: rgba(148,163,184,0.12); border-radius: 8px; padding: 8px; display: flex; flex-direction: column; }
    .disclaimer { font-size: 0.75rem; color: #a16207; background: rgba(234,179,8,0.1); border-radius: 8px; padding: 8px; }
    .news { height: 16rem; overflow-y: auto; display: flex; flex-direction: column; gap: 10px; }
    .news-item { display: block; text-decoration: none; color: inherit; padding: 12px; border-radius: 10px; border: 1px solid var(--border); }
    .news-item p { margin: 0 0 6px; font-weight: 600; }
    .news-date { font-size: 0.75rem; color: var(--muted); }
    .empty-state { text-align: center; font-style: italic; color: var(--muted); }
    footer { margin-top: auto; display: flex; justify-content: space-between; align-items: center; font-size: 0.75rem; color: var(--muted); }
    .theme-toggle { background: transparent; font-size: 1.1rem; }
    .search-box { position: absolute; top: 16px; right: 16px; width: 320px; z-index: 1000; }
    .search-row { display: flex; background: var(--bg); border-radius: 12px; border: 1px solid var(--border); box-shadow: 0 4px 12px rgba(0,0,0,0.15); }
    .search-row input { border: 0; }
    .search-clear { background: transparent; color: var(--muted); }
    .suggestions { margin-top: 8px; background: var(--bg); border-radius: 12px; border: 1px solid var(--border); overflow: hidden; }
    .suggestion { display: block; width: 100%; text-align: left; background: transparent; color: var(--fg); border-radius: 0; border-bottom: 1px solid var(--border); font-weight: 400; }
    .suggestion-place { display: block; font-weight: 600; }
    .suggestion-meta { font-size: 0.75rem; color: var(--muted); }
    .custom-quake-marker { background: transparent; border: 0; }
    #map-loading { position: absolute; inset: 0; display: flex; align-items: center; justify-content: center; color: var(--muted); z-index: 900; }
  </style>
</head>
<body>
  <aside>
    <header>
      <h1>ভূমিকম্প কবে?</h1>
      <p>এশিয়ার ভূমিকম্প তথ্য ও পূর্বাভাস</p>
    </header>

    <section class="card">
      <h2>📍 দেশভিত্তিক পূর্বাভাস</h2>
      <form hx-post="/predict/country" hx-target="#country-result">
        <div class="row">
          <input type="text" name="country" placeholder="দেশের নাম লিখুন (যেমন: Japan, Indonesia)">
          <button class="primary" type="submit"><span class="label">🔍</span></button>
        </div>
      </form>
      <div id="country-result"></div>
    </section>

    <section class="card">
      <h2>✨ সমগ্র এশিয়ার পূর্বাভাস</h2>
      <button class="accent" hx-post="/predict" hx-target="#region-result"><span class="label">পূর্বাভাস দেখুন</span></button>
      <div id="region-result"></div>
    </section>

    <section class="card">
      <h2>🌐 তথ্য ও রেফারেন্স</h2>
      <p><a href="https://earthquake.usgs.gov/fdsnws/event/1/" target="_blank" rel="noopener noreferrer">USGS ভূমিকম্প API</a></p>
      <p><a href="https://earthquake.usgs.gov/earthquakes/map/" target="_blank" rel="noopener noreferrer">USGS ইন্টারেক্টিভ ম্যাপ</a></p>
    </section>

    <section>
      <h2>📰 সাম্প্রতিক সংবাদ</h2>
      <div class="news" hx-get="/news" hx-trigger="load"></div>
    </section>

    <footer>
      <span>Data: USGS</span>
      <span hx-get="/visitors" hx-trigger="load"></span>
      <button id="theme-toggle" class="theme-toggle" hx-post="/theme/toggle" hx-swap="outerHTML">🌓</button>
    </footer>
  </aside>

  <main>
    <div id="map"></div>
    <div id="map-loading">ম্যাপ লোড হচ্ছে...</div>
    <div id="search-box" class="search-box">
      <div class="search-row">
        <input type="text" name="q" placeholder="অবস্থান খুঁজুন..." autocomplete="off"
          hx-get="/search" hx-trigger="input changed, focus" hx-target="#suggestions" hx-swap="outerHTML">
      </div>
      <div id="suggestions"></div>
    </div>
  </main>

  <script>
    const map = L.map('map').setView([30, 100], 4);
    let tiles = null;
    let tileUrl = null;
    const markers = L.layerGroup().addTo(map);
    const zones = L.layerGroup().addTo(map);

    function drawScene(scene) {
      document.getElementById('map-loading').style.display = scene.loading ? 'flex' : 'none';
      document.body.classList.toggle('dark', scene.theme === 'dark');

      if (tileUrl !== scene.tiles.url) {
        if (tiles) map.removeLayer(tiles);
        tiles = L.tileLayer(scene.tiles.url, { attribution: scene.tiles.attribution }).addTo(map);
        tileUrl = scene.tiles.url;
      }

      markers.clearLayers();
      for (const m of scene.markers) {
        const size = m.style.size;
        const icon = L.divIcon({
          html: m.icon,
          className: 'custom-quake-marker',
          iconSize: [size, size],
          iconAnchor: [size / 2, size / 2],
        });
        L.marker([m.lat, m.lon], { icon, zIndexOffset: m.selected ? 1000 : 0 })
          .bindPopup(m.popup, { maxWidth: 280 })
          .addTo(markers);
      }

      zones.clearLayers();
      if (scene.risk) {
        for (const z of [scene.risk.outer, scene.risk.inner]) {
          L.circle([z.lat, z.lon], {
            radius: z.radius_m,
            color: z.color,
            fillColor: z.color,
            fillOpacity: z.fill_opacity,
            weight: z.weight,
          }).bindPopup(scene.risk.popup).addTo(zones);
        }
      }
    }

    function refreshScene() {
      fetch('/scene').then(r => r.json()).then(drawScene).catch(e => console.error('scene', e));
    }

    document.body.addEventListener('scene-changed', refreshScene);

    const stream = new EventSource('/stream');
    stream.addEventListener('viewport', e => {
      const cmd = JSON.parse(e.data);
      map.flyTo([cmd.lat, cmd.lon], cmd.zoom, { duration: cmd.duration_secs });
      refreshScene();
    });
    stream.addEventListener('scene', refreshScene);

    refreshScene();
  </script>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::models::fixtures::{country, event};
    use crate::models::{CountryResponse, FeatureCollection};
    use crate::prediction::COUNTRY_REQUIRED;
    use crate::store::LocalStore;
    use crate::testing::{FixedCounter, Reply, ScriptedApi};

    async fn mounted_state(api: ScriptedApi) -> AppState<ScriptedApi, FixedCounter> {
        api.push_feed(Reply::Ok(FeatureCollection {
            features: vec![
                event("t1", "Tokyo, Japan", 4.0, 35.6, 139.7),
                event("t2", "Tokyo Bay, Japan", 6.8, 35.4, 139.8),
            ],
        }));
        let dashboard = Dashboard::new(api, FixedCounter(Some(77)), Arc::new(LocalStore::in_memory()));
        dashboard.mount().await;
        AppState::new(Arc::new(dashboard))
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = create_router(mounted_state(ScriptedApi::default()).await);
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "OK");
    }

    #[tokio::test]
    async fn test_search_fragment_lists_matches() {
        let app = create_router(mounted_state(ScriptedApi::default()).await);
        let response = app
            .oneshot(Request::get("/search?q=tokyo").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let html = body_text(response).await;
        let first = html.find("/search/select/t1").expect("t1");
        let second = html.find("/search/select/t2").expect("t2");
        assert!(first < second);
    }

    #[tokio::test]
    async fn test_select_then_scene_marks_event() {
        let state = mounted_state(ScriptedApi::default()).await;
        let app = create_router(state.clone());

        let response = app
            .clone()
            .oneshot(
                Request::post("/search/select/t2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers().get("HX-Trigger").unwrap(),
            "scene-changed"
        );
        assert!(body_text(response).await.contains(r#"value="Tokyo Bay, Japan""#));

        let response = app
            .oneshot(Request::get("/scene").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let scene: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(scene["loading"], false);
        assert_eq!(scene["markers"][1]["id"], "t2");
        assert_eq!(scene["markers"][1]["selected"], true);
        assert_eq!(scene["markers"][0]["selected"], false);
    }

    #[tokio::test]
    async fn test_emptied_search_redraws_map() {
        let state = mounted_state(ScriptedApi::default()).await;
        let app = create_router(state.clone());

        app.clone()
            .oneshot(
                Request::post("/search/select/t2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let typing = app
            .clone()
            .oneshot(Request::get("/search?q=tok").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(typing.headers().get("HX-Trigger").is_none());

        let response = app
            .clone()
            .oneshot(Request::get("/search?q=").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(
            response.headers().get("HX-Trigger").unwrap(),
            "scene-changed"
        );

        let response = app
            .oneshot(Request::get("/scene").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let scene: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        let markers = scene["markers"].as_array().unwrap();
        assert!(markers.iter().all(|m| m["selected"] == false));
    }

    #[tokio::test]
    async fn test_blank_country_form() {
        let api = ScriptedApi::default();
        let state = mounted_state(api).await;
        let app = create_router(state.clone());

        let response = app
            .oneshot(
                Request::post("/predict/country")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("country=+++"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(body_text(response).await.contains(COUNTRY_REQUIRED));
        assert!(state.dashboard.predictions.get().is_none());
    }

    #[tokio::test]
    async fn test_country_form_renders_overlay() {
        let api = ScriptedApi::default();
        api.push_country(Reply::Ok(CountryResponse::Prediction(country(
            "Japan", "orange", 36.0, 138.0,
        ))));
        let state = mounted_state(api).await;
        let app = create_router(state.clone());

        let response = app
            .clone()
            .oneshot(
                Request::post("/predict/country")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("country=Japan"))
                    .unwrap(),
            )
            .await
            .unwrap();
        let html = body_text(response).await;
        assert!(html.contains("risk-orange"));
        assert!(html.contains("Japan"));

        let response = app
            .oneshot(Request::get("/scene").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let scene: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(scene["risk"]["inner"]["color"], "#f97316");
        assert_eq!(scene["risk"]["inner"]["lat"], 36.0);
        assert_eq!(scene["risk"]["outer"]["lon"], 138.0);
    }

    #[tokio::test]
    async fn test_visitors_fragment() {
        let app = create_router(mounted_state(ScriptedApi::default()).await);
        let response = app
            .oneshot(Request::get("/visitors").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(body_text(response).await.contains("77"));
    }

    #[tokio::test]
    async fn test_theme_toggle_switches_tiles() {
        let state = mounted_state(ScriptedApi::default()).await;
        let app = create_router(state.clone());

        let response = app
            .oneshot(Request::post("/theme/toggle").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(body_text(response).await.contains(r#"data-theme="dark""#));
        assert_eq!(state.dashboard.themes.current(), Theme::Dark);
    }

    #[test]
    fn test_news_fragment_escapes() {
        let html = news_html(&[NewsItem {
            title: "Quake <M6>".into(),
            link: "https://news.example/a?b=1&c=2".into(),
            published: "Mon, 06 Jan 2025 08:00:00 GMT".into(),
        }]);
        assert!(html.contains("Quake &lt;M6&gt;"));
        assert!(html.contains("b=1&amp;c=2"));
        assert!(html.contains("Mon Jan 06 2025"));
    }
}
