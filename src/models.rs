//! Data models for the dashboard backend API.
//!
//! Earthquake events keep the GeoJSON shape the backend relays from USGS.
//! Prediction and news payloads follow the backend's JSON contract, including
//! its `{ "error": "..." }` answers.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Response of `/api/earthquakes/recent`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureCollection {
    /// Earthquake events, in feed order
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// A single earthquake event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Unique event ID within one feed snapshot
    pub id: String,

    /// Geographic location
    pub geometry: Geometry,

    /// Event properties
    pub properties: Properties,
}

impl Feature {
    /// Get the event time as a `DateTime<Utc>`.
    #[must_use]
    pub fn time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.properties.time).single()
    }

    /// Get longitude (degrees).
    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.geometry.coordinates.first().copied().unwrap_or(0.0)
    }

    /// Get latitude (degrees).
    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.geometry.coordinates.get(1).copied().unwrap_or(0.0)
    }

    /// Get depth in kilometers (positive down).
    #[must_use]
    pub fn depth_km(&self) -> f64 {
        self.geometry.coordinates.get(2).copied().unwrap_or(0.0)
    }

    /// Place label, empty when the feed has none.
    #[must_use]
    pub fn place(&self) -> &str {
        self.properties.place.as_deref().unwrap_or("")
    }

    /// Magnitude, zero when the feed has none.
    #[must_use]
    pub fn magnitude(&self) -> f64 {
        self.properties.mag.unwrap_or(0.0)
    }
}

/// Geographic geometry for an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Coordinates: [longitude, latitude, depth_km]
    pub coordinates: Vec<f64>,
}

/// Event properties the dashboard reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    /// Magnitude value
    pub mag: Option<f64>,

    /// Human-readable place description
    pub place: Option<String>,

    /// Event time (ms since epoch)
    pub time: i64,

    /// Event page URL
    pub url: Option<String>,
}

/// Region-wide forecast from `/api/predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionPrediction {
    pub prediction: String,
    pub predicted_area: Option<String>,
    pub area_activity: Option<String>,
    pub data_points_used: Option<u64>,
    pub disclaimer: Option<String>,
}

/// Country forecast from `/api/predict/country`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryPrediction {
    pub country: String,
    pub prediction: String,
    pub predicted_area: String,
    pub center_lat: f64,
    pub center_lon: f64,
    pub risk_level: String,
    pub risk_color: String,
    pub recent_activity: String,
    pub avg_magnitude: f64,
    pub max_magnitude: f64,
    pub disclaimer: String,
    #[serde(default)]
    pub data_points_used: Option<u64>,
}

impl CountryPrediction {
    /// Risk classification derived from the reported color.
    #[must_use]
    pub fn risk(&self) -> RiskLevel {
        RiskLevel::from_color(&self.risk_color)
    }

    /// Whether the center point can be placed on a map.
    #[must_use]
    pub fn has_valid_center(&self) -> bool {
        self.center_lat.is_finite()
            && self.center_lon.is_finite()
            && (-90.0..=90.0).contains(&self.center_lat)
            && (-180.0..=180.0).contains(&self.center_lon)
    }
}

/// Ordered risk classification for a country forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Map a backend color name to a level. Unknown colors fall into the
    /// lowest band.
    #[must_use]
    pub fn from_color(color: &str) -> Self {
        match color.to_lowercase().as_str() {
            "red" => Self::High,
            "orange" => Self::Medium,
            _ => Self::Low,
        }
    }

    /// Backend color name for this level.
    #[must_use]
    pub const fn color_name(self) -> &'static str {
        match self {
            Self::High => "red",
            Self::Medium => "orange",
            Self::Low => "yellow",
        }
    }

    /// Display color (hex) for this level.
    #[must_use]
    pub const fn hex(self) -> &'static str {
        match self {
            Self::High => "#dc2626",
            Self::Medium => "#f97316",
            Self::Low => "#eab308",
        }
    }
}

/// Application-level error payload returned with HTTP 200.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
}

/// Either a region forecast or an error payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RegionResponse {
    Error(ErrorPayload),
    Prediction(RegionPrediction),
}

/// Either a country forecast or an error payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CountryResponse {
    Error(ErrorPayload),
    Prediction(CountryPrediction),
}

/// One news headline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    pub published: String,
}

impl NewsItem {
    /// Published date as a short label ("Mon Jan 06 2025"), or the raw
    /// string when it is not a recognised timestamp.
    #[must_use]
    pub fn published_label(&self) -> String {
        DateTime::parse_from_rfc2822(&self.published)
            .or_else(|_| DateTime::parse_from_rfc3339(&self.published))
            .map(|t| t.format("%a %b %d %Y").to_string())
            .unwrap_or_else(|_| self.published.clone())
    }
}

/// Response of `/api/news`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewsResponse {
    #[serde(default)]
    pub news: Vec<NewsItem>,
    pub error: Option<String>,
}

/// Response of the visitor-counting service.
#[derive(Debug, Clone, Deserialize)]
pub struct CounterHit {
    pub value: u64,
}

/// Simplified event for output.
///
/// This is the normalized structure we emit in JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct OutputEvent {
    pub id: String,
    pub time: String,
    pub magnitude: Option<f64>,
    pub depth_km: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub place: Option<String>,
    pub url: Option<String>,
}

impl From<&Feature> for OutputEvent {
    fn from(f: &Feature) -> Self {
        Self {
            id: f.id.clone(),
            time: f
                .time()
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "unknown".into()),
            magnitude: f.properties.mag,
            depth_km: f.depth_km(),
            latitude: f.latitude(),
            longitude: f.longitude(),
            place: f.properties.place.clone(),
            url: f.properties.url.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::{CountryPrediction, Feature, Geometry, Properties};

    /// Build an event at the given coordinates.
    pub fn event(id: &str, place: &str, mag: f64, lat: f64, lon: f64) -> Feature {
        Feature {
            id: id.to_string(),
            geometry: Geometry {
                coordinates: vec![lon, lat, 10.0],
            },
            properties: Properties {
                mag: Some(mag),
                place: Some(place.to_string()),
                time: 1_736_150_400_000,
                url: Some(format!("https://earthquake.usgs.gov/earthquakes/eventpage/{id}")),
            },
        }
    }

    /// Build a country forecast centered on the given point.
    pub fn country(name: &str, color: &str, lat: f64, lon: f64) -> CountryPrediction {
        CountryPrediction {
            country: name.to_string(),
            prediction: "আগামী ৭ দিনে সম্ভাব্য সর্বোচ্চ মাত্রা: 5.4".to_string(),
            predicted_area: format!("{name} coast"),
            center_lat: lat,
            center_lon: lon,
            risk_level: "মাঝারি ঝুঁকি".to_string(),
            risk_color: color.to_string(),
            recent_activity: "গত ৯০ দিনে 42টি ভূমিকম্প রেকর্ড হয়েছে".to_string(),
            avg_magnitude: 4.3,
            max_magnitude: 6.1,
            disclaimer: "এটি শুধুমাত্র শিক্ষামূলক উদ্দেশ্যে। সত্যিকারের পূর্বাভাস নয়।".to_string(),
            data_points_used: Some(42),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sample_feed() {
        let json = include_str!("../tools/sample_recent.json");
        let feed: FeatureCollection =
            serde_json::from_str(json).expect("failed to parse sample feed");

        assert_eq!(feed.features.len(), 3);
        let first = &feed.features[0];
        assert_eq!(first.id, "us7000abcd");
        assert!((first.latitude() - 35.68).abs() < 1e-9);
        assert!((first.longitude() - 139.76).abs() < 1e-9);
        assert_eq!(first.place(), "20 km E of Tokyo, Japan");
        assert!(first.time().is_some());
    }

    #[test]
    fn test_missing_place_and_mag() {
        let json = r#"{"id":"x","geometry":{"coordinates":[1.0,2.0,3.0]},
            "properties":{"mag":null,"place":null,"time":0,"url":null}}"#;
        let f: Feature = serde_json::from_str(json).expect("parse");
        assert_eq!(f.place(), "");
        assert!(f.magnitude().abs() < f64::EPSILON);
        assert!((f.depth_km() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_country_response_error_payload() {
        let json = r#"{"error":"'Atlantis' এ পর্যাপ্ত ভূমিকম্পের তথ্য পাওয়া যায়নি।",
            "country":"Atlantis","quakes_found":0}"#;
        let parsed: CountryResponse = serde_json::from_str(json).expect("parse");
        assert!(matches!(parsed, CountryResponse::Error(e) if e.error.contains("Atlantis")));
    }

    #[test]
    fn test_country_response_prediction() {
        let json = r#"{"country":"Japan","prediction":"p","predicted_area":"Honshu",
            "center_lat":36.0,"center_lon":138.0,"risk_level":"মাঝারি ঝুঁকি",
            "risk_color":"orange","recent_activity":"a","avg_magnitude":4.6,
            "max_magnitude":6.2,"disclaimer":"d","data_points_used":50}"#;
        let parsed: CountryResponse = serde_json::from_str(json).expect("parse");
        let CountryResponse::Prediction(p) = parsed else {
            panic!("expected prediction");
        };
        assert_eq!(p.risk(), RiskLevel::Medium);
        assert!(p.has_valid_center());
    }

    #[test]
    fn test_region_response_without_optional_fields() {
        let json = r#"{"prediction":"নির্ভরযোগ্য পূর্বাভাস দেওয়ার জন্য পর্যাপ্ত তথ্য নেই।"}"#;
        let parsed: RegionResponse = serde_json::from_str(json).expect("parse");
        let RegionResponse::Prediction(p) = parsed else {
            panic!("expected prediction");
        };
        assert!(p.predicted_area.is_none());
        assert!(p.data_points_used.is_none());
    }

    #[test]
    fn test_risk_levels_are_ordered() {
        assert!(RiskLevel::High > RiskLevel::Medium);
        assert!(RiskLevel::Medium > RiskLevel::Low);
        assert_eq!(RiskLevel::from_color("RED"), RiskLevel::High);
        assert_eq!(RiskLevel::from_color("purple"), RiskLevel::Low);
    }

    #[test]
    fn test_invalid_center() {
        let mut p = fixtures::country("Japan", "red", 36.0, 138.0);
        p.center_lat = f64::NAN;
        assert!(!p.has_valid_center());
        p.center_lat = 95.0;
        assert!(!p.has_valid_center());
    }

    #[test]
    fn test_news_published_label() {
        let item = NewsItem {
            title: "t".into(),
            link: "l".into(),
            published: "Mon, 06 Jan 2025 08:00:00 GMT".into(),
        };
        assert_eq!(item.published_label(), "Mon Jan 06 2025");

        let raw = NewsItem {
            published: "yesterday".into(),
            ..item
        };
        assert_eq!(raw.published_label(), "yesterday");
    }

    #[test]
    fn test_news_response_error_is_empty() {
        let parsed: NewsResponse =
            serde_json::from_str(r#"{"error":"এই মুহূর্তে সংবাদ আনা সম্ভব হচ্ছে না।"}"#)
                .expect("parse");
        assert!(parsed.news.is_empty());
        assert!(parsed.error.is_some());
    }
}
