//! Map scene construction.
//!
//! Everything the map renders is computed here as a serialisable
//! `MapScene`: tile layer by theme, one styled marker per event, and the
//! risk-zone overlay for the stored country forecast. The browser side
//! only draws what it is given.

use serde::Serialize;

use crate::models::{CountryPrediction, Feature, RiskLevel};
use crate::store::Theme;
use crate::viewport::{INITIAL_CENTER, INITIAL_ZOOM};

// Magnitude band colors
const MAJOR: &str = "#dc2626"; // mag > 6.5
const STRONG: &str = "#f97316"; // mag > 5.5
const MODERATE: &str = "#eab308"; // mag > 4.5
const LIGHT: &str = "#3b82f6";

const LIGHT_TILES: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
const DARK_TILES: &str = "https://tiles.stadiamaps.com/tiles/alidade_smooth_dark/{z}/{x}/{y}{r}.png";
const TILE_ATTRIBUTION: &str =
    r#"&copy; <a href="https://www.openstreetmap.org/copyright">OpenStreetMap</a> contributors"#;

/// Risk zone radii in meters.
const INNER_ZONE_M: f64 = 50_000.0;
const OUTER_ZONE_M: f64 = 150_000.0;

/// Base map imagery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TileLayer {
    pub url: &'static str,
    pub attribution: &'static str,
}

impl TileLayer {
    #[must_use]
    pub const fn for_theme(theme: Theme) -> Self {
        let url = match theme {
            Theme::Light => LIGHT_TILES,
            Theme::Dark => DARK_TILES,
        };
        Self {
            url,
            attribution: TILE_ATTRIBUTION,
        }
    }
}

/// Color for a magnitude band.
#[must_use]
pub fn magnitude_color(mag: f64) -> &'static str {
    match mag {
        m if m > 6.5 => MAJOR,
        m if m > 5.5 => STRONG,
        m if m > 4.5 => MODERATE,
        _ => LIGHT,
    }
}

/// Visual style of one event marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarkerStyle {
    pub color: &'static str,
    /// Icon edge length in pixels
    pub size: f64,
    pub stroke_width: u8,
    pub opacity: f64,
    /// Animated ring, only on the selected marker
    pub pulse: bool,
}

impl MarkerStyle {
    #[must_use]
    pub fn new(mag: f64, selected: bool) -> Self {
        let color = magnitude_color(mag);
        if selected {
            Self {
                color,
                size: (mag * 8.0).max(30.0),
                stroke_width: 3,
                opacity: 1.0,
                pulse: true,
            }
        } else {
            Self {
                color,
                size: (mag * 6.0).max(20.0),
                stroke_width: 2,
                opacity: 0.8,
                pulse: false,
            }
        }
    }

    /// Inline SVG icon for this style.
    #[must_use]
    pub fn svg(&self) -> String {
        let Self {
            color,
            size,
            stroke_width,
            opacity,
            pulse,
        } = *self;
        let ring = if pulse {
            r##"<circle cx="12" cy="12" r="10" fill="none" stroke="#fff" stroke-width="2" opacity="0.5"><animate attributeName="r" from="10" to="20" dur="1s" repeatCount="indefinite"/><animate attributeName="opacity" from="0.5" to="0" dur="1s" repeatCount="indefinite"/></circle>"##
        } else {
            ""
        };
        format!(
            r##"<svg width="{size}" height="{size}" viewBox="0 0 24 24" xmlns="http://www.w3.org/2000/svg"><circle cx="12" cy="12" r="10" fill="{color}" stroke="#fff" stroke-width="{stroke_width}" opacity="{opacity}"/><circle cx="12" cy="12" r="5" fill="{color}" stroke="#fff" stroke-width="1" opacity="0.6"/>{ring}</svg>"##
        )
    }
}

/// One event on the map.
#[derive(Debug, Clone, Serialize)]
pub struct Marker {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub magnitude: f64,
    pub selected: bool,
    pub style: MarkerStyle,
    pub icon: String,
    pub popup: String,
}

impl Marker {
    fn from_event(event: &Feature, selected: bool) -> Self {
        let mag = event.magnitude();
        let style = MarkerStyle::new(mag, selected);
        Self {
            id: event.id.clone(),
            lat: event.latitude(),
            lon: event.longitude(),
            magnitude: mag,
            selected,
            icon: style.svg(),
            style,
            popup: marker_popup(event),
        }
    }
}

fn marker_popup(event: &Feature) -> String {
    let time = event
        .time()
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "unknown".into());
    let mag = event
        .properties
        .mag
        .map(|m| format!("{m:.1}"))
        .unwrap_or_else(|| "?".into());
    let link = event
        .properties
        .url
        .as_deref()
        .map(|url| {
            format!(
                r#"<a class="popup-link" href="{}" target="_blank" rel="noopener noreferrer">বিস্তারিত দেখুন</a>"#,
                escape_html(url)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<div class="quake-popup"><div class="popup-mag"><span>মাত্রা</span><strong style="color:{color}">{mag}</strong></div><p class="popup-place">{place}</p><p class="popup-time">{time}</p>{link}</div>"#,
        color = magnitude_color(event.magnitude()),
        place = escape_html(event.place()),
    )
}

/// One circle of a risk overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskZone {
    pub lat: f64,
    pub lon: f64,
    pub radius_m: f64,
    pub color: &'static str,
    pub fill_opacity: f64,
    pub weight: u8,
}

/// Concentric risk zones around a country forecast center.
#[derive(Debug, Clone, Serialize)]
pub struct RiskOverlay {
    pub risk: RiskLevel,
    pub inner: RiskZone,
    pub outer: RiskZone,
    pub popup: String,
}

impl RiskOverlay {
    /// Overlay for `prediction`, or `None` when its center is unusable.
    #[must_use]
    pub fn from_prediction(prediction: &CountryPrediction) -> Option<Self> {
        if !prediction.has_valid_center() {
            return None;
        }
        let risk = prediction.risk();
        let color = risk.hex();
        let (lat, lon) = (prediction.center_lat, prediction.center_lon);

        Some(Self {
            risk,
            inner: RiskZone {
                lat,
                lon,
                radius_m: INNER_ZONE_M,
                color,
                fill_opacity: 0.35,
                weight: 2,
            },
            outer: RiskZone {
                lat,
                lon,
                radius_m: OUTER_ZONE_M,
                color,
                fill_opacity: 0.12,
                weight: 1,
            },
            popup: format!(
                r#"<div class="risk-popup"><strong>{country}: {level}</strong><p>📍 সম্ভাব্য অঞ্চল: {area}</p><p>{narrative}</p></div>"#,
                country = escape_html(&prediction.country),
                level = escape_html(&prediction.risk_level),
                area = escape_html(&prediction.predicted_area),
                narrative = escape_html(&prediction.prediction),
            ),
        })
    }
}

/// Everything the map draws.
#[derive(Debug, Clone, Serialize)]
pub struct MapScene {
    pub center: (f64, f64),
    pub zoom: u8,
    pub theme: Theme,
    pub tiles: TileLayer,
    pub markers: Vec<Marker>,
    pub risk: Option<RiskOverlay>,
}

/// Build the scene for the current dashboard state.
#[must_use]
pub fn build_scene(
    events: &[Feature],
    selected_id: Option<&str>,
    theme: Theme,
    prediction: Option<&CountryPrediction>,
) -> MapScene {
    let markers = events
        .iter()
        .map(|e| Marker::from_event(e, selected_id == Some(e.id.as_str())))
        .collect();

    MapScene {
        center: INITIAL_CENTER,
        zoom: INITIAL_ZOOM,
        theme,
        tiles: TileLayer::for_theme(theme),
        markers,
        risk: prediction.and_then(RiskOverlay::from_prediction),
    }
}

/// Minimal HTML escaping for text placed in markup.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{country, event};

    #[test]
    fn test_color_bands_are_strict() {
        assert_eq!(magnitude_color(6.6), MAJOR);
        assert_eq!(magnitude_color(6.5), STRONG);
        assert_eq!(magnitude_color(5.5), MODERATE);
        assert_eq!(magnitude_color(4.5), LIGHT);
        assert_eq!(magnitude_color(0.0), LIGHT);
    }

    #[test]
    fn test_marker_sizes() {
        let small = MarkerStyle::new(2.0, false);
        assert!((small.size - 20.0).abs() < f64::EPSILON);
        let big = MarkerStyle::new(6.8, false);
        assert!((big.size - 40.8).abs() < 1e-9);

        let selected_small = MarkerStyle::new(2.0, true);
        assert!((selected_small.size - 30.0).abs() < f64::EPSILON);
        let selected_big = MarkerStyle::new(6.8, true);
        assert!((selected_big.size - 54.4).abs() < 1e-9);
    }

    #[test]
    fn test_pulse_only_on_selected() {
        let plain = MarkerStyle::new(5.0, false);
        assert!(!plain.pulse);
        assert!(!plain.svg().contains("<animate"));

        let selected = MarkerStyle::new(5.0, true);
        assert!(selected.pulse);
        assert_eq!(selected.stroke_width, 3);
        assert!(selected.svg().contains("<animate"));
    }

    #[test]
    fn test_tiles_follow_theme() {
        assert_eq!(TileLayer::for_theme(Theme::Light).url, LIGHT_TILES);
        assert_eq!(TileLayer::for_theme(Theme::Dark).url, DARK_TILES);
    }

    #[test]
    fn test_scene_marks_only_selected_event() {
        let events = vec![
            event("a", "Tokyo", 4.0, 35.6, 139.7),
            event("b", "Tokyo Bay", 6.8, 35.4, 139.8),
        ];
        let scene = build_scene(&events, Some("b"), Theme::Dark, None);

        assert_eq!(scene.markers.len(), 2);
        assert!(!scene.markers[0].selected);
        assert!(scene.markers[1].selected);
        assert!(scene.markers[1].style.pulse);
        assert_eq!(scene.tiles.url, DARK_TILES);
        assert!(scene.risk.is_none());
    }

    #[test]
    fn test_orange_overlay_for_japan() {
        let japan = country("Japan", "orange", 36.0, 138.0);
        let scene = build_scene(&[], None, Theme::Light, Some(&japan));
        let overlay = scene.risk.expect("overlay");

        assert_eq!(overlay.risk, RiskLevel::Medium);
        for zone in [overlay.inner, overlay.outer] {
            assert!((zone.lat - 36.0).abs() < f64::EPSILON);
            assert!((zone.lon - 138.0).abs() < f64::EPSILON);
            assert_eq!(zone.color, "#f97316");
        }
        assert!(overlay.outer.radius_m > overlay.inner.radius_m);
        assert!(overlay.popup.contains("Japan"));
    }

    #[test]
    fn test_no_overlay_for_invalid_center() {
        let bad = country("Nowhere", "red", f64::NAN, 10.0);
        assert!(RiskOverlay::from_prediction(&bad).is_none());
    }

    #[test]
    fn test_popup_escapes_place() {
        let e = event("x", "<b>Tokyo</b>", 4.0, 0.0, 0.0);
        let marker = Marker::from_event(&e, false);
        assert!(marker.popup.contains("&lt;b&gt;Tokyo&lt;/b&gt;"));
    }
}
