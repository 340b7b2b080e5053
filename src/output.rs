//! Terminal output for the one-shot commands.
//!
//! Supports human-readable (with colors) and JSON formats.

use std::io::{self, Write};

use serde::Serialize;

use crate::models::{CountryPrediction, Feature, NewsItem, OutputEvent, RegionPrediction, RiskLevel};

// ANSI color codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

// Magnitude bands, matching the map marker colors
const RED: &str = "\x1b[91m"; // mag > 6.5
const ORANGE: &str = "\x1b[38;5;208m"; // mag > 5.5
const YELLOW: &str = "\x1b[93m"; // mag > 4.5
const BLUE: &str = "\x1b[94m";

// Risk badges
const RISK_RED: &str = "\x1b[41;97m";
const RISK_ORANGE: &str = "\x1b[48;5;208;30m";
const RISK_YELLOW: &str = "\x1b[43;30m";

const ICON_QUAKE: &str = "🌍";
const ICON_PIN: &str = "📍";
const ICON_TARGET: &str = "🎯";
const ICON_ALERT: &str = "⚠️";

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable terminal output (default)
    #[default]
    Human,
    /// Pretty-printed JSON
    Json,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            _ => Err(format!("unknown format: {s} (expected: human, json)")),
        }
    }
}

/// Get the color code for a magnitude value.
fn magnitude_color(mag: Option<f64>) -> &'static str {
    match mag {
        Some(m) if m > 6.5 => RED,
        Some(m) if m > 5.5 => ORANGE,
        Some(m) if m > 4.5 => YELLOW,
        _ => BLUE,
    }
}

fn risk_badge(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::High => RISK_RED,
        RiskLevel::Medium => RISK_ORANGE,
        RiskLevel::Low => RISK_YELLOW,
    }
}

fn write_json_value<W: Write, T: Serialize + ?Sized>(writer: &mut W, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

/// Write events in human-readable format.
fn write_events_human<W: Write>(writer: &mut W, events: &[&Feature]) -> io::Result<()> {
    for event in events {
        let time = event
            .time()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".into());

        let mag = event.properties.mag;
        let mag_str = mag
            .map(|m| format!("{m:.1}"))
            .unwrap_or_else(|| "?".into());
        let color = magnitude_color(mag);
        let depth = event.depth_km();
        let place = event
            .properties
            .place
            .as_deref()
            .unwrap_or("Unknown location");

        writeln!(
            writer,
            "{ICON_QUAKE} {color}{BOLD}M{mag_str}{RESET} │ \
             {DIM}{depth:>5.0}km{RESET} │ \
             {time} UTC │ \
             {place} {DIM}({lat:.2}, {lon:.2}){RESET}",
            lat = event.latitude(),
            lon = event.longitude(),
        )?;
    }
    Ok(())
}

/// Write events in the specified format.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_events<W: Write>(writer: &mut W, events: &[&Feature], format: Format) -> io::Result<()> {
    match format {
        Format::Human => write_events_human(writer, events),
        Format::Json => {
            let output: Vec<OutputEvent> = events.iter().map(|e| OutputEvent::from(*e)).collect();
            write_json_value(writer, &output)
        }
    }
}

/// Write a region-wide forecast.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_region<W: Write>(writer: &mut W, p: &RegionPrediction, format: Format) -> io::Result<()> {
    if format == Format::Json {
        return write_json_value(writer, p);
    }

    writeln!(writer, "{BOLD}{ORANGE}{}{RESET}", p.prediction)?;
    if let Some(area) = &p.predicted_area {
        writeln!(writer, "{ICON_PIN} সম্ভাব্য অঞ্চল: {area}")?;
        if let Some(activity) = &p.area_activity {
            writeln!(writer, "   {DIM}{activity}{RESET}")?;
        }
    }
    if let Some(points) = p.data_points_used {
        writeln!(
            writer,
            "{DIM}সর্বশেষ {points} টি রেকর্ড করা কম্পনের উপর ভিত্তি করে।{RESET}"
        )?;
    }
    if let Some(disclaimer) = &p.disclaimer {
        writeln!(writer, "{ICON_ALERT} {DIM}{disclaimer}{RESET}")?;
    }
    Ok(())
}

/// Write a country forecast.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_country<W: Write>(writer: &mut W, p: &CountryPrediction, format: Format) -> io::Result<()> {
    if format == Format::Json {
        return write_json_value(writer, p);
    }

    let badge = risk_badge(p.risk());
    writeln!(
        writer,
        "{ICON_TARGET} {BOLD}{}{RESET}: {badge} {} {RESET}",
        p.country, p.risk_level
    )?;
    writeln!(writer, "   {}", p.prediction)?;
    writeln!(
        writer,
        "{ICON_PIN} সম্ভাব্য অঞ্চল: {} {DIM}({:.2}, {:.2}){RESET}",
        p.predicted_area, p.center_lat, p.center_lon
    )?;
    writeln!(writer, "   {DIM}{}{RESET}", p.recent_activity)?;
    writeln!(
        writer,
        "   গড় মাত্রা: {BOLD}{:.1}{RESET} │ সর্বোচ্চ মাত্রা: {BOLD}{:.1}{RESET}",
        p.avg_magnitude, p.max_magnitude
    )?;
    writeln!(writer, "{ICON_ALERT} {DIM}{}{RESET}", p.disclaimer)?;
    Ok(())
}

/// Write news headlines.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_news<W: Write>(writer: &mut W, items: &[NewsItem], format: Format) -> io::Result<()> {
    if format == Format::Json {
        return write_json_value(writer, items);
    }

    if items.is_empty() {
        return writeln!(writer, "{DIM}কোন সংবাদ পাওয়া যায়নি।{RESET}");
    }
    for item in items {
        writeln!(writer, "{BOLD}{}{RESET}", item.title)?;
        writeln!(writer, "  {DIM}{} │ {}{RESET}", item.published_label(), item.link)?;
    }
    Ok(())
}
