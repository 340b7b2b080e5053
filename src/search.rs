//! Place search and event selection.

use tracing::debug;

use crate::models::Feature;
use crate::viewport::{EVENT_ZOOM, MapHandle};

/// Maximum number of suggestions shown for a query.
pub const MAX_SUGGESTIONS: usize = 5;

/// Events whose place label contains `query`, ignoring case.
///
/// Feed order is preserved and at most [`MAX_SUGGESTIONS`] are returned.
/// A blank query matches nothing.
#[must_use]
pub fn filter_events<'a>(events: &'a [Feature], query: &str) -> Vec<&'a Feature> {
    if query.trim().is_empty() {
        return Vec::new();
    }
    let needle = query.to_lowercase();
    events
        .iter()
        .filter(|e| e.place().to_lowercase().contains(&needle))
        .take(MAX_SUGGESTIONS)
        .collect()
}

/// Search box state: query text, open/closed suggestion list, and the
/// selected event.
#[derive(Debug)]
pub struct Search {
    query: String,
    open: bool,
    selection: Option<Feature>,
    map: MapHandle,
}

impl Search {
    #[must_use]
    pub fn new(map: MapHandle) -> Self {
        Self {
            query: String::new(),
            open: false,
            selection: None,
            map,
        }
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn selection(&self) -> Option<&Feature> {
        self.selection.as_ref()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Replace the query text. Emptying it clears the search entirely.
    pub fn set_query(&mut self, query: &str) {
        if query.is_empty() {
            self.clear();
            return;
        }
        self.query = query.to_string();
        self.open = true;
    }

    /// Matches for the current query, regardless of whether the list is open.
    #[must_use]
    pub fn suggestions<'a>(&self, events: &'a [Feature]) -> Vec<&'a Feature> {
        filter_events(events, &self.query)
    }

    /// Matches to display: empty while the list is closed.
    #[must_use]
    pub fn visible_suggestions<'a>(&self, events: &'a [Feature]) -> Vec<&'a Feature> {
        if self.is_open() {
            self.suggestions(events)
        } else {
            Vec::new()
        }
    }

    /// Select `event`: the query becomes its place label, the list closes
    /// and the map flies to it.
    pub fn select(&mut self, event: &Feature) {
        debug!(id = %event.id, "event selected");
        self.query = event.place().to_string();
        self.open = false;
        self.map
            .fly_to(event.latitude(), event.longitude(), EVENT_ZOOM);
        self.selection = Some(event.clone());
    }

    /// Select the event with `id` from `events`, if present.
    pub fn select_by_id<'a>(&mut self, events: &'a [Feature], id: &str) -> Option<&'a Feature> {
        let event = events.iter().find(|e| e.id == id)?;
        self.select(event);
        Some(event)
    }

    /// Reset query, selection and suggestion list.
    pub fn clear(&mut self) {
        self.query.clear();
        self.selection = None;
        self.open = false;
    }
}
