//! Viewport commands and the map handle that carries them.
//!
//! Components that move the map get a `MapHandle` injected; the map side
//! subscribes and animates to each command it receives. A newer command
//! supersedes whatever transition is in flight; nothing is queued.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

/// Zoom used when flying to a selected event.
pub const EVENT_ZOOM: u8 = 10;

/// Zoom used when flying to a country forecast center.
pub const COUNTRY_ZOOM: u8 = 7;

/// Fly-to animation duration in seconds.
pub const FLY_DURATION_SECS: f64 = 1.5;

/// Initial map center (lat, lon) and zoom.
pub const INITIAL_CENTER: (f64, f64) = (30.0, 100.0);
pub const INITIAL_ZOOM: u8 = 4;

/// Slots for subscribers that fall behind; stale commands are dropped.
const CHANNEL_CAPACITY: usize = 16;

/// Instruction to animate the map to a new center and zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewportCommand {
    pub lat: f64,
    pub lon: f64,
    pub zoom: u8,
    pub duration_secs: f64,
}

impl ViewportCommand {
    #[must_use]
    pub const fn fly_to(lat: f64, lon: f64, zoom: u8) -> Self {
        Self {
            lat,
            lon,
            zoom,
            duration_secs: FLY_DURATION_SECS,
        }
    }
}

/// Sending side of the map viewport.
#[derive(Debug, Clone)]
pub struct MapHandle {
    tx: broadcast::Sender<ViewportCommand>,
}

impl MapHandle {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Issue a fly-to command. Having no map attached is not an error.
    pub fn fly_to(&self, lat: f64, lon: f64, zoom: u8) {
        let command = ViewportCommand::fly_to(lat, lon, zoom);
        let receivers = self.tx.send(command).unwrap_or(0);
        debug!(lat, lon, zoom, receivers, "viewport command issued");
    }

    /// Attach a map (or any observer) to the command stream.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ViewportCommand> {
        self.tx.subscribe()
    }
}

impl Default for MapHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Drain every pending command and keep only the newest.
pub fn latest(rx: &mut broadcast::Receiver<ViewportCommand>) -> Option<ViewportCommand> {
    let mut last = None;
    loop {
        match rx.try_recv() {
            Ok(command) => last = Some(command),
            Err(broadcast::error::TryRecvError::Lagged(_)) => {}
            Err(_) => return last,
        }
    }
}
