//! Shared dashboard state.
//!
//! `LocalStore` is a small persisted key/value file holding values that
//! survive restarts (theme, visitor fallback count). `ThemeStore` and
//! `PredictionStore` are cloneable handles over `tokio::sync::watch`
//! channels: one writer path, any number of readers, whole-value
//! replacement on every update.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::errors::DashboardError;
use crate::models::CountryPrediction;

/// File name of the persisted state inside the state directory.
pub const STATE_FILE: &str = "state.json";

/// Key of the persisted theme flag.
const THEME_KEY: &str = "theme";

/// Persisted key/value store backed by a JSON file.
///
/// Writes go to a temp file and are renamed into place.
#[derive(Debug)]
pub struct LocalStore {
    /// `None` keeps everything in memory.
    path: Option<PathBuf>,
    data: Mutex<BTreeMap<String, serde_json::Value>>,
}

impl LocalStore {
    /// Open (or create) the store at `path`.
    ///
    /// An unreadable or corrupt file is logged and replaced by an empty store
    /// on the next write.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DashboardError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(path = ?path, "ignoring corrupt state file: {}", e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = ?path, keys = data.len(), "opened local store");
        Ok(Self {
            path: Some(path),
            data: Mutex::new(data),
        })
    }

    /// Open the store file inside `dir`.
    ///
    /// # Errors
    ///
    /// See [`LocalStore::open`].
    pub fn in_dir(dir: &Path) -> Result<Self, DashboardError> {
        Self::open(dir.join(STATE_FILE))
    }

    /// A store that never touches the filesystem.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: Mutex::new(BTreeMap::new()),
        }
    }

    /// Read `key`, returning `None` when absent or of the wrong shape.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        data.get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Write `key` and persist the whole store.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the file write fails.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), DashboardError> {
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        data.insert(key.to_string(), serde_json::to_value(value)?);

        let Some(path) = &self.path else {
            return Ok(());
        };
        let raw = serde_json::to_string_pretty(&*data)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// Color scheme of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// The other theme.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl std::str::FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            _ => Err(format!("unknown theme: {s} (expected: light, dark)")),
        }
    }
}

/// Persisted light/dark flag.
#[derive(Debug, Clone)]
pub struct ThemeStore {
    tx: Arc<watch::Sender<Theme>>,
    storage: Arc<LocalStore>,
}

impl ThemeStore {
    /// Load the persisted theme, defaulting to light.
    #[must_use]
    pub fn load(storage: Arc<LocalStore>) -> Self {
        let theme = storage.get::<Theme>(THEME_KEY).unwrap_or_default();
        let (tx, _rx) = watch::channel(theme);
        Self {
            tx: Arc::new(tx),
            storage,
        }
    }

    /// Current theme.
    #[must_use]
    pub fn current(&self) -> Theme {
        *self.tx.borrow()
    }

    /// Replace the theme and persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails; the in-memory value is still
    /// updated.
    pub fn set(&self, theme: Theme) -> Result<(), DashboardError> {
        self.tx.send_replace(theme);
        debug!(theme = theme.as_str(), "theme changed");
        self.storage.set(THEME_KEY, &theme)
    }

    /// Flip between light and dark, returning the new theme.
    ///
    /// # Errors
    ///
    /// See [`ThemeStore::set`].
    pub fn toggle(&self) -> Result<Theme, DashboardError> {
        let next = self.current().toggled();
        self.set(next)?;
        Ok(next)
    }

    /// Watch for theme changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Theme> {
        self.tx.subscribe()
    }
}

/// Holder of the last successful country forecast, read by the map.
#[derive(Debug, Clone)]
pub struct PredictionStore {
    tx: Arc<watch::Sender<Option<CountryPrediction>>>,
}

impl PredictionStore {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Snapshot of the stored forecast.
    #[must_use]
    pub fn get(&self) -> Option<CountryPrediction> {
        self.tx.borrow().clone()
    }

    /// Replace the stored forecast.
    pub fn set(&self, prediction: Option<CountryPrediction>) {
        self.tx.send_replace(prediction);
    }

    /// Watch for forecast changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<CountryPrediction>> {
        self.tx.subscribe()
    }
}

impl Default for PredictionStore {
    fn default() -> Self {
        Self::new()
    }
}
