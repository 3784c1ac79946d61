//! Engine configuration, loadable from TOML.
//!
//! ```toml
//! initial_speed = 24
//! key_time = "9:30"
//! event_log_capacity = 128
//!
//! [options]
//! use_secret_min_speed = true
//! secret_min_speed = 6
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::action::DEFAULT_SPEED;
use crate::route_sheet::RouteSheet;
use crate::units::{Seconds, key_time_no_seconds, parse_key_time};

/// Default key time, 8:00.
pub const DEFAULT_KEY_TIME: Seconds = 8 * 60 * 60;

/// Default capacity of a route sheet's event log.
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },
    #[error("invalid key time '{0}', expected H:MM")]
    KeyTime(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Per route sheet chart options. Persisted with the route sheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteSheetOptions {
    /// Drop chart possibles at or below `secret_min_speed`.
    pub use_secret_min_speed: bool,
    pub secret_min_speed: u32,
}

impl RouteSheetOptions {
    /// Speed at or below which possibles are pruned from charts; 0 when the
    /// rule is off.
    pub fn secret_speed_threshold(&self) -> u32 {
        if self.use_secret_min_speed {
            self.secret_min_speed
        } else {
            0
        }
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Defaults applied to new route sheets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub initial_speed: u32,
    /// Seconds since midnight; written as `"H:MM"`.
    #[serde(
        serialize_with = "serialize_key_time",
        deserialize_with = "deserialize_key_time"
    )]
    pub key_time: Seconds,
    pub event_log_capacity: usize,
    pub options: RouteSheetOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_speed: DEFAULT_SPEED,
            key_time: DEFAULT_KEY_TIME,
            event_log_capacity: DEFAULT_EVENT_LOG_CAPACITY,
            options: RouteSheetOptions::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Self::parse(text, Path::new("<string>"))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, path)
    }

    fn parse(text: &str, file: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            file: file.to_path_buf(),
            detail: e.to_string(),
        })
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    /// A new route sheet holding only the initial speed change.
    pub fn route_sheet(&self) -> RouteSheet {
        let mut sheet = RouteSheet::with_event_log_capacity(self.initial_speed, self.event_log_capacity);
        sheet.set_key_time(self.key_time);
        sheet.set_options(self.options);
        sheet.clear_event_log();
        sheet
    }
}

fn serialize_key_time<S: Serializer>(key_time: &Seconds, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&key_time_no_seconds(*key_time, false))
}

fn deserialize_key_time<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Seconds, D::Error> {
    let text = String::deserialize(deserializer)?;
    parse_key_time(&text).ok_or_else(|| serde::de::Error::custom(ConfigError::KeyTime(text)))
}
