//! Structured (JSON) record form of an enduro.
//!
//! ```json
//! {
//!   "version": "2",
//!   "title": "Pine Hill",
//!   "routeSheet": {
//!     "keyTime": 32400,
//!     "actions": [
//!       { "type": "speedChange", "distance": 0, "speed": 20 },
//!       { "type": "reset", "distance": 7.96, "toDistance": 9.9 }
//!     ],
//!     "options": { "useSecretMinSpeed": false, "secretMinSpeed": 0 }
//!   }
//! }
//! ```
//!
//! Distances, including `toDistance`, are in whole units. The `type` tags
//! are stored in saved enduros and never change. Records without a
//! `version` are version 1 and are migrated on load.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::action::{Action, ActionKind, ActionType};
use crate::config::{DEFAULT_KEY_TIME, RouteSheetOptions};
use crate::enduro::Enduro;
use crate::migration::{self, MigrationError};
use crate::route_sheet::{RouteSheet, RouteSheetError};
use crate::units::Seconds;

/// Current record format version.
pub const FORMAT_VERSION: u32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("invalid record: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported record version '{0}' (this build supports up to {FORMAT_VERSION})")]
    UnsupportedVersion(String),
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error("the first action must be a speed change, found {0}")]
    InvalidFirstAction(ActionType),
    #[error(transparent)]
    RouteSheet(#[from] RouteSheetError),
}

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnduroRecord {
    pub version: String,
    #[serde(default)]
    pub title: String,
    pub route_sheet: RouteSheetRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSheetRecord {
    #[serde(default = "default_key_time")]
    pub key_time: Seconds,
    #[serde(default)]
    pub actions: Vec<ActionRecord>,
    #[serde(default)]
    pub options: OptionsRecord,
}

fn default_key_time() -> Seconds {
    DEFAULT_KEY_TIME
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptionsRecord {
    pub use_secret_min_speed: bool,
    pub secret_min_speed: u32,
}

impl From<RouteSheetOptions> for OptionsRecord {
    fn from(options: RouteSheetOptions) -> Self {
        Self {
            use_secret_min_speed: options.use_secret_min_speed,
            secret_min_speed: options.secret_min_speed,
        }
    }
}

impl From<OptionsRecord> for RouteSheetOptions {
    fn from(record: OptionsRecord) -> Self {
        Self {
            use_secret_min_speed: record.use_secret_min_speed,
            secret_min_speed: record.secret_min_speed,
        }
    }
}

/// One persisted action, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ActionRecord {
    SpeedChange {
        distance: f64,
        speed: f64,
    },
    Reset {
        distance: f64,
        #[serde(rename = "toDistance")]
        to_distance: f64,
    },
    ResetToZero {
        distance: f64,
    },
    FreeTime {
        distance: f64,
        minutes: f64,
    },
    FreeZone {
        distance: f64,
        #[serde(rename = "toDistance")]
        to_distance: f64,
    },
    GasStop {
        distance: f64,
    },
    Known {
        distance: f64,
    },
    Note {
        distance: f64,
        #[serde(default)]
        note: String,
    },
    Start {
        distance: f64,
    },
    End {
        distance: f64,
    },
}

impl ActionRecord {
    pub fn action_type(&self) -> ActionType {
        match self {
            ActionRecord::SpeedChange { .. } => ActionType::SpeedChange,
            ActionRecord::Reset { .. } => ActionType::Reset,
            ActionRecord::ResetToZero { .. } => ActionType::ResetToZero,
            ActionRecord::FreeTime { .. } => ActionType::FreeTime,
            ActionRecord::FreeZone { .. } => ActionType::FreeZone,
            ActionRecord::GasStop { .. } => ActionType::GasStop,
            ActionRecord::Known { .. } => ActionType::Known,
            ActionRecord::Note { .. } => ActionType::Note,
            ActionRecord::Start { .. } => ActionType::Start,
            ActionRecord::End { .. } => ActionType::End,
        }
    }

    /// Start distance in whole units.
    pub fn distance(&self) -> f64 {
        match *self {
            ActionRecord::SpeedChange { distance, .. }
            | ActionRecord::Reset { distance, .. }
            | ActionRecord::ResetToZero { distance }
            | ActionRecord::FreeTime { distance, .. }
            | ActionRecord::FreeZone { distance, .. }
            | ActionRecord::GasStop { distance }
            | ActionRecord::Known { distance }
            | ActionRecord::Note { distance, .. }
            | ActionRecord::Start { distance }
            | ActionRecord::End { distance } => distance,
        }
    }

    pub fn to_action(&self) -> Action {
        match self {
            ActionRecord::SpeedChange { distance, speed } => Action::speed_change(*distance, *speed),
            ActionRecord::Reset {
                distance,
                to_distance,
            } => Action::reset(*distance, *to_distance),
            ActionRecord::ResetToZero { distance } => Action::reset_to_zero(*distance),
            ActionRecord::FreeTime { distance, minutes } => Action::free_time(*distance, *minutes),
            ActionRecord::FreeZone {
                distance,
                to_distance,
            } => Action::free_zone(*distance, *to_distance),
            ActionRecord::GasStop { distance } => Action::gas_stop(*distance),
            ActionRecord::Known { distance } => Action::known(*distance),
            ActionRecord::Note { distance, note } => Action::note(*distance, note.as_str()),
            ActionRecord::Start { distance } => Action::start(*distance),
            ActionRecord::End { distance } => Action::end(*distance),
        }
    }
}

impl From<&Action> for ActionRecord {
    fn from(action: &Action) -> Self {
        let distance = action.distance();
        let to_distance = action.to_distance().units();
        match action.kind() {
            ActionKind::SpeedChange { speed } => ActionRecord::SpeedChange {
                distance,
                speed: f64::from(*speed),
            },
            ActionKind::Reset => ActionRecord::Reset {
                distance,
                to_distance,
            },
            ActionKind::ResetToZero => ActionRecord::ResetToZero { distance },
            ActionKind::FreeTime { seconds } => ActionRecord::FreeTime {
                distance,
                minutes: (*seconds / 60) as f64,
            },
            ActionKind::FreeZone => ActionRecord::FreeZone {
                distance,
                to_distance,
            },
            ActionKind::GasStop => ActionRecord::GasStop { distance },
            ActionKind::Known => ActionRecord::Known { distance },
            ActionKind::Note { text } => ActionRecord::Note {
                distance,
                note: text.clone(),
            },
            ActionKind::Start => ActionRecord::Start { distance },
            ActionKind::End => ActionRecord::End { distance },
        }
    }
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

impl EnduroRecord {
    pub fn from_enduro(enduro: &Enduro) -> Self {
        let sheet = enduro.route_sheet();
        Self {
            version: FORMAT_VERSION.to_string(),
            title: enduro.title().to_string(),
            route_sheet: RouteSheetRecord {
                key_time: sheet.key_time(),
                actions: sheet.actions().map(ActionRecord::from).collect(),
                options: sheet.options().into(),
            },
        }
    }

    /// Builds a recalculated enduro. The first action, which must be a speed
    /// change, becomes the initial speed change.
    pub fn to_enduro(&self) -> Result<Enduro, RecordError> {
        let record = &self.route_sheet;
        let mut sheet = RouteSheet::default();
        sheet.set_key_time(record.key_time);
        sheet.set_options(record.options.into());

        let mut actions = record.actions.iter();
        if let Some(first) = actions.next() {
            match first {
                ActionRecord::SpeedChange { speed, .. } => sheet.set_seed_speed(*speed),
                other => return Err(RecordError::InvalidFirstAction(other.action_type())),
            }
        }
        for action in actions {
            sheet.append_action(action.to_action())?;
        }
        sheet.clear_event_log();
        Ok(Enduro::with_title(self.title.clone(), sheet))
    }

    /// Parses a record of any supported version, migrating it to the
    /// current one.
    pub fn from_json_str(text: &str) -> Result<Self, RecordError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        let version = record_version(&value)?;
        if version > FORMAT_VERSION {
            return Err(RecordError::UnsupportedVersion(version.to_string()));
        }
        let value = if version < FORMAT_VERSION {
            debug!(from = version, to = FORMAT_VERSION, "migrating enduro record");
            migration::upgrade(value, version, FORMAT_VERSION)?
        } else {
            value
        };
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json_string(&self) -> Result<String, RecordError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Reads `version` as a string or number; absent means version 1.
fn record_version(value: &Value) -> Result<u32, RecordError> {
    match value.get("version") {
        None | Some(Value::Null) => Ok(1),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| RecordError::UnsupportedVersion(s.clone())),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| RecordError::UnsupportedVersion(n.to_string())),
        Some(other) => Err(RecordError::UnsupportedVersion(other.to_string())),
    }
}

/// Serializes an enduro to pretty-printed JSON.
pub fn to_json(enduro: &Enduro) -> Result<String, RecordError> {
    EnduroRecord::from_enduro(enduro).to_json_string()
}

/// Parses and builds an enduro from JSON of any supported version.
pub fn from_json(text: &str) -> Result<Enduro, RecordError> {
    EnduroRecord::from_json_str(text)?.to_enduro()
}

// ===========================================================================
// Tests
// ===========================================================================
