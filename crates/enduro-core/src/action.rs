//! Route sheet actions: one entry of the schedule a rider follows.
//!
//! Every action has a canonical start distance plus, for some types, one
//! parameter (speed, reset target, free minutes, note text). Everything else
//! on an [`Action`] (lap, end distance, times, error) is derived by
//! [`RouteSheet::recalc`](crate::route_sheet::RouteSheet::recalc) and is
//! only meaningful after it runs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::route_sheet::RouteSheetError;
use crate::units::{Distance, Seconds, round_half_up};
use crate::validation::ActionError;

/// Speed used when none (or an invalid one) is given.
pub const DEFAULT_SPEED: u32 = 18;

/// Free time used when none (or an invalid amount) is given.
pub const DEFAULT_FREE_MINUTES: u32 = 5;

/// Longest free time a single action can hold: one day.
pub const MAX_FREE_MINUTES: u32 = 24 * 60;

// ---------------------------------------------------------------------------
// ActionType
// ---------------------------------------------------------------------------

/// Persisted names of each action type. The serialized tags are stored in
/// saved enduros and must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionType {
    SpeedChange,
    Reset,
    ResetToZero,
    FreeTime,
    FreeZone,
    GasStop,
    Known,
    Note,
    Start,
    End,
}

impl ActionType {
    pub const ALL: [ActionType; 10] = [
        ActionType::SpeedChange,
        ActionType::Reset,
        ActionType::ResetToZero,
        ActionType::FreeTime,
        ActionType::FreeZone,
        ActionType::GasStop,
        ActionType::Known,
        ActionType::Note,
        ActionType::Start,
        ActionType::End,
    ];

    /// The persisted tag, e.g. `"speedChange"`.
    pub fn tag(self) -> &'static str {
        match self {
            ActionType::SpeedChange => "speedChange",
            ActionType::Reset => "reset",
            ActionType::ResetToZero => "resetToZero",
            ActionType::FreeTime => "freeTime",
            ActionType::FreeZone => "freeZone",
            ActionType::GasStop => "gasStop",
            ActionType::Known => "known",
            ActionType::Note => "note",
            ActionType::Start => "start",
            ActionType::End => "end",
        }
    }

    /// Human readable name used in validation messages.
    pub fn label(self) -> &'static str {
        match self {
            ActionType::SpeedChange => "Speed change",
            ActionType::Reset => "Reset",
            ActionType::ResetToZero => "Reset to 0",
            ActionType::FreeTime => "Free Time",
            ActionType::FreeZone => "Free Zone",
            ActionType::GasStop => "Gas Stop",
            ActionType::Known => "Known",
            ActionType::Note => "Note",
            ActionType::Start => "Start",
            ActionType::End => "End",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Error returned when parsing an unknown action tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action type: {0}")]
pub struct UnknownActionType(pub String);

impl FromStr for ActionType {
    type Err = UnknownActionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionType::ALL
            .into_iter()
            .find(|t| t.tag() == s)
            .ok_or_else(|| UnknownActionType(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// ActionKind
// ---------------------------------------------------------------------------

/// Variant specific state of an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    /// Sets the pace until the next speed change.
    SpeedChange { speed: u32 },
    /// Rest stop; the odometer is reset forward to the action's `to`.
    Reset,
    /// Ends a lap; the following distances restart at zero.
    ResetToZero,
    /// Stationary time injected at a point.
    FreeTime { seconds: Seconds },
    /// Distance range with no pacing constraint, up to the action's `to`.
    FreeZone,
    GasStop,
    Known,
    Note { text: String },
    Start,
    End,
}

impl ActionKind {
    pub fn action_type(&self) -> ActionType {
        match self {
            ActionKind::SpeedChange { .. } => ActionType::SpeedChange,
            ActionKind::Reset => ActionType::Reset,
            ActionKind::ResetToZero => ActionType::ResetToZero,
            ActionKind::FreeTime { .. } => ActionType::FreeTime,
            ActionKind::FreeZone => ActionType::FreeZone,
            ActionKind::GasStop => ActionType::GasStop,
            ActionKind::Known => ActionType::Known,
            ActionKind::Note { .. } => ActionType::Note,
            ActionKind::Start => ActionType::Start,
            ActionKind::End => ActionType::End,
        }
    }

    /// Reset and FreeZone carry a `to` distance.
    fn has_range(&self) -> bool {
        matches!(self, ActionKind::Reset | ActionKind::FreeZone)
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// One route sheet entry with its canonical and computed fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    kind: ActionKind,
    start_distance: Distance,

    // -- computed by recalc --
    pub(crate) lap: usize,
    pub(crate) to_distance: Distance,
    pub(crate) end_distance: Distance,
    pub(crate) distance_to_go: Distance,
    pub(crate) start_time: Seconds,
    pub(crate) end_time: Seconds,
    pub(crate) error: Option<ActionError>,
}

impl Action {
    fn base(kind: ActionKind, distance: f64) -> Self {
        let start = Distance::from_units(distance);
        Self {
            kind,
            start_distance: start,
            lap: 0,
            to_distance: start,
            end_distance: start,
            distance_to_go: Distance::ZERO,
            start_time: 0,
            end_time: 0,
            error: None,
        }
    }

    /// A speed change. Speeds below 1 fall back to [`DEFAULT_SPEED`].
    pub fn speed_change(distance: f64, speed: f64) -> Self {
        let mut action = Self::base(ActionKind::SpeedChange { speed: 0 }, distance);
        action.apply_speed(speed);
        action
    }

    /// A reset forward to `to`. Targets before `distance` are clamped.
    pub fn reset(distance: f64, to: f64) -> Self {
        let mut action = Self::base(ActionKind::Reset, distance);
        action.apply_to(to);
        action
    }

    /// A free zone up to `to`. Targets before `distance` are clamped.
    pub fn free_zone(distance: f64, to: f64) -> Self {
        let mut action = Self::base(ActionKind::FreeZone, distance);
        action.apply_to(to);
        action
    }

    /// Free time in whole minutes. Less than a minute falls back to
    /// [`DEFAULT_FREE_MINUTES`].
    pub fn free_time(distance: f64, minutes: f64) -> Self {
        let mut action = Self::base(ActionKind::FreeTime { seconds: 0 }, distance);
        action.apply_free_minutes(minutes);
        action
    }

    pub fn note(distance: f64, text: impl Into<String>) -> Self {
        Self::base(ActionKind::Note { text: text.into() }, distance)
    }

    pub fn reset_to_zero(distance: f64) -> Self {
        Self::base(ActionKind::ResetToZero, distance)
    }

    pub fn gas_stop(distance: f64) -> Self {
        Self::base(ActionKind::GasStop, distance)
    }

    pub fn known(distance: f64) -> Self {
        Self::base(ActionKind::Known, distance)
    }

    pub fn start(distance: f64) -> Self {
        Self::base(ActionKind::Start, distance)
    }

    pub fn end(distance: f64) -> Self {
        Self::base(ActionKind::End, distance)
    }

    /// Creates an action of `action_type` at `distance` with default
    /// parameters. Used when an editor changes an entry's type.
    pub fn from_type(action_type: ActionType, distance: f64) -> Self {
        match action_type {
            ActionType::SpeedChange => Self::speed_change(distance, f64::from(DEFAULT_SPEED)),
            ActionType::Reset => Self::reset(distance, distance),
            ActionType::ResetToZero => Self::reset_to_zero(distance),
            ActionType::FreeTime => {
                Self::free_time(distance, f64::from(DEFAULT_FREE_MINUTES))
            }
            ActionType::FreeZone => Self::free_zone(distance, distance),
            ActionType::GasStop => Self::gas_stop(distance),
            ActionType::Known => Self::known(distance),
            ActionType::Note => Self::note(distance, ""),
            ActionType::Start => Self::start(distance),
            ActionType::End => Self::end(distance),
        }
    }

    // -----------------------------------------------------------------------
    // Canonical fields
    // -----------------------------------------------------------------------

    pub fn kind(&self) -> &ActionKind {
        &self.kind
    }

    pub fn action_type(&self) -> ActionType {
        self.kind.action_type()
    }

    pub fn is_speed_change(&self) -> bool {
        matches!(self.kind, ActionKind::SpeedChange { .. })
    }

    pub fn is_reset_to_zero(&self) -> bool {
        matches!(self.kind, ActionKind::ResetToZero)
    }

    pub fn start_distance(&self) -> Distance {
        self.start_distance
    }

    /// Start distance in whole units.
    pub fn distance(&self) -> f64 {
        self.start_distance.units()
    }

    /// Moves the action. Does not recalculate the route sheet; callers must
    /// call `recalc` afterwards.
    pub fn set_distance(&mut self, distance: f64) {
        self.set_start_distance(Distance::from_units(distance));
    }

    /// Same as [`set_distance`](Self::set_distance) with an exact distance.
    pub fn set_start_distance(&mut self, distance: Distance) {
        self.start_distance = distance;
        if self.kind.has_range() {
            self.distance_to_go = self.to_distance - self.start_distance;
        }
    }

    pub fn speed(&self) -> Option<u32> {
        match self.kind {
            ActionKind::SpeedChange { speed } => Some(speed),
            _ => None,
        }
    }

    /// Sets a speed change's speed. Invalid speeds keep the previous one.
    pub fn set_speed(&mut self, speed: f64) -> Result<(), RouteSheetError> {
        if !self.is_speed_change() {
            return Err(self.wrong_variant("speed"));
        }
        self.apply_speed(speed);
        Ok(())
    }

    fn apply_speed(&mut self, speed: f64) {
        if let ActionKind::SpeedChange { speed: current } = &mut self.kind {
            let value = if speed >= 1.0 {
                round_half_up(speed).min(f64::from(u32::MAX)) as u32
            } else if *current > 0 {
                *current
            } else {
                DEFAULT_SPEED
            };
            *current = value;
        }
    }

    /// Reset/free zone target in whole units, rounded to hundredths.
    /// Whether this is a reset or free zone.
    pub fn has_range(&self) -> bool {
        self.kind.has_range()
    }

    pub fn to(&self) -> Option<f64> {
        self.kind.has_range().then(|| self.to_distance.units())
    }

    /// Sets a reset or free zone target. A target before the start falls
    /// back to the previous target.
    pub fn set_to(&mut self, to: f64) -> Result<(), RouteSheetError> {
        if !self.kind.has_range() {
            return Err(self.wrong_variant("to"));
        }
        self.apply_to(to);
        Ok(())
    }

    fn apply_to(&mut self, to: f64) {
        let mut target = Distance::from_units(to);
        if !(to >= self.distance()) {
            target = if self.to_distance.is_zero() {
                self.start_distance
            } else {
                self.to_distance
            };
        }
        self.to_distance = target;
        self.end_distance = target;
        self.distance_to_go = self.to_distance - self.start_distance;
    }

    /// Free time in whole minutes.
    pub fn free_minutes(&self) -> Option<i64> {
        match self.kind {
            ActionKind::FreeTime { seconds } => Some(seconds / 60),
            _ => None,
        }
    }

    /// Free time in seconds; zero for every other type.
    pub fn free_seconds(&self) -> Seconds {
        match self.kind {
            ActionKind::FreeTime { seconds } => seconds,
            _ => 0,
        }
    }

    /// Sets free minutes. Less than one minute keeps the previous amount;
    /// more than [`MAX_FREE_MINUTES`] is clamped.
    pub fn set_free_minutes(&mut self, minutes: f64) -> Result<(), RouteSheetError> {
        if !matches!(self.kind, ActionKind::FreeTime { .. }) {
            return Err(self.wrong_variant("freeTime"));
        }
        self.apply_free_minutes(minutes);
        Ok(())
    }

    fn apply_free_minutes(&mut self, minutes: f64) {
        if let ActionKind::FreeTime { seconds } = &mut self.kind {
            let whole = if minutes >= 1.0 {
                round_half_up(minutes.min(f64::from(MAX_FREE_MINUTES))) as i64
            } else if *seconds > 0 {
                *seconds / 60
            } else {
                i64::from(DEFAULT_FREE_MINUTES)
            };
            *seconds = whole * 60;
        }
    }

    pub fn note_text(&self) -> Option<&str> {
        match &self.kind {
            ActionKind::Note { text } => Some(text),
            _ => None,
        }
    }

    /// Sets a note's text; `None` clears it to an empty string.
    pub fn set_note(&mut self, text: Option<&str>) -> Result<(), RouteSheetError> {
        match &mut self.kind {
            ActionKind::Note { text: current } => {
                *current = text.unwrap_or_default().to_string();
                Ok(())
            }
            _ => Err(self.wrong_variant("note")),
        }
    }

    fn wrong_variant(&self, field: &'static str) -> RouteSheetError {
        RouteSheetError::WrongVariant {
            field,
            action: self.action_type(),
        }
    }

    // -----------------------------------------------------------------------
    // Computed fields
    // -----------------------------------------------------------------------

    /// Zero-based lap, counted in resets to zero before this action.
    pub fn lap(&self) -> usize {
        self.lap
    }

    pub fn to_distance(&self) -> Distance {
        self.to_distance
    }

    pub fn end_distance(&self) -> Distance {
        self.end_distance
    }

    pub fn distance_to_go(&self) -> Distance {
        self.distance_to_go
    }

    /// Seconds after the key time at which the action starts.
    pub fn start_time(&self) -> Seconds {
        self.start_time
    }

    pub fn end_time(&self) -> Seconds {
        self.end_time
    }

    /// Validation error from the last recalculation.
    pub fn error(&self) -> Option<&ActionError> {
        self.error.as_ref()
    }
}
