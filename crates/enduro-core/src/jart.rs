//! JART chart generation.
//!
//! A JART lists every action of a route sheet together with every
//! "possible": each point, at the speed in effect, where a secret checkpoint
//! could sit (a whole tenth reached on a whole minute). Possibles inside
//! exclusion zones (free zones, resets, and buffers around the start, knowns
//! and gas stops) are removed, as are possibles at or below the secret
//! minimum speed when that rule is enabled.
//!
//! The chart is built from an already recalculated route sheet and is never
//! updated in place; regenerate it after any change.

use std::fmt;

use crate::action::{Action, ActionKind, ActionType};
use crate::enduro::Enduro;
use crate::possible::{MinimumPossible, minimum};
use crate::units::{Distance, Seconds, div_round_half_up};

/// Buffer after the first speed change and after a start.
const START_BUFFER: Distance = Distance::from_tenths(30);
/// Buffer on either side of a known control.
const KNOWN_BUFFER: Distance = Distance::from_tenths(30);
/// Buffer before a gas stop; the buffer after it is [`START_BUFFER`].
const GAS_STOP_LEAD: Distance = Distance::from_tenths(20);

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Action(ActionType),
    Possible,
}

/// A chart line for an action or a possible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JartEntry {
    pub kind: RowKind,
    pub lap: usize,
    /// Seconds after the key time.
    pub start_time: Seconds,
    /// Minute of the hour shown on the chart.
    pub minute: u32,
    pub distance: Distance,
    /// Speed in effect (the new speed for speed changes).
    pub speed: u32,
    /// Free time, for free time rows.
    pub seconds: Seconds,
    pub free_to: Option<Distance>,
    pub reset_to: Option<Distance>,
    pub note: Option<String>,
}

impl JartEntry {
    pub fn is_possible(&self) -> bool {
        self.kind == RowKind::Possible
    }

    fn possible(lap: usize, speed: u32, distance: Distance, raw_minute: i64) -> Self {
        Self {
            kind: RowKind::Possible,
            lap,
            start_time: raw_minute * 60,
            minute: raw_minute.rem_euclid(60) as u32,
            distance,
            speed,
            seconds: 0,
            free_to: None,
            reset_to: None,
            note: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JartRow {
    Title { title: String },
    Entry(JartEntry),
}

impl JartRow {
    pub fn entry(&self) -> Option<&JartEntry> {
        match self {
            JartRow::Entry(entry) => Some(entry),
            JartRow::Title { .. } => None,
        }
    }

    pub fn is_possible(&self) -> bool {
        self.entry().is_some_and(JartEntry::is_possible)
    }

    /// `"title"`, `"possible"` or the action's persisted tag.
    pub fn tag(&self) -> &'static str {
        match self {
            JartRow::Title { .. } => "title",
            JartRow::Entry(entry) => match entry.kind {
                RowKind::Possible => "possible",
                RowKind::Action(action_type) => action_type.tag(),
            },
        }
    }
}

impl fmt::Display for JartRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JartRow::Title { title } => f.write_str(title),
            JartRow::Entry(e) => {
                let label = match e.kind {
                    RowKind::Possible => "",
                    RowKind::Action(action_type) => action_type.label(),
                };
                write!(f, "{:>2} {:>7} {:>3}  {}", e.minute, e.distance, e.speed, label)?;
                if let Some(to) = e.free_to.or(e.reset_to) {
                    write!(f, " to {to}")?;
                }
                if e.seconds > 0 {
                    write!(f, " {} min", e.seconds / 60)?;
                }
                if let Some(note) = e.note.as_deref().filter(|n| !n.is_empty()) {
                    write!(f, " {note}")?;
                }
                Ok(())
            }
        }
    }
}

/// Lap-scoped distance range in which possibles are suppressed. Both ends
/// are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExclusionZone {
    pub lap: usize,
    pub min: Distance,
    pub max: Distance,
}

impl ExclusionZone {
    pub fn contains(&self, lap: usize, distance: Distance) -> bool {
        self.lap == lap && self.min < distance && distance < self.max
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// A generated chart.
#[derive(Debug, Clone, Default)]
pub struct Jart {
    rows: Vec<JartRow>,
    zones: Vec<ExclusionZone>,
}

impl Jart {
    /// Builds the chart for a recalculated enduro.
    ///
    /// Minutes are shifted by the key time's minute of the hour unless
    /// `use_zero_start_minute` is set, in which case the chart starts at
    /// minute 0.
    pub fn from_enduro(enduro: &Enduro, use_zero_start_minute: bool) -> Self {
        let mut jart = Jart::default();
        jart.generate_rows(enduro);

        let threshold = enduro.route_sheet().options().secret_speed_threshold();
        jart.remove_possibles(threshold);

        if !use_zero_start_minute {
            jart.adjust_minutes(enduro.route_sheet().key_time());
        }
        jart
    }

    pub fn rows(&self) -> &[JartRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<JartRow> {
        self.rows
    }

    pub fn zones(&self) -> &[ExclusionZone] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Pass 1: every action, interleaved with the possibles leading up to
    /// it, plus the exclusion zones.
    fn generate_rows(&mut self, enduro: &Enduro) {
        let sheet = enduro.route_sheet();
        let mut speed = sheet.seed_speed();
        let mut min = minimum(speed);
        let mut next_distance = Distance::ZERO;
        let mut next_minute: i64 = 0;

        self.rows.push(JartRow::Title {
            title: enduro.title().to_string(),
        });

        for (index, action) in sheet.actions().enumerate() {
            let row = self.action_row(action, speed, index);
            let mut possibles =
                possibles_until(action.lap(), speed, min, next_distance, next_minute, row.distance);

            if let Some(last) = possibles.last() {
                next_distance = last.distance + min.distance;
                next_minute = last.start_time / 60 + i64::from(min.minutes);
                if action.is_speed_change() && action.start_distance() == last.distance {
                    possibles.pop();
                }
            }
            self.rows.extend(possibles.into_iter().map(JartRow::Entry));

            let row_minute = div_round_half_up(row.start_time, 60);
            self.rows.push(JartRow::Entry(row));

            match action.kind() {
                ActionKind::SpeedChange { speed: new_speed } => {
                    speed = *new_speed;
                    min = minimum(speed);
                    next_distance = action.start_distance() + min.distance;
                    next_minute = row_minute + i64::from(min.minutes);
                }
                ActionKind::FreeTime { seconds } => {
                    // The possible grid pauses during free time.
                    if next_distance - min.distance >= action.start_distance() {
                        next_distance -= min.distance;
                        next_minute -= i64::from(min.minutes);
                    }
                    next_minute += seconds / 60;
                }
                ActionKind::ResetToZero => next_distance = min.distance,
                _ => {}
            }
        }
    }

    fn action_row(&mut self, action: &Action, speed: u32, index: usize) -> JartEntry {
        let lap = action.lap();
        let start = action.start_distance();
        let mut row = JartEntry {
            kind: RowKind::Action(action.action_type()),
            lap,
            start_time: action.start_time(),
            minute: div_round_half_up(action.start_time(), 60).rem_euclid(60) as u32,
            distance: start,
            speed,
            seconds: 0,
            free_to: None,
            reset_to: None,
            note: None,
        };

        let zone = |min, max| ExclusionZone { lap, min, max };
        match action.kind() {
            ActionKind::SpeedChange { speed } => {
                row.speed = *speed;
                if index == 0 {
                    self.zones.push(zone(Distance::ZERO, START_BUFFER));
                }
            }
            ActionKind::FreeZone => {
                row.free_to = Some(action.end_distance());
                self.zones.push(zone(start, action.end_distance()));
            }
            ActionKind::Reset => {
                row.reset_to = Some(action.end_distance());
                self.zones.push(zone(start, action.end_distance()));
            }
            ActionKind::Start => self.zones.push(zone(start, start + START_BUFFER)),
            ActionKind::Known => self.zones.push(zone(start - KNOWN_BUFFER, start + KNOWN_BUFFER)),
            ActionKind::GasStop => self.zones.push(zone(start - GAS_STOP_LEAD, start + START_BUFFER)),
            ActionKind::FreeTime { seconds } => row.seconds = *seconds,
            ActionKind::Note { text } => row.note = Some(text.clone()),
            ActionKind::ResetToZero | ActionKind::End => {}
        }
        row
    }

    /// Pass 2: drops possibles inside a zone or at or below `secret_min_speed`.
    fn remove_possibles(&mut self, secret_min_speed: u32) {
        let zones = &self.zones;
        self.rows.retain(|row| match row {
            JartRow::Entry(e) if e.is_possible() => {
                e.speed > secret_min_speed && !zones.iter().any(|z| z.contains(e.lap, e.distance))
            }
            _ => true,
        });
    }

    fn adjust_minutes(&mut self, key_time: Seconds) {
        let offset = (key_time / 60).rem_euclid(60) as u32;
        if offset == 0 {
            return;
        }
        for row in &mut self.rows {
            if let JartRow::Entry(e) = row {
                e.minute = (e.minute + offset) % 60;
            }
        }
    }
}

/// Possibles from `from` up to and including `to`, one step apart.
fn possibles_until(
    lap: usize,
    speed: u32,
    min: MinimumPossible,
    from: Distance,
    from_minute: i64,
    to: Distance,
) -> Vec<JartEntry> {
    let mut result = Vec::new();
    let (mut distance, mut raw_minute) = (from, from_minute);
    while distance <= to {
        result.push(JartEntry::possible(lap, speed, distance, raw_minute));
        distance += min.distance;
        raw_minute += i64::from(min.minutes);
    }
    result
}
