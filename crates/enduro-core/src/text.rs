//! Plain-text route sheet forms.
//!
//! The `.rs` form is one directive per line: a keyword, a distance and an
//! optional parameter, padded into fixed columns. [`render`] reproduces the
//! padding byte for byte; [`parse`] is lenient and skips anything it does
//! not recognise.
//!
//! ```text
//! # Enduro Route Sheet
//!      title Green Marble 2003
//!    keytime   8:00
//!      speed   0.00  18
//!      reset  23.69  24.05
//!        end 106.20
//! ```
//!
//! [`parse_printout`] reads the full tabular printout of a route sheet
//! (every action with its times and distances) strictly, for comparing
//! computed timings against another tool's.

use tracing::{trace, warn};

use crate::action::{Action, ActionKind, ActionType};
use crate::enduro::Enduro;
use crate::record::{ActionRecord, EnduroRecord, FORMAT_VERSION, OptionsRecord, RouteSheetRecord};
use crate::units::{Distance, Seconds, key_time_no_seconds, parse_key_time};

const HEADER: &str = "# Enduro Route Sheet";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextError {
    #[error("line contains no action name\n{line}")]
    MissingActionName { line: String },
    #[error("unknown action: {name}")]
    UnknownAction { name: String },
    #[error("malformed time '{value}' in line\n{line}")]
    MalformedTime { value: String, line: String },
    #[error("malformed number '{value}' in line\n{line}")]
    MalformedNumber { value: String, line: String },
}

/// Keyword of an action type in the `.rs` form.
pub fn keyword(action_type: ActionType) -> &'static str {
    match action_type {
        ActionType::SpeedChange => "speed",
        ActionType::Reset => "reset",
        ActionType::ResetToZero => "reset_0",
        ActionType::FreeTime => "free_time",
        ActionType::FreeZone => "free_zone",
        ActionType::GasStop => "gas_stop",
        ActionType::Known => "known",
        ActionType::Note => "note",
        ActionType::Start => "start",
        ActionType::End => "end",
    }
}

fn from_keyword(word: &str) -> Option<ActionType> {
    if word == "break" {
        return Some(ActionType::FreeTime);
    }
    ActionType::ALL.into_iter().find(|t| keyword(*t) == word)
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Renders an enduro in the `.rs` form. The output ends with a newline.
pub fn render(enduro: &Enduro) -> String {
    let mut rows: Vec<Vec<String>> = vec![vec![HEADER.to_string()]];

    for (index, title) in enduro.title_lines().enumerate() {
        let name = if index == 0 {
            "title".to_string()
        } else {
            format!("title{}", index + 1)
        };
        rows.push(vec![name, title.to_string()]);
    }

    let sheet = enduro.route_sheet();
    rows.push(vec![
        "keytime".to_string(),
        key_time_no_seconds(sheet.key_time(), false),
    ]);

    for action in sheet.actions() {
        let mut row = vec![
            keyword(action.action_type()).to_string(),
            action.start_distance().to_string(),
        ];
        if let Some(param) = parameter(action) {
            row.push(param);
        }
        rows.push(row);
    }

    let mut lines: Vec<String> = rows
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(column, cell)| match column {
                    0 => format!("{cell:>10}"),
                    1 => format!("{cell:>6}"),
                    _ => format!(" {cell}"),
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();
    lines.push(String::new());
    lines.join("\n")
}

fn parameter(action: &Action) -> Option<String> {
    match action.kind() {
        ActionKind::SpeedChange { speed } => Some(speed.to_string()),
        ActionKind::Reset | ActionKind::FreeZone => Some(action.to_distance().to_string()),
        ActionKind::FreeTime { seconds } => Some((seconds / 60).to_string()),
        ActionKind::Note { text } => Some(text.clone()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Lenient reader
// ---------------------------------------------------------------------------

/// Parses the `.rs` form. Unknown or malformed lines are skipped. The first
/// `speed` line sets the initial speed; its distance is ignored.
pub fn parse(text: &str) -> Enduro {
    let mut enduro = Enduro::default();
    let mut title = String::new();
    let mut first_speed = true;

    for (number, line) in text.lines().enumerate() {
        let columns: Vec<&str> = line.split_whitespace().collect();
        let Some(&word) = columns.first() else {
            continue;
        };

        if is_title_keyword(word) {
            if !title.is_empty() {
                title.push('\n');
            }
            title.push_str(&columns[1..].join(" "));
            continue;
        }
        if word == "keytime" {
            match columns.get(1).and_then(|t| parse_key_time(t)) {
                Some(key_time) => enduro.route_sheet_mut().set_key_time(key_time),
                None => warn!(line = number + 1, "malformed keytime, skipped"),
            }
            continue;
        }

        let Some(action_type) = from_keyword(word) else {
            trace!(line = number + 1, word, "unrecognised line skipped");
            continue;
        };
        let Some(distance) = columns.get(1).and_then(|d| d.parse::<f64>().ok()) else {
            warn!(line = number + 1, word, "missing distance, skipped");
            continue;
        };
        let param = || {
            columns
                .get(2)
                .and_then(|p| p.parse::<f64>().ok())
                .unwrap_or(f64::NAN)
        };

        let sheet = enduro.route_sheet_mut();
        let action = match action_type {
            ActionType::SpeedChange if first_speed => {
                first_speed = false;
                sheet.set_seed_speed(param());
                continue;
            }
            ActionType::SpeedChange => Action::speed_change(distance, param()),
            ActionType::Reset => Action::reset(distance, param()),
            ActionType::FreeZone => Action::free_zone(distance, param()),
            ActionType::FreeTime => Action::free_time(distance, param()),
            ActionType::Note => Action::note(distance, columns[2..].join(" ")),
            other => Action::from_type(other, distance),
        };
        if let Err(error) = sheet.append_action(action) {
            warn!(line = number + 1, %error, "action rejected");
        }
    }

    enduro.set_title(title);
    enduro.route_sheet_mut().clear_event_log();
    enduro
}

fn is_title_keyword(word: &str) -> bool {
    matches!(word, "title" | "title1" | "title2" | "title3")
}

// ---------------------------------------------------------------------------
// Strict printout reader
// ---------------------------------------------------------------------------

/// Timings listed for one action in a printout. Times are seconds after the
/// first row's time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedTiming {
    pub start_time: Seconds,
    pub end_time: Seconds,
    pub end_distance: Distance,
    /// Listed only for speed changes, resets and free zones.
    pub distance_to_go: Option<Distance>,
}

/// A parsed printout: the route sheet it describes and the timings it lists.
#[derive(Debug, Clone, PartialEq)]
pub struct Printout {
    pub record: EnduroRecord,
    pub timings: Vec<ExpectedTiming>,
    /// Sum of reset and free zone lengths.
    pub reset_distance: Distance,
    pub free_time: Seconds,
}

/// Printout action names, in match order.
const PRINTOUT_NAMES: [(&str, ActionType); 11] = [
    ("Speed", ActionType::SpeedChange),
    ("Reset To", ActionType::Reset),
    ("Reset to 0", ActionType::ResetToZero),
    ("Free Time", ActionType::FreeTime),
    ("Free to", ActionType::FreeZone),
    ("Break", ActionType::FreeTime),
    ("Gas Stop", ActionType::GasStop),
    ("Known", ActionType::Known),
    ("Note", ActionType::Note),
    ("Start", ActionType::Start),
    ("End", ActionType::End),
];

/// Parses a route sheet printout.
///
/// Lines up to the first blank line are the title. After that, every line
/// starting with an `HH:MM:SS` time is an action row:
///
/// ```text
/// 08:00:00   0.00 Speed 18   6.00  6.00 08:20:00
/// 08:10:00   3.00 Reset To  4.00   1.00  4.00 08:13:20
/// 08:22:30   7.00 Free Time   5 08:27:30
/// 08:40:00  12.00 End
/// ```
///
/// The first row's time is the key time.
pub fn parse_printout(text: &str) -> Result<Printout, TextError> {
    let mut lines = text.lines().map(str::trim);
    let title: Vec<&str> = lines.by_ref().take_while(|line| !line.is_empty()).collect();

    let mut key_time: Option<Seconds> = None;
    let mut actions = Vec::new();
    let mut timings = Vec::new();
    let mut reset_distance = Distance::ZERO;
    let mut free_time: Seconds = 0;

    for line in lines {
        let columns: Vec<&str> = line.split_whitespace().collect();
        let Some(first) = columns.first() else {
            continue;
        };
        if first.split(':').count() != 3 {
            continue;
        }
        let seconds = clock_seconds(first, line)?;
        let key = *key_time.get_or_insert(seconds);

        let name = *columns.get(2).ok_or_else(|| TextError::MissingActionName {
            line: line.to_string(),
        })?;
        let action_type = PRINTOUT_NAMES
            .iter()
            .find(|(full, _)| full.starts_with(name) && line.contains(full))
            .map(|(_, action_type)| *action_type)
            .ok_or_else(|| TextError::UnknownAction {
                name: name.to_string(),
            })?;

        let number = |index: usize| -> Result<f64, TextError> {
            let value = columns.get(index).copied().unwrap_or_default();
            value.parse::<f64>().map_err(|_| TextError::MalformedNumber {
                value: value.to_string(),
                line: line.to_string(),
            })
        };

        let distance = number(1)?;
        let record = match action_type {
            ActionType::SpeedChange => ActionRecord::SpeedChange {
                distance,
                speed: number(3)?,
            },
            ActionType::Reset | ActionType::FreeZone => {
                let to_distance = number(4)?;
                reset_distance += Distance::from_units(to_distance) - Distance::from_units(distance);
                if action_type == ActionType::Reset {
                    ActionRecord::Reset {
                        distance,
                        to_distance,
                    }
                } else {
                    ActionRecord::FreeZone {
                        distance,
                        to_distance,
                    }
                }
            }
            ActionType::FreeTime => {
                let minutes = number(3)
                    .ok()
                    .filter(|m| *m != 0.0)
                    .map_or_else(|| number(4), Ok)?;
                free_time += (minutes * 60.0).round() as Seconds;
                ActionRecord::FreeTime { distance, minutes }
            }
            ActionType::Note => ActionRecord::Note {
                distance,
                note: columns.get(3..).unwrap_or_default().join(" "),
            },
            ActionType::ResetToZero => ActionRecord::ResetToZero { distance },
            ActionType::GasStop => ActionRecord::GasStop { distance },
            ActionType::Known => ActionRecord::Known { distance },
            ActionType::Start => ActionRecord::Start { distance },
            ActionType::End => ActionRecord::End { distance },
        };

        let has_end_columns = matches!(
            action_type,
            ActionType::SpeedChange | ActionType::Reset | ActionType::FreeZone | ActionType::FreeTime
        );
        let has_distance_columns = matches!(
            action_type,
            ActionType::SpeedChange | ActionType::Reset | ActionType::FreeZone
        );

        let end_clock = if has_end_columns {
            columns[columns.len() - 1]
        } else {
            first
        };
        let end_seconds = clock_seconds(end_clock, line)?;

        let (end_distance, distance_to_go) = if has_distance_columns && columns.len() >= 6 {
            let len = columns.len();
            (
                Distance::from_units(number(len - 2)?),
                Some(Distance::from_units(number(len - 3)?)),
            )
        } else {
            (Distance::from_units(distance), None)
        };

        trace!(action = %action_type, distance, "printout row");
        actions.push(record);
        timings.push(ExpectedTiming {
            start_time: seconds - key,
            end_time: end_seconds - key,
            end_distance,
            distance_to_go,
        });
    }

    Ok(Printout {
        record: EnduroRecord {
            version: FORMAT_VERSION.to_string(),
            title: title.join("\n"),
            route_sheet: RouteSheetRecord {
                key_time: key_time.unwrap_or(0),
                actions,
                options: OptionsRecord::default(),
            },
        },
        timings,
        reset_distance,
        free_time,
    })
}

/// `HH:MM:SS` to seconds since midnight.
fn clock_seconds(value: &str, line: &str) -> Result<Seconds, TextError> {
    let malformed = || TextError::MalformedTime {
        value: value.to_string(),
        line: line.to_string(),
    };
    let parts = value
        .split(':')
        .map(|part| part.parse::<Seconds>().map_err(|_| malformed()))
        .collect::<Result<Vec<_>, _>>()?;
    match parts.as_slice() {
        [h, m, s] if (0..24).contains(h) && (0..60).contains(m) && (0..60).contains(s) => {
            Ok((h * 60 + m) * 60 + s)
        }
        _ => Err(malformed()),
    }
}

// ===========================================================================
// Tests
// ===========================================================================
