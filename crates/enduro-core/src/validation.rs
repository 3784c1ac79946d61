//! Per-action validation and timing comparison.
//!
//! [`ActionError`] is the annotation a recalculation attaches to actions that
//! cannot be ridden as written (a speed change off a possible, an inverted
//! reset). [`compare_timing`] diffs a recalculated enduro against the
//! printout of another route sheet tool.

use crate::action::{Action, ActionType};
use crate::enduro::Enduro;
use crate::possible::MinimumPossible;
use crate::text::Printout;
use crate::units::{Distance, Seconds};

// ---------------------------------------------------------------------------
// Action errors
// ---------------------------------------------------------------------------

/// Validation error attached to an action. `lap` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("Loop {lap} Speed change @ {distance} not on possible.")]
    SpeedChangeOffPossible { lap: usize, distance: Distance },
    #[error("Loop {lap} Free Zone @ {distance} toDistance must be greater than distance.")]
    InvertedFreeZone { lap: usize, distance: Distance },
    #[error("Loop {lap} Reset @ {distance} toDistance must be greater than distance.")]
    InvertedReset { lap: usize, distance: Distance },
    #[error("Loop {lap} Reset to 0 @ {distance} not on possible.")]
    ResetToZeroOffPossible { lap: usize, distance: Distance },
}

impl ActionError {
    /// 1-based lap of the offending action.
    pub fn lap(&self) -> usize {
        match *self {
            ActionError::SpeedChangeOffPossible { lap, .. }
            | ActionError::InvertedFreeZone { lap, .. }
            | ActionError::InvertedReset { lap, .. }
            | ActionError::ResetToZeroOffPossible { lap, .. } => lap,
        }
    }

    pub fn distance(&self) -> Distance {
        match *self {
            ActionError::SpeedChangeOffPossible { distance, .. }
            | ActionError::InvertedFreeZone { distance, .. }
            | ActionError::InvertedReset { distance, .. }
            | ActionError::ResetToZeroOffPossible { distance, .. } => distance,
        }
    }
}

/// Checks one recalculated action.
///
/// `governing` is the minimum possible of the speed change in effect before
/// the action plus the distance travelled since it. Only speed changes
/// (other than the first) and resets to zero are checked against it.
pub(crate) fn check_action(
    action: &Action,
    governing: Option<(MinimumPossible, Distance)>,
) -> Option<ActionError> {
    let lap = action.lap() + 1;
    let distance = action.start_distance();
    let off_possible = governing.is_some_and(|(min, delta)| !min.is_on_possible(delta));

    match action.action_type() {
        ActionType::SpeedChange if off_possible => {
            Some(ActionError::SpeedChangeOffPossible { lap, distance })
        }
        ActionType::ResetToZero if off_possible => {
            Some(ActionError::ResetToZeroOffPossible { lap, distance })
        }
        ActionType::FreeZone if action.to_distance() < distance => {
            Some(ActionError::InvertedFreeZone { lap, distance })
        }
        ActionType::Reset if action.to_distance() < distance => {
            Some(ActionError::InvertedReset { lap, distance })
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Timing comparison
// ---------------------------------------------------------------------------

/// Field of an action whose computed value differs from a printout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingField {
    Type,
    StartDistance,
    EndDistance,
    StartTime,
    EndTime,
}

/// One differing field. Distances are in hundredths, times in seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingMismatch {
    pub index: usize,
    pub action_type: ActionType,
    pub field: TimingField,
    pub expected: i64,
    pub actual: i64,
}

/// Result of [`compare_timing`].
#[derive(Debug, Clone, Default)]
pub struct TimingReport {
    pub title_matches: bool,
    pub key_time_matches: bool,
    pub expected_actions: usize,
    pub actual_actions: usize,
    /// Validation errors raised while recalculating, by index.
    pub errors: Vec<(usize, ActionError)>,
    pub mismatches: Vec<TimingMismatch>,
}

impl TimingReport {
    pub fn is_identical(&self) -> bool {
        self.title_matches
            && self.key_time_matches
            && self.expected_actions == self.actual_actions
            && self.errors.is_empty()
            && self.mismatches.is_empty()
    }
}

/// Allowed difference in seconds for `(start, end)` times. Printout tools
/// round intermediate times differently, so a second either way is accepted
/// where they are known to disagree.
fn tolerance(action_type: ActionType) -> (Seconds, Seconds) {
    match action_type {
        ActionType::SpeedChange => (0, 1),
        ActionType::End
        | ActionType::Note
        | ActionType::Reset
        | ActionType::FreeTime
        | ActionType::FreeZone => (1, 1),
        ActionType::ResetToZero | ActionType::GasStop | ActionType::Known | ActionType::Start => {
            (0, 0)
        }
    }
}

/// Compares a recalculated enduro with the timings listed in a printout.
///
/// Actions are compared pairwise by index up to the shorter of the two
/// lists. A type mismatch at an index skips the remaining fields of that
/// pair.
pub fn compare_timing(enduro: &Enduro, printout: &Printout) -> TimingReport {
    let sheet = enduro.route_sheet();
    let mut report = TimingReport {
        title_matches: enduro.title() == printout.record.title,
        key_time_matches: sheet.key_time() == printout.record.route_sheet.key_time,
        expected_actions: printout.timings.len(),
        actual_actions: sheet.len(),
        errors: sheet.errors().map(|(i, e)| (i, e.clone())).collect(),
        mismatches: Vec::new(),
    };

    let expected = printout.record.route_sheet.actions.iter().zip(&printout.timings);
    for (index, (action, (record, timing))) in sheet.actions().zip(expected).enumerate() {
        let action_type = action.action_type();
        let mut mismatch = |field, expected: i64, actual: i64| {
            report.mismatches.push(TimingMismatch {
                index,
                action_type,
                field,
                expected,
                actual,
            });
        };

        if record.action_type() != action_type {
            mismatch(TimingField::Type, 0, 0);
            continue;
        }

        let start = Distance::from_units(record.distance());
        if start != action.start_distance() {
            mismatch(
                TimingField::StartDistance,
                start.hundredths(),
                action.start_distance().hundredths(),
            );
        }
        if timing.end_distance != action.end_distance() {
            mismatch(
                TimingField::EndDistance,
                timing.end_distance.hundredths(),
                action.end_distance().hundredths(),
            );
        }

        let (start_slack, end_slack) = tolerance(action_type);
        if (action.start_time() - timing.start_time).abs() > start_slack {
            mismatch(TimingField::StartTime, timing.start_time, action.start_time());
        }
        if (action.end_time() - timing.end_time).abs() > end_slack {
            mismatch(TimingField::EndTime, timing.end_time, action.end_time());
        }
    }

    report
}
