//! Enduro Core -- route sheet timing and JART charts for time-keeping
//! enduros.
//!
//! A route sheet is the schedule a rider follows: speed changes, resets,
//! free time and markers, each placed at a distance along the route. This
//! crate recalculates when every action is reached, flags actions that
//! cannot be ridden as written, and expands a route sheet into a JART chart
//! of every possible secret checkpoint.
//!
//! # Recalculation
//!
//! Every mutating [`route_sheet::RouteSheet`] call recalculates before it
//! returns:
//!
//! 1. **Sort** -- Each lap is stable-sorted by start distance.
//! 2. **Walk** -- Lap, start/end time and end distance are derived from the
//!    speed change in effect.
//! 3. **Validate** -- Every action's [`validation::ActionError`] is replaced.
//!
//! ```rust,ignore
//! let mut enduro = text::parse(rs_file);
//! enduro.route_sheet_mut().append_action(Action::known(12.0))?;
//! let chart = Jart::from_enduro(&enduro, false);
//! ```
//!
//! # Key Types
//!
//! - [`route_sheet::RouteSheet`] -- Ordered actions, recalculation, laps.
//! - [`action::Action`] -- One entry; variant data in [`action::ActionKind`].
//! - [`possible::MinimumPossible`] -- Smallest whole-minute, whole-tenth
//!   step at a speed.
//! - [`jart::Jart`] -- Chart rows with possibles and exclusion zones.
//! - [`record::EnduroRecord`] -- Versioned JSON form; [`text`] holds the
//!   plain-text forms.
//! - [`event::EventBus`] -- Change listeners plus a bounded event log.

pub mod action;
pub mod config;
pub mod enduro;
pub mod event;
pub mod id;
pub mod jart;
pub mod migration;
pub mod possible;
pub mod record;
pub mod route_sheet;
pub mod text;
pub mod units;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
