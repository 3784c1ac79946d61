//! The route sheet engine.
//!
//! A [`RouteSheet`] owns an ordered list of [`Action`]s, the first of which
//! is always the initial speed change (the "seed"). Every structural change
//! runs [`RouteSheet::recalc`] before returning, which
//!
//! 1. stable-sorts each lap by start distance (laps end at, and include, a
//!    reset to zero),
//! 2. walks the actions deriving lap, start/end time and end distance from
//!    the speed change in effect, and
//! 3. re-validates every action, replacing its [`ActionError`].
//!
//! Changes are reported through the [`EventBus`] as they happen.

use slotmap::SlotMap;
use tracing::{debug, trace, warn};

use crate::action::{Action, ActionType, DEFAULT_SPEED};
use crate::config::{DEFAULT_EVENT_LOG_CAPACITY, DEFAULT_KEY_TIME, RouteSheetOptions};
use crate::event::{EventBus, EventKind, EventLog, Listener, ListenerId, RouteSheetEvent};
use crate::id::ActionId;
use crate::possible::{MinimumPossible, minimum};
use crate::units::{Distance, Seconds};
use crate::validation::{self, ActionError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Misuse of the route sheet API. State is never changed when one of these
/// is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteSheetError {
    #[error("index {index} is out of range for {len} actions")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("the initial speed change cannot be moved, replaced or removed")]
    SeedAction,
    #[error("action {0:?} is not in this route sheet")]
    UnknownAction(ActionId),
    #[error("{action} actions have no {field}")]
    WrongVariant {
        field: &'static str,
        action: ActionType,
    },
}

// ---------------------------------------------------------------------------
// RouteSheet
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct RouteSheet {
    actions: SlotMap<ActionId, Action>,
    order: Vec<ActionId>,
    key_time: Seconds,
    /// Length of each lap as of the last recalculation.
    lap_lengths: Vec<Distance>,
    resets: Distance,
    options: RouteSheetOptions,
    events: EventBus,
}

impl Default for RouteSheet {
    fn default() -> Self {
        Self::new(DEFAULT_SPEED)
    }
}

impl RouteSheet {
    /// Creates a route sheet holding a single speed change at 0.
    pub fn new(initial_speed: u32) -> Self {
        Self::with_event_log_capacity(initial_speed, DEFAULT_EVENT_LOG_CAPACITY)
    }

    pub fn with_event_log_capacity(initial_speed: u32, capacity: usize) -> Self {
        let mut sheet = Self {
            actions: SlotMap::with_key(),
            order: Vec::new(),
            key_time: DEFAULT_KEY_TIME,
            lap_lengths: Vec::new(),
            resets: Distance::ZERO,
            options: RouteSheetOptions::default(),
            events: EventBus::new(capacity),
        };
        sheet.insert_unchecked(Action::speed_change(0.0, f64::from(initial_speed)), 0, false);
        sheet.recalc();
        sheet
    }

    // -----------------------------------------------------------------------
    // Key time and options
    // -----------------------------------------------------------------------

    /// Seconds since midnight at which the route starts.
    pub fn key_time(&self) -> Seconds {
        self.key_time
    }

    /// Action times are relative to the key time, so only a `Recalc` event
    /// is emitted; no action changes.
    pub fn set_key_time(&mut self, key_time: Seconds) {
        if key_time != self.key_time {
            self.key_time = key_time;
            debug!(key_time, "key time changed");
            self.events.emit(RouteSheetEvent::Recalc);
        }
    }

    pub fn options(&self) -> RouteSheetOptions {
        self.options
    }

    pub fn set_options(&mut self, options: RouteSheetOptions) {
        self.options = options;
    }

    // -----------------------------------------------------------------------
    // Access
    // -----------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Always false once constructed; the seed cannot be removed.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Action at `index`; negative indices count from the end (`-1` is the
    /// last action).
    pub fn get(&self, index: isize) -> Option<&Action> {
        self.id_at(index).map(|id| &self.actions[id])
    }

    pub fn id_at(&self, index: isize) -> Option<ActionId> {
        let index = if index < 0 {
            self.order.len().checked_sub(index.unsigned_abs())?
        } else {
            index as usize
        };
        self.order.get(index).copied()
    }

    pub fn action(&self, id: ActionId) -> Option<&Action> {
        self.actions.get(id)
    }

    /// Mutable access for editing an action's canonical fields. The sheet is
    /// not recalculated; call [`recalc`](Self::recalc) afterwards.
    pub fn action_mut(&mut self, id: ActionId) -> Option<&mut Action> {
        self.actions.get_mut(id)
    }

    pub fn index_of(&self, id: ActionId) -> Option<usize> {
        self.order.iter().position(|&other| other == id)
    }

    /// Ids in route order.
    pub fn ids(&self) -> &[ActionId] {
        &self.order
    }

    /// Actions in route order.
    pub fn actions(&self) -> impl ExactSizeIterator<Item = &Action> + '_ {
        self.order.iter().map(|&id| &self.actions[id])
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (ActionId, &Action)> + '_ {
        self.order.iter().map(|&id| (id, &self.actions[id]))
    }

    pub fn seed(&self) -> Option<&Action> {
        self.get(0)
    }

    /// Speed of the initial speed change.
    pub fn seed_speed(&self) -> u32 {
        self.seed().and_then(Action::speed).unwrap_or(DEFAULT_SPEED)
    }

    /// Changes the initial speed and recalculates.
    pub fn set_seed_speed(&mut self, speed: f64) {
        if let Some(&id) = self.order.first()
            && self.actions[id].set_speed(speed).is_ok()
        {
            self.recalc();
        }
    }

    // -----------------------------------------------------------------------
    // Derived totals
    // -----------------------------------------------------------------------

    /// Route length including resets.
    pub fn length(&self) -> Distance {
        self.lap_lengths.iter().copied().sum()
    }

    /// Route length not including resets.
    pub fn ground_distance(&self) -> Distance {
        self.length() - self.resets
    }

    pub fn reset_distance(&self) -> Distance {
        self.resets
    }

    /// End time of the last action.
    pub fn duration(&self) -> Seconds {
        self.get(-1).map_or(0, Action::end_time)
    }

    /// Total free time in seconds.
    pub fn free_time(&self) -> Seconds {
        self.actions().map(Action::free_seconds).sum()
    }

    /// Length of each lap.
    pub fn laps(&self) -> &[Distance] {
        &self.lap_lengths
    }

    pub fn lap_count(&self) -> usize {
        self.lap_lengths.len()
    }

    /// Validation errors from the last recalculation, by index.
    pub fn errors(&self) -> impl Iterator<Item = (usize, &ActionError)> + '_ {
        self.actions()
            .enumerate()
            .filter_map(|(index, action)| action.error().map(|e| (index, e)))
    }

    /// True when no action carries a validation error.
    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    pub fn on(&mut self, kind: EventKind, listener: Listener) -> ListenerId {
        self.events.on(kind, listener)
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    pub fn event_log(&self) -> &EventLog {
        self.events.log()
    }

    pub fn clear_event_log(&mut self) {
        self.events.clear_log();
    }

    // -----------------------------------------------------------------------
    // Structural changes
    // -----------------------------------------------------------------------

    pub fn append_action(&mut self, action: Action) -> Result<ActionId, RouteSheetError> {
        self.insert_action(action, self.order.len(), false)
    }

    /// Inserts `action` at `index` and recalculates. Index 0 is reserved for
    /// the seed. The action may sort to a different index.
    pub fn insert_action(
        &mut self,
        action: Action,
        index: usize,
        mutation: bool,
    ) -> Result<ActionId, RouteSheetError> {
        let len = self.order.len();
        if index == 0 && len > 0 {
            warn!("rejected insert at index 0");
            return Err(RouteSheetError::SeedAction);
        }
        if index > len {
            warn!(index, len, "rejected insert out of range");
            return Err(RouteSheetError::IndexOutOfRange { index, len });
        }
        let id = self.insert_unchecked(action, index, mutation);
        self.recalc();
        Ok(id)
    }

    fn insert_unchecked(&mut self, action: Action, index: usize, mutation: bool) -> ActionId {
        let id = self.actions.insert(action);
        self.order.insert(index, id);
        self.events.emit(RouteSheetEvent::Insert {
            action: id,
            index,
            mutation,
        });
        id
    }

    /// Removes an action and recalculates. The seed cannot be deleted.
    pub fn delete_action(&mut self, id: ActionId) -> Result<Action, RouteSheetError> {
        let index = self.removable_index(id)?;
        let action = self.remove_at(index, id)?;
        self.recalc();
        Ok(action)
    }

    fn removable_index(&self, id: ActionId) -> Result<usize, RouteSheetError> {
        match self.index_of(id) {
            None => Err(RouteSheetError::UnknownAction(id)),
            Some(0) => {
                warn!("rejected change to the initial speed change");
                Err(RouteSheetError::SeedAction)
            }
            Some(index) => Ok(index),
        }
    }

    fn remove_at(&mut self, index: usize, id: ActionId) -> Result<Action, RouteSheetError> {
        let action = self
            .actions
            .remove(id)
            .ok_or(RouteSheetError::UnknownAction(id))?;
        self.order.remove(index);
        self.events.emit(RouteSheetEvent::Delete { action: id, index });
        Ok(action)
    }

    /// Replaces an action with a default action of `action_type` at the same
    /// distance and index. Emits `Delete`, then `Insert` with `mutation`
    /// set, then recalculates once.
    pub fn mutate_action(
        &mut self,
        id: ActionId,
        action_type: ActionType,
    ) -> Result<ActionId, RouteSheetError> {
        let index = self.removable_index(id)?;
        let old = &self.actions[id];
        let mut replacement = Action::from_type(action_type, old.distance());
        // Keep the range when switching between reset and free zone.
        if replacement.has_range()
            && let Some(to) = old.to()
        {
            replacement.set_to(to)?;
        }
        self.remove_at(index, id)?;
        let new_id = self.insert_unchecked(replacement, index, true);
        self.recalc();
        Ok(new_id)
    }

    /// Moves an action into another lap (1-based, clamped to the existing
    /// laps). The action is placed just before the reset to zero that ends
    /// the target lap, or at the end of the route for the last lap. An
    /// action that does not fit inside the target lap is left where it is.
    ///
    /// Returns whether the action moved.
    pub fn change_lap(&mut self, id: ActionId, lap: usize) -> Result<bool, RouteSheetError> {
        let index = self.removable_index(id)?;
        let lap_count = self.lap_lengths.len().max(1);
        let lap = lap.clamp(1, lap_count);
        let action = &self.actions[id];

        if action.lap() == lap - 1 {
            return Ok(false);
        }

        let fits = lap == lap_count || action.start_distance() <= self.lap_lengths[lap - 1];
        if fits {
            self.order.remove(index);
            let target = if lap == lap_count {
                self.order.len()
            } else {
                self.reset_to_zero_index(lap - 1)
            };
            self.order.insert(target, id);
            debug!(from = index, to = target, lap, "moved action to lap");
        } else {
            debug!(lap, "action does not fit in lap");
        }
        self.recalc_after(fits);
        Ok(fits)
    }

    /// Inserts an action into a lap (1-based, clamped). Actions that do not
    /// fit inside the lap, or target the last lap, are appended.
    pub fn insert_into_lap(&mut self, action: Action, lap: usize) -> ActionId {
        let lap_count = self.lap_lengths.len().max(1);
        let lap = lap.clamp(1, lap_count);
        let index = if lap == lap_count || action.start_distance() > self.lap_lengths[lap - 1] {
            self.order.len()
        } else {
            self.reset_to_zero_index(lap - 1)
        };
        let id = self.insert_unchecked(action, index, false);
        self.recalc();
        id
    }

    /// Index of the `nth` (0-based) reset to zero, or the end of the route.
    fn reset_to_zero_index(&self, nth: usize) -> usize {
        self.order
            .iter()
            .enumerate()
            .filter(|(_, id)| self.actions[**id].is_reset_to_zero())
            .nth(nth)
            .map_or(self.order.len(), |(index, _)| index)
    }

    // -----------------------------------------------------------------------
    // Recalculation
    // -----------------------------------------------------------------------

    /// Sorts each lap by start distance, keeping equal distances in their
    /// current order. The seed stays first. Returns whether any action
    /// moved.
    fn sort(&mut self) -> bool {
        let actions = &self.actions;
        let mut sorted = Vec::with_capacity(self.order.len());
        for (lap, segment) in self
            .order
            .split_inclusive(|id| actions[*id].is_reset_to_zero())
            .enumerate()
        {
            let start = sorted.len() + usize::from(lap == 0);
            sorted.extend_from_slice(segment);
            sorted[start..].sort_by_key(|id: &ActionId| actions[*id].start_distance());
        }

        if sorted == self.order {
            return false;
        }
        self.order = sorted;
        debug!("actions reordered");
        true
    }

    /// Recomputes every derived field from the actions' canonical data.
    /// Idempotent.
    pub fn recalc(&mut self) {
        self.recalc_after(false);
    }

    /// Recalculates, emitting a single `Reindex` if the caller already
    /// reordered (`reordered`) or the sort moves anything.
    fn recalc_after(&mut self, reordered: bool) {
        if self.sort() || reordered {
            self.events.emit(RouteSheetEvent::Reindex);
        }
        let Some(&seed) = self.order.first() else {
            return;
        };

        let mut last_speed_change = seed;
        let mut free_accumulated: Seconds = 0;
        let mut total_resets = Distance::ZERO;
        let mut lap_lengths = vec![Distance::ZERO];

        for &id in &self.order {
            let lap = lap_lengths.len() - 1;
            self.actions[id].lap = lap;

            let governing = &self.actions[last_speed_change];
            let min = minimum(governing.speed().unwrap_or(DEFAULT_SPEED));
            let delta = distance_between(governing, &self.actions[id], &lap_lengths);
            let start_time = governing.start_time + min.seconds_for(delta) + free_accumulated;

            let action = &mut self.actions[id];
            action.start_time = start_time;
            action.end_time = start_time;
            match action.action_type() {
                ActionType::SpeedChange => {
                    action.distance_to_go = Distance::ZERO;
                    action.end_distance = action.start_distance();
                }
                ActionType::Start | ActionType::Known | ActionType::End => {
                    action.end_distance = action.start_distance();
                }
                ActionType::FreeTime => {
                    let free = action.free_seconds();
                    action.end_time += free;
                    action.end_distance = action.start_distance();
                    free_accumulated += free;
                }
                ActionType::Note | ActionType::GasStop => {}
                ActionType::FreeZone => {
                    action.end_time += min.seconds_for(action.distance_to_go);
                }
                ActionType::Reset => {
                    action.end_time += min.seconds_for(action.distance_to_go);
                    total_resets += action.distance_to_go;
                }
                ActionType::ResetToZero => {
                    action.end_distance = action.start_distance();
                    if let Some(current) = lap_lengths.last_mut() {
                        *current = action.start_distance();
                    }
                    lap_lengths.push(Distance::ZERO);
                }
            }

            let (start_distance, end_distance) = (action.start_distance(), action.end_distance);
            let is_speed_change = action.is_speed_change();

            // The governing speed change reaches up to this action.
            let governing = &mut self.actions[last_speed_change];
            governing.distance_to_go = delta;
            governing.end_time = start_time;
            governing.end_distance = start_distance;

            if is_speed_change {
                last_speed_change = id;
                free_accumulated = 0;
            }
            lap_lengths[lap] = end_distance;
        }

        self.lap_lengths = lap_lengths;
        self.resets = total_resets;
        self.check_for_errors();

        debug!(
            actions = self.order.len(),
            laps = self.lap_lengths.len(),
            length = %self.length(),
            duration = self.duration(),
            "route sheet recalculated"
        );
        self.events.emit(RouteSheetEvent::Recalc);
    }

    fn check_for_errors(&mut self) {
        let mut last_speed_change: Option<ActionId> = None;

        for (index, &id) in self.order.iter().enumerate() {
            let action = &self.actions[id];
            let checks_possible = match action.action_type() {
                ActionType::SpeedChange => index > 0,
                ActionType::ResetToZero => true,
                _ => false,
            };
            let governing: Option<(MinimumPossible, Distance)> = last_speed_change
                .filter(|_| checks_possible)
                .map(|sc| {
                    let sc = &self.actions[sc];
                    let min = minimum(sc.speed().unwrap_or(DEFAULT_SPEED));
                    (min, distance_between(sc, action, &self.lap_lengths))
                });

            let error = validation::check_action(action, governing);
            if let Some(error) = &error {
                trace!(index, %error, "action error");
            }
            if action.is_speed_change() {
                last_speed_change = Some(id);
            }
            self.actions[id].error = error;
        }
    }
}

/// Distance travelled from `speed_change` to `action`, summing the laps in
/// between when they are on different laps.
fn distance_between(speed_change: &Action, action: &Action, lap_lengths: &[Distance]) -> Distance {
    let (from_lap, to_lap) = (speed_change.lap(), action.lap());
    if from_lap >= to_lap {
        return action.start_distance() - speed_change.start_distance();
    }
    let lap_length = |lap: usize| lap_lengths.get(lap).copied().unwrap_or(Distance::ZERO);
    let between: Distance = (from_lap + 1..to_lap).map(lap_length).sum();
    action.start_distance() + between + (lap_length(from_lap) - speed_change.start_distance())
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn d(units: f64) -> Distance {
        Distance::from_units(units)
    }

    /// Appends and returns the action's error after recalculation.
    fn append(sheet: &mut RouteSheet, action: Action) -> Option<ActionError> {
        let id = sheet.append_action(action).unwrap();
        sheet.action(id).unwrap().error().cloned()
    }

    // -----------------------------------------------------------------------
    // Structure
    // -----------------------------------------------------------------------

    #[test]
    fn new_sheet_has_seed_only() {
        let sheet = RouteSheet::new(30);
        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet.seed_speed(), 30);
        assert_eq!(sheet.length(), Distance::ZERO);
        assert_eq!(sheet.key_time(), 8 * 3600);
        assert_eq!(sheet.laps(), &[Distance::ZERO]);
    }

    #[test]
    fn actions_can_be_deleted() {
        let mut sheet = RouteSheet::default();
        let id = sheet.append_action(Action::speed_change(3.0, 30.0)).unwrap();
        assert_eq!(sheet.len(), 2);
        let removed = sheet.delete_action(id).unwrap();
        assert_eq!(removed.speed(), Some(30));
        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet.delete_action(id), Err(RouteSheetError::UnknownAction(id)));
    }

    #[test]
    fn seed_cannot_be_deleted_or_replaced() {
        let mut sheet = RouteSheet::new(30);
        let seed = sheet.id_at(0).unwrap();
        assert_eq!(sheet.delete_action(seed), Err(RouteSheetError::SeedAction));
        assert_eq!(
            sheet.insert_action(Action::speed_change(3.5, 18.0), 0, false),
            Err(RouteSheetError::SeedAction)
        );
        assert_eq!(
            sheet.mutate_action(seed, ActionType::Note),
            Err(RouteSheetError::SeedAction)
        );
        assert_eq!(sheet.change_lap(seed, 2), Err(RouteSheetError::SeedAction));
        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet.seed_speed(), 30);
    }

    #[test]
    fn insert_out_of_range_is_rejected() {
        let mut sheet = RouteSheet::new(30);
        assert_eq!(
            sheet.insert_action(Action::known(1.0), 5, false),
            Err(RouteSheetError::IndexOutOfRange { index: 5, len: 1 })
        );
        assert_eq!(sheet.len(), 1);
    }

    #[test]
    fn actions_can_be_inserted() {
        let mut sheet = RouteSheet::new(30);
        sheet.append_action(Action::speed_change(3.0, 30.0)).unwrap();
        let id = sheet.insert_action(Action::speed_change(3.0, 18.0), 1, false).unwrap();
        assert_eq!(sheet.id_at(1), Some(id));
    }

    #[test]
    fn negative_index_counts_from_end() {
        let mut sheet = RouteSheet::new(30);
        sheet.append_action(Action::known(1.0)).unwrap();
        sheet.append_action(Action::end(2.0)).unwrap();
        assert_eq!(sheet.get(-1).unwrap().action_type(), ActionType::End);
        assert_eq!(sheet.get(-3).unwrap().action_type(), ActionType::SpeedChange);
        assert!(sheet.get(-4).is_none());
        assert!(sheet.get(3).is_none());
    }

    #[test]
    fn insert_into_lap_respects_lap_length() {
        let mut sheet = RouteSheet::new(30);
        sheet.append_action(Action::reset_to_zero(20.0)).unwrap();
        sheet.append_action(Action::speed_change(30.0, 30.0)).unwrap();

        sheet.insert_into_lap(Action::note(20.0, "hi"), 1);
        assert_eq!(sheet.get(1).unwrap().action_type(), ActionType::Note);

        let mut sheet = RouteSheet::new(30);
        sheet.append_action(Action::reset_to_zero(20.0)).unwrap();
        sheet.append_action(Action::speed_change(30.0, 30.0)).unwrap();
        sheet.insert_into_lap(Action::note(31.0, "hi"), 1);
        assert_eq!(sheet.get(3).unwrap().action_type(), ActionType::Note);
    }

    #[test]
    fn insert_into_lap_emits_one_insert() {
        let mut sheet = RouteSheet::new(30);
        sheet.append_action(Action::reset_to_zero(20.0)).unwrap();
        sheet.clear_event_log();
        sheet.insert_into_lap(Action::note(50.0, "hi"), 1);
        assert_eq!(sheet.event_log().count(EventKind::Insert), 1);
        assert_eq!(sheet.event_log().count(EventKind::Recalc), 1);
    }

    #[test]
    fn change_lap_moves_only_when_it_fits() {
        let mut sheet = RouteSheet::new(30);
        let note = sheet.append_action(Action::note(10.0, "hi")).unwrap();
        sheet.append_action(Action::reset_to_zero(20.0)).unwrap();
        sheet.append_action(Action::speed_change(5.0, 30.0)).unwrap();
        sheet.append_action(Action::reset_to_zero(7.0)).unwrap();
        assert_eq!(sheet.lap_count(), 3);

        // Same lap: nothing to do.
        assert_eq!(sheet.change_lap(note, 1), Ok(false));
        assert_eq!(sheet.index_of(note), Some(1));
        assert_eq!(sheet.action(note).unwrap().lap(), 0);

        // 10 does not fit in a lap of 7.
        assert_eq!(sheet.change_lap(note, 2), Ok(false));
        assert_eq!(sheet.index_of(note), Some(1));
        assert_eq!(sheet.action(note).unwrap().lap(), 0);

        sheet.action_mut(note).unwrap().set_distance(6.0);
        assert_eq!(sheet.change_lap(note, 2), Ok(true));
        assert_eq!(sheet.action(note).unwrap().lap(), 1);

        assert_eq!(sheet.change_lap(note, 3), Ok(true));
        assert_eq!(sheet.action(note).unwrap().lap(), 2);
        assert_eq!(sheet.index_of(note), Some(sheet.len() - 1));

        // Clamped to the last lap.
        assert_eq!(sheet.change_lap(note, 99), Ok(false));
    }

    #[test]
    fn change_lap_moves_back_to_an_earlier_lap() {
        let mut sheet = RouteSheet::new(30);
        sheet.append_action(Action::known(10.0)).unwrap();
        sheet.append_action(Action::reset_to_zero(20.0)).unwrap();
        sheet.append_action(Action::speed_change(5.0, 30.0)).unwrap();
        let note = sheet.append_action(Action::note(3.0, "x")).unwrap();
        sheet.append_action(Action::reset_to_zero(7.0)).unwrap();
        assert_eq!(sheet.index_of(note), Some(3));
        assert_eq!(sheet.action(note).unwrap().lap(), 1);
        sheet.clear_event_log();

        assert_eq!(sheet.change_lap(note, 1), Ok(true));
        assert_eq!(sheet.action(note).unwrap().lap(), 0);
        // Sorted ahead of the known at 10.
        assert_eq!(sheet.index_of(note), Some(1));
        assert_eq!(sheet.event_log().count(EventKind::Reindex), 1);
        assert_eq!(sheet.action(note).unwrap().start_time(), 6 * 60);

        // Lap 0 clamps to lap 1, where the note already is.
        sheet.clear_event_log();
        assert_eq!(sheet.change_lap(note, 0), Ok(false));
        assert_eq!(sheet.event_log().count(EventKind::Reindex), 0);
    }

    #[test]
    fn change_lap_rejects_unknown_action() {
        let mut sheet = RouteSheet::new(30);
        sheet.append_action(Action::reset_to_zero(20.0)).unwrap();
        let note = sheet.append_action(Action::note(3.0, "x")).unwrap();
        sheet.delete_action(note).unwrap();

        assert_eq!(
            sheet.change_lap(note, 1),
            Err(RouteSheetError::UnknownAction(note))
        );
        assert_eq!(sheet.len(), 2);
    }

    #[test]
    fn mutate_replaces_in_place() {
        let mut sheet = RouteSheet::new(18);
        sheet.append_action(Action::speed_change(3.3, 24.0)).unwrap();
        let note = sheet.append_action(Action::note(4.0, "x")).unwrap();
        sheet.clear_event_log();

        let known = sheet.mutate_action(note, ActionType::Known).unwrap();
        assert!(sheet.action(note).is_none());
        let action = sheet.action(known).unwrap();
        assert_eq!(action.action_type(), ActionType::Known);
        assert_eq!(action.start_distance(), d(4.0));
        assert_eq!(sheet.index_of(known), Some(2));

        let events: Vec<_> = sheet.event_log().iter().copied().collect();
        assert_eq!(
            events,
            vec![
                RouteSheetEvent::Delete { action: note, index: 2 },
                RouteSheetEvent::Insert { action: known, index: 2, mutation: true },
                RouteSheetEvent::Recalc,
            ]
        );
    }

    #[test]
    fn mutate_between_ranges_keeps_target() {
        let mut sheet = RouteSheet::new(18);
        let reset = sheet.append_action(Action::reset(3.0, 4.5)).unwrap();
        let zone = sheet.mutate_action(reset, ActionType::FreeZone).unwrap();
        assert_eq!(sheet.action(zone).unwrap().to(), Some(4.5));
        assert_eq!(sheet.reset_distance(), Distance::ZERO);
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    #[test]
    fn listeners_see_insert_then_recalc() {
        let mut sheet = RouteSheet::new(18);
        let seen = Rc::new(RefCell::new(Vec::new()));
        for kind in EventKind::ALL {
            let seen = seen.clone();
            sheet.on(kind, Box::new(move |e| seen.borrow_mut().push(e.kind())));
        }
        sheet.append_action(Action::known(1.0)).unwrap();
        assert_eq!(*seen.borrow(), vec![EventKind::Insert, EventKind::Recalc]);
    }

    #[test]
    fn reindex_only_when_order_changes() {
        let mut sheet = RouteSheet::new(18);
        sheet.append_action(Action::known(3.0)).unwrap();
        sheet.clear_event_log();

        sheet.append_action(Action::known(4.0)).unwrap();
        assert_eq!(sheet.event_log().count(EventKind::Reindex), 0);

        sheet.append_action(Action::note(3.5, "between")).unwrap();
        assert_eq!(sheet.event_log().count(EventKind::Reindex), 1);
        assert_eq!(sheet.get(2).unwrap().action_type(), ActionType::Note);
    }

    #[test]
    fn key_time_emits_recalc_only_when_changed() {
        let mut sheet = RouteSheet::new(18);
        let id = sheet.append_action(Action::speed_change(1.2, 24.0)).unwrap();
        assert_eq!(sheet.action(id).unwrap().start_time(), 4 * 60);
        sheet.clear_event_log();

        sheet.set_key_time(9 * 3600);
        sheet.set_key_time(9 * 3600);
        assert_eq!(sheet.key_time(), 9 * 3600);
        assert_eq!(sheet.event_log().len(), 1);
        assert_eq!(sheet.action(id).unwrap().start_time(), 4 * 60);
    }

    // -----------------------------------------------------------------------
    // Sorting
    // -----------------------------------------------------------------------

    #[test]
    fn edited_distance_sorts_on_recalc() {
        let mut sheet = RouteSheet::new(18);
        append(&mut sheet, Action::note(3.6, "hi mom"));
        append(&mut sheet, Action::speed_change(3.9, 18.0));

        let note = sheet.id_at(-2).unwrap();
        sheet.action_mut(note).unwrap().set_start_distance(Distance::from_tenths(43));
        sheet.recalc();
        assert_eq!(sheet.id_at(-1), Some(note));
    }

    #[test]
    fn sorting_stays_within_laps() {
        let mut sheet = RouteSheet::new(18);
        append(&mut sheet, Action::speed_change(3.9, 18.0));
        append(&mut sheet, Action::reset_to_zero(4.2));
        append(&mut sheet, Action::note(3.6, "hi mom"));
        append(&mut sheet, Action::speed_change(4.2, 18.0));

        let note = sheet.id_at(-2).unwrap();
        sheet.action_mut(note).unwrap().set_start_distance(Distance::from_tenths(43));
        sheet.recalc();
        assert_eq!(sheet.id_at(-1), Some(note));
        assert_eq!(sheet.get(2).unwrap().action_type(), ActionType::ResetToZero);
    }

    #[test]
    fn seed_stays_first() {
        let mut sheet = RouteSheet::new(18);
        append(&mut sheet, Action::note(-1.0, "before the start"));
        assert!(sheet.get(0).unwrap().is_speed_change());
    }

    // -----------------------------------------------------------------------
    // Timing
    // -----------------------------------------------------------------------

    #[test]
    fn speed_change_ends_at_next_speed_change() {
        let mut sheet = RouteSheet::new(15);
        assert_eq!(append(&mut sheet, Action::reset(4.0, 6.0)), None);
        assert_eq!(append(&mut sheet, Action::speed_change(6.0, 18.0)), None);
        assert_eq!(sheet.len(), 3);
        assert_eq!(sheet.get(0).unwrap().end_distance(), d(6.0));
    }

    #[test]
    fn free_time_moves_clock_forward() {
        let mut sheet = RouteSheet::new(30);
        assert_eq!(append(&mut sheet, Action::speed_change(3.0, 6.0)), None);
        assert_eq!(append(&mut sheet, Action::free_time(3.1, 10.0)), None);
        assert_eq!(sheet.duration(), 17 * 60);
        assert_eq!(append(&mut sheet, Action::speed_change(3.3, 24.0)), None);
        assert_eq!(sheet.duration(), 19 * 60);
        assert_eq!(sheet.free_time(), 10 * 60);
        assert_eq!(append(&mut sheet, Action::speed_change(3.7, 6.0)), None);
        assert_eq!(sheet.duration(), 20 * 60);
    }

    #[test]
    fn free_times_accumulate_until_speed_change() {
        let mut sheet = RouteSheet::new(30);
        append(&mut sheet, Action::speed_change(3.0, 6.0));
        append(&mut sheet, Action::free_time(3.1, 10.0));
        assert_eq!(sheet.duration(), 17 * 60);
        append(&mut sheet, Action::free_time(3.2, 10.0));
        assert_eq!(sheet.duration(), 28 * 60);
        append(&mut sheet, Action::speed_change(3.3, 24.0));
        assert_eq!(sheet.duration(), 29 * 60);
    }

    #[test]
    fn markers_between_possibles_round_to_seconds() {
        let mut sheet = RouteSheet::new(30);
        assert_eq!(append(&mut sheet, Action::speed_change(6.0, 24.0)), None);
        assert_eq!(sheet.duration(), 12 * 60);
        assert_eq!(append(&mut sheet, Action::gas_stop(6.39)), None);
        assert_eq!(sheet.duration(), 12 * 60 + 59);
    }

    #[test]
    fn end_sets_length() {
        let mut sheet = RouteSheet::new(18);
        append(&mut sheet, Action::end(3.9));
        assert_eq!(sheet.length(), d(3.9));
    }

    #[test]
    fn markers_can_appear_anywhere() {
        let mut sheet = RouteSheet::new(15);
        assert_eq!(append(&mut sheet, Action::known(6.1)), None);
        assert_eq!(append(&mut sheet, Action::start(3.59)), None);
        assert_eq!(append(&mut sheet, Action::note(6.39, "GAS")), None);
    }

    // -----------------------------------------------------------------------
    // Resets and laps
    // -----------------------------------------------------------------------

    #[test]
    fn resets_extend_length_not_ground() {
        let mut sheet = RouteSheet::new(18);
        assert_eq!(append(&mut sheet, Action::speed_change(1.2, 24.0)), None);
        assert_eq!(append(&mut sheet, Action::reset(1.4, 1.5)), None);
        assert_eq!(sheet.ground_distance(), d(1.4));
        assert_eq!(sheet.length(), d(1.5));
        assert_eq!(sheet.reset_distance(), d(0.1));
    }

    #[test]
    fn inverted_reset_is_clamped() {
        let mut sheet = RouteSheet::new(18);
        append(&mut sheet, Action::speed_change(1.2, 24.0));
        append(&mut sheet, Action::reset(1.4, 1.2));
        assert_eq!(sheet.get(-1).unwrap().distance(), 1.4);
        assert_eq!(append(&mut sheet, Action::reset(1.4, 1.4)), None);
        assert_eq!(append(&mut sheet, Action::reset(1.4, 1.5)), None);
        assert_eq!(sheet.length(), d(1.5));
    }

    #[test]
    fn cumulative_reset_distance() {
        let mut sheet = RouteSheet::new(30);
        append(&mut sheet, Action::reset(30.0, 40.0));
        assert_eq!(sheet.reset_distance(), d(10.0));
    }

    #[test]
    fn reset_to_zero_creates_laps() {
        let mut sheet = RouteSheet::new(18);
        assert_eq!(append(&mut sheet, Action::reset_to_zero(3.3)), None);
        assert_eq!(append(&mut sheet, Action::speed_change(0.3, 24.0)), None);
        assert_eq!(sheet.length(), d(3.6));
        assert_eq!(sheet.get(0).unwrap().end_distance(), d(0.3));
        assert_eq!(sheet.get(0).unwrap().lap(), 0);
        assert_eq!(sheet.get(2).unwrap().lap(), 1);

        assert_eq!(append(&mut sheet, Action::reset_to_zero(0.7)), None);
        assert_eq!(append(&mut sheet, Action::speed_change(0.4, 18.0)), None);
        assert_eq!(sheet.lap_count(), 3);
    }

    #[test]
    fn lap_lengths_are_per_lap() {
        let mut sheet = RouteSheet::new(60);
        append(&mut sheet, Action::note(5.0, "hi"));
        append(&mut sheet, Action::reset_to_zero(10.0));
        append(&mut sheet, Action::note(20.0, "hi"));
        append(&mut sheet, Action::reset_to_zero(30.0));
        append(&mut sheet, Action::note(60.0, "hi"));

        assert_eq!(sheet.laps(), &[d(10.0), d(30.0), d(60.0)]);
        assert_eq!(sheet.length(), d(100.0));
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    #[test]
    fn speed_change_must_be_on_possible() {
        let mut sheet = RouteSheet::new(18);
        let error = append(&mut sheet, Action::speed_change(3.1, 18.0));
        assert_eq!(
            error.map(|e| e.to_string()),
            Some("Loop 1 Speed change @ 3.10 not on possible.".to_string())
        );
        assert!(!sheet.is_valid());
        assert_eq!(sheet.errors().map(|(i, _)| i).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn reset_to_zero_must_be_on_possible() {
        let mut sheet = RouteSheet::new(18);
        assert!(matches!(
            append(&mut sheet, Action::reset_to_zero(3.2)),
            Some(ActionError::ResetToZeroOffPossible { lap: 1, .. })
        ));
    }

    #[test]
    fn errors_clear_when_fixed() {
        let mut sheet = RouteSheet::new(18);
        let id = sheet.append_action(Action::speed_change(3.1, 18.0)).unwrap();
        assert!(!sheet.is_valid());
        sheet.action_mut(id).unwrap().set_distance(3.3);
        sheet.recalc();
        assert!(sheet.is_valid());
    }

    #[test]
    fn recalc_is_idempotent() {
        let mut sheet = RouteSheet::new(24);
        append(&mut sheet, Action::reset(0.6, 3.2));
        append(&mut sheet, Action::speed_change(5.2, 18.0));
        append(&mut sheet, Action::free_time(5.5, 7.0));
        append(&mut sheet, Action::reset_to_zero(6.1));
        append(&mut sheet, Action::free_zone(1.0, 2.0));
        let before: Vec<Action> = sheet.actions().cloned().collect();
        sheet.recalc();
        let after: Vec<Action> = sheet.actions().cloned().collect();
        assert_eq!(before, after);
    }
}
