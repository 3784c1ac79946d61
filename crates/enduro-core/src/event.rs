//! Change notifications emitted by a [`RouteSheet`](crate::route_sheet::RouteSheet).
//!
//! Route sheet events are delivered synchronously: every mutating call
//! emits its events to the registered listeners (in registration order)
//! before it returns. Each event is also kept in a bounded [`EventLog`] so a
//! synchronous caller can look at what its last call changed without
//! registering a listener.
//!
//! Listener panics are not caught.

use std::collections::VecDeque;

use crate::id::ActionId;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A route sheet change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSheetEvent {
    /// An action was inserted at `index`. `mutation` is set when the insert
    /// is the second half of a type change.
    Insert {
        action: ActionId,
        index: usize,
        mutation: bool,
    },
    /// An action was removed from `index`. The id is no longer valid.
    Delete { action: ActionId, index: usize },
    /// Sorting moved at least one action; by-index views must be rebuilt.
    Reindex,
    /// Derived fields (or the key time) changed.
    Recalc,
}

/// Discriminant tag for event types, used to subscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Insert,
    Delete,
    Reindex,
    Recalc,
}

const EVENT_KIND_COUNT: usize = 4;

impl RouteSheetEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            RouteSheetEvent::Insert { .. } => EventKind::Insert,
            RouteSheetEvent::Delete { .. } => EventKind::Delete,
            RouteSheetEvent::Reindex => EventKind::Reindex,
            RouteSheetEvent::Recalc => EventKind::Recalc,
        }
    }
}

impl EventKind {
    pub const ALL: [EventKind; EVENT_KIND_COUNT] = [
        EventKind::Insert,
        EventKind::Delete,
        EventKind::Reindex,
        EventKind::Recalc,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventLog -- bounded history
// ---------------------------------------------------------------------------

/// Fixed capacity history of recent events; the oldest are dropped first.
#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<RouteSheetEvent>,
    capacity: usize,
    total_written: u64,
}

impl EventLog {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            total_written: 0,
        }
    }

    pub fn push(&mut self, event: RouteSheetEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events written since creation or the last [`clear`](Self::clear),
    /// including dropped ones.
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    pub fn dropped_count(&self) -> u64 {
        self.total_written.saturating_sub(self.events.len() as u64)
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &RouteSheetEvent> {
        self.events.iter()
    }

    /// Number of logged events of `kind`.
    pub fn count(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind() == kind).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.total_written = 0;
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// A listener receives events read-only.
pub type Listener = Box<dyn FnMut(&RouteSheetEvent)>;

/// Handle returned by [`EventBus::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct ListenerEntry {
    id: ListenerId,
    listener: Listener,
}

/// Listener lists per event kind plus the event log.
pub struct EventBus {
    listeners: [Vec<ListenerEntry>; EVENT_KIND_COUNT],
    log: EventLog,
    next_id: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: Vec<usize> = self.listeners.iter().map(Vec::len).collect();
        f.debug_struct("EventBus")
            .field("listeners", &counts)
            .field("log", &self.log)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            listeners: Default::default(),
            log: EventLog::new(log_capacity),
            next_id: 0,
        }
    }

    /// Registers a listener for one event kind. Listeners run in
    /// registration order.
    pub fn on(&mut self, kind: EventKind, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners[kind.index()].push(ListenerEntry { id, listener });
        id
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn off(&mut self, id: ListenerId) -> bool {
        for list in &mut self.listeners {
            if let Some(pos) = list.iter().position(|entry| entry.id == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners[kind.index()].len()
    }

    /// Logs the event and delivers it to every listener of its kind.
    pub fn emit(&mut self, event: RouteSheetEvent) {
        self.log.push(event);
        for entry in &mut self.listeners[event.kind().index()] {
            (entry.listener)(&event);
        }
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn make_action_id() -> ActionId {
        let mut sm = SlotMap::<ActionId, ()>::with_key();
        sm.insert(())
    }

    #[test]
    fn log_drops_oldest() {
        let mut log = EventLog::new(2);
        log.push(RouteSheetEvent::Reindex);
        log.push(RouteSheetEvent::Recalc);
        log.push(RouteSheetEvent::Recalc);
        assert_eq!(log.len(), 2);
        assert_eq!(log.total_written(), 3);
        assert_eq!(log.dropped_count(), 1);
        assert_eq!(log.count(EventKind::Reindex), 0);
        assert_eq!(log.count(EventKind::Recalc), 2);
    }

    #[test]
    fn clear_resets_counters() {
        let mut log = EventLog::new(2);
        for _ in 0..5 {
            log.push(RouteSheetEvent::Recalc);
        }
        assert_eq!(log.dropped_count(), 3);
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.total_written(), 0);
        assert_eq!(log.dropped_count(), 0);
        log.push(RouteSheetEvent::Reindex);
        assert_eq!(log.total_written(), 1);
        assert_eq!(log.dropped_count(), 0);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let log = EventLog::new(0);
        assert_eq!(log.capacity(), 1);
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let mut bus = EventBus::default();
        let seen = Rc::new(RefCell::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = seen.clone();
            bus.on(EventKind::Recalc, Box::new(move |_| seen.borrow_mut().push(tag)));
        }
        bus.emit(RouteSheetEvent::Recalc);

        assert_eq!(*seen.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn listeners_only_see_their_kind() {
        let mut bus = EventBus::default();
        let inserts = Rc::new(RefCell::new(Vec::new()));
        let sink = inserts.clone();
        bus.on(EventKind::Insert, Box::new(move |e| sink.borrow_mut().push(*e)));

        let action = make_action_id();
        bus.emit(RouteSheetEvent::Recalc);
        bus.emit(RouteSheetEvent::Insert {
            action,
            index: 1,
            mutation: false,
        });

        assert_eq!(
            *inserts.borrow(),
            vec![RouteSheetEvent::Insert {
                action,
                index: 1,
                mutation: false
            }]
        );
        assert_eq!(bus.log().len(), 2);
    }

    #[test]
    fn off_removes_listener() {
        let mut bus = EventBus::default();
        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        let id = bus.on(EventKind::Reindex, Box::new(move |_| *c.borrow_mut() += 1));
        bus.emit(RouteSheetEvent::Reindex);
        assert!(bus.off(id));
        assert!(!bus.off(id));
        bus.emit(RouteSheetEvent::Reindex);
        assert_eq!(*count.borrow(), 1);
        assert_eq!(bus.listener_count(EventKind::Reindex), 0);
    }
}
