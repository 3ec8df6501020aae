//! Typed station events and the bus that fans them out.
//!
//! A tick never calls into spawning, sound or advancement services directly.
//! It returns the side effects as [`StationEvent`]s in its
//! [`TickReport`](crate::station::TickReport); the host (or a
//! [`Workshop`](crate::workshop::Workshop) through its [`EventBus`]) acts on
//! them.
//!
//! # Suppression
//!
//! Event kinds can be suppressed via [`EventBus::suppress`], which prevents
//! any buffering or delivery for that kind.

use crate::fixed::Fixed64;
use crate::id::{OwnerId, RuleId, SoundId, StationId};
use crate::item::ItemStack;
use crate::station::StationTier;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Initial motion of a spawned free item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Velocity {
    pub x: Fixed64,
    pub y: Fixed64,
    pub z: Fixed64,
}

impl Velocity {
    pub fn upward(speed: Fixed64) -> Self {
        Self {
            y: speed,
            ..Self::default()
        }
    }
}

/// Audio/visual cue the feedback service should play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedbackCue {
    /// A primary rule's own sound.
    RuleSound(SoundId),
    /// The generic crafting sound.
    GenericCraft,
    /// Output could not leave the station.
    Blocked,
}

/// A side effect produced during one station tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationEvent {
    // -- Rule matching --
    RuleAdopted {
        rule: RuleId,
    },
    ActivityChanged {
        active: bool,
    },

    // -- Completion --
    /// A primary rule completed for an owned station; the host grants the
    /// owner the crafting advancement.
    Crafted {
        owner: OwnerId,
        rule: RuleId,
        output: ItemStack,
    },
    Upgraded {
        from: StationTier,
        to: StationTier,
    },

    // -- Dispatch --
    ItemSpawned {
        stack: ItemStack,
        velocity: Velocity,
    },
    RewardSpawned {
        amount: u32,
    },
    ItemDelivered {
        stack: ItemStack,
    },
    Feedback(FeedbackCue),
}

/// Discriminant tag for event types, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    RuleAdopted,
    ActivityChanged,
    Crafted,
    Upgraded,
    ItemSpawned,
    RewardSpawned,
    ItemDelivered,
    Feedback,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 8;

impl StationEvent {
    /// Get the discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            StationEvent::RuleAdopted { .. } => EventKind::RuleAdopted,
            StationEvent::ActivityChanged { .. } => EventKind::ActivityChanged,
            StationEvent::Crafted { .. } => EventKind::Crafted,
            StationEvent::Upgraded { .. } => EventKind::Upgraded,
            StationEvent::ItemSpawned { .. } => EventKind::ItemSpawned,
            StationEvent::RewardSpawned { .. } => EventKind::RewardSpawned,
            StationEvent::ItemDelivered { .. } => EventKind::ItemDelivered,
            StationEvent::Feedback(_) => EventKind::Feedback,
        }
    }
}

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

/// A station event tagged with its origin, as buffered by the [`EventBus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkshopEvent {
    pub station: StationId,
    pub tick: u64,
    pub event: StationEvent,
}

// ---------------------------------------------------------------------------
// EventBuffer: bounded history
// ---------------------------------------------------------------------------

/// Bounded per-kind history. When full, the oldest event is dropped.
#[derive(Debug)]
pub struct EventBuffer {
    events: VecDeque<WorkshopEvent>,
    capacity: usize,
}

impl EventBuffer {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, event: WorkshopEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
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

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &WorkshopEvent> {
        self.events.iter()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Passive listener: read-only, used for audio, spawning, analytics.
pub type PassiveListener = Box<dyn FnMut(&WorkshopEvent)>;

/// Optional per-listener filter.
pub type EventFilter = Box<dyn Fn(&WorkshopEvent) -> bool>;

struct ListenerEntry {
    listener: PassiveListener,
    filter: Option<EventFilter>,
}

/// One ring buffer per event kind, listener lists, and suppression flags.
pub struct EventBus {
    buffers: [Option<EventBuffer>; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    listeners: [Vec<ListenerEntry>; EVENT_KIND_COUNT],
    default_capacity: usize,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("buffers", &self.buffers)
            .field("suppressed", &self.suppressed)
            .field("default_capacity", &self.default_capacity)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Create a new event bus with the given default buffer capacity per kind.
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            listeners: Default::default(),
            default_capacity,
        }
    }

    /// Suppress an event kind. Its buffer is dropped and nothing is recorded.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.buffers[kind.index()] = None;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Buffer an event. No-ops if its kind is suppressed.
    pub fn emit(&mut self, event: WorkshopEvent) {
        let idx = event.event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        let capacity = self.default_capacity;
        self.buffers[idx]
            .get_or_insert_with(|| EventBuffer::new(capacity))
            .push(event);
    }

    /// Register a listener for an event kind. Listeners run in registration
    /// order during delivery.
    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.on_passive_filtered(kind, None, listener);
    }

    pub fn on_passive_filtered(
        &mut self,
        kind: EventKind,
        filter: Option<EventFilter>,
        listener: PassiveListener,
    ) {
        self.listeners[kind.index()].push(ListenerEntry { listener, filter });
    }

    /// Deliver all buffered events to listeners, oldest first, then clear
    /// the buffers.
    pub fn deliver(&mut self) {
        for idx in 0..EVENT_KIND_COUNT {
            if self.suppressed[idx] {
                continue;
            }
            let Some(buffer) = self.buffers[idx].as_mut() else {
                continue;
            };
            if buffer.is_empty() {
                continue;
            }
            for entry in &mut self.listeners[idx] {
                for event in buffer.iter() {
                    if let Some(filter) = &entry.filter
                        && !filter(event)
                    {
                        continue;
                    }
                    (entry.listener)(event);
                }
            }
            buffer.clear();
        }
    }

    pub fn buffer(&self, kind: EventKind) -> Option<&EventBuffer> {
        self.buffers[kind.index()].as_ref()
    }

    pub fn buffered_count(&self, kind: EventKind) -> usize {
        self.buffer(kind).map_or(0, EventBuffer::len)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn station() -> StationId {
        let mut map: SlotMap<StationId, ()> = SlotMap::with_key();
        map.insert(())
    }

    fn feedback(station: StationId, tick: u64) -> WorkshopEvent {
        WorkshopEvent {
            station,
            tick,
            event: StationEvent::Feedback(FeedbackCue::GenericCraft),
        }
    }

    #[test]
    fn full_buffer_drops_oldest() {
        let s = station();
        let mut buf = EventBuffer::new(3);
        for tick in 0..5 {
            buf.push(feedback(s, tick));
        }
        assert_eq!(buf.len(), 3);
        let ticks: Vec<u64> = buf.iter().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![2, 3, 4]);
    }

    #[test]
    fn zero_capacity_clamps_to_one() {
        let mut buf = EventBuffer::new(0);
        buf.push(feedback(station(), 9));
        assert_eq!(buf.capacity(), 1);
        assert_eq!(buf.iter().count(), 1);
    }

    #[test]
    fn event_kinds_match_variants() {
        assert_eq!(StationEvent::RewardSpawned { amount: 1 }.kind(), EventKind::RewardSpawned);
        assert_eq!(
            StationEvent::ActivityChanged { active: true }.kind(),
            EventKind::ActivityChanged
        );
        assert_eq!(StationEvent::Feedback(FeedbackCue::Blocked).kind(), EventKind::Feedback);
    }

    #[test]
    fn deliver_reaches_listeners_and_clears() {
        let s = station();
        let mut bus = EventBus::new(16);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.on_passive(
            EventKind::Feedback,
            Box::new(move |e| sink.borrow_mut().push(e.tick)),
        );
        bus.emit(feedback(s, 1));
        bus.emit(feedback(s, 2));
        assert_eq!(bus.buffered_count(EventKind::Feedback), 2);
        bus.deliver();
        assert_eq!(*seen.borrow(), vec![1, 2]);
        assert_eq!(bus.buffered_count(EventKind::Feedback), 0);
    }

    #[test]
    fn filtered_listener_skips_events() {
        let s = station();
        let mut bus = EventBus::default();
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        bus.on_passive_filtered(
            EventKind::Feedback,
            Some(Box::new(|e| e.tick % 2 == 0)),
            Box::new(move |_| *sink.borrow_mut() += 1),
        );
        for tick in 0..4 {
            bus.emit(feedback(s, tick));
        }
        bus.deliver();
        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn suppressed_kind_is_never_buffered() {
        let s = station();
        let mut bus = EventBus::default();
        bus.suppress(EventKind::Feedback);
        bus.emit(feedback(s, 0));
        assert!(bus.is_suppressed(EventKind::Feedback));
        assert!(bus.buffer(EventKind::Feedback).is_none());
        assert_eq!(bus.buffered_count(EventKind::Feedback), 0);
    }

    #[test]
    fn upward_velocity() {
        let v = Velocity::upward(Fixed64::from_num(0.1));
        assert_eq!(v.x, Fixed64::ZERO);
        assert_eq!(v.y, Fixed64::from_num(0.1));
    }
}
