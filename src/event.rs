/// Event records for the deterministic simulation kernel.
///
/// Every effect — a message delivery or a timeout callback — is modeled
/// as an `Event` placed on the scheduler's priority queue and dispatched
/// in deterministic order. The kernel is generic over the action payload:
/// each protocol defines its own action enum, and the kernel never
/// inspects it.

use std::cmp::Ordering;

use crate::time::VirtualTime;

// ── Event ID ──────────────────────────────────────────────────────────

/// A globally unique, strictly-increasing event identifier.
///
/// The monotonic nature of `EventId` breaks ties in the scheduler:
/// two events scheduled at the same `VirtualTime` are dispatched in
/// scheduling order, which is what makes same-timestamp interleavings
/// reproducible across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EventId(u64);

impl EventId {
    /// Wrap a raw u64 into an `EventId`.
    #[inline]
    pub fn new(raw: u64) -> Self {
        EventId(raw)
    }

    /// Return the raw value.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E#{}", self.0)
    }
}

// ── Event ID Generator ───────────────────────────────────────────────

/// Deterministic, strictly-increasing event-ID generator.
///
/// Each `Simulation` owns exactly one of these. The run is
/// single-threaded, so the counter is trivially deterministic.
#[derive(Debug, Clone)]
pub struct EventIdGen {
    next: u64,
}

impl EventIdGen {
    /// Create a generator starting at 0.
    pub fn new() -> Self {
        EventIdGen { next: 0 }
    }

    /// Mint the next event ID.
    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next);
        self.next += 1;
        id
    }
}

impl Default for EventIdGen {
    fn default() -> Self {
        Self::new()
    }
}

// ── Event ─────────────────────────────────────────────────────────────

/// A single simulation event: an action bound to a point in virtual time.
///
/// The scheduler orders events by `(scheduled_at, id)` to guarantee a
/// deterministic total order even when timestamps collide.
#[derive(Debug, Clone)]
pub struct Event<A> {
    /// Unique identifier (monotonically increasing).
    pub id: EventId,

    /// The virtual time at which this event should be dispatched.
    pub scheduled_at: VirtualTime,

    /// The action to perform.
    pub payload: A,
}

impl<A> Event<A> {
    /// Convenience constructor.
    pub fn new(id: EventId, scheduled_at: VirtualTime, payload: A) -> Self {
        Event {
            id,
            scheduled_at,
            payload,
        }
    }
}

/// Equality is by `(scheduled_at, id)` only; ids are unique per run, so
/// two events never collide. Keeping the payload out of the comparison
/// avoids imposing bounds on `A`.
impl<A> PartialEq for Event<A> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.scheduled_at == other.scheduled_at
    }
}

impl<A> Eq for Event<A> {}

/// Ordering: smallest `(scheduled_at, id)` first.
///
/// Rust's `BinaryHeap` is a *max*-heap, so we **reverse** the natural
/// ordering here to turn it into a min-heap.
impl<A> Ord for Event<A> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .scheduled_at
            .cmp(&self.scheduled_at)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl<A> PartialOrd for Event<A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum TestAction {
        Ping,
        Tag(&'static str),
    }

    #[test]
    fn test_event_id_monotonic() {
        let mut gen = EventIdGen::new();
        let a = gen.next_id();
        let b = gen.next_id();
        let c = gen.next_id();
        assert_eq!(a.raw(), 0);
        assert_eq!(b.raw(), 1);
        assert_eq!(c.raw(), 2);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_event_ordering_by_time() {
        let e1 = Event::new(EventId::new(0), VirtualTime::new(10), TestAction::Ping);
        let e2 = Event::new(EventId::new(1), VirtualTime::new(20), TestAction::Ping);
        // e1 should come first (smaller time) → in reversed ordering e1 > e2.
        assert!(e1 > e2);
    }

    #[test]
    fn test_event_ordering_tiebreak_by_id() {
        let e1 = Event::new(EventId::new(0), VirtualTime::new(10), TestAction::Ping);
        let e2 = Event::new(
            EventId::new(1),
            VirtualTime::new(10),
            TestAction::Tag("later"),
        );
        // Same time → smaller ID wins → e1 > e2 in reversed ordering.
        assert!(e1 > e2);
    }

    #[test]
    fn test_event_display() {
        let e = Event::new(EventId::new(42), VirtualTime::new(100), TestAction::Ping);
        assert_eq!(format!("{}", e.id), "E#42");
    }
}
