/// Deterministic event scheduler.
///
/// Uses a `BinaryHeap` with reversed `Ord` on `Event` to act as a
/// min-heap keyed by `(scheduled_at, event_id)`. Because event IDs are
/// strictly increasing and the heap is deterministic, two runs with the
/// same seed will always produce the same dispatch order.

use std::collections::BinaryHeap;

use crate::event::{Event, EventId, EventIdGen};
use crate::time::VirtualTime;

/// The core deterministic scheduler.
///
/// Owns the event queue and the ID generator. All scheduling goes through
/// this struct to ensure monotonic IDs and deterministic ordering.
#[derive(Debug)]
pub struct Scheduler<A> {
    /// Min-heap (via reversed Ord on Event).
    queue: BinaryHeap<Event<A>>,

    /// Monotonic event-ID generator.
    id_gen: EventIdGen,
}

impl<A> Scheduler<A> {
    /// Create a new, empty scheduler.
    pub fn new() -> Self {
        Scheduler {
            queue: BinaryHeap::new(),
            id_gen: EventIdGen::new(),
        }
    }

    /// Schedule a new action at the given virtual time.
    ///
    /// Returns the `EventId` assigned to this event.
    pub fn schedule(&mut self, at: VirtualTime, payload: A) -> EventId {
        let id = self.id_gen.next_id();
        self.queue.push(Event::new(id, at, payload));
        id
    }

    /// Pop the next event (earliest time, lowest ID).
    ///
    /// Returns `None` when the queue is empty.
    pub fn pop_next(&mut self) -> Option<Event<A>> {
        self.queue.pop()
    }

    /// Peek at the next event without removing it.
    pub fn peek_next(&self) -> Option<&Event<A>> {
        self.queue.peek()
    }

    /// Returns `true` if the event queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns the number of pending events.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Discard every pending event without executing it.
    ///
    /// Returns the number of events discarded. Used when a run is
    /// stopped early: in-flight deliveries and armed timers simply never
    /// happen.
    pub fn clear(&mut self) -> usize {
        let discarded = self.queue.len();
        self.queue.clear();
        discarded
    }
}

impl<A> Default for Scheduler<A> {
    fn default() -> Self {
        Self::new()
    }
}
