//! Per-trial outputs handed to the external statistics collector.

use crate::event::EventId;
use crate::oracle::ElectionOutcome;
use crate::time::VirtualTime;

/// What one election trial produced.
///
/// These are the only values the core exposes per run: the external
/// statistics machinery consumes turnaround time and message count, and
/// (for Bully) the agreement flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct RunReport {
    /// Virtual time elapsed from election start to termination.
    pub turnaround: VirtualTime,
    /// Total message sends attempted, including messages lost in transit.
    pub messages_sent: u64,
    /// Agreement verdict across live nodes.
    pub outcome: ElectionOutcome,
}

/// One dispatched event, as recorded when tracing is enabled.
///
/// The trace is append-only and cleared at the start of each trial.
#[derive(Debug, Clone)]
pub struct TraceEntry<A> {
    pub time: VirtualTime,
    pub event_id: EventId,
    pub payload: A,
}
