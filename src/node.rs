//! Node identity and the per-node state shared by both protocols.

/// A unique identifier for a simulated node.
///
/// `NodeId` is intentionally a newtype around `u64` rather than a
/// bare integer to prevent accidental confusion with other u64 values
/// (event IDs, timestamps, etc.) at compile time. Ids are dense:
/// a simulation with N nodes uses ids 0..N-1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(u64);

impl NodeId {
    /// Create a node ID from a raw integer.
    #[inline]
    pub fn new(id: u64) -> Self {
        NodeId(id)
    }

    /// Return the underlying integer.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }

    /// Index into a dense node array.
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "N{}", self.0)
    }
}

/// State every node carries regardless of protocol: identity, the crash
/// flag, and the election verdict.
///
/// `elected` moves from `None` to exactly one terminal value per run;
/// later coordinator announcements never overwrite an earlier decision.
#[derive(Debug, Clone)]
pub(crate) struct NodeCore {
    pub id: NodeId,
    crashed: bool,
    elected: Option<NodeId>,
}

impl NodeCore {
    pub fn new(id: NodeId) -> Self {
        NodeCore {
            id,
            crashed: false,
            elected: None,
        }
    }

    pub fn is_crashed(&self) -> bool {
        self.crashed
    }

    /// Crash the node. Idempotent; does not touch any other state, so
    /// messages already in flight toward this node are unaffected.
    pub fn crash(&mut self) {
        self.crashed = true;
    }

    pub fn elected(&self) -> Option<NodeId> {
        self.elected
    }

    /// Record the coordinator this node settles on. The first decision
    /// is terminal; duplicates and late announcements are ignored.
    ///
    /// Returns `true` if this call decided the node.
    pub fn decide(&mut self, coordinator: NodeId) -> bool {
        if self.elected.is_some() {
            return false;
        }
        self.elected = Some(coordinator);
        true
    }

    /// Clear all mutable state for the next trial.
    pub fn reset(&mut self) {
        self.crashed = false;
        self.elected = None;
    }
}
