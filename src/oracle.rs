//! Termination detection.
//!
//! The oracle is the single component allowed to end a run early. It is
//! signalled at most once per trial; later signals are ignored, so the
//! protocols can call it from every code path that completes a decision
//! without worrying about double-firing.

use crate::node::NodeId;

/// The final verdict of one election run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum ElectionOutcome {
    /// Every live node settled on the same coordinator.
    Agreed(NodeId),
    /// All live nodes decided, but not on the same coordinator. This is
    /// a legitimate, measurable outcome of reliable Bully under tight
    /// timeouts — data, not an error.
    Disagreement,
}

impl std::fmt::Display for ElectionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElectionOutcome::Agreed(id) => write!(f, "Agreed({})", id),
            ElectionOutcome::Disagreement => write!(f, "Disagreement"),
        }
    }
}

/// Once-only termination switch for a trial.
#[derive(Debug, Clone, Default)]
pub struct TerminationOracle {
    outcome: Option<ElectionOutcome>,
}

impl TerminationOracle {
    pub fn new() -> Self {
        TerminationOracle { outcome: None }
    }

    /// Record the run outcome. A no-op if already fired.
    pub fn signal(&mut self, outcome: ElectionOutcome) {
        if self.outcome.is_none() {
            self.outcome = Some(outcome);
        }
    }

    /// Returns `true` once the oracle has fired.
    pub fn fired(&self) -> bool {
        self.outcome.is_some()
    }

    /// The recorded outcome, if any.
    pub fn outcome(&self) -> Option<ElectionOutcome> {
        self.outcome
    }

    /// Re-arm for the next trial.
    pub fn reset(&mut self) {
        self.outcome = None;
    }
}

/// Evaluate agreement across the node set.
///
/// Crashed nodes are permanently excluded. Returns `None` while *any*
/// live node is still undecided — a split among the nodes decided so
/// far is not a verdict until everyone has spoken. Once all live nodes
/// hold a value: `Agreed` if uniform, `Disagreement` if not. An
/// all-crashed set also yields `None` — there is nobody left to agree.
pub fn consensus<I>(nodes: I) -> Option<ElectionOutcome>
where
    I: IntoIterator<Item = (bool, Option<NodeId>)>,
{
    let mut verdict: Option<NodeId> = None;
    let mut uniform = true;
    let mut live = 0usize;
    for (crashed, elected) in nodes {
        if crashed {
            continue;
        }
        live += 1;
        match elected {
            None => return None,
            Some(id) => match verdict {
                None => verdict = Some(id),
                Some(v) if v != id => uniform = false,
                Some(_) => {}
            },
        }
    }
    if live == 0 {
        return None;
    }
    if uniform {
        verdict.map(ElectionOutcome::Agreed)
    } else {
        Some(ElectionOutcome::Disagreement)
    }
}
