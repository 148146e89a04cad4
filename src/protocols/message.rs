//! Message types for the two election protocols.
//!
//! Each protocol speaks its own exhaustive tagged union; handler
//! dispatch is a pattern match, so adding a variant is a compile error
//! everywhere it matters. Messages are immutable once sent — the Ring
//! `Election` id list is copied on forward, never shared.

use crate::node::NodeId;

// ── Transactions (Ring) ───────────────────────────────────────────────

/// Identifier of one Ring election cycle.
///
/// A cycle is identified by the node that initiated it; concurrent
/// initiators run independent cycles distinguished by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct TransactionId(NodeId);

impl TransactionId {
    /// The cycle started by `initiator`.
    #[inline]
    pub fn new(initiator: NodeId) -> Self {
        TransactionId(initiator)
    }

    /// The node that initiated this cycle.
    #[inline]
    pub fn initiator(self) -> NodeId {
        self.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "X{}", self.0.raw())
    }
}

// ── Bully ─────────────────────────────────────────────────────────────

/// The two retransmitted broadcast rounds of unreliable Bully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum BullyRound {
    Election,
    Coordinator,
}

/// Messages exchanged during a Bully election.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum BullyMsg {
    /// Challenge to all higher ids. `sender: None` is the synthetic
    /// "coordinator crash detected" signal injected at the initiators.
    Election { sender: Option<NodeId> },
    /// "Stand down" from a higher node to a lower challenger.
    Ok { sender: NodeId },
    /// The sender announces itself as the new coordinator.
    Coordinator { sender: NodeId },
    /// Unreliable variant only: receipt acknowledgement, so the sender
    /// can retire the acknowledger from its retransmission set.
    Ack { kind: BullyRound, sender: NodeId },
}

impl std::fmt::Display for BullyMsg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BullyMsg::Election { sender: Some(s) } => write!(f, "ELECTION(from={})", s),
            BullyMsg::Election { sender: None } => write!(f, "ELECTION(crash-detected)"),
            BullyMsg::Ok { sender } => write!(f, "OK(from={})", sender),
            BullyMsg::Coordinator { sender } => write!(f, "COORDINATOR(from={})", sender),
            BullyMsg::Ack { kind, sender } => write!(f, "ACK({:?}, from={})", kind, sender),
        }
    }
}

// ── Ring ──────────────────────────────────────────────────────────────

/// The two acknowledged hop kinds of unreliable Ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum RingHop {
    Election,
    Coordinator,
}

/// Messages circulating around the logical ring.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum RingMsg {
    /// The election token, accumulating visited ids hop by hop.
    /// `sender: None` marks the synthetic seed delivered to an
    /// initiator; every forwarded copy carries its hop sender.
    Election {
        transaction: TransactionId,
        sender: Option<NodeId>,
        ids: Vec<NodeId>,
    },
    /// The result token: circulates until it returns to `initiator`.
    Coordinator {
        sender: NodeId,
        initiator: NodeId,
        elected: NodeId,
    },
    /// Unreliable variant only: per-hop stop-and-wait acknowledgement.
    Ack {
        kind: RingHop,
        transaction: TransactionId,
        sender: NodeId,
    },
}

impl RingMsg {
    /// The cycle this message belongs to.
    pub fn transaction(&self) -> TransactionId {
        match self {
            RingMsg::Election { transaction, .. } => *transaction,
            RingMsg::Coordinator { initiator, .. } => TransactionId::new(*initiator),
            RingMsg::Ack { transaction, .. } => *transaction,
        }
    }
}

impl std::fmt::Display for RingMsg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RingMsg::Election {
                transaction, ids, ..
            } => {
                write!(f, "ELECTION({}, ids=[", transaction)?;
                for (i, id) in ids.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", id.raw())?;
                }
                write!(f, "])")
            }
            RingMsg::Coordinator {
                initiator, elected, ..
            } => write!(f, "COORDINATOR(init={}, elected={})", initiator, elected),
            RingMsg::Ack {
                kind, transaction, ..
            } => write!(f, "ACK({:?}, {})", kind, transaction),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_identity() {
        let t = TransactionId::new(NodeId::new(2));
        assert_eq!(t.initiator(), NodeId::new(2));
        assert_eq!(format!("{}", t), "X2");
    }

    #[test]
    fn test_ring_msg_transaction() {
        let t = TransactionId::new(NodeId::new(1));
        let election = RingMsg::Election {
            transaction: t,
            sender: None,
            ids: vec![],
        };
        assert_eq!(election.transaction(), t);

        let coordinator = RingMsg::Coordinator {
            sender: NodeId::new(3),
            initiator: NodeId::new(1),
            elected: NodeId::new(3),
        };
        assert_eq!(coordinator.transaction(), t);
    }

    #[test]
    fn test_display() {
        let msg = BullyMsg::Election { sender: None };
        assert_eq!(format!("{}", msg), "ELECTION(crash-detected)");

        let msg = RingMsg::Election {
            transaction: TransactionId::new(NodeId::new(0)),
            sender: Some(NodeId::new(1)),
            ids: vec![NodeId::new(0), NodeId::new(1)],
        };
        assert_eq!(format!("{}", msg), "ELECTION(X0, ids=[0,1])");
    }
}
