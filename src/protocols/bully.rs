//! Bully leader election over the simulation kernel.
//!
//! Every node challenges all higher ids; a higher node answers `OK` to
//! push the challenger into the `Blocked` state, and a node that hears
//! no `OK` within `2 × max_wait` announces itself coordinator. The
//! unreliable variant layers per-round acknowledgement sets and
//! retransmission timers on the same state machine.
//!
//! The per-node coroutine of the classic formulation ("broadcast, then
//! sleep, then decide") is flattened into explicit state plus timeout
//! callbacks: `WaitExpired` is the reliable decision point, `RoundTick`
//! the recurring unreliable retransmission/decision point.

use std::collections::BTreeSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

use crate::config::{ConfigError, SimConfig};
use crate::event::Event;
use crate::link::Link;
use crate::node::{NodeCore, NodeId};
use crate::oracle::{consensus, TerminationOracle};
use crate::protocols::message::{BullyMsg, BullyRound};
use crate::report::{RunReport, TraceEntry};
use crate::sim::{EventHandler, Simulation, SimulationContext};
use crate::time::VirtualTime;

// ── Actions ───────────────────────────────────────────────────────────

/// Everything the scheduler can do to a Bully simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BullyAction {
    /// Deliver a message to a node.
    Deliver { to: NodeId, msg: BullyMsg },
    /// Reliable variant: the `2 × max_wait` announcement wait ran out.
    WaitExpired { node: NodeId },
    /// Unreliable variant: recurring retransmission/decision tick for
    /// the node's active broadcast round.
    RoundTick { node: NodeId, round: BullyRound },
}

impl std::fmt::Display for BullyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BullyAction::Deliver { to, msg } => write!(f, "Deliver({} ← {})", to, msg),
            BullyAction::WaitExpired { node } => write!(f, "WaitExpired({})", node),
            BullyAction::RoundTick { node, round } => {
                write!(f, "RoundTick({}, {:?})", node, round)
            }
        }
    }
}

// ── Node state ────────────────────────────────────────────────────────

/// Election phase of a single Bully node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BullyState {
    /// Not yet drawn into the election.
    Idle,
    /// Broadcast its challenge and is waiting out the announcement timer.
    ElectionInProgress,
    /// Received `OK` from a higher node; waiting for its `COORDINATOR`.
    Blocked,
    /// Settled on a coordinator (possibly itself).
    Decided,
}

#[derive(Debug, Clone)]
struct BullyNode {
    core: NodeCore,
    state: BullyState,
    /// Peers that have not yet acknowledged the active broadcast round.
    missing_ack: BTreeSet<NodeId>,
    /// Which round `missing_ack` belongs to, if any.
    active_round: Option<BullyRound>,
    /// Highest sender id ever observed. A node that has seen a higher
    /// candidate never starts its own round (unreliable variant).
    max_active_id: Option<NodeId>,
}

impl BullyNode {
    fn new(id: NodeId) -> Self {
        BullyNode {
            core: NodeCore::new(id),
            state: BullyState::Idle,
            missing_ack: BTreeSet::new(),
            active_round: None,
            max_active_id: None,
        }
    }

    fn reset(&mut self) {
        self.core.reset();
        self.state = BullyState::Idle;
        self.missing_ack.clear();
        self.active_round = None;
        self.max_active_id = None;
    }

    fn observe(&mut self, sender: NodeId) {
        if self.max_active_id < Some(sender) {
            self.max_active_id = Some(sender);
        }
    }
}

// ── Simulation ────────────────────────────────────────────────────────

/// A Bully election simulation: the node arena, the link, and the
/// termination oracle. One instance supports any number of Monte-Carlo
/// trials; nodes are reset in place between trials and the RNG stream
/// continues, so the whole trial sequence is reproducible from one seed.
pub struct BullySim {
    config: SimConfig,
    nodes: Vec<BullyNode>,
    link: Link,
    rng: ChaCha8Rng,
    oracle: TerminationOracle,
    trace: Vec<TraceEntry<BullyAction>>,
}

impl BullySim {
    /// Build a simulation from a validated configuration and a seed.
    pub fn new(config: SimConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let nodes = (0..config.nodes as u64)
            .map(|i| BullyNode::new(NodeId::new(i)))
            .collect();
        let link = Link::new(config.link_config());
        Ok(BullySim {
            config,
            nodes,
            link,
            rng: ChaCha8Rng::seed_from_u64(seed),
            oracle: TerminationOracle::new(),
            trace: Vec::new(),
        })
    }

    /// The configuration this simulation was built from.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The coordinator node `id` has settled on, if any.
    pub fn elected(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.index()).and_then(|n| n.core.elected())
    }

    /// The recorded event trace of the last trial (empty unless
    /// `config.trace` is set).
    pub fn trace(&self) -> &[TraceEntry<BullyAction>] {
        &self.trace
    }

    /// Run one trial with initiators drawn at random from the live nodes.
    pub fn run_trial(&mut self) -> Result<RunReport, ConfigError> {
        self.setup_trial();
        let initiators = self.pick_initiators();
        Ok(self.run_prepared(&initiators))
    }

    /// Run one trial with driver-chosen initiators.
    pub fn run_trial_with(&mut self, initiators: &[NodeId]) -> Result<RunReport, ConfigError> {
        self.setup_trial();
        let mut seen = BTreeSet::new();
        for &id in initiators {
            if id.index() >= self.nodes.len() {
                return Err(ConfigError::InitiatorOutOfRange {
                    id: id.raw(),
                    nodes: self.nodes.len(),
                });
            }
            if self.nodes[id.index()].core.is_crashed() {
                return Err(ConfigError::InitiatorCrashed { id: id.raw() });
            }
            if !seen.insert(id) {
                return Err(ConfigError::DuplicateInitiator { id: id.raw() });
            }
        }
        Ok(self.run_prepared(initiators))
    }

    /// Reset every node, re-crash the coordinator, clear counters.
    fn setup_trial(&mut self) {
        for node in &mut self.nodes {
            node.reset();
        }
        // Scenario setup: the highest id is the crashed coordinator.
        if let Some(coordinator) = self.nodes.last_mut() {
            coordinator.core.crash();
        }
        self.link.reset_counters();
        self.oracle.reset();
        self.trace.clear();
    }

    /// Draw distinct random non-crashed initiators, retrying collisions
    /// the way the validation bound guarantees will terminate.
    fn pick_initiators(&mut self) -> Vec<NodeId> {
        let mut picks: Vec<NodeId> = Vec::with_capacity(self.config.initiators);
        while picks.len() < self.config.initiators {
            let candidate = NodeId::new(self.rng.gen_range(0..self.nodes.len() as u64));
            if self.nodes[candidate.index()].core.is_crashed() || picks.contains(&candidate) {
                continue;
            }
            picks.push(candidate);
        }
        picks
    }

    /// Inject the synthetic crash-detected signals and run to termination.
    fn run_prepared(&mut self, initiators: &[NodeId]) -> RunReport {
        debug!(initiators = ?initiators, "Bully election starts");
        let mut kernel: Simulation<BullyAction> = Simulation::new();
        for &id in initiators {
            kernel.schedule(
                VirtualTime::ZERO,
                BullyAction::Deliver {
                    to: id,
                    msg: BullyMsg::Election { sender: None },
                },
            );
        }
        kernel.run(self);

        // The oracle fires on the path that decides the last live node.
        // A drained queue without it would mean a live node was left
        // permanently undecided.
        let outcome = match self.oracle.outcome() {
            Some(outcome) => outcome,
            None => consensus(self.verdicts())
                .expect("event queue drained with a live node undecided"),
        };
        debug!(%outcome, at = kernel.current_time().ticks(), "Bully election terminated");
        RunReport {
            turnaround: kernel.current_time(),
            messages_sent: self.link.messages_sent(),
            outcome,
        }
    }

    fn verdicts(&self) -> impl Iterator<Item = (bool, Option<NodeId>)> + '_ {
        self.nodes
            .iter()
            .map(|n| (n.core.is_crashed(), n.core.elected()))
    }

    fn unreliable(&self) -> bool {
        self.config.mode.is_unreliable()
    }

    /// Send through the link. A send to a crashed node is a silent no-op
    /// and is not counted.
    fn send(&mut self, ctx: &mut SimulationContext<'_, BullyAction>, to: NodeId, msg: BullyMsg) {
        if self.nodes[to.index()].core.is_crashed() {
            return;
        }
        let delay = self.link.sample_delay(&mut self.rng);
        trace!(%to, %msg, delay, "send");
        ctx.schedule_after(delay, BullyAction::Deliver { to, msg });
    }

    // ── Handlers ──────────────────────────────────────────────────

    fn on_deliver(
        &mut self,
        ctx: &mut SimulationContext<'_, BullyAction>,
        to: NodeId,
        msg: &BullyMsg,
    ) {
        // Loss strikes the broadcast rounds at delivery time; control
        // replies (OK/ACK) ride the return path unharmed, as in the
        // ring variant's hop/ack model. The sender-less crash-detected
        // signal is a local observation at the initiator, not a link
        // message, so it is never subject to loss.
        if self.unreliable()
            && matches!(
                msg,
                BullyMsg::Election { sender: Some(_) } | BullyMsg::Coordinator { .. }
            )
            && !self.link.deliverable(&mut self.rng)
        {
            trace!(%to, %msg, "lost in transit");
            return;
        }

        match msg {
            BullyMsg::Election { sender } => self.on_election(ctx, to, *sender),
            BullyMsg::Ok { sender } => self.on_ok(to, *sender),
            BullyMsg::Coordinator { sender } => self.on_coordinator(ctx, to, *sender),
            BullyMsg::Ack { kind, sender } => self.on_ack(to, *kind, *sender),
        }
    }

    fn on_election(
        &mut self,
        ctx: &mut SimulationContext<'_, BullyAction>,
        to: NodeId,
        sender: Option<NodeId>,
    ) {
        match sender {
            None => debug!(node = %to, "detected coordinator crash"),
            Some(s) => {
                debug!(node = %to, from = %s, "receives ELECTION");
                // A challenge from an equal or higher id never happens:
                // elections only travel upward.
                if s >= to {
                    return;
                }
                self.nodes[to.index()].observe(s);
                if self.unreliable() {
                    self.send(
                        ctx,
                        s,
                        BullyMsg::Ack {
                            kind: BullyRound::Election,
                            sender: to,
                        },
                    );
                }
                // Tell the lower challenger to stand down.
                self.send(ctx, s, BullyMsg::Ok { sender: to });
            }
        }

        if self.nodes[to.index()].state != BullyState::Idle {
            return;
        }
        if self.unreliable() && self.nodes[to.index()].max_active_id > Some(to) {
            // Already aware of a higher candidate: starting a round of
            // our own would be redundant.
            debug!(node = %to, "skips own election round");
            return;
        }

        self.nodes[to.index()].state = BullyState::ElectionInProgress;
        let higher: Vec<NodeId> = ((to.raw() + 1)..self.nodes.len() as u64)
            .map(NodeId::new)
            .filter(|id| !self.nodes[id.index()].core.is_crashed())
            .collect();
        for &peer in &higher {
            self.send(ctx, peer, BullyMsg::Election { sender: Some(to) });
        }

        let wait = 2 * self.link.max_wait();
        if self.unreliable() {
            let node = &mut self.nodes[to.index()];
            node.active_round = Some(BullyRound::Election);
            node.missing_ack = higher.into_iter().collect();
            ctx.schedule_after(
                wait,
                BullyAction::RoundTick {
                    node: to,
                    round: BullyRound::Election,
                },
            );
        } else {
            ctx.schedule_after(wait, BullyAction::WaitExpired { node: to });
        }
    }

    fn on_ok(&mut self, to: NodeId, sender: NodeId) {
        debug!(node = %to, from = %sender, "receives OK");
        let node = &mut self.nodes[to.index()];
        node.observe(sender);
        if node.state == BullyState::ElectionInProgress {
            node.state = BullyState::Blocked;
        }
        // A higher node is fighting the election; stop retransmitting
        // our own challenge.
        if node.active_round == Some(BullyRound::Election) {
            node.active_round = None;
            node.missing_ack.clear();
        }
    }

    fn on_coordinator(
        &mut self,
        ctx: &mut SimulationContext<'_, BullyAction>,
        to: NodeId,
        sender: NodeId,
    ) {
        debug!(node = %to, coordinator = %sender, "receives COORDINATOR");
        self.nodes[to.index()].observe(sender);
        if self.unreliable() {
            self.send(
                ctx,
                sender,
                BullyMsg::Ack {
                    kind: BullyRound::Coordinator,
                    sender: to,
                },
            );
        }
        let node = &mut self.nodes[to.index()];
        let decided = node.core.decide(sender);
        node.state = BullyState::Decided;
        if decided {
            self.check_termination(ctx);
        }
    }

    fn on_ack(&mut self, to: NodeId, kind: BullyRound, sender: NodeId) {
        let node = &mut self.nodes[to.index()];
        // Any acknowledger is an observed live peer — an ack from a
        // higher id is the "higher-id information" that supersedes our
        // own candidacy.
        node.observe(sender);
        if node.active_round == Some(kind) {
            node.missing_ack.remove(&sender);
        }
    }

    /// Reliable decision point: announce unless an `OK` blocked us.
    fn on_wait_expired(&mut self, ctx: &mut SimulationContext<'_, BullyAction>, node: NodeId) {
        if self.nodes[node.index()].state == BullyState::ElectionInProgress {
            self.announce(ctx, node);
        }
    }

    /// Unreliable retransmission/decision tick.
    fn on_round_tick(
        &mut self,
        ctx: &mut SimulationContext<'_, BullyAction>,
        node: NodeId,
        round: BullyRound,
    ) {
        if self.nodes[node.index()].active_round != Some(round) {
            return;
        }
        if self.nodes[node.index()].max_active_id > Some(node) {
            // Superseded: a higher node is alive and active.
            let n = &mut self.nodes[node.index()];
            n.active_round = None;
            n.missing_ack.clear();
            return;
        }
        if self.nodes[node.index()].missing_ack.is_empty() {
            self.nodes[node.index()].active_round = None;
            if round == BullyRound::Election
                && self.nodes[node.index()].state == BullyState::ElectionInProgress
            {
                // Everyone higher is crashed or silent, nobody objected:
                // the round is ours.
                self.announce(ctx, node);
            }
            return;
        }

        let msg = match round {
            BullyRound::Election => BullyMsg::Election { sender: Some(node) },
            BullyRound::Coordinator => BullyMsg::Coordinator { sender: node },
        };
        let targets: Vec<NodeId> = self.nodes[node.index()].missing_ack.iter().copied().collect();
        trace!(%node, ?round, pending = targets.len(), "retransmits");
        for &peer in &targets {
            self.send(ctx, peer, msg.clone());
        }
        ctx.schedule_after(2 * self.link.max_wait(), BullyAction::RoundTick { node, round });
    }

    /// Broadcast `COORDINATOR(self)` and mark self decided.
    fn announce(&mut self, ctx: &mut SimulationContext<'_, BullyAction>, me: NodeId) {
        debug!(node = %me, "announces itself as coordinator");
        let node = &mut self.nodes[me.index()];
        node.state = BullyState::Decided;
        node.core.decide(me);

        let peers: Vec<NodeId> = (0..self.nodes.len() as u64)
            .map(NodeId::new)
            .filter(|&id| id != me && !self.nodes[id.index()].core.is_crashed())
            .collect();
        for &peer in &peers {
            self.send(ctx, peer, BullyMsg::Coordinator { sender: me });
        }
        if self.unreliable() {
            let node = &mut self.nodes[me.index()];
            node.active_round = Some(BullyRound::Coordinator);
            node.missing_ack = peers.into_iter().collect();
            ctx.schedule_after(
                2 * self.link.max_wait(),
                BullyAction::RoundTick {
                    node: me,
                    round: BullyRound::Coordinator,
                },
            );
        }
        self.check_termination(ctx);
    }

    fn check_termination(&mut self, ctx: &mut SimulationContext<'_, BullyAction>) {
        if self.oracle.fired() {
            return;
        }
        if let Some(outcome) = consensus(self.verdicts()) {
            debug!(%outcome, "all live nodes decided");
            self.oracle.signal(outcome);
            ctx.stop();
        }
    }
}

impl EventHandler<BullyAction> for BullySim {
    fn handle(&mut self, ctx: &mut SimulationContext<'_, BullyAction>, event: &Event<BullyAction>) {
        if self.config.trace {
            self.trace.push(TraceEntry {
                time: ctx.now(),
                event_id: event.id,
                payload: event.payload.clone(),
            });
        }
        match &event.payload {
            BullyAction::Deliver { to, msg } => self.on_deliver(ctx, *to, msg),
            BullyAction::WaitExpired { node } => self.on_wait_expired(ctx, *node),
            BullyAction::RoundTick { node, round } => self.on_round_tick(ctx, *node, *round),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LinkMode;
    use crate::oracle::ElectionOutcome;

    fn config(nodes: usize, quantile: f64, mode: LinkMode) -> SimConfig {
        SimConfig {
            nodes,
            delay_mean: 110.0,
            timeout_quantile: quantile,
            initiators: 1,
            mode,
            trace: false,
        }
    }

    fn id(raw: u64) -> NodeId {
        NodeId::new(raw)
    }

    #[test]
    fn test_reliable_five_node_scenario() {
        // 5 nodes, node 4 crashed, node 0 initiates. Node 3 is the
        // highest live id and must win everywhere.
        let mut sim = BullySim::new(config(5, 0.99, LinkMode::Reliable), 0xB011).unwrap();
        let report = sim.run_trial_with(&[id(0)]).unwrap();

        assert_eq!(report.outcome, ElectionOutcome::Agreed(id(3)));
        for i in 0..4 {
            assert_eq!(sim.elected(id(i)), Some(id(3)));
        }
        // ELECTION: 0→{1,2,3}, 1→{2,3}, 2→{3} = 6.
        // OK: one per received ELECTION with a real sender = 6.
        // COORDINATOR: 3→{0,1,2} = 3.
        assert_eq!(report.messages_sent, 15);
        assert!(report.turnaround > VirtualTime::ZERO);
    }

    #[test]
    fn test_sole_live_node_elects_itself() {
        // N=2 with the coordinator crashed: node 0 finds no higher live
        // peer and needs no messages at all.
        let mut sim = BullySim::new(config(2, 0.99, LinkMode::Reliable), 7).unwrap();
        let report = sim.run_trial_with(&[id(0)]).unwrap();

        assert_eq!(report.outcome, ElectionOutcome::Agreed(id(0)));
        assert_eq!(report.messages_sent, 0);

        let mut sim = BullySim::new(config(2, 0.99, LinkMode::Unreliable { loss_rate: 0.5 }), 7)
            .unwrap();
        let report = sim.run_trial_with(&[id(0)]).unwrap();
        assert_eq!(report.outcome, ElectionOutcome::Agreed(id(0)));
        assert_eq!(report.messages_sent, 0);
    }

    #[test]
    fn test_reliable_always_reaches_a_verdict() {
        // Under a tight quantile the wait is shorter than typical round
        // trips, so self-announcements race and disagreement becomes a
        // legitimate outcome — but every trial must still terminate with
        // every live node decided.
        let mut cfg = config(5, 0.3, LinkMode::Reliable);
        cfg.initiators = 2;
        let mut sim = BullySim::new(cfg, 99).unwrap();

        for _ in 0..20 {
            let report = sim.run_trial().unwrap();
            assert!(matches!(
                report.outcome,
                ElectionOutcome::Agreed(_) | ElectionOutcome::Disagreement
            ));
            for i in 0..4 {
                assert!(sim.elected(id(i)).is_some(), "node {} left undecided", i);
            }
        }
    }

    #[test]
    fn test_unreliable_zero_loss_agrees_on_highest_live() {
        // With acknowledgements in play only the highest live node can
        // ever announce, so the outcome is agreement regardless of
        // timing.
        let mut sim = BullySim::new(config(5, 0.99, LinkMode::Unreliable { loss_rate: 0.0 }), 21)
            .unwrap();
        for _ in 0..10 {
            let report = sim.run_trial().unwrap();
            assert_eq!(report.outcome, ElectionOutcome::Agreed(id(3)));
        }
    }

    #[test]
    fn test_unreliable_converges_under_loss() {
        let mut sim = BullySim::new(config(5, 0.9, LinkMode::Unreliable { loss_rate: 0.3 }), 4242)
            .unwrap();
        for _ in 0..5 {
            let report = sim.run_trial().unwrap();
            assert_eq!(report.outcome, ElectionOutcome::Agreed(id(3)));
            for i in 0..4 {
                assert_eq!(sim.elected(id(i)), Some(id(3)));
            }
        }
    }

    #[test]
    fn test_duplicate_deliveries_do_not_change_outcome() {
        // Heavy loss forces many retransmissions, hence many duplicate
        // ELECTION/COORDINATOR deliveries. The verdict must not budge.
        let mut sim = BullySim::new(config(4, 0.9, LinkMode::Unreliable { loss_rate: 0.5 }), 5)
            .unwrap();
        let report = sim.run_trial_with(&[id(0)]).unwrap();
        assert_eq!(report.outcome, ElectionOutcome::Agreed(id(2)));
        // Loss means retransmission: strictly more traffic than the
        // loss-free minimum of one challenge round plus replies.
        assert!(report.messages_sent > 0);
    }

    #[test]
    fn test_crash_signal_survives_lossy_links() {
        // The crash-detected signal is a local observation at the
        // initiator, not a link message: no loss rate may keep the
        // election from starting at all.
        let mut sim = BullySim::new(config(5, 0.99, LinkMode::Unreliable { loss_rate: 0.5 }), 1)
            .unwrap();
        let report = sim.run_trial_with(&[id(0)]).unwrap();
        assert_eq!(report.outcome, ElectionOutcome::Agreed(id(3)));
        assert!(report.messages_sent > 0);
    }

    #[test]
    fn test_repeated_trials_reset_cleanly() {
        let mut cfg = config(5, 0.99, LinkMode::Reliable);
        cfg.trace = true;
        let mut sim = BullySim::new(cfg, 11).unwrap();

        let first = sim.run_trial_with(&[id(0)]).unwrap();
        let first_trace = sim.trace().len();
        assert!(first_trace > 0);

        let second = sim.run_trial_with(&[id(0)]).unwrap();
        assert_eq!(first.outcome, second.outcome);
        // Fresh trial, fresh trace and counters.
        assert!(!sim.trace().is_empty());
        assert_eq!(second.messages_sent, 15);
    }

    #[test]
    fn test_initiator_validation() {
        let mut sim = BullySim::new(config(5, 0.99, LinkMode::Reliable), 1).unwrap();

        assert_eq!(
            sim.run_trial_with(&[id(9)]),
            Err(ConfigError::InitiatorOutOfRange { id: 9, nodes: 5 })
        );
        // Node 4 is the crashed coordinator.
        assert_eq!(
            sim.run_trial_with(&[id(4)]),
            Err(ConfigError::InitiatorCrashed { id: 4 })
        );
        assert_eq!(
            sim.run_trial_with(&[id(1), id(1)]),
            Err(ConfigError::DuplicateInitiator { id: 1 })
        );
    }

    #[test]
    fn test_invalid_config_is_rejected_up_front() {
        let cfg = config(1, 0.99, LinkMode::Reliable);
        assert!(matches!(
            BullySim::new(cfg, 0),
            Err(ConfigError::TooFewNodes { .. })
        ));
    }
}
