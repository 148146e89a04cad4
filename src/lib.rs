//! # Caucus — Deterministic Leader-Election Simulator
//!
//! A discrete-event simulation core for studying leader election under
//! message delay, loss, and node crashes. No async, no threads, no
//! wall-clock time — just protocol state machines driven by a virtual
//! clock, fully reproducible from a single seed.
//!
//! Two protocols are provided, each in a reliable and an unreliable
//! (lossy, acknowledged, retransmitting) variant:
//!
//! - **Bully** ([`BullySim`]): every node challenges all higher ids and
//!   announces itself coordinator if nobody objects in time.
//! - **Ring** ([`RingSim`]): an election token circulates a logical
//!   ring, collecting ids, until the cycle closes on the maximum.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────┐
//! │   BullySim / RingSim      │ ← protocol state machines
//! │  ┌─────────┐ ┌─────────┐  │
//! │  │  Link   │ │ Oracle  │  │ ← delays, loss / termination
//! │  └─────────┘ └─────────┘  │
//! │  ┌─────────────────────┐  │
//! │  │     Simulation      │  │ ← execution loop
//! │  │  ┌───────────────┐  │  │
//! │  │  │   Scheduler   │  │  │ ← deterministic min-heap
//! │  │  └───────────────┘  │  │
//! │  │  ┌───────────────┐  │  │
//! │  │  │  VirtualTime  │  │  │ ← logical clock
//! │  │  └───────────────┘  │  │
//! │  └─────────────────────┘  │
//! └───────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use caucus::{BullySim, LinkMode, SimConfig, VirtualTime};
//!
//! let config = SimConfig {
//!     nodes: 5,
//!     delay_mean: 110.0,
//!     timeout_quantile: 0.99,
//!     initiators: 1,
//!     mode: LinkMode::Reliable,
//!     trace: false,
//! };
//! let mut sim = BullySim::new(config, 42)?;
//! let report = sim.run_trial()?;
//! println!("elected: {}", report.outcome);
//! assert!(report.turnaround > VirtualTime::ZERO);
//! # Ok::<(), caucus::ConfigError>(())
//! ```

pub mod config;
pub mod event;
pub mod link;
pub mod node;
pub mod oracle;
pub mod protocols;
pub mod report;
pub mod scheduler;
pub mod sim;
pub mod time;

// Re-exports for convenience.
pub use config::{ConfigError, LinkMode, SimConfig};
pub use event::{Event, EventId, EventIdGen};
pub use link::{Link, LinkConfig};
pub use node::NodeId;
pub use oracle::{consensus, ElectionOutcome, TerminationOracle};
pub use protocols::{BullySim, RingSim};
pub use report::{RunReport, TraceEntry};
pub use scheduler::Scheduler;
pub use sim::{EventHandler, Simulation, SimulationContext};
pub use time::VirtualTime;
