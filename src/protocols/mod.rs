//! Leader-election protocols built on the simulation kernel.
//!
//! Each protocol is a self-contained state machine implementing
//! [`crate::sim::EventHandler`] over its own action enum. The kernel
//! stays protocol-agnostic; everything election-specific lives here.

pub mod bully;
pub mod message;
pub mod ring;

pub use bully::{BullyAction, BullySim, BullyState};
pub use message::{BullyMsg, BullyRound, RingHop, RingMsg, TransactionId};
pub use ring::{RingAction, RingSim};
