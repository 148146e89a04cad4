/// Run configuration and up-front validation.
///
/// Every parameter a driver can set lives in [`SimConfig`]. Validation
/// happens before any event is scheduled: an invalid configuration is
/// reported to the caller as a [`ConfigError`] and no partial run occurs.

use thiserror::Error;

use crate::link::LinkConfig;

/// Link reliability mode.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum LinkMode {
    /// Delayed but lossless links; protocols run without acknowledgements.
    Reliable,
    /// Links additionally lose messages with the given probability;
    /// protocols run their retransmission/acknowledgement variants.
    Unreliable {
        /// Per-message loss probability, [0.0, 1.0).
        loss_rate: f64,
    },
}

impl LinkMode {
    /// The loss probability implied by this mode.
    pub fn loss_rate(self) -> f64 {
        match self {
            LinkMode::Reliable => 0.0,
            LinkMode::Unreliable { loss_rate } => loss_rate,
        }
    }

    /// Returns `true` for the unreliable variant.
    pub fn is_unreliable(self) -> bool {
        matches!(self, LinkMode::Unreliable { .. })
    }
}

/// Configuration for one election simulation.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SimConfig {
    /// Number of nodes, ids 0..nodes-1. The highest id is the crashed
    /// coordinator at scenario setup.
    pub nodes: usize,
    /// Mean of the exponential link delay, in ticks.
    pub delay_mean: f64,
    /// Quantile of the delay distribution used to size timeouts, (0, 1).
    pub timeout_quantile: f64,
    /// Number of nodes that detect the crash and initiate an election.
    pub initiators: usize,
    /// Link reliability mode.
    pub mode: LinkMode,
    /// Record a structured per-trial event trace.
    pub trace: bool,
}

impl SimConfig {
    /// Validate the configuration before a run starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nodes < 2 {
            return Err(ConfigError::TooFewNodes { nodes: self.nodes });
        }
        // The crashed coordinator cannot initiate.
        if self.initiators == 0 {
            return Err(ConfigError::NoInitiators);
        }
        if self.initiators > self.nodes - 1 {
            return Err(ConfigError::TooManyInitiators {
                requested: self.initiators,
                available: self.nodes - 1,
            });
        }
        if !(self.delay_mean > 0.0) {
            return Err(ConfigError::NonPositiveDelay {
                delay_mean: self.delay_mean,
            });
        }
        if !(self.timeout_quantile > 0.0 && self.timeout_quantile < 1.0) {
            return Err(ConfigError::QuantileOutOfRange {
                quantile: self.timeout_quantile,
            });
        }
        let loss = self.mode.loss_rate();
        if !(0.0..1.0).contains(&loss) {
            return Err(ConfigError::LossRateOutOfRange { loss_rate: loss });
        }
        Ok(())
    }

    /// Derive the link parameters from this configuration.
    pub fn link_config(&self) -> LinkConfig {
        LinkConfig {
            delay_mean: self.delay_mean,
            loss_rate: self.mode.loss_rate(),
            timeout_quantile: self.timeout_quantile,
        }
    }
}

/// A configuration the driver handed us cannot produce a valid run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// An election needs at least two nodes (one of which starts crashed).
    #[error("at least 2 nodes are required, got {nodes}")]
    TooFewNodes { nodes: usize },

    /// Nobody would ever detect the coordinator crash.
    #[error("at least one initiator is required")]
    NoInitiators,

    /// More initiators requested than non-coordinator nodes exist.
    #[error("{requested} initiators requested but only {available} non-coordinator nodes exist")]
    TooManyInitiators { requested: usize, available: usize },

    /// The delay distribution needs a positive mean.
    #[error("link delay mean must be positive, got {delay_mean}")]
    NonPositiveDelay { delay_mean: f64 },

    /// The timeout quantile must lie strictly inside (0, 1).
    #[error("timeout quantile must be in (0, 1), got {quantile}")]
    QuantileOutOfRange { quantile: f64 },

    /// A loss rate of 1.0 (or more) can never deliver anything.
    #[error("loss rate must be in [0, 1), got {loss_rate}")]
    LossRateOutOfRange { loss_rate: f64 },

    /// A driver-supplied initiator id does not exist.
    #[error("initiator id {id} is out of range for {nodes} nodes")]
    InitiatorOutOfRange { id: u64, nodes: usize },

    /// A driver-supplied initiator is the crashed coordinator.
    #[error("initiator id {id} is crashed and cannot initiate")]
    InitiatorCrashed { id: u64 },

    /// The same initiator was supplied twice.
    #[error("initiator id {id} appears more than once")]
    DuplicateInitiator { id: u64 },
}
