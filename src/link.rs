/// Simulated point-to-point link with exponential delays and packet loss.
///
/// Every message a protocol sends passes through the `Link`, which
/// samples a per-message latency from `Exp(1/delay_mean)` and, in lossy
/// configurations, decides at *delivery* time whether the message is
/// dropped. All sampling draws from a caller-owned seeded RNG, so a run
/// is fully reproducible from its seed.
///
/// The link also owns the message-complexity counters: every attempted
/// send is counted, including those later lost in transit.

use rand::Rng;

/// Static link parameters, fixed for the lifetime of a simulation.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkConfig {
    /// Mean of the exponential per-message delay, in ticks.
    pub delay_mean: f64,
    /// Probability that a message is lost in transit, [0.0, 1.0).
    pub loss_rate: f64,
    /// Quantile of the delay distribution used to size retransmission
    /// timeouts, (0.0, 1.0).
    pub timeout_quantile: f64,
}

/// Simulated link: delay sampling, delivery-time loss, send accounting.
///
/// The retransmission timeout `max_wait` is the inverse CDF of the delay
/// distribution at `timeout_quantile`, computed once at construction.
#[derive(Debug, Clone)]
pub struct Link {
    config: LinkConfig,
    /// Cached `Exp` quantile, in ticks.
    max_wait: u64,
    /// Sends attempted this trial, including messages later lost.
    sent: u64,
    /// Messages lost in transit this trial.
    dropped: u64,
}

impl Link {
    /// Create a link from its configuration.
    ///
    /// The caller is responsible for validating the configuration first
    /// (see [`crate::config::SimConfig::validate`]).
    pub fn new(config: LinkConfig) -> Self {
        // Inverse CDF of Exp(1/mean): -mean * ln(1 - q).
        let max_wait = (-config.delay_mean * (1.0 - config.timeout_quantile).ln()).round() as u64;
        Link {
            config,
            max_wait,
            sent: 0,
            dropped: 0,
        }
    }

    /// Sample a per-message delay in ticks and account one attempted send.
    pub fn sample_delay(&mut self, rng: &mut impl Rng) -> u64 {
        self.sent += 1;
        let u: f64 = rng.gen();
        (-self.config.delay_mean * (1.0 - u).ln()).round() as u64
    }

    /// Decide at delivery time whether a message survives the link.
    ///
    /// Draws independently per message (and per retransmitted copy).
    /// Always `true` when the loss rate is zero.
    pub fn deliverable(&mut self, rng: &mut impl Rng) -> bool {
        if self.config.loss_rate <= 0.0 {
            return true;
        }
        let lost = rng.gen::<f64>() < self.config.loss_rate;
        if lost {
            self.dropped += 1;
        }
        !lost
    }

    /// The cached quantile-derived timeout, in ticks.
    pub fn max_wait(&self) -> u64 {
        self.max_wait
    }

    /// Sends attempted this trial, including lost messages.
    pub fn messages_sent(&self) -> u64 {
        self.sent
    }

    /// Messages lost in transit this trial.
    pub fn messages_dropped(&self) -> u64 {
        self.dropped
    }

    /// Access the configuration.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Reset the per-trial counters. Called between Monte-Carlo trials;
    /// the RNG stream deliberately continues across trials.
    pub fn reset_counters(&mut self) {
        self.sent = 0;
        self.dropped = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn link(delay_mean: f64, loss_rate: f64, quantile: f64) -> Link {
        Link::new(LinkConfig {
            delay_mean,
            loss_rate,
            timeout_quantile: quantile,
        })
    }

    #[test]
    fn test_max_wait_matches_inverse_cdf() {
        // -110 * ln(1 - 0.99) ≈ 506.6
        let l = link(110.0, 0.0, 0.99);
        assert_eq!(l.max_wait(), 507);

        // -110 * ln(1 - 0.7) ≈ 132.4
        let l = link(110.0, 0.0, 0.7);
        assert_eq!(l.max_wait(), 132);
    }

    #[test]
    fn test_delay_sampling_is_deterministic() {
        fn sample(seed: u64) -> Vec<u64> {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut l = link(110.0, 0.0, 0.99);
            (0..50).map(|_| l.sample_delay(&mut rng)).collect()
        }

        assert_eq!(sample(42), sample(42));
        assert_ne!(sample(42), sample(43));
    }

    #[test]
    fn test_delay_mean_roughly_matches() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut l = link(110.0, 0.0, 0.99);
        let n = 10_000u64;
        let total: u64 = (0..n).map(|_| l.sample_delay(&mut rng)).sum();
        let mean = total as f64 / n as f64;
        // Allow generous margin for randomness.
        assert!(
            (90.0..130.0).contains(&mean),
            "Sample mean {} too far from 110",
            mean
        );
    }

    #[test]
    fn test_zero_loss_never_drops() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut l = link(110.0, 0.0, 0.99);
        for _ in 0..1000 {
            assert!(l.deliverable(&mut rng));
        }
        assert_eq!(l.messages_dropped(), 0);
    }

    #[test]
    fn test_loss_rate_roughly_matches() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut l = link(110.0, 0.5, 0.99);
        let mut lost = 0u32;
        for _ in 0..1000 {
            if !l.deliverable(&mut rng) {
                lost += 1;
            }
        }
        assert!(
            (350..650).contains(&lost),
            "Loss count {} outside expected range for p=0.5",
            lost
        );
        assert_eq!(l.messages_dropped() as u32, lost);
    }

    #[test]
    fn test_send_counter_includes_lost_messages() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut l = link(110.0, 0.9, 0.99);
        for _ in 0..100 {
            l.sample_delay(&mut rng);
            l.deliverable(&mut rng);
        }
        assert_eq!(l.messages_sent(), 100);
        assert!(l.messages_dropped() > 0);

        l.reset_counters();
        assert_eq!(l.messages_sent(), 0);
        assert_eq!(l.messages_dropped(), 0);
    }
}
