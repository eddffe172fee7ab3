//! Auction tuning.

use crate::SettlementPolicy;

/// Configuration shared by both auction variants.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AuctionConfig {
    /// Ticks between announcement and settlement.
    pub round_ticks: u64,

    /// Agents with a larger translational error neither announce nor bid.
    pub error_threshold: f64,

    /// Free agents ignore push announcements from farther away than this.
    pub sensor_range: f64,

    /// Multiplier applied to distance to get a bid's cost.
    pub cost_scale: f64,

    /// Ticks a free agent waits after spawning or after its last round before announcing.
    pub readiness_ticks: u64,

    /// How the winner is chosen from received bids.
    pub policy: SettlementPolicy,
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            round_ticks: 3,
            error_threshold: 0.02,
            sensor_range: 2.0,
            cost_scale: 1.0,
            readiness_ticks: 1,
            policy: SettlementPolicy::MinCost,
        }
    }
}

impl AuctionConfig {
    /// Set the round length.
    #[must_use]
    pub fn with_round_ticks(mut self, ticks: u64) -> Self {
        self.round_ticks = ticks;
        self
    }

    /// Set the error threshold.
    #[must_use]
    pub fn with_error_threshold(mut self, threshold: f64) -> Self {
        self.error_threshold = threshold;
        self
    }

    /// Set the push sensor range.
    #[must_use]
    pub fn with_sensor_range(mut self, range: f64) -> Self {
        self.sensor_range = range;
        self
    }

    /// Set the insertion readiness delay.
    #[must_use]
    pub fn with_readiness_ticks(mut self, ticks: u64) -> Self {
        self.readiness_ticks = ticks;
        self
    }

    /// Set the settlement policy.
    #[must_use]
    pub fn with_policy(mut self, policy: SettlementPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Cost of a bid at `distance`.
    #[inline]
    pub fn cost(&self, distance: f64) -> f64 {
        self.cost_scale * distance
    }
}
