//! Simulation configuration.

use chainform_auction::AuctionConfig;
use chainform_formation::{DVec2, FormationDescriptor, ShapePreset, DEFAULT_HEADING, DEFAULT_SPACING};
use chainform_topology::AgentId;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Default agent body radius.
pub const DEFAULT_AGENT_RADIUS: f64 = 0.03;

/// How free agents get recruited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecruitmentMode {
    /// Chain ends announce their open slot to free agents.
    #[default]
    Push,
    /// Free agents announce themselves to the chain.
    Insertion,
}

/// Target shape parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormationConfig {
    pub shape: ShapePreset,
    /// Spacing between neighbors.
    pub radius: f64,
    /// Heading in degrees.
    pub heading: f64,
    pub seed_gradient: DVec2,
}

impl Default for FormationConfig {
    fn default() -> Self {
        Self {
            shape: ShapePreset::Line,
            radius: DEFAULT_SPACING,
            heading: DEFAULT_HEADING,
            seed_gradient: DVec2::ZERO,
        }
    }
}

impl FormationConfig {
    /// Build the version-0 descriptor naming `seed`.
    pub fn descriptor(&self, seed: AgentId) -> Result<FormationDescriptor> {
        let descriptor = FormationDescriptor::new(self.shape, self.radius, seed)?
            .with_heading(self.heading)?
            .with_seed_gradient(self.seed_gradient);
        Ok(descriptor)
    }
}

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for the run's random number generator.
    pub seed: u64,
    /// Free agents scattered by [`crate::Environment::populate`].
    pub free_agents: usize,
    /// Free agents spawn uniformly in `[-spawn_extent, spawn_extent]²`.
    pub spawn_extent: f64,
    pub agent_radius: f64,
    pub formation: FormationConfig,
    pub recruitment: RecruitmentMode,
    pub auction: AuctionConfig,
    /// Consecutive calm ticks before the run is declared quiescent.
    pub quiescence_window: u64,
    /// Hard stop, if any.
    pub max_ticks: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            free_agents: 8,
            spawn_extent: 0.5,
            agent_radius: DEFAULT_AGENT_RADIUS,
            formation: FormationConfig::default(),
            recruitment: RecruitmentMode::Push,
            auction: AuctionConfig::default(),
            quiescence_window: 10,
            max_ticks: Some(20_000),
        }
    }
}

impl SimulationConfig {
    /// Parse a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_free_agents(mut self, count: usize) -> Self {
        self.free_agents = count;
        self
    }

    #[must_use]
    pub fn with_spawn_extent(mut self, extent: f64) -> Self {
        self.spawn_extent = extent;
        self
    }

    #[must_use]
    pub fn with_agent_radius(mut self, radius: f64) -> Self {
        self.agent_radius = radius;
        self
    }

    #[must_use]
    pub fn with_shape(mut self, shape: ShapePreset) -> Self {
        self.formation.shape = shape;
        self
    }

    #[must_use]
    pub fn with_formation(mut self, formation: FormationConfig) -> Self {
        self.formation = formation;
        self
    }

    #[must_use]
    pub fn with_recruitment(mut self, mode: RecruitmentMode) -> Self {
        self.recruitment = mode;
        self
    }

    #[must_use]
    pub fn with_auction(mut self, auction: AuctionConfig) -> Self {
        self.auction = auction;
        self
    }

    #[must_use]
    pub fn with_quiescence_window(mut self, window: u64) -> Self {
        self.quiescence_window = window;
        self
    }

    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: Option<u64>) -> Self {
        self.max_ticks = max_ticks;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_constants() {
        let config = SimulationConfig::default();
        assert_eq!(config.auction.round_ticks, 3);
        assert_eq!(config.auction.error_threshold, 0.02);
        assert_eq!(config.auction.sensor_range, 2.0);
        assert_eq!(config.formation.radius, 0.09);
        assert_eq!(config.recruitment, RecruitmentMode::Push);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = SimulationConfig::from_json(
            r#"{ "free_agents": 3, "recruitment": "insertion", "formation": { "shape": "parabola" } }"#,
        )
        .unwrap();
        assert_eq!(config.free_agents, 3);
        assert_eq!(config.recruitment, RecruitmentMode::Insertion);
        assert_eq!(config.formation.shape, ShapePreset::Parabola);
        assert_eq!(config.formation.radius, DEFAULT_SPACING);
        assert_eq!(config.quiescence_window, 10);
    }

    #[test]
    fn json_round_trip() {
        let config = SimulationConfig::default()
            .with_seed(7)
            .with_shape(ShapePreset::Sine)
            .with_max_ticks(None);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(SimulationConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(SimulationConfig::from_json("{ not json").is_err());
    }

    #[test]
    fn descriptor_validates_radius() {
        let mut formation = FormationConfig::default();
        assert!(formation.descriptor(AgentId(0)).is_ok());
        formation.radius = -1.0;
        assert!(formation.descriptor(AgentId(0)).is_err());
    }
}
