//! Chainform Simulation
//!
//! Discrete-tick simulation of a swarm organizing itself into a chain.
//!
//! # Architecture
//!
//! - **Environment**: owns every agent, routes packets and settles auctions
//! - **Agents**: free agents bid and announce, chain cells relax and move
//! - **Router**: store-and-forward, one tick of latency on every packet
//! - **Events**: a timeline of seeds, auctions and formation changes
//!
//! # Usage
//!
//! ```ignore
//! let mut env = Environment::new(SimulationConfig::default())?;
//! env.populate();
//! env.form_up(DVec2::ZERO)?;
//! let report = env.run()?;
//! println!("{}", report.to_json()?);
//! ```

mod agent;
mod config;
mod environment;
mod error;
mod events;
mod message;
mod motion;
mod router;
mod stats;

pub use agent::{Agent, ChainCell, FreeAgent, Outbox, Role, TickContext};
pub use config::{FormationConfig, RecruitmentMode, SimulationConfig, DEFAULT_AGENT_RADIUS};
pub use environment::Environment;
pub use error::{Error, Result};
pub use events::FormationEvent;
pub use message::{Message, MessageKind, Packet};
pub use motion::{Actuator, DifferentialDrive, Pose, VelocityCommand, MAX_SPEED_FACTOR};
pub use router::{Audience, Directory, RouteStats, Router};
pub use stats::{AgentReport, RunReport, RunStats, RunStatus, TickStats};

pub use chainform_formation::DVec2;
pub use chainform_topology::AgentId;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lone_seed_goes_quiet() {
        let config = SimulationConfig::default()
            .with_free_agents(1)
            .with_quiescence_window(3);
        let mut env = Environment::new(config).unwrap();
        env.populate();
        env.form_up(DVec2::ZERO).unwrap();

        let report = env.run().unwrap();
        assert_eq!(report.status, RunStatus::Quiescent);
        assert_eq!(report.chain_length, 1);
        assert_eq!(report.free_agents, 0);
    }

    #[test]
    fn report_serializes() {
        let mut env = Environment::new(SimulationConfig::default().with_free_agents(2)).unwrap();
        env.populate();
        env.form_up(DVec2::ZERO).unwrap();
        env.step().unwrap();

        let json = env.report().to_json().unwrap();
        assert!(json.contains("\"status\": \"running\""));
        assert!(json.contains("\"chain_length\": 1"));
    }
}
