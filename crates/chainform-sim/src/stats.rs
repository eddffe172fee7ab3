//! Per-tick statistics and the end-of-run report.

use chainform_formation::DVec2;
use chainform_topology::AgentId;
use serde::{Deserialize, Serialize};

/// Where a run stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Running,
    /// Every cell stayed settled for the debounce window.
    Quiescent,
    /// The configured tick cap stopped the run.
    TickCapReached,
    /// A topology fault stopped the run.
    Aborted,
}

impl RunStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, RunStatus::Running)
    }
}

/// What happened during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickStats {
    pub tick: u64,
    /// Sum of translational error magnitudes over the chain.
    pub aggregate_error: f64,
    pub messages_forwarded: usize,
    pub packets_dropped: usize,
    pub chain_length: usize,
    pub free_agents: usize,
}

/// Statistics for every tick of a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    ticks: Vec<TickStats>,
}

impl RunStats {
    pub fn record(&mut self, stats: TickStats) {
        self.ticks.push(stats);
    }

    pub fn ticks(&self) -> &[TickStats] {
        &self.ticks
    }

    pub fn last(&self) -> Option<&TickStats> {
        self.ticks.last()
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn total_messages(&self) -> usize {
        self.ticks.iter().map(|t| t.messages_forwarded).sum()
    }

    pub fn total_dropped(&self) -> usize {
        self.ticks.iter().map(|t| t.packets_dropped).sum()
    }
}

/// Final state of one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReport {
    pub id: AgentId,
    pub attached: bool,
    pub position: DVec2,
    pub heading: f64,
    pub distance_travelled: f64,
    pub error: f64,
    pub converged_at: Option<u64>,
}

/// Summary of a finished (or stopped) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub ticks: u64,
    pub version: u64,
    pub chain_length: usize,
    pub free_agents: usize,
    pub messages_forwarded: usize,
    pub packets_dropped: usize,
    pub agents: Vec<AgentReport>,
}

impl RunReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
