//! Agent state and the happiness rule.

use crate::grid::{Coord, Grid};
use serde::{Deserialize, Serialize};

/// Stable agent identifier, equal to the creation index
pub type AgentId = usize;

/// Group label in `[0, n_groups)`
pub type GroupId = u32;

/// Result of evaluating one agent against the grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Happiness {
    /// Share of occupied neighbors in the same group
    pub ratio: f64,
    pub happy: bool,
}

impl Happiness {
    /// Same-group share of `similar` out of `total` neighbors against `threshold`.
    ///
    /// No neighbors gives ratio 0, so an isolated agent is happy only
    /// when the threshold is 0.
    pub fn from_counts(similar: usize, total: usize, threshold: f64) -> Self {
        let ratio = if total > 0 {
            similar as f64 / total as f64
        } else {
            0.0
        };
        Self {
            ratio,
            happy: ratio >= threshold,
        }
    }
}

/// A resident of the grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub group: GroupId,
    /// Mirrors the grid occupancy
    pub position: Coord,
    /// Similarity ratio from the last evaluate phase
    pub similarity: f64,
    pub happy: bool,
    /// Number of times this agent has relocated
    pub moves: u32,
}

impl Agent {
    pub fn new(id: AgentId, group: GroupId, position: Coord) -> Self {
        Self {
            id,
            group,
            position,
            similarity: 0.0,
            happy: false,
            moves: 0,
        }
    }

    /// Evaluate against the current neighborhood. Reads the grid only.
    pub fn evaluate_happiness(&self, grid: &Grid, threshold: f64) -> Happiness {
        let neighbors = grid.neighbors(self.position);
        let similar = neighbors.iter().filter(|n| n.group == self.group).count();
        Happiness::from_counts(similar, neighbors.len(), threshold)
    }

    /// Cache an evaluation result
    #[inline]
    pub fn record(&mut self, happiness: Happiness) {
        self.similarity = happiness.ratio;
        self.happy = happiness.happy;
    }
}
