//! Segregation metric and per-step statistics.

use crate::agent::Agent;
use serde::{Deserialize, Serialize};

/// Unrounded mean similarity ratio, `None` for an empty population
pub fn mean_similarity(agents: &[Agent]) -> Option<f64> {
    if agents.is_empty() {
        return None;
    }
    Some(agents.iter().map(|a| a.similarity).sum::<f64>() / agents.len() as f64)
}

/// Mean similarity ratio rounded to two decimals, ties to even.
///
/// Uses the ratios cached by the last evaluate phase; callers are
/// responsible for having evaluated at least once.
pub fn segregation_index(agents: &[Agent]) -> Option<f64> {
    mean_similarity(agents).map(round2)
}

#[inline]
fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Statistics for one evaluate phase
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StepStats {
    /// Step counter of the evaluated layout
    pub step: u64,
    /// Number of agents
    pub population: usize,
    /// Unhappy agents found by the evaluate phase
    pub unhappy: usize,
    /// Share of happy agents
    pub happy_fraction: f64,
    /// Agents moved away from this layout
    pub relocations: usize,
    /// Rounded segregation index
    pub segregation: f64,
    /// Unrounded mean similarity
    pub mean_similarity: f64,
}

impl StepStats {
    /// Build stats from freshly evaluated agents
    pub fn from_agents(step: u64, agents: &[Agent], relocations: usize) -> Self {
        let population = agents.len();
        let unhappy = agents.iter().filter(|a| !a.happy).count();
        let happy_fraction = if population > 0 {
            (population - unhappy) as f64 / population as f64
        } else {
            0.0
        };

        Self {
            step,
            population,
            unhappy,
            happy_fraction,
            relocations,
            segregation: segregation_index(agents).unwrap_or(0.0),
            mean_similarity: mean_similarity(agents).unwrap_or(0.0),
        }
    }

    /// Format stats as a one-line summary
    pub fn summary(&self) -> String {
        format!(
            "T:{:5} | Pop:{:6} | Unhappy:{:6} | Happy:{:5.1}% | Moved:{:6} | Segregation:{:.2}",
            self.step,
            self.population,
            self.unhappy,
            self.happy_fraction * 100.0,
            self.relocations,
            self.segregation,
        )
    }
}

/// Historical statistics tracker
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatsHistory {
    /// All recorded stats snapshots
    pub snapshots: Vec<StepStats>,
    /// Recording interval
    pub interval: u64,
}

impl StatsHistory {
    /// Create new history with recording interval
    pub fn new(interval: u64) -> Self {
        Self {
            snapshots: Vec::new(),
            interval: interval.max(1),
        }
    }

    /// Whether stats for `step` fall on the recording interval
    #[inline]
    pub fn should_record(&self, step: u64) -> bool {
        step % self.interval == 0
    }

    /// Record a stats snapshot
    pub fn record(&mut self, stats: StepStats) {
        self.snapshots.push(stats);
    }

    pub fn latest(&self) -> Option<&StepStats> {
        self.snapshots.last()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Segregation index over time
    pub fn segregation_series(&self) -> Vec<(u64, f64)> {
        self.snapshots
            .iter()
            .map(|s| (s.step, s.segregation))
            .collect()
    }

    /// Unhappy count over time
    pub fn unhappy_series(&self) -> Vec<(u64, usize)> {
        self.snapshots.iter().map(|s| (s.step, s.unhappy)).collect()
    }

    /// Total relocations across recorded steps
    pub fn total_relocations(&self) -> usize {
        self.snapshots.iter().map(|s| s.relocations).sum()
    }

    /// Save history to a JSON file
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Load history from a JSON file
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
