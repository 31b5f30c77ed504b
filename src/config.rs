//! Configuration for segregation runs.
//!
//! Supports YAML configuration files with the reference parameter set as
//! defaults.

use crate::error::SimError;
use crate::grid::Topology;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    pub model: ModelConfig,
    #[serde(default)]
    pub neighborhood: NeighborhoodConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Model parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Minimum share of same-group neighbors for an agent to stay (0.0 - 1.0)
    pub want_similar: f64,
    /// Number of distinct groups
    pub n_groups: usize,
    /// Fraction of cells occupied (0.0 exclusive - 1.0)
    pub density: f64,
    /// Width and height of the square grid
    pub size: usize,
    /// Maximum number of relocation steps
    pub steps: u64,
}

/// Neighborhood shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborhoodConfig {
    pub topology: Topology,
    /// Chebyshev radius; 1 is the Moore neighborhood
    pub radius: usize,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Steps between stats records
    pub stats_interval: u64,
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            want_similar: 0.7,
            n_groups: 2,
            density: 0.95,
            size: 50,
            steps: 50,
        }
    }
}

impl Default for NeighborhoodConfig {
    fn default() -> Self {
        Self {
            topology: Topology::Bounded,
            radius: 1,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            stats_interval: 1,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SimError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SimError> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Number of agents, `floor(density * size^2)`
    pub fn population(&self) -> usize {
        let cells = self.model.size * self.model.size;
        ((self.model.density * cells as f64).floor() as usize).min(cells)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), SimError> {
        let m = &self.model;
        let invalid = |msg: &str| Err(SimError::InvalidConfiguration(msg.to_string()));

        if !m.want_similar.is_finite() || !(0.0..=1.0).contains(&m.want_similar) {
            return invalid("want_similar must be within [0, 1]");
        }
        if m.n_groups < 1 {
            return invalid("n_groups must be >= 1");
        }
        if m.n_groups > u32::MAX as usize {
            return invalid("n_groups is too large");
        }
        if !m.density.is_finite() || m.density <= 0.0 || m.density > 1.0 {
            return invalid("density must be within (0, 1]");
        }
        if m.size < 1 {
            return invalid("size must be >= 1");
        }
        if m.size.checked_mul(m.size).is_none() {
            return invalid("size is too large");
        }
        if self.neighborhood.radius < 1 {
            return invalid("neighborhood radius must be >= 1");
        }
        if self.logging.stats_interval < 1 {
            return invalid("stats_interval must be >= 1");
        }

        let n = self.population();
        if n == 0 {
            return invalid("density * size^2 leaves no agents");
        }
        // Relocation draws from the empty set, so a full grid only works
        // when nobody can ever be unhappy.
        if n == m.size * m.size && m.want_similar > 0.0 {
            return invalid("a fully occupied grid requires want_similar = 0");
        }
        Ok(())
    }
}
