//! Error type shared by the grid, the engine and configuration loading.

use crate::grid::Coord;

/// Errors raised while configuring or stepping a simulation
#[derive(Debug)]
pub enum SimError {
    /// Parameters rejected at initialization
    InvalidConfiguration(String),
    /// A relocation was requested but every cell is occupied
    NoEmptyCell,
    /// Destination cell already holds an agent
    OccupiedDestination { at: Coord },
    /// Source cell does not hold the agent being moved
    OccupantMismatch { agent: usize, at: Coord },
    /// Coordinate outside the grid
    OutOfBounds { at: Coord },
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
}

impl SimError {
    /// True for errors that can only come from an engine sequencing bug.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::OccupiedDestination { .. } | Self::OccupantMismatch { .. } | Self::OutOfBounds { .. }
        )
    }
}

impl std::fmt::Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
            Self::NoEmptyCell => write!(f, "No empty cell available for relocation"),
            Self::OccupiedDestination { at } => write!(f, "Destination {} is already occupied", at),
            Self::OccupantMismatch { agent, at } => {
                write!(f, "Agent {} is not located at {}", agent, at)
            }
            Self::OutOfBounds { at } => write!(f, "Coordinate {} is outside the grid", at),
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Yaml(e) => write!(f, "YAML error: {}", e),
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Yaml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SimError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_yaml::Error> for SimError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml(e)
    }
}
