//! # SEGREGATION
//!
//! Schelling's segregation model on a 2D grid: agents of several groups
//! relocate while too few of their neighbors share their group, and mild
//! individual preferences add up to strongly segregated neighborhoods.
//!
//! ## Features
//!
//! - **Reproducible**: a single seeded ChaCha stream drives placement and moves
//! - **Parallel**: the read-only evaluate phase runs on Rayon
//! - **Configurable**: YAML configuration files
//! - **Observable**: per-step statistics and typed grid snapshots
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use segregation::{Config, Simulation};
//!
//! let config = Config::default();
//! let mut sim = Simulation::new_with_seed(config, 42).unwrap();
//!
//! let report = sim.run().unwrap();
//! println!("{}", report);
//! println!("Segregation: {:?}", sim.segregation_index());
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use segregation::Config;
//!
//! let mut config = Config::default();
//! config.model.want_similar = 0.3;
//! config.model.size = 40;
//! assert!(config.validate().is_ok());
//! ```
//!
//! ## Rendering
//!
//! Renderers read [`Simulation::grid_snapshot`] after each step:
//!
//! ```rust
//! use segregation::{Config, Simulation};
//!
//! let mut config = Config::default();
//! config.model.size = 10;
//! let mut sim = Simulation::new_with_seed(config, 1).unwrap();
//! sim.run_with_callback(|s| {
//!     let snapshot = s.grid_snapshot();
//!     assert_eq!(snapshot.cells.len(), 100);
//! })
//! .unwrap();
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod experiment;
pub mod grid;
pub mod rng;
pub mod snapshot;
pub mod stats;
pub mod world;

// Re-export main types
pub use agent::Agent;
pub use config::Config;
pub use error::SimError;
pub use grid::{Coord, Grid, Topology};
pub use snapshot::GridSnapshot;
pub use world::{Phase, RunReport, Simulation, TerminationReason};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run a quick benchmark on a `size x size` grid
pub fn benchmark(steps: u64, size: usize) -> Result<BenchmarkResult, SimError> {
    use std::time::Instant;

    let mut config = Config::default();
    config.model.size = size;
    config.model.steps = steps;
    // High threshold keeps agents moving for the whole budget
    config.model.want_similar = 0.9;

    let mut sim = Simulation::new_with_seed(config, 0)?;

    let start = Instant::now();
    let report = sim.run()?;
    let elapsed = start.elapsed();

    Ok(BenchmarkResult {
        steps: report.steps,
        size,
        population: sim.population(),
        elapsed_secs: elapsed.as_secs_f64(),
        steps_per_second: report.steps as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
        relocations: report.total_relocations,
    })
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub steps: u64,
    pub size: usize,
    pub population: usize,
    pub elapsed_secs: f64,
    pub steps_per_second: f64,
    pub relocations: usize,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Steps: {}", self.steps)?;
        writeln!(f, "Grid: {}x{}", self.size, self.size)?;
        writeln!(f, "Population: {}", self.population)?;
        writeln!(f, "Time: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Speed: {:.1} steps/s", self.steps_per_second)?;
        writeln!(f, "Relocations: {}", self.relocations)?;
        Ok(())
    }
}
