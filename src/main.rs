//! SEGREGATION - CLI Entry Point
//!
//! Runs Schelling segregation experiments from YAML configuration.

use clap::{Parser, Subcommand};
use segregation::experiment::{summarize, sweep};
use segregation::{benchmark, Config, Simulation};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "segregation")]
#[command(version)]
#[command(about = "Schelling segregation model simulator")]
struct Cli {
    /// Log level (error, warn, info, debug, trace); overrides the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation
    Run {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Override the step budget
        #[arg(short, long)]
        steps: Option<u64>,

        /// Output directory for stats and the final snapshot
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Quiet mode (minimal output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Sweep the similarity threshold
    Sweep {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Comma-separated thresholds
        #[arg(short, long, value_delimiter = ',', default_value = "0.3,0.5,0.7")]
        thresholds: Vec<f64>,

        /// Runs per threshold
        #[arg(short, long, default_value = "5")]
        runs: usize,

        /// Seed of the first run
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Run performance benchmark
    Benchmark {
        /// Number of steps
        #[arg(short, long, default_value = "50")]
        steps: u64,

        /// Grid size
        #[arg(long, default_value = "100")]
        size: usize,
    },

    /// Generate default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Loaded once; the file also supplies the default log level
    let loaded = match &cli.command {
        Commands::Run { config, .. } | Commands::Sweep { config, .. } => Some(load_config(config)?),
        _ => None,
    };
    let level = cli
        .log_level
        .clone()
        .or_else(|| loaded.as_ref().map(|c| c.logging.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Run {
            config,
            steps,
            output,
            seed,
            quiet,
        } => run_simulation(&config, loaded.unwrap_or_default(), steps, output, seed, quiet),

        Commands::Sweep {
            config,
            thresholds,
            runs,
            seed,
        } => {
            log::info!("Sweep config: {:?}", config);
            run_sweep(loaded.unwrap_or_default(), thresholds, runs, seed)
        }

        Commands::Benchmark { steps, size } => run_benchmark(steps, size),

        Commands::Init { output } => generate_config(output),
    }
}

/// Config file if present, defaults otherwise
fn load_config(path: &Path) -> Result<Config, segregation::SimError> {
    if path.exists() {
        Config::from_file(path)
    } else {
        Ok(Config::default())
    }
}

fn run_simulation(
    config_path: &Path,
    mut config: Config,
    steps: Option<u64>,
    output: PathBuf,
    seed: Option<u64>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if config_path.exists() {
        log::info!("Loaded config from: {:?}", config_path);
    } else {
        log::info!("Using default configuration");
    }
    if let Some(steps) = steps {
        config.model.steps = steps;
    }

    std::fs::create_dir_all(&output)?;

    let mut sim = match seed {
        Some(s) => Simulation::new_with_seed(config.clone(), s)?,
        None => Simulation::new(config.clone())?,
    };

    println!("Starting simulation");
    println!("  Seed: {}", sim.seed());
    println!("  Grid size: {}x{}", config.model.size, config.model.size);
    println!("  Population: {}", sim.population());
    println!("  Groups: {}", config.model.n_groups);
    println!("  Want similar: {:.2}", config.model.want_similar);
    println!("  Step budget: {}", config.model.steps);
    println!();

    let start = Instant::now();
    let stats_interval = config.logging.stats_interval;

    let report = sim.run_with_callback(|s| {
        if !quiet && (s.stats.step % stats_interval == 0 || s.is_terminal()) {
            println!("{}", s.stats.summary());
        }
    })?;

    // Nothing ran for a zero budget; evaluate once so the index is defined
    if report.segregation.is_none() {
        sim.evaluate();
    }
    let report = sim.report();

    let elapsed = start.elapsed();
    println!();
    print!("{}", report);
    println!("Time: {:.2}s", elapsed.as_secs_f64());

    let stats_path = output.join("stats_history.json");
    sim.history.save(&stats_path)?;
    println!("Stats history: {:?}", stats_path);

    let snapshot_path = output.join("final_snapshot.json");
    sim.grid_snapshot().save_json(&snapshot_path)?;
    println!("Final snapshot: {:?}", snapshot_path);

    Ok(())
}

fn run_sweep(
    config: Config,
    thresholds: Vec<f64>,
    runs: usize,
    seed: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Threshold Sweep ===");
    println!("Thresholds: {:?}", thresholds);
    println!("Runs per threshold: {}", runs);
    println!();

    let start = Instant::now();
    let points = sweep(&config, &thresholds, runs, seed)?;
    for summary in summarize(&points) {
        println!("{}", summary.summary());
    }
    println!();
    println!("Time: {:.2}s", start.elapsed().as_secs_f64());

    Ok(())
}

fn run_benchmark(steps: u64, size: usize) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== SEGREGATION Benchmark ===");
    println!("Steps: {}", steps);
    println!("Grid: {}x{}", size, size);
    println!();

    let result = benchmark(steps, size)?;
    println!("{}", result);

    Ok(())
}

fn generate_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    config.save(&output)?;
    println!("Configuration saved to: {:?}", output);
    Ok(())
}
