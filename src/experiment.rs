//! Parameter sweeps over the similarity threshold.

use crate::config::Config;
use crate::error::SimError;
use crate::world::{RunReport, Simulation, TerminationReason};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// One finished run within a sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub want_similar: f64,
    pub seed: u64,
    pub report: RunReport,
}

/// Aggregate over all runs sharing a threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSummary {
    pub want_similar: f64,
    pub runs: usize,
    pub mean_segregation: f64,
    /// Share of runs that converged before the step budget
    pub convergence_rate: f64,
    pub mean_steps: f64,
}

/// Run `runs_per_threshold` independent simulations for each threshold.
///
/// Run `i` of the whole sweep uses seed `base_seed + i`, so results are
/// reproducible regardless of thread scheduling. Output is ordered by
/// threshold, then run.
pub fn sweep(
    base: &Config,
    thresholds: &[f64],
    runs_per_threshold: usize,
    base_seed: u64,
) -> Result<Vec<SweepPoint>, SimError> {
    let jobs: Vec<(f64, u64)> = thresholds
        .iter()
        .flat_map(|&t| std::iter::repeat(t).take(runs_per_threshold))
        .enumerate()
        .map(|(i, t)| (t, base_seed.wrapping_add(i as u64)))
        .collect();

    jobs.into_par_iter()
        .map(|(want_similar, seed)| -> Result<SweepPoint, SimError> {
            let mut config = base.clone();
            config.model.want_similar = want_similar;
            let mut sim = Simulation::new_with_seed(config, seed)?;
            let report = sim.run()?;
            Ok(SweepPoint {
                want_similar,
                seed,
                report,
            })
        })
        .collect()
}

/// Group sweep points by threshold, preserving first-seen order
pub fn summarize(points: &[SweepPoint]) -> Vec<SweepSummary> {
    let mut thresholds: Vec<f64> = Vec::new();
    for p in points {
        if !thresholds.contains(&p.want_similar) {
            thresholds.push(p.want_similar);
        }
    }

    thresholds
        .into_iter()
        .map(|t| {
            let runs: Vec<&SweepPoint> = points.iter().filter(|p| p.want_similar == t).collect();
            let n = runs.len() as f64;
            let converged = runs
                .iter()
                .filter(|p| p.report.reason == Some(TerminationReason::Converged))
                .count();

            SweepSummary {
                want_similar: t,
                runs: runs.len(),
                mean_segregation: runs
                    .iter()
                    .map(|p| p.report.segregation.unwrap_or(0.0))
                    .sum::<f64>()
                    / n,
                convergence_rate: converged as f64 / n,
                mean_steps: runs.iter().map(|p| p.report.steps as f64).sum::<f64>() / n,
            }
        })
        .collect()
}

impl SweepSummary {
    pub fn summary(&self) -> String {
        format!(
            "want_similar={:.2} | runs={} | segregation={:.2} | converged={:.0}% | steps={:.1}",
            self.want_similar,
            self.runs,
            self.mean_segregation,
            self.convergence_rate * 100.0,
            self.mean_steps,
        )
    }
}
