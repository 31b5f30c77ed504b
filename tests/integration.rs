//! Integration tests for SEGREGATION

use segregation::agent::Happiness;
use segregation::{Config, Coord, Phase, Simulation, TerminationReason, Topology};

fn config(size: usize, density: f64, n_groups: usize, want_similar: f64, steps: u64) -> Config {
    let mut config = Config::default();
    config.model.size = size;
    config.model.density = density;
    config.model.n_groups = n_groups;
    config.model.want_similar = want_similar;
    config.model.steps = steps;
    config
}

/// Recompute the mean same-group ratio straight from a snapshot
fn ratios_from_snapshot(sim: &Simulation) -> Vec<f64> {
    let snap = sim.grid_snapshot();
    let grid = sim.grid();
    sim.agents()
        .iter()
        .map(|agent| {
            let own = snap.get(agent.position).unwrap();
            let neighbors: Vec<u32> = grid
                .neighborhood(agent.position)
                .into_iter()
                .filter_map(|c| snap.get(c))
                .collect();
            let similar = neighbors.iter().filter(|&&g| g == own).count();
            Happiness::from_counts(similar, neighbors.len(), 0.0).ratio
        })
        .collect()
}

#[test]
fn test_full_grid_zero_threshold_converges_at_step_zero() {
    let mut sim = Simulation::new_with_seed(config(3, 1.0, 2, 0.0, 50), 2024).unwrap();
    assert_eq!(sim.population(), 9);
    assert_eq!(sim.grid().empty_count(), 0);

    let report = sim.run().unwrap();

    assert_eq!(report.reason, Some(TerminationReason::Converged));
    assert_eq!(report.steps, 0);
    assert_eq!(report.total_relocations, 0);

    let ratios = ratios_from_snapshot(&sim);
    let mean = ratios.iter().sum::<f64>() / 9.0;
    let expected = (mean * 100.0).round_ties_even() / 100.0;
    assert_eq!(sim.segregation_index(), Some(expected));
}

#[test]
fn test_single_agent_zero_threshold() {
    let mut sim = Simulation::new_with_seed(config(2, 0.25, 2, 0.0, 10), 5).unwrap();
    assert_eq!(sim.population(), 1);

    let report = sim.run().unwrap();
    assert_eq!(report.reason, Some(TerminationReason::Converged));
    assert_eq!(report.steps, 0);
    assert_eq!(sim.agents()[0].similarity, 0.0);
    assert!(sim.agents()[0].happy);
    assert_eq!(sim.segregation_index(), Some(0.0));
}

#[test]
fn test_single_agent_positive_threshold_never_settles() {
    let mut sim = Simulation::new_with_seed(config(2, 0.25, 2, 0.4, 10), 5).unwrap();

    let report = sim.run().unwrap();

    // Isolated agents stay unhappy, so only the budget stops the run
    assert_eq!(report.reason, Some(TerminationReason::Exhausted));
    assert_eq!(report.steps, 10);
    assert_eq!(report.total_relocations, 10);
    assert_eq!(sim.agents()[0].similarity, 0.0);
    assert!(!sim.agents()[0].happy);
    assert_eq!(sim.grid().empty_count(), 3);
}

#[test]
fn test_zero_budget_exhausts_without_evaluating() {
    let mut sim = Simulation::new_with_seed(config(10, 0.5, 2, 0.5, 0), 1).unwrap();

    assert!(sim.is_terminal());
    assert_eq!(sim.phase(), Phase::Exhausted);
    assert_eq!(sim.termination_reason(), Some(TerminationReason::Exhausted));
    assert_eq!(sim.segregation_index(), None);

    let before = sim.grid_snapshot();
    let report = sim.run().unwrap();
    assert_eq!(report.steps, 0);
    assert_eq!(sim.grid_snapshot(), before);

    sim.evaluate();
    let index = sim.segregation_index().unwrap();
    assert!((0.0..=1.0).contains(&index));
}

#[test]
fn test_conservation_and_bounds_across_seeds() {
    for seed in 0..5 {
        let cfg = config(25, 0.9, 3, 0.6, 40);
        let n = cfg.population();
        let mut sim = Simulation::new_with_seed(cfg, seed).unwrap();

        while !sim.is_terminal() {
            sim.step().unwrap();
            let grid = sim.grid();
            assert_eq!(grid.occupied_count(), n);
            assert_eq!(grid.empty_count(), 625 - n);
            assert!(grid.is_consistent());

            let index = sim.segregation_index().unwrap();
            assert!((0.0..=1.0).contains(&index));
        }
    }
}

#[test]
fn test_convergence_stops_relocation() {
    let mut sim = Simulation::new_with_seed(config(20, 0.7, 2, 0.3, 200), 77).unwrap();
    let report = sim.run().unwrap();
    assert_eq!(report.reason, Some(TerminationReason::Converged));
    assert_eq!(sim.unhappy_count(), Some(0));

    let snapshot = sim.grid_snapshot();
    let relocations = sim.total_relocations();
    for _ in 0..3 {
        assert_eq!(sim.step().unwrap(), Phase::Converged);
    }
    assert_eq!(sim.grid_snapshot(), snapshot);
    assert_eq!(sim.total_relocations(), relocations);
}

#[test]
fn test_determinism() {
    let cfg = config(30, 0.9, 2, 0.7, 25);
    let mut a = Simulation::new_with_seed(cfg.clone(), 99999).unwrap();
    let mut b = Simulation::new_with_seed(cfg, 99999).unwrap();

    assert_eq!(a.grid_snapshot(), b.grid_snapshot());
    while !a.is_terminal() {
        a.step().unwrap();
        b.step().unwrap();
        assert_eq!(a.grid_snapshot(), b.grid_snapshot());
        assert_eq!(a.current_step(), b.current_step());
    }
    assert!(b.is_terminal());
    assert_eq!(a.segregation_index(), b.segregation_index());
}

#[test]
fn test_different_seeds_differ() {
    let cfg = config(30, 0.9, 2, 0.7, 5);
    let a = Simulation::new_with_seed(cfg.clone(), 1).unwrap();
    let b = Simulation::new_with_seed(cfg, 2).unwrap();
    assert_ne!(a.grid_snapshot(), b.grid_snapshot());
}

#[test]
fn test_moderate_preference_increases_segregation() {
    let mut sim = Simulation::new_with_seed(config(40, 0.8, 2, 0.3, 100), 31).unwrap();
    sim.evaluate();
    let initial = sim.segregation_index().unwrap();

    sim.run().unwrap();
    let final_index = sim.segregation_index().unwrap();

    assert!(
        final_index > initial,
        "segregation should rise: {} -> {}",
        initial,
        final_index
    );
}

#[test]
fn test_torus_run_conserves_agents() {
    let mut cfg = config(12, 0.75, 2, 0.5, 30);
    cfg.neighborhood.topology = Topology::Torus;
    let mut sim = Simulation::new_with_seed(cfg, 8).unwrap();
    sim.run().unwrap();

    assert_eq!(sim.grid().occupied_count(), 108);
    assert!(sim.grid().is_consistent());
    for agent in sim.agents() {
        assert_eq!(sim.grid().neighborhood(agent.position).len(), 8);
    }
}

#[test]
fn test_snapshot_matches_agents() {
    let mut sim = Simulation::new_with_seed(config(15, 0.6, 4, 0.5, 10), 12).unwrap();
    sim.run().unwrap();

    let snap = sim.grid_snapshot();
    assert_eq!(snap.step, sim.current_step());
    assert_eq!(snap.occupied_count(), sim.population());
    for agent in sim.agents() {
        assert_eq!(snap.get(agent.position), Some(agent.group));
    }
    assert_eq!(snap.get(Coord::new(15, 0)), None);

    let counts = snap.group_counts(4);
    assert_eq!(counts.iter().sum::<usize>(), sim.population());
}

#[test]
fn test_stats_tracking() {
    let mut cfg = config(20, 0.9, 2, 0.7, 30);
    cfg.logging.stats_interval = 5;
    let mut sim = Simulation::new_with_seed(cfg, 33333).unwrap();
    sim.run().unwrap();

    let history = &sim.history;
    assert!(!history.is_empty());
    let latest = history.latest().unwrap();
    assert_eq!(latest.step, sim.current_step());
    for (step, _) in history.segregation_series() {
        assert!(step % 5 == 0 || step == sim.current_step());
    }
}

#[test]
fn test_config_file_drives_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    config(10, 0.5, 2, 0.0, 5).save(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    let mut sim = Simulation::new_with_seed(loaded, 3).unwrap();
    let report = sim.run().unwrap();
    assert_eq!(report.reason, Some(TerminationReason::Converged));
}
