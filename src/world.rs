//! Simulation engine - main step loop.

use crate::agent::{Agent, AgentId, GroupId, Happiness};
use crate::config::Config;
use crate::error::SimError;
use crate::grid::{Grid, Occupant};
use crate::rng::{create_rng, RandomSource};
use crate::snapshot::GridSnapshot;
use crate::stats::{segregation_index, StatsHistory, StepStats};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of a run. Construction is the `Uninitialized -> Ready` edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Ready,
    Running,
    Converged,
    Exhausted,
}

impl Phase {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Converged | Self::Exhausted)
    }
}

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// No agent was unhappy
    Converged,
    /// Step budget reached
    Exhausted,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Converged => write!(f, "converged"),
            Self::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// Outcome of a complete run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub seed: u64,
    pub steps: u64,
    /// `None` while the run is still in progress
    pub reason: Option<TerminationReason>,
    pub segregation: Option<f64>,
    pub total_relocations: usize,
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Simulation Complete ===")?;
        writeln!(f, "Seed: {}", self.seed)?;
        writeln!(f, "Steps: {}", self.steps)?;
        match self.reason {
            Some(reason) => writeln!(f, "Termination: {}", reason)?,
            None => writeln!(f, "Termination: running")?,
        }
        match self.segregation {
            Some(s) => writeln!(f, "Segregation: {:.2}", s)?,
            None => writeln!(f, "Segregation: n/a")?,
        }
        writeln!(f, "Relocations: {}", self.total_relocations)?;
        Ok(())
    }
}

/// Grid, agents and step bookkeeping. Owned by [`Simulation`].
#[derive(Clone, Debug)]
pub struct SimulationState {
    pub grid: Grid,
    /// Agents in creation order; `agents[i].id == i`
    pub agents: Vec<Agent>,
    pub step: u64,
    pub phase: Phase,
    /// Whether an evaluate phase has run
    pub evaluated: bool,
    pub total_relocations: usize,
}

/// The segregation model
pub struct Simulation {
    pub config: Config,
    state: SimulationState,
    pub stats: StepStats,
    pub history: StatsHistory,

    // Random number generator (seeded for reproducibility)
    rng: ChaCha8Rng,
    seed: u64,
}

impl Simulation {
    /// Create a simulation with a fresh random seed
    pub fn new(config: Config) -> Result<Self, SimError> {
        let seed = rand::thread_rng().gen();
        Self::new_with_seed(config, seed)
    }

    /// Create a simulation with a specific seed for reproducibility
    pub fn new_with_seed(config: Config, seed: u64) -> Result<Self, SimError> {
        Self::initialize(config, create_rng(seed), seed)
    }

    /// Populate grid and agents from `rng`.
    ///
    /// Draws one group per agent in creation order, then a single
    /// sample of distinct cells for placement.
    pub fn initialize(config: Config, mut rng: ChaCha8Rng, seed: u64) -> Result<Self, SimError> {
        config.validate()?;

        let size = config.model.size;
        let n = config.population();
        let mut grid = Grid::new(
            size,
            size,
            config.neighborhood.topology,
            config.neighborhood.radius,
        );

        let groups: Vec<GroupId> = (0..n)
            .map(|_| rng.uniform_int(0..config.model.n_groups) as GroupId)
            .collect();
        let cells = rng.sample_without_replacement(grid.len(), n);

        let mut agents = Vec::with_capacity(n);
        for (id, (group, cell)) in groups.into_iter().zip(cells).enumerate() {
            let position = grid.coord_of(cell);
            grid.place(Occupant { agent: id, group }, position)?;
            agents.push(Agent::new(id, group, position));
        }

        let phase = if config.model.steps == 0 {
            Phase::Exhausted
        } else {
            Phase::Ready
        };

        log::info!(
            "Initialized {}x{} grid: population={}, groups={}, want_similar={}, seed={}",
            size,
            size,
            n,
            config.model.n_groups,
            config.model.want_similar,
            seed
        );

        Ok(Self {
            history: StatsHistory::new(config.logging.stats_interval),
            config,
            state: SimulationState {
                grid,
                agents,
                step: 0,
                phase,
                evaluated: false,
                total_relocations: 0,
            },
            stats: StepStats::default(),
            rng,
            seed,
        })
    }

    /// Recompute happiness for every agent without moving anyone.
    ///
    /// Valid in any phase; does not consume randomness.
    pub fn evaluate(&mut self) -> usize {
        evaluate_phase(&mut self.state, self.config.model.want_similar);
        self.state.agents.iter().filter(|a| !a.happy).count()
    }

    /// Main simulation step: evaluate, select, check termination, relocate.
    ///
    /// Returns the phase after the step. Once terminal this is a no-op.
    pub fn step(&mut self) -> Result<Phase, SimError> {
        if self.state.phase.is_terminal() {
            return Ok(self.state.phase);
        }
        self.state.phase = Phase::Running;

        // Phase 1: Evaluate (parallel, read-only)
        evaluate_phase(&mut self.state, self.config.model.want_similar);

        // Phase 2: Select
        let unhappy = select_unhappy(&self.state.agents);

        // Phase 3: Termination check
        if unhappy.is_empty() {
            self.finish(TerminationReason::Converged);
            return Ok(self.state.phase);
        }

        // Phase 4: Relocate (sequential)
        let moved = relocate_phase(&mut self.state, &unhappy, &mut self.rng)?;
        self.state.total_relocations += moved;

        // Moves do not touch cached happiness, so stats still describe the
        // layout this step started from
        self.record_stats(self.state.step, moved, false);
        self.state.step += 1;

        log::debug!(
            "Step {}: unhappy={}, relocated={}",
            self.state.step,
            unhappy.len(),
            moved
        );

        if self.state.step >= self.config.model.steps {
            // Closing evaluation so metrics describe the final layout
            evaluate_phase(&mut self.state, self.config.model.want_similar);
            let reason = if self.state.agents.iter().all(|a| a.happy) {
                TerminationReason::Converged
            } else {
                TerminationReason::Exhausted
            };
            self.finish(reason);
        }

        Ok(self.state.phase)
    }

    /// Enter a terminal phase after an evaluate phase of the current layout
    fn finish(&mut self, reason: TerminationReason) {
        self.state.phase = match reason {
            TerminationReason::Converged => Phase::Converged,
            TerminationReason::Exhausted => Phase::Exhausted,
        };
        self.record_stats(self.state.step, 0, true);

        log::info!(
            "Simulation {} at step {}: segregation={:.2}",
            reason,
            self.state.step,
            self.stats.segregation
        );
    }

    /// One record per evaluate phase, labelled with the step of the
    /// evaluated layout; `moved` counts relocations made from it.
    fn record_stats(&mut self, layout_step: u64, moved: usize, terminal: bool) {
        self.stats = StepStats::from_agents(layout_step, &self.state.agents, moved);
        if terminal || self.history.should_record(layout_step) {
            self.history.record(self.stats.clone());
        }
    }

    /// Run until convergence or the step budget
    pub fn run(&mut self) -> Result<RunReport, SimError> {
        self.run_with_callback(|_| {})
    }

    /// Run with a callback invoked after every step
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> Result<RunReport, SimError>
    where
        F: FnMut(&Simulation),
    {
        while !self.is_terminal() {
            self.step()?;
            callback(self);
        }
        Ok(self.report())
    }

    /// Summary of the run so far
    pub fn report(&self) -> RunReport {
        RunReport {
            seed: self.seed,
            steps: self.state.step,
            reason: self.termination_reason(),
            segregation: self.segregation_index(),
            total_relocations: self.state.total_relocations,
        }
    }

    /// Rounded mean similarity, `None` before the first evaluate phase
    pub fn segregation_index(&self) -> Option<f64> {
        if !self.state.evaluated {
            return None;
        }
        segregation_index(&self.state.agents)
    }

    /// Typed copy of the grid for rendering
    pub fn grid_snapshot(&self) -> GridSnapshot {
        GridSnapshot::from_grid(&self.state.grid, self.state.step)
    }

    #[inline]
    pub fn current_step(&self) -> u64 {
        self.state.step
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.state.phase.is_terminal()
    }

    pub fn termination_reason(&self) -> Option<TerminationReason> {
        match self.state.phase {
            Phase::Converged => Some(TerminationReason::Converged),
            Phase::Exhausted => Some(TerminationReason::Exhausted),
            Phase::Ready | Phase::Running => None,
        }
    }

    /// Unhappy agents as of the last evaluate phase, `None` before the first
    pub fn unhappy_count(&self) -> Option<usize> {
        if !self.state.evaluated {
            return None;
        }
        Some(self.state.agents.iter().filter(|a| !a.happy).count())
    }

    #[inline]
    pub fn population(&self) -> usize {
        self.state.agents.len()
    }

    #[inline]
    pub fn agents(&self) -> &[Agent] {
        &self.state.agents
    }

    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.state.grid
    }

    #[inline]
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    #[inline]
    pub fn total_relocations(&self) -> usize {
        self.state.total_relocations
    }

    /// Get seed for reproducibility
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

/// Recompute and cache happiness for every agent against one grid state
fn evaluate_phase(state: &mut SimulationState, threshold: f64) {
    let grid = &state.grid;
    let results: Vec<Happiness> = state
        .agents
        .par_iter()
        .map(|agent| agent.evaluate_happiness(grid, threshold))
        .collect();

    for (agent, happiness) in state.agents.iter_mut().zip(results) {
        agent.record(happiness);
    }
    state.evaluated = true;
}

/// Unhappy agents in creation order
fn select_unhappy(agents: &[Agent]) -> Vec<AgentId> {
    agents.iter().filter(|a| !a.happy).map(|a| a.id).collect()
}

/// Move each agent in `unhappy`, in order, to a random empty cell.
///
/// Every move is applied before the next draw, so later agents see the
/// cells vacated earlier in the same step.
fn relocate_phase<R: RandomSource + ?Sized>(
    state: &mut SimulationState,
    unhappy: &[AgentId],
    rng: &mut R,
) -> Result<usize, SimError> {
    for &id in unhappy {
        let to = state.grid.random_empty_cell(rng)?;
        let agent = &mut state.agents[id];
        state.grid.move_agent(id, agent.position, to)?;
        log::trace!("Agent {} moved {} -> {}", id, agent.position, to);
        agent.position = to;
        agent.moves += 1;
    }
    Ok(unhappy.len())
}
