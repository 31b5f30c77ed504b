//! Lattice of cells with occupancy tracking and neighbor queries.

use crate::agent::{AgentId, GroupId};
use crate::error::SimError;
use crate::rng::RandomSource;
use serde::{Deserialize, Serialize};

/// Cell coordinate, `0 <= x < width`, `0 <= y < height`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub x: usize,
    pub y: usize,
}

impl Coord {
    #[inline]
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Edge handling for neighbor queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// Neighborhoods are clipped at the border
    #[default]
    Bounded,
    /// Neighborhoods wrap around opposite edges
    Torus,
}

/// What a cell holds when it is not empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    pub agent: AgentId,
    pub group: GroupId,
}

const NOT_EMPTY: usize = usize::MAX;

/// Bounded 2D grid where each cell holds at most one agent.
///
/// The empty set is kept as a dense vector plus a per-cell slot index so
/// that insertion, removal and uniform selection are all O(1).
#[derive(Clone, Debug)]
pub struct Grid {
    width: usize,
    height: usize,
    topology: Topology,
    radius: usize,
    /// cells[y * width + x]
    cells: Vec<Option<Occupant>>,
    empty: Vec<Coord>,
    /// Position of each cell inside `empty`, or `NOT_EMPTY`
    empty_slot: Vec<usize>,
}

impl Grid {
    /// Create an all-empty grid
    pub fn new(width: usize, height: usize, topology: Topology, radius: usize) -> Self {
        let n_cells = width * height;
        let mut empty = Vec::with_capacity(n_cells);
        for y in 0..height {
            for x in 0..width {
                empty.push(Coord::new(x, y));
            }
        }

        Self {
            width,
            height,
            topology,
            radius,
            cells: vec![None; n_cells],
            empty,
            empty_slot: (0..n_cells).collect(),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn topology(&self) -> Topology {
        self.topology
    }

    #[inline]
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Total number of cells
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn contains(&self, at: Coord) -> bool {
        at.x < self.width && at.y < self.height
    }

    #[inline]
    fn index(&self, at: Coord) -> usize {
        at.y * self.width + at.x
    }

    /// Coordinate of a row-major cell index
    #[inline]
    pub fn coord_of(&self, index: usize) -> Coord {
        Coord::new(index % self.width, index / self.width)
    }

    fn checked_index(&self, at: Coord) -> Result<usize, SimError> {
        if self.contains(at) {
            Ok(self.index(at))
        } else {
            Err(SimError::OutOfBounds { at })
        }
    }

    /// Occupant at a cell, `None` when empty or outside the grid
    #[inline]
    pub fn get(&self, at: Coord) -> Option<Occupant> {
        if self.contains(at) {
            self.cells[self.index(at)]
        } else {
            None
        }
    }

    #[inline]
    pub fn is_empty_cell(&self, at: Coord) -> bool {
        self.contains(at) && self.cells[self.index(at)].is_none()
    }

    #[inline]
    pub fn occupied_count(&self) -> usize {
        self.cells.len() - self.empty.len()
    }

    #[inline]
    pub fn empty_count(&self) -> usize {
        self.empty.len()
    }

    /// Currently empty coordinates, in no particular order
    pub fn empty_cells(&self) -> &[Coord] {
        &self.empty
    }

    /// Row-major view of every cell
    pub fn cells(&self) -> &[Option<Occupant>] {
        &self.cells
    }

    fn take_empty(&mut self, idx: usize) {
        let slot = self.empty_slot[idx];
        debug_assert_ne!(slot, NOT_EMPTY);
        self.empty.swap_remove(slot);
        if let Some(&moved) = self.empty.get(slot) {
            let moved_idx = self.index(moved);
            self.empty_slot[moved_idx] = slot;
        }
        self.empty_slot[idx] = NOT_EMPTY;
    }

    fn release(&mut self, idx: usize) {
        debug_assert_eq!(self.empty_slot[idx], NOT_EMPTY);
        self.empty_slot[idx] = self.empty.len();
        self.empty.push(self.coord_of(idx));
    }

    /// Put an agent on an empty cell. Used during initialization.
    pub fn place(&mut self, occupant: Occupant, at: Coord) -> Result<(), SimError> {
        let idx = self.checked_index(at)?;
        if self.cells[idx].is_some() {
            return Err(SimError::OccupiedDestination { at });
        }
        self.cells[idx] = Some(occupant);
        self.take_empty(idx);
        Ok(())
    }

    /// Move an agent from `from` to the empty cell `to`.
    ///
    /// Both the occupancy map and the empty set are updated before
    /// returning; on error nothing changes.
    pub fn move_agent(&mut self, agent: AgentId, from: Coord, to: Coord) -> Result<(), SimError> {
        let from_idx = self.checked_index(from)?;
        let to_idx = self.checked_index(to)?;

        let occupant = match self.cells[from_idx] {
            Some(occ) if occ.agent == agent => occ,
            _ => return Err(SimError::OccupantMismatch { agent, at: from }),
        };
        if self.cells[to_idx].is_some() {
            return Err(SimError::OccupiedDestination { at: to });
        }

        self.cells[to_idx] = Some(occupant);
        self.take_empty(to_idx);
        self.cells[from_idx] = None;
        self.release(from_idx);
        Ok(())
    }

    /// Uniformly random empty cell
    pub fn random_empty_cell<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Result<Coord, SimError> {
        if self.empty.is_empty() {
            return Err(SimError::NoEmptyCell);
        }
        Ok(self.empty[rng.uniform_int(0..self.empty.len())])
    }

    /// Coordinates within `radius` (Chebyshev distance) of `at`, excluding `at`.
    ///
    /// Bounded grids clip at the border. On a torus every cell is listed at
    /// most once even when the neighborhood is wider than the grid.
    pub fn neighborhood(&self, at: Coord) -> Vec<Coord> {
        let r = self.radius;
        let mut coords = Vec::with_capacity((2 * r + 1) * (2 * r + 1));

        match self.topology {
            Topology::Bounded => {
                let x_min = at.x.saturating_sub(r);
                let x_max = (at.x + r).min(self.width - 1);
                let y_min = at.y.saturating_sub(r);
                let y_max = (at.y + r).min(self.height - 1);

                for y in y_min..=y_max {
                    for x in x_min..=x_max {
                        if x != at.x || y != at.y {
                            coords.push(Coord::new(x, y));
                        }
                    }
                }
            }
            Topology::Torus => {
                let span_x = (2 * r + 1).min(self.width);
                let span_y = (2 * r + 1).min(self.height);
                // Start r cells back, wrapping; a span capped at the grid
                // dimension visits each column/row once.
                let start_x = (at.x + self.width - r % self.width) % self.width;
                let start_y = (at.y + self.height - r % self.height) % self.height;

                for dy in 0..span_y {
                    let y = (start_y + dy) % self.height;
                    for dx in 0..span_x {
                        let x = (start_x + dx) % self.width;
                        if x != at.x || y != at.y {
                            coords.push(Coord::new(x, y));
                        }
                    }
                }
            }
        }

        coords
    }

    /// Occupants of the neighborhood of `at`
    pub fn neighbors(&self, at: Coord) -> Vec<Occupant> {
        self.neighborhood(at)
            .into_iter()
            .filter_map(|c| self.cells[self.index(c)])
            .collect()
    }

    /// Check that the empty set is exactly the complement of occupied cells
    pub fn is_consistent(&self) -> bool {
        let empty_cells = self.cells.iter().filter(|c| c.is_none()).count();
        if empty_cells != self.empty.len() {
            return false;
        }
        self.empty.iter().enumerate().all(|(slot, &c)| {
            let idx = self.index(c);
            self.cells[idx].is_none() && self.empty_slot[idx] == slot
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::create_rng;

    fn occ(agent: AgentId) -> Occupant {
        Occupant { agent, group: 0 }
    }

    #[test]
    fn test_new_grid_is_empty() {
        let grid = Grid::new(4, 3, Topology::Bounded, 1);
        assert_eq!(grid.len(), 12);
        assert_eq!(grid.empty_count(), 12);
        assert_eq!(grid.occupied_count(), 0);
        assert!(grid.is_consistent());
    }

    #[test]
    fn test_place_and_get() {
        let mut grid = Grid::new(5, 5, Topology::Bounded, 1);
        grid.place(occ(0), Coord::new(2, 3)).unwrap();

        assert_eq!(grid.get(Coord::new(2, 3)), Some(occ(0)));
        assert!(!grid.is_empty_cell(Coord::new(2, 3)));
        assert_eq!(grid.empty_count(), 24);
        assert!(grid.is_consistent());
    }

    #[test]
    fn test_place_on_occupied_fails() {
        let mut grid = Grid::new(3, 3, Topology::Bounded, 1);
        grid.place(occ(0), Coord::new(1, 1)).unwrap();
        let err = grid.place(occ(1), Coord::new(1, 1)).unwrap_err();
        assert!(matches!(err, SimError::OccupiedDestination { .. }));
    }

    #[test]
    fn test_place_out_of_bounds() {
        let mut grid = Grid::new(3, 3, Topology::Bounded, 1);
        let err = grid.place(occ(0), Coord::new(3, 0)).unwrap_err();
        assert!(matches!(err, SimError::OutOfBounds { .. }));
    }

    #[test]
    fn test_move_updates_empty_set() {
        let mut grid = Grid::new(3, 3, Topology::Bounded, 1);
        grid.place(occ(7), Coord::new(0, 0)).unwrap();
        grid.move_agent(7, Coord::new(0, 0), Coord::new(2, 2)).unwrap();

        assert!(grid.is_empty_cell(Coord::new(0, 0)));
        assert_eq!(grid.get(Coord::new(2, 2)).map(|o| o.agent), Some(7));
        assert_eq!(grid.occupied_count(), 1);
        assert!(grid.empty_cells().contains(&Coord::new(0, 0)));
        assert!(!grid.empty_cells().contains(&Coord::new(2, 2)));
        assert!(grid.is_consistent());
    }

    #[test]
    fn test_move_to_occupied_is_rejected_without_side_effects() {
        let mut grid = Grid::new(3, 3, Topology::Bounded, 1);
        grid.place(occ(0), Coord::new(0, 0)).unwrap();
        grid.place(occ(1), Coord::new(1, 0)).unwrap();

        let err = grid.move_agent(0, Coord::new(0, 0), Coord::new(1, 0)).unwrap_err();
        assert!(matches!(err, SimError::OccupiedDestination { .. }));
        assert_eq!(grid.get(Coord::new(0, 0)).map(|o| o.agent), Some(0));
        assert_eq!(grid.get(Coord::new(1, 0)).map(|o| o.agent), Some(1));
        assert!(grid.is_consistent());
    }

    #[test]
    fn test_move_wrong_agent() {
        let mut grid = Grid::new(3, 3, Topology::Bounded, 1);
        grid.place(occ(0), Coord::new(0, 0)).unwrap();
        let err = grid.move_agent(5, Coord::new(0, 0), Coord::new(1, 1)).unwrap_err();
        assert!(matches!(err, SimError::OccupantMismatch { agent: 5, .. }));
    }

    #[test]
    fn test_moore_neighborhood_interior_edge_corner() {
        let grid = Grid::new(5, 5, Topology::Bounded, 1);
        assert_eq!(grid.neighborhood(Coord::new(2, 2)).len(), 8);
        assert_eq!(grid.neighborhood(Coord::new(0, 2)).len(), 5);
        assert_eq!(grid.neighborhood(Coord::new(4, 4)).len(), 3);
        assert!(!grid.neighborhood(Coord::new(2, 2)).contains(&Coord::new(2, 2)));
    }

    #[test]
    fn test_wider_radius() {
        let grid = Grid::new(7, 7, Topology::Bounded, 2);
        assert_eq!(grid.neighborhood(Coord::new(3, 3)).len(), 24);
        assert_eq!(grid.neighborhood(Coord::new(0, 0)).len(), 8);
    }

    #[test]
    fn test_torus_wraps() {
        let grid = Grid::new(5, 5, Topology::Torus, 1);
        let corner = grid.neighborhood(Coord::new(0, 0));
        assert_eq!(corner.len(), 8);
        assert!(corner.contains(&Coord::new(4, 4)));
        assert!(corner.contains(&Coord::new(4, 0)));
        assert!(corner.contains(&Coord::new(0, 4)));
    }

    #[test]
    fn test_torus_small_grid_no_duplicates() {
        let grid = Grid::new(2, 2, Topology::Torus, 1);
        let mut hood = grid.neighborhood(Coord::new(0, 0));
        hood.sort();
        hood.dedup();
        assert_eq!(hood.len(), 3);
        assert_eq!(grid.neighborhood(Coord::new(0, 0)).len(), 3);

        let single = Grid::new(1, 1, Topology::Torus, 1);
        assert!(single.neighborhood(Coord::new(0, 0)).is_empty());
    }

    #[test]
    fn test_neighbors_only_occupied() {
        let mut grid = Grid::new(3, 3, Topology::Bounded, 1);
        grid.place(Occupant { agent: 0, group: 1 }, Coord::new(1, 1)).unwrap();
        grid.place(Occupant { agent: 1, group: 0 }, Coord::new(0, 0)).unwrap();
        grid.place(Occupant { agent: 2, group: 1 }, Coord::new(2, 1)).unwrap();

        let neighbors = grid.neighbors(Coord::new(1, 1));
        assert_eq!(neighbors.len(), 2);
        assert!(neighbors.iter().all(|o| o.agent != 0));
    }

    #[test]
    fn test_random_empty_cell() {
        let mut grid = Grid::new(2, 2, Topology::Bounded, 1);
        let mut rng = create_rng(3);
        grid.place(occ(0), Coord::new(0, 0)).unwrap();
        grid.place(occ(1), Coord::new(1, 0)).unwrap();
        grid.place(occ(2), Coord::new(0, 1)).unwrap();

        for _ in 0..10 {
            assert_eq!(grid.random_empty_cell(&mut rng).unwrap(), Coord::new(1, 1));
        }

        grid.place(occ(3), Coord::new(1, 1)).unwrap();
        assert!(matches!(
            grid.random_empty_cell(&mut rng),
            Err(SimError::NoEmptyCell)
        ));
    }

    #[test]
    fn test_empty_set_stays_consistent_under_churn() {
        let mut grid = Grid::new(6, 6, Topology::Bounded, 1);
        let mut rng = create_rng(99);
        let mut positions = Vec::new();
        for agent in 0..20 {
            let at = grid.random_empty_cell(&mut rng).unwrap();
            grid.place(occ(agent), at).unwrap();
            positions.push(at);
        }

        for round in 0..200 {
            let agent = round % positions.len();
            let to = grid.random_empty_cell(&mut rng).unwrap();
            grid.move_agent(agent, positions[agent], to).unwrap();
            positions[agent] = to;
        }

        assert_eq!(grid.occupied_count(), 20);
        assert_eq!(grid.empty_count(), 16);
        assert!(grid.is_consistent());
    }
}
