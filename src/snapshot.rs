//! Read-only grid view for renderers and exporters.

use crate::agent::GroupId;
use crate::grid::{Coord, Grid};
use serde::{Deserialize, Serialize};

/// Group label (or empty) for every cell, row-major
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub step: u64,
    pub width: usize,
    pub height: usize,
    pub cells: Vec<Option<GroupId>>,
}

impl GridSnapshot {
    pub fn from_grid(grid: &Grid, step: u64) -> Self {
        Self {
            step,
            width: grid.width(),
            height: grid.height(),
            cells: grid.cells().iter().map(|c| c.map(|o| o.group)).collect(),
        }
    }

    /// Group at a coordinate, `None` when empty or outside the grid
    #[inline]
    pub fn get(&self, at: Coord) -> Option<GroupId> {
        if at.x < self.width && at.y < self.height {
            self.cells[at.y * self.width + at.x]
        } else {
            None
        }
    }

    /// Iterate rows from `y = 0` upward
    pub fn rows(&self) -> impl Iterator<Item = &[Option<GroupId>]> {
        self.cells.chunks(self.width.max(1))
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Agents per group; labels at or above `n_groups` are ignored
    pub fn group_counts(&self, n_groups: usize) -> Vec<usize> {
        let mut counts = vec![0; n_groups];
        for group in self.cells.iter().flatten() {
            if let Some(count) = counts.get_mut(*group as usize) {
                *count += 1;
            }
        }
        counts
    }

    /// Save snapshot to a JSON file
    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)
    }
}
