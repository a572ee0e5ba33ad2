//! Toroidal grid allowing several agents per cell.

use crate::error::EngineError;
use crate::population::AgentId;
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// Cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub x: usize,
    pub y: usize,
}

impl Pos {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Moore offsets, row by row, center excluded.
const MOORE_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// `width x height` wrapping grid.
///
/// Cells store agent identifiers only, in arrival order. Occupancy changes go
/// through [`MultiGrid::place`] and [`MultiGrid::move_agent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiGrid {
    width: usize,
    height: usize,
    cells: Vec<Vec<AgentId>>,
}

impl MultiGrid {
    /// Create an empty grid. Both dimensions must be at least 1.
    pub fn new(width: usize, height: usize) -> Self {
        let mut cells = Vec::new();
        cells.resize_with(width * height, Vec::new);
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Wrap a possibly out-of-range coordinate onto the torus.
    pub fn wrap(&self, x: isize, y: isize) -> Pos {
        Pos {
            x: x.rem_euclid(self.width as isize) as usize,
            y: y.rem_euclid(self.height as isize) as usize,
        }
    }

    /// Add an agent to the cell at `pos` (wrapped) and return the wrapped position.
    pub fn place(&mut self, id: AgentId, pos: Pos) -> Pos {
        let pos = self.wrap(pos.x as isize, pos.y as isize);
        let i_cell = self.cell_index(pos);
        self.cells[i_cell].push(id);
        pos
    }

    /// The 8 Moore neighbors of `pos`, wrapped.
    ///
    /// On grids narrower than 3 cells some entries coincide, and may equal `pos`.
    pub fn neighbors_of(&self, pos: Pos) -> [Pos; 8] {
        let (x, y) = (pos.x as isize, pos.y as isize);
        MOORE_OFFSETS.map(|(dx, dy)| self.wrap(x + dx, y + dy))
    }

    /// Move an agent from one cell to another.
    ///
    /// The agent must currently be recorded at `from`. It is appended to the
    /// end of the destination cell.
    pub fn move_agent(&mut self, id: AgentId, from: Pos, to: Pos) -> Result<()> {
        let i_from = self.cell_index(from);
        let Some(i_slot) = self.cells[i_from].iter().position(|&occ| occ == id) else {
            bail!(EngineError::Consistency(format!(
                "{id} is not recorded at {from:?}"
            )));
        };
        self.cells[i_from].remove(i_slot);
        let i_to = self.cell_index(to);
        self.cells[i_to].push(id);
        Ok(())
    }

    /// Agents in the cell at `pos`, in arrival order.
    pub fn occupants_of(&self, pos: Pos) -> &[AgentId] {
        &self.cells[self.cell_index(pos)]
    }

    /// Total number of placements across all cells.
    pub fn n_placed(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }

    fn cell_index(&self, pos: Pos) -> usize {
        let pos = self.wrap(pos.x as isize, pos.y as isize);
        pos.y * self.width + pos.x
    }
}
