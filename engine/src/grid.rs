use minefield_common::models::{self, Pos};
use rand::{Rng, seq::SliceRandom};
use tracing::{debug, warn};

use crate::{EngineError, MAX_DIMENSION, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cell {
    pub is_mine: bool,
    pub is_revealed: bool,
    pub is_flagged: bool,
    pub adjacent_mines: u8,
}

impl Cell {
    /// View of the cell for a client. `expose_mine` shows an unrevealed mine,
    /// used once the game is lost.
    pub fn view(&self, expose_mine: bool) -> models::Cell {
        if self.is_mine && (self.is_revealed || expose_mine) {
            models::Cell::Mine
        } else if self.is_revealed {
            models::Cell::Revealed {
                adjacent: self.adjacent_mines,
            }
        } else if self.is_flagged {
            models::Cell::Flagged
        } else {
            models::Cell::Hidden
        }
    }
}

impl From<&Cell> for models::Cell {
    fn from(value: &Cell) -> Self {
        value.view(false)
    }
}

const DISPLACEMENTS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Row-major rectangular grid of cells.
#[derive(Debug, Clone)]
pub struct Grid {
    width: usize,
    height: usize,
    mines: usize,
    revealed: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Empty grid with every flag cleared. Each dimension is clamped to
    /// `1..=MAX_DIMENSION`.
    pub fn new(width: usize, height: usize) -> Self {
        let width = width.clamp(1, MAX_DIMENSION);
        let height = height.clamp(1, MAX_DIMENSION);
        Self {
            width,
            height,
            mines: 0,
            revealed: 0,
            cells: vec![Cell::default(); width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn mine_count(&self) -> usize {
        self.mines
    }

    pub fn revealed_count(&self) -> usize {
        self.revealed
    }

    pub fn contains(&self, pos: Pos) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    pub fn get(&self, pos: Pos) -> Option<&Cell> {
        self.index(pos).map(|index| &self.cells[index])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.width)
    }

    pub fn mine_positions(&self) -> impl Iterator<Item = Pos> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_mine)
            .map(|(index, _)| self.pos_of(index))
    }

    /// In-bounds 8-connected neighbours of `pos`.
    pub fn neighbors(&self, pos: Pos) -> impl Iterator<Item = Pos> + use<> {
        let (width, height) = (self.width, self.height);
        DISPLACEMENTS.into_iter().filter_map(move |(dx, dy)| {
            let x = pos.x.checked_add_signed(dx)?;
            let y = pos.y.checked_add_signed(dy)?;
            (x < width && y < height).then_some(Pos { x, y })
        })
    }

    /// Places `count` mines on distinct free cells chosen by a partial
    /// Fisher-Yates shuffle. Returns the number actually placed, which is
    /// smaller than `count` only when the grid runs out of free cells.
    pub fn place_mines<R: Rng + ?Sized>(&mut self, count: usize, rng: &mut R) -> usize {
        let mut free: Vec<usize> = (0..self.cells.len())
            .filter(|&index| !self.cells[index].is_mine)
            .collect();

        if count > free.len() {
            warn!(
                "Requested {} mines but only {} free cells, clamping",
                count,
                free.len()
            );
        }

        let amount = count.min(free.len());
        let (chosen, _) = free.partial_shuffle(rng, amount);
        for &index in chosen.iter() {
            self.set_mine(index);
        }

        debug!(
            "Placed {} mines on {}x{} grid",
            amount, self.width, self.height
        );
        amount
    }

    /// Places mines at fixed positions. Duplicates are ignored.
    pub fn place_mines_at(&mut self, positions: &[Pos]) -> Result<()> {
        let indices = positions
            .iter()
            .map(|&pos| self.checked_index(pos))
            .collect::<Result<Vec<_>>>()?;

        for index in indices {
            if !self.cells[index].is_mine {
                self.set_mine(index);
            }
        }
        Ok(())
    }

    pub(crate) fn toggle_flag(&mut self, pos: Pos) -> Result<Option<bool>> {
        let index = self.checked_index(pos)?;
        let cell = &mut self.cells[index];
        if cell.is_revealed {
            return Ok(None);
        }
        cell.is_flagged = !cell.is_flagged;
        Ok(Some(cell.is_flagged))
    }

    /// Reveals `pos` and, when it borders no mine, floods outward through
    /// zero cells with an explicit work-list. Revealed and flagged cells are
    /// never entered. Returns every newly revealed position in reveal order.
    pub(crate) fn reveal(&mut self, pos: Pos) -> Result<Vec<Pos>> {
        let index = self.checked_index(pos)?;
        let mut revealed = Vec::new();
        let mut pending = vec![index];

        while let Some(index) = pending.pop() {
            let cell = &mut self.cells[index];
            if cell.is_revealed || cell.is_flagged {
                continue;
            }

            cell.is_revealed = true;
            self.revealed += 1;
            let pos = self.pos_of(index);
            revealed.push(pos);

            let cell = self.cells[index];
            if cell.is_mine || cell.adjacent_mines != 0 {
                continue;
            }

            for neighbor in self.neighbors(pos) {
                let neighbor_index = neighbor.x + neighbor.y * self.width;
                let neighbor_cell = &self.cells[neighbor_index];
                if !neighbor_cell.is_revealed && !neighbor_cell.is_flagged {
                    pending.push(neighbor_index);
                }
            }
        }

        Ok(revealed)
    }

    fn set_mine(&mut self, index: usize) {
        self.cells[index].is_mine = true;
        self.mines += 1;

        let pos = self.pos_of(index);
        for neighbor in self.neighbors(pos) {
            self.cells[neighbor.x + neighbor.y * self.width].adjacent_mines += 1;
        }
    }

    fn index(&self, pos: Pos) -> Option<usize> {
        self.contains(pos).then(|| pos.x + pos.y * self.width)
    }

    fn checked_index(&self, pos: Pos) -> Result<usize> {
        self.index(pos)
            .ok_or(EngineError::OutOfBounds { x: pos.x, y: pos.y })
    }

    fn pos_of(&self, index: usize) -> Pos {
        Pos {
            x: index % self.width,
            y: index / self.width,
        }
    }
}
