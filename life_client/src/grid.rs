//! Dense toroidal grid.
//!
//! Index formula: `y * side + x`. Every neighbour lookup wraps modulo `side`
//! in both axes, so row 0 touches row `side - 1` and column 0 touches column
//! `side - 1`.

use crate::cell::Cell;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    side: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// All-default grid of `side * side` cells.
    pub fn new(side: usize) -> Self {
        assert!(side > 0 && side <= u16::MAX as usize, "grid side out of range: {}", side);
        Self {
            side,
            cells: vec![Cell::EMPTY; side * side],
        }
    }

    #[inline(always)]
    pub fn side(&self) -> usize {
        self.side
    }

    #[inline(always)]
    pub fn total_cells(&self) -> usize {
        self.cells.len()
    }

    /// Convert (x, y) to flat array index. Both must already be in range.
    #[inline(always)]
    pub fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.side && y < self.side);
        y * self.side + x
    }

    /// Convert flat index to (x, y)
    #[inline(always)]
    pub fn coords(&self, idx: usize) -> (usize, usize) {
        (idx % self.side, idx / self.side)
    }

    /// Wrap arbitrary signed coordinates onto the torus.
    #[inline]
    pub fn wrap(&self, x: i32, y: i32) -> (u16, u16) {
        let side = self.side as i32;
        (x.rem_euclid(side) as u16, y.rem_euclid(side) as u16)
    }

    #[inline(always)]
    pub fn get(&self, x: usize, y: usize) -> Cell {
        self.cells[self.index(x, y)]
    }

    #[inline(always)]
    pub fn get_idx(&self, idx: usize) -> Cell {
        self.cells[idx]
    }

    #[inline(always)]
    pub fn set(&mut self, x: usize, y: usize, cell: Cell) {
        let idx = self.index(x, y);
        self.cells[idx] = cell;
    }

    #[inline(always)]
    pub fn set_idx(&mut self, idx: usize, cell: Cell) {
        self.cells[idx] = cell;
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Get 8 neighbour indices with toroidal wrapping, in NW, N, NE, W, E,
    /// SW, S, SE order.
    #[inline(always)]
    pub fn neighbor_indices(&self, idx: usize) -> [usize; 8] {
        let side = self.side;
        let (x, y) = self.coords(idx);

        let xm = (x + side - 1) % side;
        let xp = (x + 1) % side;
        let ym = (y + side - 1) % side;
        let yp = (y + 1) % side;

        [
            ym * side + xm, // NW
            ym * side + x,  // N
            ym * side + xp, // NE
            y * side + xm,  // W
            y * side + xp,  // E
            yp * side + xm, // SW
            yp * side + x,  // S
            yp * side + xp, // SE
        ]
    }

    pub fn alive_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_alive()).count()
    }

    /// Kill every alive cell in the rectangle, keeping owner and coins.
    /// Returns the number of cells killed.
    pub fn kill_region(&mut self, x0: usize, y0: usize, width: usize, height: usize) -> usize {
        let mut killed = 0;
        for y in y0..(y0 + height).min(self.side) {
            for x in x0..(x0 + width).min(self.side) {
                let idx = self.index(x, y);
                let cell = self.cells[idx];
                if cell.is_alive() {
                    self.cells[idx] = cell.with_alive(false);
                    killed += 1;
                }
            }
        }
        killed
    }
}
