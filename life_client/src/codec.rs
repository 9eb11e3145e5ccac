//! Sparse/Dense Codec.
//!
//! The authority ships only non-default cells, split into alive cells and
//! territory (dead but owned). The dense side is a full [`Grid`].

use crate::cell::{Cell, MAX_COINS};
use crate::error::ProtocolViolation;
use crate::grid::Grid;
use crate::types::{SparseCell, MAX_PLAYERS};
use tracing::debug;

/// Non-default cells of a grid, in ascending index order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SparseCells {
    pub alive_cells: Vec<SparseCell>,
    pub territory: Vec<SparseCell>,
}

fn check_entry(entry: &SparseCell, side: usize) -> Result<(), ProtocolViolation> {
    let SparseCell { x, y, owner, coins } = *entry;
    if x as usize >= side || y as usize >= side {
        return Err(ProtocolViolation::OutOfRange { x, y, side });
    }
    if owner == 0 || owner as usize > MAX_PLAYERS {
        return Err(ProtocolViolation::InvalidOwner { x, y, owner });
    }
    if coins > MAX_COINS {
        return Err(ProtocolViolation::CoinOverflow { x, y, coins });
    }
    Ok(())
}

/// Build a dense grid from sparse lists.
///
/// Alive entries are applied first; a territory entry on a coordinate that is
/// already alive is ignored (alive wins). Any malformed entry rejects the
/// whole snapshot.
pub fn to_dense(
    alive_cells: &[SparseCell],
    territory: &[SparseCell],
    side: usize,
) -> Result<Grid, ProtocolViolation> {
    let mut grid = Grid::new(side);

    for entry in alive_cells {
        check_entry(entry, side)?;
        let (x, y) = (entry.x as usize, entry.y as usize);
        if !grid.get(x, y).is_empty() {
            return Err(ProtocolViolation::Duplicate {
                x: entry.x,
                y: entry.y,
                list: "alive_cells",
            });
        }
        grid.set(x, y, Cell::new(entry.owner, true, entry.coins));
    }

    let mut shadowed = 0usize;
    for entry in territory {
        check_entry(entry, side)?;
        let (x, y) = (entry.x as usize, entry.y as usize);
        let existing = grid.get(x, y);
        if existing.is_alive() {
            shadowed += 1;
            continue;
        }
        if !existing.is_empty() {
            return Err(ProtocolViolation::Duplicate {
                x: entry.x,
                y: entry.y,
                list: "territory",
            });
        }
        grid.set(x, y, Cell::new(entry.owner, false, entry.coins));
    }

    if shadowed > 0 {
        debug!("{} territory entries shadowed by alive cells", shadowed);
    }

    Ok(grid)
}

/// Split a dense grid into sparse lists. Fully default cells are omitted.
pub fn to_sparse(grid: &Grid) -> SparseCells {
    let mut sparse = SparseCells::default();

    for (idx, &cell) in grid.cells().iter().enumerate() {
        if cell.is_empty() {
            continue;
        }
        let (x, y) = grid.coords(idx);
        let entry = SparseCell {
            x: x as u16,
            y: y as u16,
            owner: cell.owner(),
            coins: cell.coins(),
        };
        if cell.is_alive() {
            sparse.alive_cells.push(entry);
        } else if cell.owner() > 0 {
            sparse.territory.push(entry);
        }
    }

    sparse
}
