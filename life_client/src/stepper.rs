//! Generation Stepper: Conway's B3/S23 with ownership, reproducing the
//! authority's rule so local runs track it between syncs.

use crate::cell::Cell;
use crate::grid::Grid;
use crate::quadrant::{QuadrantControl, QuadrantLayout};
use crate::types::MAX_PLAYERS;
use arrayvec::ArrayVec;
use std::str::FromStr;

// ============================================================================
// TIE-BREAKING
// ============================================================================

/// How a newborn cell picks its owner when several owners tie for the
/// highest neighbour tally.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TieBreak {
    /// `tied[cell_index % tied.len()]`, tied owners in ascending order.
    #[default]
    CellPosition,
    /// The lowest tied owner id wins.
    LowestOwner,
}

impl FromStr for TieBreak {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cell_position" | "position" => Ok(TieBreak::CellPosition),
            "lowest_owner" | "lowest" => Ok(TieBreak::LowestOwner),
            other => Err(format!("unknown tie-break '{}'", other)),
        }
    }
}

/// Find majority owner among neighbours. With no owned live neighbours the
/// cell defaults to player 1.
pub fn find_majority_owner(
    counts: &[u8; MAX_PLAYERS + 1],
    cell_idx: usize,
    tie_break: TieBreak,
) -> u8 {
    let max_count = counts[1..].iter().max().copied().unwrap_or(0);
    if max_count == 0 {
        return 1;
    }

    let tied: ArrayVec<u8, MAX_PLAYERS> = (1..=MAX_PLAYERS)
        .filter(|&p| counts[p] == max_count)
        .map(|p| p as u8)
        .collect();

    if tied.len() == 1 {
        return tied[0];
    }

    match tie_break {
        TieBreak::CellPosition => tied[cell_idx % tied.len()],
        TieBreak::LowestOwner => tied[0],
    }
}

// ============================================================================
// CELL FATES
// ============================================================================

/// What happens to a cell this generation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CellChange {
    Survives,
    Birth { new_owner: u8 },
    /// Keep owner and coins, mark as dead
    Death,
    StaysDead,
}

/// Compute a cell's fate from the grid at the START of the generation.
fn compute_cell_fate(grid: &Grid, idx: usize, tie_break: TieBreak) -> CellChange {
    let mut alive_count = 0u8;
    let mut owner_counts = [0u8; MAX_PLAYERS + 1];

    for n_idx in grid.neighbor_indices(idx) {
        let n = grid.get_idx(n_idx);
        if n.is_alive() {
            alive_count += 1;
            let owner = n.owner() as usize;
            if owner > 0 && owner <= MAX_PLAYERS {
                owner_counts[owner] += 1;
            }
        }
    }

    match (grid.get_idx(idx).is_alive(), alive_count) {
        (true, 2) | (true, 3) => CellChange::Survives,
        (false, 3) => CellChange::Birth {
            new_owner: find_majority_owner(&owner_counts, idx, tie_break),
        },
        (true, _) => CellChange::Death,
        (false, _) => CellChange::StaysDead,
    }
}

// ============================================================================
// STEPPER
// ============================================================================

#[derive(Clone, Copy, Debug)]
pub struct Stepper {
    layout: QuadrantLayout,
    tie_break: TieBreak,
}

impl Stepper {
    pub fn new(layout: QuadrantLayout, tie_break: TieBreak) -> Self {
        Self { layout, tie_break }
    }

    pub fn layout(&self) -> &QuadrantLayout {
        &self.layout
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Advance one generation. Pure: the inputs are untouched and the
    /// returned grid and control are new values.
    ///
    /// Pass 1 computes every fate against the unmodified grid. Pass 2
    /// applies them in ascending index order, updating quadrant control as
    /// births change ownership. A newborn captures (zeroes) an enemy's coins
    /// only when its owner controls that quadrant.
    pub fn step(&self, grid: &Grid, control: &QuadrantControl) -> (Grid, QuadrantControl) {
        debug_assert_eq!(grid.side(), self.layout.side());

        let changes: Vec<(usize, CellChange)> = (0..grid.total_cells())
            .filter_map(|idx| match compute_cell_fate(grid, idx, self.tie_break) {
                CellChange::StaysDead | CellChange::Survives => None,
                change => Some((idx, change)),
            })
            .collect();

        let mut next = grid.clone();
        let mut next_control = control.clone();

        for (idx, change) in changes {
            let cell = grid.get_idx(idx);
            match change {
                CellChange::Birth { new_owner } => {
                    let old_owner = cell.owner();
                    let old_coins = cell.coins();
                    let quadrant = self.layout.quadrant_of_idx(idx);

                    next_control.update(quadrant, old_owner, new_owner);

                    let captured = old_owner != 0
                        && old_owner != new_owner
                        && old_coins > 0
                        && next_control.controller(quadrant) == new_owner;

                    let coins = if captured { 0 } else { old_coins };
                    next.set_idx(idx, Cell::new(new_owner, true, coins));
                }
                CellChange::Death => next.set_idx(idx, cell.with_alive(false)),
                CellChange::Survives | CellChange::StaysDead => {}
            }
        }

        (next, next_control)
    }
}
