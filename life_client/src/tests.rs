//! Unit tests for the generation stepper
//!
//! Tests Conway's rules, ownership on birth, toroidal wrapping and coin
//! capture under quadrant control.

use super::*;
use crate::stepper::find_majority_owner;
use crate::types::MAX_PLAYERS;

fn stepper(side: usize, quadrants: usize, tie_break: TieBreak) -> Stepper {
    Stepper::new(QuadrantLayout::new(side, quadrants).unwrap(), tie_break)
}

/// Step with no quadrant controllers
fn step(s: &Stepper, grid: &Grid) -> Grid {
    let control = QuadrantControl::new(s.layout().count());
    s.step(grid, &control).0
}

fn alive_set(grid: &Grid) -> Vec<(usize, usize)> {
    (0..grid.total_cells())
        .filter(|&i| grid.get_idx(i).is_alive())
        .map(|i| grid.coords(i))
        .collect()
}

fn place(grid: &mut Grid, cells: &[(usize, usize)], owner: u8) {
    for &(x, y) in cells {
        grid.set(x, y, Cell::new(owner, true, 0));
    }
}

#[test]
fn test_find_majority_owner_single_winner() {
    let mut counts = [0u8; MAX_PLAYERS + 1];
    counts[3] = 2;
    counts[5] = 1;
    assert_eq!(find_majority_owner(&counts, 0, TieBreak::CellPosition), 3);
    assert_eq!(find_majority_owner(&counts, 0, TieBreak::LowestOwner), 3);
}

#[test]
fn test_find_majority_owner_tie_fair_distribution() {
    // P1, P3, P5 tied with 1 neighbor each
    let mut counts = [0u8; MAX_PLAYERS + 1];
    counts[1] = 1;
    counts[3] = 1;
    counts[5] = 1;

    assert_eq!(find_majority_owner(&counts, 0, TieBreak::CellPosition), 1);
    assert_eq!(find_majority_owner(&counts, 1, TieBreak::CellPosition), 3);
    assert_eq!(find_majority_owner(&counts, 2, TieBreak::CellPosition), 5);
    assert_eq!(find_majority_owner(&counts, 3, TieBreak::CellPosition), 1);

    for idx in 0..4 {
        assert_eq!(find_majority_owner(&counts, idx, TieBreak::LowestOwner), 1);
    }
}

#[test]
fn test_find_majority_owner_no_neighbors() {
    let counts = [0u8; MAX_PLAYERS + 1];
    assert_eq!(find_majority_owner(&counts, 7, TieBreak::CellPosition), 1);
}

#[test]
fn test_lone_cell_and_pair_die() {
    let s = stepper(16, 4, TieBreak::CellPosition);
    let mut grid = Grid::new(16);
    place(&mut grid, &[(3, 3)], 1);
    place(&mut grid, &[(10, 10), (11, 10)], 2);

    let next = step(&s, &grid);
    assert!(alive_set(&next).is_empty());
    // Territory survives death
    assert_eq!(next.get(3, 3), Cell::new(1, false, 0));
    assert_eq!(next.get(11, 10), Cell::new(2, false, 0));
}

#[test]
fn test_block_is_still_life() {
    let s = stepper(16, 4, TieBreak::CellPosition);
    let mut grid = Grid::new(16);
    place(&mut grid, &[(5, 5), (6, 5), (5, 6), (6, 6)], 4);

    let mut current = grid.clone();
    for _ in 0..10 {
        current = step(&s, &current);
    }
    assert_eq!(current, grid);
}

#[test]
fn test_birth_takes_majority_owner() {
    let s = stepper(8, 4, TieBreak::CellPosition);
    let mut grid = Grid::new(8);
    place(&mut grid, &[(1, 1), (2, 1)], 2);
    place(&mut grid, &[(1, 2)], 3);

    let next = step(&s, &grid);
    assert_eq!(next.get(2, 2), Cell::new(2, true, 0));
    assert_eq!(alive_set(&next).len(), 4);
}

#[test]
fn test_birth_tie_break_variants() {
    let mut grid = Grid::new(8);
    place(&mut grid, &[(3, 1)], 1);
    place(&mut grid, &[(4, 1)], 2);
    place(&mut grid, &[(3, 2)], 3);

    // Newborn at (4, 2): index 20, three owners tied at one neighbour each
    let by_position = step(&stepper(8, 4, TieBreak::CellPosition), &grid);
    assert_eq!(by_position.get(4, 2).owner(), 3);

    let by_lowest = step(&stepper(8, 4, TieBreak::LowestOwner), &grid);
    assert_eq!(by_lowest.get(4, 2).owner(), 1);
}

#[test]
fn test_birth_keeps_coins_on_cell() {
    let s = stepper(8, 4, TieBreak::CellPosition);
    let mut grid = Grid::new(8);
    place(&mut grid, &[(1, 1), (2, 1), (1, 2)], 2);
    grid.set(2, 2, Cell::new(2, false, 5));

    let next = step(&s, &grid);
    assert_eq!(next.get(2, 2), Cell::new(2, true, 5));
}

#[test]
fn test_toroidal_wrap_both_axes() {
    let s = stepper(10, 4, TieBreak::CellPosition);
    let mut grid = Grid::new(10);
    // Horizontal blinker straddling the x edge on row 0
    place(&mut grid, &[(9, 0), (0, 0), (1, 0)], 1);

    let next = step(&s, &grid);
    assert_eq!(alive_set(&next), vec![(0, 0), (0, 1), (0, 9)]);

    let back = step(&s, &next);
    assert_eq!(alive_set(&back), vec![(0, 0), (1, 0), (9, 0)]);
}

#[test]
fn test_blinker_scenario() {
    let s = stepper(10, 4, TieBreak::CellPosition);
    let mut grid = Grid::new(10);
    // Row 4, columns 4..=6
    place(&mut grid, &[(4, 4), (5, 4), (6, 4)], 1);

    let gen1 = step(&s, &grid);
    assert_eq!(alive_set(&gen1), vec![(5, 3), (5, 4), (5, 5)]);
    assert!(alive_set(&gen1).iter().all(|&(x, y)| gen1.get(x, y).owner() == 1));

    let gen2 = step(&s, &gen1);
    assert_eq!(alive_set(&gen2), vec![(4, 4), (5, 4), (6, 4)]);
}

#[test]
fn test_step_is_deterministic() {
    let s = stepper(32, 16, TieBreak::CellPosition);
    let mut grid = Grid::new(32);
    let pattern = patterns::acorn();
    for &(dx, dy) in &pattern.offsets {
        grid.set((10 + dx) as usize, (10 + dy) as usize, Cell::new(1, true, 0));
    }
    place(&mut grid, &[(20, 20), (21, 20), (22, 20), (22, 19), (21, 18)], 2);

    let control = QuadrantControl::new(16);
    let a = s.step(&grid, &control);
    let b = s.step(&grid, &control);
    assert_eq!(a, b);
}

/// Owner 2 completes a block onto owner 1's coin cell at (2, 2).
fn capture_grid() -> Grid {
    let mut grid = Grid::new(8);
    place(&mut grid, &[(1, 1), (2, 1), (1, 2)], 2);
    grid.set(2, 2, Cell::new(1, false, 3));
    for &(x, y) in &[(0, 0), (1, 0), (2, 0), (3, 0), (0, 3), (1, 3)] {
        grid.set(x, y, Cell::new(1, false, 0));
    }
    grid
}

#[test]
fn test_controller_captures_enemy_coins() {
    let s = stepper(8, 4, TieBreak::CellPosition);
    let grid = capture_grid();
    let control = QuadrantControl::rebuild(s.layout(), &grid, &[2, 0, 0, 0]);

    let (next, next_control) = s.step(&grid, &control);
    assert_eq!(next.get(2, 2), Cell::new(2, true, 0));
    assert_eq!(next_control.territory(0, 2), 4);
    assert_eq!(next_control.territory(0, 1), 6);
}

#[test]
fn test_no_capture_without_control() {
    let s = stepper(8, 4, TieBreak::CellPosition);
    let grid = capture_grid();
    let control = QuadrantControl::rebuild(s.layout(), &grid, &[0, 0, 0, 0]);

    let (next, next_control) = s.step(&grid, &control);
    assert_eq!(next.get(2, 2), Cell::new(2, true, 3));
    assert_eq!(next_control.controller(0), 0);
}

#[test]
fn test_single_owned_cell_quadrant_does_not_capture() {
    // Quadrant 0 holds one owned cell, so its threshold rounds to 0 and
    // slot 1 controls it; a player 3 birth keeps the stored coins
    let s = stepper(8, 4, TieBreak::CellPosition);
    let mut grid = Grid::new(8);
    grid.set(3, 3, Cell::new(2, false, 3));
    place(&mut grid, &[(4, 2), (4, 3), (4, 4)], 3);
    let control = QuadrantControl::rebuild(s.layout(), &grid, &[]);
    assert_eq!(control.controller(0), 1);

    let (next, next_control) = s.step(&grid, &control);
    assert_eq!(next.get(3, 3), Cell::new(3, true, 3));
    assert_eq!(next_control.controller(0), 1);
}
