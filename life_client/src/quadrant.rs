//! Quadrant Index: fixed square partition of the grid, per-quadrant control
//! tracking and the rotating wipe schedule.

use crate::error::ProtocolViolation;
use crate::grid::Grid;
use crate::types::{QuadrantInfo, SlotInfo, WipeInfo, CONTROLLER_THRESHOLD_PERCENT, MAX_PLAYERS};

// ============================================================================
// LAYOUT
// ============================================================================

/// Row-major layout of `count` equal square quadrants over a grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuadrantLayout {
    side: usize,
    quadrant_side: usize,
    per_row: usize,
}

impl QuadrantLayout {
    /// `count` must be a perfect square whose root divides `side`.
    pub fn new(side: usize, count: usize) -> Result<Self, String> {
        let per_row = (1..=count).find(|r| r * r >= count).unwrap_or(0);
        if count == 0 || per_row * per_row != count {
            return Err(format!("quadrant count {} is not a perfect square", count));
        }
        if count > u8::MAX as usize + 1 {
            return Err(format!("quadrant count {} exceeds 256", count));
        }
        if side % per_row != 0 {
            return Err(format!(
                "grid side {} does not divide into {} quadrants per row",
                side, per_row
            ));
        }
        Ok(Self {
            side,
            quadrant_side: side / per_row,
            per_row,
        })
    }

    pub fn count(&self) -> usize {
        self.per_row * self.per_row
    }

    pub fn per_row(&self) -> usize {
        self.per_row
    }

    pub fn quadrant_side(&self) -> usize {
        self.quadrant_side
    }

    pub fn side(&self) -> usize {
        self.side
    }

    /// Quadrant id of the cell at column `x`, row `y`.
    #[inline(always)]
    pub fn quadrant_of(&self, x: usize, y: usize) -> usize {
        (y / self.quadrant_side) * self.per_row + (x / self.quadrant_side)
    }

    #[inline(always)]
    pub fn quadrant_of_idx(&self, idx: usize) -> usize {
        self.quadrant_of(idx % self.side, idx / self.side)
    }

    /// Top-left corner (x, y) of a quadrant.
    pub fn bounds(&self, quadrant: usize) -> (usize, usize) {
        (
            (quadrant % self.per_row) * self.quadrant_side,
            (quadrant / self.per_row) * self.quadrant_side,
        )
    }

    /// Fraction of the quadrant's cells that are alive and owned.
    pub fn density(&self, grid: &Grid, quadrant: usize) -> f64 {
        let (x0, y0) = self.bounds(quadrant);
        let mut occupied = 0usize;
        for y in y0..y0 + self.quadrant_side {
            for x in x0..x0 + self.quadrant_side {
                let cell = grid.get(x, y);
                if cell.is_alive() && cell.owner() > 0 {
                    occupied += 1;
                }
            }
        }
        occupied as f64 / (self.quadrant_side * self.quadrant_side) as f64
    }

    /// Kill all alive cells in a quadrant (preserve owner and coins)
    pub fn wipe(&self, grid: &mut Grid, quadrant: usize) -> usize {
        let (x0, y0) = self.bounds(quadrant);
        grid.kill_region(x0, y0, self.quadrant_side, self.quadrant_side)
    }

    /// Territory and coins per player for every quadrant.
    pub fn info(&self, grid: &Grid, control: &QuadrantControl) -> Vec<QuadrantInfo> {
        let count = self.count();
        let mut territory = vec![[0u32; MAX_PLAYERS + 1]; count];
        let mut coins = vec![[0u32; MAX_PLAYERS + 1]; count];

        for (idx, cell) in grid.cells().iter().enumerate() {
            let owner = cell.owner() as usize;
            if owner > 0 && owner <= MAX_PLAYERS {
                let q = self.quadrant_of_idx(idx);
                territory[q][owner] += 1;
                coins[q][owner] += cell.coins() as u32;
            }
        }

        (0..count)
            .map(|q| {
                let territory_by_player: Vec<u32> = territory[q][1..].to_vec();
                let coins_by_player: Vec<u32> = coins[q][1..].to_vec();
                QuadrantInfo {
                    quadrant: q as u8,
                    total_territory: territory_by_player.iter().sum(),
                    territory_by_player,
                    total_coins: coins_by_player.iter().sum(),
                    coins_by_player,
                    controller: control.controller(q),
                }
            })
            .collect()
    }
}

/// Alive cells, territory cells and coins per player slot.
pub fn slot_stats(grid: &Grid) -> Vec<SlotInfo> {
    let mut alive = [0u32; MAX_PLAYERS + 1];
    let mut territory = [0u32; MAX_PLAYERS + 1];
    let mut coins = [0u32; MAX_PLAYERS + 1];

    for cell in grid.cells() {
        let owner = cell.owner() as usize;
        if owner > 0 && owner <= MAX_PLAYERS {
            if cell.is_alive() {
                alive[owner] += 1;
            } else {
                territory[owner] += 1;
            }
            coins[owner] += cell.coins() as u32;
        }
    }

    (1..=MAX_PLAYERS)
        .map(|slot| SlotInfo {
            slot: slot as u8,
            cell_count: alive[slot],
            territory_cells: territory[slot],
            territory_coins: coins[slot],
        })
        .collect()
}

// ============================================================================
// QUADRANT CONTROL
// ============================================================================

/// Owned-cell counts per quadrant and the sticky controller of each.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuadrantControl {
    /// [quadrant][player], player 0 unused
    territory: Vec<[u32; MAX_PLAYERS + 1]>,
    /// 0 = no controller, 1-9 = player number
    controllers: Vec<u8>,
}

impl QuadrantControl {
    pub fn new(count: usize) -> Self {
        Self {
            territory: vec![[0u32; MAX_PLAYERS + 1]; count],
            controllers: vec![0u8; count],
        }
    }

    /// Recount territory from the grid. Controllers come from `seed` when the
    /// authority supplied one per quadrant, otherwise they are derived from
    /// the threshold.
    pub fn rebuild(layout: &QuadrantLayout, grid: &Grid, seed: &[u8]) -> Self {
        let mut control = Self::new(layout.count());

        for (idx, cell) in grid.cells().iter().enumerate() {
            let owner = cell.owner() as usize;
            if owner > 0 && owner <= MAX_PLAYERS {
                control.territory[layout.quadrant_of_idx(idx)][owner] += 1;
            }
        }

        if seed.len() == layout.count() {
            control.controllers.copy_from_slice(seed);
        } else {
            for q in 0..layout.count() {
                let counts = &control.territory[q];
                let total: u32 = counts[1..].iter().sum();
                if total == 0 {
                    continue;
                }
                let threshold = (total * CONTROLLER_THRESHOLD_PERCENT) / 100;
                control.controllers[q] = (1..=MAX_PLAYERS as u8)
                    .find(|&p| counts[p as usize] >= threshold)
                    .unwrap_or(0);
            }
        }
        control
    }

    /// Update territory count when ownership changes.
    /// Returns the new controller if control changed, None otherwise.
    pub fn update(&mut self, quadrant: usize, old_owner: u8, new_owner: u8) -> Option<u8> {
        if old_owner == new_owner {
            return None;
        }

        let counts = &mut self.territory[quadrant];
        if old_owner > 0 && old_owner as usize <= MAX_PLAYERS {
            counts[old_owner as usize] = counts[old_owner as usize].saturating_sub(1);
        }
        if new_owner > 0 && new_owner as usize <= MAX_PLAYERS {
            counts[new_owner as usize] += 1;
        }

        let total: u32 = counts[1..].iter().sum();
        if total == 0 {
            if self.controllers[quadrant] != 0 {
                self.controllers[quadrant] = 0;
                return Some(0);
            }
            return None;
        }

        let threshold = (total * CONTROLLER_THRESHOLD_PERCENT) / 100;
        for player in 1..=MAX_PLAYERS as u8 {
            if counts[player as usize] >= threshold {
                if self.controllers[quadrant] != player {
                    self.controllers[quadrant] = player;
                    return Some(player);
                }
                return None;
            }
        }

        // Nobody over the threshold: controller is sticky
        None
    }

    #[inline(always)]
    pub fn controller(&self, quadrant: usize) -> u8 {
        self.controllers.get(quadrant).copied().unwrap_or(0)
    }

    pub fn controllers(&self) -> &[u8] {
        &self.controllers
    }

    pub fn territory(&self, quadrant: usize, player: u8) -> u32 {
        self.territory[quadrant][player as usize]
    }
}

// ============================================================================
// WIPE SCHEDULE
// ============================================================================

/// Local prediction of the authority's rotating wipe.
///
/// Always armed: the countdown runs toward zero, and on reaching it the
/// target moves to `(next + 1) % count` with the countdown reset to the
/// period. The authority's value overwrites the prediction on every sync.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WipeSchedule {
    next: u8,
    remaining_secs: u64,
    period_secs: u64,
    count: usize,
}

impl WipeSchedule {
    pub fn new(count: usize, period_secs: u64) -> Self {
        Self {
            next: 0,
            remaining_secs: period_secs,
            period_secs,
            count,
        }
    }

    pub fn next_quadrant(&self) -> u8 {
        self.next
    }

    pub fn seconds_until(&self) -> u64 {
        self.remaining_secs
    }

    /// Advance the countdown. Returns the quadrants whose predicted wipe
    /// fell inside `elapsed_secs`, in order.
    pub fn tick(&mut self, elapsed_secs: u64) -> Vec<u8> {
        let mut fired = Vec::new();
        let mut elapsed = elapsed_secs;
        while elapsed >= self.remaining_secs {
            elapsed -= self.remaining_secs;
            fired.push(self.next);
            self.next = ((self.next as usize + 1) % self.count) as u8;
            self.remaining_secs = self.period_secs;
            if self.period_secs == 0 {
                break;
            }
        }
        self.remaining_secs -= elapsed.min(self.remaining_secs);
        fired
    }

    /// Overwrite the prediction with the authority's value.
    pub fn correct(&mut self, info: WipeInfo) -> Result<(), ProtocolViolation> {
        if info.quadrant as usize >= self.count {
            return Err(ProtocolViolation::WipeQuadrant {
                quadrant: info.quadrant,
                count: self.count,
            });
        }
        self.next = info.quadrant;
        self.remaining_secs = info.seconds_until;
        Ok(())
    }
}
