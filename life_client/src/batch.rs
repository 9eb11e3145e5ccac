//! Placement Batcher: accumulate patterns, validate them against the live
//! grid, and submit them to the authority as one priced batch.
//!
//! Pending placements never touch the grid. Adds and removals stay open
//! while a commit is in flight; a second commit is refused until the first
//! resolves.

use crate::error::BatchError;
use crate::grid::Grid;
use crate::patterns::Pattern;
use crate::service::LifeService;
use crate::store::GridStore;
use crate::types::PlaceResult;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Cost of one placed cell
pub const PLACEMENT_COST: u64 = 1;

#[derive(Clone, Debug, PartialEq)]
pub struct PendingPlacement {
    pub id: u64,
    /// Absolute, wrapped (x, y) coordinates in pattern order
    pub cells: Vec<(u16, u16)>,
    pub pattern: String,
    /// Display centre, wrapped onto the grid
    pub centroid: (f32, f32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchPhase {
    Empty,
    Accumulating,
    Committing,
}

#[derive(Default)]
struct BatchState {
    pending: Vec<PendingPlacement>,
    next_id: u64,
    committing: bool,
}

/// Clears the in-flight flag however the commit ends
struct CommitGuard {
    state: Arc<Mutex<BatchState>>,
}

impl CommitGuard {
    fn acquire(state: &Arc<Mutex<BatchState>>) -> Result<(Self, Vec<PendingPlacement>), BatchError> {
        let mut s = state.lock();
        if s.committing {
            return Err(BatchError::CommitInFlight);
        }
        s.committing = true;
        let pending = s.pending.clone();
        Ok((
            Self {
                state: state.clone(),
            },
            pending,
        ))
    }
}

impl Drop for CommitGuard {
    fn drop(&mut self) {
        self.state.lock().committing = false;
    }
}

#[derive(Clone)]
pub struct PlacementBatcher {
    state: Arc<Mutex<BatchState>>,
    side: usize,
}

impl PlacementBatcher {
    pub fn new(side: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(BatchState::default())),
            side,
        }
    }

    /// Translate `pattern` to `anchor` and queue it. Returns the placement id.
    pub fn add(&self, pattern: &Pattern, anchor: (i32, i32)) -> Result<u64, BatchError> {
        if pattern.is_empty() {
            return Err(BatchError::Empty);
        }

        // Wrap in i64 so extreme anchors plus offsets cannot overflow
        let side = self.side as i64;
        let ax = (anchor.0 as i64).rem_euclid(side);
        let ay = (anchor.1 as i64).rem_euclid(side);
        let cells: Vec<(u16, u16)> = pattern
            .offsets
            .iter()
            .map(|&(dx, dy)| {
                (
                    (ax + dx as i64).rem_euclid(side) as u16,
                    (ay + dy as i64).rem_euclid(side) as u16,
                )
            })
            .collect();

        let n = pattern.len() as f32;
        let mean_dx = pattern.offsets.iter().map(|o| o.0 as f32).sum::<f32>() / n;
        let mean_dy = pattern.offsets.iter().map(|o| o.1 as f32).sum::<f32>() / n;
        let centroid = (
            (ax as f32 + mean_dx).rem_euclid(self.side as f32),
            (ay as f32 + mean_dy).rem_euclid(self.side as f32),
        );

        let mut s = self.state.lock();
        let id = s.next_id;
        s.next_id += 1;
        s.pending.push(PendingPlacement {
            id,
            cells,
            pattern: pattern.name.clone(),
            centroid,
        });
        Ok(id)
    }

    pub fn remove(&self, id: u64) -> bool {
        let mut s = self.state.lock();
        let before = s.pending.len();
        s.pending.retain(|p| p.id != id);
        s.pending.len() != before
    }

    /// Cancel every pending placement. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut s = self.state.lock();
        let n = s.pending.len();
        s.pending.clear();
        n
    }

    pub fn placements(&self) -> Vec<PendingPlacement> {
        self.state.lock().pending.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cost(&self) -> u64 {
        batch_cost(&self.state.lock().pending)
    }

    pub fn is_committing(&self) -> bool {
        self.state.lock().committing
    }

    pub fn phase(&self) -> BatchPhase {
        let s = self.state.lock();
        if s.committing {
            BatchPhase::Committing
        } else if s.pending.is_empty() {
            BatchPhase::Empty
        } else {
            BatchPhase::Accumulating
        }
    }

    /// Validate against the store's current grid and balance, then submit.
    ///
    /// On success the submitted placements leave the batch (placements added
    /// during the round trip stay) and the authority's balance is adopted.
    /// On any failure the batch is left as it was.
    pub async fn commit(
        &self,
        service: &dyn LifeService,
        store: &GridStore,
        timeout: Duration,
    ) -> Result<PlaceResult, BatchError> {
        let (_guard, pending) = CommitGuard::acquire(&self.state)?;

        let balance = store.balance().unwrap_or(0);
        let frame = store.snapshot();
        let cells = validate(&pending, &frame.grid, balance)?;
        drop(frame);

        let submitted: HashSet<u64> = pending.iter().map(|p| p.id).collect();
        let cells: Vec<(i32, i32)> = cells.into_iter().map(|(x, y)| (x as i32, y as i32)).collect();
        let count = cells.len();

        let result = match tokio::time::timeout(timeout, service.submit_placement(cells)).await {
            Err(_) => Err(BatchError::Timeout(timeout)),
            Ok(Err(transport)) => Err(BatchError::NetworkFailure(transport.to_string())),
            Ok(Ok(Err(message))) => Err(BatchError::ServerRejection(message)),
            Ok(Ok(Ok(placed))) => Ok(placed),
        };

        match result {
            Ok(placed) => {
                self.state.lock().pending.retain(|p| !submitted.contains(&p.id));
                store.set_balance(placed.new_balance);
                info!(
                    "Committed {} cells in {} placements, balance now {}",
                    placed.placed,
                    submitted.len(),
                    placed.new_balance
                );
                Ok(placed)
            }
            Err(e) => {
                warn!("Commit of {} cells failed: {}", count, e);
                Err(e)
            }
        }
    }
}

/// Total cost of a batch: one unit per coordinate.
pub fn batch_cost(pending: &[PendingPlacement]) -> u64 {
    pending.iter().map(|p| p.cells.len() as u64).sum::<u64>() * PLACEMENT_COST
}

/// Local pre-flight checks, in order: funds, live-cell conflicts, overlaps
/// within the batch. Returns the flattened coordinate list on success.
pub fn validate(
    pending: &[PendingPlacement],
    grid: &Grid,
    balance: u64,
) -> Result<Vec<(u16, u16)>, BatchError> {
    if pending.is_empty() {
        return Err(BatchError::Empty);
    }

    let cost = batch_cost(pending);
    if cost > balance {
        return Err(BatchError::InsufficientFunds { cost, balance });
    }

    let cells: Vec<(u16, u16)> = pending.iter().flat_map(|p| p.cells.iter().copied()).collect();

    let live: BTreeSet<(u16, u16)> = cells
        .iter()
        .copied()
        .filter(|&(x, y)| grid.get(x as usize, y as usize).is_alive())
        .collect();
    if !live.is_empty() {
        return Err(BatchError::LiveCellConflict {
            cells: live.into_iter().collect(),
        });
    }

    let mut seen = HashSet::with_capacity(cells.len());
    let overlaps: BTreeSet<(u16, u16)> = cells.iter().copied().filter(|c| !seen.insert(*c)).collect();
    if !overlaps.is_empty() {
        return Err(BatchError::InternalOverlap {
            cells: overlaps.into_iter().collect(),
        });
    }

    Ok(cells)
}
