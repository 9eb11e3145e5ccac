//! Grid Store: the session's single shared handle on the working world.
//!
//! The current frame is an immutable `Arc<WorldFrame>`. Writers build a new
//! frame off-lock and swap the reference, so a reader never sees a
//! half-stepped grid. Overwrites from the reconciler bump an epoch; a local
//! step computed against an older epoch is dropped instead of clobbering
//! the authoritative state.

use crate::grid::Grid;
use crate::quadrant::{QuadrantControl, QuadrantLayout, WipeSchedule};
use candid::Principal;
use parking_lot::RwLock;
use std::sync::Arc;

/// One generation of the world as seen locally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorldFrame {
    pub generation: u64,
    pub grid: Grid,
    pub control: QuadrantControl,
}

impl WorldFrame {
    /// Empty world at generation 0.
    pub fn empty(layout: &QuadrantLayout) -> Self {
        Self {
            generation: 0,
            grid: Grid::new(layout.side()),
            control: QuadrantControl::new(layout.count()),
        }
    }
}

/// Player roster and balances from the last accepted sync or commit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionStatus {
    pub players: Vec<Principal>,
    pub balances: Vec<u64>,
    pub player_num: Option<u8>,
    /// Authority's balance for this session's player, when known
    pub balance: Option<u64>,
    pub last_sync_generation: Option<u64>,
}

struct Inner {
    epoch: u64,
    frame: Arc<WorldFrame>,
    wipe: WipeSchedule,
    status: SessionStatus,
}

#[derive(Clone)]
pub struct GridStore {
    inner: Arc<RwLock<Inner>>,
}

impl GridStore {
    pub fn new(frame: WorldFrame, wipe: WipeSchedule) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                epoch: 0,
                frame: Arc::new(frame),
                wipe,
                status: SessionStatus::default(),
            })),
        }
    }

    /// Current frame. Cheap: clones the reference, not the grid.
    pub fn snapshot(&self) -> Arc<WorldFrame> {
        self.inner.read().frame.clone()
    }

    /// Number of authoritative overwrites applied so far.
    pub fn epoch(&self) -> u64 {
        self.inner.read().epoch
    }

    /// Replace the whole frame with authoritative state.
    pub fn overwrite(&self, frame: WorldFrame) -> u64 {
        let mut inner = self.inner.write();
        inner.epoch += 1;
        inner.frame = Arc::new(frame);
        inner.epoch
    }

    /// Install an authoritative frame, wipe schedule and roster under one
    /// write lock, so no reader sees the new grid with the old schedule.
    pub fn apply_sync(&self, frame: WorldFrame, wipe: WipeSchedule, status: SessionStatus) -> u64 {
        let mut inner = self.inner.write();
        inner.epoch += 1;
        inner.frame = Arc::new(frame);
        inner.wipe = wipe;
        inner.status = status;
        inner.epoch
    }

    /// Compute the next frame from the current one and swap it in.
    /// Returns false when an overwrite landed while `f` was running.
    pub fn advance<F>(&self, f: F) -> bool
    where
        F: FnOnce(&WorldFrame) -> WorldFrame,
    {
        let (epoch, current) = {
            let inner = self.inner.read();
            (inner.epoch, inner.frame.clone())
        };

        let next = f(&current);

        let mut inner = self.inner.write();
        if inner.epoch != epoch {
            return false;
        }
        inner.frame = Arc::new(next);
        true
    }

    pub fn wipe_schedule(&self) -> WipeSchedule {
        self.inner.read().wipe
    }

    pub fn update_wipe<R>(&self, f: impl FnOnce(&mut WipeSchedule) -> R) -> R {
        f(&mut self.inner.write().wipe)
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.read().status.clone()
    }

    pub fn set_status(&self, status: SessionStatus) {
        self.inner.write().status = status;
    }

    pub fn balance(&self) -> Option<u64> {
        self.inner.read().status.balance
    }

    /// Adopt the authority's balance for this session's player.
    pub fn set_balance(&self, balance: u64) {
        let mut inner = self.inner.write();
        let status = &mut inner.status;
        status.balance = Some(balance);
        let slot = status.player_num.and_then(|num| (num as usize).checked_sub(1));
        if let Some(i) = slot {
            if let Some(entry) = status.balances.get_mut(i) {
                *entry = balance;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;

    fn store() -> (GridStore, QuadrantLayout) {
        let layout = QuadrantLayout::new(8, 4).unwrap();
        let store = GridStore::new(WorldFrame::empty(&layout), WipeSchedule::new(4, 60));
        (store, layout)
    }

    #[test]
    fn test_advance_swaps_frame() {
        let (store, _) = store();
        assert!(store.advance(|f| WorldFrame {
            generation: f.generation + 1,
            ..f.clone()
        }));
        assert_eq!(store.snapshot().generation, 1);
    }

    #[test]
    fn test_overwrite_mid_step_wins() {
        let (store, layout) = store();
        let mut authoritative = WorldFrame::empty(&layout);
        authoritative.generation = 40;
        authoritative.grid.set(2, 2, Cell::new(1, true, 1));

        let applied = store.advance(|f| {
            // Reconciler lands while the step is being computed
            store.overwrite(authoritative.clone());
            WorldFrame {
                generation: f.generation + 1,
                ..f.clone()
            }
        });

        assert!(!applied);
        assert_eq!(*store.snapshot(), authoritative);
        assert_eq!(store.epoch(), 1);
    }

    #[test]
    fn test_set_balance_updates_roster() {
        let (store, _) = store();
        store.set_status(SessionStatus {
            players: vec![Principal::anonymous(), Principal::management_canister()],
            balances: vec![10, 20],
            player_num: Some(2),
            balance: Some(20),
            last_sync_generation: Some(3),
        });
        store.set_balance(7);
        let status = store.status();
        assert_eq!(status.balance, Some(7));
        assert_eq!(status.balances, vec![10, 7]);
    }

    #[test]
    fn test_set_balance_without_player_slot() {
        let (store, _) = store();
        store.set_status(SessionStatus {
            balances: vec![10, 20],
            player_num: Some(0),
            ..SessionStatus::default()
        });
        store.set_balance(7);
        let status = store.status();
        assert_eq!(status.balance, Some(7));
        assert_eq!(status.balances, vec![10, 20]);
    }

    #[test]
    fn test_apply_sync_installs_everything_at_once() {
        let (store, layout) = store();
        let mut frame = WorldFrame::empty(&layout);
        frame.generation = 12;
        frame.grid.set(1, 1, Cell::new(2, true, 0));

        let mut wipe = store.wipe_schedule();
        wipe.correct(crate::types::WipeInfo {
            quadrant: 3,
            seconds_until: 9,
        })
        .unwrap();
        let status = SessionStatus {
            balances: vec![5],
            player_num: Some(1),
            balance: Some(5),
            last_sync_generation: Some(12),
            ..SessionStatus::default()
        };

        let epoch = store.apply_sync(frame.clone(), wipe, status.clone());
        assert_eq!(epoch, 1);
        assert_eq!(store.epoch(), 1);
        assert_eq!(*store.snapshot(), frame);
        assert_eq!(store.wipe_schedule().next_quadrant(), 3);
        assert_eq!(store.wipe_schedule().seconds_until(), 9);
        assert_eq!(store.status(), status);

        // A step computed before the sync is dropped
        let stale = store.snapshot();
        assert!(!store.advance(|_| {
            store.apply_sync(WorldFrame::empty(&layout), wipe, status.clone());
            (*stale).clone()
        }));
        assert_eq!(store.epoch(), 2);
    }
}
