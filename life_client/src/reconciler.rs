//! Reconciler: replaces the working world with the authority's snapshot.
//!
//! Every accepted snapshot is a full overwrite. Local generations computed
//! since the previous sync are discarded. A failed or malformed fetch leaves
//! the store untouched and the local stepper keeps running on it.

use crate::codec;
use crate::error::{ProtocolViolation, SyncError};
use crate::quadrant::{QuadrantControl, QuadrantLayout};
use crate::service::LifeService;
use crate::store::{GridStore, SessionStatus, WorldFrame};
use crate::types::{GameState, WipeInfo, MAX_PLAYERS};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Raw answers from one fetch round trip
#[derive(Clone, Debug)]
pub struct Fetched {
    pub state: GameState,
    /// None when only the wipe query failed
    pub wipe: Option<WipeInfo>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncOutcome {
    pub generation: u64,
    pub alive_cells: usize,
    pub epoch: u64,
}

#[derive(Clone)]
pub struct Reconciler {
    service: Arc<dyn LifeService>,
    layout: QuadrantLayout,
    fetch_timeout: Duration,
}

impl Reconciler {
    pub fn new(service: Arc<dyn LifeService>, layout: QuadrantLayout, fetch_timeout: Duration) -> Self {
        Self {
            service,
            layout,
            fetch_timeout,
        }
    }

    /// One bounded round trip. Touches no local state.
    pub async fn fetch(&self) -> Result<Fetched, SyncError> {
        let round_trip = async {
            tokio::join!(self.service.fetch_state(), self.service.fetch_next_wipe())
        };

        let (state, wipe) = tokio::time::timeout(self.fetch_timeout, round_trip)
            .await
            .map_err(|_| SyncError::Timeout(self.fetch_timeout))?;

        let state = state?;
        let wipe = match wipe {
            Ok(info) => Some(info),
            Err(e) => {
                warn!("Wipe schedule fetch failed, keeping local prediction: {}", e);
                None
            }
        };

        Ok(Fetched { state, wipe })
    }

    /// Decode a fetched snapshot into a frame without touching the store.
    pub fn decode(&self, state: &GameState) -> Result<WorldFrame, ProtocolViolation> {
        let grid = codec::to_dense(&state.alive_cells, &state.territory, self.layout.side())?;

        let controllers = &state.quadrant_controllers;
        if !controllers.is_empty() && controllers.len() != self.layout.count() {
            return Err(ProtocolViolation::ControllerCount {
                expected: self.layout.count(),
                got: controllers.len(),
            });
        }

        if let Some((quadrant, &controller)) = controllers
            .iter()
            .enumerate()
            .find(|&(_, &c)| c as usize > MAX_PLAYERS)
        {
            return Err(ProtocolViolation::InvalidController { quadrant, controller });
        }

        if let Some(player_num) = state.player_num {
            if player_num == 0 || player_num as usize > MAX_PLAYERS {
                return Err(ProtocolViolation::InvalidPlayerNum { player_num });
            }
        }

        let control = QuadrantControl::rebuild(&self.layout, &grid, controllers);
        Ok(WorldFrame {
            generation: state.generation,
            grid,
            control,
        })
    }

    /// Apply a fetched snapshot: validate everything first, then overwrite
    /// grid, wipe schedule and roster together.
    pub fn apply(&self, store: &GridStore, fetched: Fetched) -> Result<SyncOutcome, SyncError> {
        let frame = self.decode(&fetched.state)?;

        let mut wipe = store.wipe_schedule();
        if let Some(info) = fetched.wipe {
            wipe.correct(info)?;
        }

        let state = fetched.state;
        let balance = state
            .player_num
            .and_then(|n| state.balances.get((n as usize).checked_sub(1)?).copied());

        let generation = frame.generation;
        let alive_cells = state.alive_cells.len();

        let status = SessionStatus {
            players: state.players,
            balances: state.balances,
            player_num: state.player_num,
            balance,
            last_sync_generation: Some(generation),
        };
        let epoch = store.apply_sync(frame, wipe, status);

        debug!("Applied snapshot gen {} ({} alive), epoch {}", generation, alive_cells, epoch);

        Ok(SyncOutcome {
            generation,
            alive_cells,
            epoch,
        })
    }

    /// Finish a round trip: apply on success, log and contain any failure.
    pub fn complete(
        &self,
        store: &GridStore,
        result: Result<Fetched, SyncError>,
    ) -> Result<SyncOutcome, SyncError> {
        let outcome = result.and_then(|fetched| self.apply(store, fetched));
        match &outcome {
            Ok(o) => info!("Synced to generation {} ({} alive cells)", o.generation, o.alive_cells),
            Err(SyncError::Protocol(v)) => error!("Discarding snapshot: {}", v),
            Err(e) => warn!("Sync failed, keeping local state: {}", e),
        }
        outcome
    }

    pub async fn sync_once(&self, store: &GridStore) -> Result<SyncOutcome, SyncError> {
        let result = self.fetch().await;
        self.complete(store, result)
    }
}
