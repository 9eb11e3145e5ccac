//! Session driver: one cooperative timeline carrying the local step loop,
//! the periodic authoritative sync and the wipe countdown.
//!
//! Only the loop writes the store. A fetch runs as a single in-flight future;
//! sync ticks that fire while it is pending are skipped, never queued.

use crate::batch::PlacementBatcher;
use crate::config::ClientConfig;
use crate::error::{BatchError, SyncError};
use crate::quadrant::{QuadrantLayout, WipeSchedule};
use crate::reconciler::{Fetched, Reconciler, SyncOutcome};
use crate::service::LifeService;
use crate::stepper::Stepper;
use crate::store::{GridStore, WorldFrame};
use crate::types::{PlaceResult, QuadrantInfo};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

type FetchFuture = Pin<Box<dyn Future<Output = Result<Fetched, SyncError>> + Send>>;

/// Counters for one `run`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub steps: u64,
    /// Local steps dropped because a sync overwrote the frame meanwhile
    pub discarded_steps: u64,
    pub syncs_ok: u64,
    pub syncs_failed: u64,
    /// Sync ticks skipped because a fetch was still pending
    pub syncs_skipped: u64,
}

pub struct Session {
    config: ClientConfig,
    service: Arc<dyn LifeService>,
    stepper: Stepper,
    store: GridStore,
    reconciler: Reconciler,
    batcher: PlacementBatcher,
}

impl Session {
    pub fn new(config: ClientConfig, service: Arc<dyn LifeService>) -> Result<Self, String> {
        config.validate()?;
        let layout = QuadrantLayout::new(config.grid_size, config.quadrants)?;
        let stepper = Stepper::new(layout, config.tie_break);
        let store = GridStore::new(
            WorldFrame::empty(&layout),
            WipeSchedule::new(layout.count(), config.wipe_period_secs),
        );
        let reconciler = Reconciler::new(service.clone(), layout, config.fetch_timeout);

        Ok(Self {
            batcher: PlacementBatcher::new(config.grid_size),
            config,
            service,
            stepper,
            store,
            reconciler,
        })
    }

    pub fn store(&self) -> &GridStore {
        &self.store
    }

    pub fn batcher(&self) -> &PlacementBatcher {
        &self.batcher
    }

    pub fn layout(&self) -> &QuadrantLayout {
        self.stepper.layout()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Advance the local world one generation.
    pub fn step_once(&self) -> bool {
        let stepper = &self.stepper;
        self.store.advance(|frame| {
            let (grid, control) = stepper.step(&frame.grid, &frame.control);
            WorldFrame {
                generation: frame.generation + 1,
                grid,
                control,
            }
        })
    }

    pub async fn sync_once(&self) -> Result<SyncOutcome, SyncError> {
        self.reconciler.sync_once(&self.store).await
    }

    /// Validate and submit the pending batch.
    pub async fn commit(&self) -> Result<PlaceResult, BatchError> {
        self.batcher
            .commit(self.service.as_ref(), &self.store, self.config.commit_timeout)
            .await
    }

    pub fn density(&self, quadrant: usize) -> f64 {
        self.layout().density(&self.store.snapshot().grid, quadrant)
    }

    pub fn quadrant_info(&self) -> Vec<QuadrantInfo> {
        let frame = self.store.snapshot();
        self.layout().info(&frame.grid, &frame.control)
    }

    pub fn next_wipe(&self) -> WipeSchedule {
        self.store.wipe_schedule()
    }

    /// Run the timeline until `shutdown` resolves.
    pub async fn run<S>(&self, shutdown: S) -> SessionStats
    where
        S: Future<Output = ()>,
    {
        let mut stats = SessionStats::default();

        let mut step_ticker = interval(self.config.step_interval);
        step_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut sync_ticker = interval(self.config.sync_interval);
        sync_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let second = Duration::from_secs(1);
        let mut wipe_ticker = interval_at(Instant::now() + second, second);
        wipe_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut in_flight: Option<FetchFuture> = None;

        info!(
            "Session started: {}x{} grid, step {:?}, sync {:?}",
            self.config.grid_size, self.config.grid_size, self.config.step_interval, self.config.sync_interval
        );

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Session shutting down");
                    break;
                }

                result = async {
                    match in_flight.as_mut() {
                        Some(fetch) => fetch.await,
                        None => std::future::pending().await,
                    }
                }, if in_flight.is_some() => {
                    in_flight = None;
                    match self.reconciler.complete(&self.store, result) {
                        Ok(_) => stats.syncs_ok += 1,
                        Err(_) => stats.syncs_failed += 1,
                    }
                }

                _ = sync_ticker.tick() => {
                    if in_flight.is_some() {
                        debug!("Fetch still pending, skipping sync tick");
                        stats.syncs_skipped += 1;
                    } else {
                        let reconciler = self.reconciler.clone();
                        in_flight = Some(Box::pin(async move { reconciler.fetch().await }));
                    }
                }

                _ = step_ticker.tick() => {
                    if self.step_once() {
                        stats.steps += 1;
                    } else {
                        stats.discarded_steps += 1;
                    }
                }

                _ = wipe_ticker.tick() => {
                    for quadrant in self.store.update_wipe(|w| w.tick(1)) {
                        info!("Quadrant {} due for wipe", quadrant);
                    }
                }
            }
        }

        info!(
            "Session stopped: {} steps, {} syncs ok, {} failed, {} skipped",
            stats.steps, stats.syncs_ok, stats.syncs_failed, stats.syncs_skipped
        );
        stats
    }
}
