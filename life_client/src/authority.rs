//! In-process authority.
//!
//! Runs the same rules as the remote world (placement validation, economy,
//! quadrant wipes) behind the [`LifeService`] seam, for offline play, the
//! demo binary and tests. Transport faults can be injected.

use crate::cell::{Cell, MAX_COINS};
use crate::codec;
use crate::error::TransportError;
use crate::grid::Grid;
use crate::quadrant::{QuadrantControl, QuadrantLayout};
use crate::service::LifeService;
use crate::stepper::Stepper;
use crate::types::{GameState, PlaceResult, WipeInfo, FAUCET_AMOUNT, MAX_PLAYERS};
use async_trait::async_trait;
use candid::Principal;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

/// Max cells accepted in one placement call
pub const MAX_PLACE_CELLS: usize = 1000;

struct World {
    grid: Grid,
    control: QuadrantControl,
    generation: u64,
    /// Index 0 = player 1
    players: Vec<Principal>,
    /// Keyed by principal, persists across slot changes
    balances: HashMap<Principal, u64>,
    next_wipe_quadrant: u8,
    last_wipe: Instant,
}

#[derive(Default)]
struct Faults {
    offline: bool,
    latency: Duration,
}

pub struct LocalAuthority {
    stepper: Stepper,
    wipe_period: Duration,
    world: Mutex<World>,
    faults: Mutex<Faults>,
}

impl LocalAuthority {
    pub fn new(stepper: Stepper, wipe_period: Duration) -> Self {
        let layout = *stepper.layout();
        Self {
            stepper,
            wipe_period,
            world: Mutex::new(World {
                grid: Grid::new(layout.side()),
                control: QuadrantControl::new(layout.count()),
                generation: 0,
                players: Vec::new(),
                balances: HashMap::new(),
                next_wipe_quadrant: 0,
                last_wipe: Instant::now(),
            }),
            faults: Mutex::new(Faults::default()),
        }
    }

    fn layout(&self) -> &QuadrantLayout {
        self.stepper.layout()
    }

    /// A [`LifeService`] acting as `caller`.
    pub fn client(self: &Arc<Self>, caller: Principal) -> AuthorityClient {
        AuthorityClient {
            authority: self.clone(),
            caller,
        }
    }

    // ========================================================================
    // PLAYERS & ECONOMY
    // ========================================================================

    /// Find or create a player slot. Returns the player number (1-9).
    pub fn join(&self, caller: Principal) -> Result<u8, String> {
        if caller == Principal::anonymous() {
            return Err("Authentication required. Please log in.".to_string());
        }
        let mut world = self.world.lock();
        Self::slot_for(&mut world, caller)
    }

    fn slot_for(world: &mut World, caller: Principal) -> Result<u8, String> {
        if let Some(pos) = world.players.iter().position(|&p| p == caller) {
            return Ok((pos + 1) as u8);
        }
        if world.players.len() >= MAX_PLAYERS {
            return Err(format!("Game full - max {} players", MAX_PLAYERS));
        }
        world.players.push(caller);
        Ok(world.players.len() as u8)
    }

    /// Add FAUCET_AMOUNT coins to the caller's wallet
    pub fn faucet(&self, caller: Principal) -> Result<u64, String> {
        if caller == Principal::anonymous() {
            return Err("Authentication required. Please log in.".to_string());
        }
        let mut world = self.world.lock();
        let balance = world.balances.entry(caller).or_insert(0);
        *balance += FAUCET_AMOUNT;
        Ok(*balance)
    }

    /// Place cells for `caller`. All-or-nothing; 1 coin per cell.
    pub fn place_cells(&self, caller: Principal, cells: Vec<(i32, i32)>) -> Result<PlaceResult, String> {
        if caller == Principal::anonymous() {
            return Err("Authentication required. Please log in.".to_string());
        }
        if cells.len() > MAX_PLACE_CELLS {
            return Err(format!("Too many cells: max {} per placement", MAX_PLACE_CELLS));
        }

        let mut world = self.world.lock();
        let player_num = Self::slot_for(&mut world, caller)?;

        let cost = cells.len() as u64;
        let balance = world.balances.get(&caller).copied().unwrap_or(0);
        if balance < cost {
            return Err(format!("Need {} coins, have {}", cost, balance));
        }

        let wrapped: Vec<usize> = cells
            .iter()
            .map(|&(x, y)| {
                let (wx, wy) = world.grid.wrap(x, y);
                world.grid.index(wx as usize, wy as usize)
            })
            .collect();

        // Validation pass: check every cell before placing any
        for &idx in &wrapped {
            let cell = world.grid.get_idx(idx);
            if cell.is_alive() {
                return Err("Cannot place on living cells".to_string());
            }
            if cell.coins() >= MAX_COINS {
                return Err("Cannot place on cells with max coins".to_string());
            }
            if cell.coins() > 0 && cell.owner() > 0 && cell.owner() != player_num {
                return Err("Cannot place on enemy territory with coins".to_string());
            }
        }

        let mut placed = 0u32;
        for &idx in &wrapped {
            let cell = world.grid.get_idx(idx);
            // Duplicates inside one call land on an already-alive cell
            if cell.is_alive() {
                continue;
            }
            let quadrant = self.layout().quadrant_of_idx(idx);
            world.control.update(quadrant, cell.owner(), player_num);
            let coins = cell.coins().saturating_add(1).min(MAX_COINS);
            world.grid.set_idx(idx, Cell::new(player_num, true, coins));
            placed += 1;
        }

        let new_balance = {
            let bal = world.balances.entry(caller).or_insert(0);
            *bal = bal.saturating_sub(placed as u64);
            *bal
        };

        debug!("Player {} placed {} cells", player_num, placed);

        Ok(PlaceResult {
            placed,
            generation: world.generation,
            new_balance,
        })
    }

    // ========================================================================
    // SIMULATION
    // ========================================================================

    /// Run `generations` steps.
    pub fn tick(&self, generations: u32) -> u64 {
        let mut world = self.world.lock();
        for _ in 0..generations {
            let (grid, control) = self.stepper.step(&world.grid, &world.control);
            world.grid = grid;
            world.control = control;
            world.generation += 1;
        }
        world.generation
    }

    /// Wipe the scheduled quadrant if the period has elapsed at `now`.
    pub fn wipe_if_due(&self, now: Instant) -> Option<u8> {
        let due = {
            let world = self.world.lock();
            now.saturating_duration_since(world.last_wipe) >= self.wipe_period
        };
        if !due {
            return None;
        }
        self.world.lock().last_wipe = now;
        Some(self.wipe_next())
    }

    /// Wipe the scheduled quadrant now and advance the schedule.
    pub fn wipe_next(&self) -> u8 {
        let mut world = self.world.lock();
        let quadrant = world.next_wipe_quadrant;
        world.next_wipe_quadrant = ((quadrant as usize + 1) % self.layout().count()) as u8;
        let killed = self.layout().wipe(&mut world.grid, quadrant as usize);
        info!("Wiped quadrant {} ({} cells)", quadrant, killed);
        quadrant
    }

    /// Drive the world like the hosted authority: `generations_per_tick`
    /// steps every `tick_interval`, then a wipe check.
    pub fn spawn_ticker(
        self: &Arc<Self>,
        tick_interval: Duration,
        generations_per_tick: u32,
    ) -> JoinHandle<()> {
        let authority = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                authority.tick(generations_per_tick);
                authority.wipe_if_due(Instant::now());
            }
        })
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn state_for(&self, caller: Principal) -> GameState {
        let world = self.world.lock();
        let sparse = codec::to_sparse(&world.grid);
        let balances = world
            .players
            .iter()
            .map(|p| world.balances.get(p).copied().unwrap_or(0))
            .collect();
        let player_num = world
            .players
            .iter()
            .position(|&p| p == caller)
            .map(|i| (i + 1) as u8);

        GameState {
            generation: world.generation,
            alive_cells: sparse.alive_cells,
            territory: sparse.territory,
            players: world.players.clone(),
            balances,
            player_num,
            quadrant_controllers: world.control.controllers().to_vec(),
        }
    }

    pub fn next_wipe(&self, now: Instant) -> WipeInfo {
        let world = self.world.lock();
        let elapsed = now.saturating_duration_since(world.last_wipe);
        WipeInfo {
            quadrant: world.next_wipe_quadrant,
            seconds_until: self.wipe_period.saturating_sub(elapsed).as_secs(),
        }
    }

    pub fn grid(&self) -> Grid {
        self.world.lock().grid.clone()
    }

    pub fn control(&self) -> QuadrantControl {
        self.world.lock().control.clone()
    }

    pub fn generation(&self) -> u64 {
        self.world.lock().generation
    }

    pub fn balance_of(&self, caller: Principal) -> u64 {
        self.world.lock().balances.get(&caller).copied().unwrap_or(0)
    }

    /// Write a cell directly, bypassing economy (scenario setup).
    pub fn seed_cell(&self, x: usize, y: usize, cell: Cell) {
        let mut world = self.world.lock();
        let idx = world.grid.index(x, y);
        let old = world.grid.get_idx(idx);
        let quadrant = self.layout().quadrant_of_idx(idx);
        world.control.update(quadrant, old.owner(), cell.owner());
        world.grid.set_idx(idx, cell);
    }

    // ========================================================================
    // FAULT INJECTION
    // ========================================================================

    pub fn set_offline(&self, offline: bool) {
        self.faults.lock().offline = offline;
    }

    pub fn set_latency(&self, latency: Duration) {
        self.faults.lock().latency = latency;
    }

    async fn transport(&self) -> Result<(), TransportError> {
        let (offline, latency) = {
            let faults = self.faults.lock();
            (faults.offline, faults.latency)
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if offline {
            return Err(TransportError::Unavailable("local authority offline".to_string()));
        }
        Ok(())
    }
}

/// One caller's view of a [`LocalAuthority`]
#[derive(Clone)]
pub struct AuthorityClient {
    authority: Arc<LocalAuthority>,
    caller: Principal,
}

impl AuthorityClient {
    pub fn caller(&self) -> Principal {
        self.caller
    }
}

#[async_trait]
impl LifeService for AuthorityClient {
    async fn fetch_state(&self) -> Result<GameState, TransportError> {
        self.authority.transport().await?;
        Ok(self.authority.state_for(self.caller))
    }

    async fn fetch_next_wipe(&self) -> Result<WipeInfo, TransportError> {
        self.authority.transport().await?;
        Ok(self.authority.next_wipe(Instant::now()))
    }

    async fn submit_placement(
        &self,
        cells: Vec<(i32, i32)>,
    ) -> Result<Result<PlaceResult, String>, TransportError> {
        self.authority.transport().await?;
        Ok(self.authority.place_cells(self.caller, cells))
    }
}
