use candid::{CandidType, Deserialize, Principal};
use serde::Serialize;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default world side (512 x 512 = 262,144 cells)
pub const DEFAULT_GRID_SIZE: usize = 512;

/// Player slots 1..=MAX_PLAYERS; 0 means unowned
pub const MAX_PLAYERS: usize = 9;

/// Quadrants for wipe (4 x 4 layout on the default world)
pub const DEFAULT_QUADRANTS: usize = 16;

/// 80% of a quadrant's owned cells are required to control it
pub const CONTROLLER_THRESHOLD_PERCENT: u32 = 80;

/// Authority cadence: 10 generations per second
pub const DEFAULT_STEP_MS: u64 = 100;
pub const DEFAULT_SYNC_MS: u64 = 5_000;
pub const DEFAULT_WIPE_PERIOD_SECS: u64 = 300; // 5 minutes

/// Coins credited by the authority's faucet
pub const FAUCET_AMOUNT: u64 = 1000;

// =============================================================================
// WIRE TYPES
// =============================================================================

/// One non-default cell in a sparse snapshot
#[derive(CandidType, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct SparseCell {
    pub x: u16,
    pub y: u16,
    pub owner: u8,
    pub coins: u8,
}

/// Authoritative world state in sparse form.
///
/// A coordinate appears in at most one of `alive_cells` / `territory`;
/// absent coordinates are unowned, dead and hold no coins.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, Default)]
pub struct GameState {
    pub generation: u64,
    pub alive_cells: Vec<SparseCell>,
    pub territory: Vec<SparseCell>,
    pub players: Vec<Principal>,
    pub balances: Vec<u64>,
    pub player_num: Option<u8>,
    /// One entry per quadrant: 0 = no controller, 1-9 = player
    #[serde(default)]
    pub quadrant_controllers: Vec<u8>,
}

/// Successful placement answer
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct PlaceResult {
    pub placed: u32,
    pub generation: u64,
    pub new_balance: u64,
}

/// Next scheduled wipe as reported by the authority
#[derive(CandidType, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct WipeInfo {
    pub quadrant: u8,
    pub seconds_until: u64,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SlotInfo {
    pub slot: u8,              // 1-9
    pub cell_count: u32,       // alive cells owned by this slot
    pub territory_cells: u32,  // dead cells (territory) owned by this slot
    pub territory_coins: u32,  // coins sitting in cells owned by this slot
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct QuadrantInfo {
    pub quadrant: u8,
    pub territory_by_player: Vec<u32>, // MAX_PLAYERS values: [P1, P2, ...]
    pub total_territory: u32,
    pub coins_by_player: Vec<u32>,
    pub total_coins: u32,
    pub controller: u8, // 0 = no controller
}
