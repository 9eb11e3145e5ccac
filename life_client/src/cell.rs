//! Packed cell representation shared by the grid, codec and stepper.

// ============================================================================
// CELL ENCODING
// ============================================================================
//
// Each cell is 1 byte with three fields packed:
// ┌─────────┬────────┬──────────┐
// │ bits 7-5│ bit 4  │ bits 3-0 │
// │  coins  │ alive  │  owner   │
// │  (0-7)  │ (0/1)  │  (0-9)   │
// └─────────┴────────┴──────────┘

const OWNER_MASK: u8 = 0x0F; // bits 0-3
const ALIVE_BIT: u8 = 0x10; // bit 4
const COINS_SHIFT: u8 = 5; // bits 5-7

/// Highest coin count a single cell can hold (3 bits).
pub const MAX_COINS: u8 = 7;

/// One grid cell: owner, stored coins and liveness.
///
/// A dead cell may still carry an owner and coins (territory).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Cell(u8);

impl Cell {
    /// Fully default cell: unowned, dead, no coins.
    pub const EMPTY: Cell = Cell(0);

    #[inline(always)]
    pub fn new(owner: u8, alive: bool, coins: u8) -> Self {
        Cell(
            ((coins & MAX_COINS) << COINS_SHIFT)
                | (if alive { ALIVE_BIT } else { 0 })
                | (owner & OWNER_MASK),
        )
    }

    #[inline(always)]
    pub fn owner(self) -> u8 {
        self.0 & OWNER_MASK
    }

    #[inline(always)]
    pub fn is_alive(self) -> bool {
        self.0 & ALIVE_BIT != 0
    }

    #[inline(always)]
    pub fn coins(self) -> u8 {
        self.0 >> COINS_SHIFT
    }

    #[inline(always)]
    pub fn with_alive(self, alive: bool) -> Self {
        if alive {
            Cell(self.0 | ALIVE_BIT)
        } else {
            Cell(self.0 & !ALIVE_BIT)
        }
    }

    #[inline(always)]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Raw byte, as the authority stores it.
    #[inline(always)]
    pub fn bits(self) -> u8 {
        self.0
    }
}
