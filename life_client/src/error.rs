use std::time::Duration;

/// A snapshot or response from the authority that cannot be applied.
/// The whole snapshot is discarded; nothing is partially written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolViolation {
    #[error("coordinate ({x}, {y}) outside grid of side {side}")]
    OutOfRange { x: u16, y: u16, side: usize },
    #[error("owner {owner} at ({x}, {y}) is not a player slot")]
    InvalidOwner { x: u16, y: u16, owner: u8 },
    #[error("{coins} coins at ({x}, {y}) exceeds cell capacity")]
    CoinOverflow { x: u16, y: u16, coins: u8 },
    #[error("coordinate ({x}, {y}) listed twice in {list}")]
    Duplicate { x: u16, y: u16, list: &'static str },
    #[error("expected {expected} quadrant controllers, got {got}")]
    ControllerCount { expected: usize, got: usize },
    #[error("player number {player_num} is not a player slot")]
    InvalidPlayerNum { player_num: u8 },
    #[error("controller {controller} of quadrant {quadrant} is not a player slot")]
    InvalidController { quadrant: usize, controller: u8 },
    #[error("wipe target quadrant {quadrant} out of range ({count} quadrants)")]
    WipeQuadrant { quadrant: u8, count: usize },
}

/// Failure talking to the authority, before any answer was received.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("authority unreachable: {0}")]
    Unavailable(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

/// Reconciliation failure. Never mutates the local grid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),
    #[error("network failure: {0}")]
    NetworkFailure(String),
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),
}

impl From<TransportError> for SyncError {
    fn from(e: TransportError) -> Self {
        SyncError::NetworkFailure(e.to_string())
    }
}

/// Placement batch failure. The batch is left intact for every variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    #[error("batch is empty")]
    Empty,
    #[error("insufficient funds: batch costs {cost}, balance is {balance}")]
    InsufficientFunds { cost: u64, balance: u64 },
    #[error("{} cell(s) already alive: {cells:?}", cells.len())]
    LiveCellConflict { cells: Vec<(u16, u16)> },
    #[error("{} cell(s) placed more than once: {cells:?}", cells.len())]
    InternalOverlap { cells: Vec<(u16, u16)> },
    #[error("a commit for this batch is already in flight")]
    CommitInFlight,
    #[error("{0}")]
    ServerRejection(String),
    #[error("network failure: {0}")]
    NetworkFailure(String),
    #[error("commit timed out after {0:?}")]
    Timeout(Duration),
}
