//! Life client: local simulation of the multiplayer Game of Life world.
//!
//! A 512x512 toroidal grid stepped locally at the authority's cadence,
//! overwritten every few seconds by the authority's sparse snapshot, with a
//! batcher that validates and prices placements before submitting them.

// =============================================================================
// MODULE DECLARATIONS
// =============================================================================

pub mod authority;
pub mod batch;
pub mod cell;
pub mod codec;
pub mod config;
pub mod error;
pub mod grid;
pub mod patterns;
pub mod quadrant;
pub mod reconciler;
pub mod service;
pub mod session;
pub mod stepper;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use authority::{AuthorityClient, LocalAuthority};
pub use batch::{PendingPlacement, PlacementBatcher};
pub use cell::Cell;
pub use config::ClientConfig;
pub use error::{BatchError, ProtocolViolation, SyncError, TransportError};
pub use grid::Grid;
pub use patterns::Pattern;
pub use quadrant::{QuadrantControl, QuadrantLayout, WipeSchedule};
pub use reconciler::Reconciler;
pub use service::LifeService;
pub use session::Session;
pub use stepper::{Stepper, TieBreak};
pub use store::{GridStore, WorldFrame};
pub use types::{GameState, PlaceResult, SparseCell, WipeInfo};

// Rule tests live in a separate file
#[cfg(test)]
mod tests;
