use crate::error::TransportError;
use crate::types::{GameState, PlaceResult, WipeInfo};
use async_trait::async_trait;

/// Remote authority seam.
///
/// The outer `Result` is the transport: the call never produced an answer.
/// The inner `Result` of `submit_placement` is the authority's own verdict,
/// with its rejection message passed through unmodified.
#[async_trait]
pub trait LifeService: Send + Sync {
    async fn fetch_state(&self) -> Result<GameState, TransportError>;

    async fn fetch_next_wipe(&self) -> Result<WipeInfo, TransportError>;

    async fn submit_placement(
        &self,
        cells: Vec<(i32, i32)>,
    ) -> Result<Result<PlaceResult, String>, TransportError>;
}
