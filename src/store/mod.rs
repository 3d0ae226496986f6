//! Persistence port for the engines.
//!
//! Engines never talk to a backend directly; they depend on the
//! [`GameStore`] trait and the tests plug in [`memory::MemoryStore`]. A
//! production adapter only has to implement these seven operations.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::entities::games::{Game, GameKind};
use crate::entities::players::Player;
use crate::errors::domain::DomainError;

pub mod memory;

/// Failures crossing the storage boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An entity document did not round-trip through serde.
    #[error("malformed stored document: {0}")]
    Serde(#[from] serde_json::Error),
    /// Backend-specific failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

// Anything the store cannot read back is corrupt state from the engine's
// point of view.
impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        DomainError::corrupt(err.to_string())
    }
}

/// Storage port shared by all engines.
///
/// Missing entities are `Ok(None)`, never errors; the caller decides what a
/// miss means. Writes are whole-document, last write wins.
#[async_trait]
pub trait GameStore: Send + Sync + 'static {
    async fn load_game(&self, kind: GameKind, tag: &str) -> Result<Option<Game>, StoreError>;

    async fn save_game(&self, game: &Game) -> Result<(), StoreError>;

    /// Delete a game and every player seated in it.
    async fn delete_game(&self, kind: GameKind, tag: &str) -> Result<(), StoreError>;

    async fn load_player(&self, token: Uuid) -> Result<Option<Player>, StoreError>;

    async fn save_player(&self, player: &Player) -> Result<(), StoreError>;

    /// All players of a game, ordered by turn order where assigned and by
    /// join time otherwise.
    async fn players_in_game(&self, kind: GameKind, tag: &str) -> Result<Vec<Player>, StoreError>;

    /// Delete every game (with its players) not modified since `cutoff`.
    /// Returns how many games were removed.
    async fn purge_idle(&self, cutoff: OffsetDateTime) -> Result<usize, StoreError>;
}
