//! In-memory [`GameStore`] backed by concurrent maps.
//!
//! Entities are held as JSON documents rather than live structs so that
//! every load and save exercises the same serde boundary a real backend
//! would. Concurrency is last write wins, which matches the semantics the
//! engines are written against.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::entities::games::{Game, GameKind};
use crate::entities::players::Player;
use crate::store::{GameStore, StoreError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    games: DashMap<(GameKind, String), serde_json::Value>,
    players: DashMap<Uuid, serde_json::Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for wiring engines and services together in tests.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn game_count(&self) -> usize {
        self.games.len()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn load_game(&self, kind: GameKind, tag: &str) -> Result<Option<Game>, StoreError> {
        match self.games.get(&(kind, tag.to_owned())) {
            Some(doc) => Ok(Some(serde_json::from_value(doc.clone())?)),
            None => Ok(None),
        }
    }

    async fn save_game(&self, game: &Game) -> Result<(), StoreError> {
        let doc = serde_json::to_value(game)?;
        self.games.insert((game.kind, game.tag.clone()), doc);
        Ok(())
    }

    async fn delete_game(&self, kind: GameKind, tag: &str) -> Result<(), StoreError> {
        self.games.remove(&(kind, tag.to_owned()));
        // Cascade to the players seated in it.
        let orphans: Vec<Uuid> = self
            .players
            .iter()
            .filter_map(|entry| {
                let in_game = entry.value().get("kind")
                    == Some(&serde_json::to_value(kind).ok()?)
                    && entry.value().get("game_tag").and_then(|v| v.as_str()) == Some(tag);
                in_game.then(|| *entry.key())
            })
            .collect();
        for token in orphans {
            self.players.remove(&token);
        }
        debug!(kind = kind.as_str(), tag, "deleted game");
        Ok(())
    }

    async fn load_player(&self, token: Uuid) -> Result<Option<Player>, StoreError> {
        match self.players.get(&token) {
            Some(doc) => Ok(Some(serde_json::from_value(doc.clone())?)),
            None => Ok(None),
        }
    }

    async fn save_player(&self, player: &Player) -> Result<(), StoreError> {
        let doc = serde_json::to_value(player)?;
        self.players.insert(player.token.0, doc);
        Ok(())
    }

    async fn players_in_game(&self, kind: GameKind, tag: &str) -> Result<Vec<Player>, StoreError> {
        let mut players = Vec::new();
        for entry in self.players.iter() {
            let player: Player = serde_json::from_value(entry.value().clone())?;
            if player.kind == kind && player.game_tag == tag {
                players.push(player);
            }
        }
        // Seated players by turn order, the rest by join time.
        players.sort_by(|a, b| {
            let ka = (a.turn_order.is_none(), a.turn_order, a.joined);
            let kb = (b.turn_order.is_none(), b.turn_order, b.joined);
            ka.cmp(&kb)
        });
        Ok(players)
    }

    async fn purge_idle(&self, cutoff: OffsetDateTime) -> Result<usize, StoreError> {
        let mut idle = Vec::new();
        for entry in self.games.iter() {
            let game: Game = serde_json::from_value(entry.value().clone())?;
            if game.modified < cutoff {
                idle.push((game.kind, game.tag));
            }
        }
        let purged = idle.len();
        for (kind, tag) in idle {
            self.delete_game(kind, &tag).await?;
        }
        if purged > 0 {
            debug!(purged, "purged idle games");
        }
        Ok(purged)
    }
}
