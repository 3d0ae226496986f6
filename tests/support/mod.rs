//! Shared helpers for integration tests.
#![allow(dead_code)]

pub mod logging;

use cardroom::entities::players::Player;
use cardroom::{GameKind, GameStore, MemoryStore};

/// Current roster for a game, in turn order once one is assigned.
pub async fn roster(store: &MemoryStore, kind: GameKind, tag: &str) -> Vec<Player> {
    store
        .players_in_game(kind, tag)
        .await
        .expect("roster should load")
}

/// Token string for the player occupying `seat`.
pub fn token_at(players: &[Player], seat: u8) -> String {
    players
        .iter()
        .find(|p| p.turn_order == Some(seat))
        .expect("seat should be occupied")
        .token
        .to_string()
}

/// Nickname of the player occupying `seat`.
pub fn nick_at(players: &[Player], seat: u8) -> String {
    players
        .iter()
        .find(|p| p.turn_order == Some(seat))
        .expect("seat should be occupied")
        .nickname
        .clone()
}
