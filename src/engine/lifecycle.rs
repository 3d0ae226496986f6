//! Shared game lifecycle plumbing: resolution, seating, start checks and
//! teardown. The three engines differ in rules, not in how players arrive
//! and leave, so that shape lives here once.

use rand::Rng;
use tracing::{debug, info};

use crate::domain::seats::{random_turn_order, Seat};
use crate::engine::Outcome;
use crate::entities::games::{Game, GameData, GameKind};
use crate::entities::players::{Player, PlayerData, PlayerToken};
use crate::errors::domain::{DomainError, NotFoundKind, ValidationKind};
use crate::store::GameStore;

/// Resolve `(tag, token)` to the acting game and player.
///
/// The four failure categories are distinct, user-visible errors checked in
/// this order: game not found, malformed token, player not found, player
/// seated in a different game.
pub async fn resolve<S: GameStore>(
    store: &S,
    kind: GameKind,
    tag: &str,
    token: &str,
) -> Result<(Game, Player), DomainError> {
    let game = store
        .load_game(kind, tag)
        .await?
        .ok_or_else(|| DomainError::not_found(NotFoundKind::Game, format!("Game {tag} does not exist")))?;

    let token = PlayerToken::parse(token)?;

    let player = store
        .load_player(token.0)
        .await?
        .ok_or_else(|| DomainError::not_found(NotFoundKind::Player, format!("Player {token} does not exist")))?;

    if player.kind != kind || player.game_tag != tag {
        return Err(DomainError::wrong_game(format!(
            "Player {} is not in game {tag}",
            player.nickname
        )));
    }

    Ok((game, player))
}

/// Resolve for read-only state projection: a missing game is still an
/// error, but any player-side failure degrades to the public view.
pub async fn resolve_viewer<S: GameStore>(
    store: &S,
    kind: GameKind,
    tag: &str,
    token: &str,
) -> Result<(Game, Option<Player>), DomainError> {
    match resolve(store, kind, tag, token).await {
        Ok((game, player)) => Ok((game, Some(player))),
        Err(err @ DomainError::NotFound(NotFoundKind::Game, _)) => Err(err),
        Err(err) if err.is_corrupt() => Err(err),
        Err(_) => {
            let game = store.load_game(kind, tag).await?.ok_or_else(|| {
                DomainError::not_found(NotFoundKind::Game, format!("Game {tag} does not exist"))
            })?;
            Ok((game, None))
        }
    }
}

/// How a `join` request was satisfied; the engines build their own
/// user-facing messages from this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seated {
    /// The game did not exist; it was created with the caller as owner.
    Created,
    /// The nickname already had a seat; its existing token is returned and
    /// no client refresh is needed.
    Rejoined,
    /// A new seat was added; `count` is the seat total afterwards.
    Joined { count: usize },
}

/// Seat a player, creating the game on first contact.
///
/// Rejoining by nickname returns the existing seat's token unchanged. New
/// seats are rejected once the game has left its gathering stage or holds
/// `max_players`.
pub async fn join_game<S: GameStore>(
    store: &S,
    kind: GameKind,
    max_players: usize,
    tag: &str,
    nickname: &str,
    new_game: impl FnOnce() -> GameData,
    new_seat: impl FnOnce() -> PlayerData,
) -> Result<(PlayerToken, Seated), DomainError> {
    let Some(game) = store.load_game(kind, tag).await? else {
        let game = Game::new(kind, tag, new_game());
        let owner = Player::new(kind, tag, nickname, true, new_seat());
        let token = owner.token;
        store.save_game(&game).await?;
        store.save_player(&owner).await?;
        info!(kind = kind.as_str(), tag, nickname, "game created");
        return Ok((token, Seated::Created));
    };

    let players = store.players_in_game(kind, tag).await?;
    if let Some(existing) = players.iter().find(|p| p.nickname == nickname) {
        debug!(kind = kind.as_str(), tag, nickname, "player rejoined");
        return Ok((existing.token, Seated::Rejoined));
    }

    if !game.is_gathering() {
        return Err(DomainError::validation(
            ValidationKind::GameInProgress,
            format!("Game {tag} already in progress"),
        ));
    }
    if players.len() >= max_players {
        return Err(DomainError::validation(
            ValidationKind::GameFull,
            format!("Game {tag} already has the maximum number of players ({max_players})"),
        ));
    }

    let player = Player::new(kind, tag, nickname, false, new_seat());
    let token = player.token;
    store.save_player(&player).await?;
    debug!(kind = kind.as_str(), tag, nickname, "player joined");
    Ok((token, Seated::Joined { count: players.len() + 1 }))
}

/// Check the shared `start` preconditions: startable stage and minimum
/// seat count.
pub fn ensure_startable(
    game: &Game,
    count: usize,
    min_players: usize,
) -> Result<(), DomainError> {
    if !game.is_gathering() && !game.is_over() {
        return Err(DomainError::validation(
            ValidationKind::StageMismatch,
            format!("Game {} is already in progress", game.tag),
        ));
    }
    if count < min_players {
        return Err(DomainError::validation(
            ValidationKind::NotEnoughPlayers,
            format!("Not enough players to start game {} ({count})", game.tag),
        ));
    }
    Ok(())
}

/// Assign a uniformly random turn-order permutation to the seated players.
pub fn assign_turn_order(players: &mut [Player], rng: &mut impl Rng) {
    let order = random_turn_order(players.len(), rng);
    for (player, seat) in players.iter_mut().zip(order) {
        player.turn_order = Some(seat);
    }
}

/// The player occupying `seat`, if any.
pub fn player_at(players: &[Player], seat: Seat) -> Option<&Player> {
    players.iter().find(|p| p.is_seat(seat))
}

/// The player occupying `seat`; its absence is corrupt state, not user
/// error.
pub fn expect_player_at(players: &[Player], seat: Seat) -> Result<&Player, DomainError> {
    player_at(players, seat)
        .ok_or_else(|| DomainError::corrupt(format!("no player at seat {seat}")))
}

/// Nicknames in the given order, comma-joined for display.
pub fn nickname_list<'a>(players: impl IntoIterator<Item = &'a Player>) -> String {
    players
        .into_iter()
        .map(|p| p.nickname.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Delete a game and every player seated in it. The caller is resolved
/// first, so only a seated player may tear a game down.
pub async fn destroy<S: GameStore>(
    store: &S,
    kind: GameKind,
    tag: &str,
    token: &str,
) -> Result<Outcome, DomainError> {
    let (game, player) = resolve(store, kind, tag, token).await?;
    store.delete_game(kind, tag).await?;
    info!(
        kind = kind.as_str(),
        tag = game.tag.as_str(),
        by = player.nickname.as_str(),
        "game destroyed"
    );
    Ok(Outcome::quiet(format!("game {tag} deleted")))
}
