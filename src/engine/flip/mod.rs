//! The bid-and-flip elimination game.
//!
//! Every living player stacks cards face down, someone bids to flip a
//! number of them without hitting a skull, and the winning bidder must
//! flip their own stack before anyone else's. Losing a round costs a
//! random card; running out of cards eliminates the player.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::domain::codec::FlipCard;
use crate::domain::seats::{next_eligible, Seat};
use crate::engine::lifecycle::{self, Seated};
use crate::engine::{JoinOutcome, Outcome};
use crate::entities::games::{FlipGame, FlipStage, GameData, GameKind};
use crate::entities::players::{FlipSeat, Player, PlayerData};
use crate::errors::domain::{DomainError, ValidationKind};
use crate::store::GameStore;

mod view;

pub const MIN_PLAYERS: usize = 3;
pub const MAX_PLAYERS: usize = 10;
pub const WINNING_POINTS: u32 = 2;

/// Next seat eligible to act: alive and not passed, searching forward from
/// `current` with wraparound.
fn advance(players: &[Player], current: Seat) -> Result<Option<Seat>, DomainError> {
    let mut eligible = vec![false; players.len()];
    for player in players {
        if let Some(seat) = player.turn_order {
            let state = player.flip_seat()?;
            eligible[seat as usize] = state.alive && !state.passed;
        }
    }
    Ok(next_eligible(players.len(), current, |s| eligible[s as usize]))
}

/// Reset the per-round game fields ready for the next STARTING phase.
fn reset_round(state: &mut FlipGame) {
    state.stage = FlipStage::Starting;
    state.placed = 0;
    state.bidder = None;
    state.bid = 0;
    state.flipped = 0;
    state.skuller = None;
    state.winner = None;
}

/// What the given seat may do when it is next to act in PLACING.
fn place_or_bid(player: &Player) -> Result<&'static str, DomainError> {
    Ok(if player.flip_seat()?.hand.is_empty() {
        "bid"
    } else {
        "place or bid"
    })
}

pub struct FlipEngine<S> {
    store: Arc<S>,
    rng: Mutex<ChaCha8Rng>,
}

impl<S: GameStore> FlipEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            rng: Mutex::new(ChaCha8Rng::from_os_rng()),
        }
    }

    /// Deterministic variant for tests.
    pub fn with_seed(store: Arc<S>, seed: u64) -> Self {
        Self {
            store,
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    pub async fn join(&self, tag: &str, nickname: &str) -> Result<JoinOutcome, DomainError> {
        let (token, seated) = lifecycle::join_game(
            self.store.as_ref(),
            GameKind::Flip,
            MAX_PLAYERS,
            tag,
            nickname,
            || GameData::Flip(FlipGame::new()),
            || PlayerData::Flip(FlipSeat::new()),
        )
        .await?;

        Ok(match seated {
            Seated::Created => JoinOutcome {
                token,
                message: format!("Game {tag} created, owned by {nickname}"),
                notify: true,
            },
            Seated::Rejoined => JoinOutcome {
                token,
                message: format!("Rejoining game {tag} as existing player {nickname}"),
                notify: false,
            },
            Seated::Joined { .. } => JoinOutcome {
                token,
                message: format!("Player {nickname} joined game {tag}"),
                notify: true,
            },
        })
    }

    pub async fn start(&self, tag: &str, token: &str) -> Result<Outcome, DomainError> {
        let (mut game, _) = lifecycle::resolve(self.store.as_ref(), GameKind::Flip, tag, token).await?;
        let mut players = self.store.players_in_game(GameKind::Flip, tag).await?;
        lifecycle::ensure_startable(&game, players.len(), MIN_PLAYERS)?;

        {
            let mut rng = self.rng.lock();
            lifecycle::assign_turn_order(&mut players, &mut *rng);
        }
        for player in &mut players {
            player.flip_seat_mut()?.reset();
        }
        players.sort_by_key(|p| p.turn_order);

        reset_round(game.flip_mut()?);
        game.next_player = Some(0);
        game.touch();

        for player in &players {
            self.store.save_player(player).await?;
        }
        self.store.save_game(&game).await?;

        let leader = lifecycle::expect_player_at(&players, 0)?;
        info!(tag, players = players.len(), "flip game started");
        Ok(Outcome::notify(format!(
            "Started game {tag}, turn order is [{}], {} to lead, all players must place their first card",
            lifecycle::nickname_list(&players),
            leader.nickname
        )))
    }

    /// Take a card from the actor's hand by index and put it on their
    /// stack. In STARTING every living player places once, in any order;
    /// in PLACING only the seat on turn may place.
    pub async fn place(&self, tag: &str, token: &str, card_idx: usize) -> Result<Outcome, DomainError> {
        let (mut game, actor) =
            lifecycle::resolve(self.store.as_ref(), GameKind::Flip, tag, token).await?;
        let mut players = self.store.players_in_game(GameKind::Flip, tag).await?;
        let actor_idx = roster_index(&players, &actor)?;

        match game.flip()?.stage {
            FlipStage::Starting => {
                {
                    let state = players[actor_idx].flip_seat()?;
                    if !state.alive {
                        return Err(DomainError::validation_other(format!(
                            "{} is out of the game",
                            actor.nickname
                        )));
                    }
                    if !state.stack.is_empty() {
                        return Err(DomainError::validation_other(format!(
                            "{} has already placed their first card",
                            actor.nickname
                        )));
                    }
                    if card_idx >= state.hand.len() {
                        return Err(DomainError::validation(
                            ValidationKind::OutOfRange,
                            format!(
                                "selected card is out of range for {}'s hand ({card_idx})",
                                actor.nickname
                            ),
                        ));
                    }
                }
                {
                    let state = players[actor_idx].flip_seat_mut()?;
                    let card = state.hand.remove(card_idx);
                    state.stack.push(card);
                }
                game.flip_mut()?.placed += 1;

                let awaited: Vec<&Player> = players
                    .iter()
                    .filter(|p| {
                        matches!(p.flip_seat(), Ok(s) if s.alive && s.stack.is_empty())
                    })
                    .collect();
                let message = if awaited.is_empty() {
                    game.flip_mut()?.stage = FlipStage::Placing;
                    let starter = game
                        .next_player
                        .ok_or_else(|| DomainError::corrupt("no round starter recorded"))?;
                    let next = advance(&players, starter)?
                        .ok_or_else(|| DomainError::corrupt("no seat eligible to place"))?;
                    game.next_player = Some(next);
                    let next_player = lifecycle::expect_player_at(&players, next)?;
                    format!(
                        "all players have placed their first card, {} must {}",
                        next_player.nickname,
                        place_or_bid(next_player)?
                    )
                } else {
                    format!(
                        "{} has placed their first card, waiting for {}",
                        actor.nickname,
                        lifecycle::nickname_list(awaited)
                    )
                };
                game.touch();

                self.store.save_player(&players[actor_idx]).await?;
                self.store.save_game(&game).await?;
                Ok(Outcome::notify(message))
            }
            FlipStage::Placing => {
                if game.next_player != actor.turn_order {
                    return Err(DomainError::validation(
                        ValidationKind::OutOfTurn,
                        format!("it is not player {}'s turn to place now", actor.nickname),
                    ));
                }
                if card_idx >= players[actor_idx].flip_seat()?.hand.len() {
                    return Err(DomainError::validation(
                        ValidationKind::OutOfRange,
                        format!("selected card is not in {}'s hand ({card_idx})", actor.nickname),
                    ));
                }

                {
                    let state = players[actor_idx].flip_seat_mut()?;
                    let card = state.hand.remove(card_idx);
                    state.stack.push(card);
                }
                game.flip_mut()?.placed += 1;

                let current = game
                    .next_player
                    .ok_or_else(|| DomainError::corrupt("no seat on turn during placing"))?;
                let next = advance(&players, current)?
                    .ok_or_else(|| DomainError::corrupt("no seat eligible to place"))?;
                game.next_player = Some(next);
                game.touch();

                self.store.save_player(&players[actor_idx]).await?;
                self.store.save_game(&game).await?;

                let next_player = lifecycle::expect_player_at(&players, next)?;
                Ok(Outcome::notify(format!(
                    "{} has placed, {} must {}",
                    actor.nickname,
                    next_player.nickname,
                    place_or_bid(next_player)?
                )))
            }
            _ => Err(DomainError::validation(
                ValidationKind::StageMismatch,
                "placing a card is not allowed at this game stage",
            )),
        }
    }

    /// Bid to turn over a certain number of cards. A bid of every placed
    /// card closes the auction immediately.
    pub async fn bid(&self, tag: &str, token: &str, count: u32) -> Result<Outcome, DomainError> {
        let (mut game, actor) =
            lifecycle::resolve(self.store.as_ref(), GameKind::Flip, tag, token).await?;

        let (stage, placed, standing) = {
            let state = game.flip()?;
            (state.stage, state.placed, state.bid)
        };
        match stage {
            FlipStage::Placing => {
                if game.next_player != actor.turn_order {
                    return Err(DomainError::validation(
                        ValidationKind::OutOfTurn,
                        format!("it is not {}'s turn to place now", actor.nickname),
                    ));
                }
                if count < 1 || count > placed {
                    return Err(DomainError::validation(
                        ValidationKind::InvalidBid,
                        format!("bid of {count} is not valid ({placed} cards available)"),
                    ));
                }
            }
            FlipStage::Bidding => {
                if game.next_player != actor.turn_order {
                    return Err(DomainError::validation(
                        ValidationKind::OutOfTurn,
                        format!("it is not {}'s turn to bid now", actor.nickname),
                    ));
                }
                if count <= standing || count > placed {
                    return Err(DomainError::validation(
                        ValidationKind::InvalidBid,
                        format!(
                            "bid of {count} is not valid (bid stands at {standing} with {placed} cards available)"
                        ),
                    ));
                }
            }
            _ => {
                return Err(DomainError::validation(
                    ValidationKind::StageMismatch,
                    "bidding is not allowed at this game stage",
                ))
            }
        }

        let bidder = game.next_player;
        {
            let state = game.flip_mut()?;
            state.bidder = bidder;
            state.bid = count;
        }

        let message = if count < placed {
            let players = self.store.players_in_game(GameKind::Flip, tag).await?;
            let current = game
                .next_player
                .ok_or_else(|| DomainError::corrupt("no seat on turn during bidding"))?;
            let next = advance(&players, current)?
                .ok_or_else(|| DomainError::corrupt("no seat eligible to bid"))?;
            game.flip_mut()?.stage = FlipStage::Bidding;
            game.next_player = Some(next);
            let next_nick = &lifecycle::expect_player_at(&players, next)?.nickname;
            if stage == FlipStage::Placing {
                format!(
                    "{} started the bidding at {count}, {next_nick} must bid higher or pass",
                    actor.nickname
                )
            } else {
                format!(
                    "{} raised bid to {count}, {next_nick} must bid higher or pass",
                    actor.nickname
                )
            }
        } else {
            game.flip_mut()?.stage = FlipStage::Flipping;
            format!(
                "{} bid {count} for all placed cards and now must flip",
                actor.nickname
            )
        };
        game.touch();

        self.store.save_game(&game).await?;
        Ok(Outcome::notify(message))
    }

    /// Surrender bidding for the rest of the round.
    pub async fn decline(&self, tag: &str, token: &str) -> Result<Outcome, DomainError> {
        let (mut game, actor) =
            lifecycle::resolve(self.store.as_ref(), GameKind::Flip, tag, token).await?;

        if game.flip()?.stage != FlipStage::Bidding {
            return Err(DomainError::validation(
                ValidationKind::StageMismatch,
                "passing is not a valid move at this game stage",
            ));
        }
        if game.next_player != actor.turn_order {
            return Err(DomainError::validation(
                ValidationKind::OutOfTurn,
                format!("it is not {}'s turn to bid now", actor.nickname),
            ));
        }

        let mut players = self.store.players_in_game(GameKind::Flip, tag).await?;
        let actor_idx = roster_index(&players, &actor)?;
        players[actor_idx].flip_seat_mut()?.passed = true;

        let current = game
            .next_player
            .ok_or_else(|| DomainError::corrupt("no seat on turn during bidding"))?;
        let next = advance(&players, current)?
            .ok_or_else(|| DomainError::corrupt("no seat eligible to bid"))?;
        game.next_player = Some(next);

        let message = if game.flip()?.bidder == Some(next) {
            game.flip_mut()?.stage = FlipStage::Flipping;
            format!(
                "{} passed, {} wins the bid and must now flip {}",
                actor.nickname,
                lifecycle::expect_player_at(&players, next)?.nickname,
                game.flip()?.bid
            )
        } else {
            format!(
                "{} passed, {} must bid or pass",
                actor.nickname,
                lifecycle::expect_player_at(&players, next)?.nickname
            )
        };
        game.touch();

        self.store.save_player(&players[actor_idx]).await?;
        self.store.save_game(&game).await?;
        Ok(Outcome::notify(message))
    }

    /// Flip the top unflipped card of the target's stack. The target is
    /// identified by nickname, since tokens are never shown to other
    /// players; the flipper's own stack must be exhausted first.
    pub async fn flip(&self, tag: &str, token: &str, nickname: &str) -> Result<Outcome, DomainError> {
        let (mut game, actor) =
            lifecycle::resolve(self.store.as_ref(), GameKind::Flip, tag, token).await?;

        if game.flip()?.stage != FlipStage::Flipping {
            return Err(DomainError::validation(
                ValidationKind::StageMismatch,
                "flipping is not a valid action at this game stage",
            ));
        }
        if game.next_player != actor.turn_order {
            return Err(DomainError::validation(
                ValidationKind::OutOfTurn,
                format!("{} is not the player flipping", actor.nickname),
            ));
        }

        let mut players = self.store.players_in_game(GameKind::Flip, tag).await?;
        let actor_idx = roster_index(&players, &actor)?;

        // Own stack comes first; the target only matters once it is spent.
        let own_remaining = {
            let state = players[actor_idx].flip_seat()?;
            (state.flipped as usize) < state.stack.len()
        };
        let target_idx = if own_remaining {
            actor_idx
        } else {
            let idx = players
                .iter()
                .position(|p| p.nickname == nickname)
                .ok_or_else(|| {
                    DomainError::validation(
                        ValidationKind::InvalidTarget,
                        format!("cannot flip for non-existent player {nickname}"),
                    )
                })?;
            let state = players[idx].flip_seat()?;
            if state.stack.len() <= state.flipped as usize {
                return Err(DomainError::validation_other(format!(
                    "no cards available to flip in {}'s stack",
                    players[idx].nickname
                )));
            }
            idx
        };

        let (card, target_seat) = {
            let seat = players[target_idx]
                .turn_order
                .ok_or_else(|| DomainError::corrupt("target player has no seat"))?;
            let state = players[target_idx].flip_seat_mut()?;
            state.flipped += 1;
            let card = state.stack[state.stack.len() - state.flipped as usize];
            (card, seat)
        };
        game.flip_mut()?.flipped += 1;

        let message = if card == FlipCard::Skull {
            let state = game.flip_mut()?;
            state.stage = FlipStage::FlipperLost;
            state.skuller = Some(target_seat);
            if target_idx == actor_idx {
                format!("{} died on their own skull, losing the round", actor.nickname)
            } else {
                format!(
                    "{} died on {}'s skull, losing the round",
                    actor.nickname, players[target_idx].nickname
                )
            }
        } else {
            let matched = if target_idx == actor_idx {
                // Own-stack flips compare the per-stack count, as played.
                players[actor_idx].flip_seat()?.flipped == game.flip()?.bid
            } else {
                game.flip()?.flipped == game.flip()?.bid
            };
            if matched {
                game.flip_mut()?.stage = FlipStage::FlipperWon;
                format!(
                    "{} matched their bid of {} to win the round",
                    actor.nickname,
                    game.flip()?.bid
                )
            } else {
                let state = game.flip()?;
                format!(
                    "{} found a flower, leaving {} still to flip",
                    actor.nickname,
                    state.bid - state.flipped
                )
            }
        };
        game.touch();

        self.store.save_player(&players[target_idx]).await?;
        self.store.save_game(&game).await?;
        Ok(Outcome::notify(message))
    }

    /// Finalise the round: allocate a point or discard a card, eliminate
    /// the flipper if emptied, end the game or reset for the next round.
    pub async fn end_round(&self, tag: &str, token: &str) -> Result<Outcome, DomainError> {
        let (mut game, _) = lifecycle::resolve(self.store.as_ref(), GameKind::Flip, tag, token).await?;

        let stage = game.flip()?.stage;
        if !matches!(stage, FlipStage::FlipperLost | FlipStage::FlipperWon) {
            return Err(DomainError::validation(
                ValidationKind::StageMismatch,
                "round is not ready to end",
            ));
        }

        let mut players = self.store.players_in_game(GameKind::Flip, tag).await?;
        let flipper_seat = game
            .next_player
            .ok_or_else(|| DomainError::corrupt("round ended with no flipper"))?;
        let flipper_idx = players
            .iter()
            .position(|p| p.is_seat(flipper_seat))
            .ok_or_else(|| DomainError::corrupt("flipper seat is unoccupied"))?;
        let flipper_nick = players[flipper_idx].nickname.clone();

        let message = if stage == FlipStage::FlipperLost {
            let skuller_seat = game
                .flip()?
                .skuller
                .ok_or_else(|| DomainError::corrupt("flipper lost with no skull recorded"))?;

            let emptied = {
                let state = players[flipper_idx].flip_seat_mut()?;
                let stack = std::mem::take(&mut state.stack);
                state.hand.extend(stack);
                if state.hand.is_empty() {
                    return Err(DomainError::corrupt("flipper lost a round with no cards"));
                }
                let discard_idx = {
                    let mut rng = self.rng.lock();
                    rng.random_range(0..state.hand.len())
                };
                let lost = state.hand.remove(discard_idx);
                debug!(tag, ?lost, remaining = state.hand.len(), "discard on loss");
                if state.hand.is_empty() {
                    state.alive = false;
                }
                state.hand.is_empty()
            };

            if emptied {
                let survivors = players
                    .iter()
                    .filter(|p| matches!(p.flip_seat(), Ok(s) if s.alive))
                    .count();
                if survivors == 1 {
                    let state = game.flip_mut()?;
                    state.stage = FlipStage::Over;
                    state.winner = Some(skuller_seat);
                    info!(tag, "flip game over by elimination");
                    format!(
                        "{flipper_nick} loses their last card, leaving {} as the winner!",
                        lifecycle::expect_player_at(&players, skuller_seat)?.nickname
                    )
                } else {
                    reset_round(game.flip_mut()?);
                    for player in &mut players {
                        player.flip_seat_mut()?.round_start();
                    }
                    // The skull's owner leads, unless they just died.
                    let next = if lifecycle::expect_player_at(&players, skuller_seat)?
                        .flip_seat()?
                        .alive
                    {
                        skuller_seat
                    } else {
                        advance(&players, skuller_seat)?
                            .ok_or_else(|| DomainError::corrupt("no living seat to lead"))?
                    };
                    game.next_player = Some(next);
                    format!(
                        "{flipper_nick} loses their last card, {} starts the next round, all surviving players must place their first card",
                        lifecycle::expect_player_at(&players, next)?.nickname
                    )
                }
            } else {
                reset_round(game.flip_mut()?);
                for player in &mut players {
                    player.flip_seat_mut()?.round_start();
                }
                game.next_player = Some(skuller_seat);
                format!(
                    "{flipper_nick} loses a card, {} starts the next round, all surviving players must place their first card",
                    lifecycle::expect_player_at(&players, skuller_seat)?.nickname
                )
            }
        } else {
            let points = {
                let state = players[flipper_idx].flip_seat_mut()?;
                state.points += 1;
                state.points
            };
            if points >= WINNING_POINTS {
                let state = game.flip_mut()?;
                state.stage = FlipStage::Over;
                state.winner = Some(flipper_seat);
                info!(tag, winner = flipper_nick.as_str(), "flip game over on points");
                format!("{flipper_nick} wins the game with {points} points")
            } else {
                reset_round(game.flip_mut()?);
                for player in &mut players {
                    player.flip_seat_mut()?.round_start();
                }
                game.next_player = Some(flipper_seat);
                format!(
                    "{flipper_nick} starts the next round, all surviving players must place their first card"
                )
            }
        };
        game.touch();

        for player in &players {
            self.store.save_player(player).await?;
        }
        self.store.save_game(&game).await?;
        Ok(Outcome::notify(message))
    }

    pub async fn destroy(&self, tag: &str, token: &str) -> Result<Outcome, DomainError> {
        lifecycle::destroy(self.store.as_ref(), GameKind::Flip, tag, token).await
    }

    /// The game as visible to the holder of `token`; unrecognised tokens
    /// see only public state.
    pub async fn visible_state(&self, tag: &str, token: &str) -> Result<serde_json::Value, DomainError> {
        let (game, viewer) =
            lifecycle::resolve_viewer(self.store.as_ref(), GameKind::Flip, tag, token).await?;
        let players = self.store.players_in_game(GameKind::Flip, tag).await?;
        view::project(&game, &players, viewer.as_ref(), token)
    }
}

fn roster_index(players: &[Player], actor: &Player) -> Result<usize, DomainError> {
    players
        .iter()
        .position(|p| p.token == actor.token)
        .ok_or_else(|| DomainError::corrupt("acting player missing from game roster"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seated(specs: &[(bool, bool)]) -> Vec<Player> {
        specs
            .iter()
            .enumerate()
            .map(|(i, &(alive, passed))| {
                let mut p = Player::new(
                    GameKind::Flip,
                    "t",
                    format!("p{i}"),
                    i == 0,
                    PlayerData::Flip(FlipSeat::new()),
                );
                p.turn_order = Some(i as Seat);
                if let PlayerData::Flip(s) = &mut p.data {
                    s.alive = alive;
                    s.passed = passed;
                }
                p
            })
            .collect()
    }

    #[test]
    fn advance_skips_dead_and_passed_seats() {
        let players = seated(&[(true, false), (false, false), (true, true), (true, false)]);
        assert_eq!(advance(&players, 0).unwrap(), Some(3));
    }

    #[test]
    fn advance_reports_failure_when_nobody_is_eligible() {
        let players = seated(&[(true, false), (false, false), (true, true), (false, false)]);
        assert_eq!(advance(&players, 0).unwrap(), None);
    }

    #[test]
    fn round_reset_clears_bid_state() {
        let mut state = FlipGame::new();
        state.stage = FlipStage::FlipperWon;
        state.placed = 5;
        state.bidder = Some(2);
        state.bid = 3;
        state.flipped = 2;
        state.skuller = Some(1);

        reset_round(&mut state);
        assert_eq!(state.stage, FlipStage::Starting);
        assert_eq!(state.placed, 0);
        assert_eq!(state.bidder, None);
        assert_eq!(state.bid, 0);
        assert_eq!(state.flipped, 0);
        assert_eq!(state.skuller, None);
    }
}
