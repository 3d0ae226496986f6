//! The draft-and-bid auction game.
//!
//! One card is face up at a time: the seat on turn either takes it (with
//! whatever stake has pooled on it) or pays one stake to pass the problem
//! on. Scoring rewards runs of consecutive values, so a cheap card can be
//! worth taking late. Lowest total after the configured rounds wins.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::domain::seats::next_eligible;
use crate::domain::CardValue;
use crate::engine::lifecycle::{self, Seated};
use crate::engine::{JoinOutcome, Outcome};
use crate::entities::games::{DraftGame, DraftStage, GameData, GameKind};
use crate::entities::players::{DraftSeat, Player, PlayerData};
use crate::errors::domain::{DomainError, ValidationKind};
use crate::store::GameStore;

mod view;

pub const MIN_PLAYERS: usize = 3;
pub const MAX_PLAYERS: usize = 6;
pub const DECK_MIN: CardValue = 3;
pub const DECK_MAX: CardValue = 35;
pub const DECK_SIZE: usize = 24;
pub const STARTING_CASH: u32 = 11;
pub const DEFAULT_ROUNDS: u32 = 3;

/// Draw a round's deck: a uniform sample without replacement from the
/// value range, in random order.
fn make_deck(rng: &mut impl Rng) -> Vec<CardValue> {
    let span = (DECK_MAX - DECK_MIN + 1) as usize;
    let mut deck: Vec<CardValue> = rand::seq::index::sample(rng, span, DECK_SIZE)
        .iter()
        .map(|i| i as CardValue + DECK_MIN)
        .collect();
    deck.shuffle(rng);
    deck
}

/// A player's score for one round: the sum of the lowest card in each
/// maximal run of consecutive values, minus remaining cash.
fn round_score(hand: &[CardValue], cash: u32) -> i64 {
    let mut score: i64 = 0;
    let mut prev: i64 = -100;
    for &card in hand {
        let card = i64::from(card);
        if card > prev + 1 {
            score += card;
        }
        prev = card;
    }
    score - i64::from(cash)
}

pub struct DraftEngine<S> {
    store: Arc<S>,
    rng: Mutex<ChaCha8Rng>,
}

impl<S: GameStore> DraftEngine<S> {
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

    pub async fn join(
        &self,
        tag: &str,
        nickname: &str,
        num_rounds: u32,
        house_rules: bool,
    ) -> Result<JoinOutcome, DomainError> {
        let (token, seated) = lifecycle::join_game(
            self.store.as_ref(),
            GameKind::Draft,
            MAX_PLAYERS,
            tag,
            nickname,
            || GameData::Draft(DraftGame::new(num_rounds, house_rules)),
            || PlayerData::Draft(DraftSeat::new(STARTING_CASH)),
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
        let (mut game, _) = lifecycle::resolve(self.store.as_ref(), GameKind::Draft, tag, token).await?;
        let mut players = self.store.players_in_game(GameKind::Draft, tag).await?;
        lifecycle::ensure_startable(&game, players.len(), MIN_PLAYERS)?;

        let deck = {
            let mut rng = self.rng.lock();
            lifecycle::assign_turn_order(&mut players, &mut *rng);
            make_deck(&mut *rng)
        };
        for player in &mut players {
            player.draft_seat_mut()?.reset(STARTING_CASH);
        }
        players.sort_by_key(|p| p.turn_order);

        let state = game.draft_mut()?;
        state.stage = DraftStage::Playing;
        state.deck = deck;
        state.pool = 0;
        state.round = 0;
        game.next_player = Some(0);
        game.touch();

        for player in &players {
            self.store.save_player(player).await?;
        }
        self.store.save_game(&game).await?;

        let leader = lifecycle::expect_player_at(&players, 0)?;
        info!(tag, players = players.len(), "draft game started");
        Ok(Outcome::notify(format!(
            "Started game {tag}, turn order is [{}], {} to lead",
            lifecycle::nickname_list(&players),
            leader.nickname
        )))
    }

    /// Take the current card and pool.
    ///
    /// `expected_top` guards against duplicate resubmission: a mismatch is
    /// an idempotent no-op, not a rule violation.
    pub async fn take(
        &self,
        tag: &str,
        token: &str,
        expected_top: CardValue,
    ) -> Result<Outcome, DomainError> {
        let (mut game, mut actor) =
            lifecycle::resolve(self.store.as_ref(), GameKind::Draft, tag, token).await?;

        if game.draft()?.stage != DraftStage::Playing {
            return Err(DomainError::validation(
                ValidationKind::StageMismatch,
                "taking a card is not a valid move at this game stage",
            ));
        }
        if game.next_player != actor.turn_order {
            return Err(DomainError::validation(
                ValidationKind::OutOfTurn,
                format!("It is not {}'s turn to go", actor.nickname),
            ));
        }

        let top = *game
            .draft()?
            .deck
            .first()
            .ok_or_else(|| DomainError::corrupt("internal game error: deck is empty"))?;
        if expected_top != top {
            return Err(DomainError::stale(format!(
                "ignoring duplicate take request for card {expected_top}"
            )));
        }

        let players = self.store.players_in_game(GameKind::Draft, tag).await?;
        let pool = game.draft()?.pool;
        {
            let seat = actor.draft_seat_mut()?;
            seat.hand.push(top);
            seat.hand.sort_unstable();
            seat.cash += pool;
        }
        let (deck_empty, house_rules, revealed) = {
            let state = game.draft_mut()?;
            state.deck.remove(0);
            state.pool = 0;
            (
                state.deck.is_empty(),
                state.house_rules,
                state.deck.first().copied(),
            )
        };

        let message = if deck_empty {
            game.draft_mut()?.stage = DraftStage::RoundOver;
            format!("{} takes the last card", actor.nickname)
        } else {
            let revealed =
                revealed.ok_or_else(|| DomainError::corrupt("internal game error: deck is empty"))?;
            if house_rules {
                let current = game
                    .next_player
                    .ok_or_else(|| DomainError::corrupt("no seat on turn during play"))?;
                let next = next_eligible(players.len(), current, |_| true)
                    .ok_or_else(|| DomainError::corrupt("no next seat to advance to"))?;
                game.next_player = Some(next);
                let next_nick = &lifecycle::expect_player_at(&players, next)?.nickname;
                format!(
                    "{} takes the card, {next_nick} is next to go and reveals {revealed}",
                    actor.nickname
                )
            } else {
                format!(
                    "{} takes the card, reveals {revealed} and must go again",
                    actor.nickname
                )
            }
        };
        game.touch();

        self.store.save_game(&game).await?;
        self.store.save_player(&actor).await?;

        Ok(Outcome::notify(message))
    }

    /// Pay one into the pool to refuse the current card.
    pub async fn pay(
        &self,
        tag: &str,
        token: &str,
        expected_pool: u32,
    ) -> Result<Outcome, DomainError> {
        let (mut game, mut actor) =
            lifecycle::resolve(self.store.as_ref(), GameKind::Draft, tag, token).await?;

        if game.draft()?.stage != DraftStage::Playing {
            return Err(DomainError::validation(
                ValidationKind::StageMismatch,
                "paying is not a valid move at this game stage",
            ));
        }
        if game.next_player != actor.turn_order {
            return Err(DomainError::validation(
                ValidationKind::OutOfTurn,
                format!("It is not {}'s turn to go", actor.nickname),
            ));
        }
        if game.draft()?.pool != expected_pool {
            return Err(DomainError::stale(format!(
                "ignoring duplicate pay request at pool size {expected_pool}"
            )));
        }
        if actor.draft_seat()?.cash < 1 {
            return Err(DomainError::validation_other(format!(
                "{} has no tokens so cannot pay",
                actor.nickname
            )));
        }

        let players = self.store.players_in_game(GameKind::Draft, tag).await?;
        actor.draft_seat_mut()?.cash -= 1;
        game.draft_mut()?.pool += 1;
        let current = game
            .next_player
            .ok_or_else(|| DomainError::corrupt("no seat on turn during play"))?;
        let next = next_eligible(players.len(), current, |_| true)
            .ok_or_else(|| DomainError::corrupt("no next seat to advance to"))?;
        game.next_player = Some(next);
        game.touch();

        self.store.save_player(&actor).await?;
        self.store.save_game(&game).await?;

        let next_nick = &lifecycle::expect_player_at(&players, next)?.nickname;
        Ok(Outcome::notify(format!(
            "{} pays a token, {next_nick} is next to go",
            actor.nickname
        )))
    }

    /// Finalise the round: apply scores, then either deal the next round or
    /// declare the winner(s).
    pub async fn end_round(&self, tag: &str, token: &str) -> Result<Outcome, DomainError> {
        let (mut game, _) = lifecycle::resolve(self.store.as_ref(), GameKind::Draft, tag, token).await?;

        if game.draft()?.stage != DraftStage::RoundOver {
            return Err(DomainError::validation(
                ValidationKind::StageMismatch,
                "round is not ready to end",
            ));
        }

        let mut players = self.store.players_in_game(GameKind::Draft, tag).await?;
        let mut round_scores = Vec::with_capacity(players.len());
        for player in &mut players {
            let seat = player.draft_seat_mut()?;
            let score = round_score(&seat.hand, seat.cash);
            seat.points += score;
            round_scores.push((player.nickname.clone(), score));
        }

        let (finished_round, num_rounds) = {
            let state = game.draft_mut()?;
            state.round += 1;
            (state.round, state.num_rounds)
        };

        let stage_msg = if finished_round >= num_rounds {
            game.draft_mut()?.stage = DraftStage::GameOver;

            let best = players
                .iter()
                .map(|p| p.draft_seat().map(|s| s.points))
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .min()
                .ok_or_else(|| DomainError::corrupt("game over with no players"))?;
            let winners: Vec<&Player> = players
                .iter()
                .filter(|p| matches!(p.draft_seat(), Ok(s) if s.points == best))
                .collect();
            let names: Vec<&str> = winners.iter().map(|p| p.nickname.as_str()).collect();
            let win_msg = match names.split_last() {
                Some((only, [])) => format!("{only} wins!"),
                Some((last, rest)) => {
                    format!("{} and {last} are joint winners", rest.join(", "))
                }
                None => return Err(DomainError::corrupt("game over with no winners")),
            };
            let totals = players
                .iter()
                .map(|p| Ok(format!("{}: {}", p.nickname, p.draft_seat()?.points)))
                .collect::<Result<Vec<_>, DomainError>>()?
                .join(", ");
            info!(tag, "draft game over");
            format!("Final scores: {totals}. {win_msg}")
        } else {
            let deck = {
                let mut rng = self.rng.lock();
                make_deck(&mut *rng)
            };
            let state = game.draft_mut()?;
            state.deck = deck;
            state.pool = 0;
            state.stage = DraftStage::Playing;
            for player in &mut players {
                player.draft_seat_mut()?.round_start(STARTING_CASH);
            }
            format!("Starting round {}/{num_rounds}", finished_round + 1)
        };
        game.touch();

        for player in &players {
            self.store.save_player(player).await?;
        }
        self.store.save_game(&game).await?;

        let scores = round_scores
            .iter()
            .map(|(nick, score)| format!("{nick}: {score}"))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(Outcome::notify(format!(
            "Scores for round {finished_round}: {scores}. {stage_msg}"
        )))
    }

    pub async fn destroy(&self, tag: &str, token: &str) -> Result<Outcome, DomainError> {
        lifecycle::destroy(self.store.as_ref(), GameKind::Draft, tag, token).await
    }

    /// The game as visible to the holder of `token`; unrecognised tokens
    /// see only public state.
    pub async fn visible_state(&self, tag: &str, token: &str) -> Result<serde_json::Value, DomainError> {
        let (game, viewer) =
            lifecycle::resolve_viewer(self.store.as_ref(), GameKind::Draft, tag, token).await?;
        let players = self.store.players_in_game(GameKind::Draft, tag).await?;
        view::project(&game, &players, viewer.as_ref(), token)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn run_scoring_counts_run_minimums_minus_cash() {
        assert_eq!(round_score(&[3, 4, 5, 9], 2), 10);
        assert_eq!(round_score(&[], 7), -7);
        assert_eq!(round_score(&[10], 0), 10);
        // Two runs sharing no edge: 3..5 and 7..8.
        assert_eq!(round_score(&[3, 4, 5, 7, 8], 0), 10);
    }

    #[test]
    fn deck_is_deterministic_for_a_seed() {
        let mut a = ChaCha8Rng::seed_from_u64(9);
        let mut b = ChaCha8Rng::seed_from_u64(9);
        assert_eq!(make_deck(&mut a), make_deck(&mut b));
    }

    proptest! {
        #[test]
        fn deck_is_a_sample_of_the_value_range(seed in any::<u64>()) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let deck = make_deck(&mut rng);
            prop_assert_eq!(deck.len(), DECK_SIZE);

            let mut sorted = deck.clone();
            sorted.sort_unstable();
            sorted.dedup();
            prop_assert_eq!(sorted.len(), DECK_SIZE);
            prop_assert!(deck.iter().all(|&c| (DECK_MIN..=DECK_MAX).contains(&c)));
        }
    }
}
