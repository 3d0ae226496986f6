//! The bluffing claim game.
//!
//! A face-down card is passed around with a claim attached; the holder may
//! peek at it (committing to pass it on), refer it onward with a new claim,
//! or call the claim of whoever passed it to them. The loser of a call
//! takes the card into a face-up pile, and piles end the game.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::domain::{CardKind, Seat};
use crate::engine::lifecycle::{self, Seated};
use crate::engine::{JoinOutcome, Outcome};
use crate::entities::games::{ClaimGame, ClaimStage, GameData, GameKind};
use crate::entities::players::{ClaimSeat, ClaimSeatStatus, PlayerData};
use crate::errors::domain::{DomainError, ValidationKind};
use crate::store::GameStore;

mod view;

pub const MIN_PLAYERS: usize = 3;
pub const MAX_PLAYERS: usize = 8;
pub const KINDS: u8 = 8;
pub const COPIES_PER_KIND: u8 = 8;
pub const DECK_SIZE: usize = (KINDS as usize) * (COPIES_PER_KIND as usize);
/// Holding this many of one kind in your pile loses the game.
pub const LOSE_COUNT: usize = 4;

pub const KIND_NAMES: [&str; KINDS as usize] = [
    "cockroach", "stinkbug", "spider", "scorpion", "bat", "rat", "fly", "toad",
];
pub const KIND_PLURALS: [&str; KINDS as usize] = [
    "cockroaches", "stinkbugs", "spiders", "scorpions", "bats", "rats", "flies", "toads",
];

/// Shuffle the full deck and split it into per-seat hands.
///
/// Hands are `floor(DECK_SIZE / n)` cards each, seat 0 taking the remainder
/// card if there is one, and each hand is sorted.
fn deal(num_players: usize, rng: &mut impl Rng) -> Vec<Vec<CardKind>> {
    let mut deck: Vec<CardKind> = (0..KINDS)
        .flat_map(|kind| std::iter::repeat(kind).take(COPIES_PER_KIND as usize))
        .collect();
    deck.shuffle(rng);

    let base = DECK_SIZE / num_players;
    let mut hands = Vec::with_capacity(num_players);
    for seat in 0..num_players {
        let mut size = base;
        if seat == 0 {
            size += DECK_SIZE % num_players;
        }
        let mut hand: Vec<CardKind> = deck.drain(..size).collect();
        hand.sort_unstable();
        hands.push(hand);
    }
    hands
}

pub struct ClaimEngine<S> {
    store: Arc<S>,
    rng: Mutex<ChaCha8Rng>,
}

impl<S: GameStore> ClaimEngine<S> {
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
        house_rules: bool,
    ) -> Result<JoinOutcome, DomainError> {
        let (token, seated) = lifecycle::join_game(
            self.store.as_ref(),
            GameKind::Claim,
            MAX_PLAYERS,
            tag,
            nickname,
            || GameData::Claim(ClaimGame::new(house_rules)),
            || PlayerData::Claim(ClaimSeat::new()),
        )
        .await?;

        Ok(match seated {
            Seated::Created => JoinOutcome {
                token,
                message: format!(
                    "Game {tag} created, owned by {nickname}. Waiting for at least {} more players.",
                    MIN_PLAYERS - 1
                ),
                notify: true,
            },
            Seated::Rejoined => JoinOutcome {
                token,
                message: format!("Rejoining game {tag} as existing player {nickname}"),
                notify: false,
            },
            Seated::Joined { count } => {
                let hint = if count < MIN_PLAYERS {
                    let needed = MIN_PLAYERS - count;
                    let plural = if needed > 1 { "s" } else { "" };
                    format!("Waiting for at least {needed} more player{plural}")
                } else {
                    "Game is ready to begin".to_owned()
                };
                JoinOutcome {
                    token,
                    message: format!("Player {nickname} joined game {tag}. {hint}."),
                    notify: true,
                }
            }
        })
    }

    pub async fn start(&self, tag: &str, token: &str) -> Result<Outcome, DomainError> {
        let (mut game, _) = lifecycle::resolve(self.store.as_ref(), GameKind::Claim, tag, token).await?;
        let mut players = self.store.players_in_game(GameKind::Claim, tag).await?;
        lifecycle::ensure_startable(&game, players.len(), MIN_PLAYERS)?;

        {
            let mut rng = self.rng.lock();
            lifecycle::assign_turn_order(&mut players, &mut *rng);
            let mut hands = deal(players.len(), &mut *rng);
            for player in &mut players {
                let seat = player
                    .turn_order
                    .ok_or_else(|| DomainError::corrupt("turn order missing after assignment"))?;
                let hand = std::mem::take(&mut hands[seat as usize]);
                let state = player.claim_seat_mut()?;
                state.reset(hand);
                state.round_start(seat, 0);
            }
        }

        let state = game.claim_mut()?;
        state.stage = ClaimStage::Starting;
        state.card = None;
        game.next_player = Some(0);
        game.touch();

        for player in &players {
            self.store.save_player(player).await?;
        }
        self.store.save_game(&game).await?;

        let first = lifecycle::expect_player_at(&players, 0)?;
        info!(tag, players = players.len(), "claim game started");
        Ok(Outcome::notify(format!(
            "Started game {tag}, {} to start",
            first.nickname
        )))
    }

    /// Leader chooses a card from their hand and passes it to another
    /// player with a claim as to what it is.
    pub async fn play(
        &self,
        tag: &str,
        token: &str,
        card_idx: usize,
        target: Seat,
        claim: CardKind,
    ) -> Result<Outcome, DomainError> {
        let (mut game, actor) =
            lifecycle::resolve(self.store.as_ref(), GameKind::Claim, tag, token).await?;

        if game.claim()?.stage != ClaimStage::Starting {
            return Err(DomainError::validation(
                ValidationKind::StageMismatch,
                "Playing a card is not a valid move at this game stage",
            ));
        }
        if game.next_player != actor.turn_order {
            return Err(DomainError::validation(
                ValidationKind::OutOfTurn,
                format!("It is not {}'s turn to play", actor.nickname),
            ));
        }

        let mut players = self.store.players_in_game(GameKind::Claim, tag).await?;
        let actor_idx = seat_index(&players, &actor)?;
        let actor_seat = players[actor_idx]
            .turn_order
            .ok_or_else(|| DomainError::corrupt("acting player has no seat"))?;

        if card_idx >= players[actor_idx].claim_seat()?.hand.len() {
            return Err(DomainError::validation(
                ValidationKind::OutOfRange,
                format!(
                    "Chosen card is out of range of player {}'s hand ({card_idx})",
                    actor.nickname
                ),
            ));
        }
        if target == actor_seat {
            return Err(DomainError::validation(
                ValidationKind::InvalidTarget,
                "Player cannot play a card to themself",
            ));
        }
        let victim_idx = players
            .iter()
            .position(|p| p.is_seat(target))
            .ok_or_else(|| {
                DomainError::validation(
                    ValidationKind::InvalidTarget,
                    format!("Target player not found ({target})"),
                )
            })?;
        if claim >= KINDS {
            return Err(DomainError::validation(
                ValidationKind::OutOfRange,
                format!("Claimed suit is out of range ({claim})"),
            ));
        }

        let card = {
            let state = players[actor_idx].claim_seat_mut()?;
            let card = state.hand.remove(card_idx);
            state.target = Some(target);
            state.claim = Some(claim);
            state.seen = true;
            state.status = ClaimSeatStatus::Watching;
            card
        };
        {
            let state = players[victim_idx].claim_seat_mut()?;
            state.nominator = Some(actor_seat);
            state.status = ClaimSeatStatus::Playing;
        }

        let game_state = game.claim_mut()?;
        game_state.stage = ClaimStage::Playing;
        game_state.card = Some(card);
        game.next_player = Some(target);
        game.touch();

        self.store.save_game(&game).await?;
        self.store.save_player(&players[actor_idx]).await?;
        self.store.save_player(&players[victim_idx]).await?;

        let victim = &players[victim_idx].nickname;
        Ok(Outcome::notify(format!(
            "{} plays a card to {victim}, claiming it is a {}. {victim} must pass or call.",
            actor.nickname, KIND_NAMES[claim as usize]
        )))
    }

    /// Look at the passed card, limiting subsequent action to refer.
    pub async fn peek(&self, tag: &str, token: &str) -> Result<Outcome, DomainError> {
        let (game, mut actor) =
            lifecycle::resolve(self.store.as_ref(), GameKind::Claim, tag, token).await?;

        if game.claim()?.stage != ClaimStage::Playing {
            return Err(DomainError::validation(
                ValidationKind::StageMismatch,
                "Looking at the card is not a valid move at this game stage",
            ));
        }
        if game.next_player != actor.turn_order {
            return Err(DomainError::validation(
                ValidationKind::OutOfTurn,
                format!("It is not {}'s turn", actor.nickname),
            ));
        }

        let players = self.store.players_in_game(GameKind::Claim, tag).await?;
        if !players
            .iter()
            .any(|p| matches!(p.claim_seat(), Ok(s) if s.nominator.is_none()))
        {
            return Err(DomainError::validation_other(
                "Cannot look at the card when there is no-one left to pass to",
            ));
        }

        actor.claim_seat_mut()?.seen = true;
        self.store.save_player(&actor).await?;

        Ok(Outcome::notify(format!(
            "{} looks at the passed card",
            actor.nickname
        )))
    }

    /// Nominate another player to receive the card in play, with an updated
    /// (or not) claim.
    pub async fn refer(
        &self,
        tag: &str,
        token: &str,
        target: Seat,
        claim: CardKind,
    ) -> Result<Outcome, DomainError> {
        let (mut game, actor) =
            lifecycle::resolve(self.store.as_ref(), GameKind::Claim, tag, token).await?;

        if game.claim()?.stage != ClaimStage::Playing {
            return Err(DomainError::validation(
                ValidationKind::StageMismatch,
                "Passing the card is not a valid move at this game stage",
            ));
        }
        if game.next_player != actor.turn_order {
            return Err(DomainError::validation(
                ValidationKind::OutOfTurn,
                format!("It is not {}'s turn", actor.nickname),
            ));
        }

        let mut players = self.store.players_in_game(GameKind::Claim, tag).await?;
        let actor_idx = seat_index(&players, &actor)?;
        let actor_seat = players[actor_idx]
            .turn_order
            .ok_or_else(|| DomainError::corrupt("acting player has no seat"))?;

        if target == actor_seat {
            return Err(DomainError::validation(
                ValidationKind::InvalidTarget,
                "Player cannot play a card to themself",
            ));
        }
        let victim_idx = players
            .iter()
            .position(|p| p.is_seat(target))
            .ok_or_else(|| {
                DomainError::validation(
                    ValidationKind::InvalidTarget,
                    format!("Target player not found ({target})"),
                )
            })?;
        if claim >= KINDS {
            return Err(DomainError::validation(
                ValidationKind::OutOfRange,
                format!("Claimed suit is out of range ({claim})"),
            ));
        }

        let seen = {
            let state = players[actor_idx].claim_seat_mut()?;
            state.target = Some(target);
            state.claim = Some(claim);
            state.status = ClaimSeatStatus::Watching;
            state.seen
        };
        {
            let state = players[victim_idx].claim_seat_mut()?;
            state.nominator = Some(actor_seat);
            state.status = ClaimSeatStatus::Playing;
        }

        game.next_player = Some(target);
        game.touch();

        self.store.save_game(&game).await?;
        self.store.save_player(&players[actor_idx]).await?;
        self.store.save_player(&players[victim_idx]).await?;

        // With the victim now nominated, are any seats left in the chain?
        let any_available = players
            .iter()
            .any(|p| matches!(p.claim_seat(), Ok(s) if s.nominator.is_none()));
        let acts = if any_available { "pass or call" } else { "call" };
        let unseen = if seen { "" } else { " (unseen)" };

        let victim = &players[victim_idx].nickname;
        Ok(Outcome::notify(format!(
            "{} passes the card{unseen} to {victim}, claiming it is a {}. {victim} must {acts}.",
            actor.nickname, KIND_NAMES[claim as usize]
        )))
    }

    /// Declare whether the nominator's claim is correct. The loser of the
    /// call takes the disputed card into their pile, which may end the game.
    pub async fn call(&self, tag: &str, token: &str, verdict: bool) -> Result<Outcome, DomainError> {
        let (mut game, actor) =
            lifecycle::resolve(self.store.as_ref(), GameKind::Claim, tag, token).await?;

        if game.claim()?.stage != ClaimStage::Playing {
            return Err(DomainError::validation(
                ValidationKind::StageMismatch,
                "Calling is not a valid move at this game stage",
            ));
        }
        if game.next_player != actor.turn_order {
            return Err(DomainError::validation(
                ValidationKind::OutOfTurn,
                format!("It is not {}'s turn", actor.nickname),
            ));
        }
        if actor.claim_seat()?.seen {
            return Err(DomainError::validation_other(format!(
                "Calling is not an option once the card has been seen, {} must pass.",
                actor.nickname
            )));
        }

        let mut players = self.store.players_in_game(GameKind::Claim, tag).await?;
        let actor_idx = seat_index(&players, &actor)?;

        let card = game
            .claim()?
            .card
            .ok_or_else(|| DomainError::corrupt("no card in play during a call"))?;
        let nominator_seat = players[actor_idx]
            .claim_seat()?
            .nominator
            .ok_or_else(|| DomainError::corrupt("on-turn player has no nominator"))?;
        let nominator_idx = players
            .iter()
            .position(|p| p.is_seat(nominator_seat))
            .ok_or_else(|| DomainError::corrupt("nominator seat is unoccupied"))?;
        let claimed = players[nominator_idx]
            .claim_seat()?
            .claim
            .ok_or_else(|| DomainError::corrupt("nominator made no claim"))?;

        // Judged claim is the nominator's, not the original claimant's.
        let (mut msg, loser_idx) = if verdict == (claimed == card) {
            (
                format!(
                    "{} calls correctly, the card is a {}",
                    actor.nickname, KIND_NAMES[card as usize]
                ),
                nominator_idx,
            )
        } else {
            (
                format!(
                    "{} calls incorrectly, the card is a {}",
                    actor.nickname, KIND_NAMES[card as usize]
                ),
                actor_idx,
            )
        };

        let loser_nick = players[loser_idx].nickname.clone();
        let loser_seat = players[loser_idx]
            .turn_order
            .ok_or_else(|| DomainError::corrupt("loser has no seat"))?;
        {
            let state = players[loser_idx].claim_seat_mut()?;
            state.pile.push(card);
            state.pile.sort_unstable();
        }
        let pile = players[loser_idx].claim_seat()?.pile.clone();
        let hand_empty = players[loser_idx].claim_seat()?.hand.is_empty();
        let house_rules = game.claim()?.house_rules;

        let mut over = false;
        let mut loser_status = ClaimSeatStatus::Playing;
        let mut other_status = ClaimSeatStatus::Watching;

        if pile.iter().filter(|&&c| c == card).count() == LOSE_COUNT {
            // Player loses, everyone else wins.
            over = true;
            loser_status = ClaimSeatStatus::Lost;
            other_status = ClaimSeatStatus::Won;
            msg = format!(
                "{msg}. {loser_nick} takes the card and loses the game with {LOSE_COUNT} {}.",
                KIND_PLURALS[card as usize]
            );
        } else if house_rules && (0..KINDS).all(|kind| pile.contains(&kind)) {
            // Player wins, everyone else loses.
            over = true;
            loser_status = ClaimSeatStatus::Won;
            other_status = ClaimSeatStatus::Lost;
            msg = format!("{msg}. {loser_nick} takes the card and wins the game by having all the suits.");
        }

        if !over && hand_empty {
            over = true;
            loser_status = ClaimSeatStatus::Lost;
            other_status = ClaimSeatStatus::Won;
            msg = format!("{msg}. {loser_nick} takes the card and has no cards left, so loses the game.");
        }

        if over {
            for player in &mut players {
                let status = if player.is_seat(loser_seat) {
                    loser_status
                } else {
                    other_status
                };
                player.claim_seat_mut()?.status = status;
            }
            let state = game.claim_mut()?;
            state.stage = ClaimStage::GameOver;
            state.card = None;
            game.next_player = None;
            info!(tag, loser = loser_nick.as_str(), "claim game over");
        } else {
            for player in &mut players {
                let seat = player
                    .turn_order
                    .ok_or_else(|| DomainError::corrupt("seated player has no turn order"))?;
                player.claim_seat_mut()?.round_start(seat, loser_seat);
            }
            let state = game.claim_mut()?;
            state.stage = ClaimStage::Starting;
            state.card = None;
            game.next_player = Some(loser_seat);
            msg = format!("{msg}. {loser_nick} takes the card and starts the next round.");
        }
        game.touch();

        for player in &players {
            self.store.save_player(player).await?;
        }
        self.store.save_game(&game).await?;

        Ok(Outcome::notify(msg))
    }

    pub async fn destroy(&self, tag: &str, token: &str) -> Result<Outcome, DomainError> {
        lifecycle::destroy(self.store.as_ref(), GameKind::Claim, tag, token).await
    }

    /// The game as visible to the holder of `token`; unrecognised tokens
    /// see only public state.
    pub async fn visible_state(&self, tag: &str, token: &str) -> Result<serde_json::Value, DomainError> {
        let (game, viewer) =
            lifecycle::resolve_viewer(self.store.as_ref(), GameKind::Claim, tag, token).await?;
        let players = self.store.players_in_game(GameKind::Claim, tag).await?;
        view::project(&game, &players, viewer.as_ref(), token)
    }
}

fn seat_index(
    players: &[crate::entities::players::Player],
    actor: &crate::entities::players::Player,
) -> Result<usize, DomainError> {
    players
        .iter()
        .position(|p| p.token == actor.token)
        .ok_or_else(|| DomainError::corrupt("acting player missing from game roster"))
}
