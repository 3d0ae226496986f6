//! The per-seat `Player` record.
//!
//! Players exist only within the context of a game and are keyed by an
//! unguessable token that is the caller's sole credential. Tokens are uuid
//! v4, so they are never reused across games.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::codec::{self, FlipCard};
use crate::domain::{CardKind, CardValue, Seat};
use crate::entities::games::GameKind;
use crate::errors::domain::DomainError;

/// Unguessable per-player secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerToken(pub Uuid);

impl PlayerToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a caller-supplied token; failure is the distinct
    /// malformed-token resolution error.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| DomainError::malformed_token(format!("Invalid player token {s}")))
    }
}

impl Display for PlayerToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

/// Claim-game seat status, used for end-of-game annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimSeatStatus {
    Waiting,
    Playing,
    Watching,
    Lost,
    Won,
}

/// Claim-game per-seat state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimSeat {
    /// Hidden cards from which the player may choose.
    #[serde(with = "codec::comma_string_lossy")]
    pub hand: Vec<CardKind>,
    /// Face-up cards the player has had to take.
    #[serde(with = "codec::comma_string_lossy")]
    pub pile: Vec<CardKind>,
    /// Has this player seen the current card?
    pub seen: bool,
    /// What this player claimed the card to be.
    pub claim: Option<CardKind>,
    /// Who this player passed to.
    pub target: Option<Seat>,
    /// Who this player received from.
    pub nominator: Option<Seat>,
    pub status: ClaimSeatStatus,
}

impl ClaimSeat {
    pub fn new() -> Self {
        Self {
            hand: Vec::new(),
            pile: Vec::new(),
            seen: false,
            claim: None,
            target: None,
            nominator: None,
            status: ClaimSeatStatus::Waiting,
        }
    }

    /// Game-start reset: fresh hand, empty pile.
    pub fn reset(&mut self, hand: Vec<CardKind>) {
        self.hand = hand;
        self.pile.clear();
    }

    /// Round-start reset. The leader's nominator points at itself, marking
    /// it bypassed for the pass chain.
    pub fn round_start(&mut self, my_seat: Seat, leader: Seat) {
        self.claim = None;
        self.seen = false;
        self.target = None;
        if my_seat == leader {
            self.nominator = Some(my_seat);
            self.status = ClaimSeatStatus::Playing;
        } else {
            self.nominator = None;
            self.status = ClaimSeatStatus::Watching;
        }
    }
}

impl Default for ClaimSeat {
    fn default() -> Self {
        Self::new()
    }
}

/// Draft-game per-seat state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSeat {
    /// Face-up cards taken this round, kept sorted.
    #[serde(with = "codec::comma_string")]
    pub hand: Vec<CardValue>,
    /// Remaining stake this round.
    pub cash: u32,
    /// Running total across rounds (lower is better).
    pub points: i64,
}

impl DraftSeat {
    pub fn new(cash: u32) -> Self {
        Self {
            hand: Vec::new(),
            cash,
            points: 0,
        }
    }

    pub fn reset(&mut self, cash: u32) {
        self.points = 0;
        self.round_start(cash);
    }

    pub fn round_start(&mut self, cash: u32) {
        self.hand.clear();
        self.cash = cash;
    }
}

/// Flip-game per-seat state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlipSeat {
    pub points: u32,
    pub alive: bool,
    /// Out of the bidding for the rest of the round.
    pub passed: bool,
    #[serde(with = "codec::face_string")]
    pub hand: Vec<FlipCard>,
    /// Cards placed face-down this round, top last.
    #[serde(with = "codec::face_string")]
    pub stack: Vec<FlipCard>,
    /// How many cards off the top of the stack are face-up.
    pub flipped: u32,
}

impl FlipSeat {
    /// Three flowers and a skull.
    pub fn starting_hand() -> Vec<FlipCard> {
        vec![
            FlipCard::Flower,
            FlipCard::Flower,
            FlipCard::Flower,
            FlipCard::Skull,
        ]
    }

    pub fn new() -> Self {
        Self {
            points: 0,
            alive: true,
            passed: false,
            hand: Self::starting_hand(),
            stack: Vec::new(),
            flipped: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Round-start reset: the stack returns to the hand.
    pub fn round_start(&mut self) {
        self.passed = false;
        let stack = std::mem::take(&mut self.stack);
        self.hand.extend(stack);
        self.flipped = 0;
    }
}

impl Default for FlipSeat {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-engine payload of a [`Player`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "seat", rename_all = "snake_case")]
pub enum PlayerData {
    Claim(ClaimSeat),
    Draft(DraftSeat),
    Flip(FlipSeat),
}

/// One seat in a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub token: PlayerToken,
    pub kind: GameKind,
    pub game_tag: String,
    pub nickname: String,
    /// Orders seats before turn order exists.
    pub joined: OffsetDateTime,
    /// Assigned at game start; a bijection onto `[0, N)`.
    pub turn_order: Option<Seat>,
    /// First player to join; may hold privileged actions.
    pub owner: bool,
    pub data: PlayerData,
}

impl Player {
    pub fn new(
        kind: GameKind,
        game_tag: impl Into<String>,
        nickname: impl Into<String>,
        owner: bool,
        data: PlayerData,
    ) -> Self {
        Self {
            token: PlayerToken::generate(),
            kind,
            game_tag: game_tag.into(),
            nickname: nickname.into(),
            joined: OffsetDateTime::now_utc(),
            turn_order: None,
            owner,
            data,
        }
    }

    /// True when this player occupies the given seat.
    pub fn is_seat(&self, seat: Seat) -> bool {
        self.turn_order == Some(seat)
    }

    pub fn claim_seat(&self) -> Result<&ClaimSeat, DomainError> {
        match &self.data {
            PlayerData::Claim(s) => Ok(s),
            _ => Err(DomainError::corrupt("player record is not a claim seat")),
        }
    }

    pub fn claim_seat_mut(&mut self) -> Result<&mut ClaimSeat, DomainError> {
        match &mut self.data {
            PlayerData::Claim(s) => Ok(s),
            _ => Err(DomainError::corrupt("player record is not a claim seat")),
        }
    }

    pub fn draft_seat(&self) -> Result<&DraftSeat, DomainError> {
        match &self.data {
            PlayerData::Draft(s) => Ok(s),
            _ => Err(DomainError::corrupt("player record is not a draft seat")),
        }
    }

    pub fn draft_seat_mut(&mut self) -> Result<&mut DraftSeat, DomainError> {
        match &mut self.data {
            PlayerData::Draft(s) => Ok(s),
            _ => Err(DomainError::corrupt("player record is not a draft seat")),
        }
    }

    pub fn flip_seat(&self) -> Result<&FlipSeat, DomainError> {
        match &self.data {
            PlayerData::Flip(s) => Ok(s),
            _ => Err(DomainError::corrupt("player record is not a flip seat")),
        }
    }

    pub fn flip_seat_mut(&mut self) -> Result<&mut FlipSeat, DomainError> {
        match &mut self.data {
            PlayerData::Flip(s) => Ok(s),
            _ => Err(DomainError::corrupt("player record is not a flip seat")),
        }
    }
}
