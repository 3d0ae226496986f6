//! The per-session `Game` aggregate.
//!
//! One record per game session, keyed by `(kind, tag)`. The per-engine
//! payload lives in [`GameData`]; each variant carries its own strongly-typed
//! stage enum end-to-end, so stages are never compared against raw ordinals.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::codec;
use crate::domain::{CardKind, CardValue, Seat};
use crate::errors::domain::DomainError;

/// Which of the three engines a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    Claim,
    Draft,
    Flip,
}

impl GameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameKind::Claim => "claim",
            GameKind::Draft => "draft",
            GameKind::Flip => "flip",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimStage {
    /// Waiting for players to join.
    Gathering,
    /// The round leader must choose a card to play.
    Starting,
    /// The holder must peek, refer or call.
    Playing,
    GameOver,
}

impl ClaimStage {
    pub fn label(&self) -> &'static str {
        match self {
            ClaimStage::Gathering => "Gathering",
            ClaimStage::Starting => "Starting",
            ClaimStage::Playing => "Playing",
            ClaimStage::GameOver => "Game Over",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DraftStage {
    Gathering,
    /// The seat on turn must take the face-up card or pay.
    Playing,
    /// The deck is exhausted; scores are pending.
    RoundOver,
    GameOver,
}

impl DraftStage {
    pub fn label(&self) -> &'static str {
        match self {
            DraftStage::Gathering => "Gathering",
            DraftStage::Playing => "Playing",
            DraftStage::RoundOver => "Round Over",
            DraftStage::GameOver => "Game Over",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlipStage {
    Gathering,
    /// Every living player must place their first card.
    Starting,
    /// The seat on turn may place another card or open the bidding.
    Placing,
    /// The seat on turn must raise the bid or decline.
    Bidding,
    /// The winning bidder must flip cards.
    Flipping,
    /// Pause at round end for drama.
    FlipperLost,
    FlipperWon,
    Over,
}

impl FlipStage {
    pub fn label(&self) -> &'static str {
        match self {
            FlipStage::Gathering => "Gathering",
            FlipStage::Starting => "Starting",
            FlipStage::Placing => "Placing",
            FlipStage::Bidding => "Bidding",
            FlipStage::Flipping => "Flipping",
            FlipStage::FlipperLost => "Flipper Lost",
            FlipStage::FlipperWon => "Flipper Won",
            FlipStage::Over => "Over",
        }
    }
}

/// Claim-game transient state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimGame {
    pub stage: ClaimStage,
    /// The card being passed around this round.
    pub card: Option<CardKind>,
    /// Can a player win by collecting one of every kind?
    pub house_rules: bool,
}

impl ClaimGame {
    pub fn new(house_rules: bool) -> Self {
        Self {
            stage: ClaimStage::Gathering,
            card: None,
            house_rules,
        }
    }
}

/// Draft-game transient state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftGame {
    pub stage: DraftStage,
    /// The shared draw pile, top card first.
    #[serde(with = "codec::comma_string")]
    pub deck: Vec<CardValue>,
    /// Stake accumulated on the current card.
    pub pool: u32,
    /// Completed rounds.
    pub round: u32,
    pub num_rounds: u32,
    /// Under house rules, taking a card passes the turn on.
    pub house_rules: bool,
}

impl DraftGame {
    pub fn new(num_rounds: u32, house_rules: bool) -> Self {
        Self {
            stage: DraftStage::Gathering,
            deck: Vec::new(),
            pool: 0,
            round: 0,
            num_rounds,
            house_rules,
        }
    }
}

/// Flip-game transient state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlipGame {
    pub stage: FlipStage,
    /// Total cards placed this round.
    pub placed: u32,
    /// Current highest bidder.
    pub bidder: Option<Seat>,
    pub bid: u32,
    /// Cards flipped so far this round.
    pub flipped: u32,
    /// The seat whose skull ended the round.
    pub skuller: Option<Seat>,
    pub winner: Option<Seat>,
}

impl FlipGame {
    pub fn new() -> Self {
        Self {
            stage: FlipStage::Gathering,
            placed: 0,
            bidder: None,
            bid: 0,
            flipped: 0,
            skuller: None,
            winner: None,
        }
    }
}

impl Default for FlipGame {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-engine payload of a [`Game`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum GameData {
    Claim(ClaimGame),
    Draft(DraftGame),
    Flip(FlipGame),
}

/// One game session. Identified by a caller-chosen tag, unique per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub kind: GameKind,
    pub tag: String,
    pub created: OffsetDateTime,
    pub modified: OffsetDateTime,
    /// The most recent notification message (display only).
    pub status: String,
    /// Whose turn it is; `None` means nobody is expected to act.
    pub next_player: Option<Seat>,
    pub data: GameData,
}

impl Game {
    pub fn new(kind: GameKind, tag: impl Into<String>, data: GameData) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            kind,
            tag: tag.into(),
            created: now,
            modified: now,
            status: String::new(),
            next_player: None,
            data,
        }
    }

    pub fn touch(&mut self) {
        self.modified = OffsetDateTime::now_utc();
    }

    /// True while players may still join.
    pub fn is_gathering(&self) -> bool {
        match &self.data {
            GameData::Claim(g) => g.stage == ClaimStage::Gathering,
            GameData::Draft(g) => g.stage == DraftStage::Gathering,
            GameData::Flip(g) => g.stage == FlipStage::Gathering,
        }
    }

    /// True once the game has finished (restart is allowed from here).
    pub fn is_over(&self) -> bool {
        match &self.data {
            GameData::Claim(g) => g.stage == ClaimStage::GameOver,
            GameData::Draft(g) => g.stage == DraftStage::GameOver,
            GameData::Flip(g) => g.stage == FlipStage::Over,
        }
    }

    /// Display label for the current stage.
    pub fn stage_label(&self) -> &'static str {
        match &self.data {
            GameData::Claim(g) => g.stage.label(),
            GameData::Draft(g) => g.stage.label(),
            GameData::Flip(g) => g.stage.label(),
        }
    }

    pub fn claim(&self) -> Result<&ClaimGame, DomainError> {
        match &self.data {
            GameData::Claim(g) => Ok(g),
            _ => Err(DomainError::corrupt("game record is not a claim game")),
        }
    }

    pub fn claim_mut(&mut self) -> Result<&mut ClaimGame, DomainError> {
        match &mut self.data {
            GameData::Claim(g) => Ok(g),
            _ => Err(DomainError::corrupt("game record is not a claim game")),
        }
    }

    pub fn draft(&self) -> Result<&DraftGame, DomainError> {
        match &self.data {
            GameData::Draft(g) => Ok(g),
            _ => Err(DomainError::corrupt("game record is not a draft game")),
        }
    }

    pub fn draft_mut(&mut self) -> Result<&mut DraftGame, DomainError> {
        match &mut self.data {
            GameData::Draft(g) => Ok(g),
            _ => Err(DomainError::corrupt("game record is not a draft game")),
        }
    }

    pub fn flip(&self) -> Result<&FlipGame, DomainError> {
        match &self.data {
            GameData::Flip(g) => Ok(g),
            _ => Err(DomainError::corrupt("game record is not a flip game")),
        }
    }

    pub fn flip_mut(&mut self) -> Result<&mut FlipGame, DomainError> {
        match &mut self.data {
            GameData::Flip(g) => Ok(g),
            _ => Err(DomainError::corrupt("game record is not a flip game")),
        }
    }
}
