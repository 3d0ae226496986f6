//! Domain-level error type used across the engines and the store port.
//!
//! Engine failures are returned values, never panics: every rejected move
//! surfaces as a `DomainError` whose display text is shown to the caller
//! verbatim. Variants are ordered by checking precedence: resolution
//! failures first, then stage, turn, parameter, stale-resubmission and
//! finally internal corruption.

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Entities that can fail to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum NotFoundKind {
    Game,
    Player,
}

/// Validation failure kinds (extend as needed).
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationKind {
    /// The action is not legal at the game's current stage.
    StageMismatch,
    /// The actor is not the seat expected to act.
    OutOfTurn,
    /// A card index or similar parameter is outside its legal range.
    OutOfRange,
    /// The named or indexed target seat is unusable.
    InvalidTarget,
    /// A bid outside the currently legal range.
    InvalidBid,
    /// Joining a game that has already left its gathering stage.
    GameInProgress,
    /// Joining a game that is already at its seat maximum.
    GameFull,
    /// Starting below the game's minimum seat count.
    NotEnoughPlayers,
    Other(String),
}

/// Central domain error type.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Game or player resolution failure.
    NotFound(NotFoundKind, String),
    /// The supplied token is not even token-shaped.
    MalformedToken(String),
    /// The token resolves to a player seated in a different game.
    WrongGame(String),
    /// Input validation or rule violation.
    Validation(ValidationKind, String),
    /// Duplicate or stale resubmission; an idempotent no-op, not a hard error.
    Stale(String),
    /// Malformed persisted state, a storage-layer defect rather than a bad move.
    Corrupt(String),
}

impl Display for DomainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DomainError::NotFound(kind, d) => write!(f, "not found {kind:?}: {d}"),
            DomainError::MalformedToken(d) => write!(f, "malformed token: {d}"),
            DomainError::WrongGame(d) => write!(f, "wrong game: {d}"),
            DomainError::Validation(kind, d) => write!(f, "validation {kind:?}: {d}"),
            DomainError::Stale(d) => write!(f, "stale request: {d}"),
            DomainError::Corrupt(d) => write!(f, "internal game error: {d}"),
        }
    }
}

impl Error for DomainError {}

impl DomainError {
    pub fn not_found(kind: NotFoundKind, detail: impl Into<String>) -> Self {
        Self::NotFound(kind, detail.into())
    }
    pub fn malformed_token(detail: impl Into<String>) -> Self {
        Self::MalformedToken(detail.into())
    }
    pub fn wrong_game(detail: impl Into<String>) -> Self {
        Self::WrongGame(detail.into())
    }
    pub fn validation(kind: ValidationKind, detail: impl Into<String>) -> Self {
        Self::Validation(kind, detail.into())
    }
    pub fn validation_other(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self::Validation(ValidationKind::Other(detail.clone()), detail)
    }
    pub fn stale(detail: impl Into<String>) -> Self {
        Self::Stale(detail.into())
    }
    pub fn corrupt(detail: impl Into<String>) -> Self {
        Self::Corrupt(detail.into())
    }

    /// The user-facing message, without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            DomainError::NotFound(_, d)
            | DomainError::MalformedToken(d)
            | DomainError::WrongGame(d)
            | DomainError::Validation(_, d)
            | DomainError::Stale(d) => d,
            DomainError::Corrupt(d) => d,
        }
    }

    /// True for duplicate-resubmission no-ops.
    pub fn is_stale(&self) -> bool {
        matches!(self, DomainError::Stale(_))
    }

    /// True for storage-layer defects (as opposed to bad moves).
    pub fn is_corrupt(&self) -> bool {
        matches!(self, DomainError::Corrupt(_))
    }
}
