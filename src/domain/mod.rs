//! Domain layer: card codec and seat/turn helpers shared by all engines.

pub mod codec;
pub mod seats;

// Re-exports for ergonomics
pub use codec::{decode, decode_strict, encode, FlipCard};
pub use seats::{next_eligible, random_turn_order, Seat};

/// A card kind in the claim game (0-based index into the creature table).
pub type CardKind = u8;

/// A numeric card value in the draft game (3..=35).
pub type CardValue = u8;
