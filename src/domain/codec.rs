//! Compact textual card codec used at the storage boundary.
//!
//! Card collections live as typed `Vec`s everywhere in business logic and are
//! flattened to compact strings only when an entity document is persisted.
//! Two decoders exist on purpose: the claim game tolerates malformed stored
//! hands by emptying them, while the draft game treats a malformed deck or
//! hand as corrupt state and refuses to guess. Keep that asymmetry.

use serde::{Deserialize, Serialize};

use crate::errors::domain::DomainError;

/// Encode an ordered card collection as a comma-joined decimal string.
pub fn encode(cards: &[u8]) -> String {
    cards
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Decode a comma-joined card string, failing soft: empty or malformed
/// input yields an empty collection.
pub fn decode(s: &str) -> Vec<u8> {
    if s.is_empty() {
        return Vec::new();
    }
    match s.split(',').map(|tok| tok.parse::<u8>()).collect() {
        Ok(cards) => cards,
        Err(_) => Vec::new(),
    }
}

/// Decode a comma-joined card string, surfacing malformed input as a
/// distinct corrupt-state error.
pub fn decode_strict(s: &str) -> Result<Vec<u8>, DomainError> {
    if s.is_empty() {
        return Ok(Vec::new());
    }
    s.split(',')
        .map(|tok| {
            tok.parse::<u8>()
                .map_err(|_| DomainError::corrupt(format!("malformed card data: {s:?}")))
        })
        .collect()
}

/// A face-down card in the flip game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlipCard {
    Flower,
    Skull,
}

/// Encode flip cards as an undelimited digit string (`"0001"`).
pub fn encode_faces(cards: &[FlipCard]) -> String {
    cards
        .iter()
        .map(|c| match c {
            FlipCard::Flower => '0',
            FlipCard::Skull => '1',
        })
        .collect()
}

/// Decode an undelimited digit string into flip cards; anything but `0`/`1`
/// is corrupt state.
pub fn decode_faces(s: &str) -> Result<Vec<FlipCard>, DomainError> {
    s.chars()
        .map(|ch| match ch {
            '0' => Ok(FlipCard::Flower),
            '1' => Ok(FlipCard::Skull),
            _ => Err(DomainError::corrupt(format!("malformed stack data: {s:?}"))),
        })
        .collect()
}

/// Serde adapter persisting a card vec as a strict comma-joined string.
pub mod comma_string {
    use serde::de::Error as DeError;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(cards: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&super::encode(cards))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(de)?;
        super::decode_strict(&s).map_err(|e| D::Error::custom(e.message().to_owned()))
    }
}

/// Serde adapter persisting a card vec as a comma-joined string, emptying
/// silently on malformed input (claim-game fields only).
pub mod comma_string_lossy {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(cards: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&super::encode(cards))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(de)?;
        Ok(super::decode(&s))
    }
}

/// Serde adapter persisting flip cards as a digit string.
pub mod face_string {
    use serde::de::Error as DeError;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::FlipCard;

    pub fn serialize<S: Serializer>(cards: &[FlipCard], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&super::encode_faces(cards))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<FlipCard>, D::Error> {
        let s = String::deserialize(de)?;
        super::decode_faces(&s).map_err(|e| D::Error::custom(e.message().to_owned()))
    }
}
