//! Persisted entity shapes: one `Game` aggregate per session plus N
//! `Player` records referencing it.

pub mod games;
pub mod players;
