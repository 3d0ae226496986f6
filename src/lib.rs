#![deny(clippy::wildcard_imports)]
#![cfg_attr(test, allow(clippy::wildcard_imports))]

//! Rule engines for three multiplayer turn-based card games:
//!
//! - [`engine::claim`]: a bluffing game where a face-down card is passed
//!   around with a (possibly false) claim attached;
//! - [`engine::draft`]: a take-or-pay auction over a sampled deck;
//! - [`engine::flip`]: a place/bid/flip game with elimination.
//!
//! Each engine exposes named actions performed by token-authenticated players
//! against shared persisted state behind the [`store::GameStore`] port, plus a
//! per-player visible-state projection that never leaks hidden information.

pub mod dispatch;
pub mod domain;
pub mod engine;
pub mod entities;
pub mod errors;
pub mod store;

#[cfg(test)]
pub mod test_bootstrap;

// Re-exports for public API
pub use dispatch::{ActionReply, Service};
pub use engine::claim::ClaimEngine;
pub use engine::draft::DraftEngine;
pub use engine::flip::FlipEngine;
pub use engine::{JoinOutcome, Outcome};
pub use entities::games::GameKind;
pub use entities::players::PlayerToken;
pub use errors::DomainError;
pub use store::memory::MemoryStore;
pub use store::GameStore;

// Auto-initialize logging for unit tests
#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    test_bootstrap::logging::init();
}
