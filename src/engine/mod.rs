//! The three game engines and their shared lifecycle plumbing.

pub mod claim;
pub mod draft;
pub mod flip;
pub mod lifecycle;

use crate::entities::players::PlayerToken;

/// Result of a successful non-join action: a human-readable message plus a
/// flag telling the caller whether other clients should refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub message: String,
    pub notify: bool,
}

impl Outcome {
    /// An outcome other clients should hear about.
    pub fn notify(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            notify: true,
        }
    }

    /// An outcome visible to the actor only.
    pub fn quiet(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            notify: false,
        }
    }
}

/// Result of a successful `join`: the seat's credential plus the usual
/// message and refresh flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub token: PlayerToken,
    pub message: String,
    pub notify: bool,
}
