//! Action dispatch over the three engines.
//!
//! Maps an inbound `(kind, tag, token, action, params)` tuple to the
//! matching engine call. Unknown actions and missing or mistyped
//! parameters are rejected before any state is touched. On a successful
//! action that requests notification, the outcome message is also written
//! to the game's `status` field so late-joining viewers see it.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::domain::{CardValue, Seat};
use crate::engine::claim::ClaimEngine;
use crate::engine::draft::{self, DraftEngine};
use crate::engine::flip::FlipEngine;
use crate::engine::{JoinOutcome, Outcome};
use crate::entities::games::GameKind;
use crate::entities::players::PlayerToken;
use crate::errors::domain::DomainError;
use crate::store::GameStore;

/// Uniform reply shape for dispatched actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReply {
    /// Set only by a successful `join`.
    pub token: Option<PlayerToken>,
    pub message: String,
    pub success: bool,
    /// Should other clients refresh?
    pub notify: bool,
}

impl ActionReply {
    fn rejected(err: &DomainError) -> Self {
        Self {
            token: None,
            message: err.message().to_owned(),
            success: false,
            notify: false,
        }
    }

    fn from_outcome(outcome: Outcome) -> Self {
        Self {
            token: None,
            message: outcome.message,
            success: true,
            notify: outcome.notify,
        }
    }

    fn from_join(outcome: JoinOutcome) -> Self {
        Self {
            token: Some(outcome.token),
            message: outcome.message,
            success: true,
            notify: outcome.notify,
        }
    }
}

/// One service owning the three engines over a shared store.
pub struct Service<S> {
    store: Arc<S>,
    claim: ClaimEngine<S>,
    draft: DraftEngine<S>,
    flip: FlipEngine<S>,
}

impl<S: GameStore> Service<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            claim: ClaimEngine::new(Arc::clone(&store)),
            draft: DraftEngine::new(Arc::clone(&store)),
            flip: FlipEngine::new(Arc::clone(&store)),
            store,
        }
    }

    /// Deterministic variant for tests.
    pub fn with_seed(store: Arc<S>, seed: u64) -> Self {
        Self {
            claim: ClaimEngine::with_seed(Arc::clone(&store), seed),
            draft: DraftEngine::with_seed(Arc::clone(&store), seed.wrapping_add(1)),
            flip: FlipEngine::with_seed(Arc::clone(&store), seed.wrapping_add(2)),
            store,
        }
    }

    pub fn claim(&self) -> &ClaimEngine<S> {
        &self.claim
    }

    pub fn draft(&self) -> &DraftEngine<S> {
        &self.draft
    }

    pub fn flip(&self) -> &FlipEngine<S> {
        &self.flip
    }

    /// Dispatch one action and normalise the result. Engine rejections come
    /// back as `success = false` with the error's display text.
    pub async fn handle(
        &self,
        kind: GameKind,
        tag: &str,
        token: &str,
        action: &str,
        params: &Value,
    ) -> ActionReply {
        debug!(kind = kind.as_str(), tag, action, "dispatching action");
        let reply = match self.route(kind, tag, token, action, params).await {
            Ok(reply) => reply,
            Err(err) => ActionReply::rejected(&err),
        };
        if reply.success && reply.notify {
            if let Err(err) = self.note_status(kind, tag, &reply.message).await {
                debug!(kind = kind.as_str(), tag, %err, "status note failed");
            }
        }
        reply
    }

    async fn route(
        &self,
        kind: GameKind,
        tag: &str,
        token: &str,
        action: &str,
        params: &Value,
    ) -> Result<ActionReply, DomainError> {
        let outcome = match (kind, action) {
            (GameKind::Claim, "join") => {
                let nickname = str_param(params, "nickname")?;
                let house_rules = bool_param_or(params, "house_rules", false)?;
                return Ok(ActionReply::from_join(
                    self.claim.join(tag, nickname, house_rules).await?,
                ));
            }
            (GameKind::Claim, "start") => self.claim.start(tag, token).await?,
            (GameKind::Claim, "play") => {
                let card = index_param(params, "card")?;
                let target = seat_param(params, "target")?;
                let claim = card_param(params, "claim")?;
                self.claim.play(tag, token, card, target, claim).await?
            }
            (GameKind::Claim, "peek") => self.claim.peek(tag, token).await?,
            (GameKind::Claim, "refer") => {
                let target = seat_param(params, "target")?;
                let claim = card_param(params, "claim")?;
                self.claim.refer(tag, token, target, claim).await?
            }
            (GameKind::Claim, "call") => {
                let verdict = bool_param(params, "verdict")?;
                self.claim.call(tag, token, verdict).await?
            }
            (GameKind::Claim, "destroy") => self.claim.destroy(tag, token).await?,

            (GameKind::Draft, "join") => {
                let nickname = str_param(params, "nickname")?;
                let rounds = u32_param_or(params, "rounds", draft::DEFAULT_ROUNDS)?;
                let house_rules = bool_param_or(params, "house_rules", false)?;
                return Ok(ActionReply::from_join(
                    self.draft.join(tag, nickname, rounds, house_rules).await?,
                ));
            }
            (GameKind::Draft, "start") => self.draft.start(tag, token).await?,
            (GameKind::Draft, "take") => {
                let card = card_param(params, "card")?;
                self.draft.take(tag, token, card).await?
            }
            (GameKind::Draft, "pay") => {
                let pool = u32_param(params, "pool")?;
                self.draft.pay(tag, token, pool).await?
            }
            (GameKind::Draft, "end_round") => self.draft.end_round(tag, token).await?,
            (GameKind::Draft, "destroy") => self.draft.destroy(tag, token).await?,

            (GameKind::Flip, "join") => {
                let nickname = str_param(params, "nickname")?;
                return Ok(ActionReply::from_join(self.flip.join(tag, nickname).await?));
            }
            (GameKind::Flip, "start") => self.flip.start(tag, token).await?,
            (GameKind::Flip, "place") => {
                let card = index_param(params, "card")?;
                self.flip.place(tag, token, card).await?
            }
            (GameKind::Flip, "bid") => {
                let count = u32_param(params, "count")?;
                self.flip.bid(tag, token, count).await?
            }
            (GameKind::Flip, "decline") => self.flip.decline(tag, token).await?,
            (GameKind::Flip, "flip") => {
                let nickname = str_param(params, "nickname")?;
                self.flip.flip(tag, token, nickname).await?
            }
            (GameKind::Flip, "end_round") => self.flip.end_round(tag, token).await?,
            (GameKind::Flip, "destroy") => self.flip.destroy(tag, token).await?,

            _ => {
                return Err(DomainError::validation_other(format!(
                    "unknown action {action}"
                )))
            }
        };
        Ok(ActionReply::from_outcome(outcome))
    }

    /// The game as visible to the holder of `token`.
    pub async fn visible_state(
        &self,
        kind: GameKind,
        tag: &str,
        token: &str,
    ) -> Result<Value, DomainError> {
        match kind {
            GameKind::Claim => self.claim.visible_state(tag, token).await,
            GameKind::Draft => self.draft.visible_state(tag, token).await,
            GameKind::Flip => self.flip.visible_state(tag, token).await,
        }
    }

    /// Record the latest notification message on the game for display.
    async fn note_status(&self, kind: GameKind, tag: &str, message: &str) -> Result<(), DomainError> {
        let Some(mut game) = self.store.load_game(kind, tag).await? else {
            return Ok(());
        };
        game.status = message.to_owned();
        self.store.save_game(&game).await?;
        Ok(())
    }
}

fn param<'a>(params: &'a Value, name: &str) -> Result<&'a Value, DomainError> {
    params
        .get(name)
        .ok_or_else(|| DomainError::validation_other(format!("missing parameter {name}")))
}

fn str_param<'a>(params: &'a Value, name: &str) -> Result<&'a str, DomainError> {
    param(params, name)?
        .as_str()
        .ok_or_else(|| DomainError::validation_other(format!("invalid parameter {name}")))
}

fn u64_param(params: &Value, name: &str) -> Result<u64, DomainError> {
    param(params, name)?
        .as_u64()
        .ok_or_else(|| DomainError::validation_other(format!("invalid parameter {name}")))
}

fn index_param(params: &Value, name: &str) -> Result<usize, DomainError> {
    Ok(u64_param(params, name)? as usize)
}

fn u32_param(params: &Value, name: &str) -> Result<u32, DomainError> {
    u64_param(params, name)?
        .try_into()
        .map_err(|_| DomainError::validation_other(format!("invalid parameter {name}")))
}

fn u32_param_or(params: &Value, name: &str, default: u32) -> Result<u32, DomainError> {
    if params.get(name).is_none() {
        return Ok(default);
    }
    u32_param(params, name)
}

fn seat_param(params: &Value, name: &str) -> Result<Seat, DomainError> {
    u64_param(params, name)?
        .try_into()
        .map_err(|_| DomainError::validation_other(format!("invalid parameter {name}")))
}

fn card_param(params: &Value, name: &str) -> Result<CardValue, DomainError> {
    u64_param(params, name)?
        .try_into()
        .map_err(|_| DomainError::validation_other(format!("invalid parameter {name}")))
}

fn bool_param(params: &Value, name: &str) -> Result<bool, DomainError> {
    param(params, name)?
        .as_bool()
        .ok_or_else(|| DomainError::validation_other(format!("invalid parameter {name}")))
}

fn bool_param_or(params: &Value, name: &str, default: bool) -> Result<bool, DomainError> {
    if params.get(name).is_none() {
        return Ok(default);
    }
    bool_param(params, name)
}
