//! Player-scoped projection of claim-game state.
//!
//! Hidden hands surface only as sizes; piles are public; the in-play card
//! shows as an opaque placeholder except to an on-turn holder who has seen
//! it. Seat statuses are derived, never stored.

use serde_json::{json, Value};

use crate::engine::claim::{KIND_NAMES, MIN_PLAYERS};
use crate::entities::games::{ClaimStage, Game};
use crate::entities::players::{ClaimSeatStatus, Player};
use crate::errors::domain::DomainError;

pub(super) fn project(
    game: &Game,
    players: &[Player],
    viewer: Option<&Player>,
    token: &str,
) -> Result<Value, DomainError> {
    let state = game.claim()?;
    let stage = state.stage;

    // Seats that have not yet been bypassed this chain.
    let referrable: Vec<_> = players
        .iter()
        .filter(|p| matches!(p.claim_seat(), Ok(s) if s.nominator.is_none()))
        .filter_map(|p| p.turn_order)
        .collect();

    let mut actions: Vec<&str> = Vec::new();
    let mut show_referrable = false;
    if let Some(me) = viewer {
        let is_next = game.next_player.is_some() && game.next_player == me.turn_order;
        match stage {
            ClaimStage::Starting if is_next => {
                show_referrable = true;
                actions = vec!["play"];
            }
            ClaimStage::Playing if is_next => {
                show_referrable = true;
                if me.claim_seat()?.seen {
                    actions = vec!["refer"];
                } else if referrable.is_empty() {
                    actions = vec!["call"];
                } else {
                    actions = vec!["peek", "refer", "call"];
                }
            }
            ClaimStage::GameOver => actions = vec!["start", "destroy"],
            ClaimStage::Gathering if players.len() >= MIN_PLAYERS => actions = vec!["start"],
            _ => {}
        }
    }

    let mut result = json!({
        "tag": game.tag,
        "token": token,
        "suits": KIND_NAMES,
        "stage": stage.label(),
        "next_player": game.next_player,
        "status": game.status,
        "actions": actions,
        "card": "absent",
        "your_hand": [],
        "your_tricks": [],
    });
    if show_referrable {
        result["referrable"] = json!(referrable);
    }
    if let Some(me) = viewer {
        result["nickname"] = json!(me.nickname);
    }

    let mut seats = Vec::with_capacity(players.len());
    for player in players {
        let seat = player.claim_seat()?;
        let is_next = game.next_player.is_some() && game.next_player == player.turn_order;
        let you = viewer.is_some_and(|me| me.token == player.token);

        let status = if stage == ClaimStage::GameOver && seat.status == ClaimSeatStatus::Won {
            "WINNER"
        } else if stage == ClaimStage::GameOver && seat.status == ClaimSeatStatus::Lost {
            "LOSER"
        } else if is_next {
            "NEXT"
        } else if stage == ClaimStage::Playing && seat.nominator.is_some() && seat.nominator == player.turn_order {
            "STARTER"
        } else if matches!(stage, ClaimStage::Playing | ClaimStage::Starting) && seat.nominator.is_none() {
            "AVAIL"
        } else if matches!(stage, ClaimStage::Playing | ClaimStage::Starting) {
            "UNAVAIL"
        } else {
            ""
        };

        seats.push(json!({
            "nickname": player.nickname,
            "you": you,
            "hand_size": seat.hand.len(),
            "tricks": seat.pile,
            "is_next": is_next,
            "owner": player.owner,
            "turn_order": player.turn_order,
            "seen": seat.seen,
            "claim": seat.claim,
            "target": seat.target,
            "nominator": seat.nominator,
            "status": status,
        }));

        if you {
            result["your_turn_order"] = json!(player.turn_order);
            result["your_nickname"] = json!(player.nickname);
            result["your_hand"] = json!(seat.hand);
            result["your_tricks"] = json!(seat.pile);

            if is_next {
                result["card"] = match state.card {
                    Some(card) if seat.seen => json!(KIND_NAMES[card as usize]),
                    _ => json!("back"),
                };
            }
        }
    }
    result["players"] = Value::Array(seats);

    Ok(result)
}
