//! Player-scoped projection of draft-game state.
//!
//! Almost everything here is public by the rules (taken cards are face up,
//! points are open); only cash and the undealt deck stay hidden, the deck
//! surfacing as a size.

use serde_json::{json, Value};

use crate::engine::draft::MIN_PLAYERS;
use crate::entities::games::{DraftStage, Game};
use crate::entities::players::Player;
use crate::errors::domain::DomainError;

pub(super) fn project(
    game: &Game,
    players: &[Player],
    viewer: Option<&Player>,
    token: &str,
) -> Result<Value, DomainError> {
    let state = game.draft()?;
    let stage = state.stage;

    let mut actions: Vec<&str> = Vec::new();
    if let Some(me) = viewer {
        let is_next = game.next_player.is_some() && game.next_player == me.turn_order;
        match stage {
            DraftStage::Playing if is_next => {
                actions = if me.draft_seat()?.cash < 1 {
                    vec!["take"]
                } else {
                    vec!["take", "pay"]
                };
            }
            DraftStage::RoundOver => actions = vec!["end_round"],
            DraftStage::GameOver => actions = vec!["start", "destroy"],
            DraftStage::Gathering if players.len() >= MIN_PLAYERS => actions = vec!["start"],
            _ => {}
        }
    }

    let mut result = json!({
        "tag": game.tag,
        "token": token,
        "stage": stage.label(),
        "next_player": game.next_player,
        "pool": state.pool,
        "card": state.deck.first().copied().unwrap_or(0),
        "deck_size": state.deck.len(),
        "status": game.status,
        "actions": actions,
        "your_hand": [],
        "your_cash": 0,
    });
    if let Some(me) = viewer {
        result["nickname"] = json!(me.nickname);
    }

    let best = players
        .iter()
        .map(|p| p.draft_seat().map(|s| s.points))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .min();

    let mut seats = Vec::with_capacity(players.len());
    for player in players {
        let seat = player.draft_seat()?;
        let is_next = game.next_player.is_some() && game.next_player == player.turn_order;
        let you = viewer.is_some_and(|me| me.token == player.token);

        let status = if stage == DraftStage::GameOver && Some(seat.points) == best {
            "WINNER"
        } else if is_next {
            "NEXT"
        } else {
            ""
        };

        seats.push(json!({
            "nickname": player.nickname,
            "you": you,
            "points": seat.points,
            "is_next": is_next,
            "owner": player.owner,
            "turn_order": player.turn_order,
            "hand": seat.hand,
            "status": status,
        }));

        if you {
            result["your_turn_order"] = json!(player.turn_order);
            result["your_points"] = json!(seat.points);
            result["your_nickname"] = json!(player.nickname);
            result["your_hand"] = json!(seat.hand);
            result["your_cash"] = json!(seat.cash);
        }
    }
    result["players"] = Value::Array(seats);

    Ok(result)
}
