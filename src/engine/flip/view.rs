//! Player-scoped projection of flip-game state.
//!
//! Hands and the unflipped portion of every stack are masked to an opaque
//! placeholder, never omitted, so card counts and positions stay visible
//! without content leaking. The requester's real cards appear only under
//! the top-level `your_*` keys.

use serde_json::{json, Value};

use crate::domain::codec::FlipCard;
use crate::engine::flip::MIN_PLAYERS;
use crate::entities::games::{FlipStage, Game};
use crate::entities::players::Player;
use crate::errors::domain::DomainError;

const HIDDEN: &str = "hidden";

fn face(card: FlipCard) -> &'static str {
    match card {
        FlipCard::Flower => "flower",
        FlipCard::Skull => "skull",
    }
}

/// A stack with everything below the flipped top run masked.
fn masked_stack(stack: &[FlipCard], flipped: u32) -> Vec<&'static str> {
    let visible_from = stack.len().saturating_sub(flipped as usize);
    stack
        .iter()
        .enumerate()
        .map(|(i, &card)| if i < visible_from { HIDDEN } else { face(card) })
        .collect()
}

pub(super) fn project(
    game: &Game,
    players: &[Player],
    viewer: Option<&Player>,
    token: &str,
) -> Result<Value, DomainError> {
    let state = game.flip()?;
    let stage = state.stage;

    let mut actions: Vec<&str> = Vec::new();
    if let Some(me) = viewer {
        let seat = me.flip_seat()?;
        let is_next = game.next_player.is_some() && game.next_player == me.turn_order;
        match stage {
            FlipStage::Starting if seat.alive && seat.stack.is_empty() => actions = vec!["place"],
            FlipStage::Placing if is_next => actions = vec!["place", "bid"],
            FlipStage::Bidding if is_next => actions = vec!["bid", "decline"],
            FlipStage::Flipping if is_next => actions = vec!["flip"],
            FlipStage::FlipperLost | FlipStage::FlipperWon => actions = vec!["end_round"],
            FlipStage::Over => actions = vec!["start", "destroy"],
            FlipStage::Gathering if players.len() >= MIN_PLAYERS => actions = vec!["start"],
            _ => {}
        }
    }

    let mut result = json!({
        "tag": game.tag,
        "token": token,
        "stage": stage.label(),
        "next_player": game.next_player,
        "placed": state.placed,
        "bidder": state.bidder,
        "bid": state.bid,
        "flipped": state.flipped,
        "skuller": state.skuller,
        "winner": state.winner,
        "status": game.status,
        "actions": actions.clone(),
    });
    if actions.contains(&"bid") {
        let bids: Vec<u32> = (state.bid + 1..=state.placed).collect();
        result["possible_bids"] = json!(bids);
    }
    if let Some(me) = viewer {
        result["nickname"] = json!(me.nickname);
    }

    let mut seats = Vec::with_capacity(players.len());
    for player in players {
        let seat = player.flip_seat()?;
        let is_next = game.next_player.is_some() && game.next_player == player.turn_order;
        let you = viewer.is_some_and(|me| me.token == player.token);

        let status = if stage == FlipStage::Over
            && state.winner.is_some()
            && player.turn_order == state.winner
        {
            "WINNER".to_owned()
        } else if !seat.alive {
            "DEAD".to_owned()
        } else if seat.passed {
            "PASSED".to_owned()
        } else if is_next {
            "NEXT".to_owned()
        } else if state.bidder.is_some() && player.turn_order == state.bidder {
            format!("BID: {}", state.bid)
        } else {
            String::new()
        };

        seats.push(json!({
            "nickname": player.nickname,
            "you": you,
            "points": seat.points,
            "alive": seat.alive,
            "passed": seat.passed,
            "is_next": is_next,
            "owner": player.owner,
            "turn_order": player.turn_order,
            "flipped": seat.flipped,
            "hand": vec![HIDDEN; seat.hand.len()],
            "stack": masked_stack(&seat.stack, seat.flipped),
            "status": status,
        }));

        if you {
            result["your_turn_order"] = json!(player.turn_order);
            result["your_points"] = json!(seat.points);
            result["your_nickname"] = json!(player.nickname);
            result["your_hand"] = json!(seat.hand.iter().map(|&c| face(c)).collect::<Vec<_>>());
            result["your_stack"] = json!(seat.stack.iter().map(|&c| face(c)).collect::<Vec<_>>());
        }
    }
    result["players"] = Value::Array(seats);

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_masking_exposes_only_the_flipped_top_run() {
        let stack = vec![FlipCard::Skull, FlipCard::Flower, FlipCard::Flower];
        assert_eq!(masked_stack(&stack, 0), vec![HIDDEN, HIDDEN, HIDDEN]);
        // Top of the stack is the end of the vec.
        assert_eq!(masked_stack(&stack, 1), vec![HIDDEN, HIDDEN, "flower"]);
        assert_eq!(masked_stack(&stack, 3), vec!["skull", "flower", "flower"]);
    }
}
