//! End-to-end flows for the place/bid/flip game: placement, the auction,
//! flipping order, skull losses, elimination and winning on points.

mod support;

use std::sync::Arc;

use cardroom::domain::FlipCard;
use cardroom::entities::games::FlipStage;
use cardroom::{FlipEngine, GameKind, GameStore, MemoryStore};
use support::{nick_at, roster, token_at};

async fn started_game(
    engine: &FlipEngine<MemoryStore>,
    store: &MemoryStore,
    tag: &str,
) -> (Vec<String>, Vec<String>) {
    let mut owner_token = String::new();
    for nick in ["ann", "bob", "cas"] {
        let joined = engine.join(tag, nick).await.unwrap();
        if nick == "ann" {
            owner_token = joined.token.to_string();
        }
    }
    engine.start(tag, &owner_token).await.unwrap();

    let players = roster(store, GameKind::Flip, tag).await;
    let tokens = (0..3).map(|s| token_at(&players, s)).collect();
    let nicks = (0..3).map(|s| nick_at(&players, s)).collect();
    (tokens, nicks)
}

#[tokio::test]
async fn placement_auction_and_a_winning_flip() {
    let store = MemoryStore::shared();
    let engine = FlipEngine::with_seed(Arc::clone(&store), 3);
    let (tokens, nicks) = started_game(&engine, &store, "t").await;

    // Opening placements may come in any order; hands start as three
    // flowers and a skull.
    let err = engine.place("t", &tokens[1], 9).await.unwrap_err();
    assert_eq!(
        err.message(),
        format!("selected card is out of range for {}'s hand (9)", nicks[1])
    );

    let outcome = engine.place("t", &tokens[1], 0).await.unwrap();
    assert_eq!(
        outcome.message,
        format!(
            "{} has placed their first card, waiting for {}, {}",
            nicks[1], nicks[0], nicks[2]
        )
    );

    let err = engine.place("t", &tokens[1], 0).await.unwrap_err();
    assert_eq!(
        err.message(),
        format!("{} has already placed their first card", nicks[1])
    );
    let err = engine.bid("t", &tokens[1], 1).await.unwrap_err();
    assert_eq!(err.message(), "bidding is not allowed at this game stage");

    engine.place("t", &tokens[0], 3).await.unwrap();
    // The last placement opens play with the seat after the round starter.
    let outcome = engine.place("t", &tokens[2], 0).await.unwrap();
    assert_eq!(
        outcome.message,
        format!(
            "all players have placed their first card, {} must place or bid",
            nicks[1]
        )
    );

    let err = engine.bid("t", &tokens[2], 1).await.unwrap_err();
    assert_eq!(
        err.message(),
        format!("it is not {}'s turn to place now", nicks[2])
    );
    let err = engine.bid("t", &tokens[1], 0).await.unwrap_err();
    assert_eq!(err.message(), "bid of 0 is not valid (3 cards available)");

    let outcome = engine.place("t", &tokens[1], 0).await.unwrap();
    assert_eq!(
        outcome.message,
        format!("{} has placed, {} must place or bid", nicks[1], nicks[2])
    );

    let outcome = engine.bid("t", &tokens[2], 2).await.unwrap();
    assert_eq!(
        outcome.message,
        format!(
            "{} started the bidding at 2, {} must bid higher or pass",
            nicks[2], nicks[0]
        )
    );

    let err = engine.bid("t", &tokens[0], 2).await.unwrap_err();
    assert_eq!(
        err.message(),
        "bid of 2 is not valid (bid stands at 2 with 4 cards available)"
    );

    let outcome = engine.decline("t", &tokens[0]).await.unwrap();
    assert_eq!(
        outcome.message,
        format!("{} passed, {} must bid or pass", nicks[0], nicks[1])
    );
    // The pass chain collapsing onto the bidder closes the auction.
    let outcome = engine.decline("t", &tokens[1]).await.unwrap();
    assert_eq!(
        outcome.message,
        format!(
            "{} passed, {} wins the bid and must now flip 2",
            nicks[1], nicks[2]
        )
    );

    let err = engine.flip("t", &tokens[0], &nicks[1]).await.unwrap_err();
    assert_eq!(err.message(), format!("{} is not the player flipping", nicks[0]));

    // The flipper's own stack is always spent first, whatever the target.
    let outcome = engine.flip("t", &tokens[2], &nicks[0]).await.unwrap();
    assert_eq!(
        outcome.message,
        format!("{} found a flower, leaving 1 still to flip", nicks[2])
    );
    // Seat 1 stacked two flowers, so this one matches the bid.
    let outcome = engine.flip("t", &tokens[2], &nicks[1]).await.unwrap();
    assert_eq!(
        outcome.message,
        format!("{} matched their bid of 2 to win the round", nicks[2])
    );

    let err = engine.flip("t", &tokens[2], &nicks[1]).await.unwrap_err();
    assert_eq!(err.message(), "flipping is not a valid action at this game stage");

    let outcome = engine.end_round("t", &tokens[0]).await.unwrap();
    assert_eq!(
        outcome.message,
        format!(
            "{} starts the next round, all surviving players must place their first card",
            nicks[2]
        )
    );

    let game = store.load_game(GameKind::Flip, "t").await.unwrap().unwrap();
    assert_eq!(game.flip().unwrap().stage, FlipStage::Starting);
    assert_eq!(game.next_player, Some(2));
    let players = roster(&store, GameKind::Flip, "t").await;
    for player in &players {
        let seat = player.flip_seat().unwrap();
        assert_eq!(seat.hand.len(), 4);
        assert!(seat.stack.is_empty());
        assert!(!seat.passed);
        assert_eq!(seat.flipped, 0);
    }
    let flipper = players.iter().find(|p| p.turn_order == Some(2)).unwrap();
    assert_eq!(flipper.flip_seat().unwrap().points, 1);
}

#[tokio::test]
async fn a_skull_loses_the_round_and_a_card() {
    let store = MemoryStore::shared();
    let engine = FlipEngine::with_seed(Arc::clone(&store), 3);
    let (tokens, nicks) = started_game(&engine, &store, "t").await;

    engine.place("t", &tokens[0], 3).await.unwrap();
    engine.place("t", &tokens[1], 3).await.unwrap();
    engine.place("t", &tokens[2], 3).await.unwrap();

    // Bidding for every placed card skips straight to flipping.
    let outcome = engine.bid("t", &tokens[1], 3).await.unwrap();
    assert_eq!(
        outcome.message,
        format!("{} bid 3 for all placed cards and now must flip", nicks[1])
    );

    let outcome = engine.flip("t", &tokens[1], &nicks[1]).await.unwrap();
    assert_eq!(
        outcome.message,
        format!("{} died on their own skull, losing the round", nicks[1])
    );

    let game = store.load_game(GameKind::Flip, "t").await.unwrap().unwrap();
    assert_eq!(game.flip().unwrap().stage, FlipStage::FlipperLost);
    assert_eq!(game.flip().unwrap().skuller, Some(1));

    let outcome = engine.end_round("t", &tokens[0]).await.unwrap();
    assert_eq!(
        outcome.message,
        format!(
            "{} loses a card, {} starts the next round, all surviving players must place their first card",
            nicks[1], nicks[1]
        )
    );

    let players = roster(&store, GameKind::Flip, "t").await;
    let flipper = players.iter().find(|p| p.turn_order == Some(1)).unwrap();
    assert_eq!(flipper.flip_seat().unwrap().hand.len(), 3);
    assert!(flipper.flip_seat().unwrap().alive);
    let game = store.load_game(GameKind::Flip, "t").await.unwrap().unwrap();
    assert_eq!(game.next_player, Some(1));
}

#[tokio::test]
async fn losing_the_last_card_eliminates_and_can_end_the_game() {
    let store = MemoryStore::shared();
    let engine = FlipEngine::with_seed(Arc::clone(&store), 3);
    let (tokens, nicks) = started_game(&engine, &store, "t").await;

    // Seat 0 is down to one card and just flipped seat 1's skull; seat 2
    // was eliminated earlier.
    let mut players = roster(&store, GameKind::Flip, "t").await;
    for player in players.iter_mut() {
        let order = player.turn_order;
        let seat = player.flip_seat_mut().unwrap();
        match order {
            Some(0) => {
                seat.hand = vec![];
                seat.stack = vec![FlipCard::Flower];
                seat.flipped = 1;
            }
            Some(2) => {
                seat.alive = false;
                seat.hand = vec![];
            }
            _ => {}
        }
        store.save_player(player).await.unwrap();
    }
    let mut game = store.load_game(GameKind::Flip, "t").await.unwrap().unwrap();
    game.flip_mut().unwrap().stage = FlipStage::FlipperLost;
    game.flip_mut().unwrap().skuller = Some(1);
    game.next_player = Some(0);
    store.save_game(&game).await.unwrap();

    let outcome = engine.end_round("t", &tokens[1]).await.unwrap();
    assert_eq!(
        outcome.message,
        format!(
            "{} loses their last card, leaving {} as the winner!",
            nicks[0], nicks[1]
        )
    );

    let game = store.load_game(GameKind::Flip, "t").await.unwrap().unwrap();
    assert_eq!(game.flip().unwrap().stage, FlipStage::Over);
    assert_eq!(game.flip().unwrap().winner, Some(1));
    let players = roster(&store, GameKind::Flip, "t").await;
    let out = players.iter().find(|p| p.turn_order == Some(0)).unwrap();
    assert!(!out.flip_seat().unwrap().alive);
}

#[tokio::test]
async fn a_second_point_wins_the_game() {
    let store = MemoryStore::shared();
    let engine = FlipEngine::with_seed(Arc::clone(&store), 3);
    let (tokens, nicks) = started_game(&engine, &store, "t").await;

    let mut players = roster(&store, GameKind::Flip, "t").await;
    let champ = players
        .iter_mut()
        .find(|p| p.turn_order == Some(1))
        .unwrap();
    champ.flip_seat_mut().unwrap().points = 1;
    store.save_player(champ).await.unwrap();

    let mut game = store.load_game(GameKind::Flip, "t").await.unwrap().unwrap();
    game.flip_mut().unwrap().stage = FlipStage::FlipperWon;
    game.next_player = Some(1);
    store.save_game(&game).await.unwrap();

    let outcome = engine.end_round("t", &tokens[0]).await.unwrap();
    assert_eq!(
        outcome.message,
        format!("{} wins the game with 2 points", nicks[1])
    );
    let game = store.load_game(GameKind::Flip, "t").await.unwrap().unwrap();
    assert_eq!(game.flip().unwrap().stage, FlipStage::Over);
    assert_eq!(game.flip().unwrap().winner, Some(1));
}

#[tokio::test]
async fn visible_state_masks_hands_and_unflipped_stacks() {
    let store = MemoryStore::shared();
    let engine = FlipEngine::with_seed(Arc::clone(&store), 3);
    let (tokens, _) = started_game(&engine, &store, "t").await;
    engine.place("t", &tokens[0], 3).await.unwrap();

    let state = engine.visible_state("t", &tokens[0]).await.unwrap();
    assert_eq!(
        state["your_hand"],
        serde_json::json!(["flower", "flower", "flower"])
    );
    assert_eq!(state["your_stack"], serde_json::json!(["skull"]));
    for seat in state["players"].as_array().unwrap() {
        for card in seat["hand"].as_array().unwrap() {
            assert_eq!(card, "hidden");
        }
        for card in seat["stack"].as_array().unwrap() {
            assert_eq!(card, "hidden");
        }
    }

    // Strangers see structure but no cards at all.
    let public = engine.visible_state("t", "gibberish").await.unwrap();
    assert!(public.get("your_hand").is_none());
    assert_eq!(public["actions"], serde_json::json!([]));
}
