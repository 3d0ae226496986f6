//! End-to-end flows for the draft-and-bid auction: take/pay turns, stale
//! request handling, round scoring and winner declaration.

mod support;

use std::sync::Arc;

use cardroom::entities::games::DraftStage;
use cardroom::{DraftEngine, GameKind, GameStore, MemoryStore};
use support::{nick_at, roster, token_at};

async fn started_game(
    engine: &DraftEngine<MemoryStore>,
    store: &MemoryStore,
    tag: &str,
    rounds: u32,
    house_rules: bool,
    deck: Vec<u8>,
) -> (Vec<String>, Vec<String>) {
    let mut owner_token = String::new();
    for nick in ["ann", "bob", "cas"] {
        let joined = engine.join(tag, nick, rounds, house_rules).await.unwrap();
        if nick == "ann" {
            owner_token = joined.token.to_string();
        }
    }
    engine.start(tag, &owner_token).await.unwrap();
    rig_deck(store, tag, deck).await;

    let players = roster(store, GameKind::Draft, tag).await;
    let tokens = (0..3).map(|s| token_at(&players, s)).collect();
    let nicks = (0..3).map(|s| nick_at(&players, s)).collect();
    (tokens, nicks)
}

async fn rig_deck(store: &MemoryStore, tag: &str, deck: Vec<u8>) {
    let mut game = store.load_game(GameKind::Draft, tag).await.unwrap().unwrap();
    game.draft_mut().unwrap().deck = deck;
    store.save_game(&game).await.unwrap();
}

#[tokio::test]
async fn take_pay_flow_scores_and_declares_a_winner() {
    let store = MemoryStore::shared();
    let engine = DraftEngine::with_seed(Arc::clone(&store), 11);
    let (tokens, nicks) =
        started_game(&engine, &store, "t", 1, false, vec![7, 12, 19]).await;

    let err = engine.take("t", &tokens[1], 7).await.unwrap_err();
    assert_eq!(err.message(), format!("It is not {}'s turn to go", nicks[1]));

    // Resubmissions against out-of-date state are quiet no-ops.
    let err = engine.pay("t", &tokens[0], 5).await.unwrap_err();
    assert!(err.is_stale());
    assert_eq!(err.message(), "ignoring duplicate pay request at pool size 5");
    let err = engine.take("t", &tokens[0], 99).await.unwrap_err();
    assert!(err.is_stale());
    assert_eq!(err.message(), "ignoring duplicate take request for card 99");

    let outcome = engine.pay("t", &tokens[0], 0).await.unwrap();
    assert_eq!(
        outcome.message,
        format!("{} pays a token, {} is next to go", nicks[0], nicks[1])
    );

    // Seat 1 takes the card and the pooled stake, then must keep going.
    let outcome = engine.take("t", &tokens[1], 7).await.unwrap();
    assert_eq!(
        outcome.message,
        format!("{} takes the card, reveals 12 and must go again", nicks[1])
    );
    let players = roster(&store, GameKind::Draft, "t").await;
    let taker = players.iter().find(|p| p.turn_order == Some(1)).unwrap();
    assert_eq!(taker.draft_seat().unwrap().hand, vec![7]);
    assert_eq!(taker.draft_seat().unwrap().cash, 12);

    engine.take("t", &tokens[1], 12).await.unwrap();
    let outcome = engine.take("t", &tokens[1], 19).await.unwrap();
    assert_eq!(outcome.message, format!("{} takes the last card", nicks[1]));

    let game = store.load_game(GameKind::Draft, "t").await.unwrap().unwrap();
    assert_eq!(game.draft().unwrap().stage, DraftStage::RoundOver);

    let err = engine.take("t", &tokens[1], 19).await.unwrap_err();
    assert_eq!(
        err.message(),
        "taking a card is not a valid move at this game stage"
    );

    // Seat 0: no cards, 10 left = -10. Seat 1: 7 + 12 + 19 - 12 = 26.
    // Seat 2: untouched, -11. Lowest total wins.
    let outcome = engine.end_round("t", &tokens[2]).await.unwrap();
    assert_eq!(
        outcome.message,
        format!(
            "Scores for round 1: {a}: -10, {b}: 26, {c}: -11. Final scores: {a}: -10, {b}: 26, {c}: -11. {c} wins!",
            a = nicks[0],
            b = nicks[1],
            c = nicks[2]
        )
    );
    let game = store.load_game(GameKind::Draft, "t").await.unwrap().unwrap();
    assert_eq!(game.draft().unwrap().stage, DraftStage::GameOver);
}

#[tokio::test]
async fn house_rules_taking_passes_the_turn() {
    let store = MemoryStore::shared();
    let engine = DraftEngine::with_seed(Arc::clone(&store), 11);
    let (tokens, nicks) =
        started_game(&engine, &store, "t", 1, true, vec![7, 12, 19]).await;

    let outcome = engine.take("t", &tokens[0], 7).await.unwrap();
    assert_eq!(
        outcome.message,
        format!(
            "{} takes the card, {} is next to go and reveals 12",
            nicks[0], nicks[1]
        )
    );
    let game = store.load_game(GameKind::Draft, "t").await.unwrap().unwrap();
    assert_eq!(game.next_player, Some(1));
}

#[tokio::test]
async fn a_broke_player_cannot_pay() {
    let store = MemoryStore::shared();
    let engine = DraftEngine::with_seed(Arc::clone(&store), 11);
    let (tokens, nicks) =
        started_game(&engine, &store, "t", 1, false, vec![7, 12, 19]).await;

    let mut players = roster(&store, GameKind::Draft, "t").await;
    let broke = players
        .iter_mut()
        .find(|p| p.turn_order == Some(0))
        .unwrap();
    broke.draft_seat_mut().unwrap().cash = 0;
    store.save_player(broke).await.unwrap();

    let err = engine.pay("t", &tokens[0], 0).await.unwrap_err();
    assert_eq!(err.message(), format!("{} has no tokens so cannot pay", nicks[0]));
}

#[tokio::test]
async fn intermediate_rounds_reset_the_table() {
    let store = MemoryStore::shared();
    let engine = DraftEngine::with_seed(Arc::clone(&store), 11);
    let (tokens, nicks) = started_game(&engine, &store, "t", 2, false, vec![7]).await;

    engine.take("t", &tokens[0], 7).await.unwrap();
    let outcome = engine.end_round("t", &tokens[0]).await.unwrap();
    assert_eq!(
        outcome.message,
        format!(
            "Scores for round 1: {}: -4, {}: -11, {}: -11. Starting round 2/2",
            nicks[0], nicks[1], nicks[2]
        )
    );

    let game = store.load_game(GameKind::Draft, "t").await.unwrap().unwrap();
    let state = game.draft().unwrap();
    assert_eq!(state.stage, DraftStage::Playing);
    assert_eq!(state.round, 1);
    assert_eq!(state.pool, 0);
    assert_eq!(state.deck.len(), 24);

    let players = roster(&store, GameKind::Draft, "t").await;
    for player in &players {
        let seat = player.draft_seat().unwrap();
        assert!(seat.hand.is_empty());
        assert_eq!(seat.cash, 11);
    }
    let first = players.iter().find(|p| p.turn_order == Some(0)).unwrap();
    assert_eq!(first.draft_seat().unwrap().points, -4);
}

#[tokio::test]
async fn tied_totals_are_joint_winners() {
    let store = MemoryStore::shared();
    let engine = DraftEngine::with_seed(Arc::clone(&store), 11);
    let (tokens, nicks) = started_game(&engine, &store, "t", 1, false, vec![]).await;

    let mut game = store.load_game(GameKind::Draft, "t").await.unwrap().unwrap();
    game.draft_mut().unwrap().stage = DraftStage::RoundOver;
    store.save_game(&game).await.unwrap();

    let mut players = roster(&store, GameKind::Draft, "t").await;
    for player in players.iter_mut() {
        let order = player.turn_order;
        let seat = player.draft_seat_mut().unwrap();
        match order {
            Some(0) => {
                seat.hand = vec![10];
                seat.cash = 11;
            }
            Some(1) => {
                seat.hand = vec![];
                seat.cash = 1;
            }
            _ => {
                seat.hand = vec![20];
                seat.cash = 0;
            }
        }
        store.save_player(player).await.unwrap();
    }

    let outcome = engine.end_round("t", &tokens[0]).await.unwrap();
    assert!(
        outcome.message.ends_with(&format!(
            "{} and {} are joint winners",
            nicks[0], nicks[1]
        )),
        "unexpected message: {}",
        outcome.message
    );
}

#[tokio::test]
async fn starting_needs_a_quorum() {
    let store = MemoryStore::shared();
    let engine = DraftEngine::with_seed(Arc::clone(&store), 11);

    let ann = engine.join("t", "ann", 3, false).await.unwrap();
    engine.join("t", "bob", 3, false).await.unwrap();
    let err = engine.start("t", &ann.token.to_string()).await.unwrap_err();
    assert_eq!(err.message(), "Not enough players to start game t (2)");
}

#[tokio::test]
async fn visible_state_shows_the_pool_but_not_cash() {
    let store = MemoryStore::shared();
    let engine = DraftEngine::with_seed(Arc::clone(&store), 11);
    let (tokens, _) = started_game(&engine, &store, "t", 1, false, vec![7, 12, 19]).await;
    engine.pay("t", &tokens[0], 0).await.unwrap();

    let state = engine.visible_state("t", &tokens[1]).await.unwrap();
    assert_eq!(state["card"], serde_json::json!(7));
    assert_eq!(state["pool"], serde_json::json!(1));
    assert_eq!(state["deck_size"], serde_json::json!(3));
    assert_eq!(state["your_cash"], serde_json::json!(11));
    assert_eq!(state["actions"], serde_json::json!(["take", "pay"]));
    for seat in state["players"].as_array().unwrap() {
        assert!(seat.get("cash").is_none());
    }

    let public = engine.visible_state("t", "gibberish").await.unwrap();
    assert_eq!(public["your_cash"], serde_json::json!(0));
    assert_eq!(public["actions"], serde_json::json!([]));
}
