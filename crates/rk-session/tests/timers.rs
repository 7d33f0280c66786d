//! Timer-driven behavior (§4.6 matchmaking timeout, §4.8 turn timeout),
//! exercised with `tokio::time::pause` so a 30 s deadline costs no real
//! wall-clock time. Both scenarios drive the real `Matchmaker`/`Room` types
//! used by the production dispatcher; no socket is involved, since neither
//! path writes to a connection that doesn't exist.

use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;

use rk_data::Catalog;
use rk_engine::setup;
use rk_session::{Matchmaker, Registry, Room, SessionConfig};
use rk_store::FileUserStore;
use rk_types::enums::GameMode;
use rk_types::ids::{RoomId, Username};
use rk_types::protocol::GameView;

fn test_catalog() -> Catalog {
    let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("assets/data");
    Catalog::load(dir).expect("workspace assets/data must be present")
}

fn test_user_store() -> Arc<FileUserStore> {
    // `into_path` disables the temp directory's on-drop cleanup so the path
    // stays valid for the rest of the process; none of these tests reach a
    // match conclusion, so the file is never actually written.
    let dir = tempfile::tempdir().expect("tempdir").into_path();
    Arc::new(FileUserStore::new(dir.join("users.json")))
}

#[tokio::test(start_paused = true)]
async fn unmatched_player_times_out_and_can_requeue() {
    let registry = Arc::new(Registry::new());
    let catalog = Arc::new(test_catalog());
    let user_store = test_user_store();
    let config = SessionConfig::default();
    let matchmaker = Arc::new(Matchmaker::new(registry.clone(), catalog, user_store, config));

    let solo = Username::from("solo");
    matchmaker.find_match(solo.clone(), 1, GameMode::Enhanced).await.expect("first enqueue succeeds");
    assert!(registry.pending.contains(&solo), "player should be queued immediately");

    tokio::time::sleep(config.matchmaking_timeout + Duration::from_millis(200)).await;

    assert!(!registry.pending.contains(&solo), "queue entry should be gone once the timeout fires");

    // A second enqueue after the timeout must not see a stale "already
    // queued" conflict from the expired entry.
    matchmaker.find_match(solo, 1, GameMode::Enhanced).await.expect("requeue after timeout succeeds");
}

#[tokio::test(start_paused = true)]
async fn a_player_queued_twice_is_rejected() {
    let registry = Arc::new(Registry::new());
    let catalog = Arc::new(test_catalog());
    let user_store = test_user_store();
    let matchmaker = Arc::new(Matchmaker::new(registry, catalog, user_store, SessionConfig::default()));

    let username = Username::from("dupe");
    matchmaker.find_match(username.clone(), 1, GameMode::Simple).await.expect("first enqueue succeeds");
    let err = matchmaker.find_match(username, 1, GameMode::Simple).await.expect_err("second enqueue must conflict");
    assert!(matches!(err, rk_session::SessionError::Conflict(_)));
}

#[tokio::test(start_paused = true)]
async fn an_idle_turn_is_auto_skipped_after_the_timer_fires() {
    let registry = Arc::new(Registry::new());
    let catalog = test_catalog();
    let user_store = test_user_store();
    let config = SessionConfig::default();

    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    let mut state = setup::new_turn_game(Username::from("alice"), Username::from("bob"), 1, 1, &catalog, &mut rng);
    // Pin the starting seat so the test doesn't depend on the coin flip.
    if let rk_types::state::Phase::Turn(turn) = &mut state.phase {
        turn.current = rk_types::enums::Seat::Player1;
    }

    let room = Arc::new(Room::new(
        RoomId::new("timer-test-room"),
        GameMode::Simple,
        state,
        Username::from("alice"),
        Username::from("bob"),
        registry.clone(),
        user_store,
        config,
    ));
    registry.rooms.insert(room.id.clone(), room.clone());

    room.start().await;

    // Long enough for the 1 s arming grace plus the full 30 s turn timer.
    tokio::time::sleep(config.turn_timer_grace + config.turn_timer + Duration::from_millis(200)).await;

    let view = room.get_game(&Username::from("bob")).await.expect("bob is seated in this room");
    match view {
        GameView::Turn(turn_view) => {
            assert_eq!(turn_view.turn.as_str(), "bob", "alice's idle turn should have been skipped to bob");
            assert_eq!(turn_view.player1.turn_count, 1, "the auto-skip counts as alice's one completed turn");
        }
        GameView::Tick(_) => panic!("expected a turn-mode view"),
    }
}
