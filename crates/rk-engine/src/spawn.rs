//! Tick-mode `select_troop` — the spawn contract (§4.9).
//!
//! Validation runs in the order the spec lists it: hand membership, bounds,
//! river band, own half, then proximity. Player1's client coordinates are
//! mirrored to the server's single absolute frame before any of the above
//! runs, so both clients can render themselves at the bottom of their own
//! screen.

use rk_types::enums::Seat;
use rk_types::ids::TroopInstanceId;
use rk_types::state::{GameState, Phase, Position, TroopInstance};

use crate::battle_system;
use crate::error::EngineError;
use crate::movement::in_river_band;
use crate::setup::MAP_SIZE;

/// Player1 plays on a mirrored frame: the client sends coordinates as if it
/// always occupies the bottom half, and the server un-mirrors them onto one
/// shared frame where player1's half is `y <= 9` (§4.9 spawn contract step 2).
fn to_server_frame(seat: Seat, x: f64, y: f64) -> (f64, f64) {
    match seat {
        Seat::Player1 => (MAP_SIZE - x, MAP_SIZE - y),
        Seat::Player2 => (x, y),
    }
}

fn own_half(seat: Seat, y: f64) -> bool {
    match seat {
        Seat::Player1 => y <= 9.0,
        Seat::Player2 => y >= 12.0,
    }
}

/// A spawn point must clear every existing entity by at least this much
/// (§4.9 spawn contract step 5) — distinct from (and larger than)
/// `battle_system::MIN_TROOP_DISTANCE`, which only governs movement
/// collision resolution once a troop is already on the map.
pub const SPAWN_CLEARANCE: f64 = 0.5;

pub struct SpawnResult {
    pub instance_id: TroopInstanceId,
    pub position: Position,
}

/// Validate and execute `select_troop(username, name, x, y)`. On success,
/// rotates the played card to the queue tail and spawns a `TroopInstance` at
/// full HP onto the shared battle map (§4.9 "On success").
pub fn select_troop(
    state: &mut GameState,
    seat: Seat,
    troop_name: &str,
    client_x: f64,
    client_y: f64,
) -> Result<SpawnResult, EngineError> {
    if state.winner_declared {
        return Err(EngineError::MatchOver);
    }

    let hand_index = state
        .player(seat)
        .find_hand_index(troop_name)
        .ok_or_else(|| EngineError::UnknownTroop(troop_name.to_string()))?;

    let (x, y) = to_server_frame(seat, client_x, client_y);

    if !(0.0..MAP_SIZE).contains(&x) || !(0.0..MAP_SIZE).contains(&y) {
        return Err(EngineError::OutOfBounds);
    }
    if in_river_band(y) {
        return Err(EngineError::InRiver);
    }
    if !own_half(seat, y) {
        return Err(EngineError::WrongHalf);
    }

    let position = Position::new(x, y);
    let battle = match &state.phase {
        Phase::Tick(tick) => &tick.battle,
        Phase::Turn(_) => unreachable!("select_troop called on a turn-mode game"),
    };
    if !battle_system::is_position_clear(battle, position, None, SPAWN_CLEARANCE) {
        return Err(EngineError::SpawnBlocked);
    }

    let card = state.player(seat).hand[hand_index].clone();
    let cost = card.mana_cost as f64;
    if !state.player_mut(seat).try_spend_mana(cost) {
        return Err(EngineError::NotEnoughMana);
    }

    let replacement = state
        .player_mut(seat)
        .queue
        .pop_front()
        .unwrap_or_else(|| card.clone());
    state.player_mut(seat).rotate_hand(hand_index, replacement);

    let instance_id = TroopInstanceId::new(uuid::Uuid::new_v4().to_string());
    let instance = TroopInstance::spawn(instance_id.clone(), &card, seat, position, state.player(seat).level);

    let Phase::Tick(tick) = &mut state.phase else {
        unreachable!("checked above");
    };
    battle_system::add_troop(&mut tick.battle, instance);

    Ok(SpawnResult { instance_id, position })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rk_data::Catalog;

    fn test_catalog() -> Catalog {
        let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .unwrap()
            .parent()
            .unwrap()
            .join("assets/data");
        Catalog::load(dir).expect("workspace assets/data must be present")
    }

    fn sample_state() -> GameState {
        let catalog = test_catalog();
        let mut rng = StdRng::seed_from_u64(4);
        crate::setup::new_tick_game("a".into(), "b".into(), 1, 1, &catalog, &mut rng, std::time::Instant::now())
    }

    #[test]
    fn spawning_in_the_river_band_is_rejected() {
        let mut state = sample_state();
        let troop = state.player2.hand[0].name.clone();
        let err = select_troop(&mut state, Seat::Player2, &troop, 4.0, 10.5).unwrap_err();
        assert_eq!(err, EngineError::InRiver);
    }

    #[test]
    fn spawning_on_the_opponents_half_is_rejected() {
        let mut state = sample_state();
        let troop = state.player2.hand[0].name.clone();
        let err = select_troop(&mut state, Seat::Player2, &troop, 4.0, 5.0).unwrap_err();
        assert_eq!(err, EngineError::WrongHalf);
    }

    #[test]
    fn player1_coordinates_are_mirrored_onto_the_server_frame() {
        let mut state = sample_state();
        let troop = state.player1.hand[0].name.clone();
        // Client thinks it is spawning at (4, 8) on its own bottom half;
        // mirrored that lands at server (17, 13) which is player2's half.
        let err = select_troop(&mut state, Seat::Player1, &troop, 4.0, 8.0).unwrap_err();
        assert_eq!(err, EngineError::WrongHalf);
    }

    #[test]
    fn a_valid_spawn_rotates_the_hand_and_adds_a_troop() {
        let mut state = sample_state();
        let troop = state.player2.hand[0].name.clone();
        let hand_before = state.player2.hand.len();
        let queue_before = state.player2.queue.len();

        let result = select_troop(&mut state, Seat::Player2, &troop, 4.0, 15.0).unwrap();
        assert_eq!(result.position, Position::new(4.0, 15.0));
        assert_eq!(state.player2.hand.len(), hand_before);
        assert_eq!(state.player2.queue.len(), queue_before);

        let Phase::Tick(tick) = &state.phase else { panic!("expected tick phase") };
        assert_eq!(tick.battle.troops.len(), 1);
    }

    #[test]
    fn spawning_too_close_to_another_troop_is_blocked() {
        let mut state = sample_state();
        let troop = state.player2.hand[0].name.clone();
        select_troop(&mut state, Seat::Player2, &troop, 4.0, 15.0).unwrap();

        let troop2 = state.player2.hand[0].name.clone();
        let err = select_troop(&mut state, Seat::Player2, &troop2, 4.05, 15.0).unwrap_err();
        assert_eq!(err, EngineError::SpawnBlocked);
    }

    /// The spawn contract's clearance (0.5) is stricter than the movement
    /// collision radius (0.3): a candidate 0.4 cells away is far enough to
    /// satisfy movement but must still be rejected as a spawn point.
    #[test]
    fn spawning_within_the_wider_spawn_clearance_is_blocked_even_past_the_movement_radius() {
        let mut state = sample_state();
        let troop = state.player2.hand[0].name.clone();
        select_troop(&mut state, Seat::Player2, &troop, 4.0, 15.0).unwrap();

        assert!(0.4 > crate::battle_system::MIN_TROOP_DISTANCE, "test assumes 0.4 clears the movement radius");
        assert!(0.4 < SPAWN_CLEARANCE, "test assumes 0.4 is still inside the spawn clearance");

        let troop2 = state.player2.hand[0].name.clone();
        let err = select_troop(&mut state, Seat::Player2, &troop2, 4.4, 15.0).unwrap_err();
        assert_eq!(err, EngineError::SpawnBlocked);
    }
}
