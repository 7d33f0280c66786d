//! Read-only client-facing projections of `GameState` (SPEC_FULL "Client
//! status views" supplement). Keeps server-only bookkeeping
//! (`last_mana_regen_at`, raw `Instant`s, the RNG) out of every response
//! payload — handlers build a view, never serialize `GameState` directly.

use std::time::Instant;

use rk_types::enums::Seat;
use rk_types::ids::RoomId;
use rk_types::protocol::{GameView, PlayerStatus, TickGameView, TowerStatus, TroopStatus, TurnGameView};
use rk_types::state::{GameState, Phase, Player, Tower, TroopInstance};

pub fn player_status(player: &Player) -> PlayerStatus {
    PlayerStatus {
        username: player.user.clone(),
        mana: player.mana,
        towers: player.towers.iter().map(tower_status).collect(),
        hand: player.hand.iter().map(|t| t.name.clone()).collect(),
        turn_count: player.turn_count,
    }
}

fn tower_status(tower: &Tower) -> TowerStatus {
    TowerStatus {
        role: tower.role.as_str().to_string(),
        hp: tower.hp,
        max_hp: tower.max_hp,
        is_destroyed: tower.is_destroyed,
    }
}

fn troop_status(troop: &TroopInstance) -> TroopStatus {
    TroopStatus {
        id: troop.id.to_string(),
        name: troop.name.clone(),
        owner: match troop.owner {
            Seat::Player1 => "player1".to_string(),
            Seat::Player2 => "player2".to_string(),
        },
        x: troop.position.x,
        y: troop.position.y,
        hp: troop.hp,
        max_hp: troop.max_hp,
    }
}

/// `get_game`/`game_state` payload (SPEC_FULL "`get_game` reconnect-free
/// state fetch" supplement).
pub fn game_view(state: &GameState, room_id: &RoomId, now: Instant) -> GameView {
    match &state.phase {
        Phase::Turn(turn) => GameView::Turn(TurnGameView {
            room_id: room_id.clone(),
            player1: player_status(&state.player1),
            player2: player_status(&state.player2),
            turn: state.player(turn.current).user.clone(),
        }),
        Phase::Tick(tick) => {
            let elapsed = now.saturating_duration_since(tick.start_at);
            let time_left_ms = tick.max_duration.saturating_sub(elapsed).as_millis() as u64;
            GameView::Tick(TickGameView {
                room_id: room_id.clone(),
                player1: player_status(&state.player1),
                player2: player_status(&state.player2),
                troops: tick.battle.troops.iter().map(troop_status).collect(),
                time_left_ms,
            })
        }
    }
}
