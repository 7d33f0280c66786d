//! New-match construction — towers, starting hand, and initial `GameState`
//! for both modes.
//!
//! Mirrors `mk-engine::setup`'s `create_solo_game` shape: one entry point per
//! mode that returns a fully-formed state, no partial construction exposed.

use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use rand::Rng;

use rk_data::Catalog;
use rk_types::enums::{GameMode, Seat, TowerRole};
use rk_types::state::{
    BattleMap, GameState, Phase, Player, TickPhase, Tower, Towers, TroopTemplate, TurnPhase,
};
use rk_types::TowerKind;

pub const HAND_SIZE: usize = 4;
pub const QUEUE_SIZE: usize = 4;
pub const MAP_SIZE: f64 = 21.0;
pub const MATCH_DURATION: Duration = Duration::from_secs(3 * 60);
pub const TICK_START_GRACE: Duration = Duration::from_secs(3);

/// Build the three starting towers for one player from the catalog.
/// `level_scale`, when set, is the player's level — tick mode scales each
/// tower's `max_hp` by `1 + 0.1 * level` (§3 Tower); turn mode leaves
/// towers at template strength and passes `None`.
pub fn new_towers(catalog: &Catalog, level_scale: Option<u32>) -> Towers {
    let king = catalog.tower(TowerKind::King).expect("catalog has a king template");
    let guard = catalog.tower(TowerKind::Guard).expect("catalog has a guard template");
    let mut towers = Towers {
        king: Tower::from_template(TowerRole::King, king),
        guard1: Tower::from_template(TowerRole::Guard1, guard),
        guard2: Tower::from_template(TowerRole::Guard2, guard),
    };
    if let Some(level) = level_scale {
        let scale = 1.0 + 0.1 * level as f64;
        for tower in towers.iter_mut() {
            tower.max_hp *= scale;
            tower.hp = tower.max_hp;
        }
    }
    towers
}

/// Draw `n` distinct random troop templates from the catalog.
fn draw_templates<'a>(catalog: &'a Catalog, n: usize, rng: &mut impl Rng) -> Vec<&'a TroopTemplate> {
    let mut all: Vec<&TroopTemplate> = catalog.all_troops().collect();
    all.shuffle(rng);
    all.truncate(n);
    all
}

fn new_player(username: rk_types::ids::Username, seat: Seat, level: u32, catalog: &Catalog, rng: &mut impl Rng, scale_towers: bool) -> Player {
    let drawn = draw_templates(catalog, HAND_SIZE + QUEUE_SIZE, rng);
    let mut iter = drawn.into_iter().map(rk_types::state::Troop::from);
    let hand = (&mut iter).take(HAND_SIZE).collect();
    let queue = iter.take(QUEUE_SIZE).collect();

    Player {
        user: username,
        seat,
        level,
        mana: rk_types::state::INITIAL_MANA,
        towers: new_towers(catalog, scale_towers.then_some(level)),
        hand,
        queue,
        turn_count: 0,
        gold_this_match: 0,
        last_mana_regen_at: None,
    }
}

/// Construct a fresh turn-mode match. The starting player is chosen
/// uniformly at random (§4.8).
pub fn new_turn_game(
    player1: rk_types::ids::Username,
    player2: rk_types::ids::Username,
    level1: u32,
    level2: u32,
    catalog: &Catalog,
    rng: &mut impl Rng,
) -> GameState {
    let p1 = new_player(player1.clone(), Seat::Player1, level1, catalog, rng, false);
    let p2 = new_player(player2.clone(), Seat::Player2, level2, catalog, rng, false);

    let current = if rng.gen_bool(0.5) { Seat::Player1 } else { Seat::Player2 };

    GameState {
        mode: GameMode::Simple,
        player1: p1,
        player2: p2,
        phase: Phase::Turn(TurnPhase { current, armed_at: None }),
        winner_declared: false,
    }
}

/// Construct a fresh tick-mode match. `start_at` is the `Instant` the grace
/// period began; the ticker itself compares against `start_at +
/// TICK_START_GRACE` before driving simulation (§4.9 clock).
pub fn new_tick_game(
    player1: rk_types::ids::Username,
    player2: rk_types::ids::Username,
    level1: u32,
    level2: u32,
    catalog: &Catalog,
    rng: &mut impl Rng,
    start_at: Instant,
) -> GameState {
    let mut p1 = new_player(player1, Seat::Player1, level1, catalog, rng, true);
    let mut p2 = new_player(player2, Seat::Player2, level2, catalog, rng, true);
    assign_tower_areas(&mut p1.towers, Seat::Player1);
    assign_tower_areas(&mut p2.towers, Seat::Player2);

    GameState {
        mode: GameMode::Enhanced,
        player1: p1,
        player2: p2,
        phase: Phase::Tick(TickPhase {
            start_at,
            max_duration: MATCH_DURATION,
            battle: BattleMap::default(),
        }),
        winner_declared: false,
    }
}

/// Give each tower a fixed footprint on the 21x21 map (tick mode only) —
/// king centered at the back line, guards flanking near the bridge columns.
fn assign_tower_areas(towers: &mut Towers, seat: Seat) {
    use rk_types::state::Rect;
    let (king_rect, guard1_rect, guard2_rect) = match seat {
        Seat::Player1 => (
            Rect::new(9.0, 0.0, 12.0, 2.0),
            Rect::new(2.0, 0.0, 5.0, 2.0),
            Rect::new(16.0, 0.0, 19.0, 2.0),
        ),
        Seat::Player2 => (
            Rect::new(9.0, 19.0, 12.0, 21.0),
            Rect::new(2.0, 19.0, 5.0, 21.0),
            Rect::new(16.0, 19.0, 19.0, 21.0),
        ),
    };
    towers.king.area = Some(king_rect);
    towers.guard1.area = Some(guard1_rect);
    towers.guard2.area = Some(guard2_rect);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn test_catalog() -> Catalog {
        let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .unwrap()
            .parent()
            .unwrap()
            .join("assets/data");
        Catalog::load(dir).expect("workspace assets/data must be present")
    }

    #[test]
    fn new_turn_game_deals_four_card_hands() {
        let catalog = test_catalog();
        let mut rng = StdRng::seed_from_u64(1);
        let state = new_turn_game("a".into(), "b".into(), 1, 1, &catalog, &mut rng);
        assert_eq!(state.player1.hand.len(), HAND_SIZE);
        assert_eq!(state.player2.queue.len(), QUEUE_SIZE);
    }

    #[test]
    fn new_tick_game_starts_with_empty_battle_map() {
        let catalog = test_catalog();
        let mut rng = StdRng::seed_from_u64(1);
        let state = new_tick_game("a".into(), "b".into(), 1, 1, &catalog, &mut rng, Instant::now());
        match state.phase {
            Phase::Tick(tick) => assert!(tick.battle.troops.is_empty()),
            _ => panic!("expected tick phase"),
        }
    }
}
