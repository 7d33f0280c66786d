//! Per-tick orchestration for continuous mode: one call per 100 ms
//! simulation tick (§4.9 "Tick rate"). Ties together movement, combat,
//! healer behavior, and tower AI — itself pure and synchronous; the actual
//! 100 ms/200 ms/5 s timers live in `rk-session`.

use std::time::Instant;

use rand::Rng;

use rk_types::enums::{Seat, TowerRole, TroopKind};
use rk_types::ids::TroopInstanceId;
use rk_types::state::{GameState, Phase, Position};

use crate::battle_system;
use crate::combat_resolution;
use crate::combat_tick::{self, Target};
use crate::mana;
use crate::movement;

#[derive(Debug, Clone)]
enum Action {
    Idle,
    MoveTo(Position),
    AttackTroop(TroopInstanceId),
    AttackTower(TowerRole),
    Heal(TroopInstanceId),
}

/// What happened during one `run_tick` call, so the session layer knows
/// which frames to push (`mana_update`) and can bump metrics.
#[derive(Debug, Default)]
pub struct TickSummary {
    pub mana_updates: Vec<Seat>,
    pub kills: u32,
    pub attacks: u32,
}

/// Euclidean distance helper shared by decision and combat-movement logic.
fn dist(a: Position, b: Position) -> f64 {
    a.distance_to(b)
}

pub fn run_tick(state: &mut GameState, now: Instant, rng: &mut impl Rng) -> TickSummary {
    let mut summary = TickSummary::default();
    if state.winner_declared {
        return summary;
    }

    if mana::try_tick_regen(&mut state.player1, now) {
        summary.mana_updates.push(Seat::Player1);
    }
    if mana::try_tick_regen(&mut state.player2, now) {
        summary.mana_updates.push(Seat::Player2);
    }

    let troop_count = match &state.phase {
        Phase::Tick(t) => t.battle.troops.len(),
        Phase::Turn(_) => return summary,
    };

    let decisions: Vec<Action> = (0..troop_count).map(|i| decide(state, i, now)).collect();
    for (i, action) in decisions.into_iter().enumerate() {
        apply_action(state, i, action, now, &mut summary, rng);
    }

    resolve_towers(state, now, &mut summary);
    summary
}

fn decide(state: &GameState, i: usize, now: Instant) -> Action {
    let tick = match &state.phase {
        Phase::Tick(t) => t,
        Phase::Turn(_) => return Action::Idle,
    };
    let troop = &tick.battle.troops[i];
    if troop.is_dead {
        return Action::Idle;
    }

    // Step 1: end-of-map troops stand idle.
    let reached_end = match troop.owner {
        Seat::Player1 => troop.position.y >= 21.0,
        Seat::Player2 => troop.position.y <= 0.0,
    };
    if reached_end {
        return Action::Idle;
    }

    let enemy_seat = GameState::opponent_seat(troop.owner);
    let enemy_player = state.player(enemy_seat);
    let towers_arr = [
        enemy_player.towers.get(TowerRole::King),
        enemy_player.towers.get(TowerRole::Guard1),
        enemy_player.towers.get(TowerRole::Guard2),
    ];

    if troop.kind == TroopKind::Healer {
        return decide_healer(state, tick, troop, enemy_seat);
    }

    let enemy_troop = combat_tick::nearest_enemy_troop(
        troop.position,
        troop.range,
        tick.battle.troops.iter().filter(|t| t.owner == enemy_seat),
    );
    let enemy_tower = combat_tick::nearest_enemy_tower(troop.position, troop.range, towers_arr);

    match combat_tick::choose_target(troop, enemy_troop, enemy_tower) {
        Target::Troop(target) => decide_engage_troop(troop, target, now),
        Target::Tower(target) => decide_engage_tower(troop, target, now),
        Target::None => decide_advance(troop, enemy_player.towers.king.area),
    }
}

fn decide_engage_troop(troop: &rk_types::state::TroopInstance, target: &rk_types::state::TroopInstance, now: Instant) -> Action {
    let d = dist(troop.position, target.position);
    if d <= troop.range {
        if d < troop.range / 2.0 {
            // Step 6: maintain stand-off.
            let dx = troop.position.x - target.position.x;
            let dy = troop.position.y - target.position.y;
            let len = (dx * dx + dy * dy).sqrt().max(1e-9);
            let speed = movement::base_move_speed(troop.speed) * movement::approach_multiplier(true, false) * 0.5;
            return Action::MoveTo(Position::new(troop.position.x + dx / len * speed, troop.position.y + dy / len * speed));
        }
        if combat_tick::attack_ready(troop.attack_speed, troop.last_attack_at, now) {
            return Action::AttackTroop(target.id.clone());
        }
        return Action::Idle;
    }
    let speed = movement::base_move_speed(troop.speed) * movement::approach_multiplier(true, false);
    Action::MoveTo(step_with_river_check(troop, target.position, speed))
}

fn decide_engage_tower(troop: &rk_types::state::TroopInstance, target: &rk_types::state::Tower, now: Instant) -> Action {
    let area = target.area.expect("tick-mode towers always have an area");
    let d = area.edge_distance(troop.position);
    if d <= troop.range {
        if combat_tick::attack_ready(troop.attack_speed, troop.last_attack_at, now) {
            return Action::AttackTower(target.role);
        }
        return Action::Idle;
    }
    let speed = movement::base_move_speed(troop.speed) * movement::approach_multiplier(false, true);
    let candidate = step_with_river_check(troop, area.center(), speed);
    Action::MoveTo(movement::push_out_of_area(candidate, area))
}

/// No target in range: march toward the enemy king's area, the lane-push
/// objective, at unmodified speed.
fn decide_advance(troop: &rk_types::state::TroopInstance, enemy_king_area: Option<rk_types::state::Rect>) -> Action {
    let Some(area) = enemy_king_area else {
        return Action::Idle;
    };
    let speed = movement::base_move_speed(troop.speed);
    Action::MoveTo(step_with_river_check(troop, area.center(), speed))
}

fn step_with_river_check(troop: &rk_types::state::TroopInstance, target: Position, speed: f64) -> Position {
    if movement::crosses_river(troop.position.y, target.y) || movement::in_river_band(troop.position.y) {
        movement::river_crossing_step(troop.position, target, speed, troop.owner)
    } else {
        let dx = target.x - troop.position.x;
        let dy = target.y - troop.position.y;
        let len = (dx * dx + dy * dy).sqrt();
        if len < 1e-9 {
            troop.position
        } else {
            Position::new(troop.position.x + dx / len * speed, troop.position.y + dy / len * speed)
        }
    }
}

fn decide_healer(state: &GameState, tick: &rk_types::state::TickPhase, healer: &rk_types::state::TroopInstance, _enemy_seat: Seat) -> Action {
    let allies = tick.battle.troops.iter().filter(|t| t.owner == healer.owner && t.id != healer.id);

    if combat_tick::healer_should_retreat(healer, allies.clone().map(|a| a.position)) {
        let safe_y = match healer.owner {
            Seat::Player1 => 6.0,
            Seat::Player2 => 15.0,
        };
        let speed = movement::base_move_speed(healer.speed);
        return Action::MoveTo(step_with_river_check(healer, Position::new(healer.position.x, safe_y), speed));
    }

    if let Some(target) = combat_tick::pick_heal_target(healer, allies.clone()) {
        if dist(healer.position, target.position) <= healer.range {
            return Action::Heal(target.id.clone());
        }
        let speed = movement::base_move_speed(healer.speed);
        return Action::MoveTo(step_with_river_check(healer, target.position, speed));
    }

    // Nothing to heal: follow the nearest non-healer ally at ~range distance.
    if let Some(ally) = allies
        .filter(|a| a.kind != TroopKind::Healer && !a.is_dead)
        .min_by(|a, b| dist(healer.position, a.position).partial_cmp(&dist(healer.position, b.position)).unwrap())
    {
        let d = dist(healer.position, ally.position);
        if (d - healer.range).abs() < 0.2 {
            return Action::Idle;
        }
        let speed = movement::base_move_speed(healer.speed);
        return Action::MoveTo(step_with_river_check(healer, ally.position, speed));
    }

    Action::Idle
}

fn apply_action(state: &mut GameState, i: usize, action: Action, now: Instant, summary: &mut TickSummary, rng: &mut impl Rng) {
    match action {
        Action::Idle => {}
        Action::MoveTo(candidate) => apply_move(state, i, candidate),
        Action::AttackTroop(target_id) => apply_attack_troop(state, i, &target_id, now, summary),
        Action::AttackTower(role) => apply_attack_tower(state, i, role, now, summary),
        Action::Heal(target_id) => apply_heal(state, i, &target_id, now, rng),
    }
}

fn apply_move(state: &mut GameState, i: usize, candidate: Position) {
    let Phase::Tick(tick) = &mut state.phase else { return };
    let from = tick.battle.troops[i].position;
    let id = tick.battle.troops[i].id.clone();
    let resolved = movement::resolve_collision(from, candidate, 1.0, &tick.battle, &id);
    tick.battle.troops[i].position = resolved;
}

fn apply_attack_troop(state: &mut GameState, i: usize, target_id: &TroopInstanceId, now: Instant, summary: &mut TickSummary) {
    let Phase::Tick(tick) = &mut state.phase else { return };
    let Some(j) = tick.battle.troops.iter().position(|t| &t.id == target_id) else { return };
    if i == j {
        return;
    }
    let (attacker_idx, attacker_seat, atk) = {
        let a = &tick.battle.troops[i];
        (i, a.owner, a.atk)
    };
    let (first, second) = if attacker_idx < j {
        let (l, r) = tick.battle.troops.split_at_mut(j);
        (&mut l[attacker_idx], &mut r[0])
    } else {
        let (l, r) = tick.battle.troops.split_at_mut(attacker_idx);
        (&mut r[0], &mut l[j])
    };
    let (attacker, target) = if attacker_idx < j { (first, second) } else { (second, first) };
    let outcome = combat_tick::attack_troop(atk, target);
    attacker.last_attack_at = Some(now);
    summary.attacks += 1;
    if outcome.target_died {
        summary.kills += 1;
        state.player_mut(attacker_seat).gold_this_match += outcome.exp_reward as u64;
    }
}

fn apply_attack_tower(state: &mut GameState, i: usize, role: TowerRole, now: Instant, summary: &mut TickSummary) {
    let (attacker_seat, atk) = {
        let Phase::Tick(tick) = &state.phase else { return };
        let a = &tick.battle.troops[i];
        (a.owner, a.atk)
    };
    let enemy_seat = GameState::opponent_seat(attacker_seat);
    let tower = state.player_mut(enemy_seat).towers.get_mut(role);
    let outcome = combat_tick::attack_tower(atk, tower);
    summary.attacks += 1;
    if outcome.target_died {
        state.player_mut(attacker_seat).gold_this_match += outcome.exp_reward as u64;
    }
    if let Phase::Tick(tick) = &mut state.phase {
        tick.battle.troops[i].last_attack_at = Some(now);
    }
}

fn apply_heal(state: &mut GameState, i: usize, target_id: &TroopInstanceId, now: Instant, rng: &mut impl Rng) {
    let Phase::Tick(tick) = &mut state.phase else { return };
    let Some(j) = tick.battle.troops.iter().position(|t| &t.id == target_id) else { return };
    let (healer_level, healer_crit) = {
        let healer = &tick.battle.troops[i];
        (healer.level, healer.crit_percent)
    };
    let target_max_hp = tick.battle.troops[j].max_hp;
    let (heal_amount, _is_crit) = combat_resolution::calculate_heal(target_max_hp, healer_level, healer_crit, rng);
    tick.battle.troops[j].apply_heal(heal_amount);
    tick.battle.troops[i].last_attack_at = Some(now);
}

fn resolve_towers(state: &mut GameState, now: Instant, summary: &mut TickSummary) {
    let (mut p1_enemy_troops, mut p2_enemy_troops) = match &mut state.phase {
        Phase::Tick(tick) => {
            let p1: Vec<_> = tick.battle.troops.iter().filter(|t| t.owner == Seat::Player2).cloned().collect();
            let p2: Vec<_> = tick.battle.troops.iter().filter(|t| t.owner == Seat::Player1).cloned().collect();
            (p1, p2)
        }
        Phase::Turn(_) => return,
    };

    let fired_on_p1 = combat_tick::resolve_tower_attacks(&mut state.player1, &mut p1_enemy_troops, now);
    let fired_on_p2 = combat_tick::resolve_tower_attacks(&mut state.player2, &mut p2_enemy_troops, now);
    summary.attacks += (fired_on_p1.len() + fired_on_p2.len()) as u32;

    if let Phase::Tick(tick) = &mut state.phase {
        for updated in p1_enemy_troops.into_iter().chain(p2_enemy_troops) {
            if let Some(live) = tick.battle.troops.iter_mut().find(|t| t.id == updated.id) {
                live.hp = updated.hp;
                live.is_dead = updated.is_dead;
            }
        }
    }

    for (_, outcome) in fired_on_p1.iter().chain(fired_on_p2.iter()) {
        if outcome.target_died {
            summary.kills += 1;
        }
    }
}

/// Cleanup tick: remove dead troops from the battle map (§4.9 cleanup tick,
/// every 5 s).
pub fn run_cleanup(state: &mut GameState) -> usize {
    match &mut state.phase {
        Phase::Tick(tick) => battle_system::cleanup_dead(&mut tick.battle),
        Phase::Turn(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rk_data::Catalog;

    fn test_catalog() -> Catalog {
        let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).parent().unwrap().parent().unwrap().join("assets/data");
        Catalog::load(dir).expect("workspace assets/data must be present")
    }

    fn sample_state() -> GameState {
        let catalog = test_catalog();
        let mut rng = rand::rngs::StdRng::seed_from_u64(9);
        crate::setup::new_tick_game("a".into(), "b".into(), 1, 1, &catalog, &mut rng, Instant::now())
    }

    use rand::SeedableRng;

    #[test]
    fn run_tick_on_empty_map_is_a_no_op() {
        let mut state = sample_state();
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let summary = run_tick(&mut state, Instant::now(), &mut rng);
        assert_eq!(summary.kills, 0);
    }

    #[test]
    fn cleanup_removes_dead_troops() {
        let mut state = sample_state();
        if let Phase::Tick(tick) = &mut state.phase {
            let card = &state_card();
            let mut t = rk_types::state::TroopInstance::spawn(TroopInstanceId::new("x"), card, Seat::Player1, Position::new(1.0, 1.0), 1);
            t.is_dead = true;
            tick.battle.troops.push(t);
        }
        let removed = run_cleanup(&mut state);
        assert_eq!(removed, 1);
    }

    /// A tick-mode heal must go through the same `calculateHeal(level)`
    /// formula as turn mode, not an attack-stat-derived number.
    #[test]
    fn apply_heal_uses_the_calculate_heal_formula() {
        let mut state = sample_state();
        let healer_id = TroopInstanceId::new("healer");
        let target_id = TroopInstanceId::new("target");
        if let Phase::Tick(tick) = &mut state.phase {
            let mut healer = rk_types::state::TroopInstance::spawn(healer_id.clone(), &state_card(), Seat::Player1, Position::new(1.0, 1.0), 3);
            healer.crit_percent = 0.0;
            let mut target = rk_types::state::TroopInstance::spawn(target_id.clone(), &state_card(), Seat::Player1, Position::new(1.1, 1.0), 1);
            target.max_hp = 300.0;
            target.hp = 100.0;
            tick.battle.troops.push(healer);
            tick.battle.troops.push(target);
        }

        let mut rng = rand::rngs::StdRng::seed_from_u64(5);
        apply_heal(&mut state, 0, &target_id, Instant::now(), &mut rng);

        let Phase::Tick(tick) = &state.phase else { panic!("expected tick phase") };
        let healed = tick.battle.troops.iter().find(|t| t.id == target_id).unwrap();
        let expected = combat_resolution::calculate_heal(300.0, 3, 0.0, &mut rand::rngs::StdRng::seed_from_u64(5)).0;
        assert!((healed.hp - (100.0 + expected)).abs() < 1e-9, "expected calculateHeal-based heal, got {}", healed.hp);
    }

    fn state_card() -> rk_types::state::Troop {
        rk_types::state::Troop {
            name: "x".into(),
            max_hp: 10.0,
            hp: 10.0,
            atk: 5.0,
            dmg: 0.0,
            def: 0.0,
            mana_cost: 1,
            crit_percent: 0.0,
            exp_reward: 1,
            kind: TroopKind::Melee,
            aggro_priority: rk_types::AggroPriority::Tower,
            speed: 1.0,
            range: 1.0,
            attack_speed: 1.0,
        }
    }
}
