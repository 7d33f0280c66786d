//! Tick-mode combat: target acquisition, aggro-priority attack choice,
//! attack cooldowns, healer specialization, and tower AI (§4.9 steps 2-8).

use std::time::{Duration, Instant};

use rk_types::enums::{AggroPriority, Seat, TowerRole};
use rk_types::state::{GameState, Player, Position, Tower, TroopInstance};

use crate::combat_resolution::tick_damage;

/// A troop is in range of an opposing troop — Euclidean distance (§4.9 step 2a).
pub fn nearest_enemy_troop<'a>(
    from: Position,
    range: f64,
    enemies: impl Iterator<Item = &'a TroopInstance>,
) -> Option<&'a TroopInstance> {
    enemies
        .filter(|e| !e.is_dead && from.distance_to(e.position) <= range)
        .min_by(|a, b| from.distance_to(a.position).partial_cmp(&from.distance_to(b.position)).unwrap())
}

/// A troop is in range of an opposing tower — rectangle-*edge* distance, not
/// centroid (§4.9 step 2b; spec.md authoritative over the draft's
/// centroid-based `CanAttackTower`).
pub fn nearest_enemy_tower<'a>(from: Position, range: f64, towers: [&'a Tower; 3]) -> Option<&'a Tower> {
    towers
        .into_iter()
        .filter(|t| !t.is_destroyed)
        .filter_map(|t| t.area.map(|area| (t, area.edge_distance(from))))
        .filter(|(_, dist)| *dist <= range)
        .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
        .map(|(t, _)| t)
}

/// What a troop should attack this tick, honoring its aggro priority
/// (§4.9 step 3): `Troop`-aggro prefers enemies and only targets a tower
/// when no enemy is in range; `Tower`-aggro is symmetric.
pub enum Target<'a> {
    Troop(&'a TroopInstance),
    Tower(&'a Tower),
    None,
}

pub fn choose_target<'a>(
    troop: &TroopInstance,
    enemy_troop: Option<&'a TroopInstance>,
    enemy_tower: Option<&'a Tower>,
) -> Target<'a> {
    match troop.aggro_priority {
        AggroPriority::Troop => match enemy_troop {
            Some(t) => Target::Troop(t),
            None => enemy_tower.map(Target::Tower).unwrap_or(Target::None),
        },
        AggroPriority::Tower => match enemy_tower {
            Some(t) => Target::Tower(t),
            None => enemy_troop.map(Target::Troop).unwrap_or(Target::None),
        },
    }
}

/// Whether `attacker`'s per-entity cooldown (`attack_speed` seconds since
/// `last_attack_at`) has elapsed.
pub fn attack_ready(attack_speed: f64, last_attack_at: Option<Instant>, now: Instant) -> bool {
    match last_attack_at {
        None => true,
        Some(last) => now.duration_since(last) >= Duration::from_secs_f64(attack_speed),
    }
}

/// Result of a troop landing an attack this tick, so the caller (tick_engine)
/// can credit gold and know whether to clean up a kill.
pub struct AttackOutcome {
    pub damage: f64,
    pub target_died: bool,
    pub exp_reward: u32,
}

/// Execute a troop's attack on another troop: floor-1 damage, death flag,
/// caller credits `exp_reward` to the attacker's `gold_this_match` (§4.9
/// step 7).
pub fn attack_troop(attacker_atk: f64, target: &mut TroopInstance) -> AttackOutcome {
    let damage = tick_damage(attacker_atk);
    target.apply_damage(damage);
    AttackOutcome {
        damage,
        target_died: target.is_dead,
        exp_reward: if target.is_dead { target.exp_reward } else { 0 },
    }
}

pub fn attack_tower(attacker_atk: f64, target: &mut Tower) -> AttackOutcome {
    let damage = tick_damage(attacker_atk);
    let was_alive = !target.is_destroyed;
    target.apply_damage(damage);
    AttackOutcome {
        damage,
        target_died: was_alive && target.is_destroyed,
        exp_reward: if was_alive && target.is_destroyed { target.exp_reward } else { 0 },
    }
}

// =============================================================================
// Healer specialization (§4.9 step 8)
// =============================================================================

pub const HEAL_THRESHOLD_FRACTION: f64 = 0.9;
pub const HEALER_SUPPORT_RANGE_MULTIPLIER: f64 = 2.0;

fn safe_zone_y(owner: Seat) -> fn(f64) -> bool {
    match owner {
        Seat::Player1 => |y: f64| y < 8.0,
        Seat::Player2 => |y: f64| y > 13.0,
    }
}

/// Should this healer retreat to its own safe zone? True when no ally is
/// within `range * 2` and it is not already in the safe zone.
pub fn healer_should_retreat(healer: &TroopInstance, allies: impl Iterator<Item = Position>) -> bool {
    let in_safe_zone = safe_zone_y(healer.owner)(healer.position.y);
    if in_safe_zone {
        return false;
    }
    let support_range = healer.range * HEALER_SUPPORT_RANGE_MULTIPLIER;
    !allies.into_iter().any(|p| healer.position.distance_to(p) <= support_range)
}

/// Pick the ally (excluding other healers is not required by spec) with the
/// lowest HP fraction below `HEAL_THRESHOLD_FRACTION` within `range`.
pub fn pick_heal_target<'a>(
    healer: &TroopInstance,
    allies: impl Iterator<Item = &'a TroopInstance>,
) -> Option<&'a TroopInstance> {
    allies
        .filter(|a| !a.is_dead && a.hp_fraction() < HEAL_THRESHOLD_FRACTION)
        .filter(|a| healer.position.distance_to(a.position) <= healer.range)
        .min_by(|a, b| a.hp_fraction().partial_cmp(&b.hp_fraction()).unwrap())
}

// =============================================================================
// Tower AI (§4.9 "Per-tick tower AI")
// =============================================================================

/// Each live tower independently targets the closest opposing troop in
/// range and, if its cooldown has elapsed, attacks it.
pub fn tower_find_target<'a>(tower: &Tower, enemies: impl Iterator<Item = &'a TroopInstance>) -> Option<&'a TroopInstance> {
    let area = tower.area?;
    enemies
        .filter(|e| !e.is_dead && area.edge_distance(e.position) <= tower.range)
        .min_by(|a, b| area.edge_distance(a.position).partial_cmp(&area.edge_distance(b.position)).unwrap())
}

/// Resolve every live tower's attack for one player against the opponent's
/// battle map, returning `(role, outcome)` pairs for towers that fired.
pub fn resolve_tower_attacks(
    player: &mut Player,
    enemy_troops: &mut [TroopInstance],
    now: Instant,
) -> Vec<(TowerRole, AttackOutcome)> {
    let mut fired = Vec::new();
    for role in [TowerRole::King, TowerRole::Guard1, TowerRole::Guard2] {
        let tower = player.towers.get(role);
        if tower.is_destroyed {
            continue;
        }
        if !attack_ready(tower.attack_speed, tower.last_attack_at, now) {
            continue;
        }
        let Some(target_id) = tower_find_target(tower, enemy_troops.iter()).map(|t| t.id.clone()) else {
            continue;
        };
        let atk = tower.atk;
        if let Some(target) = enemy_troops.iter_mut().find(|t| t.id == target_id) {
            let outcome = attack_troop(atk, target);
            player.towers.get_mut(role).last_attack_at = Some(now);
            fired.push((role, outcome));
        }
    }
    fired
}

/// Walk the whole game's towers (both players) recomputing destroyed-count,
/// used by win-condition checks in tick mode.
pub fn destroyed_tower_counts(state: &GameState) -> (usize, usize) {
    (state.player1.towers.destroyed_count(), state.player2.towers.destroyed_count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rk_types::ids::TroopInstanceId;
    use rk_types::state::Troop;
    use rk_types::TroopKind;

    fn stub_card(kind: TroopKind, aggro: AggroPriority) -> Troop {
        Troop {
            name: "stub".into(),
            max_hp: 10.0,
            hp: 10.0,
            atk: 5.0,
            dmg: 0.0,
            def: 0.0,
            mana_cost: 1,
            crit_percent: 0.0,
            exp_reward: 3,
            kind,
            aggro_priority: aggro,
            speed: 1.0,
            range: 2.0,
            attack_speed: 1.0,
        }
    }

    #[test]
    fn attack_ready_true_when_never_attacked() {
        assert!(attack_ready(1.0, None, Instant::now()));
    }

    #[test]
    fn attack_ready_false_within_cooldown() {
        let now = Instant::now();
        assert!(!attack_ready(5.0, Some(now), now));
    }

    #[test]
    fn attack_troop_floors_damage_at_one() {
        let mut target = TroopInstance::spawn(TroopInstanceId::new("t"), &stub_card(TroopKind::Melee, AggroPriority::Troop), Seat::Player2, Position::new(0.0, 0.0), 1);
        target.hp = 0.5;
        let outcome = attack_troop(0.1, &mut target);
        assert_eq!(outcome.damage, 1.0);
        assert!(outcome.target_died);
        assert_eq!(outcome.exp_reward, 3);
    }

    #[test]
    fn troop_aggro_prefers_enemy_over_tower() {
        let card = stub_card(TroopKind::Melee, AggroPriority::Troop);
        let troop = TroopInstance::spawn(TroopInstanceId::new("a"), &card, Seat::Player1, Position::new(0.0, 0.0), 1);
        let enemy = TroopInstance::spawn(TroopInstanceId::new("b"), &card, Seat::Player2, Position::new(1.0, 0.0), 1);
        match choose_target(&troop, Some(&enemy), None) {
            Target::Troop(_) => {}
            _ => panic!("expected troop target"),
        }
    }

    #[test]
    fn healer_retreats_without_nearby_allies() {
        let card = stub_card(TroopKind::Healer, AggroPriority::Troop);
        let healer = TroopInstance::spawn(TroopInstanceId::new("h"), &card, Seat::Player1, Position::new(10.0, 10.0), 1);
        assert!(healer_should_retreat(&healer, std::iter::empty()));
    }
}
