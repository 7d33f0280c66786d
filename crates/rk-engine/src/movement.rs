//! Tick-mode troop movement: bridge routing, river-band rule, and the
//! collision-avoidance fallback ladder (§4.9 step 5).
//!
//! Grounded on the original server's commented-out `handleMovement`/
//! `HandleCollisionMovement` draft: a direct step toward the target, with a
//! fixed sequence of fallback offsets tried in order until one lands clear.

use rk_types::enums::Seat;
use rk_types::state::{Position, Rect};

use crate::battle_system;
use crate::setup::MAP_SIZE;

pub const RIVER_Y_MIN: f64 = 10.0;
pub const RIVER_Y_MAX: f64 = 11.0;
pub const BRIDGE_COLUMNS: [f64; 2] = [4.0, 17.0];
pub const BRIDGE_TOLERANCE: f64 = 0.5;

pub fn in_river_band(y: f64) -> bool {
    (RIVER_Y_MIN..=RIVER_Y_MAX).contains(&y)
}

pub fn is_on_bridge_column(x: f64) -> bool {
    BRIDGE_COLUMNS.iter().any(|&bx| (x - bx).abs() <= BRIDGE_TOLERANCE)
}

fn nearest_bridge_x(x: f64) -> f64 {
    BRIDGE_COLUMNS
        .iter()
        .copied()
        .min_by(|a, b| (a - x).abs().partial_cmp(&(b - x).abs()).unwrap())
        .unwrap()
}

/// Base movement speed before any attack-approach multiplier.
pub fn base_move_speed(template_speed: f64) -> f64 {
    template_speed * 0.1
}

/// §4.9 step 4: slower when closing in for an attack.
pub fn approach_multiplier(about_to_attack_troop: bool, about_to_attack_tower: bool) -> f64 {
    if about_to_attack_troop {
        0.8
    } else if about_to_attack_tower {
        0.6
    } else {
        1.0
    }
}

pub fn clamp_to_map(p: Position) -> Position {
    Position::new(p.x.clamp(0.0, MAP_SIZE), p.y.clamp(0.0, MAP_SIZE))
}

/// Normalize `(target - from)` and take one step of length `speed` toward
/// it. Returns `from` unchanged if already at the target.
fn step_toward(from: Position, target: Position, speed: f64) -> Position {
    let dx = target.x - from.x;
    let dy = target.y - from.y;
    let dist = (dx * dx + dy * dy).sqrt();
    if dist < 1e-9 {
        return from;
    }
    Position::new(from.x + dx / dist * speed, from.y + dy / dist * speed)
}

/// Which lane edge a troop retreats to when it needs to cross via a bridge:
/// the troop moves along X onto the nearest bridge column first, then
/// advances Y once aligned (§4.9 step 5).
pub fn river_crossing_step(from: Position, target: Position, speed: f64, owner: Seat) -> Position {
    if !in_river_band(from.y) {
        let bridge_y = if from.y < RIVER_Y_MIN { RIVER_Y_MIN } else { RIVER_Y_MAX };
        let waypoint = Position::new(nearest_bridge_x(from.x), bridge_y);
        return step_toward(from, waypoint, speed);
    }

    if !is_on_bridge_column(from.x) {
        // Slide X only while inside the river band and off the bridge.
        let target_x = nearest_bridge_x(from.x);
        Position::new(step_toward(from, Position::new(target_x, from.y), speed).x, from.y)
    } else {
        // On a bridge column: advance across toward the far bank.
        let far_y = match owner {
            Seat::Player1 => RIVER_Y_MAX + 1.0,
            Seat::Player2 => RIVER_Y_MIN - 1.0,
        };
        Position::new(from.x, step_toward(from, Position::new(from.x, far_y), speed).y)
    }
}

/// True if `from` and `target` sit on opposite banks of the river.
pub fn crosses_river(from_y: f64, target_y: f64) -> bool {
    (from_y < RIVER_Y_MIN && target_y > RIVER_Y_MAX) || (from_y > RIVER_Y_MAX && target_y < RIVER_Y_MIN)
}

/// If `candidate` lands inside `area` (an opposing tower's footprint) but
/// the troop isn't attacking that tower, push it out to the nearest edge
/// plus a small margin (§4.9 step 5).
pub fn push_out_of_area(candidate: Position, area: Rect) -> Position {
    if !area.contains(candidate) {
        return candidate;
    }
    let edge = area.nearest_point(candidate);
    let dx = candidate.x - edge.x;
    let dy = candidate.y - edge.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1e-9 {
        // Candidate sits on the centroid; push along +x arbitrarily.
        return Position::new(edge.x + 0.5, edge.y);
    }
    Position::new(edge.x + dx / len * 0.5, edge.y + dy / len * 0.5)
}

/// Try a fixed ladder of fallback offsets until one is clear of every other
/// live troop, in the priority order from §4.9 step 5: lateral X offset,
/// half-Y step, half-way X, diagonal offsets, then a 5% micro-step toward
/// the original candidate. Falls back to `from` (stand still) if nothing
/// clears, which cannot happen in practice since the micro-step shrinks to
/// zero.
pub fn resolve_collision(
    from: Position,
    candidate: Position,
    speed: f64,
    map: &rk_types::state::BattleMap,
    excluding: &rk_types::ids::TroopInstanceId,
) -> Position {
    if battle_system::is_position_clear(map, candidate, Some(excluding), battle_system::MIN_TROOP_DISTANCE) {
        return clamp_to_map(candidate);
    }

    let lateral = [
        Position::new(candidate.x + 0.4 * speed, candidate.y),
        Position::new(candidate.x - 0.4 * speed, candidate.y),
    ];
    let half_y = Position::new(candidate.x, from.y + (candidate.y - from.y) * 0.5);
    let half_way_x = Position::new(from.x + (candidate.x - from.x) * 0.5, candidate.y);
    let diagonals = [
        Position::new(candidate.x + 0.3 * speed, candidate.y + 0.3 * speed),
        Position::new(candidate.x - 0.3 * speed, candidate.y - 0.3 * speed),
        Position::new(candidate.x + 0.3 * speed, candidate.y - 0.3 * speed),
        Position::new(candidate.x - 0.3 * speed, candidate.y + 0.3 * speed),
    ];

    let attempts = lateral
        .into_iter()
        .chain(std::iter::once(half_y))
        .chain(std::iter::once(half_way_x))
        .chain(diagonals);

    for attempt in attempts {
        let clamped = clamp_to_map(attempt);
        if battle_system::is_position_clear(map, clamped, Some(excluding), battle_system::MIN_TROOP_DISTANCE) {
            return clamped;
        }
    }

    // Micro-step fallback: shrink toward `from` by 5% until clear (bounded
    // to avoid looping forever on a pathological map).
    let mut micro = candidate;
    for _ in 0..20 {
        micro = Position::new(from.x + (micro.x - from.x) * 0.95, from.y + (micro.y - from.y) * 0.95);
        let clamped = clamp_to_map(micro);
        if battle_system::is_position_clear(map, clamped, Some(excluding), battle_system::MIN_TROOP_DISTANCE) {
            return clamped;
        }
    }
    clamp_to_map(from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_river_band_matches_spec_range() {
        assert!(in_river_band(10.0));
        assert!(in_river_band(11.0));
        assert!(!in_river_band(9.9));
        assert!(!in_river_band(11.1));
    }

    #[test]
    fn bridge_columns_within_tolerance() {
        assert!(is_on_bridge_column(4.0));
        assert!(is_on_bridge_column(4.4));
        assert!(!is_on_bridge_column(10.0));
        assert!(is_on_bridge_column(17.4));
    }

    #[test]
    fn step_toward_moves_the_expected_distance() {
        let from = Position::new(0.0, 0.0);
        let to = Position::new(10.0, 0.0);
        let next = step_toward(from, to, 1.0);
        assert!((next.x - 1.0).abs() < 1e-9);
    }

    #[test]
    fn push_out_of_area_clears_the_rect() {
        let area = Rect::new(0.0, 0.0, 2.0, 2.0);
        let inside = Position::new(1.0, 1.0);
        let pushed = push_out_of_area(inside, area);
        assert!(!area.contains(pushed));
    }

    #[test]
    fn clamp_to_map_respects_bounds() {
        let p = clamp_to_map(Position::new(-5.0, 99.0));
        assert_eq!(p.x, 0.0);
        assert_eq!(p.y, MAP_SIZE);
    }
}
