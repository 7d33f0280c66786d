//! Spatial container operations over the tick-mode battle map.
//!
//! `BattleMap` itself is plain data (`rk-types::state`); this module is where
//! the Go source's `BattleSystem.CleanupDeadEntities` and friends live as
//! free functions over `&mut BattleMap`.

use rk_types::enums::Seat;
use rk_types::ids::TroopInstanceId;
use rk_types::state::{BattleMap, TroopInstance};

pub fn add_troop(map: &mut BattleMap, troop: TroopInstance) {
    map.troops.push(troop);
}

pub fn find(map: &BattleMap, id: &TroopInstanceId) -> Option<&TroopInstance> {
    map.troops.iter().find(|t| &t.id == id)
}

pub fn find_mut<'a>(map: &'a mut BattleMap, id: &TroopInstanceId) -> Option<&'a mut TroopInstance> {
    map.troops.iter_mut().find(|t| &t.id == id)
}

pub fn troops_of(map: &BattleMap, owner: Seat) -> impl Iterator<Item = &TroopInstance> {
    map.troops.iter().filter(move |t| t.owner == owner)
}

pub fn opposing_troops_of(map: &BattleMap, owner: Seat) -> impl Iterator<Item = &TroopInstance> {
    map.troops.iter().filter(move |t| t.owner != owner)
}

/// Remove every troop marked dead. Run every 5 s (§4.9 cleanup tick).
pub fn cleanup_dead(map: &mut BattleMap) -> usize {
    let before = map.troops.len();
    map.troops.retain(|t| !t.is_dead);
    before - map.troops.len()
}

/// No pair of live troops may be within `MIN_TROOP_DISTANCE` of each other
/// while resolving movement collisions (§4.9 step 5). The spawn contract
/// uses its own, larger clearance — see `spawn::SPAWN_CLEARANCE`.
pub const MIN_TROOP_DISTANCE: f64 = 0.3;

/// Is `position` free of any live troop (other than `excluding`) within
/// `min_distance`?
pub fn is_position_clear(
    map: &BattleMap,
    position: rk_types::state::Position,
    excluding: Option<&TroopInstanceId>,
    min_distance: f64,
) -> bool {
    map.troops.iter().all(|t| {
        if t.is_dead {
            return true;
        }
        if excluding.is_some_and(|id| id == &t.id) {
            return true;
        }
        t.position.distance_to(position) >= min_distance
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rk_types::state::{Position, Troop};
    use rk_types::{AggroPriority, TroopKind};

    fn stub_card() -> Troop {
        Troop {
            name: "stub".into(),
            max_hp: 10.0,
            hp: 10.0,
            atk: 1.0,
            dmg: 0.0,
            def: 0.0,
            mana_cost: 1,
            crit_percent: 0.0,
            exp_reward: 1,
            kind: TroopKind::Melee,
            aggro_priority: AggroPriority::Tower,
            speed: 1.0,
            range: 1.0,
            attack_speed: 1.0,
        }
    }

    #[test]
    fn cleanup_removes_only_dead_troops() {
        let mut map = BattleMap::default();
        let mut alive = TroopInstance::spawn(TroopInstanceId::new("1"), &stub_card(), Seat::Player1, Position::new(1.0, 1.0), 1);
        let mut dead = TroopInstance::spawn(TroopInstanceId::new("2"), &stub_card(), Seat::Player1, Position::new(2.0, 2.0), 1);
        dead.is_dead = true;
        alive.is_dead = false;
        add_troop(&mut map, alive);
        add_troop(&mut map, dead);

        let removed = cleanup_dead(&mut map);
        assert_eq!(removed, 1);
        assert_eq!(map.troops.len(), 1);
    }

    #[test]
    fn position_clear_respects_min_distance() {
        let mut map = BattleMap::default();
        add_troop(&mut map, TroopInstance::spawn(TroopInstanceId::new("1"), &stub_card(), Seat::Player1, Position::new(5.0, 5.0), 1));

        assert!(!is_position_clear(&map, Position::new(5.1, 5.0), None, MIN_TROOP_DISTANCE));
        assert!(is_position_clear(&map, Position::new(10.0, 10.0), None, MIN_TROOP_DISTANCE));
    }

    proptest::proptest! {
        /// §8 universal invariant: `is_position_clear` agrees with a direct
        /// distance check against every live troop on the map, for any
        /// single occupant and candidate point.
        #[test]
        fn position_clear_matches_a_direct_distance_check(
            occupant_x in 0.0..21.0,
            occupant_y in 0.0..21.0,
            candidate_x in 0.0..21.0,
            candidate_y in 0.0..21.0,
        ) {
            let mut map = BattleMap::default();
            let occupant = Position::new(occupant_x, occupant_y);
            add_troop(&mut map, TroopInstance::spawn(TroopInstanceId::new("occupant"), &stub_card(), Seat::Player1, occupant, 1));

            let candidate = Position::new(candidate_x, candidate_y);
            let expected = occupant.distance_to(candidate) >= MIN_TROOP_DISTANCE;
            proptest::prop_assert_eq!(is_position_clear(&map, candidate, None, MIN_TROOP_DISTANCE), expected);
        }
    }
}
