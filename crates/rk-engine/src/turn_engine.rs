//! Turn-mode sequencer: `attack`, `heal`, `skip_turn`, turn ownership,
//! king-guard gating, and the mana-gain-on-destroy rule (§4.8).
//!
//! Grounded on `turn_based.go`'s `PlayTurnSimple`/`HealTower`, reworked from
//! "parse request, mutate, format a message string" into pure state
//! transitions that return a typed result the session layer turns into a
//! response envelope.

use rand::Rng;
use rk_types::enums::{Seat, TowerRole};
use rk_types::state::{GameState, Phase, Player};

use crate::combat_resolution::{calculate_heal, resolve_attack};
use crate::error::EngineError;
use crate::mana;

fn turn_phase_mut(state: &mut GameState) -> &mut rk_types::state::TurnPhase {
    match &mut state.phase {
        Phase::Turn(t) => t,
        Phase::Tick(_) => unreachable!("turn_engine called on a tick-mode game"),
    }
}

fn current_turn(state: &GameState) -> Seat {
    match &state.phase {
        Phase::Turn(t) => t.current,
        Phase::Tick(_) => unreachable!("turn_engine called on a tick-mode game"),
    }
}

/// Cancel the previous turn timer (the caller's responsibility to stop the
/// async timer) and hand the turn to the opponent, resetting `armed_at` so
/// the session layer knows to re-arm after the 1 s grace (§4.8).
fn switch_turn(state: &mut GameState) {
    let next = GameState::opponent_seat(current_turn(state));
    let phase = turn_phase_mut(state);
    phase.current = next;
    phase.armed_at = None;
}

fn require_turn(state: &GameState, seat: Seat) -> Result<(), EngineError> {
    if state.winner_declared {
        return Err(EngineError::MatchOver);
    }
    if current_turn(state) != seat {
        return Err(EngineError::NotYourTurn);
    }
    Ok(())
}

fn find_troop_cost<'a>(player: &'a Player, troop_name: &str) -> Result<&'a rk_types::state::Troop, EngineError> {
    player
        .hand
        .iter()
        .find(|t| t.name == troop_name)
        .ok_or_else(|| EngineError::UnknownTroop(troop_name.to_string()))
}

/// Outcome of a successful `attack`, carrying everything the session needs
/// to build an `attack_response` (§6) without re-deriving it.
pub struct AttackResult {
    pub damage: f64,
    pub is_crit: bool,
    pub target: TowerRole,
    pub target_destroyed: bool,
    pub kept_turn: bool,
}

/// §4.8 attack contract, steps 1-6 (win check is the caller's job — it runs
/// the same way after every damaging action in both modes, see
/// `win_condition`).
pub fn attack(state: &mut GameState, attacker: Seat, troop_name: &str, target: TowerRole, rng: &mut impl Rng) -> Result<AttackResult, EngineError> {
    require_turn(state, attacker)?;

    let defender = GameState::opponent_seat(attacker);
    let cost = find_troop_cost(state.player(attacker), troop_name)?.mana_cost as f64;

    if !state.player_mut(attacker).try_spend_mana(cost) {
        return Err(EngineError::NotEnoughMana);
    }

    if target == TowerRole::King && !state.player(defender).towers.king_exposed() {
        state.player_mut(attacker).refund_mana(cost);
        return Err(EngineError::KingGuarded);
    }

    let card = find_troop_cost(state.player(attacker), troop_name)?;
    let (atk, crit_percent) = (card.atk, card.crit_percent);
    let level = state.player(attacker).level;

    let (damage, is_crit) = resolve_attack(atk, level, crit_percent, state.player(defender).towers.get(target).def, rng);
    state.player_mut(defender).towers.get_mut(target).apply_damage(damage);
    let destroyed = state.player(defender).towers.get(target).is_destroyed;

    state.player_mut(attacker).turn_count += 1;

    if destroyed {
        mana::grant_destroy_bonus(state.player_mut(attacker));
    } else {
        switch_turn(state);
    }

    Ok(AttackResult {
        damage,
        is_crit,
        target,
        target_destroyed: destroyed,
        kept_turn: destroyed,
    })
}

pub struct HealResult {
    pub amount: f64,
    pub is_crit: bool,
    pub healed: TowerRole,
}

/// §4.8 heal contract: only a healer-typed troop may heal, and it always
/// switches the turn (healing never keeps the attacker on the board the
/// way a lethal attack does).
pub fn heal(state: &mut GameState, healer_seat: Seat, troop_name: &str, rng: &mut impl Rng) -> Result<HealResult, EngineError> {
    require_turn(state, healer_seat)?;

    let card = find_troop_cost(state.player(healer_seat), troop_name)?;
    if card.kind != rk_types::TroopKind::Healer {
        return Err(EngineError::NotAHealer);
    }
    let cost = card.mana_cost as f64;

    if !state.player_mut(healer_seat).try_spend_mana(cost) {
        return Err(EngineError::NotEnoughMana);
    }

    let level = state.player(healer_seat).level;
    let card = find_troop_cost(state.player(healer_seat), troop_name)?;
    let crit_percent = card.crit_percent;

    let towers = &mut state.player_mut(healer_seat).towers;
    let Some(target) = towers.lowest_hp_mut() else {
        // No living tower to heal: refund and leave the turn untouched,
        // matching `HealTower`'s early-return-without-side-effect.
        state.player_mut(healer_seat).refund_mana(cost);
        return Err(EngineError::UnknownTroop("no living tower to heal".to_string()));
    };
    let role = target.role;
    let max_hp = target.max_hp;

    let (heal_amount, is_crit) = calculate_heal(max_hp, level, crit_percent, rng);
    state.player_mut(healer_seat).towers.get_mut(role).apply_heal(heal_amount);

    state.player_mut(healer_seat).turn_count += 1;
    switch_turn(state);

    Ok(HealResult { amount: heal_amount, is_crit, healed: role })
}

/// §4.8 `skipTurn`: callable by the turn owner directly, or by the
/// turn-timer expiry path on that player's behalf (§5 cancellation).
pub fn skip_turn(state: &mut GameState, seat: Seat) -> Result<(), EngineError> {
    require_turn(state, seat)?;
    state.player_mut(seat).turn_count += 1;
    switch_turn(state);
    Ok(())
}

/// Grant the active player's turn-start mana (§4.8: "for turns beyond the
/// first"). The session layer calls this once per turn, after the first,
/// right before arming the new turn timer.
pub fn grant_turn_start_mana(state: &mut GameState, seat: Seat) {
    mana::grant_turn_start_mana(state.player_mut(seat));
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

    fn sample_state(seed: u64) -> GameState {
        let catalog = test_catalog();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut state = crate::setup::new_turn_game("a".into(), "b".into(), 1, 1, &catalog, &mut rng);
        if let Phase::Turn(t) = &mut state.phase {
            t.current = Seat::Player1;
        }
        state
    }

    #[test]
    fn attacking_out_of_turn_fails() {
        let mut state = sample_state(1);
        let mut rng = StdRng::seed_from_u64(2);
        let troop = state.player1.hand[0].name.clone();
        if let Phase::Turn(t) = &mut state.phase {
            t.current = Seat::Player2;
        }
        let err = attack(&mut state, Seat::Player1, &troop, TowerRole::Guard1, &mut rng).unwrap_err();
        assert_eq!(err, EngineError::NotYourTurn);
    }

    #[test]
    fn attacking_king_while_guards_alive_refunds_mana_and_fails() {
        let mut state = sample_state(5);
        let mut rng = StdRng::seed_from_u64(6);
        let troop = state.player1.hand[0].name.clone();
        let mana_before = state.player1.mana;

        let err = attack(&mut state, Seat::Player1, &troop, TowerRole::King, &mut rng).unwrap_err();
        assert_eq!(err, EngineError::KingGuarded);
        assert_eq!(state.player1.mana, mana_before);
        assert_eq!(current_turn(&state), Seat::Player1);
    }

    #[test]
    fn insufficient_mana_is_rejected_without_deduction() {
        let mut state = sample_state(7);
        let mut rng = StdRng::seed_from_u64(8);
        state.player1.mana = 0.0;
        let troop = state.player1.hand[0].name.clone();
        let err = attack(&mut state, Seat::Player1, &troop, TowerRole::Guard1, &mut rng).unwrap_err();
        assert_eq!(err, EngineError::NotEnoughMana);
        assert_eq!(state.player1.mana, 0.0);
    }

    #[test]
    fn destroying_a_tower_keeps_the_turn_and_grants_bonus_mana() {
        let mut state = sample_state(11);
        let mut rng = StdRng::seed_from_u64(12);
        state.player1.mana = 10.0;
        state.player2.towers.guard1.hp = 1.0;
        let troop = state.player1.hand[0].name.clone();

        let result = attack(&mut state, Seat::Player1, &troop, TowerRole::Guard1, &mut rng).unwrap();
        assert!(result.target_destroyed);
        assert!(result.kept_turn);
        assert_eq!(current_turn(&state), Seat::Player1);
    }

    #[test]
    fn skip_turn_switches_ownership() {
        let mut state = sample_state(13);
        skip_turn(&mut state, Seat::Player1).unwrap();
        assert_eq!(current_turn(&state), Seat::Player2);
        assert_eq!(state.player1.turn_count, 1);
    }
}
