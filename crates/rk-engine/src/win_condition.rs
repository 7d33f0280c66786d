//! Win/draw evaluation and match-conclusion rewards (§4.10).
//!
//! `evaluate` is a pure read: it may be called as many times as the caller
//! likes (every damaging action in both modes, plus every tick-mode
//! broadcast) without side effects. `try_declare_winner` is the one place
//! `winner_declared` flips false -> true, and it only ever does so once
//! (invariant 6) — callers that fire it repeatedly on a finished game get
//! `None` back every time after the first.

use std::time::Instant;

use rk_types::enums::Seat;
use rk_types::state::{GameState, Phase, Player, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Winner(Seat),
    Draw,
}

/// EXP awarded to the winner of a decisive match.
pub const WIN_EXP: u32 = 30;
/// EXP awarded to each player on a draw.
pub const DRAW_EXP: u32 = 10;

/// Check whether the match has concluded, without mutating anything. Safe
/// to call on every damaging action and, in tick mode, on every broadcast
/// tick (§4.10).
pub fn evaluate(state: &GameState, now: Instant) -> Option<Outcome> {
    if state.player1.towers.king.is_destroyed {
        return Some(Outcome::Winner(Seat::Player2));
    }
    if state.player2.towers.king.is_destroyed {
        return Some(Outcome::Winner(Seat::Player1));
    }

    if let Phase::Tick(tick) = &state.phase {
        let elapsed = now.saturating_duration_since(tick.start_at);
        if elapsed >= tick.max_duration {
            let d1 = state.player1.towers.destroyed_count();
            let d2 = state.player2.towers.destroyed_count();
            return Some(match d1.cmp(&d2) {
                std::cmp::Ordering::Greater => Outcome::Winner(Seat::Player1),
                std::cmp::Ordering::Less => Outcome::Winner(Seat::Player2),
                std::cmp::Ordering::Equal => Outcome::Draw,
            });
        }
    }

    None
}

/// Evaluate and, if the match just concluded, flip `winner_declared` and
/// return the outcome. Returns `None` both when the match is still ongoing
/// and when it already ended on an earlier call (invariant 6).
pub fn try_declare_winner(state: &mut GameState, now: Instant) -> Option<Outcome> {
    if state.winner_declared {
        return None;
    }
    let outcome = evaluate(state, now)?;
    state.winner_declared = true;
    Some(outcome)
}

/// Apply match-conclusion rewards to both users' persisted records: EXP per
/// §4.10, `games_played`/`games_won` counters, and `gold_this_match` deposit
/// to persistent `gold` on every path — win, loss, or draw (SPEC_FULL open
/// question (a)).
pub fn apply_rewards(outcome: Outcome, player1: &Player, player2: &Player, user1: &mut User, user2: &mut User) {
    user1.games_played += 1;
    user2.games_played += 1;

    match outcome {
        Outcome::Winner(Seat::Player1) => {
            user1.games_won += 1;
            user1.add_exp(WIN_EXP);
        }
        Outcome::Winner(Seat::Player2) => {
            user2.games_won += 1;
            user2.add_exp(WIN_EXP);
        }
        Outcome::Draw => {
            user1.add_exp(DRAW_EXP);
            user2.add_exp(DRAW_EXP);
        }
    }

    user1.gold += player1.gold_this_match;
    user2.gold += player2.gold_this_match;
}
