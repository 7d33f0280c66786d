//! One live match (§4.7, §5, §4.8, §4.9, §4.10).
//!
//! Grounded on `room.go`'s `Room{Game, mu}` plus `turn_based.go`'s own
//! `time.AfterFunc`-based turn timer and `tick_based.go`'s three goroutine
//! tickers, collapsed here into a single `GameState` behind a `tokio::sync::
//! Mutex` and one background task per room (a turn-timer chain in Simple
//! mode, a single 100 ms ticker in Enhanced mode — SPEC_FULL's "one tick
//! loop, not three" consolidation, since `tick_engine::run_tick` already
//! folds mana regen into its own 2 s-gated check).
//!
//! Turn-timer cancellation doesn't use a side-channel generation counter:
//! `TurnPhase.armed_at` already exists in the data model for exactly this
//! purpose (§4.8), so the session only needs to compare the `Instant` it
//! wrote there against what it reads back after sleeping.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;

use rk_engine::{setup, spawn, tick_engine, turn_engine, win_condition};
use rk_store::UserStore;
use rk_types::enums::{GameMode, MatchOutcome, Seat, TowerRole};
use rk_types::ids::{RoomId, Username};
use rk_types::protocol::{
    kind, GameOverData, GameView, ManaUpdateData, ServerEnvelope, SkipTurnData,
};
use rk_types::state::{GameState, Phase};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::registry::Registry;
use crate::views;

fn current_turn(state: &GameState) -> Seat {
    match &state.phase {
        Phase::Turn(t) => t.current,
        Phase::Tick(_) => unreachable!("turn actions require a turn-mode room"),
    }
}

fn attack_message(result: &turn_engine::AttackResult) -> String {
    if result.target_destroyed {
        format!("{} destroyed!", result.target.as_str())
    } else if result.is_crit {
        "Critical hit!".to_string()
    } else {
        "Attack landed".to_string()
    }
}

/// One matched game, shared by both connections for as long as it lives.
pub struct Room {
    pub id: RoomId,
    pub mode: GameMode,
    pub player1: Username,
    pub player2: Username,
    state: tokio::sync::Mutex<GameState>,
    rng: std::sync::Mutex<StdRng>,
    registry: Arc<Registry>,
    user_store: Arc<dyn UserStore>,
    config: SessionConfig,
}

impl Room {
    pub fn new(
        id: RoomId,
        mode: GameMode,
        state: GameState,
        player1: Username,
        player2: Username,
        registry: Arc<Registry>,
        user_store: Arc<dyn UserStore>,
        config: SessionConfig,
    ) -> Self {
        Self {
            id,
            mode,
            player1,
            player2,
            state: tokio::sync::Mutex::new(state),
            rng: std::sync::Mutex::new(StdRng::from_entropy()),
            registry,
            user_store,
            config,
        }
    }

    /// Kick off whichever background driver the mode needs. Idempotent to
    /// call only once, right after the room is registered.
    pub async fn start(self: &Arc<Self>) {
        match self.mode {
            GameMode::Simple => {
                let seat = current_turn(&*self.state.lock().await);
                self.rearm_turn_timer(seat);
            }
            GameMode::Enhanced => {
                let room = self.clone();
                tokio::spawn(async move { room.run_tick_loop().await });
            }
        }
    }

    async fn broadcast_both(&self, envelope: ServerEnvelope) {
        self.registry.send_to_client(self.player1.clone(), envelope.clone());
        self.registry.send_to_client(self.player2.clone(), envelope);
    }

    pub async fn get_game(&self, username: &Username) -> Result<GameView, SessionError> {
        let state = self.state.lock().await;
        state.seat_of(username).ok_or(SessionError::NotInRoom)?;
        Ok(views::game_view(&state, &self.id, Instant::now()))
    }

    pub async fn attack(self: &Arc<Self>, username: &Username, troop: &str, target: &str) -> Result<(), SessionError> {
        let target_role = TowerRole::parse(target)
            .ok_or_else(|| SessionError::Input(format!("unknown attack target {target:?}")))?;

        let mut state = self.state.lock().await;
        let seat = state.seat_of(username).ok_or(SessionError::NotInRoom)?;

        let result = {
            let mut rng = self.rng.lock().expect("room rng poisoned");
            turn_engine::attack(&mut state, seat, troop, target_role, &mut *rng)?
        };

        let new_turn = current_turn(&state);
        if !result.kept_turn {
            turn_engine::grant_turn_start_mana(&mut state, new_turn);
        }
        metrics::counter!("rk_session_attacks").increment(1);

        let turn_username = state.player(new_turn).user.clone();
        let envelope = ServerEnvelope::ok(
            kind::ATTACK_RESPONSE,
            attack_message(&result),
            &serde_json::json!({
                "room_id": self.id,
                "attacker": views::player_status(state.player(seat)),
                "defender": views::player_status(state.player(GameState::opponent_seat(seat))),
                "troop": troop,
                "target": target,
                "damage": result.damage,
                "is_crit": result.is_crit,
                "is_destroyed": result.target_destroyed,
                "kept_turn": result.kept_turn,
                "turn": turn_username,
            }),
        );

        let win = win_condition::try_declare_winner(&mut state, Instant::now());
        let snapshot = win.map(|outcome| (outcome, state.clone()));
        let turn_switched = !result.kept_turn;
        drop(state);

        self.broadcast_both(envelope).await;
        if turn_switched {
            self.rearm_turn_timer(new_turn);
        }
        if let Some((outcome, snapshot)) = snapshot {
            self.conclude_match(outcome, &snapshot).await;
        }

        Ok(())
    }

    pub async fn heal(self: &Arc<Self>, username: &Username, troop: &str) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        let seat = state.seat_of(username).ok_or(SessionError::NotInRoom)?;

        let result = {
            let mut rng = self.rng.lock().expect("room rng poisoned");
            turn_engine::heal(&mut state, seat, troop, &mut *rng)?
        };

        let new_turn = current_turn(&state);
        turn_engine::grant_turn_start_mana(&mut state, new_turn);
        metrics::counter!("rk_session_heals").increment(1);

        let turn_username = state.player(new_turn).user.clone();
        let envelope = ServerEnvelope::ok(
            kind::HEAL_RESPONSE,
            "Heal applied",
            &serde_json::json!({
                "room_id": self.id,
                "healer": views::player_status(state.player(seat)),
                "troop": troop,
                "healed": result.healed.as_str(),
                "amount": result.amount,
                "is_crit": result.is_crit,
                "turn": turn_username,
            }),
        );

        let win = win_condition::try_declare_winner(&mut state, Instant::now());
        let snapshot = win.map(|outcome| (outcome, state.clone()));
        drop(state);

        self.broadcast_both(envelope).await;
        self.rearm_turn_timer(new_turn);
        if let Some((outcome, snapshot)) = snapshot {
            self.conclude_match(outcome, &snapshot).await;
        }

        Ok(())
    }

    pub async fn skip_turn(self: &Arc<Self>, username: &Username) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        let seat = state.seat_of(username).ok_or(SessionError::NotInRoom)?;
        let skipped = state.player(seat).user.clone();

        turn_engine::skip_turn(&mut state, seat)?;

        let new_turn = current_turn(&state);
        turn_engine::grant_turn_start_mana(&mut state, new_turn);
        metrics::counter!("rk_session_turn_skips").increment(1);
        let turn_username = state.player(new_turn).user.clone();

        let envelope = ServerEnvelope::ok(
            kind::SKIP_TURN_RESPONSE,
            "Turn skipped",
            &SkipTurnData { room_id: self.id.clone(), skipped, turn: turn_username },
        );
        drop(state);

        self.broadcast_both(envelope).await;
        self.rearm_turn_timer(new_turn);
        Ok(())
    }

    pub async fn select_troop(self: &Arc<Self>, username: &Username, troop: &str, x: f64, y: f64) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        let seat = state.seat_of(username).ok_or(SessionError::NotInRoom)?;

        let result = spawn::select_troop(&mut state, seat, troop, x, y)?;
        metrics::counter!("rk_session_spawns").increment(1);

        let envelope = ServerEnvelope::ok(
            kind::SELECT_TROOP_RESPONSE,
            "Troop deployed",
            &serde_json::json!({
                "room_id": self.id,
                "player": views::player_status(state.player(seat)),
                "troop_id": result.instance_id.to_string(),
                "x": result.position.x,
                "y": result.position.y,
            }),
        );
        drop(state);

        self.broadcast_both(envelope).await;
        Ok(())
    }

    /// Declare `leaving`'s opponent the winner and conclude the match
    /// (§9 open question: disconnect mid-match forfeits to the other
    /// player, matching `HandleLeaveGame`/`HandleDisconnect`).
    pub async fn forfeit(self: &Arc<Self>, leaving: &Username) {
        let outcome_and_snapshot = {
            let mut state = self.state.lock().await;
            if state.winner_declared {
                return;
            }
            let Some(seat) = state.seat_of(leaving) else { return };
            state.winner_declared = true;
            (win_condition::Outcome::Winner(GameState::opponent_seat(seat)), state.clone())
        };
        tracing::info!(room = %self.id, %leaving, "player disconnected, forfeiting the match");
        let (outcome, snapshot) = outcome_and_snapshot;
        self.conclude_match(outcome, &snapshot).await;
    }

    /// Re-arm the turn timer for `seat`'s turn after the 1 s grace (§4.8).
    /// `TurnPhase.armed_at` doubles as the cancellation token: if a legal
    /// action switches the turn again before this fires, either the seat
    /// comparison or the `armed_at` comparison below will no longer match
    /// and this invocation quietly does nothing.
    fn rearm_turn_timer(self: &Arc<Self>, seat: Seat) {
        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(this.config.turn_timer_grace).await;

            let armed_at = {
                let mut state = this.state.lock().await;
                if state.winner_declared || current_turn(&state) != seat {
                    return;
                }
                let now = Instant::now();
                if let Phase::Turn(t) = &mut state.phase {
                    t.armed_at = Some(now);
                }
                now
            };

            tokio::time::sleep(this.config.turn_timer).await;

            let mut state = this.state.lock().await;
            if state.winner_declared || current_turn(&state) != seat {
                return;
            }
            if let Phase::Turn(t) = &state.phase {
                if t.armed_at != Some(armed_at) {
                    return;
                }
            }

            let skipped = state.player(seat).user.clone();
            if turn_engine::skip_turn(&mut state, seat).is_err() {
                return;
            }
            let new_turn = current_turn(&state);
            turn_engine::grant_turn_start_mana(&mut state, new_turn);
            metrics::counter!("rk_session_turn_timeouts").increment(1);
            let turn_username = state.player(new_turn).user.clone();

            let envelope = ServerEnvelope::ok(
                kind::SKIP_TURN_RESPONSE,
                "Turn timed out and was skipped",
                &SkipTurnData { room_id: this.id.clone(), skipped, turn: turn_username },
            );
            drop(state);

            this.broadcast_both(envelope).await;
            this.rearm_turn_timer(new_turn);
        });
    }

    /// One 100 ms driver covering simulation, mana regen, and (every 50th
    /// tick, ~5 s) dead-troop cleanup (§4.9, consolidated per SPEC_FULL).
    async fn run_tick_loop(self: Arc<Self>) {
        tokio::time::sleep(setup::TICK_START_GRACE).await;
        {
            let mut state = self.state.lock().await;
            if let Phase::Tick(tick) = &mut state.phase {
                tick.start_at = Instant::now();
            }
        }

        let mut tick_count: u64 = 0;
        let mut interval = tokio::time::interval(Duration::from_millis(100));
        loop {
            interval.tick().await;
            tick_count += 1;

            let mut state = self.state.lock().await;
            if state.winner_declared {
                return;
            }

            let now = Instant::now();
            let summary = {
                let mut rng = self.rng.lock().expect("room rng poisoned");
                tick_engine::run_tick(&mut state, now, &mut *rng)
            };
            metrics::counter!("rk_session_ticks").increment(1);
            if summary.attacks > 0 {
                metrics::counter!("rk_session_tick_attacks").increment(summary.attacks as u64);
            }

            if tick_count % 50 == 0 {
                let removed = tick_engine::run_cleanup(&mut state);
                if removed > 0 {
                    tracing::debug!(room = %self.id, removed, "cleaned up dead troops");
                }
            }

            let win = win_condition::try_declare_winner(&mut state, now);
            let view = views::game_view(&state, &self.id, now);
            let mana_updates: Vec<(Username, f64)> = summary
                .mana_updates
                .iter()
                .map(|&seat| (state.player(seat).user.clone(), state.player(seat).mana))
                .collect();
            let snapshot = win.map(|outcome| (outcome, state.clone()));
            drop(state);

            self.broadcast_both(ServerEnvelope::ok(kind::GAME_STATE, "tick", &view)).await;
            for (username, mana) in mana_updates {
                let envelope = ServerEnvelope::ok(
                    kind::MANA_UPDATE,
                    "Mana regenerated",
                    &ManaUpdateData { room_id: self.id.clone(), username: username.clone(), mana },
                );
                self.registry.send_to_client(username, envelope);
            }

            if let Some((outcome, snapshot)) = snapshot {
                self.conclude_match(outcome, &snapshot).await;
                return;
            }
        }
    }

    /// Persist rewards and broadcast `game_over_response`. The room itself
    /// stays registered until the `play_again` handler tears it down
    /// (§9 open question: room recycling matches `handle_play_again.go`,
    /// not game-over).
    async fn conclude_match(&self, outcome: win_condition::Outcome, state: &GameState) {
        let Ok(Some(mut user1)) = self.user_store.find_by_username(state.player1.user.as_str()).await else {
            tracing::error!(room = %self.id, "missing user record for player1 at game over");
            return;
        };
        let Ok(Some(mut user2)) = self.user_store.find_by_username(state.player2.user.as_str()).await else {
            tracing::error!(room = %self.id, "missing user record for player2 at game over");
            return;
        };

        win_condition::apply_rewards(outcome, &state.player1, &state.player2, &mut user1, &mut user2);

        if let Err(err) = self.user_store.save_one(user1).await {
            tracing::error!(%err, room = %self.id, "failed to persist player1 match rewards");
        }
        if let Err(err) = self.user_store.save_one(user2).await {
            tracing::error!(%err, room = %self.id, "failed to persist player2 match rewards");
        }

        let match_outcome = match outcome {
            win_condition::Outcome::Winner(seat) => MatchOutcome::Winner { username: state.player(seat).user.to_string() },
            win_condition::Outcome::Draw => MatchOutcome::Draw,
        };
        let message = match &match_outcome {
            MatchOutcome::Winner { username } => format!("Game over! {username} wins!"),
            MatchOutcome::Draw => "It's a draw!".to_string(),
        };

        let envelope = ServerEnvelope::ok(kind::GAME_OVER_RESPONSE, message, &GameOverData { room_id: self.id.clone(), outcome: match_outcome });
        self.broadcast_both(envelope).await;

        metrics::counter!("rk_session_matches_concluded").increment(1);
    }
}
