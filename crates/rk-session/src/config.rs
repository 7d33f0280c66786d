//! Tunable knobs for the session runtime, handed in by whatever binds the
//! socket (`tools/rk-server`). Kept separate from that binary's own env
//! parsing so `rk-session` never depends on it — the crate only knows about
//! `Duration`s, not `std::env`.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// §4.3: write deadline applied to every `Connection::safe_write`.
    pub write_deadline: Duration,
    /// §4.8: per-turn deadline before the server auto-skips.
    pub turn_timer: Duration,
    /// §4.8: grace before a freshly-switched turn's timer can fire.
    pub turn_timer_grace: Duration,
    /// §4.6: time a queued player waits before `match_timeout`.
    pub matchmaking_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            write_deadline: Duration::from_secs(5),
            turn_timer: Duration::from_secs(30),
            turn_timer_grace: Duration::from_secs(1),
            matchmaking_timeout: Duration::from_secs(30),
        }
    }
}
