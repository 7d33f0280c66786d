//! Per-mode FIFO matchmaking (§4.6).
//!
//! Grounded on `match.go`'s `HandleFindMatch`/`startMatchmaker`/
//! `validatePlayers`/`handleMatch`: enqueue, a 100 ms poller that pairs up
//! queues of length >= 2, re-validates both players are still connected
//! before committing a match, and a 30 s per-player wait that fires
//! `match_timeout` if nobody claims the slot. Translated from goroutines +
//! buffered channels into a `tokio::sync::Mutex<VecDeque<_>>` per mode plus
//! a single lazily-started poller task.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::{oneshot, Mutex};

use rk_data::Catalog;
use rk_engine::setup;
use rk_store::UserStore;
use rk_types::enums::GameMode;
use rk_types::ids::RoomId;
use rk_types::ids::Username;
use rk_types::protocol::{kind, MatchFoundData, ServerEnvelope};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::registry::Registry;
use crate::room::Room;

struct QueuedPlayer {
    username: Username,
    level: u32,
    matched: oneshot::Sender<()>,
}

pub struct Matchmaker {
    registry: Arc<Registry>,
    catalog: Arc<Catalog>,
    user_store: Arc<dyn UserStore>,
    config: SessionConfig,
    simple: Mutex<VecDeque<QueuedPlayer>>,
    enhanced: Mutex<VecDeque<QueuedPlayer>>,
    started: AtomicBool,
}

impl Matchmaker {
    pub fn new(registry: Arc<Registry>, catalog: Arc<Catalog>, user_store: Arc<dyn UserStore>, config: SessionConfig) -> Self {
        Self {
            registry,
            catalog,
            user_store,
            config,
            simple: Mutex::new(VecDeque::new()),
            enhanced: Mutex::new(VecDeque::new()),
            started: AtomicBool::new(false),
        }
    }

    fn queue(&self, mode: GameMode) -> &Mutex<VecDeque<QueuedPlayer>> {
        match mode {
            GameMode::Simple => &self.simple,
            GameMode::Enhanced => &self.enhanced,
        }
    }

    /// Enqueue `username` for `mode`. The caller's immediate "queued" ack is
    /// the `Ok(())` return; `match_found`/`match_timeout` arrive later via
    /// the registry, asynchronously.
    pub async fn find_match(self: &Arc<Self>, username: Username, level: u32, mode: GameMode) -> Result<(), SessionError> {
        if !self.registry.pending.insert(username.clone()) {
            return Err(SessionError::Conflict("already queued for a match".to_string()));
        }

        let (tx, rx) = oneshot::channel();
        self.queue(mode).lock().await.push_back(QueuedPlayer { username: username.clone(), level, matched: tx });

        self.ensure_started();

        let this = self.clone();
        tokio::spawn(async move { this.await_match_or_timeout(username, rx).await });

        Ok(())
    }

    async fn await_match_or_timeout(self: Arc<Self>, username: Username, rx: oneshot::Receiver<()>) {
        if tokio::time::timeout(self.config.matchmaking_timeout, rx).await.is_ok() {
            return; // handle_match already removed `username` from `pending` and notified it.
        }
        if self.registry.pending.remove(&username).is_some() {
            tracing::info!(%username, "matchmaking timed out with no opponent");
            self.registry.send_to_client(username, ServerEnvelope::ok_empty(kind::MATCH_TIMEOUT, "No opponent found. Please try again."));
        }
    }

    fn ensure_started(self: &Arc<Self>) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let this = self.clone();
        tokio::spawn(async move { this.run_poll_loop().await });
    }

    async fn run_poll_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(Duration::from_millis(100));
        loop {
            ticker.tick().await;
            for mode in [GameMode::Simple, GameMode::Enhanced] {
                self.try_pair(mode).await;
            }
        }
    }

    fn is_connected(&self, username: &Username) -> bool {
        self.registry.clients.get(username).map(|c| !c.is_closed()).unwrap_or(false)
    }

    /// Pop two candidates and either commit them to a match or re-queue
    /// whichever survivor is still connected (`validatePlayers`).
    async fn try_pair(self: &Arc<Self>, mode: GameMode) {
        let mut queue = self.queue(mode).lock().await;
        if queue.len() < 2 {
            return;
        }
        let p1 = queue.pop_front().expect("length checked above");
        let p2 = queue.pop_front().expect("length checked above");

        let ok1 = self.is_connected(&p1.username);
        let ok2 = p1.username != p2.username && self.is_connected(&p2.username);

        if ok1 && ok2 {
            drop(queue);
            self.handle_match(p1, p2, mode).await;
            return;
        }

        tracing::warn!(p1 = %p1.username, p2 = %p2.username, "matchmaking pair validation failed, re-queuing survivors");
        if ok1 {
            queue.push_back(p1);
        } else {
            self.registry.pending.remove(&p1.username);
        }
        if ok2 {
            queue.push_back(p2);
        } else if p1.username != p2.username {
            self.registry.pending.remove(&p2.username);
        }
    }

    async fn handle_match(self: &Arc<Self>, p1: QueuedPlayer, p2: QueuedPlayer, mode: GameMode) {
        let room_id = generate_room_id();
        let mut rng = rand::thread_rng();
        let state = match mode {
            GameMode::Simple => {
                setup::new_turn_game(p1.username.clone(), p2.username.clone(), p1.level, p2.level, &self.catalog, &mut rng)
            }
            GameMode::Enhanced => setup::new_tick_game(
                p1.username.clone(),
                p2.username.clone(),
                p1.level,
                p2.level,
                &self.catalog,
                &mut rng,
                std::time::Instant::now(),
            ),
        };
        drop(rng);

        let room = Arc::new(Room::new(
            room_id.clone(),
            mode,
            state,
            p1.username.clone(),
            p2.username.clone(),
            self.registry.clone(),
            self.user_store.clone(),
            self.config,
        ));

        self.registry.rooms.insert(room_id.clone(), room.clone());
        self.registry.room_of_user.insert(p1.username.clone(), room_id.clone());
        self.registry.room_of_user.insert(p2.username.clone(), room_id.clone());
        self.registry.pending.remove(&p1.username);
        self.registry.pending.remove(&p2.username);

        room.start().await;
        metrics::counter!("rk_session_matches_formed").increment(1);
        tracing::info!(room = %room_id, p1 = %p1.username, p2 = %p2.username, ?mode, "match formed");

        self.registry.send_to_client(
            p1.username.clone(),
            ServerEnvelope::ok(kind::MATCH_FOUND, "Match found!", &MatchFoundData { room_id: room_id.clone(), opponent: p2.username.clone(), mode }),
        );
        self.registry.send_to_client(
            p2.username.clone(),
            ServerEnvelope::ok(kind::MATCH_FOUND, "Match found!", &MatchFoundData { room_id: room_id.clone(), opponent: p1.username.clone(), mode }),
        );

        let _ = p1.matched.send(());
        let _ = p2.matched.send(());
    }
}

/// `timestamp_ns` room identifier (§4.6).
fn generate_room_id() -> RoomId {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the unix epoch")
        .as_nanos();
    RoomId::new(nanos.to_string())
}
