//! WebSocket battle server: accounts, matchmaking, and live turn/tick rooms.
//!
//! Protocol:
//! - Client sends a JSON frame `{"type": ..., "data": {...}}`.
//! - Server replies with `{"type", "success", "message", "data"?}`, either
//!   directly to the sender or broadcast to both players in a room.
//!
//! See `rk_session::dispatcher` for the full command/response taxonomy.
//!
//! `main.rs` is a thin wrapper around [`bind`] and [`serve`] so that
//! `tools/rk-server/tests/` can stand up a real instance of this server on an
//! ephemeral port and drive it over a real WebSocket, the same way a browser
//! client would, instead of calling into engine internals directly.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use rk_data::Catalog;
use rk_session::{AuthService, Matchmaker, Registry, ServerState, SessionConfig};
use rk_store::{Argon2Hasher, FileUserStore, PasswordHasher, UserStore};

/// Everything read from the environment at boot (§SPEC_FULL "Configuration").
pub struct ServerConfig {
    pub port: u16,
    pub data_dir: String,
    pub users_file: String,
    pub session: SessionConfig,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            port: env_var("PORT").and_then(|v| v.parse().ok()).unwrap_or(8081),
            data_dir: env_var("RK_DATA_DIR").unwrap_or_else(|| "assets/data".to_string()),
            users_file: env_var("RK_USERS_FILE").unwrap_or_else(|| "data/users.json".to_string()),
            session: SessionConfig {
                write_deadline: env_secs("RK_WRITE_DEADLINE_SECS").unwrap_or(Duration::from_secs(5)),
                turn_timer: env_secs("RK_TURN_SECS").unwrap_or(Duration::from_secs(30)),
                turn_timer_grace: Duration::from_secs(1),
                matchmaking_timeout: env_secs("RK_MATCHMAKING_TIMEOUT_SECS").unwrap_or(Duration::from_secs(30)),
            },
        }
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn env_secs(key: &str) -> Option<Duration> {
    env_var(key).and_then(|v| v.parse().ok()).map(Duration::from_secs)
}

async fn health() -> &'static str {
    "rk-server ok"
}

async fn metrics(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

async fn index() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html><head><title>rk-server</title></head>
<body>
<h1>Battle server</h1>
<p>Connect via WebSocket at <code>/ws</code></p>
<pre>
const ws = new WebSocket("ws://localhost:8081/ws");
ws.onmessage = (e) => console.log(JSON.parse(e.data));
ws.onopen = () => ws.send(JSON.stringify({ type: "register", data: { username: "alice", password: "hunter2" } }));
</pre>
</body></html>"#,
    )
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| rk_session::run_connection(socket, state))
}

fn build_router(state: Arc<ServerState>, metrics_handle: PrometheusHandle, data_dir: &str) -> Router {
    let metrics_route = Router::new().route("/metrics", get(metrics)).with_state(metrics_handle);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .nest_service("/assets", ServeDir::new(data_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(metrics_route)
}

/// Load the catalog and user store, build the router, and bind a listener —
/// everything short of actually serving. Split out from [`serve`] so callers
/// (tests in particular) can read back the bound ephemeral port before the
/// accept loop starts running.
pub async fn bind(config: &ServerConfig) -> (TcpListener, Router) {
    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install the Prometheus metrics recorder");

    let catalog = Catalog::load(&config.data_dir).unwrap_or_else(|err| {
        eprintln!("Failed to load game data from {}: {err}", config.data_dir);
        std::process::exit(1);
    });

    let user_store: Arc<dyn UserStore> = Arc::new(FileUserStore::new(config.users_file.clone().into()));
    let password_hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2Hasher);

    let registry = Arc::new(Registry::new());
    let auth = Arc::new(AuthService::new(user_store.clone(), password_hasher));
    let matchmaker = Arc::new(Matchmaker::new(registry.clone(), Arc::new(catalog), user_store.clone(), config.session));

    let state = Arc::new(ServerState {
        registry,
        auth,
        matchmaker,
        user_store,
        config: config.session,
    });

    let app = build_router(state, metrics_handle, &config.data_dir);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await.unwrap_or_else(|e| {
        eprintln!("Failed to bind to {addr}: {e}");
        eprintln!("Hint: kill the old process with `lsof -ti:{} | xargs kill`", config.port);
        std::process::exit(1);
    });

    (listener, app)
}

/// Run the accept loop until the process is killed. Never returns in normal
/// operation.
pub async fn serve(listener: TcpListener, app: Router) {
    let addr = listener.local_addr().expect("bound listener has a local address");
    tracing::info!(%addr, "rk-server listening");
    axum::serve(listener, app).await.unwrap();
}
