//! Binary entry point — see `rk_server` (this crate's library target) for
//! the actual route/state wiring.

use rk_server::ServerConfig;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "rk_server=info,rk_session=info,tower_http=warn".into()))
        .init();

    let config = ServerConfig::from_env();
    let (listener, app) = rk_server::bind(&config).await;
    rk_server::serve(listener, app).await;
}
