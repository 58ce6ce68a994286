mod auth;
mod clock;
mod config;
mod cookies;
mod db;
mod guard;
mod routes;
mod services;
mod state;
mod store;

use std::process::ExitCode;
use std::sync::Arc;

use auth::google::{DevVerifier, GoogleVerifier, TokenVerifier};
use clock::{Clock, SystemClock};
use config::AppConfig;
use store::DocumentStore;
use store::memory::MemoryStore;
use store::postgres::PgStore;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env();
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "invalid configuration");
        return ExitCode::FAILURE;
    }
    let port = config.port;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let store: Arc<dyn DocumentStore> = match config.database_url.as_deref() {
        Some(url) => match db::init_pool(url).await {
            Ok(pool) => Arc::new(PgStore::new(pool, Arc::clone(&clock))),
            Err(e) => {
                tracing::error!(error = %e, "database init failed");
                return ExitCode::FAILURE;
            }
        },
        None => {
            tracing::warn!("DATABASE_URL not set; documents live in memory and vanish on restart");
            Arc::new(MemoryStore::new(Arc::clone(&clock)))
        }
    };

    let verifier: Arc<dyn TokenVerifier> = match config.google_client_id.clone() {
        Some(client_id) => match GoogleVerifier::new(client_id) {
            Ok(verifier) => Arc::new(verifier),
            Err(e) => {
                tracing::error!(error = %e, "google verifier init failed");
                return ExitCode::FAILURE;
            }
        },
        None => {
            tracing::warn!("GOOGLE_CLIENT_ID not set; accepting development credentials");
            Arc::new(DevVerifier)
        }
    };

    tracing::info!(
        ttl_minutes = config.session_ttl.whole_minutes(),
        secure_cookies = config.cookie_secure,
        "session cookie configured"
    );

    let state = state::AppState::new(config, store, verifier, clock);
    let app = routes::app(state);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %port, "failed to bind");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(%port, "aula listening");
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
