//! Agrovale Sales & Inventory Server Library
//!
//! Server-rendered pages for products, clients, sales, reports, and user
//! administration on top of a SQLite database.

pub mod admin;
pub mod catalog;
pub mod clients;
pub mod config;
pub mod core;
pub mod models;
pub mod reports;
pub mod sales;
pub mod templates;

use axum::Router;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{AppState, ServerConfig};
use crate::core::db;
use crate::core::session::CLEANUP_INTERVAL;

/// Open the database and build the shared state.
pub async fn build_state(config: ServerConfig) -> anyhow::Result<AppState> {
    let pool = db::connect(&config).await?;
    let state = AppState::new(config, pool);

    if let (Some(user), Some(password)) = (
        state.config.admin_user.clone(),
        state.config.admin_password.clone(),
    ) {
        state.auth.ensure_admin(&user, &password).await?;
    }

    Ok(state)
}

/// The complete HTTP application.
pub fn app(state: AppState) -> Router {
    crate::core::router(state)
}

pub async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_err()
    {
        // Already set, ignore
    }

    info!("=== Agrovale Server ===");
    info!("Features: Auth | Produtos | Clientes | Vendas | Relatórios | Auditoria");

    let config = ServerConfig::from_env();
    info!("Database: {}", config.database_url);
    info!("Static files: {:?}", config.public_dir);
    if config.admin_user.is_some() != config.admin_password.is_some() {
        warn!("ADMIN_USER and ADMIN_PASSWORD must be set together, skipping admin bootstrap");
    }

    let state = build_state(config).await?;
    state.sessions.spawn_cleanup(CLEANUP_INTERVAL);
    info!("Session store initialized (cookie '{}')", state.sessions.cookie_name());

    let addr = state.config.socket_addr();
    let app = app(state);

    info!("");
    info!("╔════════════════════════════════════════════════════════════╗");
    info!("║  Agrovale Server Running                                   ║");
    info!("║  Address: http://{:<42}║", addr);
    info!("╚════════════════════════════════════════════════════════════╝");
    info!("");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
