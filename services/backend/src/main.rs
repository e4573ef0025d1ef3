use std::sync::Arc;

use tracing::{Level, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use crate::db::{Database, DbError};
use crate::secrets::SecretManager;
use crate::state::AppState;

mod controllers;
mod db;
mod error;
mod models;
mod routers;
mod secrets;
mod state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::DEBUG.into()))
        .with_target(false)
        .init();

    let secrets = Arc::new(SecretManager::from_env());

    // A missing or broken database only disables the song routes
    let database = match Database::new(&secrets).await {
        Ok(db) => {
            info!("📊 Using database {}", db.name());
            Some(db)
        }
        Err(DbError::NotInitialized) => {
            warn!("⚠️  DATABASE_URL or DATABASE_NAME not set, song routes are disabled");
            None
        }
        Err(e) => {
            error!("❌ Failed to open database: {}", e);
            None
        }
    };

    let port = secrets.port();
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    let app = routers::app(AppState::new(database, secrets));

    info!("🎵 Free Music Listing API listening on 0.0.0.0:{}", port);
    info!("📡 Song endpoints: /api/songs");

    axum::serve(listener, app).await?;
    Ok(())
}
