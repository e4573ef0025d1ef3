use axum::{Json, response::IntoResponse};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use crate::secrets::{DATABASE_NAME, DATABASE_URL};
use crate::state::AppState;

const MAX_COLLECTIONS: usize = 10;
const MAX_ERROR_CHARS: usize = 50;

#[derive(Debug, Serialize)]
pub struct Diagnostics {
    pub backend: String,
    pub database: String,
    pub database_url: String,
    pub database_name: String,
    pub connection_status: String,
    pub collections: Vec<String>,
}

pub struct RootController;

impl RootController {
    pub async fn root() -> impl IntoResponse {
        Json(json!({ "message": "Free Music Listing API is running" }))
    }

    pub async fn hello() -> impl IntoResponse {
        Json(json!({ "message": "Hello from the backend API!" }))
    }

    /// Reports database reachability and which settings are present.
    pub async fn diagnostics(state: &AppState) -> Diagnostics {
        let mut report = Diagnostics {
            backend: "✅ Running".to_string(),
            database: "⚠️  Available but not initialized".to_string(),
            database_url: env_status(state.secrets.is_set(DATABASE_URL)),
            database_name: env_status(state.secrets.is_set(DATABASE_NAME)),
            connection_status: "Not Connected".to_string(),
            collections: Vec::new(),
        };

        if let Some(database) = &state.database {
            report.connection_status = "Connected".to_string();
            match database.list_collection_names().await {
                Ok(names) => {
                    report.collections = first_collections(names);
                    report.database = "✅ Connected & Working".to_string();
                }
                Err(e) => {
                    warn!("Listing collections of {} failed: {}", database.name(), e);
                    report.database = connected_but_error(&e.to_string());
                }
            }
        }

        report
    }
}

fn env_status(set: bool) -> String {
    let status = if set { "✅ Set" } else { "❌ Not Set" };
    status.to_string()
}

fn first_collections(mut names: Vec<String>) -> Vec<String> {
    names.truncate(MAX_COLLECTIONS);
    names
}

fn connected_but_error(message: &str) -> String {
    let clipped: String = message.chars().take(MAX_ERROR_CHARS).collect();
    format!("⚠️  Connected but Error: {}", clipped)
}
