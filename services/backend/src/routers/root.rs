use axum::{Json, extract::State, response::IntoResponse};

use crate::controllers::RootController;
use crate::state::AppState;

pub async fn root_route() -> impl IntoResponse {
    RootController::root().await
}

pub async fn hello_route() -> impl IntoResponse {
    RootController::hello().await
}

pub async fn diagnostics_route(State(state): State<AppState>) -> impl IntoResponse {
    Json(RootController::diagnostics(&state).await)
}
