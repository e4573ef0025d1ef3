use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    controllers::SongController,
    error::ApiError,
    models::song::{Song, SongQuery},
    state::AppState,
};

pub async fn create_song_route(
    State(state): State<AppState>,
    payload: Result<Json<Song>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(song) = payload?;
    let record = SongController::create_song(&state, song).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn list_songs_route(
    State(state): State<AppState>,
    query: Result<Query<SongQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    Ok(Json(SongController::list_songs(&state, &query).await?))
}
