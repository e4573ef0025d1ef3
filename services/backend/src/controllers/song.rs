use mongodb::bson::{Bson, Document};
use serde_json::Value;
use tracing::info;

use crate::{
    db::Filter,
    error::ApiError,
    models::song::{SONG_COLLECTION, Song, SongQuery, SongRecord},
    state::AppState,
};

pub struct SongController;

impl SongController {
    pub async fn create_song(state: &AppState, song: Song) -> Result<SongRecord, ApiError> {
        let database = state.database()?;
        let id = database.create_document(SONG_COLLECTION, &song).await?;
        info!("Created song {}: {} by {}", id, song.title, song.artist);
        Ok(SongRecord { id, song })
    }

    pub async fn list_songs(state: &AppState, query: &SongQuery) -> Result<Vec<Value>, ApiError> {
        let database = state.database()?;
        let documents = database
            .get_documents(SONG_COLLECTION, &song_filter(query), Some(query.limit))
            .await?;
        Ok(documents.into_iter().map(normalize_document).collect())
    }
}

/// Free songs only, narrowed by genre and a title/artist pattern when given.
fn song_filter(query: &SongQuery) -> Filter {
    let mut filters = vec![Filter::eq("is_free", true)];
    if let Some(genre) = non_empty(&query.genre) {
        filters.push(Filter::eq("genre", genre));
    }
    if let Some(q) = non_empty(&query.q) {
        filters.push(Filter::Or(vec![
            Filter::matches("title", q),
            Filter::matches("artist", q),
        ]));
    }
    Filter::And(filters)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

/// Renames `_id` to `id` and flattens BSON-only types for JSON clients.
fn normalize_document(document: Document) -> Value {
    Value::Object(
        document
            .into_iter()
            .map(|(key, value)| {
                let key = if key == "_id" { "id".to_string() } else { key };
                (key, bson_to_json(value))
            })
            .collect(),
    )
}

fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => dt
            .try_to_rfc3339_string()
            .map(Value::String)
            .unwrap_or_else(|_| Value::from(dt.timestamp_millis())),
        Bson::Document(document) => Value::Object(
            document
                .into_iter()
                .map(|(key, value)| (key, bson_to_json(value)))
                .collect(),
        ),
        Bson::Array(values) => Value::Array(values.into_iter().map(bson_to_json).collect()),
        other => other.into_relaxed_extjson(),
    }
}
