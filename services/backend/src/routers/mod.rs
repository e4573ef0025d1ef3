use axum::{Router, routing::get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod root;
pub mod song;

pub use root::{diagnostics_route, hello_route, root_route};
pub use song::{create_song_route, list_songs_route};

pub fn app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status routes
        .route("/", get(root_route))
        .route("/api/hello", get(hello_route))
        .route("/test", get(diagnostics_route))
        // Songs
        .route("/api/songs", get(list_songs_route).post(create_song_route))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::db::{Database, Filter};
    use crate::models::song::SONG_COLLECTION;
    use crate::secrets::{DATABASE_NAME, DATABASE_URL, SecretManager};

    fn secrets(pairs: &[(&str, &str)]) -> Arc<SecretManager> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Arc::new(SecretManager::from_lookup(|key| map.get(key).cloned()))
    }

    fn memory_state() -> AppState {
        AppState::new(
            Some(Database::in_memory("music")),
            secrets(&[(DATABASE_URL, "memory://local"), (DATABASE_NAME, "music")]),
        )
    }

    async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = app(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn get(state: &AppState, uri: &str) -> (StatusCode, Value) {
        send(state, Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn post_song(state: &AppState, song: Value) -> (StatusCode, Value) {
        let request = Request::post("/api/songs")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(song.to_string()))
            .unwrap();
        send(state, request).await
    }

    fn titles(body: &Value) -> Vec<&str> {
        let mut titles: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|song| song["title"].as_str().unwrap())
            .collect();
        titles.sort_unstable();
        titles
    }

    async fn seed(state: &AppState) {
        for song in [
            json!({ "title": "Chopin Nocturnes", "artist": "Arthur Rubinstein", "genre": "classical" }),
            json!({ "title": "Piano Works", "artist": "chopin collection", "genre": "classical" }),
            json!({ "title": "Requiem", "artist": "Mozart", "genre": "classical" }),
            json!({ "title": "Kind of Blue", "artist": "Miles Davis", "genre": "jazz" }),
            json!({ "title": "Blue Train", "artist": "John Coltrane", "genre": "jazz" }),
            json!({ "title": "A Love Supreme", "artist": "John Coltrane", "genre": "jazz", "is_free": false }),
        ] {
            let (status, _) = post_song(state, song).await;
            assert_eq!(status, StatusCode::CREATED);
        }
    }

    #[tokio::test]
    async fn status_routes() {
        let state = memory_state();
        let (status, body) = get(&state, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Free Music Listing API is running");

        let (status, body) = get(&state, "/api/hello").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Hello from the backend API!");

        let (status, _) = get(&state, "/api/unknown").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn created_song_is_listed() {
        let state = memory_state();
        let (status, created) = post_song(
            &state,
            json!({
                "title": "Gymnopedie No. 1",
                "artist": "Erik Satie",
                "year": 1888,
                "listen_url": "https://example.org/gymnopedie.mp3"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_str().unwrap().to_string();
        assert_eq!(created["title"], "Gymnopedie No. 1");
        assert_eq!(created["year"], 1888);
        assert_eq!(created["is_free"], true);
        assert_eq!(created["album"], Value::Null);

        let (status, listed) = get(&state, "/api/songs").await;
        assert_eq!(status, StatusCode::OK);
        let listed = listed.as_array().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["id"], id.as_str());
        assert_eq!(listed[0]["listen_url"], "https://example.org/gymnopedie.mp3");
        assert!(listed[0].get("_id").is_none());
        assert!(listed[0]["created_at"].is_string());
    }

    #[tokio::test]
    async fn invalid_song_is_rejected_before_storage() {
        let state = memory_state();
        let (status, body) = post_song(&state, json!({ "artist": "Erik Satie" })).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().contains("title"));

        let (status, _) = post_song(
            &state,
            json!({ "title": "Gymnopedie No. 1", "artist": "Erik Satie", "year": "eighteen" }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let request = Request::post("/api/songs")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _) = send(&state, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let stored = state
            .database()
            .unwrap()
            .get_documents(SONG_COLLECTION, &Filter::And(vec![]), None)
            .await
            .unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn loosely_typed_song_fields_are_coerced() {
        let state = memory_state();
        let (status, created) = post_song(
            &state,
            json!({
                "title": "Gymnopedie No. 1",
                "artist": "Erik Satie",
                "year": "1888",
                "is_free": "true"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["year"], 1888);
        assert_eq!(created["is_free"], true);

        let (status, created) = post_song(
            &state,
            json!({ "title": "Vexations", "artist": "Erik Satie", "year": 1893.0, "is_free": 0 }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["year"], 1893);
        assert_eq!(created["is_free"], false);

        // the paid one stays out of listings
        let (_, listed) = get(&state, "/api/songs").await;
        assert_eq!(titles(&listed), vec!["Gymnopedie No. 1"]);
    }

    #[tokio::test]
    async fn listing_filters_by_genre() {
        let state = memory_state();
        seed(&state).await;
        let (status, body) = get(&state, "/api/songs?genre=jazz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(titles(&body), vec!["Blue Train", "Kind of Blue"]);
        assert!(body.as_array().unwrap().iter().all(|song| song["genre"] == "jazz"));
    }

    #[tokio::test]
    async fn listing_matches_title_or_artist_case_insensitively() {
        let state = memory_state();
        seed(&state).await;
        let (status, body) = get(&state, "/api/songs?q=chopin").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(titles(&body), vec!["Chopin Nocturnes", "Piano Works"]);

        let (_, body) = get(&state, "/api/songs?q=COLTRANE&genre=jazz").await;
        assert_eq!(titles(&body), vec!["Blue Train"]);
    }

    #[tokio::test]
    async fn listing_never_returns_paid_songs() {
        let state = memory_state();
        seed(&state).await;
        let (_, body) = get(&state, "/api/songs?limit=0").await;
        let songs = body.as_array().unwrap();
        assert_eq!(songs.len(), 5);
        assert!(songs.iter().all(|song| song["is_free"] == true));
        assert!(!titles(&body).contains(&"A Love Supreme"));
    }

    #[tokio::test]
    async fn listing_respects_limit() {
        let state = memory_state();
        seed(&state).await;
        let (status, body) = get(&state, "/api/songs?limit=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (status, body) = get(&state, "/api/songs?limit=many").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());

        let (status, _) = get(&state, "/api/songs?limit=-1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn storage_errors_become_server_errors() {
        let state = memory_state();
        seed(&state).await;
        let (status, body) = get(&state, "/api/songs?q=(").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().starts_with("invalid pattern"));
    }

    #[tokio::test]
    async fn song_routes_fail_without_database() {
        let state = AppState::new(None, secrets(&[]));
        let (status, body) =
            post_song(&state, json!({ "title": "Requiem", "artist": "Mozart" })).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().starts_with("Database not available"));

        let (status, _) = get(&state, "/api/songs").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn diagnostics_report_connection_and_settings() {
        let state = memory_state();
        seed(&state).await;
        let (status, body) = get(&state, "/test").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["backend"], "✅ Running");
        assert_eq!(body["database"], "✅ Connected & Working");
        assert_eq!(body["connection_status"], "Connected");
        assert_eq!(body["collections"], json!(["song"]));
        assert_eq!(body["database_url"], "✅ Set");
        assert_eq!(body["database_name"], "✅ Set");
    }

    #[tokio::test]
    async fn diagnostics_list_at_most_ten_collections() {
        let state = memory_state();
        let database = state.database().unwrap();
        for i in 0..12 {
            database
                .create_document(&format!("collection_{:02}", i), &json!({ "n": i }))
                .await
                .unwrap();
        }
        let (status, body) = get(&state, "/test").await;
        assert_eq!(status, StatusCode::OK);
        let collections = body["collections"].as_array().unwrap();
        assert_eq!(collections.len(), 10);
        assert_eq!(collections[0], "collection_00");
        assert_eq!(collections[9], "collection_09");
    }

    #[tokio::test]
    async fn diagnostics_report_missing_settings() {
        let state = AppState::new(None, secrets(&[(DATABASE_URL, "mongodb://localhost:27017")]));
        let (status, body) = get(&state, "/test").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"], "⚠️  Available but not initialized");
        assert_eq!(body["connection_status"], "Not Connected");
        assert_eq!(body["collections"], json!([]));
        assert_eq!(body["database_url"], "✅ Set");
        assert_eq!(body["database_name"], "❌ Not Set");
    }

    #[tokio::test]
    async fn cors_is_open() {
        let state = memory_state();
        let request = Request::get("/api/hello")
            .header(header::ORIGIN, "https://listener.example")
            .body(Body::empty())
            .unwrap();
        let response = app(state).oneshot(request).await.unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }
}
