use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use crate::storage::SqliteStore;

pub mod response;
pub mod routes;

/// Server state.
///
/// The store is the only connection to the database; the mutex serializes
/// every request's read-then-write sequence.
pub struct AppState {
    pub store: Mutex<SqliteStore>,
}

impl AppState {
    pub fn new(store: SqliteStore) -> Arc<Self> {
        Arc::new(Self { store: Mutex::new(store) })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/cards", post(routes::create_card).get(routes::list_cards))
        .route("/cards/random", get(routes::random_card))
        .route(
            "/cards/{id}",
            get(routes::get_card).patch(routes::update_card).delete(routes::delete_card),
        )
        .route("/users", post(routes::create_user).get(routes::list_users))
        .route(
            "/users/{id}",
            get(routes::get_user).patch(routes::update_user).delete(routes::delete_user),
        )
        .route("/users/{id}/cards", get(routes::list_holdings))
        .route(
            "/users/{id}/cards/{card_id}",
            post(routes::acquire_card).delete(routes::release_card),
        )
        .route("/users/{id}/draw", post(routes::draw_cards))
        .fallback(routes::no_route)
        .method_not_allowed_fallback(routes::method_not_allowed)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until Ctrl-C, then hand the store back so the caller can close it.
///
/// Returns `None` if a request task still holds the state after shutdown;
/// the connection is then closed when that task drops it.
pub async fn start_server(addr: SocketAddr, store: SqliteStore) -> anyhow::Result<Option<SqliteStore>> {
    let state = AppState::new(store);
    let app = router(state.clone());

    tracing::info!("Starting server on {}", addr);
    println!("🌍 Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    match Arc::try_unwrap(state) {
        Ok(state) => Ok(Some(state.store.into_inner())),
        Err(_) => {
            tracing::warn!("Server state still shared after shutdown");
            Ok(None)
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        return;
    }
    tracing::info!("Shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use tower::ServiceExt;
    use crate::server::response::Envelope;

    fn app() -> Router {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.bootstrap().unwrap();
        router(AppState::new(store))
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, Envelope) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn card_body(title: &str) -> serde_json::Value {
        serde_json::json!({
            "title": title,
            "description": "test card",
            "type": "fire",
            "rarity": 2,
            "attack": 10,
            "defense": 5,
            "health": 100
        })
    }

    #[tokio::test]
    async fn card_crud_round_trip() {
        let app = app();

        let (status, body) = call(&app, Method::POST, "/cards", Some(card_body("Ember Fox"))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.status, 201);
        let id = body.data["id"].as_i64().unwrap();

        let (status, body) = call(&app, Method::GET, &format!("/cards/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.data["title"], "Ember Fox");
        assert_eq!(body.data["type"], "fire");

        let patch = serde_json::json!({ "health": 250 });
        let (_, body) = call(&app, Method::PATCH, &format!("/cards/{id}"), Some(patch)).await;
        assert_eq!(body.data["health"], 250);

        let (status, _) = call(&app, Method::DELETE, &format!("/cards/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, Method::GET, &format!("/cards/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.data.is_null());
    }

    #[tokio::test]
    async fn missing_fields_are_400() {
        let app = app();
        let (status, body) = call(&app, Method::POST, "/cards", Some(serde_json::json!({ "title": "x" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.status, 400);
        assert!(body.message.starts_with("Missing required fields"));
    }

    #[tokio::test]
    async fn bad_path_id_is_400_envelope() {
        let app = app();
        let (status, body) = call(&app, Method::GET, "/cards/not-a-number", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.data.is_null());
    }

    #[tokio::test]
    async fn duplicate_user_is_424() {
        let app = app();
        let user = serde_json::json!({ "name": "ash", "discord_id": "dc1" });
        let (status, _) = call(&app, Method::POST, "/users", Some(user)).await;
        assert_eq!(status, StatusCode::CREATED);

        let dup = serde_json::json!({ "name": "misty", "discord_id": "dc1" });
        let (status, body) = call(&app, Method::POST, "/users", Some(dup)).await;
        assert_eq!(status, StatusCode::FAILED_DEPENDENCY);
        assert_eq!(body.status, 424);
        assert!(body.message.contains("discord_id"));
    }

    #[tokio::test]
    async fn acquire_and_release_through_http() {
        let app = app();
        call(&app, Method::POST, "/users", Some(serde_json::json!({ "name": "ash", "discord_id": "dc1" }))).await;
        call(&app, Method::POST, "/cards", Some(card_body("Ember Fox"))).await;

        let (status, body) = call(&app, Method::POST, "/users/1/cards/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.data["owned_amount"], 1);
        let (_, body) = call(&app, Method::POST, "/users/1/cards/1", None).await;
        assert_eq!(body.data["owned_amount"], 2);

        let (_, body) = call(&app, Method::GET, "/users/1/cards", None).await;
        assert_eq!(body.data[0]["title"], "Ember Fox");
        assert_eq!(body.data[0]["owned_amount"], 2);

        let (_, body) = call(&app, Method::DELETE, "/users/1/cards/1", None).await;
        assert_eq!(body.data["owned_amount"], 1);
        call(&app, Method::DELETE, "/users/1/cards/1", None).await;

        let (status, _) = call(&app, Method::DELETE, "/users/1/cards/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn draw_opens_unknown_cards() {
        let app = app();
        let user = serde_json::json!({ "name": "ash", "discord_id": "dc1", "unknown_cards": 2 });
        call(&app, Method::POST, "/users", Some(user)).await;
        call(&app, Method::POST, "/cards", Some(card_body("Ember Fox"))).await;

        let (status, body) = call(&app, Method::POST, "/users/1/draw?count=2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.data.as_array().unwrap().len(), 2);

        let (status, _) = call(&app, Method::POST, "/users/1/draw", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(&app, Method::GET, "/cards/random", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.data["title"], "Ember Fox");
    }

    #[tokio::test]
    async fn unmatched_requests_still_get_an_envelope() {
        let app = app();

        let (status, body) = call(&app, Method::GET, "/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.status, 404);
        assert!(body.data.is_null());
        assert!(body.message.contains("/nope"));

        let (status, body) = call(&app, Method::PUT, "/cards/1", None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body.status, 405);
        assert!(body.message.starts_with("PUT"));
    }
}
