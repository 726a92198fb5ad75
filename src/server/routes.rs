use axum::{
    extract::{Path, Query, State},
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{Method, Uri},
    Json,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;
use std::sync::Arc;

use crate::card::{CardInput, CardQuery, CardStore};
use crate::gacha::Gacha;
use crate::ownership::{Ownership, Reconciler};
use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse, ApiResult};
use crate::user::{UserInput, UserQuery, UserStore};

type Body<T> = Result<Json<T>, JsonRejection>;
type Id = Result<Path<i64>, PathRejection>;
type Pair = Result<Path<(i64, i64)>, PathRejection>;

#[derive(Debug, Deserialize)]
pub struct DrawParams {
    pub count: Option<i64>,
}

// ========== Cards ==========

pub async fn create_card(State(state): State<Arc<AppState>>, body: Body<CardInput>) -> ApiResult {
    let Json(input) = body?;
    let store = state.store.lock().await;
    let card = CardStore::new(&store).create(&input)?;
    ApiResponse::created(&card, "Card created")
}

pub async fn list_cards(
    State(state): State<Arc<AppState>>,
    query: Result<Query<CardQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    let store = state.store.lock().await;
    let cards = CardStore::new(&store).list(&query)?;
    ApiResponse::ok(&cards, "Cards retrieved")
}

pub async fn get_card(State(state): State<Arc<AppState>>, id: Id) -> ApiResult {
    let Path(id) = id?;
    let store = state.store.lock().await;
    let card = CardStore::new(&store).get(id)?;
    ApiResponse::ok(&card, "Card retrieved")
}

pub async fn update_card(State(state): State<Arc<AppState>>, id: Id, body: Body<CardInput>) -> ApiResult {
    let Path(id) = id?;
    let Json(input) = body?;
    let store = state.store.lock().await;
    let card = CardStore::new(&store).update(id, &input)?;
    ApiResponse::ok(&card, "Card updated")
}

pub async fn delete_card(State(state): State<Arc<AppState>>, id: Id) -> ApiResult {
    let Path(id) = id?;
    let store = state.store.lock().await;
    CardStore::new(&store).delete(id)?;
    ApiResponse::ok(&serde_json::json!({ "id": id }), "Card deleted")
}

pub async fn random_card(State(state): State<Arc<AppState>>) -> ApiResult {
    let store = state.store.lock().await;
    let mut rng = StdRng::from_entropy();
    let card = Gacha::new(&store)
        .draw(&mut rng, 1)?
        .pop()
        .ok_or_else(|| ApiError::NotFound { message: "no cards to draw".to_string() })?;
    ApiResponse::ok(&card, "Card drawn")
}

// ========== Users ==========

pub async fn create_user(State(state): State<Arc<AppState>>, body: Body<UserInput>) -> ApiResult {
    let Json(input) = body?;
    let store = state.store.lock().await;
    let user = UserStore::new(&store).create(&input)?;
    ApiResponse::created(&user, "User created")
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    let store = state.store.lock().await;
    let users = UserStore::new(&store).list(&query)?;
    ApiResponse::ok(&users, "Users retrieved")
}

pub async fn get_user(State(state): State<Arc<AppState>>, id: Id) -> ApiResult {
    let Path(id) = id?;
    let store = state.store.lock().await;
    let user = UserStore::new(&store).get(id)?;
    ApiResponse::ok(&user, "User retrieved")
}

pub async fn update_user(State(state): State<Arc<AppState>>, id: Id, body: Body<UserInput>) -> ApiResult {
    let Path(id) = id?;
    let Json(input) = body?;
    let store = state.store.lock().await;
    let user = UserStore::new(&store).update(id, &input)?;
    ApiResponse::ok(&user, "User updated")
}

pub async fn delete_user(State(state): State<Arc<AppState>>, id: Id) -> ApiResult {
    let Path(id) = id?;
    let store = state.store.lock().await;
    UserStore::new(&store).delete(id)?;
    ApiResponse::ok(&serde_json::json!({ "id": id }), "User deleted")
}

// ========== Ownership ==========

pub async fn list_holdings(State(state): State<Arc<AppState>>, id: Id) -> ApiResult {
    let Path(user_id) = id?;
    let store = state.store.lock().await;
    let holdings = Reconciler::new(&store).holdings(user_id)?;
    ApiResponse::ok(&holdings, "User cards retrieved")
}

pub async fn acquire_card(State(state): State<Arc<AppState>>, pair: Pair) -> ApiResult {
    let Path((user_id, card_id)) = pair?;
    let store = state.store.lock().await;
    let ownership = Reconciler::new(&store).acquire(user_id, card_id)?;
    ApiResponse::ok(&ownership, "Card added to user")
}

pub async fn release_card(State(state): State<Arc<AppState>>, pair: Pair) -> ApiResult {
    let Path((user_id, card_id)) = pair?;
    let store = state.store.lock().await;
    let owned_amount = Reconciler::new(&store).release(user_id, card_id)?;
    let ownership = Ownership { user_id, card_id, owned_amount };
    ApiResponse::ok(&ownership, "Card removed from user")
}

pub async fn draw_cards(
    State(state): State<Arc<AppState>>,
    id: Id,
    params: Result<Query<DrawParams>, QueryRejection>,
) -> ApiResult {
    let Path(user_id) = id?;
    let Query(params) = params?;
    let store = state.store.lock().await;
    let mut rng = StdRng::from_entropy();
    let drawn = Gacha::new(&store).open_unknown(&mut rng, user_id, params.count.unwrap_or(1))?;
    ApiResponse::ok(&drawn, "Cards drawn")
}

// ========== Fallbacks ==========

pub async fn no_route(uri: Uri) -> ApiError {
    ApiError::NotFound { message: format!("no route for {}", uri.path()) }
}

pub async fn method_not_allowed(method: Method, uri: Uri) -> ApiError {
    ApiError::MethodNotAllowed {
        message: format!("{} is not allowed on {}", method, uri.path()),
    }
}
