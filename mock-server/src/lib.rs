use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Redirect,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const DEFAULT_TOKEN: &str = "secret-token";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
}

#[derive(Deserialize)]
pub struct NewItem {
    pub name: String,
}

#[derive(Clone)]
pub struct AppState {
    items: Arc<RwLock<Vec<Item>>>,
    token: Arc<str>,
}

type ApiResult<T> = Result<T, (StatusCode, Json<Value>)>;

fn error(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": message })))
}

/// Router accepting `DEFAULT_TOKEN` as the bearer token.
pub fn app() -> Router {
    app_with_token(DEFAULT_TOKEN)
}

pub fn app_with_token(token: &str) -> Router {
    let state = AppState {
        items: Arc::new(RwLock::new(Vec::new())),
        token: Arc::from(token),
    };
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route(
            "/items/{id}",
            get(get_item).put(rename_item).delete(delete_item),
        )
        .route("/whoami", get(whoami))
        .route("/broken", get(broken))
        .route("/moved", get(moved))
        .route("/me", get(me))
        .route("/moved-me", get(moved_me))
        .with_state(state)
}

pub async fn run(listener: TcpListener, token: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_token(token)).await
}

fn authorize(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    let expected = format!("Bearer {}", state.token);
    match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => {
            debug!("rejecting request without a valid bearer token");
            Err(error(StatusCode::UNAUTHORIZED, "unauthorized"))
        }
    }
}

async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Json<Value> {
    let items = state.items.read().await;
    Json(json!({ "data": *items, "query": query }))
}

async fn create_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<NewItem>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    authorize(&state, &headers)?;
    let item = Item {
        id: Uuid::new_v4(),
        name: input.name,
    };
    state.items.write().await.push(item.clone());
    info!(id = %item.id, "created item");
    Ok((StatusCode::CREATED, Json(json!({ "data": item }))))
}

async fn get_item(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Value>> {
    let items = state.items.read().await;
    items
        .iter()
        .find(|item| item.id == id)
        .map(|item| Json(json!({ "data": item })))
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "not found"))
}

async fn rename_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(input): Json<NewItem>,
) -> ApiResult<Json<Value>> {
    authorize(&state, &headers)?;
    let mut items = state.items.write().await;
    let item = items
        .iter_mut()
        .find(|item| item.id == id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "not found"))?;
    item.name = input.name;
    Ok(Json(json!({ "data": item })))
}

async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    authorize(&state, &headers)?;
    let mut items = state.items.write().await;
    let index = items
        .iter()
        .position(|item| item.id == id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "not found"))?;
    let item = items.remove(index);
    info!(id = %item.id, "deleted item");
    Ok(Json(json!({ "data": item })))
}

/// Echo the request headers the client is expected to send.
async fn whoami(headers: HeaderMap) -> Json<Value> {
    let read = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Json(json!({
        "data": {
            "id": "whoami",
            "accept": read(header::ACCEPT),
            "content_type": read(header::CONTENT_TYPE),
            "user_agent": read(header::USER_AGENT),
            "authorization": read(header::AUTHORIZATION),
        }
    }))
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded")
}

async fn moved() -> Redirect {
    Redirect::temporary("/items")
}

/// Authenticated identity: echoes the bearer header it accepted.
async fn me(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    authorize(&state, &headers)?;
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Ok(Json(json!({
        "data": { "id": "me", "authorization": authorization }
    })))
}

async fn moved_me() -> Redirect {
    Redirect::temporary("/me")
}
